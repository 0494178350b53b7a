//! Relay core: routing, formatting and dispatch between the bridged rooms.
//!
//! ## Module Structure
//!
//! - `registry`: Endpoint ids and their roles
//! - `router`: Relay decisions (`Router`, `RouteOutcome`)
//! - `formatter`: `<author> text` attribution
//! - `filter`: Pluggable body filters (`KnownBridgeTag`)
//! - `dispatch`: Transport traits and the fan-out `Dispatcher`
//! - `orchestrator`: The relay loop (`Relay`)
//! - `channels`: Communication channel structures

pub mod channels;
pub mod dispatch;
pub mod filter;
pub mod formatter;
pub mod orchestrator;
pub mod registry;
pub mod router;

#[cfg(test)]
pub(crate) mod testing;

pub use channels::ChannelBundle;
pub use dispatch::{Dispatcher, TelegramTransport};
pub use orchestrator::{run_relay_loop, Relay};
pub use router::Router;

//! XMPP transport: one client session carrying every bridged MUC room.

pub mod client;
pub mod stanza;

pub use client::{XmppClient, XmppHandle};

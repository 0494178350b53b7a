//! Fan-out of routing decisions to the transports.
//!
//! The dispatcher makes no decisions. It maps each destination role to
//! the transport primitive that owns it and sends, one destination after
//! another. A failed send is logged and recorded, then the next destination
//! is tried; nothing is retried here.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info};

use crate::bridge::registry::EndpointRegistry;
use crate::bridge::router::RoutingDecision;
use crate::common::error::{TransportError, TransportResult};
use crate::common::types::{Endpoint, Role};

/// Operations the relay needs from the XMPP client.
#[async_trait]
pub trait XmppTransport: Send + Sync {
    /// Send a `type="groupchat"` message to a MUC.
    async fn send_groupchat_message(&self, room: &str, body: &str) -> TransportResult<()>;

    /// Join a MUC under `nick`.
    async fn join_room(&self, room: &str, nick: &str) -> TransportResult<()>;
}

/// Operations the relay needs from the Telegram client.
#[async_trait]
pub trait TelegramTransport: Send + Sync {
    /// Post a text message to a chat.
    async fn send_message(&self, chat_id: &str, body: &str) -> TransportResult<()>;
}

/// Result of one destination send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryOutcome {
    pub endpoint: Endpoint,
    pub result: TransportResult<()>,
}

/// Per-destination results of a dispatch, in attempt order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub outcomes: Vec<DeliveryOutcome>,
}

impl DispatchReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &Endpoint> {
        self.outcomes
            .iter()
            .filter(|o| o.result.is_ok())
            .map(|o| &o.endpoint)
    }

    pub fn failed(&self) -> impl Iterator<Item = &DeliveryOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }

    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }
}

/// Sends rendered messages to their destinations.
#[derive(Clone)]
pub struct Dispatcher {
    xmpp: Arc<dyn XmppTransport>,
    telegram: Option<Arc<dyn TelegramTransport>>,
}

impl Dispatcher {
    pub fn new(xmpp: Arc<dyn XmppTransport>, telegram: Option<Arc<dyn TelegramTransport>>) -> Self {
        Self { xmpp, telegram }
    }

    /// Send `decision.rendered_body` to every destination, in order.
    pub async fn dispatch(&self, decision: &RoutingDecision) -> DispatchReport {
        let mut report = DispatchReport::default();

        for endpoint in &decision.destinations {
            let result = self.send_to(endpoint, &decision.rendered_body).await;

            match &result {
                Ok(()) => debug!(destination = %endpoint, "Delivered"),
                Err(e) => error!(
                    source = %decision.source,
                    destination = %endpoint,
                    error = %e,
                    "Failed to relay message"
                ),
            }

            report.outcomes.push(DeliveryOutcome {
                endpoint: endpoint.clone(),
                result,
            });
        }

        report
    }

    async fn send_to(&self, endpoint: &Endpoint, body: &str) -> TransportResult<()> {
        match endpoint.role {
            Role::IrcMuc | Role::XmppMuc => self.xmpp.send_groupchat_message(&endpoint.id, body).await,
            Role::TelegramChat => match &self.telegram {
                Some(telegram) => telegram.send_message(&endpoint.id, body).await,
                None => Err(TransportError::Unavailable { role: endpoint.role }),
            },
        }
    }

    /// Join every XMPP-role room of the registry.
    ///
    /// Called each time the XMPP session comes online. Returns the number of
    /// rooms whose join request was accepted by the transport.
    pub async fn join_rooms(&self, registry: &EndpointRegistry, nick: &str) -> usize {
        let mut joined = 0;
        for room in registry.xmpp_rooms() {
            match self.xmpp.join_room(&room.id, nick).await {
                Ok(()) => {
                    info!(room = %room.id, nick, "Joining room");
                    joined += 1;
                }
                Err(e) => error!(room = %room.id, error = %e, "Failed to join room"),
            }
        }
        joined
    }
}

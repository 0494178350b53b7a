//! Message routing between the bridged endpoints.
//!
//! Decides, for one inbound message, whether it is relayed, where to and
//! with which body. Routing is a pure function of the event and the
//! immutable router state; logging and sending are left to the caller.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{info, warn};

use crate::bridge::filter::{BodyFilter, KnownBridgeTag};
use crate::bridge::formatter::MessageFormatter;
use crate::bridge::registry::EndpointRegistry;
use crate::common::error::ConfigError;
use crate::common::messages::InboundEvent;
use crate::common::types::Endpoint;
use crate::config::types::Config;

/// Authors whose messages are never relayed.
#[derive(Debug, Clone, Default)]
pub struct IgnoreList {
    nicks: HashSet<String>,
}

impl IgnoreList {
    pub fn new<I, S>(nicks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            nicks: nicks.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, author: &str) -> bool {
        self.nicks.contains(author)
    }

    pub fn len(&self) -> usize {
        self.nicks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nicks.is_empty()
    }
}

/// Where a message goes and what it looks like there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingDecision {
    /// Endpoint the message came from.
    pub source: Endpoint,
    /// Destinations in send order. Never contains `source`.
    pub destinations: Vec<Endpoint>,
    /// Body with attribution, ready to send.
    pub rendered_body: String,
}

/// Why a message was not relayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuppressReason {
    /// Sent by the bot itself (self-loop guard).
    SelfMessage,
    /// Author is on the ignore list.
    IgnoredAuthor,
    /// Source id matches no configured endpoint.
    UnknownSource { source_endpoint_id: String },
}

/// Result of routing one inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    Forward(RoutingDecision),
    Suppressed(SuppressReason),
}

#[cfg(test)]
impl RouteOutcome {
    pub fn is_suppressed(&self) -> bool {
        matches!(self, RouteOutcome::Suppressed(_))
    }
}

/// Stateless router over the endpoint registry.
#[derive(Debug, Clone)]
pub struct Router {
    registry: EndpointRegistry,
    ignore_list: IgnoreList,
    nick: String,
    formatter: MessageFormatter,
}

impl Router {
    pub fn new(
        registry: EndpointRegistry,
        ignore_list: IgnoreList,
        nick: impl Into<String>,
        formatter: MessageFormatter,
    ) -> Self {
        Self {
            registry,
            ignore_list,
            nick: nick.into(),
            formatter,
        }
    }

    /// Create a router from configuration.
    ///
    /// The bridge tag filter only takes effect in the two-way setup.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let registry = EndpointRegistry::from_config(config)?;

        let mut formatter = MessageFormatter::new();
        if !config.bridge_tags.is_empty() {
            if registry.is_two_way() {
                let filter = KnownBridgeTag::new(&config.bridge_tags).map_err(|e| {
                    ConfigError::InvalidValue {
                        field: "bridge_tags".to_string(),
                        message: e.to_string(),
                    }
                })?;
                info!(filter = filter.name(), bots = ?filter.bot_names(), "Stripping known bridge tags");
                formatter = formatter.with_tag_filter(Arc::new(filter));
            } else {
                warn!("bridge_tags is only used without Telegram; ignoring it");
            }
        }

        let ignore_list = IgnoreList::new(config.ignore.iter().cloned());
        if !ignore_list.is_empty() {
            info!(count = ignore_list.len(), "Ignoring messages from listed authors");
        }

        Ok(Self::new(registry, ignore_list, config.nick.clone(), formatter))
    }

    pub fn registry(&self) -> &EndpointRegistry {
        &self.registry
    }

    pub fn nick(&self) -> &str {
        &self.nick
    }

    /// Decide what happens to an inbound message.
    ///
    /// Suppression checks run in order: own nickname, ignore list, unknown
    /// source. Everything else fans out to every other endpoint.
    pub fn route(&self, event: &InboundEvent) -> RouteOutcome {
        let author = event.author_display_name.as_str();

        if author == self.nick {
            return RouteOutcome::Suppressed(SuppressReason::SelfMessage);
        }

        if self.ignore_list.contains(author) {
            return RouteOutcome::Suppressed(SuppressReason::IgnoredAuthor);
        }

        let source = match self.registry.resolve_role(&event.source_endpoint_id) {
            Some(role) => Endpoint::new(event.source_endpoint_id.as_str(), role),
            None => {
                return RouteOutcome::Suppressed(SuppressReason::UnknownSource {
                    source_endpoint_id: event.source_endpoint_id.clone(),
                })
            }
        };

        let destinations: Vec<Endpoint> = self
            .registry
            .endpoints()
            .iter()
            .filter(|e| e.id != source.id)
            .cloned()
            .collect();

        let formatted = self.formatter.format(author, &event.body_text);
        let stripped = self.formatter.strip_known_bridge_tag(&formatted);
        // A body made only of bridge tags would vanish; keep the attribution then.
        let rendered_body = if stripped.is_empty() { formatted } else { stripped };

        RouteOutcome::Forward(RoutingDecision {
            source,
            destinations,
            rendered_body,
        })
    }
}

/// Shared router reference for use across async tasks.
pub type SharedRouter = Arc<Router>;

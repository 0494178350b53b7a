//! Relay orchestrator that ties the transports together.
//!
//! Consumes relay events from both transports, routes each message and
//! hands the decision to the dispatcher. Suppressions are logged here with
//! the level matching their kind.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::bridge::dispatch::{DispatchReport, Dispatcher};
use crate::bridge::router::{RouteOutcome, SharedRouter, SuppressReason};
use crate::common::messages::{InboundEvent, RelayEvent};

/// The relay: router plus dispatcher.
pub struct Relay {
    router: SharedRouter,
    dispatcher: Dispatcher,
}

impl Relay {
    pub fn new(router: SharedRouter, dispatcher: Dispatcher) -> Self {
        Self { router, dispatcher }
    }

    /// Handle one event from a transport.
    pub async fn handle_event(&self, event: RelayEvent) {
        match event {
            RelayEvent::Inbound(inbound) => {
                if let Some(report) = self.handle_inbound(&inbound).await {
                    if !report.all_succeeded() {
                        warn!(
                            source = %inbound.source_endpoint_id,
                            delivered = report.succeeded().count(),
                            failed = report.failed().count(),
                            "Message only partially relayed"
                        );
                    }
                }
            }
            RelayEvent::XmppOnline => {
                let registry = self.router.registry();
                let joined = self.dispatcher.join_rooms(registry, self.router.nick()).await;
                info!(joined, total = registry.xmpp_rooms().count(), "XMPP session online");
            }
        }
    }

    /// Route and dispatch one inbound message.
    ///
    /// Returns the dispatch report, or `None` when the message was suppressed.
    pub async fn handle_inbound(&self, event: &InboundEvent) -> Option<DispatchReport> {
        match self.router.route(event) {
            RouteOutcome::Suppressed(SuppressReason::SelfMessage) => {
                debug!(author = %event.author_display_name, "Ignoring own message");
                None
            }
            RouteOutcome::Suppressed(SuppressReason::IgnoredAuthor) => {
                debug!(author = %event.author_display_name, "Ignoring message from ignored author");
                None
            }
            RouteOutcome::Suppressed(SuppressReason::UnknownSource { source_endpoint_id }) => {
                warn!(source = %source_endpoint_id, "Ignoring message from unknown source");
                None
            }
            RouteOutcome::Forward(decision) => {
                info!(
                    source = %decision.source,
                    destinations = decision.destinations.len(),
                    "Relaying message"
                );
                Some(self.dispatcher.dispatch(&decision).await)
            }
        }
    }
}

/// Run the relay loop until every transport has dropped its sender.
pub async fn run_relay_loop(relay: Arc<Relay>, mut event_rx: mpsc::UnboundedReceiver<RelayEvent>) {
    info!("Starting relay loop");

    while let Some(event) = event_rx.recv().await {
        relay.handle_event(event).await;
    }

    warn!("Relay loop ended");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::router::Router;
    use crate::bridge::testing::{CallLog, RecordingTelegram, RecordingXmpp};
    use crate::config::types::{Config, DEFAULT_NICK};

    const IRC: &str = "irc@conference.example.org";
    const XMPP: &str = "hasi@conference.example.org";
    const TG: &str = "-1001234567";

    fn make_test_config() -> Config {
        Config {
            jid: "hasibot@example.org".to_string(),
            pw: "secret".to_string(),
            irc: IRC.to_string(),
            xmpp: XMPP.to_string(),
            tg_chat: Some(-1001234567),
            tg_token: Some("123:abc".to_string()),
            ignore: vec!["spammerbot".to_string()],
            nick: DEFAULT_NICK.to_string(),
            bridge_tags: Vec::new(),
        }
    }

    fn make_relay(log: &CallLog, failing: &[&str]) -> Relay {
        let router = Arc::new(Router::from_config(&make_test_config()).unwrap());
        let dispatcher = Dispatcher::new(
            Arc::new(RecordingXmpp::new(log.clone(), failing)),
            Some(Arc::new(RecordingTelegram::new(log.clone(), failing))),
        );
        Relay::new(router, dispatcher)
    }

    #[tokio::test]
    async fn test_irc_message_reaches_xmpp_and_telegram() {
        let log = CallLog::default();
        let relay = make_relay(&log, &[]);

        let report = relay
            .handle_inbound(&InboundEvent::new(IRC, "alice", "hi"))
            .await
            .unwrap();

        assert!(report.all_succeeded());
        assert_eq!(
            log.calls(),
            vec![
                format!("xmpp:send:{}:<alice> hi", XMPP),
                format!("telegram:send:{}:<alice> hi", TG),
            ]
        );
    }

    #[tokio::test]
    async fn test_loop_guard_sends_nothing() {
        let log = CallLog::default();
        let relay = make_relay(&log, &[]);

        let report = relay
            .handle_inbound(&InboundEvent::new(XMPP, "hasibot", "<bob> hey"))
            .await;

        assert!(report.is_none());
        assert!(log.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_source_sends_nothing() {
        let log = CallLog::default();
        let relay = make_relay(&log, &[]);

        let report = relay
            .handle_inbound(&InboundEvent::new("some-other-room", "carol", "x"))
            .await;

        assert!(report.is_none());
        assert!(log.calls().is_empty());
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_going() {
        let log = CallLog::default();
        let relay = make_relay(&log, &[IRC]);

        let report = relay
            .handle_inbound(&InboundEvent::new(TG, "@dora", "hallo"))
            .await
            .unwrap();

        assert_eq!(report.failed().count(), 1);
        assert_eq!(report.succeeded().map(|e| e.id.as_str()).collect::<Vec<_>>(), vec![XMPP]);
    }

    #[tokio::test]
    async fn test_inbound_event_with_failed_destination() {
        let log = CallLog::default();
        let relay = make_relay(&log, &[XMPP]);

        relay
            .handle_event(RelayEvent::Inbound(InboundEvent::new(IRC, "alice", "hi")))
            .await;

        assert_eq!(
            log.calls(),
            vec![
                format!("xmpp:send:{}:<alice> hi", XMPP),
                format!("telegram:send:{}:<alice> hi", TG),
            ]
        );
    }

    #[tokio::test]
    async fn test_online_event_joins_rooms() {
        let log = CallLog::default();
        let relay = make_relay(&log, &[]);

        relay.handle_event(RelayEvent::XmppOnline).await;

        assert_eq!(
            log.calls(),
            vec![
                format!("xmpp:join:{}:hasibot", IRC),
                format!("xmpp:join:{}:hasibot", XMPP),
            ]
        );
    }

    #[tokio::test]
    async fn test_relay_loop_drains_channel() {
        let log = CallLog::default();
        let relay = Arc::new(make_relay(&log, &[]));
        let (tx, rx) = mpsc::unbounded_channel();

        tx.send(RelayEvent::Inbound(InboundEvent::new(XMPP, "bob", "one"))).unwrap();
        tx.send(RelayEvent::Inbound(InboundEvent::new(IRC, "spammerbot", "ad"))).unwrap();
        tx.send(RelayEvent::Inbound(InboundEvent::new(IRC, "alice", "two"))).unwrap();
        drop(tx);

        run_relay_loop(relay, rx).await;

        assert_eq!(
            log.calls(),
            vec![
                format!("xmpp:send:{}:<bob> one", IRC),
                format!("telegram:send:{}:<bob> one", TG),
                format!("xmpp:send:{}:<alice> two", XMPP),
                format!("telegram:send:{}:<alice> two", TG),
            ]
        );
    }
}

//! XMPP session task and the transport handle used by the dispatcher.

use std::collections::{HashSet, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use backon::BackoffBuilder;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_xmpp::parsers::{BareJid, Element};
use tokio_xmpp::{AsyncClient, Event};
use tracing::{debug, error, info, warn};

use crate::bridge::channels::XmppChannels;
use crate::bridge::dispatch::XmppTransport;
use crate::common::error::{ConnectionError, TransportError, TransportResult};
use crate::common::messages::{RelayEvent, XmppCommand};
use crate::xmpp::stanza;

/// Queues sends and joins for the XMPP session task.
///
/// Commands wait in the queue while the session is offline and are flushed
/// once it is back.
#[derive(Debug, Clone)]
pub struct XmppHandle {
    command_tx: mpsc::UnboundedSender<XmppCommand>,
}

impl XmppHandle {
    pub fn new(command_tx: mpsc::UnboundedSender<XmppCommand>) -> Self {
        Self { command_tx }
    }

    fn queue(&self, command: XmppCommand) -> TransportResult<()> {
        self.command_tx
            .send(command)
            .map_err(|_| TransportError::ChannelClosed { transport: "xmpp" })
    }
}

#[async_trait]
impl XmppTransport for XmppHandle {
    async fn send_groupchat_message(&self, room: &str, body: &str) -> TransportResult<()> {
        self.queue(XmppCommand::SendGroupChat {
            room: room.to_string(),
            body: body.to_string(),
        })
    }

    async fn join_room(&self, room: &str, nick: &str) -> TransportResult<()> {
        self.queue(XmppCommand::JoinRoom {
            room: room.to_string(),
            nick: nick.to_string(),
        })
    }
}

/// How a single connection ended.
#[derive(Debug)]
enum SessionEnd {
    Shutdown,
    Disconnected(String),
}

/// Exponential backoff between sessions.
/// 5s initial, 5min max, factor 1.5, with jitter, unlimited retries.
fn session_backoff() -> impl Iterator<Item = Duration> {
    backon::ExponentialBuilder::default()
        .with_min_delay(Duration::from_secs(5))
        .with_max_delay(Duration::from_secs(300))
        .with_factor(1.5)
        .with_jitter()
        .without_max_times()
        .build()
}

/// Orders queued commands so no room sees a message before the bot's join.
///
/// Each time a session comes online every bridged room must be joined
/// again. Group-chat sends are held until a join has gone out for all of
/// them; joins always pass straight through. Held sends survive a
/// disconnect and go out after the next round of joins.
#[derive(Debug)]
struct JoinGate {
    rooms: Vec<String>,
    awaiting: HashSet<String>,
    held: VecDeque<XmppCommand>,
}

impl JoinGate {
    fn new(rooms: Vec<String>) -> Self {
        let awaiting = rooms.iter().cloned().collect();
        Self {
            rooms,
            awaiting,
            held: VecDeque::new(),
        }
    }

    /// A new session is up; every room has to be joined again.
    fn session_started(&mut self) {
        self.awaiting = self.rooms.iter().cloned().collect();
    }

    fn is_open(&self) -> bool {
        self.awaiting.is_empty()
    }

    /// Commands to write now, in order.
    fn admit(&mut self, command: XmppCommand) -> Vec<XmppCommand> {
        match command {
            XmppCommand::JoinRoom { ref room, .. } => {
                self.awaiting.remove(room);
                let mut ready = vec![command];
                if self.is_open() {
                    ready.extend(self.held.drain(..));
                }
                ready
            }
            XmppCommand::SendGroupChat { .. } if !self.is_open() => {
                self.held.push_back(command);
                Vec::new()
            }
            XmppCommand::SendGroupChat { .. } => vec![command],
        }
    }
}

/// Owns the XMPP connection: pumps stanzas in, commands out.
pub struct XmppClient {
    jid: BareJid,
    password: String,
    channels: XmppChannels,
    gate: JoinGate,
}

impl XmppClient {
    /// `rooms` are the MUCs joined on every session start; sends wait for them.
    pub fn new(
        jid: &str,
        password: impl Into<String>,
        rooms: Vec<String>,
        channels: XmppChannels,
    ) -> Result<Self, ConnectionError> {
        let parsed = jid.parse::<BareJid>().map_err(|e| ConnectionError::InvalidJid {
            jid: jid.to_string(),
            message: e.to_string(),
        })?;

        Ok(Self {
            jid: parsed,
            password: password.into(),
            channels,
            gate: JoinGate::new(rooms),
        })
    }

    /// Run sessions until shutdown.
    ///
    /// Failing before the first session comes online is fatal; later
    /// disconnects are retried with backoff.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        let mut backoff = session_backoff();
        let mut has_been_online = false;

        loop {
            info!(jid = %self.jid, "Connecting to XMPP server...");
            let (was_online, end) = self.run_session().await;

            let reason = match end {
                SessionEnd::Shutdown => {
                    info!("XMPP session closed");
                    return Ok(());
                }
                SessionEnd::Disconnected(reason) => reason,
            };

            if was_online {
                has_been_online = true;
                backoff = session_backoff();
            }
            if !has_been_online {
                return Err(ConnectionError::XmppStartup { message: reason });
            }

            let delay = backoff.next().unwrap_or(Duration::from_secs(300));
            warn!(reason = %reason, "XMPP disconnected, reconnecting in {:.1} seconds...", delay.as_secs_f64());

            tokio::select! {
                _ = tokio::time::sleep(delay) => {},
                changed = self.channels.shutdown_rx.changed() => {
                    if changed.is_err() || *self.channels.shutdown_rx.borrow() {
                        info!("Shutdown signal received during backoff");
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Run one connection. Returns whether it ever came online and why it ended.
    async fn run_session(&mut self) -> (bool, SessionEnd) {
        let mut client = AsyncClient::new(self.jid.clone(), self.password.clone());
        client.set_reconnect(false);
        let mut online = false;

        loop {
            tokio::select! {
                event = client.next() => match event {
                    Some(Event::Online { bound_jid, .. }) => {
                        online = true;
                        self.gate.session_started();
                        info!(jid = %bound_jid, "XMPP session started");
                        if let Err(e) = client.send_stanza(stanza::initial_presence()).await {
                            warn!(error = %e, "Failed to send initial presence");
                        }
                        if let Err(e) = self.channels.event_tx.send(RelayEvent::XmppOnline) {
                            warn!("Failed to notify relay about XMPP session: {}", e);
                        }
                    }
                    Some(Event::Stanza(element)) => self.on_stanza(&element),
                    Some(Event::Disconnected(e)) => {
                        return (online, SessionEnd::Disconnected(e.to_string()));
                    }
                    None => {
                        return (online, SessionEnd::Disconnected("stream ended".to_string()));
                    }
                },
                Some(command) = self.channels.command_rx.recv(), if online => {
                    for command in self.gate.admit(command) {
                        if let Err(e) = client.send_stanza(command_stanza(&command)).await {
                            error!(command = ?command, error = %e, "Failed to send XMPP stanza");
                        }
                    }
                }
                changed = self.channels.shutdown_rx.changed() => {
                    if changed.is_err() || *self.channels.shutdown_rx.borrow() {
                        info!("Shutdown signal received - leaving rooms");
                        if online {
                            if let Err(e) = client.send_stanza(stanza::unavailable_presence()).await {
                                warn!(error = %e, "Failed to send unavailable presence");
                            }
                        }
                        return (online, SessionEnd::Shutdown);
                    }
                }
            }
        }
    }

    fn on_stanza(&self, element: &Element) {
        match stanza::parse_groupchat(element) {
            Some(event) => {
                debug!(room = %event.source_endpoint_id, nick = %event.author_display_name, "Groupchat message");
                if let Err(e) = self.channels.event_tx.send(RelayEvent::Inbound(event)) {
                    warn!("Failed to send message to relay: {}", e);
                }
            }
            None if element.attr("type") == Some("error") => {
                warn!(name = element.name(), from = ?element.attr("from"), stanza = ?element, "XMPP error stanza");
            }
            None => debug!(name = element.name(), "Ignoring stanza"),
        }
    }
}

/// Stanza for a queued command.
fn command_stanza(command: &XmppCommand) -> Element {
    match command {
        XmppCommand::SendGroupChat { room, body } => stanza::groupchat_message(room, body),
        XmppCommand::JoinRoom { room, nick } => stanza::muc_join(room, nick),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::bridge::testing::{CallLog, RecordingTelegram};
    use crate::bridge::{Dispatcher, Relay, Router};
    use crate::common::messages::InboundEvent;
    use crate::config::types::{Config, DEFAULT_NICK};

    const IRC: &str = "irc@conference.example.org";
    const XMPP: &str = "hasi@conference.example.org";

    fn join(room: &str) -> XmppCommand {
        XmppCommand::JoinRoom {
            room: room.to_string(),
            nick: DEFAULT_NICK.to_string(),
        }
    }

    fn send(room: &str, body: &str) -> XmppCommand {
        XmppCommand::SendGroupChat {
            room: room.to_string(),
            body: body.to_string(),
        }
    }

    fn online_gate() -> JoinGate {
        let mut gate = JoinGate::new(vec![IRC.to_string(), XMPP.to_string()]);
        gate.session_started();
        gate
    }

    #[test]
    fn test_gate_holds_sends_until_all_rooms_joined() {
        let mut gate = online_gate();

        assert!(gate.admit(send(IRC, "<alice> one")).is_empty());
        assert_eq!(gate.admit(join(IRC)), vec![join(IRC)]);
        assert!(gate.admit(send(XMPP, "<alice> two")).is_empty());
        assert_eq!(
            gate.admit(join(XMPP)),
            vec![join(XMPP), send(IRC, "<alice> one"), send(XMPP, "<alice> two")]
        );
        assert_eq!(gate.admit(send(IRC, "<bob> three")), vec![send(IRC, "<bob> three")]);
    }

    #[test]
    fn test_gate_closes_again_on_reconnect() {
        let mut gate = online_gate();
        gate.admit(join(IRC));
        gate.admit(join(XMPP));
        assert!(gate.is_open());

        gate.session_started();

        assert!(!gate.is_open());
        assert!(gate.admit(send(IRC, "<alice> hi")).is_empty());
    }

    #[test]
    fn test_gate_without_rooms_is_open() {
        let mut gate = JoinGate::new(Vec::new());
        gate.session_started();

        assert_eq!(gate.admit(send(IRC, "x")), vec![send(IRC, "x")]);
    }

    #[tokio::test]
    async fn test_joins_written_before_messages_queued_while_offline() {
        let config = Config {
            jid: "hasibot@example.org".to_string(),
            pw: "secret".to_string(),
            irc: IRC.to_string(),
            xmpp: XMPP.to_string(),
            tg_chat: Some(-1001234567),
            tg_token: Some("123:abc".to_string()),
            ignore: Vec::new(),
            nick: DEFAULT_NICK.to_string(),
            bridge_tags: Vec::new(),
        };
        let router = Arc::new(Router::from_config(&config).unwrap());
        let rooms: Vec<String> = router.registry().xmpp_rooms().map(|e| e.id.clone()).collect();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let dispatcher = Dispatcher::new(
            Arc::new(XmppHandle::new(tx)),
            Some(Arc::new(RecordingTelegram::new(CallLog::default(), &[]))),
        );
        let relay = Relay::new(router, dispatcher);

        // Telegram message arrives before the XMPP session is up
        relay
            .handle_event(RelayEvent::Inbound(InboundEvent::new("-1001234567", "@dora", "hallo")))
            .await;
        relay.handle_event(RelayEvent::XmppOnline).await;

        let mut gate = JoinGate::new(rooms);
        gate.session_started();
        let mut written = Vec::new();
        while let Ok(command) = rx.try_recv() {
            written.extend(gate.admit(command));
        }

        assert_eq!(
            written,
            vec![
                join(IRC),
                join(XMPP),
                send(IRC, "<@dora> hallo"),
                send(XMPP, "<@dora> hallo"),
            ]
        );
    }

    #[tokio::test]
    async fn test_handle_queues_commands() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = XmppHandle::new(tx);

        handle.join_room("irc@conference.example.org", "hasibot").await.unwrap();
        handle
            .send_groupchat_message("irc@conference.example.org", "<alice> hi")
            .await
            .unwrap();

        assert_eq!(
            rx.recv().await,
            Some(XmppCommand::JoinRoom {
                room: "irc@conference.example.org".to_string(),
                nick: "hasibot".to_string(),
            })
        );
        assert_eq!(
            rx.recv().await,
            Some(XmppCommand::SendGroupChat {
                room: "irc@conference.example.org".to_string(),
                body: "<alice> hi".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn test_handle_reports_closed_session() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let handle = XmppHandle::new(tx);

        let result = handle.send_groupchat_message("irc@conference.example.org", "x").await;
        assert_eq!(result, Err(TransportError::ChannelClosed { transport: "xmpp" }));
    }

    #[test]
    fn test_invalid_jid_rejected() {
        let channels = crate::bridge::ChannelBundle::new().xmpp;
        assert!(XmppClient::new("hasibot@", "pw", Vec::new(), channels).is_err());
    }

    #[test]
    fn test_command_stanza() {
        let join = command_stanza(&XmppCommand::JoinRoom {
            room: "hasi@conference.example.org".to_string(),
            nick: "hasibot".to_string(),
        });
        assert_eq!(join.name(), "presence");
        assert_eq!(join.attr("to"), Some("hasi@conference.example.org/hasibot"));

        let send = command_stanza(&XmppCommand::SendGroupChat {
            room: "hasi@conference.example.org".to_string(),
            body: "<alice> hi".to_string(),
        });
        assert_eq!(send.name(), "message");
        assert_eq!(send.attr("type"), Some("groupchat"));
    }
}

//! Canonical message types for relay communication.
//!
//! Both transports normalize what they receive into these types before
//! anything reaches the router.

/// One message received from a bridged endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    /// Native identifier of the room/chat the message arrived in.
    pub source_endpoint_id: String,
    /// Nickname (XMPP/IRC) or display name (Telegram) of the author.
    pub author_display_name: String,
    /// Plain message text.
    pub body_text: String,
}

impl InboundEvent {
    pub fn new(
        source_endpoint_id: impl Into<String>,
        author_display_name: impl Into<String>,
        body_text: impl Into<String>,
    ) -> Self {
        Self {
            source_endpoint_id: source_endpoint_id.into(),
            author_display_name: author_display_name.into(),
            body_text: body_text.into(),
        }
    }
}

/// Events delivered from the transports to the relay loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEvent {
    /// A chat message that may need relaying.
    Inbound(InboundEvent),
    /// The XMPP session (re)connected and rooms must be joined.
    XmppOnline,
}

/// Requests queued to the XMPP session task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmppCommand {
    /// Send a groupchat message to a room.
    SendGroupChat { room: String, body: String },
    /// Join a MUC under the given nickname.
    JoinRoom { room: String, nick: String },
}

//! Building and reading the few stanzas the relay needs.

use tokio_xmpp::parsers::Element;

use crate::common::messages::InboundEvent;

pub const NS_CLIENT: &str = "jabber:client";
pub const NS_MUC: &str = "http://jabber.org/protocol/muc";
pub const NS_DELAY: &str = "urn:xmpp:delay";

/// Initial `<presence/>` broadcast after login.
pub fn initial_presence() -> Element {
    Element::builder("presence", NS_CLIENT).build()
}

/// `<presence type="unavailable"/>` sent before disconnecting.
pub fn unavailable_presence() -> Element {
    Element::builder("presence", NS_CLIENT)
        .attr("type", "unavailable".to_string())
        .build()
}

/// MUC join presence; asks the room not to replay its history.
pub fn muc_join(room: &str, nick: &str) -> Element {
    let history = Element::builder("history", NS_MUC)
        .attr("maxstanzas", "0".to_string())
        .build();
    let muc = Element::builder("x", NS_MUC).append(history).build();

    Element::builder("presence", NS_CLIENT)
        .attr("to", format!("{}/{}", room, nick))
        .append(muc)
        .build()
}

/// A `type="groupchat"` message to `room`.
pub fn groupchat_message(room: &str, body: &str) -> Element {
    let body = Element::builder("body", NS_CLIENT)
        .append(body.to_string())
        .build();

    Element::builder("message", NS_CLIENT)
        .attr("to", room.to_string())
        .attr("type", "groupchat".to_string())
        .append(body)
        .build()
}

/// Split an occupant JID `room@server/nick` into room and nick.
///
/// Returns `None` for the room's own bare JID (server messages).
pub fn split_occupant_jid(from: &str) -> Option<(&str, &str)> {
    let (room, nick) = from.split_once('/')?;
    if room.is_empty() || nick.is_empty() {
        return None;
    }
    Some((room, nick))
}

/// Turn a groupchat message stanza into an inbound event.
///
/// Skips non-groupchat messages, bodiless messages (subject changes, chat
/// states), delayed history and messages sent by the room itself.
pub fn parse_groupchat(stanza: &Element) -> Option<InboundEvent> {
    if !stanza.is("message", NS_CLIENT) || stanza.attr("type") != Some("groupchat") {
        return None;
    }
    if stanza.has_child("delay", NS_DELAY) {
        return None;
    }

    let body = stanza.get_child("body", NS_CLIENT)?.text();
    let (room, nick) = split_occupant_jid(stanza.attr("from")?)?;

    Some(InboundEvent::new(room, nick, body))
}

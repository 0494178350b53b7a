//! Configuration type definitions.

use serde::Deserialize;

/// Nickname used in the rooms when none is configured.
pub const DEFAULT_NICK: &str = "hasibot";

/// Root configuration structure.
///
/// Keys are flat to stay compatible with existing `hasibot.yaml` files.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// The bot's JID on the XMPP server.
    pub jid: String,
    /// The bot's XMPP password.
    pub pw: String,
    /// JID of the MUC that maps to the IRC channel.
    pub irc: String,
    /// JID of the native XMPP MUC.
    pub xmpp: String,
    /// Telegram group chat id. Absent in the two-way (XMPP only) setup.
    pub tg_chat: Option<i64>,
    /// Telegram bot API token.
    pub tg_token: Option<String>,
    /// Nicknames whose messages are never relayed.
    #[serde(default)]
    pub ignore: Vec<String>,
    /// Nickname the bot joins the rooms with.
    #[serde(default = "default_nick")]
    pub nick: String,
    /// Names of external relay bots whose `<name>` tag is stripped before
    /// re-forwarding (two-way setup only).
    #[serde(default)]
    pub bridge_tags: Vec<String>,
}

fn default_nick() -> String {
    DEFAULT_NICK.to_string()
}

impl Config {
    /// Whether Telegram is part of this bridge.
    pub fn telegram_enabled(&self) -> bool {
        self.tg_chat.is_some() && self.tg_token.is_some()
    }
}

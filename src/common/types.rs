//! Shared types used across the application.

use std::fmt;

/// Logical network role of a bridged endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// XMPP MUC that the server maps onto the IRC channel.
    IrcMuc,
    /// Native XMPP MUC.
    XmppMuc,
    /// Telegram group chat.
    TelegramChat,
}

impl Role {
    /// The transport that owns sends to endpoints of this role.
    pub fn network(&self) -> Network {
        match self {
            Self::IrcMuc | Self::XmppMuc => Network::Xmpp,
            Self::TelegramChat => Network::Telegram,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::IrcMuc => "irc",
            Self::XmppMuc => "xmpp",
            Self::TelegramChat => "telegram",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Transport client family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Network {
    Xmpp,
    Telegram,
}

/// One bridged room or chat.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    /// Native identifier: bare room JID, or the Telegram chat id in decimal.
    pub id: String,
    pub role: Role,
}

impl Endpoint {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.role)
    }
}

//! Recording transports for dispatcher and relay tests.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::bridge::dispatch::{TelegramTransport, XmppTransport};
use crate::common::error::{TransportError, TransportResult};

/// Ordered log of every transport call, shared between mocks.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, entry: String) {
        self.0.lock().unwrap().push(entry);
    }

    pub fn calls(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// XMPP mock; sends and joins for `failing` rooms return an error.
pub struct RecordingXmpp {
    log: CallLog,
    failing: HashSet<String>,
}

impl RecordingXmpp {
    pub fn new(log: CallLog, failing: &[&str]) -> Self {
        Self {
            log,
            failing: failing.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[async_trait]
impl XmppTransport for RecordingXmpp {
    async fn send_groupchat_message(&self, room: &str, body: &str) -> TransportResult<()> {
        self.log.push(format!("xmpp:send:{}:{}", room, body));
        if self.failing.contains(room) {
            return Err(TransportError::ChannelClosed { transport: "xmpp" });
        }
        Ok(())
    }

    async fn join_room(&self, room: &str, nick: &str) -> TransportResult<()> {
        self.log.push(format!("xmpp:join:{}:{}", room, nick));
        if self.failing.contains(room) {
            return Err(TransportError::ChannelClosed { transport: "xmpp" });
        }
        Ok(())
    }
}

/// Telegram mock; sends to `failing` chats return an error.
pub struct RecordingTelegram {
    log: CallLog,
    failing: HashSet<String>,
}

impl RecordingTelegram {
    pub fn new(log: CallLog, failing: &[&str]) -> Self {
        Self {
            log,
            failing: failing.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[async_trait]
impl TelegramTransport for RecordingTelegram {
    async fn send_message(&self, chat_id: &str, body: &str) -> TransportResult<()> {
        self.log.push(format!("telegram:send:{}:{}", chat_id, body));
        if self.failing.contains(chat_id) {
            return Err(TransportError::Telegram {
                message: "Bad Request: chat not found".to_string(),
            });
        }
        Ok(())
    }
}

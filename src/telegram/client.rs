//! Telegram long-polling task and the transport handle used by the dispatcher.

use async_trait::async_trait;
use teloxide::prelude::*;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::bridge::dispatch::TelegramTransport;
use crate::common::error::{ConnectionError, TransportError, TransportResult};
use crate::common::messages::{InboundEvent, RelayEvent};
use crate::common::types::Role;

/// Stay below Telegram's 4096 character message limit.
const MAX_MESSAGE_LEN: usize = 4000;

/// A verified bot session.
pub struct TelegramClient {
    bot: Bot,
}

impl TelegramClient {
    /// Create the bot and verify the token with `getMe`.
    pub async fn connect(token: &str) -> Result<Self, ConnectionError> {
        let bot = Bot::new(token);
        let me = bot.get_me().await.map_err(|e| ConnectionError::TelegramStartup {
            message: e.to_string(),
        })?;

        info!(
            username = me.user.username.as_deref().unwrap_or_default(),
            "Telegram bot authenticated"
        );
        Ok(Self { bot })
    }

    /// Handle for sending to chats; usable while `run` is polling.
    pub fn handle(&self) -> TelegramHandle {
        TelegramHandle { bot: self.bot.clone() }
    }

    /// Long-poll updates and push text messages to the relay.
    pub async fn run(self, event_tx: mpsc::UnboundedSender<RelayEvent>) {
        info!("Starting Telegram polling...");

        let handler = Update::filter_message().endpoint(handle_message);

        Dispatcher::builder(self.bot, handler)
            .dependencies(dptree::deps![event_tx])
            .default_handler(|upd| async move {
                debug!("Unhandled update: {:?}", upd.id);
            })
            .error_handler(LoggingErrorHandler::with_custom_text("telegram"))
            .build()
            .dispatch()
            .await;

        warn!("Telegram polling ended");
    }
}

async fn handle_message(msg: Message, event_tx: mpsc::UnboundedSender<RelayEvent>) -> ResponseResult<()> {
    let Some(event) = to_inbound(&msg) else {
        return Ok(());
    };

    debug!(chat = %event.source_endpoint_id, author = %event.author_display_name, "Telegram message");
    if let Err(e) = event_tx.send(RelayEvent::Inbound(event)) {
        warn!("Failed to send message to relay: {}", e);
    }
    Ok(())
}

/// Text messages with a sender become inbound events; everything else is dropped.
fn to_inbound(msg: &Message) -> Option<InboundEvent> {
    let text = msg.text()?;
    let user = msg.from.as_ref()?;
    let author = display_name(user.username.as_deref(), &user.full_name());

    Some(InboundEvent::new(msg.chat.id.0.to_string(), author, text))
}

/// `@username` when the user has one, otherwise the full name.
fn display_name(username: Option<&str>, full_name: &str) -> String {
    match username {
        Some(name) if !name.is_empty() => format!("@{}", name),
        _ => full_name.to_string(),
    }
}

/// Split a body into chunks of at most `max_len` bytes.
///
/// Cuts after the last newline or space inside the window when there is one.
/// A character wider than `max_len` still makes up a chunk of its own.
fn split_message(text: &str, max_len: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut rest = text;

    while rest.len() > max_len {
        let mut end = max_len;
        while !rest.is_char_boundary(end) {
            end -= 1;
        }
        let mut cut = rest[..end]
            .rfind('\n')
            .or_else(|| rest[..end].rfind(' '))
            .map(|pos| pos + 1)
            .unwrap_or(end);
        if cut == 0 {
            cut = rest.chars().next().map_or(rest.len(), char::len_utf8);
        }

        let (chunk, tail) = rest.split_at(cut);
        chunks.push(chunk);
        rest = tail;
    }

    if !rest.is_empty() || chunks.is_empty() {
        chunks.push(rest);
    }
    chunks
}

fn parse_chat_id(chat_id: &str) -> TransportResult<ChatId> {
    chat_id
        .parse::<i64>()
        .map(ChatId)
        .map_err(|_| TransportError::InvalidEndpoint {
            id: chat_id.to_string(),
            role: Role::TelegramChat,
        })
}

/// Sends chat messages through the Bot API.
#[derive(Clone)]
pub struct TelegramHandle {
    bot: Bot,
}

#[async_trait]
impl TelegramTransport for TelegramHandle {
    async fn send_message(&self, chat_id: &str, body: &str) -> TransportResult<()> {
        let chat = parse_chat_id(chat_id)?;

        for chunk in split_message(body, MAX_MESSAGE_LEN) {
            self.bot
                .send_message(chat, chunk)
                .await
                .map_err(|e| TransportError::Telegram { message: e.to_string() })?;
        }
        Ok(())
    }
}

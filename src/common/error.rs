//! Error types for the application.

use thiserror::Error;

use crate::common::types::Role;

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {message}")]
    ParseError { message: String },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },

    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Errors raised while establishing a transport session.
///
/// These are fatal at startup; later disconnects are handled by the
/// transport's own reconnect loop.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Invalid JID '{jid}': {message}")]
    InvalidJid { jid: String, message: String },

    #[error("XMPP session failed before coming online: {message}")]
    XmppStartup { message: String },

    #[error("Telegram login failed: {message}")]
    TelegramStartup { message: String },
}

/// A failed send to a single destination.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("{transport} transport is gone (channel closed)")]
    ChannelClosed { transport: &'static str },

    #[error("No transport available for {role} endpoint")]
    Unavailable { role: Role },

    #[error("Endpoint id '{id}' is not valid for {role}")]
    InvalidEndpoint { id: String, role: Role },

    #[error("Telegram request failed: {message}")]
    Telegram { message: String },
}

/// Result type alias for transport sends.
pub type TransportResult<T> = std::result::Result<T, TransportError>;

//! Configuration validation.
//!
//! Validates configuration values and provides helpful error messages.

use crate::bridge::filter::KnownBridgeTag;
use crate::common::error::ConfigError;
use crate::config::types::Config;

/// Placeholder token shipped in the example configuration.
const PLACEHOLDER_TOKEN: &str = "YOUR_TELEGRAM_TOKEN_HERE";

/// Validate a configuration and return detailed errors.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    // XMPP account
    if config.jid.is_empty() {
        errors.push("jid is required".to_string());
    } else if !is_bare_jid(&config.jid) {
        errors.push(format!("jid '{}' must look like user@server", config.jid));
    }
    if config.pw.is_empty() {
        errors.push("pw is required".to_string());
    }

    // Rooms
    for (key, room) in [("irc", &config.irc), ("xmpp", &config.xmpp)] {
        if room.is_empty() {
            errors.push(format!("{} is required", key));
        } else if !is_bare_jid(room) {
            errors.push(format!("{} '{}' must be a bare room JID (room@conference.server)", key, room));
        }
    }
    if !config.irc.is_empty() && config.irc == config.xmpp {
        errors.push("irc and xmpp must be different rooms".to_string());
    }

    // Telegram
    match (&config.tg_chat, &config.tg_token) {
        (Some(_), None) => errors.push("tg_chat is set but tg_token is missing".to_string()),
        (None, Some(_)) => errors.push("tg_token is set but tg_chat is missing".to_string()),
        (Some(chat), Some(token)) => {
            if *chat == 0 {
                errors.push("tg_chat must be non-zero".to_string());
            }
            if token.is_empty() {
                errors.push("tg_token must not be empty".to_string());
            }
            if token == PLACEHOLDER_TOKEN {
                errors.push("tg_token has not been configured (still using placeholder)".to_string());
            }
        }
        (None, None) => {}
    }

    if config.nick.trim().is_empty() {
        errors.push("nick must not be empty".to_string());
    }

    for (i, nick) in config.ignore.iter().enumerate() {
        if nick.is_empty() {
            errors.push(format!("ignore[{}] is empty", i));
        }
    }

    for (i, name) in config.bridge_tags.iter().enumerate() {
        if name.is_empty() {
            errors.push(format!("bridge_tags[{}] is empty", i));
        }
    }
    if !config.bridge_tags.is_empty() {
        if let Err(e) = KnownBridgeTag::new(&config.bridge_tags) {
            errors.push(format!("bridge_tags cannot be compiled: {}", e));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError {
            message: errors.join("\n"),
        })
    }
}

/// Loose `local@domain` check without resource part.
fn is_bare_jid(jid: &str) -> bool {
    match jid.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !domain.contains('/') && !domain.contains('@')
        }
        None => false,
    }
}

//! Environment variable overrides for configuration.
//!
//! Supports overriding config values with environment variables:
//! - `HASIBOT_JID` - XMPP JID of the bot
//! - `HASIBOT_PW` - XMPP password
//! - `HASIBOT_TG_TOKEN` - Telegram bot token
//! - `HASIBOT_TG_CHAT` - Telegram group chat id

use std::env;

use crate::common::error::ConfigError;
use crate::config::types::Config;

/// Environment variable prefix for all config overrides.
pub const ENV_PREFIX: &str = "HASIBOT";

/// Apply environment variable overrides to a config.
///
/// Lets credentials stay out of the config file. A chat id that is not an
/// integer is rejected instead of falling back to the file value.
pub fn apply_env_overrides(mut config: Config) -> Result<Config, ConfigError> {
    if let Ok(jid) = env::var(format!("{}_JID", ENV_PREFIX)) {
        config.jid = jid;
    }
    if let Ok(pw) = env::var(format!("{}_PW", ENV_PREFIX)) {
        config.pw = pw;
    }

    if let Ok(token) = env::var(format!("{}_TG_TOKEN", ENV_PREFIX)) {
        config.tg_token = Some(token);
    }
    let chat_var = format!("{}_TG_CHAT", ENV_PREFIX);
    if let Ok(chat) = env::var(&chat_var) {
        config.tg_chat = Some(parse_chat_id(&chat_var, &chat)?);
    }

    Ok(config)
}

fn parse_chat_id(var: &str, value: &str) -> Result<i64, ConfigError> {
    value.trim().parse().map_err(|e| ConfigError::InvalidValue {
        field: var.to_string(),
        message: format!("'{}' is not a chat id: {}", value, e),
    })
}

/// Returns override variables that are set but empty.
pub fn check_empty_env_vars() -> Vec<String> {
    let vars = [
        format!("{}_JID", ENV_PREFIX),
        format!("{}_PW", ENV_PREFIX),
        format!("{}_TG_TOKEN", ENV_PREFIX),
    ];

    vars.into_iter()
        .filter(|var| env::var(var).map(|v| v.is_empty()).unwrap_or(false))
        .collect()
}

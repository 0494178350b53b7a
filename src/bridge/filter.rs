//! Body filters applied to rendered messages before they are relayed.
//!
//! The stock filter removes the `<name>` attribution that a known external
//! relay bot puts in front of the messages it forwards, so chained bridges
//! do not show `<ourbot> <relaybot> <alice> hi`.

use std::borrow::Cow;
use std::fmt;

use fancy_regex::Regex;
use thiserror::Error;
use tracing::warn;

/// Rewrites an already rendered message body.
pub trait BodyFilter: Send + Sync + fmt::Debug {
    /// Short name used in log lines.
    fn name(&self) -> &str;

    /// Returns the filtered body, borrowing when nothing changed.
    fn apply<'a>(&self, body: &'a str) -> Cow<'a, str>;
}

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("no bot names given")]
    NoNames,

    #[error("invalid pattern '{pattern}': {source}")]
    Regex {
        pattern: String,
        #[source]
        source: Box<fancy_regex::Error>,
    },
}

/// A compiled regex pattern with its original string for debugging.
#[derive(Debug, Clone)]
struct CompiledPattern {
    original: String,
    regex: Regex,
}

/// Strips leading `<name>` tags of known external relay bots.
///
/// A tag is `<`, optional non-word characters, one of the bot names,
/// optional digits, `>` and a space. Consecutive leading tags are removed
/// together, which makes the filter idempotent.
#[derive(Debug, Clone)]
pub struct KnownBridgeTag {
    bot_names: Vec<String>,
    pattern: CompiledPattern,
}

impl KnownBridgeTag {
    /// Build the filter for the given bot names. Empty names are skipped.
    pub fn new(bot_names: &[String]) -> Result<Self, FilterError> {
        let bot_names: Vec<String> = bot_names
            .iter()
            .filter(|name| !name.is_empty())
            .cloned()
            .collect();
        if bot_names.is_empty() {
            return Err(FilterError::NoNames);
        }

        let alternatives = bot_names
            .iter()
            .map(|name| fancy_regex::escape(name))
            .collect::<Vec<_>>()
            .join("|");
        let original = format!(r"^(?:<\W*(?:{})\d*> )+", alternatives);
        let regex = Regex::new(&original).map_err(|e| FilterError::Regex {
            pattern: original.clone(),
            source: Box::new(e),
        })?;

        Ok(Self {
            bot_names,
            pattern: CompiledPattern { original, regex },
        })
    }

    pub fn bot_names(&self) -> &[String] {
        &self.bot_names
    }
}

impl BodyFilter for KnownBridgeTag {
    fn name(&self) -> &str {
        "known-bridge-tag"
    }

    fn apply<'a>(&self, body: &'a str) -> Cow<'a, str> {
        match self.pattern.regex.find(body) {
            Ok(Some(m)) => Cow::Owned(body[m.end()..].to_string()),
            Ok(None) => Cow::Borrowed(body),
            Err(e) => {
                warn!("Regex match error for pattern '{}': {}", self.pattern.original, e);
                Cow::Borrowed(body)
            }
        }
    }
}

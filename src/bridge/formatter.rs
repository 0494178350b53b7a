//! Message formatting for relayed messages.
//!
//! Every relayed message is attributed IRC style: `<author> text`.
//! No escaping happens here; transports escape if their wire format needs it.

use std::sync::Arc;

use crate::bridge::filter::BodyFilter;

/// Render the attribution line for a relayed message.
pub fn format_message(author: &str, text: &str) -> String {
    format!("<{}> {}", author, text)
}

/// Formatter with an optional anti-double-tagging filter.
#[derive(Debug, Clone, Default)]
pub struct MessageFormatter {
    tag_filter: Option<Arc<dyn BodyFilter>>,
}

impl MessageFormatter {
    /// Create a formatter that only attributes.
    pub fn new() -> Self {
        Self { tag_filter: None }
    }

    /// Install the filter used by [`strip_known_bridge_tag`](Self::strip_known_bridge_tag).
    pub fn with_tag_filter(mut self, filter: Arc<dyn BodyFilter>) -> Self {
        self.tag_filter = Some(filter);
        self
    }

    #[cfg(test)]
    pub fn has_tag_filter(&self) -> bool {
        self.tag_filter.is_some()
    }

    /// Format `<author> text`.
    pub fn format(&self, author: &str, text: &str) -> String {
        format_message(author, text)
    }

    /// Remove known bridge tags from the start of `body`; no-op without a filter.
    pub fn strip_known_bridge_tag(&self, body: &str) -> String {
        match &self.tag_filter {
            Some(filter) => filter.apply(body).into_owned(),
            None => body.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::filter::KnownBridgeTag;

    fn with_relaybot() -> MessageFormatter {
        let filter = KnownBridgeTag::new(&["relaybot".to_string()]).unwrap();
        MessageFormatter::new().with_tag_filter(Arc::new(filter))
    }

    #[test]
    fn test_basic_format() {
        assert_eq!(format_message("alice", "hi"), "<alice> hi");
    }

    #[test]
    fn test_format_is_verbatim() {
        assert_eq!(
            format_message("bob", "*bold* <b>x</b> & @all"),
            "<bob> *bold* <b>x</b> & @all"
        );
    }

    #[test]
    fn test_format_starts_with_author_tag() {
        for (author, text) in [("alice", ""), ("@tg_user", "hi"), ("Jane Doe", "<x> y"), ("", "z")] {
            let out = format_message(author, text);
            assert!(out.starts_with(&format!("<{}>", author)), "{:?}", out);
        }
    }

    #[test]
    fn test_empty_text_still_renders() {
        assert_eq!(format_message("alice", ""), "<alice> ");
    }

    #[test]
    fn test_strip_without_filter_is_noop() {
        let formatter = MessageFormatter::new();
        assert!(!formatter.has_tag_filter());
        assert_eq!(formatter.strip_known_bridge_tag("<relaybot> <a> b"), "<relaybot> <a> b");
    }

    #[test]
    fn test_render_strips_relay_author() {
        let formatter = with_relaybot();
        let relayed = formatter.format("relaybot", "<alice> hi");
        assert_eq!(formatter.strip_known_bridge_tag(&relayed), "<alice> hi");
        let quoted = formatter.format("carol", "<alice> hi");
        assert_eq!(formatter.strip_known_bridge_tag(&quoted), "<carol> <alice> hi");
    }

    #[test]
    fn test_strip_is_idempotent() {
        let formatter = with_relaybot();
        let body = "<relaybot3> <relaybot> <alice> hi";
        let once = formatter.strip_known_bridge_tag(body);
        assert_eq!(once, "<alice> hi");
        assert_eq!(formatter.strip_known_bridge_tag(&once), once);
    }
}

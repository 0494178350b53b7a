//! Endpoint registry: which room/chat id plays which role.
//!
//! Built once from configuration and never modified afterwards.

use crate::common::error::ConfigError;
use crate::common::types::{Endpoint, Network, Role};
use crate::config::types::Config;

/// Immutable mapping from endpoint id to role.
///
/// Endpoints keep configuration order (IRC room, native room, Telegram
/// chat); destinations are attempted in that order.
#[derive(Debug, Clone)]
pub struct EndpointRegistry {
    endpoints: Vec<Endpoint>,
}

impl EndpointRegistry {
    /// Create a registry, rejecting duplicate roles or ids.
    pub fn new(endpoints: Vec<Endpoint>) -> Result<Self, ConfigError> {
        for (i, endpoint) in endpoints.iter().enumerate() {
            for other in &endpoints[..i] {
                if other.role == endpoint.role {
                    return Err(ConfigError::InvalidValue {
                        field: endpoint.role.to_string(),
                        message: "more than one endpoint configured for this role".to_string(),
                    });
                }
                if other.id == endpoint.id {
                    return Err(ConfigError::InvalidValue {
                        field: endpoint.role.to_string(),
                        message: format!("'{}' is already used by the {} endpoint", endpoint.id, other.role),
                    });
                }
            }
        }

        Ok(Self { endpoints })
    }

    /// Build the registry from the `irc`, `xmpp` and `tg_chat` keys.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let mut endpoints = vec![
            Endpoint::new(config.irc.clone(), Role::IrcMuc),
            Endpoint::new(config.xmpp.clone(), Role::XmppMuc),
        ];
        if let Some(chat) = config.tg_chat {
            endpoints.push(Endpoint::new(chat.to_string(), Role::TelegramChat));
        }

        Self::new(endpoints)
    }

    /// Look up an endpoint by exact id.
    pub fn resolve(&self, endpoint_id: &str) -> Option<&Endpoint> {
        self.endpoints.iter().find(|e| e.id == endpoint_id)
    }

    /// Look up the role of an endpoint id.
    pub fn resolve_role(&self, endpoint_id: &str) -> Option<Role> {
        self.resolve(endpoint_id).map(|e| e.role)
    }

    /// All endpoints in destination order.
    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.endpoints.iter().any(|e| e.role == role)
    }

    /// Rooms the XMPP session has to join.
    pub fn xmpp_rooms(&self) -> impl Iterator<Item = &Endpoint> {
        self.endpoints
            .iter()
            .filter(|e| e.role.network() == Network::Xmpp)
    }

    /// True for the XMPP-only setup without a Telegram chat.
    pub fn is_two_way(&self) -> bool {
        !self.has_role(Role::TelegramChat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::DEFAULT_NICK;

    fn make_config(tg_chat: Option<i64>) -> Config {
        Config {
            jid: "hasibot@example.org".to_string(),
            pw: "secret".to_string(),
            irc: "irc@conference.example.org".to_string(),
            xmpp: "hasi@conference.example.org".to_string(),
            tg_chat,
            tg_token: tg_chat.map(|_| "123:abc".to_string()),
            ignore: Vec::new(),
            nick: DEFAULT_NICK.to_string(),
            bridge_tags: Vec::new(),
        }
    }

    #[test]
    fn test_three_way_from_config() {
        let registry = EndpointRegistry::from_config(&make_config(Some(-10042))).unwrap();

        assert_eq!(registry.endpoints().len(), 3);
        assert_eq!(registry.resolve_role("irc@conference.example.org"), Some(Role::IrcMuc));
        assert_eq!(registry.resolve_role("hasi@conference.example.org"), Some(Role::XmppMuc));
        assert_eq!(registry.resolve_role("-10042"), Some(Role::TelegramChat));
        assert!(!registry.is_two_way());
    }

    #[test]
    fn test_two_way_from_config() {
        let registry = EndpointRegistry::from_config(&make_config(None)).unwrap();

        assert_eq!(registry.endpoints().len(), 2);
        assert!(registry.is_two_way());
        assert!(!registry.has_role(Role::TelegramChat));
    }

    #[test]
    fn test_lookup_is_exact() {
        let registry = EndpointRegistry::from_config(&make_config(Some(7))).unwrap();

        assert_eq!(registry.resolve_role("IRC@conference.example.org"), None);
        assert_eq!(registry.resolve_role("irc@conference.example.org/alice"), None);
        assert_eq!(registry.resolve_role("some-other-room"), None);
    }

    #[test]
    fn test_xmpp_rooms() {
        let registry = EndpointRegistry::from_config(&make_config(Some(7))).unwrap();
        let rooms: Vec<&str> = registry.xmpp_rooms().map(|e| e.id.as_str()).collect();

        assert_eq!(rooms, vec!["irc@conference.example.org", "hasi@conference.example.org"]);
    }

    #[test]
    fn test_duplicate_role_rejected() {
        let result = EndpointRegistry::new(vec![
            Endpoint::new("a@conf", Role::XmppMuc),
            Endpoint::new("b@conf", Role::XmppMuc),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let result = EndpointRegistry::new(vec![
            Endpoint::new("a@conf", Role::IrcMuc),
            Endpoint::new("a@conf", Role::XmppMuc),
        ]);
        assert!(result.unwrap_err().to_string().contains("already used"));
    }
}

//! Tool configuration loaded from environment variables.
//!
//! Store settings come from [`StoreConfig::from_env`]; the rest decides which
//! accounts exist while the list is loaded.

use roster_store::StoreConfig;

/// Tool configuration.
#[derive(Debug, Clone)]
pub struct ToolConfig {
    /// Location, debounce and tie-break settings of the list.
    pub store: StoreConfig,

    /// Accounts registered before loading, as `username/protocol` pairs.
    /// Env: `ROSTER_ACCOUNTS` (comma separated, e.g. `me@jabber.org/prpl-jabber`)
    /// Default: none
    pub accounts: Vec<(String, String)>,

    /// Register accounts found in the document that are not configured.
    /// Env: `ROSTER_ADOPT_ACCOUNTS` (true/false)
    /// Default: `true`
    pub adopt_accounts: bool,

    /// Treat every account as connected, so current counters are filled.
    /// Env: `ROSTER_CONNECT` (true/false)
    /// Default: `false`
    pub connect: bool,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            accounts: Vec::new(),
            adopt_accounts: true,
            connect: false,
        }
    }
}

impl ToolConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self {
            store: StoreConfig::from_env(),
            ..Self::default()
        };

        if let Ok(list) = std::env::var("ROSTER_ACCOUNTS") {
            config.accounts = parse_accounts(&list);
        }

        if let Ok(val) = std::env::var("ROSTER_ADOPT_ACCOUNTS") {
            config.adopt_accounts = val != "false" && val != "0";
        }

        if let Ok(val) = std::env::var("ROSTER_CONNECT") {
            config.connect = val != "false" && val != "0";
        }

        config
    }
}

/// Parse `user/proto,user/proto`. Entries without a protocol are skipped.
fn parse_accounts(list: &str) -> Vec<(String, String)> {
    list.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| match entry.rsplit_once('/') {
            Some((user, proto)) if !user.is_empty() && !proto.is_empty() => {
                Some((user.to_string(), proto.to_string()))
            }
            _ => {
                tracing::warn!(entry, "Ignoring account without a protocol");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ToolConfig::default();
        assert!(config.adopt_accounts);
        assert!(!config.connect);
        assert!(config.accounts.is_empty());
    }

    #[test]
    fn test_parse_accounts() {
        let accounts = parse_accounts(" me@jabber.org/Home/prpl-jabber, 1234/prpl-icq ,,");
        assert_eq!(
            accounts,
            vec![
                ("me@jabber.org/Home".to_string(), "prpl-jabber".to_string()),
                ("1234".to_string(), "prpl-icq".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_accounts_skips_incomplete() {
        assert!(parse_accounts("nobody,/prpl-irc,me/").is_empty());
    }
}

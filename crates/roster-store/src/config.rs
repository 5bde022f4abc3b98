//! Store configuration loaded from environment variables.
//!
//! Every setting has a default so the list works with zero configuration.

use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;

use roster_shared::constants::{AUTOSAVE_POLL_MS, BLIST_FILE_NAME, SAVE_DELAY_MS};

/// Buddy list store configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Directory holding the list file.
    /// Env: `ROSTER_DATA_DIR`
    /// Default: the platform data directory for `com.roster.roster`, or `.`.
    pub data_dir: PathBuf,

    /// File name of the list inside `data_dir`.
    /// Env: `ROSTER_BLIST_FILE`
    /// Default: `blist.xml`
    pub file_name: String,

    /// Delay between the first unsaved change and the write.
    /// Env: `ROSTER_SAVE_DELAY_MS`
    /// Default: `5000`
    pub save_delay: Duration,

    /// How often the autosave task checks for a due save.
    /// Env: `ROSTER_AUTOSAVE_POLL_MS`
    /// Default: `1000`
    pub autosave_poll: Duration,

    /// When two buddies of a contact rank equally, prefer the later one as
    /// the contact's priority buddy.
    /// Env: `ROSTER_CONTACT_LAST_MATCH` (true/false)
    /// Default: `false`
    pub contact_last_match: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir().unwrap_or_else(|| PathBuf::from(".")),
            file_name: BLIST_FILE_NAME.to_string(),
            save_delay: Duration::from_millis(SAVE_DELAY_MS),
            autosave_poll: Duration::from_millis(AUTOSAVE_POLL_MS),
            contact_last_match: false,
        }
    }
}

impl StoreConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(dir) = lookup("ROSTER_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }

        if let Some(name) = lookup("ROSTER_BLIST_FILE") {
            if name.is_empty() {
                tracing::warn!("Empty ROSTER_BLIST_FILE, using default");
            } else {
                config.file_name = name;
            }
        }

        if let Some(val) = lookup("ROSTER_SAVE_DELAY_MS") {
            match val.parse::<u64>() {
                Ok(ms) => config.save_delay = Duration::from_millis(ms),
                Err(_) => tracing::warn!(value = %val, "Invalid ROSTER_SAVE_DELAY_MS, using default"),
            }
        }

        if let Some(val) = lookup("ROSTER_AUTOSAVE_POLL_MS") {
            match val.parse::<u64>() {
                Ok(ms) if ms > 0 => config.autosave_poll = Duration::from_millis(ms),
                _ => tracing::warn!(value = %val, "Invalid ROSTER_AUTOSAVE_POLL_MS, using default"),
            }
        }

        if let Some(val) = lookup("ROSTER_CONTACT_LAST_MATCH") {
            config.contact_last_match = val != "false" && val != "0";
        }

        config
    }

    /// Full path of the list file.
    pub fn blist_path(&self) -> PathBuf {
        self.data_dir.join(&self.file_name)
    }
}

fn default_data_dir() -> Option<PathBuf> {
    ProjectDirs::from("com", "roster", "roster").map(|dirs| dirs.data_dir().to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = StoreConfig::default();
        assert_eq!(config.file_name, "blist.xml");
        assert_eq!(config.save_delay, Duration::from_secs(5));
        assert!(!config.contact_last_match);
        assert!(config.blist_path().ends_with("blist.xml"));
    }

    #[test]
    fn test_overrides() {
        let config = StoreConfig::from_lookup(lookup(&[
            ("ROSTER_DATA_DIR", "/tmp/roster"),
            ("ROSTER_BLIST_FILE", "list.xml"),
            ("ROSTER_SAVE_DELAY_MS", "250"),
            ("ROSTER_CONTACT_LAST_MATCH", "1"),
        ]));
        assert_eq!(config.blist_path(), PathBuf::from("/tmp/roster/list.xml"));
        assert_eq!(config.save_delay, Duration::from_millis(250));
        assert!(config.contact_last_match);
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let config = StoreConfig::from_lookup(lookup(&[
            ("ROSTER_SAVE_DELAY_MS", "soon"),
            ("ROSTER_AUTOSAVE_POLL_MS", "0"),
            ("ROSTER_BLIST_FILE", ""),
        ]));
        assert_eq!(config.save_delay, Duration::from_millis(SAVE_DELAY_MS));
        assert_eq!(config.autosave_poll, Duration::from_millis(AUTOSAVE_POLL_MS));
        assert_eq!(config.file_name, BLIST_FILE_NAME);
    }
}

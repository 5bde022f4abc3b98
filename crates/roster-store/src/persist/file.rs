//! Reading and writing the list file, and the debounced flush.

use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, error, info};

use roster_shared::Accounts;

use crate::error::{Result, StoreError};
use crate::list::BuddyList;

impl<A: Accounts> BuddyList<A> {
    /// Load the list from the configured path.
    pub fn load(&mut self) -> Result<()> {
        let path = self.config.blist_path();
        self.load_from(&path)
    }

    /// Load the list from `path`. A missing file is a first run: the list
    /// stays empty and is marked loaded.
    pub fn load_from(&mut self, path: &Path) -> Result<()> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "No buddy list file yet, starting empty");
                self.save.clear();
                self.loaded = true;
                return Ok(());
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to read buddy list");
                return Err(e.into());
            }
        };

        if let Err(e) = self.load_xml(&text) {
            error!(path = %path.display(), error = %e, "Failed to parse buddy list");
            return Err(e);
        }
        info!(
            path = %path.display(),
            groups = self.groups().count(),
            buddies = self.buddy_index.len(),
            "Buddy list loaded"
        );
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Whether a change is waiting to be written.
    pub fn save_pending(&self) -> bool {
        self.save.is_pending()
    }

    /// Write the list to the configured path now.
    pub fn save(&mut self) -> Result<()> {
        let path = self.config.blist_path();
        self.save_to(&path)
    }

    /// Write the list to `path`, replacing the file atomically.
    pub fn save_to(&mut self, path: &Path) -> Result<()> {
        if !self.loaded {
            return Err(StoreError::NotLoaded);
        }
        let text = self.to_xml()?;
        write_atomic(path, &text)?;
        self.save.clear();
        info!(path = %path.display(), bytes = text.len(), "Buddy list saved");
        Ok(())
    }

    /// Write any pending change immediately. Returns whether a write happened.
    pub fn flush(&mut self) -> Result<bool> {
        if !self.save.is_pending() {
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }

    /// Write if the save deadline has passed at `now`.
    pub fn flush_if_due(&mut self, now: Instant) -> Result<bool> {
        if !self.save.is_due(now) {
            return Ok(false);
        }
        debug!("Save deadline reached");
        self.save()?;
        Ok(true)
    }
}

fn write_atomic(path: &Path, text: &str) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let tmp = temp_path(path);
    std::fs::write(&tmp, text)?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".save");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::StoreConfig;
    use crate::test_support::{add, connected_list, TestList};

    fn list_in(dir: &Path) -> TestList {
        let (list, _) = connected_list();
        let config = StoreConfig {
            data_dir: dir.to_path_buf(),
            save_delay: Duration::from_millis(50),
            ..StoreConfig::default()
        };
        BuddyList::new(list.accounts().clone(), config)
    }

    #[test]
    fn test_missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut list = list_in(dir.path());
        assert!(!list.is_loaded());
        list.load().unwrap();
        assert!(list.is_loaded());
        assert_eq!(list.groups().count(), 0);
    }

    #[test]
    fn test_save_before_load_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let mut list = list_in(dir.path());
        assert!(matches!(list.save(), Err(StoreError::NotLoaded)));
        assert!(!list.config().blist_path().exists());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let mut list = list_in(dir.path());
        list.load().unwrap();
        let acct = list.accounts().find("me", "prpl-jabber").unwrap();
        add(&mut list, acct, "bob", Some("Friends"));
        assert!(list.save_pending());

        assert!(list.flush().unwrap());
        assert!(!list.save_pending());
        assert!(!list.flush().unwrap());
        assert!(!dir.path().join("blist.xml.save").exists());

        let mut reloaded = list_in(dir.path());
        reloaded.load().unwrap();
        assert!(reloaded.find_buddy(acct, "bob").is_some());
    }

    #[test]
    fn test_flush_waits_for_deadline() {
        let dir = tempfile::tempdir().unwrap();
        let mut list = list_in(dir.path());
        list.load().unwrap();
        let acct = list.accounts().find("me", "prpl-jabber").unwrap();
        add(&mut list, acct, "bob", None);

        let deadline = list.save.deadline().unwrap();
        assert!(!list.flush_if_due(deadline - Duration::from_millis(10)).unwrap());
        assert!(!list.config().blist_path().exists());
        assert!(list.flush_if_due(deadline).unwrap());
        assert!(list.config().blist_path().exists());
    }

    #[test]
    fn test_parse_error_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("blist.xml"), "<purple><blist>").unwrap();
        let mut list = list_in(dir.path());
        assert!(list.load().is_err());
        assert!(!list.is_loaded());
    }
}

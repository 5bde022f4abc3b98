//! Background task that writes the shared list once its save deadline passes.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use roster_shared::Accounts;

use crate::list::BuddyList;

/// Spawn the autosave loop on the current tokio runtime.
///
/// Every `autosave_poll` the task checks the list's save deadline and writes
/// the file when it is due. Failures are logged and retried on the next
/// change. Abort the returned handle and call [`BuddyList::flush`] on
/// shutdown.
pub fn spawn_autosave<A>(list: Arc<Mutex<BuddyList<A>>>) -> JoinHandle<()>
where
    A: Accounts + Send + 'static,
{
    tokio::spawn(async move {
        let poll = list.lock().await.config().autosave_poll;
        debug!(poll_ms = poll.as_millis() as u64, "Autosave task started");

        let mut interval = tokio::time::interval(poll);
        loop {
            interval.tick().await;
            let mut list = list.lock().await;
            if !list.is_loaded() {
                continue;
            }
            if let Err(e) = list.flush_if_due(Instant::now()) {
                error!(error = %e, "Autosave failed");
                list.save.clear();
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::StoreConfig;
    use crate::test_support::{add, connected_list, TestList};

    #[tokio::test]
    async fn test_autosave_writes_after_delay() {
        let dir = tempfile::tempdir().unwrap();
        let (template, acct) = connected_list();
        let config = StoreConfig {
            data_dir: dir.path().to_path_buf(),
            save_delay: Duration::from_millis(20),
            autosave_poll: Duration::from_millis(10),
            ..StoreConfig::default()
        };
        let mut list: TestList = BuddyList::new(template.accounts().clone(), config);
        list.load().unwrap();
        let path = list.config().blist_path();

        let shared = Arc::new(Mutex::new(list));
        let handle = spawn_autosave(shared.clone());

        add(&mut *shared.lock().await, acct, "bob", Some("Friends"));
        assert!(!path.exists());

        let mut written = false;
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            if !shared.lock().await.save_pending() {
                written = true;
                break;
            }
        }
        handle.abort();

        assert!(written);
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("<name>bob</name>"));
    }

    #[tokio::test]
    async fn test_autosave_skips_unloaded_list() {
        let dir = tempfile::tempdir().unwrap();
        let (template, acct) = connected_list();
        let config = StoreConfig {
            data_dir: dir.path().to_path_buf(),
            save_delay: Duration::from_millis(1),
            autosave_poll: Duration::from_millis(5),
            ..StoreConfig::default()
        };
        let mut list: TestList = BuddyList::new(template.accounts().clone(), config);
        add(&mut list, acct, "bob", None);
        let path = list.config().blist_path();

        let shared = Arc::new(Mutex::new(list));
        let handle = spawn_autosave(shared.clone());
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.abort();

        assert!(!path.exists());
        assert!(shared.lock().await.save_pending());
    }
}

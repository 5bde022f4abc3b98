use thiserror::Error;

use roster_store::StoreError;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown command: {0} (expected show, check, stats or rewrite)")]
    UnknownCommand(String),

    #[error("Buddy list has {0} inconsistencies")]
    Inconsistent(usize),

    #[error(transparent)]
    Store(#[from] StoreError),
}

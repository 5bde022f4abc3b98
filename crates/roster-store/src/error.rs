use thiserror::Error;

/// Errors produced by the store layer.
///
/// Tree mutations never fail; these only come out of persistence.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Generic I/O error (reading, writing or renaming the list file).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The XML reader or writer rejected the document.
    #[error("XML error: {0}")]
    Xml(String),

    /// Well-formed XML that is not a buddy list document.
    #[error("Malformed buddy list: {0}")]
    Malformed(String),

    /// A save was requested before the list was ever loaded.
    #[error("Refusing to save buddy list before it was loaded")]
    NotLoaded,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;

use std::path::PathBuf;

/// Errors raised by the file store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to initialize storage at {path:?}: {source}")]
    DirectoryInit {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Metadata index {path:?} is corrupt: {source}")]
    IndexCorrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write blob {id}: {source}")]
    BlobWrite {
        id: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to persist metadata index: {0}")]
    IndexPersist(#[source] std::io::Error),

    #[error("File not found: {0}")]
    NotFound(String),
}

/// Why an existing index file could not be loaded
#[derive(Debug, thiserror::Error)]
pub enum IndexReadError {
    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse failed: {0}")]
    Parse(#[from] serde_json::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

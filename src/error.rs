//! Error taxonomy for the storage layer.
//!
//! Upstream service failures (embedding, generation) are recovered at the
//! strategy boundary and turned into user-visible text; only storage and
//! structural errors surface through this type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// No persisted vector index exists for the user.
    #[error("no vector index found for user '{0}'")]
    NotFound(String),

    /// A persisted log line failed to parse back into a transaction.
    #[error("corrupt transaction record in {path} at line {line}: {source}")]
    Corrupt {
        path: String,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// The embedding service failed while building or extending an index.
    #[error("embedding failed: {0}")]
    Embedding(#[source] anyhow::Error),

    /// The index artifact on disk could not be decoded.
    #[error("corrupt vector index artifact at {path}: {source}")]
    CorruptIndex {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to encode record: {0}")]
    Encode(#[source] serde_json::Error),
}

impl StoreError {
    /// Whether this error means "the user simply has no data yet".
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

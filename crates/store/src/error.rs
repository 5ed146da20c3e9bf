//! Store error types

use thiserror::Error;

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur while talking to the backing store
#[derive(Debug, Error)]
pub enum StoreError {
    /// Document does not exist
    #[error("document '{key}' not found in collection '{collection}'")]
    NotFound {
        /// Collection name
        collection: String,
        /// Document key
        key: String,
    },

    /// Document could not be serialized or deserialized
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backend failure (connection loss, timeout, rejected write)
    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Create a NotFound error
    pub fn not_found(collection: impl Into<String>, key: impl Into<String>) -> Self {
        Self::NotFound {
            collection: collection.into(),
            key: key.into(),
        }
    }

    /// Create a Backend error
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }
}

//! The document-store trait

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::query::Query;

/// A stored document: a JSON object addressed by collection + key
pub type Document = Value;

/// Narrow contract every backing store must satisfy
///
/// Writes are independent; the store is not required to offer transactions.
/// Eventual consistency within a region is acceptable to all callers in this
/// codebase.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document by key, `None` if absent
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Document>>;

    /// Create or replace a document
    async fn set(&self, collection: &str, key: &str, doc: Document) -> Result<()>;

    /// Merge the top-level fields of `patch` into an existing document
    ///
    /// Fails with [`StoreError::NotFound`](crate::StoreError::NotFound) if
    /// the document does not exist.
    async fn update(&self, collection: &str, key: &str, patch: Document) -> Result<()>;

    /// Delete a document; deleting an absent document is not an error
    async fn delete(&self, collection: &str, key: &str) -> Result<()>;

    /// Run a filtered query and return matching documents
    async fn query(&self, query: Query) -> Result<Vec<Document>>;
}

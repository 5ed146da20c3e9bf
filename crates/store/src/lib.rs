//! Aviso - Document store contract
//!
//! The rest of the platform talks to its backing store through the narrow
//! [`DocumentStore`] trait defined here: get/set/update/delete by
//! collection + key, plus queries with equality and array-membership
//! filters, optional ordering, and offset/limit.
//!
//! Production deployments plug in an adapter for their document database.
//! This crate ships [`MemoryStore`], an in-process implementation used by
//! tests and small self-hosted installs.
//!
//! # Example
//!
//! ```
//! use aviso_store::{DocumentStore, MemoryStore, Query, Filter};
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> aviso_store::Result<()> {
//! let store = MemoryStore::new();
//! store.set("users", "u1", json!({"email": "ana@example.com"})).await?;
//!
//! let hits = store
//!     .query(Query::collection("users").filter(Filter::eq("email", json!("ana@example.com"))))
//!     .await?;
//! assert_eq!(hits.len(), 1);
//! # Ok(())
//! # }
//! ```

mod error;
mod memory;
mod query;
mod store;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use query::{Direction, Filter, Query};
pub use store::{Document, DocumentStore};

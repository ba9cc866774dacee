use async_trait::async_trait;
use dyn_clone::DynClone;

use crate::{document::Document, error::Result};

#[cfg(feature = "memory")]
mod memory;

#[cfg(feature = "memory")]
pub use memory::*;

/// Backend holding one document per migration version.
///
/// Writes are last-writer-wins, there is no optimistic concurrency token.
#[async_trait]
pub trait Engine: DynClone + Send + Sync {
    async fn upsert(&self, version: u64, document: Document) -> Result<()>;

    async fn find(&self, version: u64) -> Result<Option<Document>>;

    /// All documents, ascending by version.
    async fn find_all(&self) -> Result<Vec<Document>>;

    /// Returns `false` when nothing was stored under `version`.
    async fn delete(&self, version: u64) -> Result<bool>;
}

dyn_clone::clone_trait_object!(Engine);

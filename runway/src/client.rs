//! Capability handed to business rules and commands.
//!
//! The engine never inspects the client; rules and commands are generic over
//! it. [`DocumentClient`] describes the operations the built-in commands and
//! rules need from a document database.

use async_trait::async_trait;
use serde_json::Value;

#[cfg(feature = "memory")]
mod memory;

#[cfg(feature = "memory")]
pub use memory::*;

#[async_trait]
pub trait DocumentClient: Send + Sync {
    async fn create_collection(&self, database: &str, collection: &str) -> anyhow::Result<()>;

    async fn drop_collection(&self, database: &str, collection: &str) -> anyhow::Result<()>;

    async fn drop_database(&self, database: &str) -> anyhow::Result<()>;

    async fn list_collection_names(&self, database: &str) -> anyhow::Result<Vec<String>>;

    async fn insert_one(
        &self,
        database: &str,
        collection: &str,
        document: Value,
    ) -> anyhow::Result<()>;

    async fn find(&self, database: &str, collection: &str) -> anyhow::Result<Vec<Value>>;
}

use anyhow::anyhow;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::{collections::BTreeMap, sync::Arc};

use crate::client::DocumentClient;

type Collections = BTreeMap<String, Vec<Value>>;

/// In-memory document database, databases and collections keyed by name.
#[derive(Debug, Clone, Default)]
pub struct MemoryClient(Arc<RwLock<BTreeMap<String, Collections>>>);

impl MemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_collection(&self, database: &str, collection: &str) -> bool {
        self.0
            .read()
            .get(database)
            .map(|collections| collections.contains_key(collection))
            .unwrap_or(false)
    }

    pub fn has_database(&self, database: &str) -> bool {
        self.0.read().contains_key(database)
    }
}

#[async_trait]
impl DocumentClient for MemoryClient {
    async fn create_collection(&self, database: &str, collection: &str) -> anyhow::Result<()> {
        let mut databases = self.0.write();
        let collections = databases.entry(database.to_owned()).or_default();

        if collections.contains_key(collection) {
            return Err(anyhow!("collection {database}.{collection} already exists"));
        }

        collections.insert(collection.to_owned(), Vec::new());

        Ok(())
    }

    async fn drop_collection(&self, database: &str, collection: &str) -> anyhow::Result<()> {
        if let Some(collections) = self.0.write().get_mut(database) {
            collections.remove(collection);
        }

        Ok(())
    }

    async fn drop_database(&self, database: &str) -> anyhow::Result<()> {
        self.0.write().remove(database);

        Ok(())
    }

    async fn list_collection_names(&self, database: &str) -> anyhow::Result<Vec<String>> {
        Ok(self
            .0
            .read()
            .get(database)
            .map(|collections| collections.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn insert_one(
        &self,
        database: &str,
        collection: &str,
        document: Value,
    ) -> anyhow::Result<()> {
        self.0
            .write()
            .entry(database.to_owned())
            .or_default()
            .entry(collection.to_owned())
            .or_default()
            .push(document);

        Ok(())
    }

    async fn find(&self, database: &str, collection: &str) -> anyhow::Result<Vec<Value>> {
        Ok(self
            .0
            .read()
            .get(database)
            .and_then(|collections| collections.get(collection))
            .cloned()
            .unwrap_or_default())
    }
}

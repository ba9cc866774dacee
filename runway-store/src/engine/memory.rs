use async_trait::async_trait;
use parking_lot::RwLock;
use std::{collections::BTreeMap, sync::Arc};

use crate::{document::Document, engine::Engine, error::Result, store::Store};

#[derive(Debug, Clone, Default)]
pub struct Memory(Arc<RwLock<BTreeMap<u64, Document>>>);

impl Store {
    pub fn memory() -> Self {
        Store::new(Memory::default())
    }
}

#[async_trait]
impl Engine for Memory {
    async fn upsert(&self, version: u64, document: Document) -> Result<()> {
        self.0.write().insert(version, document);

        Ok(())
    }

    async fn find(&self, version: u64) -> Result<Option<Document>> {
        Ok(self.0.read().get(&version).cloned())
    }

    async fn find_all(&self) -> Result<Vec<Document>> {
        Ok(self.0.read().values().cloned().collect())
    }

    async fn delete(&self, version: u64) -> Result<bool> {
        Ok(self.0.write().remove(&version).is_some())
    }
}

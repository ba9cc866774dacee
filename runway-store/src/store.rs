use crate::{
    document::{document_version, Document},
    engine::Engine,
    error::Result,
};

#[derive(Clone)]
pub struct Store {
    pub(crate) engine: Box<dyn Engine>,
}

impl Store {
    pub fn new<E: Engine + 'static>(engine: E) -> Self {
        Self {
            engine: Box::new(engine),
        }
    }

    /// Writes `document` under the version it carries and returns that version.
    pub async fn upsert(&self, document: Document) -> Result<u64> {
        let version = document_version(&document)?;
        self.engine.upsert(version, document).await?;

        Ok(version)
    }

    pub async fn find(&self, version: u64) -> Result<Option<Document>> {
        self.engine.find(version).await
    }

    pub async fn contains(&self, version: u64) -> Result<bool> {
        Ok(self.engine.find(version).await?.is_some())
    }

    pub async fn find_all(&self) -> Result<Vec<Document>> {
        self.engine.find_all().await
    }

    pub async fn delete(&self, version: u64) -> Result<bool> {
        self.engine.delete(version).await
    }
}

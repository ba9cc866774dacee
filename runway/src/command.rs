use async_trait::async_trait;
use dyn_clone::DynClone;

use crate::{client::DocumentClient, short_type_name};

/// One step of a migration process.
///
/// Commands of a process run in order and are not rolled back when a later
/// one fails, each should be safe to re-run.
#[async_trait]
pub trait Command<C>: DynClone + Send + Sync {
    fn name(&self) -> String {
        short_type_name::<Self>()
    }

    async fn execute(&self, client: &C) -> anyhow::Result<()>;
}

dyn_clone::clone_trait_object!(<C> Command<C>);

#[derive(Debug, Clone)]
pub struct CreateCollection {
    pub database: String,
    pub collection: String,
}

impl CreateCollection {
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collection: collection.into(),
        }
    }
}

#[async_trait]
impl<C: DocumentClient> Command<C> for CreateCollection {
    async fn execute(&self, client: &C) -> anyhow::Result<()> {
        client
            .create_collection(&self.database, &self.collection)
            .await
    }
}

#[derive(Debug, Clone)]
pub struct DropCollection {
    pub database: String,
    pub collection: String,
}

impl DropCollection {
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collection: collection.into(),
        }
    }
}

#[async_trait]
impl<C: DocumentClient> Command<C> for DropCollection {
    async fn execute(&self, client: &C) -> anyhow::Result<()> {
        client.drop_collection(&self.database, &self.collection).await
    }
}

/// Databases are created implicitly with their first collection.
#[derive(Debug, Clone)]
pub struct CreateDatabase {
    pub database: String,
    pub collection: String,
}

impl CreateDatabase {
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collection: collection.into(),
        }
    }
}

#[async_trait]
impl<C: DocumentClient> Command<C> for CreateDatabase {
    async fn execute(&self, client: &C) -> anyhow::Result<()> {
        client
            .create_collection(&self.database, &self.collection)
            .await
    }
}

#[derive(Debug, Clone)]
pub struct DropDatabase {
    pub database: String,
}

impl DropDatabase {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
        }
    }
}

#[async_trait]
impl<C: DocumentClient> Command<C> for DropDatabase {
    async fn execute(&self, client: &C) -> anyhow::Result<()> {
        client.drop_database(&self.database).await
    }
}

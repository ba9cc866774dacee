use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    error::{Error, Result},
    process::{MigrationProcess, ProcessBuilder},
    transaction::Direction,
};
use runway_store::{Document, ID_KEY};

/// One versioned, checksummed unit of schema change.
///
/// Everything but the applied flag is fixed at construction.
pub struct Migration<C> {
    name: String,
    version: u64,
    checksum: String,
    is_applied: bool,
    description: String,
    upgrade_process: MigrationProcess<C>,
    downgrade_process: MigrationProcess<C>,
}

impl<C> Clone for Migration<C> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            version: self.version,
            checksum: self.checksum.clone(),
            is_applied: self.is_applied,
            description: self.description.clone(),
            upgrade_process: self.upgrade_process.clone(),
            downgrade_process: self.downgrade_process.clone(),
        }
    }
}

impl<C> std::fmt::Debug for Migration<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Migration")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("checksum", &self.checksum)
            .field("is_applied", &self.is_applied)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl<C> Migration<C> {
    /// Freezes both processes for `version`. Fails when either has a rule
    /// ordered before one of its dependencies.
    pub fn new(
        name: impl Into<String>,
        version: u64,
        checksum: impl Into<String>,
        description: impl Into<String>,
        upgrade: ProcessBuilder<C>,
        downgrade: ProcessBuilder<C>,
    ) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            version,
            checksum: checksum.into(),
            is_applied: false,
            description: description.into(),
            upgrade_process: upgrade.build(version)?,
            downgrade_process: downgrade.build(version)?,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    pub fn is_applied(&self) -> bool {
        self.is_applied
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn upgrade_process(&self) -> &MigrationProcess<C> {
        &self.upgrade_process
    }

    pub fn downgrade_process(&self) -> &MigrationProcess<C> {
        &self.downgrade_process
    }

    pub fn process(&self, direction: Direction) -> &MigrationProcess<C> {
        match direction {
            Direction::Upgrade => &self.upgrade_process,
            Direction::Downgrade => &self.downgrade_process,
        }
    }

    /// Only flips the flag, the work is done by [`apply`](crate::apply).
    pub fn set_is_applied(&mut self, value: bool) {
        self.is_applied = value;
    }

    pub fn to_dict(&self, unique: bool) -> Document {
        MigrationReadModel::from_migration(self).to_dict(unique)
    }
}

/// Persisted projection of a [`Migration`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MigrationReadModel {
    pub name: String,
    pub version: u64,
    pub checksum: String,
    pub description: String,
    pub is_applied: bool,
}

impl MigrationReadModel {
    pub fn from_migration<C>(migration: &Migration<C>) -> Self {
        Self {
            name: migration.name.to_owned(),
            version: migration.version,
            checksum: migration.checksum.to_owned(),
            description: migration.description.to_owned(),
            is_applied: migration.is_applied,
        }
    }

    /// Drops the storage identity key, then requires every field to be present.
    pub fn from_dict(mut document: Document) -> Result<Self> {
        document.remove(ID_KEY);

        serde_json::from_value(Value::Object(document)).map_err(Error::Projection)
    }

    pub fn to_dict(&self, unique: bool) -> Document {
        let mut document = Document::new();
        document.insert("name".to_owned(), json!(self.name));
        document.insert("version".to_owned(), json!(self.version));
        document.insert("checksum".to_owned(), json!(self.checksum));
        document.insert("description".to_owned(), json!(self.description));
        document.insert("is_applied".to_owned(), json!(self.is_applied));

        if unique {
            document.insert(ID_KEY.to_owned(), json!(self.version));
        }

        document
    }
}

use std::path::{Path, PathBuf};

use crate::process::ProcessBuilder;

/// A loaded migration script: where its content lives and what it does.
pub struct MigrationModule<C> {
    location: PathBuf,
    description: String,
    version: Option<u64>,
    upgrade: ProcessBuilder<C>,
    downgrade: ProcessBuilder<C>,
}

impl<C> Clone for MigrationModule<C> {
    fn clone(&self) -> Self {
        Self {
            location: self.location.clone(),
            description: self.description.clone(),
            version: self.version,
            upgrade: self.upgrade.clone(),
            downgrade: self.downgrade.clone(),
        }
    }
}

impl<C> MigrationModule<C> {
    pub fn new(location: impl Into<PathBuf>) -> Self {
        Self {
            location: location.into(),
            description: String::new(),
            version: None,
            upgrade: ProcessBuilder::upgrade(),
            downgrade: ProcessBuilder::downgrade(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Declared version, required when strict naming is disabled.
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = Some(version);
        self
    }

    pub fn upgrade(mut self, process: ProcessBuilder<C>) -> Self {
        self.upgrade = process;
        self
    }

    pub fn downgrade(mut self, process: ProcessBuilder<C>) -> Self {
        self.downgrade = process;
        self
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    pub fn filename(&self) -> String {
        self.location
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn version(&self) -> Option<u64> {
        self.version
    }

    pub(crate) fn processes(&self) -> (ProcessBuilder<C>, ProcessBuilder<C>) {
        (self.upgrade.clone(), self.downgrade.clone())
    }
}

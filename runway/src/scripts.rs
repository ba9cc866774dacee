use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};
use tracing::{debug, error};

use crate::{
    checksum::calculate_checksum,
    error::{Error, Result},
    filename::FilenameStrategy,
    migration::Migration,
    module::MigrationModule,
};

/// Catalogue of the migration modules of one scripts directory.
pub struct Scripts<C> {
    dir: PathBuf,
    modules: Vec<MigrationModule<C>>,
}

impl<C> Clone for Scripts<C> {
    fn clone(&self) -> Self {
        Self {
            dir: self.dir.clone(),
            modules: self.modules.clone(),
        }
    }
}

impl<C> Scripts<C> {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            modules: Vec::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Starts a module backed by `filename` inside the scripts directory.
    pub fn module(&self, filename: impl AsRef<Path>) -> MigrationModule<C> {
        MigrationModule::new(self.dir.join(filename))
    }

    pub fn add(&mut self, module: MigrationModule<C>) -> &mut Self {
        self.modules.push(module);
        self
    }

    pub fn modules(&self) -> &[MigrationModule<C>] {
        &self.modules
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Builds every migration, ascending by version.
    ///
    /// With `strict_naming` the filename order decides: the module at
    /// position `i` (from 0) gets version `start + i` and is named after its
    /// canonical filename. Otherwise each module must declare a unique
    /// version and the lowest one must be `start`.
    ///
    /// A module that fails to build is reported in [`Loaded::failures`]
    /// under the version it would have had, the others still load.
    pub fn load(
        &self,
        strategy: &dyn FilenameStrategy,
        strict_naming: bool,
        start: u64,
    ) -> Result<Loaded<C>> {
        let mut modules = self.modules.iter().collect::<Vec<_>>();
        modules.sort_by_key(|module| module.filename());

        let mut loaded = Loaded::default();

        if strict_naming {
            for (module, version) in modules.into_iter().zip(start..) {
                let filename = strategy.transform_migration_filename(&module.filename(), version);
                loaded.push(module, version, build(module, stem(&filename), version));
            }

            return Ok(loaded);
        }

        let mut versioned: BTreeMap<u64, &MigrationModule<C>> = BTreeMap::new();

        for module in modules {
            let version = module
                .version()
                .ok_or_else(|| Error::MissingVersion(module.filename()))?;

            if let Some(first) = versioned.insert(version, module) {
                return Err(Error::DuplicateVersion {
                    version,
                    first: first.filename(),
                    second: module.filename(),
                });
            }
        }

        match versioned.keys().next() {
            Some(lowest) if *lowest != start => return Err(Error::VersioningStart(start)),
            _ => {}
        }

        for (version, module) in versioned {
            loaded.push(module, version, build(module, stem(&module.filename()), version));
        }

        Ok(loaded)
    }
}

/// Outcome of [`Scripts::load`], both lists ascending by version.
pub struct Loaded<C> {
    pub migrations: Vec<Migration<C>>,
    pub failures: Vec<LoadFailure>,
}

impl<C> Default for Loaded<C> {
    fn default() -> Self {
        Self {
            migrations: Vec::new(),
            failures: Vec::new(),
        }
    }
}

impl<C> Loaded<C> {
    fn push(&mut self, module: &MigrationModule<C>, version: u64, result: Result<Migration<C>>) {
        match result {
            Ok(migration) => self.migrations.push(migration),
            Err(error) => {
                error!(
                    "Migration {} with version {version} not loaded: {error}",
                    module.filename()
                );

                self.failures.push(LoadFailure {
                    version,
                    filename: module.filename(),
                    error,
                });
            }
        }
    }
}

/// A module that could not be turned into a migration.
#[derive(Debug)]
pub struct LoadFailure {
    pub version: u64,
    pub filename: String,
    pub error: Error,
}

fn build<C>(module: &MigrationModule<C>, name: String, version: u64) -> Result<Migration<C>> {
    let checksum = calculate_checksum(module)?;
    let (upgrade, downgrade) = module.processes();

    debug!("Loaded migration {name} with version {version} ({checksum})");

    Migration::new(
        name,
        version,
        checksum,
        module.description(),
        upgrade,
        downgrade,
    )
}

fn stem(filename: &str) -> String {
    Path::new(filename)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| filename.to_owned())
}

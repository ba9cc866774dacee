//! Configuration constants and defaults for a runway application.

use serde::Deserialize;
use std::path::PathBuf;
use validator::Validate;

use crate::{
    filename::FilenameStrategyKind,
    hook::{StartupHook, StartupHookConfig},
};

/// Settings of one migration application
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RunwayConfig {
    /// Name used in logs
    #[validate(length(min = 1))]
    pub app_name: String,

    /// Directory holding the migration scripts
    #[serde(default = "default_scripts_dir")]
    pub scripts_dir: PathBuf,

    /// Policy normalising script filenames
    #[serde(default)]
    pub filename_strategy: FilenameStrategyKind,

    /// Derive versions from filename order instead of declared versions
    #[serde(default = "default_true")]
    pub strict_naming: bool,

    /// Fail instead of returning 0 when there is nothing to upgrade or downgrade
    #[serde(default = "default_true")]
    pub raise_on_nothing: bool,

    /// Record every transaction in the audit log journal
    #[serde(default)]
    pub use_auditlog: bool,

    /// Version of the first migration
    #[serde(default = "default_versioning_starts_from")]
    pub versioning_starts_from: u64,

    /// Hooks applied by `Runway::startup`
    #[serde(default)]
    pub startup_hooks: Vec<StartupHookConfig>,
}

impl RunwayConfig {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            scripts_dir: default_scripts_dir(),
            filename_strategy: FilenameStrategyKind::default(),
            strict_naming: true,
            raise_on_nothing: true,
            use_auditlog: false,
            versioning_starts_from: VERSIONING_STARTS_FROM,
            startup_hooks: Vec::new(),
        }
    }
}

/// Default scripts directory, relative to the working directory
pub const SCRIPTS_DIR: &str = "migrations";

/// Version assigned to the first migration
///
/// With strict naming the migration at position `n` (from 0) gets
/// `VERSIONING_STARTS_FROM + n`.
pub const VERSIONING_STARTS_FROM: u64 = 1;

fn default_scripts_dir() -> PathBuf {
    PathBuf::from(SCRIPTS_DIR)
}

fn default_true() -> bool {
    true
}

fn default_versioning_starts_from() -> u64 {
    VERSIONING_STARTS_FROM
}

/// Configuration builder for customizing a runway application
#[derive(Debug)]
pub struct ConfigBuilder {
    config: RunwayConfig,
}

impl ConfigBuilder {
    /// Create a new configuration builder with default values
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            config: RunwayConfig::new(app_name),
        }
    }

    /// Set the directory the scripts catalogue must be rooted at
    pub fn scripts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.scripts_dir = dir.into();
        self
    }

    /// Set the filename strategy
    pub fn filename_strategy(mut self, kind: FilenameStrategyKind) -> Self {
        self.config.filename_strategy = kind;
        self
    }

    /// Derive versions from filename order, or require declared versions
    pub fn strict_naming(mut self, value: bool) -> Self {
        self.config.strict_naming = value;
        self
    }

    /// Fail when there is nothing to upgrade or downgrade
    pub fn raise_on_nothing(mut self, value: bool) -> Self {
        self.config.raise_on_nothing = value;
        self
    }

    /// Record transactions in the audit log journal
    pub fn use_auditlog(mut self, value: bool) -> Self {
        self.config.use_auditlog = value;
        self
    }

    /// Set the version of the first migration
    pub fn versioning_starts_from(mut self, version: u64) -> Self {
        self.config.versioning_starts_from = version;
        self
    }

    /// Append a startup hook without priority
    pub fn startup_hook(mut self, hook: StartupHook) -> Self {
        self.config.startup_hooks.push(hook.into());
        self
    }

    /// Append a startup hook run before every hook of lower priority
    pub fn prioritized_startup_hook(mut self, priority: u32, hook: StartupHook) -> Self {
        self.config
            .startup_hooks
            .push(StartupHookConfig::Prioritized { hook, priority });
        self
    }

    /// Build the final configuration, validated by [`Runway::new`](crate::Runway::new)
    pub fn build(self) -> RunwayConfig {
        self.config
    }
}

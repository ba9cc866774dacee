use std::path::PathBuf;

use crate::rule::BrokenRule;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to load migration script `{}`: {source}", .location.display())]
    Load {
        location: PathBuf,
        source: std::io::Error,
    },

    #[error("migration `{name}` with version {version} has changed since it was recorded (stored checksum {stored}, current {current})")]
    ChecksumMismatch {
        name: String,
        version: u64,
        stored: String,
        current: String,
    },

    #[error("{process} of migration `{name}` with version {version} is blocked: {}", render_broken(.broken))]
    RulesBroken {
        name: String,
        version: u64,
        process: String,
        broken: Vec<BrokenRule>,
    },

    #[error("business rule {rule} could not be checked: {source}")]
    RuleEvaluation {
        rule: String,
        source: anyhow::Error,
    },

    #[error("business rule {rule} depends on {dependency}, which is not added before it")]
    RuleDependency { rule: String, dependency: String },

    #[error("command {command} of migration `{name}` with version {version} failed: {source}")]
    Command {
        name: String,
        version: u64,
        command: String,
        source: anyhow::Error,
    },

    #[error("invalid migration document: {0}")]
    Projection(#[source] serde_json::Error),

    #[error("there are currently no pending migrations")]
    NothingToUpgrade,

    #[error("there are currently no applied migrations")]
    NothingToDowngrade,

    #[error("migration with version {0} is not found")]
    MigrationNotFound(u64),

    #[error("migration with version {0} is already applied")]
    AlreadyApplied(u64),

    #[error("migration with version {0} is already pending")]
    AlreadyPending(u64),

    #[error("migration `{0}` must declare a version when strict naming is disabled")]
    MissingVersion(String),

    #[error("migrations `{first}` and `{second}` share version {version}")]
    DuplicateVersion {
        version: u64,
        first: String,
        second: String,
    },

    #[error("versioning starts from {0}")]
    VersioningStart(u64),

    #[error("scripts catalogue `{}` does not match configured scripts_dir `{}`", .catalogue.display(), .configured.display())]
    ScriptsDir {
        configured: PathBuf,
        catalogue: PathBuf,
    },

    #[error("audit log is not enabled for this application")]
    AuditlogDisabled,

    #[error("audit log journal: {0}")]
    Journal(#[source] anyhow::Error),

    #[error("config {0}")]
    Config(#[from] validator::ValidationErrors),

    #[error("store `{0}`")]
    Store(#[from] runway_store::StoreError),
}

impl Error {
    /// Variant name, recorded in audit log entries.
    pub fn name(&self) -> &'static str {
        match self {
            Error::Load { .. } => "Load",
            Error::ChecksumMismatch { .. } => "ChecksumMismatch",
            Error::RulesBroken { .. } => "RulesBroken",
            Error::RuleEvaluation { .. } => "RuleEvaluation",
            Error::RuleDependency { .. } => "RuleDependency",
            Error::Command { .. } => "Command",
            Error::Projection(_) => "Projection",
            Error::NothingToUpgrade => "NothingToUpgrade",
            Error::NothingToDowngrade => "NothingToDowngrade",
            Error::MigrationNotFound(_) => "MigrationNotFound",
            Error::AlreadyApplied(_) => "AlreadyApplied",
            Error::AlreadyPending(_) => "AlreadyPending",
            Error::MissingVersion(_) => "MissingVersion",
            Error::DuplicateVersion { .. } => "DuplicateVersion",
            Error::VersioningStart(_) => "VersioningStart",
            Error::ScriptsDir { .. } => "ScriptsDir",
            Error::AuditlogDisabled => "AuditlogDisabled",
            Error::Journal(_) => "Journal",
            Error::Config(_) => "Config",
            Error::Store(_) => "Store",
        }
    }
}

fn render_broken(broken: &[BrokenRule]) -> String {
    broken
        .iter()
        .map(|rule| rule.diagnostic.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

pub type Result<T> = std::result::Result<T, Error>;

use sha3::{Digest, Sha3_256};
use std::path::Path;
use tracing::warn;

use crate::{
    error::{Error, Result},
    migration::MigrationReadModel,
    module::MigrationModule,
};

/// Hex digest of the module's backing content.
pub fn calculate_checksum<C>(module: &MigrationModule<C>) -> Result<String> {
    checksum_of(module.location())
}

pub fn checksum_of(location: &Path) -> Result<String> {
    let content = std::fs::read(location).map_err(|source| Error::Load {
        location: location.to_path_buf(),
        source,
    })?;

    Ok(checksum_bytes(&content))
}

pub fn checksum_bytes(content: &[u8]) -> String {
    let mut hasher = Sha3_256::new();
    hasher.update(content);

    format!("{:x}", hasher.finalize())
}

/// A recorded migration whose script changed after it was recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Drift {
    pub name: String,
    pub version: u64,
    pub stored: String,
    pub current: String,
}

pub fn detect_drift(stored: &MigrationReadModel, current: &str) -> Option<Drift> {
    if stored.checksum == current {
        return None;
    }

    warn!(
        "Migration {} with version {} drifted: stored checksum {}, current {}",
        stored.name, stored.version, stored.checksum, current
    );

    Some(Drift {
        name: stored.name.to_owned(),
        version: stored.version,
        stored: stored.checksum.to_owned(),
        current: current.to_owned(),
    })
}

impl From<Drift> for Error {
    fn from(drift: Drift) -> Self {
        Error::ChecksumMismatch {
            name: drift.name,
            version: drift.version,
            stored: drift.stored,
            current: drift.current,
        }
    }
}

//! Policies turning a script filename into a canonical, version-tagged one.

use serde::{Deserialize, Serialize};

pub trait FilenameStrategy: Send + Sync {
    fn is_valid_filename(&self, filename: &str) -> bool;

    /// Canonical form of `filename` at 1-based `position` in the queue. Must
    /// leave valid filenames untouched.
    fn transform_migration_filename(&self, filename: &str, position: u64) -> String;
}

/// Accepts any filename as is.
#[derive(Debug, Clone, Copy, Default)]
pub struct MissingFilenameStrategy;

impl FilenameStrategy for MissingFilenameStrategy {
    fn is_valid_filename(&self, _filename: &str) -> bool {
        true
    }

    fn transform_migration_filename(&self, filename: &str, _position: u64) -> String {
        filename.to_owned()
    }
}

/// `NNN_name`, the position zero padded to three digits.
#[derive(Debug, Clone, Copy, Default)]
pub struct NumericalFilenameStrategy;

impl FilenameStrategy for NumericalFilenameStrategy {
    fn is_valid_filename(&self, filename: &str) -> bool {
        let bytes = filename.as_bytes();

        bytes.len() > 3 && bytes[..3].iter().all(u8::is_ascii_digit) && bytes[3] == b'_'
    }

    fn transform_migration_filename(&self, filename: &str, position: u64) -> String {
        if self.is_valid_filename(filename) {
            return filename.to_owned();
        }

        format!("{position:03}_{}", squash_underscores(filename))
    }
}

/// `TIMESTAMP_name` with a Unix timestamp of at least ten digits.
///
/// Without a fixed timestamp the transform is the identity, generating one
/// for a new script is left to the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnixFilenameStrategy {
    timestamp: Option<i64>,
}

impl UnixFilenameStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefixes invalid filenames with `timestamp`.
    pub fn at(timestamp: i64) -> Self {
        Self {
            timestamp: Some(timestamp),
        }
    }
}

impl FilenameStrategy for UnixFilenameStrategy {
    fn is_valid_filename(&self, filename: &str) -> bool {
        let digits = filename.bytes().take_while(u8::is_ascii_digit).count();

        digits >= 10 && filename.as_bytes().get(digits) == Some(&b'_')
    }

    fn transform_migration_filename(&self, filename: &str, _position: u64) -> String {
        match self.timestamp {
            Some(timestamp) if !self.is_valid_filename(filename) => {
                format!("{timestamp}_{}", squash_underscores(filename))
            }
            _ => filename.to_owned(),
        }
    }
}

fn squash_underscores(filename: &str) -> String {
    filename
        .split('_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilenameStrategyKind {
    Missing,
    #[default]
    Numerical,
    Unix,
}

impl FilenameStrategyKind {
    pub fn strategy(&self) -> Box<dyn FilenameStrategy> {
        match self {
            FilenameStrategyKind::Missing => Box::new(MissingFilenameStrategy),
            FilenameStrategyKind::Numerical => Box::new(NumericalFilenameStrategy),
            FilenameStrategyKind::Unix => Box::new(UnixFilenameStrategy::new()),
        }
    }
}

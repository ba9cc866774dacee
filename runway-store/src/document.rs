use serde_json::{Map, Value};

use crate::error::{Result, StoreError};

/// Flat document as persisted by an [`Engine`](crate::Engine).
pub type Document = Map<String, Value>;

/// Identity key reserved for the storage layer. Mirrors `version` when a
/// document is written with the `unique` option.
pub const ID_KEY: &str = "_id";

pub const VERSION_KEY: &str = "version";

/// Reads the version a document is keyed by.
pub fn document_version(document: &Document) -> Result<u64> {
    let value = document
        .get(VERSION_KEY)
        .ok_or(StoreError::MissingVersion)?;

    value
        .as_u64()
        .ok_or_else(|| StoreError::InvalidVersion(value.clone()))
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("document has no `version` key")]
    MissingVersion,

    #[error("document `version` must be a non-negative integer, got `{0}`")]
    InvalidVersion(serde_json::Value),

    #[error("{0}")]
    Any(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

use mirror_config::error::ConfigError;
use mirror_core::error::{ArchiveError, SourceError, StoreError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    #[error("Failed to serialize data to JSON: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    #[error("Invalid entity type: {0}")]
    InvalidEntity(String),
}

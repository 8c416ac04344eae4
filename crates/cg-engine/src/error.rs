//! Error type for the orchestration layer: wraps every lower crate's error
//! plus the two failure modes unique to bootstrap/lifecycle.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("dataset error: {0}")]
    Dataset(#[from] cg_dataset::DatasetError),

    #[error("remotes error: {0}")]
    Remotes(#[from] cg_remotes::RemotesError),

    #[error("storage is locked by another process")]
    StorageLocked,

    #[error("engine is closed")]
    Closed,

    #[error("no peer answered the bootstrap request")]
    BootstrapUnavailable,
}

impl EngineError {
    pub fn category(&self) -> &'static str {
        match self {
            EngineError::Config(_) => "config",
            EngineError::Dataset(_) => "dataset",
            EngineError::Remotes(_) => "remotes",
            EngineError::StorageLocked => "storage_locked",
            EngineError::Closed => "closed",
            EngineError::BootstrapUnavailable => "bootstrap_unavailable",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EngineError::StorageLocked | EngineError::BootstrapUnavailable | EngineError::Remotes(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

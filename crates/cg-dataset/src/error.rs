//! Error type for dataset transact/apply failures.

use cg_constraint::ConstraintError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("malformed update: {message}")]
    BadUpdate { message: String },

    #[error("constraint check failed: {0}")]
    ConstraintFailed(#[from] ConstraintError),

    #[error("storage is locked by another process")]
    StorageLocked,

    #[error("journal error: {0}")]
    Journal(#[from] cg_journal::JournalError),

    #[error("serialization failure: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("wire error: {0}")]
    Wire(#[from] cg_core::CoreError),
}

impl DatasetError {
    pub fn bad_update(message: impl Into<String>) -> Self {
        DatasetError::BadUpdate {
            message: message.into(),
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            DatasetError::BadUpdate { .. } => "bad_update",
            DatasetError::ConstraintFailed(_) => "constraint_failed",
            DatasetError::StorageLocked => "storage_locked",
            DatasetError::Journal(_) => "journal",
            DatasetError::Serialization(_) => "serialization",
            DatasetError::Wire(_) => "wire",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, DatasetError::StorageLocked)
    }
}

pub type Result<T> = std::result::Result<T, DatasetError>;

//! Error type for journal and TID-index operations.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("no journal entry at ticks {ticks}")]
    UnknownTicks { ticks: u64 },

    #[error("hash chain broken at ticks {ticks}: expected prev {expected}, found {found}")]
    HashChainBroken {
        ticks: u64,
        expected: String,
        found: String,
    },

    #[error("serialization failure: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl JournalError {
    pub fn category(&self) -> &'static str {
        match self {
            JournalError::UnknownTicks { .. } => "unknown_ticks",
            JournalError::HashChainBroken { .. } => "hash_chain_broken",
            JournalError::Serialization(_) => "serialization",
        }
    }

    pub fn is_retryable(&self) -> bool {
        false
    }
}

pub type Result<T> = std::result::Result<T, JournalError>;

//! Error type for the remoting layer.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemotesError {
    #[error("no peer is currently visible")]
    NoneVisible,

    #[error("send to {peer} timed out after {millis}ms")]
    SendTimeout { peer: String, millis: u64 },

    #[error("remotes has been closed")]
    Closed,

    #[error("transport failure: {message}")]
    Transport { message: String },

    #[error("wire error: {0}")]
    Wire(#[from] cg_core::CoreError),

    #[error("serialization failure: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RemotesError {
    pub fn transport(message: impl Into<String>) -> Self {
        RemotesError::Transport {
            message: message.into(),
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            RemotesError::NoneVisible => "none_visible",
            RemotesError::SendTimeout { .. } => "send_timeout",
            RemotesError::Closed => "closed",
            RemotesError::Transport { .. } => "transport",
            RemotesError::Wire(_) => "wire",
            RemotesError::Serialization(_) => "serialization",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, RemotesError::SendTimeout { .. } | RemotesError::NoneVisible)
    }
}

pub type Result<T> = std::result::Result<T, RemotesError>;

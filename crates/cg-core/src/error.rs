//! Shared error type for `cg-core`: wire decoding and identifier parsing.
//!
//! Mirrors the shape the rest of the workspace follows (see `cg-dataset`,
//! `cg-remotes`, `cg-engine`): one `thiserror`-derived enum per crate, a
//! `category()` tag for structured logging, and an `is_retryable()` hint
//! consumers can use without matching on variants.

use thiserror::Error;

/// Errors produced while decoding wire envelopes or identifiers.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("malformed wire payload: {message}")]
    InvalidWireFormat { message: String },

    #[error("unsupported wire version {found}, expected {expected}")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("invalid identifier: {message}")]
    InvalidIdentifier { message: String },

    #[error("serialization failure: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CoreError {
    pub fn invalid_wire_format(message: impl Into<String>) -> Self {
        CoreError::InvalidWireFormat {
            message: message.into(),
        }
    }

    pub fn invalid_identifier(message: impl Into<String>) -> Self {
        CoreError::InvalidIdentifier {
            message: message.into(),
        }
    }

    /// Short, stable tag for log fields and metrics, independent of the
    /// display message.
    pub fn category(&self) -> &'static str {
        match self {
            CoreError::InvalidWireFormat { .. } => "invalid_wire_format",
            CoreError::UnsupportedVersion { .. } => "unsupported_version",
            CoreError::InvalidIdentifier { .. } => "invalid_identifier",
            CoreError::Serialization(_) => "serialization",
        }
    }

    /// Malformed input is never fixed by retrying the same bytes.
    pub fn is_retryable(&self) -> bool {
        false
    }
}

/// Crate-local result alias.
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_is_stable_per_variant() {
        assert_eq!(CoreError::invalid_wire_format("bad").category(), "invalid_wire_format");
        assert_eq!(
            CoreError::UnsupportedVersion { found: 2, expected: 1 }.category(),
            "unsupported_version"
        );
        assert!(!CoreError::invalid_identifier("x").is_retryable());
    }
}

//! Error type for constraint violations that couldn't be repaired.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConstraintError {
    #[error("constraint violated on subject {subject:?}: {message}")]
    Violation { subject: String, message: String },
}

impl ConstraintError {
    pub fn violation(subject: impl Into<String>, message: impl Into<String>) -> Self {
        ConstraintError::Violation {
            subject: subject.into(),
            message: message.into(),
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            ConstraintError::Violation { .. } => "constraint_violation",
        }
    }

    pub fn is_retryable(&self) -> bool {
        false
    }
}

pub type Result<T> = std::result::Result<T, ConstraintError>;

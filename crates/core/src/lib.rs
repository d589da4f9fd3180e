//! Shared primitives for all Rust crates in Capstan.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type used across Capstan crates.
pub type AppResult<T> = Result<T, AppError>;

/// A validated non-empty UTF-8 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NonEmptyString(String);

impl NonEmptyString {
    /// Creates a validated non-empty string.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AppError::Validation(
                "value must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

/// Common application error categories.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Filter operator is not supported by the target field.
    #[error("unsupported operator: {0}")]
    UnsupportedOperator(String),

    /// Filter value does not parse into the declared data type.
    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// Structurally invalid search query.
    #[error("malformed query: {0}")]
    MalformedQuery(String),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Candidate provider or export encoder fault.
    #[error("execution failure: {0}")]
    ExecutionFailure(String),

    /// Per-call deadline exceeded.
    #[error("timeout: {0}")]
    Timeout(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

use calagent_llm::LlmError;
use thiserror::Error;

use crate::calendar::CalendarError;

/// Unified error type for the calagent crate.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    /// Invalid input provided by the caller.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Settings could not be loaded or are inconsistent.
    #[error("configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error(transparent)]
    Calendar(#[from] CalendarError),
    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Upstream credential failures, from either the model service or the
    /// calendar store.
    pub fn is_auth(&self) -> bool {
        match self {
            CoreError::Llm(error) => error.is_auth(),
            CoreError::Calendar(error) => matches!(error, CalendarError::Unauthorized),
            _ => false,
        }
    }
}

/// Result type alias using [`CoreError`].
pub type CoreResult<T> = Result<T, CoreError>;

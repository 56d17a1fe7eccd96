use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum LlmError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("missing LLM API key")]
    MissingApiKey,
    #[error("model service rejected the credentials")]
    Unauthorized,
    #[error("model service returned {status}: {message}")]
    Http { status: u16, message: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("could not decode model response: {0}")]
    Decode(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl LlmError {
    /// Credential failures are reported to callers separately from other
    /// upstream failures.
    pub fn is_auth(&self) -> bool {
        matches!(self, LlmError::MissingApiKey | LlmError::Unauthorized)
    }
}

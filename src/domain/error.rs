use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("request validation failed: {message}")]
    Validation { message: String },
}

impl DomainError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Message suitable for echoing back to the caller.
    pub fn public_detail(&self) -> &str {
        match self {
            DomainError::Validation { message } => message,
        }
    }
}

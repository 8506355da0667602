//! Error types for the request layer
//!
//! The extraction engine itself never fails; these only cover the envelope a
//! handler receives before the engine runs.

use serde::Serialize;
use thiserror::Error;

/// Errors that can occur while handling a bounce-processing request
#[derive(Error, Debug)]
pub enum ExtractError {
    /// The request body could not be deserialized
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The request carried no usable message id
    #[error("Missing required field: messageId")]
    MissingMessageId,
}

impl ExtractError {
    /// HTTP status a handler should answer with
    #[must_use]
    pub const fn status(&self) -> u16 {
        match self {
            Self::MissingMessageId => 400,
            Self::InvalidRequest(_) => 500,
        }
    }
}

impl From<serde_json::Error> for ExtractError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidRequest(err.to_string())
    }
}

/// JSON body returned alongside a failed request
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl From<&ExtractError> for ErrorResponse {
    fn from(err: &ExtractError) -> Self {
        Self {
            success: false,
            error: err.to_string(),
        }
    }
}

/// Result type for request handling
pub type Result<T> = std::result::Result<T, ExtractError>;

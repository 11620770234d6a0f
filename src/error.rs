// Error handling module
// Defines the error kinds surfaced by every client operation

use thiserror::Error;

/// Errors that can occur while talking to Graph or SharePoint
#[derive(Error, Debug)]
pub enum ApiError {
    /// A required setting is missing or invalid
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Token endpoint rejected the credentials or returned an unusable body
    #[error("Authentication failed: {0}")]
    AuthError(String),

    /// Connection or timeout failure that survived the retry budget
    #[error("Network error after {attempts} attempt(s): {message}")]
    Network { attempts: u32, message: String },

    /// Non-success response from Graph or SharePoint
    #[error("Service error: {status} - {message}")]
    ServiceError { status: u16, message: String },

    /// A lookup returned no matching record
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller input that cannot be turned into a request
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Internal error (decoding, client construction)
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    /// HTTP status carried by a service error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::ServiceError { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether this error came from the transient (retried) class
    pub fn is_transient(&self) -> bool {
        matches!(self, ApiError::Network { .. })
    }
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ApiError>;

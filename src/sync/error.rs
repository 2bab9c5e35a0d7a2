//! Error types for progress synchronization

use thiserror::Error;

/// Errors that can occur when talking to the local cache or remote backend
#[derive(Debug, Error)]
pub enum SyncError {
    /// Backend URL or key is not configured
    #[error("Backend not configured. Set ILMOS_BACKEND_URL and run `ilmos backend-key`")]
    NotConfigured,

    /// Backend key is not stored anywhere
    #[error("Backend key not found")]
    KeyNotFound,

    /// Failed to access system keyring
    #[error("Failed to access keyring: {0}")]
    KeyringError(String),

    /// Invalid backend key format
    #[error("Invalid backend key format. Expected a JWT or an 'sb_publishable_' key")]
    InvalidKey,

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    /// Backend returned an error response
    #[error("Backend error ({status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error body from the backend
        message: String,
    },

    /// Local cache could not be read or written
    #[error("Local cache error: {0}")]
    CacheError(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl SyncError {
    /// Whether the failure is likely to clear up on its own
    pub fn is_transient(&self) -> bool {
        match self {
            SyncError::RequestError(_) => true,
            SyncError::ApiError { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Whether the backend rejected our credentials
    pub fn requires_reauth(&self) -> bool {
        matches!(
            self,
            SyncError::KeyNotFound
                | SyncError::InvalidKey
                | SyncError::ApiError { status: 401, .. }
                | SyncError::ApiError { status: 403, .. }
        )
    }
}

// ⚠️ Error Taxonomy
// Every failure that can reach a caller of the library or the HTTP API

use thiserror::Error;

/// Errors surfaced by normalization, providers, the store and the API.
///
/// Each variant maps to exactly one HTTP status in the server; see
/// `AppError::status_code` in the `api` module.
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or mistyped request fields (HTTP 400)
    #[error("{0}")]
    Validation(String),

    /// Duplicate category (HTTP 409)
    #[error("{0}")]
    Conflict(String),

    /// OCR / text-generation output that cannot be parsed or has the wrong shape (HTTP 502)
    #[error("malformed external response: {0}")]
    MalformedExternalResponse(String),

    /// External provider unreachable or answered with a non-success status (HTTP 502)
    #[error("external provider error: {0}")]
    Provider(String),

    /// Capability not configured, e.g. scanning without API keys (HTTP 503)
    #[error("{0}")]
    Unavailable(String),

    /// Anything unexpected (HTTP 500, generic message only)
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        AppError::Conflict(message.into())
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        AppError::MalformedExternalResponse(message.into())
    }

    pub fn provider(message: impl Into<String>) -> Self {
        AppError::Provider(message.into())
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_keeps_user_message() {
        let err = AppError::validation("Missing required fields: amount");
        assert_eq!(err.to_string(), "Missing required fields: amount");

        let err = AppError::malformed("no items array");
        assert_eq!(err.to_string(), "malformed external response: no items array");
    }

    #[test]
    fn test_internal_wraps_anyhow() {
        let err: AppError = anyhow::anyhow!("lock poisoned").into();
        assert!(matches!(err, AppError::Internal(_)));
    }
}

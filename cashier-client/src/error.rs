//! Client error types

use cashier_engine::RemoteError;
use shared::{AppError, ErrorCode};
use thiserror::Error;

/// Client error type
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid response format
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Authentication required
    #[error("Authentication required")]
    Unauthorized,

    /// Permission denied
    #[error("Permission denied: {0}")]
    Forbidden(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The API answered with a failure envelope
    #[error("{0}")]
    Api(AppError),
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Bare HTTP failures keep their body as the message
fn rejected(code: ErrorCode, body: String) -> RemoteError {
    RemoteError::rejected(code, Some(body))
}

impl From<ClientError> for RemoteError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Api(app) => RemoteError::from(app),
            ClientError::Unauthorized => RemoteError::rejected(ErrorCode::NotAuthenticated, None),
            ClientError::Forbidden(body) => rejected(ErrorCode::ManagerPasswordInvalid, body),
            ClientError::NotFound(body) => rejected(ErrorCode::NotFound, body),
            ClientError::Validation(body) => rejected(ErrorCode::InvalidRequest, body),
            ClientError::Internal(body) => rejected(ErrorCode::InternalError, body),
            // connection refused, timeouts, and bodies that are not JSON
            other @ (ClientError::Http(_)
            | ClientError::InvalidResponse(_)
            | ClientError::Serialization(_)) => RemoteError::transport(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_error_keeps_code_and_message() {
        let remote = RemoteError::from(ClientError::Api(AppError::with_message(
            ErrorCode::DiscountCodeInvalid,
            "Code SUMMER is not valid",
        )));
        assert_eq!(
            remote,
            RemoteError::Rejected {
                code: ErrorCode::DiscountCodeInvalid,
                message: "Code SUMMER is not valid".into(),
            }
        );
    }

    #[test]
    fn test_status_errors_are_rejections() {
        assert_eq!(
            RemoteError::from(ClientError::Unauthorized).code(),
            ErrorCode::NotAuthenticated
        );
        let remote = RemoteError::from(ClientError::Validation(String::new()));
        assert_eq!(remote.code(), ErrorCode::InvalidRequest);
        assert_eq!(remote.to_string(), "Invalid request");
    }

    #[test]
    fn test_garbage_is_transport() {
        let remote = RemoteError::from(ClientError::InvalidResponse("missing data".into()));
        assert!(matches!(remote, RemoteError::Transport(_)));
    }

    #[test]
    fn test_envelope_network_code_is_transport() {
        let remote = RemoteError::from(ClientError::Api(AppError::new(ErrorCode::TimeoutError)));
        assert!(matches!(remote, RemoteError::Transport(_)));
    }
}

//! API response envelope
//!
//! Every endpoint of the remote order API wraps its payload in this format:
//! ```json
//! {
//!     "code": 0,
//!     "message": "OK",
//!     "data": { ... }
//! }
//! ```

use crate::error::{AppError, ErrorCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Unified API response structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Numeric error code (0 = success). Missing means success.
    #[serde(default)]
    pub code: u16,
    /// Human-readable message
    #[serde(default)]
    pub message: String,
    /// Response data (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Additional error details (present on failure)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, Value>>,
}

impl<T> ApiResponse<T> {
    /// Create a successful response
    pub fn ok(data: T) -> Self {
        Self {
            code: ErrorCode::Success.code(),
            message: "OK".to_string(),
            data: Some(data),
            details: None,
        }
    }

    /// Create an error response
    pub fn error(err: &AppError) -> Self {
        Self {
            code: err.code.code(),
            message: err.message.clone(),
            data: None,
            details: err.details.clone(),
        }
    }

    /// Whether the envelope reports success
    pub fn is_success(&self) -> bool {
        self.code == ErrorCode::Success.code()
    }

    /// Convert the envelope into the payload or the remote error it carries
    ///
    /// Unknown numeric codes become [`ErrorCode::Unknown`]; an empty message
    /// falls back to the code's default message.
    pub fn into_result(self) -> Result<Option<T>, AppError> {
        if self.is_success() {
            return Ok(self.data);
        }

        let code = ErrorCode::try_from(self.code).unwrap_or(ErrorCode::Unknown);
        let message = if self.message.trim().is_empty() {
            code.message().to_string()
        } else {
            self.message
        };
        Err(AppError {
            code,
            message,
            details: self.details,
        })
    }
}

//! HTTP status code mapping for error codes
//!
//! Used in both directions: the client maps a bare HTTP failure (no
//! envelope) to a code via [`ErrorCode::from_http_status`].

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::Success => StatusCode::OK,

            Self::NotFound | Self::OrderNotFound | Self::OrderLineNotFound | Self::TableNotFound => {
                StatusCode::NOT_FOUND
            }

            Self::TableOccupied | Self::OrderLineBusy | Self::CheckoutInProgress => {
                StatusCode::CONFLICT
            }

            Self::NotAuthenticated | Self::InvalidCredentials | Self::TokenExpired => {
                StatusCode::UNAUTHORIZED
            }

            Self::ManagerPasswordInvalid | Self::FreeDiscountUnauthorized => StatusCode::FORBIDDEN,

            Self::StatusTransitionInvalid
            | Self::StatusNotTracked
            | Self::VoidRejected
            | Self::PaymentFailed
            | Self::PaymentInsufficientAmount
            | Self::CreditLimitExceeded
            | Self::DiscountCodeInvalid
            | Self::DiscountCodeExpired
            | Self::TransferSameTable
            | Self::TransferNotPending
            | Self::OrderEmpty => StatusCode::UNPROCESSABLE_ENTITY,

            Self::ValidationFailed
            | Self::InvalidRequest
            | Self::RequiredField
            | Self::ValueOutOfRange
            | Self::PaymentInvalidAccount
            | Self::PaymentReferenceRequired => StatusCode::BAD_REQUEST,

            Self::TimeoutError => StatusCode::GATEWAY_TIMEOUT,
            Self::NetworkError => StatusCode::BAD_GATEWAY,

            Self::Unknown | Self::InternalError | Self::ConfigError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Best-effort code for an HTTP failure that carried no envelope
    pub fn from_http_status(status: StatusCode) -> Self {
        match status {
            StatusCode::BAD_REQUEST => Self::InvalidRequest,
            StatusCode::UNAUTHORIZED => Self::NotAuthenticated,
            StatusCode::FORBIDDEN => Self::ManagerPasswordInvalid,
            StatusCode::NOT_FOUND => Self::NotFound,
            StatusCode::CONFLICT => Self::TableOccupied,
            StatusCode::UNPROCESSABLE_ENTITY => Self::ValidationFailed,
            StatusCode::GATEWAY_TIMEOUT | StatusCode::REQUEST_TIMEOUT => Self::TimeoutError,
            StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE => Self::NetworkError,
            _ => Self::InternalError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ErrorCode::OrderLineNotFound.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ErrorCode::ManagerPasswordInvalid.http_status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ErrorCode::DiscountCodeInvalid.http_status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_from_http_status() {
        assert_eq!(
            ErrorCode::from_http_status(StatusCode::UNAUTHORIZED),
            ErrorCode::NotAuthenticated
        );
        assert_eq!(
            ErrorCode::from_http_status(StatusCode::IM_A_TEAPOT),
            ErrorCode::InternalError
        );
    }
}

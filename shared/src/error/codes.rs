//! Unified error codes for the cashier engine
//!
//! Codes are exchanged with the remote order API inside the response
//! envelope, so numbering is stable:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 4xxx: Order errors
//! - 5xxx: Payment errors
//! - 6xxx: Discount errors
//! - 7xxx: Table errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Invalid request
    InvalidRequest = 5,
    /// Required field missing
    RequiredField = 7,
    /// Value out of range
    ValueOutOfRange = 8,

    // ==================== 1xxx: Auth ====================
    /// User is not authenticated
    NotAuthenticated = 1001,
    /// Invalid credentials (username/password)
    InvalidCredentials = 1002,
    /// Token has expired
    TokenExpired = 1003,
    /// Manager (secondary) password rejected
    ManagerPasswordInvalid = 1010,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Order line not found
    OrderLineNotFound = 4006,
    /// Order is empty
    OrderEmpty = 4007,
    /// Order line has an operation in flight
    OrderLineBusy = 4008,
    /// Preparation status transition not allowed
    StatusTransitionInvalid = 4010,
    /// Line is not tracked by the kitchen
    StatusNotTracked = 4011,
    /// Void rejected
    VoidRejected = 4012,

    // ==================== 5xxx: Payment ====================
    /// Payment processing failed
    PaymentFailed = 5001,
    /// Insufficient payment amount
    PaymentInsufficientAmount = 5002,
    /// Unknown financial account
    PaymentInvalidAccount = 5003,
    /// Card reference required for this account
    PaymentReferenceRequired = 5006,
    /// Customer credit limit exceeded
    CreditLimitExceeded = 5007,
    /// Checkout already being submitted
    CheckoutInProgress = 5008,

    // ==================== 6xxx: Discount ====================
    /// Discount code rejected
    DiscountCodeInvalid = 6001,
    /// Discount code expired
    DiscountCodeExpired = 6002,
    /// Free discount requires authorization
    FreeDiscountUnauthorized = 6003,

    // ==================== 7xxx: Table ====================
    /// Table not found
    TableNotFound = 7001,
    /// Table is occupied
    TableOccupied = 7002,
    /// Transfer destination equals source
    TransferSameTable = 7005,
    /// No transfer in progress
    TransferNotPending = 7006,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Network error
    NetworkError = 9003,
    /// Operation timeout
    TimeoutError = 9004,
    /// Configuration error
    ConfigError = 9005,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::RequiredField => "Required field is missing",
            ErrorCode::ValueOutOfRange => "Value is out of range",

            // Auth
            ErrorCode::NotAuthenticated => "User is not authenticated",
            ErrorCode::InvalidCredentials => "Invalid username or password",
            ErrorCode::TokenExpired => "Authentication token has expired",
            ErrorCode::ManagerPasswordInvalid => "Manager password is incorrect",

            // Order
            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::OrderLineNotFound => "Order line not found",
            ErrorCode::OrderEmpty => "Order is empty",
            ErrorCode::OrderLineBusy => "Order line is being updated",
            ErrorCode::StatusTransitionInvalid => "Preparation status cannot move backward",
            ErrorCode::StatusNotTracked => "Line is not tracked by the kitchen",
            ErrorCode::VoidRejected => "Void was rejected",

            // Payment
            ErrorCode::PaymentFailed => "Payment processing failed",
            ErrorCode::PaymentInsufficientAmount => "Insufficient payment amount",
            ErrorCode::PaymentInvalidAccount => "Unknown financial account",
            ErrorCode::PaymentReferenceRequired => "A 4-digit card reference is required",
            ErrorCode::CreditLimitExceeded => "Customer credit limit exceeded",
            ErrorCode::CheckoutInProgress => "Checkout is already being submitted",

            // Discount
            ErrorCode::DiscountCodeInvalid => "Discount code is invalid",
            ErrorCode::DiscountCodeExpired => "Discount code has expired",
            ErrorCode::FreeDiscountUnauthorized => "Free discount requires manager authorization",

            // Table
            ErrorCode::TableNotFound => "Table not found",
            ErrorCode::TableOccupied => "Table is occupied",
            ErrorCode::TransferSameTable => "Cannot transfer an order to the same table",
            ErrorCode::TransferNotPending => "No transfer in progress",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::NetworkError => "Network error",
            ErrorCode::TimeoutError => "Operation timed out",
            ErrorCode::ConfigError => "Configuration error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:04}", self.code())
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            5 => Ok(ErrorCode::InvalidRequest),
            7 => Ok(ErrorCode::RequiredField),
            8 => Ok(ErrorCode::ValueOutOfRange),

            // Auth
            1001 => Ok(ErrorCode::NotAuthenticated),
            1002 => Ok(ErrorCode::InvalidCredentials),
            1003 => Ok(ErrorCode::TokenExpired),
            1010 => Ok(ErrorCode::ManagerPasswordInvalid),

            // Order
            4001 => Ok(ErrorCode::OrderNotFound),
            4006 => Ok(ErrorCode::OrderLineNotFound),
            4007 => Ok(ErrorCode::OrderEmpty),
            4008 => Ok(ErrorCode::OrderLineBusy),
            4010 => Ok(ErrorCode::StatusTransitionInvalid),
            4011 => Ok(ErrorCode::StatusNotTracked),
            4012 => Ok(ErrorCode::VoidRejected),

            // Payment
            5001 => Ok(ErrorCode::PaymentFailed),
            5002 => Ok(ErrorCode::PaymentInsufficientAmount),
            5003 => Ok(ErrorCode::PaymentInvalidAccount),
            5006 => Ok(ErrorCode::PaymentReferenceRequired),
            5007 => Ok(ErrorCode::CreditLimitExceeded),
            5008 => Ok(ErrorCode::CheckoutInProgress),

            // Discount
            6001 => Ok(ErrorCode::DiscountCodeInvalid),
            6002 => Ok(ErrorCode::DiscountCodeExpired),
            6003 => Ok(ErrorCode::FreeDiscountUnauthorized),

            // Table
            7001 => Ok(ErrorCode::TableNotFound),
            7002 => Ok(ErrorCode::TableOccupied),
            7005 => Ok(ErrorCode::TransferSameTable),
            7006 => Ok(ErrorCode::TransferNotPending),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9003 => Ok(ErrorCode::NetworkError),
            9004 => Ok(ErrorCode::TimeoutError),
            9005 => Ok(ErrorCode::ConfigError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

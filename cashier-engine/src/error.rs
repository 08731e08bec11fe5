//! Engine error types
//!
//! Every failure is surfaced to the cashier as a notice; nothing is retried
//! automatically and no state is mutated on any error path.

use rust_decimal::Decimal;
use shared::order::{LocalId, PreparationStatus};
use shared::{AppError, ErrorCode};
use thiserror::Error;

/// Client-side validation failure, detected before any remote call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Amount must not be negative")]
    NegativeAmount,

    #[error("Quantity {0} is not valid for this product")]
    InvalidQuantity(Decimal),

    #[error("Payment splits total {allocated} but {payable} is due")]
    SplitTotalMismatch { allocated: Decimal, payable: Decimal },

    #[error("Split {split_id} requires the last 4 digits of the card")]
    MissingReference { split_id: u32 },

    #[error("Split {0} not found")]
    SplitNotFound(u32),

    #[error("The last payment split cannot be removed")]
    LastSplit,

    #[error("Unknown payment account: {0}")]
    UnknownAccount(String),

    #[error("No payment account is configured")]
    NoAccounts,

    #[error("Credit limit {limit} does not cover {payable}")]
    CreditLimitExceeded { limit: Decimal, payable: Decimal },

    #[error("Cannot transfer an order to the table it is already on")]
    SameTable,

    #[error("Select a table")]
    MissingTable,

    #[error("Table {0} has items that were not sent yet")]
    DestinationHasUnsentLines(String),

    #[error("Only dine-in orders can be paid in part")]
    PartialPaymentNotDineIn,

    #[error("Select at least one line")]
    EmptySelection,

    #[error("Select a target status")]
    MissingTarget,

    #[error("Line {local_id} cannot move from {from:?} to {to:?}")]
    BackwardTransition {
        local_id: LocalId,
        from: PreparationStatus,
        to: PreparationStatus,
    },

    #[error("Line {0} is not tracked by the kitchen")]
    NotTracked(LocalId),

    #[error("Free discount requires manager authorization")]
    FreeDiscountUnauthorized,

    #[error("Manager credentials are required")]
    MissingManagerCredentials,

    #[error("Manager password is incorrect")]
    InvalidManagerPassword,

    #[error("Discount code must not be empty")]
    EmptyDiscountCode,

    #[error("The order has no lines")]
    EmptyOrder,
}

impl ValidationError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NegativeAmount | Self::InvalidQuantity(_) => ErrorCode::ValueOutOfRange,
            Self::SplitTotalMismatch { .. } => ErrorCode::PaymentInsufficientAmount,
            Self::MissingReference { .. } => ErrorCode::PaymentReferenceRequired,
            Self::SplitNotFound(_) => ErrorCode::NotFound,
            Self::LastSplit => ErrorCode::InvalidRequest,
            Self::UnknownAccount(_) | Self::NoAccounts => ErrorCode::PaymentInvalidAccount,
            Self::CreditLimitExceeded { .. } => ErrorCode::CreditLimitExceeded,
            Self::SameTable => ErrorCode::TransferSameTable,
            Self::MissingTable => ErrorCode::RequiredField,
            Self::DestinationHasUnsentLines(_) => ErrorCode::TableOccupied,
            Self::PartialPaymentNotDineIn => ErrorCode::InvalidRequest,
            Self::EmptySelection | Self::MissingTarget => ErrorCode::RequiredField,
            Self::BackwardTransition { .. } => ErrorCode::StatusTransitionInvalid,
            Self::NotTracked(_) => ErrorCode::StatusNotTracked,
            Self::FreeDiscountUnauthorized => ErrorCode::FreeDiscountUnauthorized,
            Self::MissingManagerCredentials => ErrorCode::RequiredField,
            Self::InvalidManagerPassword => ErrorCode::ManagerPasswordInvalid,
            Self::EmptyDiscountCode => ErrorCode::DiscountCodeInvalid,
            Self::EmptyOrder => ErrorCode::OrderEmpty,
        }
    }
}

/// Failure reported by (or while reaching) the remote order API
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The API answered and refused the operation
    #[error("{message}")]
    Rejected { code: ErrorCode, message: String },

    /// The API could not be reached or answered garbage
    #[error("Network error: {0}")]
    Transport(String),
}

impl RemoteError {
    /// Build a rejection, falling back to the code's default message
    pub fn rejected(code: ErrorCode, message: Option<String>) -> Self {
        let message = message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| code.message().to_string());
        Self::Rejected { code, message }
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Rejected { code, .. } => *code,
            Self::Transport(_) => ErrorCode::NetworkError,
        }
    }
}

impl From<AppError> for RemoteError {
    fn from(err: AppError) -> Self {
        match err.code {
            ErrorCode::NetworkError | ErrorCode::TimeoutError => Self::Transport(err.message),
            code => Self::rejected(code, Some(err.message)),
        }
    }
}

/// Engine error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("Line {0} has an operation in progress")]
    LineBusy(LocalId),

    #[error("Line {0} not found")]
    LineNotFound(LocalId),

    #[error("No transfer is in progress")]
    NoPendingTransfer,

    #[error("Checkout is being submitted")]
    CheckoutInProgress,
}

impl EngineError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation(e) => e.code(),
            Self::Remote(e) => e.code(),
            Self::LineBusy(_) => ErrorCode::OrderLineBusy,
            Self::LineNotFound(_) => ErrorCode::OrderLineNotFound,
            Self::NoPendingTransfer => ErrorCode::TransferNotPending,
            Self::CheckoutInProgress => ErrorCode::CheckoutInProgress,
        }
    }

    /// Notice shown to the cashier
    pub fn user_message(&self) -> String {
        match self {
            Self::Remote(RemoteError::Transport(_)) => {
                "Could not reach the server, please try again".to_string()
            }
            Self::LineBusy(_) => "This item is being updated, please wait".to_string(),
            other => other.to_string(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        AppError::with_message(err.code(), err.user_message())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_falls_back_to_code_message() {
        let err = RemoteError::rejected(ErrorCode::PaymentFailed, None);
        assert_eq!(err.to_string(), ErrorCode::PaymentFailed.message());

        let err = RemoteError::rejected(ErrorCode::PaymentFailed, Some("  ".into()));
        assert_eq!(err.to_string(), ErrorCode::PaymentFailed.message());

        let err = RemoteError::rejected(ErrorCode::PaymentFailed, Some("Card declined".into()));
        assert_eq!(err.to_string(), "Card declined");
    }

    #[test]
    fn test_app_error_conversion() {
        let remote: RemoteError = AppError::network("connection reset").into();
        assert!(matches!(remote, RemoteError::Transport(_)));

        let remote: RemoteError =
            AppError::with_message(ErrorCode::TableNotFound, "Table 9 missing").into();
        assert_eq!(remote.code(), ErrorCode::TableNotFound);
    }

    #[test]
    fn test_user_message() {
        let err = EngineError::from(ValidationError::MissingReference { split_id: 2 });
        assert_eq!(
            err.user_message(),
            "Split 2 requires the last 4 digits of the card"
        );
        assert_eq!(err.code(), ErrorCode::PaymentReferenceRequired);

        let err = EngineError::from(RemoteError::transport("timeout"));
        assert_eq!(
            err.user_message(),
            "Could not reach the server, please try again"
        );

        let app: AppError = EngineError::LineBusy(LocalId(3)).into();
        assert_eq!(app.code, ErrorCode::OrderLineBusy);
    }

    #[test]
    fn test_table_and_partial_payment_errors_are_distinct() {
        assert_eq!(ValidationError::MissingTable.code(), ErrorCode::RequiredField);
        assert_eq!(
            ValidationError::PartialPaymentNotDineIn.to_string(),
            "Only dine-in orders can be paid in part"
        );
        assert_eq!(
            ValidationError::PartialPaymentNotDineIn.code(),
            ErrorCode::InvalidRequest
        );
        let err = ValidationError::DestinationHasUnsentLines("T4".into());
        assert_eq!(err.to_string(), "Table T4 has items that were not sent yet");
        assert_eq!(err.code(), ErrorCode::TableOccupied);
    }
}

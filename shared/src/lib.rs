//! Shared types for the cashier engine
//!
//! Domain types used by both `cashier-engine` and `cashier-client`:
//! order lines, preparation status, discounts, payment splits,
//! wire DTOs for the remote order API, error codes and the response envelope.

pub mod error;
pub mod order;
pub mod response;

// Re-exports
pub use rust_decimal::Decimal;
pub use serde::{Deserialize, Serialize};

pub use error::{AppError, AppResult, ErrorCategory, ErrorCode};
pub use response::ApiResponse;

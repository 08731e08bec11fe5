//! Order domain types
//!
//! - `types`: order type, order context and identifiers
//! - `line`: order lines, line candidates, patches and the canonical line key
//! - `status`: kitchen preparation status and its descriptors
//! - `discount`: discount state selected for the active order
//! - `payment`: financial accounts, payment splits and due customers
//! - `wire`: request/response DTOs of the remote order API

pub mod discount;
pub mod line;
pub mod payment;
pub mod status;
pub mod types;
pub mod wire;

// Re-exports
pub use discount::{CodeDiscount, DiscountState, DiscountValue, ListDiscount, ModuleDiscount};
pub use line::{
    LineCandidate, LineKind, LinePatch, OrderLine, PricedOption, SelectedAddon, SelectedExtra,
};
pub use payment::{DueCustomer, FinancialAccount, PaymentSplit};
pub use status::{PreparationStatus, StatusDescriptor};
pub use types::{LocalId, OrderContext, OrderType, RemoteLineId};

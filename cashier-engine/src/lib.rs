//! Cashier Engine - order and checkout logic of a point-of-sale client
//!
//! # Overview
//!
//! - **Order lines** (`orders`): one store per table, take-away session or
//!   delivery customer; merging of duplicates, quantity rules, busy flags,
//!   line sync, reload, voids and table transfers
//! - **Preparation status** (`orders::status`): forward-only kitchen status,
//!   single and bulk, all-or-nothing against the remote order
//! - **Money** (`money`): subtotal, tax, service fee, discounts and payable
//!   totals on `Decimal`
//! - **Discounts** (`discounts`): code, module, list and free discounts of the
//!   active order
//! - **Checkout** (`checkout`): payment splits, validation and submission
//!
//! The remote order API is reached through [`remote::OrderApi`]; session state
//! lives in an injected [`kv::KeyValueStore`].
//!
//! # Layout
//!
//! ```text
//! cashier-engine/src/
//! ├── core/          # configuration
//! ├── orders/        # line store, registry, status, sync, void, transfer
//! ├── money/         # totals calculator
//! ├── checkout/      # payment splitter and submission
//! ├── utils/         # logging
//! ├── discounts.rs   # discount selection
//! ├── kv.rs          # session key-value store
//! ├── remote.rs      # remote order API trait
//! └── testing.rs     # in-memory OrderApi
//! ```

pub mod checkout;
pub mod core;
pub mod discounts;
pub mod error;
pub mod kv;
pub mod money;
pub mod orders;
pub mod remote;
pub mod testing;
pub mod utils;

pub use checkout::{CheckoutOptions, CheckoutPhase, CheckoutSession, SubmitOutcome};
pub use crate::core::EngineConfig;
pub use discounts::DiscountControl;
pub use error::{EngineError, EngineResult, RemoteError, ValidationError};
pub use kv::{KeyValueStore, MemoryStore, SharedKv};
pub use money::{PricingConfig, Totals, calculate_totals};
pub use orders::{OrderHandle, OrderLineStore, OrderRegistry, TransferCoordinator};
pub use remote::{OrderApi, SharedApi};

pub use utils::logger::{cleanup_old_logs, init_logger, init_logger_with_file};

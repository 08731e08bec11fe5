//! Order lines of the active orders
//!
//! - [`store`]: the authoritative line collection and its busy reservations
//! - [`status`]: kitchen preparation transitions
//! - [`transfer`]: moving a dine-in order between tables
//! - [`sync`]: sending new lines and reloading remote orders
//! - [`void`]: manager-authorized voids
//! - [`registry`]: one store per active context

pub mod registry;
pub mod status;
pub mod store;
pub mod sync;
pub mod transfer;
pub mod void;

pub use registry::OrderRegistry;
pub use status::{
    AdvanceOutcome, BulkOutcome, advance_bulk, advance_one, eligible_targets, mark_done,
    mark_preparing,
};
pub use store::{BusyGuard, OrderHandle, OrderLineStore, QuantityChange};
pub use sync::{reload_from_remote, send_new_lines};
pub use transfer::{TransferCoordinator, TransferIntent, TransferOutcome};
pub use void::{ManagerCredentials, VoidOutcome, void_lines};

//! Remote order API seam
//!
//! The backend owns persisted orders, the kitchen display and payments.
//! [`OrderApi`] is the only way the engine talks to it; `cashier-client`
//! implements it over HTTP and [`crate::testing::MockOrderApi`] in memory.

use crate::error::RemoteError;
use async_trait::async_trait;
use shared::order::OrderContext;
use shared::order::wire::{
    CheckoutReceipt, CheckoutRequest, CreateLinesRequest, CreateLinesResponse,
    DiscountCodeGrant, RemoteOrderLine, StatusUpdateRequest, TransferRequest, VoidLinesRequest,
};
use std::sync::Arc;

#[async_trait]
pub trait OrderApi: Send + Sync {
    /// Create the remote order for a context or append lines to it
    ///
    /// Returns the remote ids of every submitted product, in request order.
    async fn create_lines(&self, req: CreateLinesRequest)
    -> Result<CreateLinesResponse, RemoteError>;

    /// Lines of the open remote order of a context (empty if none)
    async fn fetch_order(&self, context: &OrderContext)
    -> Result<Vec<RemoteOrderLine>, RemoteError>;

    async fn update_status(&self, req: StatusUpdateRequest) -> Result<(), RemoteError>;

    async fn void_lines(&self, req: VoidLinesRequest) -> Result<(), RemoteError>;

    async fn transfer(&self, req: TransferRequest) -> Result<(), RemoteError>;

    /// Submit a finalized order to `req.endpoint`
    async fn checkout(&self, req: CheckoutRequest) -> Result<CheckoutReceipt, RemoteError>;

    async fn validate_discount_code(
        &self,
        context: &OrderContext,
        code: &str,
    ) -> Result<DiscountCodeGrant, RemoteError>;
}

pub type SharedApi = Arc<dyn OrderApi>;

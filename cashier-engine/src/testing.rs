//! In-memory [`OrderApi`] for tests and offline demos
//!
//! Records every call, can be told to reject an operation, and can hold an
//! operation open until released to exercise in-flight behavior.

use crate::error::RemoteError;
use crate::remote::OrderApi;
use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use shared::ErrorCode;
use shared::order::OrderContext;
use shared::order::wire::{
    CheckoutReceipt, CheckoutRequest, CreateLinesRequest, CreateLinesResponse,
    DiscountCodeGrant, RemoteOrderLine, StatusUpdateRequest, TransferRequest, VoidLinesRequest,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Remote operation kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiOp {
    CreateLines,
    FetchOrder,
    UpdateStatus,
    VoidLines,
    Transfer,
    Checkout,
    ValidateDiscountCode,
}

/// A recorded call
#[derive(Debug, Clone)]
pub enum ApiCall {
    CreateLines(CreateLinesRequest),
    FetchOrder(OrderContext),
    UpdateStatus(StatusUpdateRequest),
    VoidLines(VoidLinesRequest),
    Transfer(TransferRequest),
    Checkout(CheckoutRequest),
    ValidateDiscountCode(String),
}

impl ApiCall {
    pub fn op(&self) -> ApiOp {
        match self {
            Self::CreateLines(_) => ApiOp::CreateLines,
            Self::FetchOrder(_) => ApiOp::FetchOrder,
            Self::UpdateStatus(_) => ApiOp::UpdateStatus,
            Self::VoidLines(_) => ApiOp::VoidLines,
            Self::Transfer(_) => ApiOp::Transfer,
            Self::Checkout(_) => ApiOp::Checkout,
            Self::ValidateDiscountCode(_) => ApiOp::ValidateDiscountCode,
        }
    }
}

#[derive(Debug, Default)]
pub struct MockOrderApi {
    calls: Mutex<Vec<ApiCall>>,
    failures: Mutex<HashMap<ApiOp, RemoteError>>,
    gates: Mutex<HashMap<ApiOp, Arc<Semaphore>>>,
    remote_orders: Mutex<HashMap<String, Vec<RemoteOrderLine>>>,
    discount_codes: Mutex<HashMap<String, Decimal>>,
    next_id: Mutex<u64>,
}

impl MockOrderApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    // ========== Behavior ==========

    /// Reject every call of `op` with a generic rejection
    pub fn fail(&self, op: ApiOp) {
        self.fail_with(op, RemoteError::rejected(ErrorCode::InternalError, None));
    }

    pub fn fail_with(&self, op: ApiOp, error: RemoteError) {
        self.failures.lock().insert(op, error);
    }

    pub fn succeed(&self, op: ApiOp) {
        self.failures.lock().remove(&op);
    }

    /// Keep calls of `op` pending until [`MockOrderApi::release`]
    pub fn hold(&self, op: ApiOp) {
        self.gates.lock().insert(op, Arc::new(Semaphore::new(0)));
    }

    pub fn release(&self, op: ApiOp) {
        if let Some(gate) = self.gates.lock().remove(&op) {
            gate.close();
        }
    }

    pub fn set_remote_order(&self, context: &OrderContext, lines: Vec<RemoteOrderLine>) {
        self.remote_orders.lock().insert(context.cart_key(), lines);
    }

    pub fn remote_order(&self, context: &OrderContext) -> Vec<RemoteOrderLine> {
        self.remote_orders
            .lock()
            .get(&context.cart_key())
            .cloned()
            .unwrap_or_default()
    }

    pub fn add_discount_code(&self, code: &str, percentage: Decimal) {
        self.discount_codes
            .lock()
            .insert(code.to_string(), percentage);
    }

    // ========== Inspection ==========

    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self, op: ApiOp) -> usize {
        self.calls.lock().iter().filter(|c| c.op() == op).count()
    }

    pub fn status_updates(&self) -> Vec<StatusUpdateRequest> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                ApiCall::UpdateStatus(r) => Some(r.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn checkouts(&self) -> Vec<CheckoutRequest> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                ApiCall::Checkout(r) => Some(r.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn voids(&self) -> Vec<VoidLinesRequest> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                ApiCall::VoidLines(r) => Some(r.clone()),
                _ => None,
            })
            .collect()
    }

    // ========== Internals ==========

    async fn enter(&self, call: ApiCall) -> Result<(), RemoteError> {
        let op = call.op();
        self.calls.lock().push(call);

        let gate = self.gates.lock().get(&op).cloned();
        if let Some(gate) = gate {
            // closed on release
            let _ = gate.acquire().await;
        }

        match self.failures.lock().get(&op) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn next_remote_id(&self) -> String {
        let mut next = self.next_id.lock();
        *next += 1;
        format!("rl-{}", *next)
    }
}

#[async_trait]
impl OrderApi for MockOrderApi {
    async fn create_lines(
        &self,
        req: CreateLinesRequest,
    ) -> Result<CreateLinesResponse, RemoteError> {
        self.enter(ApiCall::CreateLines(req.clone())).await?;
        let remote_line_ids = req
            .products
            .iter()
            .map(|_| vec![self.next_remote_id()])
            .collect();
        Ok(CreateLinesResponse { remote_line_ids })
    }

    async fn fetch_order(
        &self,
        context: &OrderContext,
    ) -> Result<Vec<RemoteOrderLine>, RemoteError> {
        self.enter(ApiCall::FetchOrder(context.clone())).await?;
        Ok(self.remote_order(context))
    }

    async fn update_status(&self, req: StatusUpdateRequest) -> Result<(), RemoteError> {
        self.enter(ApiCall::UpdateStatus(req)).await
    }

    async fn void_lines(&self, req: VoidLinesRequest) -> Result<(), RemoteError> {
        self.enter(ApiCall::VoidLines(req)).await
    }

    async fn transfer(&self, req: TransferRequest) -> Result<(), RemoteError> {
        self.enter(ApiCall::Transfer(req.clone())).await?;

        let source = OrderContext::dine_in(&req.source_table_id).cart_key();
        let destination = OrderContext::dine_in(&req.destination_table_id).cart_key();
        let mut orders = self.remote_orders.lock();
        let moved = orders.remove(&source).unwrap_or_default();
        orders.entry(destination).or_default().extend(moved);
        Ok(())
    }

    async fn checkout(&self, req: CheckoutRequest) -> Result<CheckoutReceipt, RemoteError> {
        self.enter(ApiCall::Checkout(req.clone())).await?;
        let order_id = self.next_remote_id();
        Ok(CheckoutReceipt {
            order_number: Some(order_id.trim_start_matches("rl-").to_string()),
            order_id,
            payable_total: req.payable_total,
            created_at: None,
        })
    }

    async fn validate_discount_code(
        &self,
        _context: &OrderContext,
        code: &str,
    ) -> Result<DiscountCodeGrant, RemoteError> {
        self.enter(ApiCall::ValidateDiscountCode(code.to_string()))
            .await?;
        match self.discount_codes.lock().get(code) {
            Some(percentage) => Ok(DiscountCodeGrant {
                code: code.to_string(),
                percentage: *percentage,
            }),
            None => Err(RemoteError::rejected(ErrorCode::DiscountCodeInvalid, None)),
        }
    }
}

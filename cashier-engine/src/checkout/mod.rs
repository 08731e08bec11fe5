//! Checkout / Payment Splitter
//!
//! A [`CheckoutSession`] lives for one payment attempt: it freezes the lines
//! being paid and their totals, collects payment splits, validates them and
//! submits the finalized order.
//!
//! Phases: `CollectingSplits → Validating → Submitting → Succeeded | Failed`.
//! A failed attempt returns to collecting splits on the next edit or submit.
//!
//! The paid lines stay reserved in the store from `open` until the payment
//! succeeds or the session is closed (or dropped), so what is removed on
//! success is exactly what was charged.

mod auth;

pub use auth::{SecondaryAuthorizer, StaticPasswordAuthorizer};

use crate::audit_log;
use crate::discounts::DiscountControl;
use crate::error::{EngineError, EngineResult, ValidationError};
use crate::money::{PricingConfig, Totals, calculate_totals, is_payment_sufficient, round_money};
use crate::orders::{BusyGuard, OrderHandle};
use crate::remote::SharedApi;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::Serialize;
use shared::order::wire::{
    CheckoutEndpoint, CheckoutReceipt, CheckoutRequest, FlattenedProduct, SplitPayload,
};
use shared::order::{
    DiscountState, DueCustomer, FinancialAccount, LocalId, OrderLine, OrderType, PaymentSplit,
};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutPhase {
    CollectingSplits,
    Validating,
    Submitting,
    Succeeded,
    Failed,
}

/// Result of setting a split amount
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountChange {
    Applied(Decimal),
    /// The requested amount exceeded what was left and was reduced
    Clamped { requested: Decimal, applied: Decimal },
}

impl AmountChange {
    pub fn applied(&self) -> Decimal {
        match self {
            Self::Applied(amount) | Self::Clamped { applied: amount, .. } => *amount,
        }
    }

    /// Notice shown to the cashier when the amount was reduced
    pub fn notice(&self) -> Option<String> {
        match self {
            Self::Applied(_) => None,
            Self::Clamped { applied, .. } => Some(format!(
                "Amount reduced to the remaining {}",
                applied
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Submitted(CheckoutReceipt),
    /// Another submission is in flight or the attempt is over
    Ignored,
    /// The session was closed while the request was in flight
    Discarded,
}

/// Inputs of a checkout attempt beyond the order itself
#[derive(Debug, Clone, Default)]
pub struct CheckoutOptions {
    pub pricing: PricingConfig,
    pub delivery_fee: Decimal,
    /// Pay only these lines (dine-in); the table stays open
    pub paid_lines: Option<Vec<LocalId>>,
}

#[derive(Debug)]
struct SessionState {
    phase: CheckoutPhase,
    splits: Vec<PaymentSplit>,
    next_split_id: u32,
    due_customer: Option<DueCustomer>,
    free_discount_authorized: bool,
    closed: bool,
}

pub struct CheckoutSession {
    handle: OrderHandle,
    api: SharedApi,
    discounts: DiscountControl,
    accounts: Vec<FinancialAccount>,
    order_type: OrderType,
    lines: Vec<OrderLine>,
    partial: bool,
    discount: DiscountState,
    totals: Totals,
    state: Mutex<SessionState>,
    /// Reservation of the paid lines; `None` once released
    reservation: Mutex<Option<BusyGuard>>,
    in_flight: AtomicBool,
    epoch: AtomicU64,
}

/// Clears the submission lock when the submit future finishes or is dropped
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl CheckoutSession {
    /// Freeze the order (or the paid subset) and seed one split for the full
    /// payable against the default account
    ///
    /// Fails with [`EngineError::LineBusy`] when a paid line is reserved by
    /// another operation.
    pub fn open(
        handle: OrderHandle,
        api: SharedApi,
        discounts: DiscountControl,
        accounts: Vec<FinancialAccount>,
        options: CheckoutOptions,
    ) -> EngineResult<Self> {
        let default_account = accounts
            .iter()
            .find(|a| a.is_cash)
            .or_else(|| accounts.first())
            .map(|a| a.id.clone())
            .ok_or(ValidationError::NoAccounts)?;

        let (reservation, (context, lines, partial)) = handle.try_lock_lines_with(|store| {
            let context = store.context().clone();
            let all_lines = store.lines();

            let (lines, partial) = match &options.paid_lines {
                Some(ids) => {
                    if context.order_type() != OrderType::DineIn {
                        return Err(ValidationError::PartialPaymentNotDineIn.into());
                    }
                    if let Some(missing) = ids.iter().find(|id| store.line(**id).is_none()) {
                        return Err(EngineError::LineNotFound(*missing));
                    }
                    let subset: Vec<OrderLine> = all_lines
                        .iter()
                        .filter(|l| ids.contains(&l.local_id))
                        .cloned()
                        .collect();
                    let partial = subset.len() < all_lines.len();
                    (subset, partial)
                }
                None => (all_lines.to_vec(), false),
            };
            if lines.is_empty() {
                return Err(ValidationError::EmptyOrder.into());
            }

            let ids = lines.iter().map(|l| l.local_id).collect();
            Ok((ids, (context, lines, partial)))
        })?;
        let order_type = context.order_type();

        let discount = discounts.state();
        let totals = calculate_totals(
            &lines,
            &discount,
            &options.pricing,
            order_type,
            options.delivery_fee,
        )
        .rounded();

        tracing::info!(
            context = %context,
            lines = lines.len(),
            partial,
            payable = %totals.payable_total,
            "Checkout opened"
        );

        Ok(Self {
            handle,
            api,
            discounts,
            accounts,
            order_type,
            lines,
            partial,
            discount,
            totals,
            state: Mutex::new(SessionState {
                phase: CheckoutPhase::CollectingSplits,
                splits: vec![PaymentSplit::new(1, default_account, totals.payable_total)],
                next_split_id: 2,
                due_customer: None,
                free_discount_authorized: false,
                closed: false,
            }),
            reservation: Mutex::new(Some(reservation)),
            in_flight: AtomicBool::new(false),
            epoch: AtomicU64::new(0),
        })
    }

    // ========== Queries ==========

    pub fn totals(&self) -> Totals {
        self.totals
    }

    pub fn payable(&self) -> Decimal {
        self.totals.payable_total
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    pub fn is_partial(&self) -> bool {
        self.partial
    }

    pub fn endpoint(&self) -> CheckoutEndpoint {
        CheckoutEndpoint::select(self.order_type, self.partial)
    }

    pub fn phase(&self) -> CheckoutPhase {
        self.state.lock().phase
    }

    pub fn splits(&self) -> Vec<PaymentSplit> {
        self.state.lock().splits.clone()
    }

    pub fn allocated_amount(&self) -> Decimal {
        allocated(&self.state.lock().splits)
    }

    /// Payable not yet covered by splits, never negative
    pub fn remaining_amount(&self) -> Decimal {
        (self.totals.payable_total - self.allocated_amount()).max(Decimal::ZERO)
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    // ========== Split editing ==========

    /// Add a split covering whatever is still unallocated
    pub fn add_split(&self, account_id: &str) -> EngineResult<PaymentSplit> {
        self.account(account_id)?;
        let mut state = self.editable_state()?;
        let remaining = (self.totals.payable_total - allocated(&state.splits)).max(Decimal::ZERO);
        let split = PaymentSplit::new(state.next_split_id, account_id, remaining);
        state.next_split_id += 1;
        state.splits.push(split.clone());
        Ok(split)
    }

    pub fn remove_split(&self, split_id: u32) -> EngineResult<()> {
        let mut state = self.editable_state()?;
        let index = split_index(&state.splits, split_id)?;
        if state.splits.len() == 1 {
            return Err(ValidationError::LastSplit.into());
        }
        state.splits.remove(index);
        Ok(())
    }

    /// Set a split's amount, clamped to what the other splits leave
    pub fn set_split_amount(&self, split_id: u32, amount: Decimal) -> EngineResult<AmountChange> {
        if amount < Decimal::ZERO {
            return Err(ValidationError::NegativeAmount.into());
        }
        let mut state = self.editable_state()?;
        let index = split_index(&state.splits, split_id)?;

        let others: Decimal = state
            .splits
            .iter()
            .filter(|s| s.split_id != split_id)
            .map(|s| s.amount)
            .sum();
        let available = (self.totals.payable_total - others).max(Decimal::ZERO);
        let requested = round_money(amount);

        let change = if requested > available {
            AmountChange::Clamped {
                requested,
                applied: available,
            }
        } else {
            AmountChange::Applied(requested)
        };
        state.splits[index].amount = change.applied();
        Ok(change)
    }

    pub fn set_split_account(&self, split_id: u32, account_id: &str) -> EngineResult<()> {
        let account = self.account(account_id)?;
        let mut state = self.editable_state()?;
        let index = split_index(&state.splits, split_id)?;
        let split = &mut state.splits[index];
        split.account_id = account.id.clone();
        if !account.requires_reference {
            split.reference_digits = None;
        }
        Ok(())
    }

    pub fn set_reference_digits(&self, split_id: u32, digits: &str) -> EngineResult<()> {
        let mut state = self.editable_state()?;
        let index = split_index(&state.splits, split_id)?;
        let digits = digits.trim();
        state.splits[index].reference_digits = (!digits.is_empty()).then(|| digits.to_string());
        Ok(())
    }

    pub fn set_transaction_id(&self, split_id: u32, transaction_id: &str) -> EngineResult<()> {
        let mut state = self.editable_state()?;
        let index = split_index(&state.splits, split_id)?;
        let transaction_id = transaction_id.trim();
        state.splits[index].transaction_id =
            (!transaction_id.is_empty()).then(|| transaction_id.to_string());
        Ok(())
    }

    /// Settle on credit against `customer` (or go back to splits with `None`)
    pub fn set_due_customer(&self, customer: Option<DueCustomer>) -> EngineResult<()> {
        let mut state = self.editable_state()?;
        state.due_customer = customer;
        Ok(())
    }

    /// Confirm the free discount with a manager password
    ///
    /// One successful confirmation covers the rest of the attempt.
    pub fn authorize_free_discount(
        &self,
        password: &str,
        authorizer: &dyn SecondaryAuthorizer,
    ) -> EngineResult<()> {
        let mut state = self.editable_state()?;
        if state.free_discount_authorized {
            return Ok(());
        }
        if !authorizer.verify(password) {
            tracing::warn!("Free discount authorization failed");
            return Err(ValidationError::InvalidManagerPassword.into());
        }
        state.free_discount_authorized = true;

        let resource = format!("order:{}", self.handle.context());
        let details = format!("free discount {}", self.totals.free_discount_amount);
        audit_log!("manager", "authorize_free_discount", resource, details);
        Ok(())
    }

    // ========== Validation & submission ==========

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.validate_state(&self.state.lock())
    }

    fn validate_state(&self, state: &SessionState) -> Result<(), ValidationError> {
        let payable = self.totals.payable_total;

        if self.discount.has_free_discount() && !state.free_discount_authorized {
            return Err(ValidationError::FreeDiscountUnauthorized);
        }

        if let Some(customer) = &state.due_customer {
            if customer.credit_limit < payable {
                return Err(ValidationError::CreditLimitExceeded {
                    limit: customer.credit_limit,
                    payable,
                });
            }
            return Ok(());
        }

        for split in &state.splits {
            let account = self
                .accounts
                .iter()
                .find(|a| a.id == split.account_id)
                .ok_or_else(|| ValidationError::UnknownAccount(split.account_id.clone()))?;
            if account.requires_reference && !split.has_valid_reference() {
                return Err(ValidationError::MissingReference {
                    split_id: split.split_id,
                });
            }
        }

        let allocated = allocated(&state.splits);
        if !self.discount.due_module && !is_payment_sufficient(allocated, payable) {
            return Err(ValidationError::SplitTotalMismatch { allocated, payable });
        }
        Ok(())
    }

    /// Validate and submit the order
    ///
    /// A second call while one is in flight is ignored. On success the paid
    /// lines leave the store and the reservation is released; on failure
    /// nothing changes locally and the lines stay reserved for a retry.
    pub async fn submit(&self) -> EngineResult<SubmitOutcome> {
        if self.in_flight.swap(true, Ordering::AcqRel) {
            tracing::debug!("Checkout already in flight, ignoring submit");
            return Ok(SubmitOutcome::Ignored);
        }
        let _in_flight = InFlight(&self.in_flight);
        let epoch = self.epoch.load(Ordering::Acquire);

        let request = {
            let mut state = self.state.lock();
            if state.closed || state.phase == CheckoutPhase::Succeeded {
                return Ok(SubmitOutcome::Ignored);
            }
            state.phase = CheckoutPhase::Validating;
            if let Err(e) = self.validate_state(&state) {
                state.phase = CheckoutPhase::CollectingSplits;
                tracing::info!(error = %e, "Checkout validation failed");
                return Err(e.into());
            }
            state.phase = CheckoutPhase::Submitting;
            self.build_request(&state)
        };

        let ids: Vec<LocalId> = self.lines.iter().map(|l| l.local_id).collect();
        let result = self.api.checkout(request).await;

        if self.epoch.load(Ordering::Acquire) != epoch {
            tracing::info!("Checkout closed while in flight, discarding result");
            return Ok(SubmitOutcome::Discarded);
        }

        match result {
            Ok(receipt) => {
                self.handle.lock().remove_lines(&ids);
                self.release_lines();
                if !self.partial {
                    self.discounts.clear();
                }
                self.state.lock().phase = CheckoutPhase::Succeeded;

                let resource = format!("order:{}", receipt.order_id);
                let details = format!(
                    "{} {} lines, payable {}",
                    self.endpoint().path(),
                    ids.len(),
                    receipt.payable_total
                );
                audit_log!("cashier", "checkout", resource, details);
                Ok(SubmitOutcome::Submitted(receipt))
            }
            Err(e) => {
                self.state.lock().phase = CheckoutPhase::Failed;
                tracing::warn!(endpoint = self.endpoint().path(), error = %e, "Checkout rejected");
                Err(e.into())
            }
        }
    }

    /// End the attempt; a response still in flight is discarded
    pub fn close(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        self.state.lock().closed = true;
        self.release_lines();
    }

    // ========== Internals ==========

    fn release_lines(&self) {
        let released = self.reservation.lock().take();
        drop(released);
    }

    fn account(&self, account_id: &str) -> EngineResult<&FinancialAccount> {
        self.accounts
            .iter()
            .find(|a| a.id == account_id)
            .ok_or_else(|| ValidationError::UnknownAccount(account_id.to_string()).into())
    }

    /// Lock the state for an edit; a failed attempt goes back to collecting
    fn editable_state(&self) -> EngineResult<parking_lot::MutexGuard<'_, SessionState>> {
        let mut state = self.state.lock();
        let phase = state.phase;
        match phase {
            CheckoutPhase::Validating | CheckoutPhase::Submitting => {
                Err(EngineError::CheckoutInProgress)
            }
            CheckoutPhase::Failed => {
                state.phase = CheckoutPhase::CollectingSplits;
                Ok(state)
            }
            CheckoutPhase::CollectingSplits | CheckoutPhase::Succeeded => Ok(state),
        }
    }

    fn build_request(&self, state: &SessionState) -> CheckoutRequest {
        let totals = &self.totals;
        let (splits, due_customer_id) = match &state.due_customer {
            Some(customer) => (Vec::new(), Some(customer.customer_id.clone())),
            None => (
                state
                    .splits
                    .iter()
                    .filter(|s| s.amount > Decimal::ZERO)
                    .map(SplitPayload::from)
                    .collect(),
                None,
            ),
        };

        CheckoutRequest {
            endpoint: self.endpoint(),
            context: self.handle.context(),
            products: self.lines.iter().map(FlattenedProduct::from).collect(),
            remote_line_ids: self
                .lines
                .iter()
                .flat_map(|l| l.remote_line_ids.iter().cloned())
                .collect(),
            subtotal: totals.subtotal,
            tax: totals.tax,
            service_fee: totals.service_fee,
            delivery_fee: totals.delivery_fee,
            discount_total: round_money(totals.discount_total()),
            payable_total: totals.payable_total,
            splits,
            discount_code: self.discount.code.as_ref().map(|c| c.code.clone()),
            due_customer_id,
            due_module: self.discount.due_module,
        }
    }
}

fn allocated(splits: &[PaymentSplit]) -> Decimal {
    splits.iter().map(|s| s.amount).sum()
}

fn split_index(splits: &[PaymentSplit], split_id: u32) -> Result<usize, ValidationError> {
    splits
        .iter()
        .position(|s| s.split_id == split_id)
        .ok_or(ValidationError::SplitNotFound(split_id))
}

//! Order Line Store
//!
//! Authoritative in-memory collection of the lines of one active order.
//! Every mutation is mirrored into the session key-value store under the
//! context's cart key.
//!
//! Store mutations are synchronous. Operations with a remote counterpart
//! (status, void, sync, checkout) work through an [`OrderHandle`]: they check
//! and reserve the lines they touch in one critical section with
//! [`OrderHandle::try_lock_lines_with`], release the mutex while awaiting the
//! API, and mutate only after success. Cashier edits refuse reserved lines.

use crate::error::{EngineError, ValidationError};
use crate::kv::{KeyValueStoreExt, SharedKv};
use parking_lot::{Mutex, MutexGuard};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::order::wire::RemoteOrderLine;
use shared::order::{
    LineCandidate, LinePatch, LocalId, OrderContext, OrderLine, PreparationStatus, RemoteLineId,
};
use std::collections::HashSet;
use std::sync::Arc;

/// Snapshot written to the key-value store
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedCart {
    next_id: u64,
    lines: Vec<OrderLine>,
}

/// Result of a quantity step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityChange {
    Updated(Decimal),
    /// The line dropped below its minimum and was removed
    Removed,
    /// A served line cannot go below its minimum; quantity kept
    Clamped(Decimal),
    /// The line is reserved by an operation in flight; nothing changed
    Busy,
    NotFound,
}

pub struct OrderLineStore {
    context: OrderContext,
    lines: Vec<OrderLine>,
    next_id: u64,
    busy: HashSet<LocalId>,
    kv: SharedKv,
}

impl std::fmt::Debug for OrderLineStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderLineStore")
            .field("context", &self.context)
            .field("lines", &self.lines.len())
            .field("next_id", &self.next_id)
            .field("busy", &self.busy)
            .finish()
    }
}

impl OrderLineStore {
    pub fn new(context: OrderContext, kv: SharedKv) -> Self {
        Self {
            context,
            lines: Vec::new(),
            next_id: 1,
            busy: HashSet::new(),
            kv,
        }
    }

    /// Rebuild a store from its persisted cart, or start empty
    pub fn restore(context: OrderContext, kv: SharedKv) -> Self {
        let mut store = Self::new(context, kv);
        if let Some(cart) = store.kv.get_json::<PersistedCart>(&store.context.cart_key()) {
            let max_id = cart.lines.iter().map(|l| l.local_id.0).max().unwrap_or(0);
            store.next_id = cart.next_id.max(max_id + 1);
            store.lines = cart.lines;
            tracing::debug!(context = %store.context, lines = store.lines.len(), "Restored cart");
        }
        store
    }

    pub fn context(&self) -> &OrderContext {
        &self.context
    }

    fn allocate_id(&mut self) -> LocalId {
        let id = LocalId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Status a freshly added line starts in
    fn initial_status(&self) -> PreparationStatus {
        if self.context.order_type().tracks_preparation() {
            PreparationStatus::Pending
        } else {
            PreparationStatus::NotTracked
        }
    }

    fn position(&self, local_id: LocalId) -> Option<usize> {
        self.lines.iter().position(|l| l.local_id == local_id)
    }

    /// Position of a line the cashier may edit
    fn editable_position(&self, local_id: LocalId) -> Result<usize, EngineError> {
        let idx = self
            .position(local_id)
            .ok_or(EngineError::LineNotFound(local_id))?;
        if self.busy.contains(&local_id) {
            return Err(EngineError::LineBusy(local_id));
        }
        Ok(idx)
    }

    // ========== Queries ==========

    pub fn line(&self, local_id: LocalId) -> Option<&OrderLine> {
        self.lines.iter().find(|l| l.local_id == local_id)
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    /// Lines in insertion order
    pub fn snapshot(&self) -> Vec<OrderLine> {
        self.lines.clone()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn is_busy(&self, local_id: LocalId) -> bool {
        self.busy.contains(&local_id)
    }

    pub fn has_busy_lines(&self) -> bool {
        !self.busy.is_empty()
    }

    // ========== Mutations ==========

    /// Add a product, merging into an unsent duplicate regular line when present
    ///
    /// Only lines that are unsent, not reserved and in the starting status
    /// absorb quantity: a sent or reserved line must keep the quantity the
    /// remote order (or a checkout in progress) knows about.
    pub fn add_line(
        &mut self,
        candidate: LineCandidate,
        quantity: Decimal,
    ) -> Result<OrderLine, ValidationError> {
        let valid = if candidate.weight_tracked {
            quantity > Decimal::ZERO
        } else {
            quantity >= Decimal::ONE && quantity.fract().is_zero()
        };
        if !valid {
            return Err(ValidationError::InvalidQuantity(quantity));
        }

        let status = self.initial_status();
        let line = OrderLine::from_candidate(LocalId(0), candidate, quantity, status);

        if line.is_mergeable()
            && let Some(existing) = self.lines.iter_mut().find(|l| {
                l.is_mergeable()
                    && !l.has_remote_ids()
                    && l.line_key == line.line_key
                    && l.preparation_status == status
                    && !self.busy.contains(&l.local_id)
            })
        {
            existing.quantity += quantity;
            let merged = existing.clone();
            tracing::debug!(local_id = %merged.local_id, quantity = %merged.quantity, "Merged duplicate line");
            self.persist();
            return Ok(merged);
        }

        let mut line = line;
        line.local_id = self.allocate_id();
        self.lines.push(line.clone());
        tracing::debug!(local_id = %line.local_id, product_id = %line.product_id, "Added line");
        self.persist();
        Ok(line)
    }

    /// Replace fields in place; never merges, so identity survives in-flight operations
    pub fn update_line(
        &mut self,
        local_id: LocalId,
        patch: LinePatch,
    ) -> Result<OrderLine, EngineError> {
        let idx = self.editable_position(local_id)?;
        self.lines[idx].apply_patch(patch);
        let line = self.lines[idx].clone();
        self.persist();
        Ok(line)
    }

    /// Client-only removal
    pub fn remove_line(&mut self, local_id: LocalId) -> Result<(), EngineError> {
        let idx = self.editable_position(local_id)?;
        self.lines.remove(idx);
        self.persist();
        Ok(())
    }

    pub fn increment_quantity(&mut self, local_id: LocalId) -> QuantityChange {
        let idx = match self.editable_position(local_id) {
            Ok(idx) => idx,
            Err(EngineError::LineBusy(_)) => return QuantityChange::Busy,
            Err(_) => return QuantityChange::NotFound,
        };
        self.lines[idx].quantity += Decimal::ONE;
        let quantity = self.lines[idx].quantity;
        self.persist();
        QuantityChange::Updated(quantity)
    }

    /// Step down by one; a line falling below its minimum is removed unless served
    pub fn decrement_quantity(&mut self, local_id: LocalId) -> QuantityChange {
        let idx = match self.editable_position(local_id) {
            Ok(idx) => idx,
            Err(EngineError::LineBusy(_)) => return QuantityChange::Busy,
            Err(_) => return QuantityChange::NotFound,
        };
        let line = &mut self.lines[idx];
        let next = line.quantity - Decimal::ONE;

        let change = if line.accepts_quantity(next) {
            line.quantity = next;
            QuantityChange::Updated(next)
        } else if line.preparation_status.is_done() {
            if !line.weight_tracked {
                line.quantity = Decimal::ONE;
            }
            QuantityChange::Clamped(line.quantity)
        } else {
            self.lines.remove(idx);
            QuantityChange::Removed
        };
        self.persist();
        change
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.persist();
    }

    /// Drop the lines and the persisted cart
    pub fn discard(&mut self) {
        self.lines.clear();
        self.busy.clear();
        self.kv.remove(&self.context.cart_key());
    }

    pub fn remove_lines(&mut self, ids: &[LocalId]) -> usize {
        let before = self.lines.len();
        self.lines.retain(|l| !ids.contains(&l.local_id));
        let removed = before - self.lines.len();
        if removed > 0 {
            self.persist();
        }
        removed
    }

    pub fn set_status(&mut self, ids: &[LocalId], status: PreparationStatus) {
        for line in self.lines.iter_mut().filter(|l| ids.contains(&l.local_id)) {
            line.preparation_status = status;
        }
        self.persist();
    }

    /// Attach remote ids returned by the create endpoint
    pub fn assign_remote_ids(&mut self, assignments: Vec<(LocalId, Vec<RemoteLineId>)>) {
        for (local_id, remote_ids) in assignments {
            if let Some(line) = self.lines.iter_mut().find(|l| l.local_id == local_id) {
                line.remote_line_ids.extend(remote_ids);
            }
        }
        self.persist();
    }

    /// Replace all lines with those of the remote order
    ///
    /// Identical regular lines in the same status collapse into one line
    /// carrying every remote id. Local ids keep counting up.
    pub fn replace_with_remote(&mut self, remote: Vec<RemoteOrderLine>) {
        let tracked = self.context.order_type().tracks_preparation();
        self.lines.clear();

        for entry in remote {
            let status = if tracked {
                entry.preparation_status
            } else {
                PreparationStatus::NotTracked
            };
            let mut line =
                OrderLine::from_candidate(LocalId(0), entry.product, entry.quantity, status);

            if line.is_mergeable()
                && let Some(existing) = self.lines.iter_mut().find(|l| {
                    l.is_mergeable()
                        && l.line_key == line.line_key
                        && l.preparation_status == status
                        && l.unit_price == line.unit_price
                })
            {
                existing.quantity += line.quantity;
                existing.remote_line_ids.extend(entry.remote_line_ids);
                continue;
            }

            line.local_id = self.allocate_id();
            line.remote_line_ids = entry.remote_line_ids;
            self.lines.push(line);
        }
        self.persist();
    }

    /// Mirror the current lines into the key-value store
    pub fn persist(&self) {
        let cart = PersistedCart {
            next_id: self.next_id,
            lines: self.lines.clone(),
        };
        self.kv.set_json(&self.context.cart_key(), &cart);
    }
}

// ============================================================================
// Handle & busy reservations
// ============================================================================

/// Shared handle to a store
///
/// The mutex is never held across an `.await`.
#[derive(Debug, Clone)]
pub struct OrderHandle {
    inner: Arc<Mutex<OrderLineStore>>,
}

impl OrderHandle {
    pub fn new(store: OrderLineStore) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, OrderLineStore> {
        self.inner.lock()
    }

    pub fn context(&self) -> OrderContext {
        self.inner.lock().context.clone()
    }

    /// Mark lines busy for the duration of a remote operation
    ///
    /// Fails without reserving anything when a line is unknown or already busy.
    pub fn try_lock_lines(&self, ids: &[LocalId]) -> Result<BusyGuard, EngineError> {
        self.try_lock_lines_with(|_| Ok((ids.to_vec(), ())))
            .map(|(guard, ())| guard)
    }

    /// Inspect the store and reserve the lines `prepare` picks, without
    /// releasing the mutex in between
    ///
    /// Whatever `prepare` checked still holds when the guard is returned.
    pub fn try_lock_lines_with<T>(
        &self,
        prepare: impl FnOnce(&OrderLineStore) -> Result<(Vec<LocalId>, T), EngineError>,
    ) -> Result<(BusyGuard, T), EngineError> {
        let mut store = self.inner.lock();
        let (ids, value) = prepare(&store)?;
        for id in &ids {
            if store.line(*id).is_none() {
                return Err(EngineError::LineNotFound(*id));
            }
            if store.busy.contains(id) {
                return Err(EngineError::LineBusy(*id));
            }
        }
        store.busy.extend(ids.iter().copied());
        let guard = BusyGuard {
            store: Arc::clone(&self.inner),
            ids,
        };
        Ok((guard, value))
    }

    pub fn same_store(&self, other: &OrderHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Releases its reserved lines on drop
#[must_use = "lines are released as soon as the guard is dropped"]
pub struct BusyGuard {
    store: Arc<Mutex<OrderLineStore>>,
    ids: Vec<LocalId>,
}

impl BusyGuard {
    pub fn ids(&self) -> &[LocalId] {
        &self.ids
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        let mut store = self.store.lock();
        for id in &self.ids {
            store.busy.remove(id);
        }
    }
}

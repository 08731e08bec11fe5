//! Active order contexts
//!
//! One store per table, take-away session and delivery customer. Switching
//! context swaps stores; the previous one stays cached with its cart.

use super::store::{OrderHandle, OrderLineStore};
use crate::kv::SharedKv;
use dashmap::DashMap;
use parking_lot::RwLock;
use shared::order::OrderContext;

pub struct OrderRegistry {
    kv: SharedKv,
    stores: DashMap<OrderContext, OrderHandle>,
    active: RwLock<Option<OrderContext>>,
}

impl OrderRegistry {
    pub fn new(kv: SharedKv) -> Self {
        Self {
            kv,
            stores: DashMap::new(),
            active: RwLock::new(None),
        }
    }

    pub fn kv(&self) -> &SharedKv {
        &self.kv
    }

    /// Store of a context, restored from its persisted cart on first access
    pub fn open(&self, context: &OrderContext) -> OrderHandle {
        self.stores
            .entry(context.clone())
            .or_insert_with(|| {
                OrderHandle::new(OrderLineStore::restore(context.clone(), self.kv.clone()))
            })
            .clone()
    }

    pub fn get(&self, context: &OrderContext) -> Option<OrderHandle> {
        self.stores.get(context).map(|h| h.clone())
    }

    /// Make `context` the active order
    pub fn switch_to(&self, context: &OrderContext) -> OrderHandle {
        let handle = self.open(context);
        *self.active.write() = Some(context.clone());
        tracing::debug!(context = %context, "Switched active order");
        handle
    }

    /// Start a new take-away session with a generated id
    pub fn start_take_away(&self) -> (OrderContext, OrderHandle) {
        let context = OrderContext::take_away(uuid::Uuid::new_v4().to_string());
        let handle = self.switch_to(&context);
        (context, handle)
    }

    pub fn active_context(&self) -> Option<OrderContext> {
        self.active.read().clone()
    }

    pub fn active(&self) -> Option<OrderHandle> {
        let context = self.active_context()?;
        Some(self.open(&context))
    }

    pub fn contexts(&self) -> Vec<OrderContext> {
        self.stores.iter().map(|e| e.key().clone()).collect()
    }

    /// Drop every local trace of a context's order
    pub fn remove(&self, context: &OrderContext) {
        match self.stores.remove(context) {
            Some((_, handle)) => handle.lock().discard(),
            None => self.kv.remove(&context.cart_key()),
        }
        self.kv.remove(&crate::discounts::discount_key(context));

        let mut active = self.active.write();
        if active.as_ref() == Some(context) {
            *active = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryStore;
    use rust_decimal::Decimal;
    use shared::order::LineCandidate;

    #[test]
    fn test_open_returns_same_store() {
        let registry = OrderRegistry::new(MemoryStore::shared());
        let ctx = OrderContext::dine_in("T1");
        let a = registry.open(&ctx);
        let b = registry.open(&ctx);
        assert!(a.same_store(&b));
        assert!(!a.same_store(&registry.open(&OrderContext::dine_in("T2"))));
    }

    #[test]
    fn test_switch_and_remove() {
        let kv = MemoryStore::shared();
        let registry = OrderRegistry::new(kv.clone());
        let ctx = OrderContext::dine_in("T1");

        let handle = registry.switch_to(&ctx);
        handle
            .lock()
            .add_line(LineCandidate::new("p", "Tea", Decimal::ONE), Decimal::ONE)
            .unwrap();
        assert_eq!(registry.active_context(), Some(ctx.clone()));
        assert!(kv.get(&ctx.cart_key()).is_some());

        registry.remove(&ctx);
        assert!(registry.active().is_none());
        assert!(registry.get(&ctx).is_none());
        assert!(kv.get(&ctx.cart_key()).is_none());
        assert!(registry.open(&ctx).lock().is_empty());
    }

    #[test]
    fn test_cart_survives_registry_restart() {
        let kv = MemoryStore::shared();
        let ctx = OrderContext::delivery("C7");
        OrderRegistry::new(kv.clone())
            .open(&ctx)
            .lock()
            .add_line(LineCandidate::new("p", "Pizza", Decimal::TEN), Decimal::TWO)
            .unwrap();

        let registry = OrderRegistry::new(kv);
        assert_eq!(registry.open(&ctx).lock().len(), 1);
    }

    #[test]
    fn test_take_away_sessions_are_distinct() {
        let registry = OrderRegistry::new(MemoryStore::shared());
        let (a, _) = registry.start_take_away();
        let (b, _) = registry.start_take_away();
        assert_ne!(a, b);
        assert_eq!(registry.active_context(), Some(b));
    }
}

//! Discount selection of the active order
//!
//! The selection is kept per order context in the session store so it
//! survives switching between tables. Totals are always recomputed from it
//! by [`crate::money::calculate_totals`]; nothing here computes amounts.

use crate::error::{EngineResult, ValidationError};
use crate::kv::{KeyValueStoreExt, SharedKv};
use crate::remote::OrderApi;
use rust_decimal::Decimal;
use shared::order::{CodeDiscount, DiscountState, ListDiscount, ModuleDiscount, OrderContext};

/// Session key of a context's discount selection
pub fn discount_key(context: &OrderContext) -> String {
    format!("discount:{}", context.cart_key())
}

pub struct DiscountControl {
    kv: SharedKv,
    context: OrderContext,
    key: String,
}

impl DiscountControl {
    pub fn for_context(kv: SharedKv, context: &OrderContext) -> Self {
        Self {
            kv,
            key: discount_key(context),
            context: context.clone(),
        }
    }

    pub fn context(&self) -> &OrderContext {
        &self.context
    }

    /// Current selection (empty when nothing was stored)
    pub fn state(&self) -> DiscountState {
        self.kv.get_json(&self.key).unwrap_or_default()
    }

    fn update(&self, f: impl FnOnce(&mut DiscountState)) -> DiscountState {
        let mut state = self.state();
        f(&mut state);
        if state.is_empty() {
            self.kv.remove(&self.key);
        } else {
            self.kv.set_json(&self.key, &state);
        }
        state
    }

    /// Validate a code remotely and make it the order's code discount
    ///
    /// A rejected code leaves the current selection untouched.
    pub async fn apply_discount_code(
        &self,
        api: &dyn OrderApi,
        code: &str,
    ) -> EngineResult<DiscountState> {
        let code = code.trim();
        if code.is_empty() {
            return Err(ValidationError::EmptyDiscountCode.into());
        }

        let grant = api
            .validate_discount_code(&self.context, code)
            .await
            .map_err(|e| {
                tracing::info!(context = %self.context, code, error = %e, "Discount code rejected");
                e
            })?;

        let percentage = grant.percentage.max(Decimal::ZERO).min(Decimal::ONE_HUNDRED);
        tracing::info!(context = %self.context, code = %grant.code, percentage = %percentage, "Discount code applied");
        Ok(self.update(|s| {
            s.code = Some(CodeDiscount {
                code: grant.code,
                percentage,
            })
        }))
    }

    pub fn remove_discount_code(&self) -> DiscountState {
        self.update(|s| s.code = None)
    }

    /// Pick (or clear with `None`) a catalog discount
    pub fn select_list_discount(&self, discount: Option<ListDiscount>) -> DiscountState {
        self.update(|s| s.list = discount)
    }

    pub fn set_module_discount(&self, module: Option<ModuleDiscount>) -> DiscountState {
        self.update(|s| s.module = module)
    }

    /// Manually entered amount off the order; authorized at checkout
    pub fn set_free_discount(&self, amount: Decimal) -> EngineResult<DiscountState> {
        if amount < Decimal::ZERO {
            return Err(ValidationError::NegativeAmount.into());
        }
        Ok(self.update(|s| s.free_discount = amount))
    }

    pub fn set_due_module(&self, due_module: bool) -> DiscountState {
        self.update(|s| s.due_module = due_module)
    }

    pub fn clear(&self) {
        self.kv.remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EngineError, RemoteError};
    use crate::kv::MemoryStore;
    use crate::testing::{ApiOp, MockOrderApi};
    use shared::ErrorCode;
    use shared::order::{DiscountValue, OrderType};

    fn control() -> (SharedKv, DiscountControl) {
        let kv = MemoryStore::shared();
        let control = DiscountControl::for_context(kv.clone(), &OrderContext::dine_in("T3"));
        (kv, control)
    }

    #[tokio::test]
    async fn test_apply_valid_code() {
        let (_, control) = control();
        let api = MockOrderApi::new();
        api.add_discount_code("SUMMER", Decimal::from(15));

        let state = control.apply_discount_code(&api, "  SUMMER ").await.unwrap();
        let code = state.code.unwrap();
        assert_eq!(code.code, "SUMMER");
        assert_eq!(code.percentage, Decimal::from(15));
        assert_eq!(control.state().code.unwrap().code, "SUMMER");
    }

    #[tokio::test]
    async fn test_rejected_code_keeps_selection() {
        let (_, control) = control();
        let api = MockOrderApi::new();
        control.set_free_discount(Decimal::TEN).unwrap();

        let err = control.apply_discount_code(&api, "NOPE").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::DiscountCodeInvalid);
        assert!(control.state().code.is_none());
        assert_eq!(control.state().free_discount, Decimal::TEN);
    }

    #[tokio::test]
    async fn test_blank_code_rejected_locally() {
        let (_, control) = control();
        let api = MockOrderApi::new();

        let err = control.apply_discount_code(&api, "   ").await.unwrap_err();
        assert_eq!(
            err,
            EngineError::Validation(ValidationError::EmptyDiscountCode)
        );
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_granted_percentage_is_clamped() {
        let (_, control) = control();
        let api = MockOrderApi::new();
        api.add_discount_code("ALL", Decimal::from(250));

        let state = control.apply_discount_code(&api, "ALL").await.unwrap();
        assert_eq!(state.code.unwrap().percentage, Decimal::ONE_HUNDRED);
    }

    #[tokio::test]
    async fn test_transport_error_propagates() {
        let (_, control) = control();
        let api = MockOrderApi::new();
        api.fail_with(
            ApiOp::ValidateDiscountCode,
            RemoteError::transport("connection reset"),
        );

        let err = control.apply_discount_code(&api, "X").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NetworkError);
    }

    #[test]
    fn test_negative_free_discount_rejected() {
        let (_, control) = control();
        assert_eq!(
            control.set_free_discount(Decimal::NEGATIVE_ONE).unwrap_err(),
            EngineError::Validation(ValidationError::NegativeAmount)
        );
    }

    #[test]
    fn test_selection_is_per_context() {
        let (kv, control) = control();
        control.select_list_discount(Some(ListDiscount {
            discount_id: "staff".into(),
            name: "Staff".into(),
            value: DiscountValue::Percentage(Decimal::from(20)),
        }));
        control.set_module_discount(Some(ModuleDiscount {
            module_id: "m".into(),
            percentage: Decimal::TEN,
            eligible_order_types: vec![OrderType::Delivery],
        }));

        let other = DiscountControl::for_context(kv.clone(), &OrderContext::dine_in("T4"));
        assert!(other.state().is_empty());

        let again = DiscountControl::for_context(kv, &OrderContext::dine_in("T3"));
        assert!(again.state().list.is_some());
        assert!(again.state().module.is_some());
    }

    #[test]
    fn test_clearing_everything_removes_entry() {
        let (kv, control) = control();
        control.set_due_module(true);
        assert!(kv.get(&discount_key(control.context())).is_some());

        control.set_due_module(false);
        assert!(kv.get(&discount_key(control.context())).is_none());

        control.set_free_discount(Decimal::ONE).unwrap();
        control.clear();
        assert!(control.state().is_empty());
    }
}

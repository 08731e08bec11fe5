//! Discount state of the active order

use super::types::OrderType;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Value of a catalog discount
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum DiscountValue {
    /// Percentage (0-100) of the running payable amount
    Percentage(Decimal),
    /// Fixed amount off the running payable amount
    Fixed(Decimal),
}

/// Discount code validated by the remote API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CodeDiscount {
    pub code: String,
    pub percentage: Decimal,
}

/// Implicit percentage granted by an ordering module (partner/aggregator pricing)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModuleDiscount {
    pub module_id: String,
    pub percentage: Decimal,
    /// Order types the module discount applies to
    #[serde(default)]
    pub eligible_order_types: Vec<OrderType>,
}

impl ModuleDiscount {
    pub fn applies_to(&self, order_type: OrderType) -> bool {
        self.eligible_order_types.contains(&order_type)
    }
}

/// Discount picked from the predefined catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListDiscount {
    pub discount_id: String,
    pub name: String,
    pub value: DiscountValue,
}

/// Everything that discounts the current order
///
/// At most one of `code`, `module`, `list` contributes (in that priority);
/// `free_discount` always applies on top.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiscountState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<CodeDiscount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<ModuleDiscount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list: Option<ListDiscount>,
    /// Manually entered fixed amount; requires manager authorization at checkout
    #[serde(default)]
    pub free_discount: Decimal,
    /// The ordering platform absorbs the remaining balance
    #[serde(default)]
    pub due_module: bool,
}

impl DiscountState {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_none()
            && self.module.is_none()
            && self.list.is_none()
            && self.free_discount.is_zero()
            && !self.due_module
    }

    pub fn has_free_discount(&self) -> bool {
        self.free_discount > Decimal::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_empty() {
        assert!(DiscountState::none().is_empty());
        let state = DiscountState {
            free_discount: Decimal::from(5),
            ..Default::default()
        };
        assert!(!state.is_empty());
        assert!(state.has_free_discount());
    }

    #[test]
    fn test_discount_value_serde() {
        let json = serde_json::to_value(DiscountValue::Fixed(Decimal::new(250, 2))).unwrap();
        assert_eq!(json["type"], "fixed");
        let back: DiscountValue = serde_json::from_value(json).unwrap();
        assert_eq!(back, DiscountValue::Fixed(Decimal::new(250, 2)));
    }

    #[test]
    fn test_module_eligibility() {
        let module = ModuleDiscount {
            module_id: "talabat".into(),
            percentage: Decimal::from(10),
            eligible_order_types: vec![OrderType::Delivery],
        };
        assert!(module.applies_to(OrderType::Delivery));
        assert!(!module.applies_to(OrderType::DineIn));
    }
}

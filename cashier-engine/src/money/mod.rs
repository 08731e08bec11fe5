//! Money/Discount Calculator
//!
//! Pure functions from an order-line collection and a discount configuration
//! to the order totals. All arithmetic is done on `Decimal` at full
//! precision; values are rounded to cents only when presented or submitted
//! (see [`Totals::rounded`]).

use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use shared::order::{DiscountState, DiscountValue, LineKind, OrderLine, OrderType};

/// Decimal places of presented and submitted amounts
const DECIMAL_PLACES: u32 = 2;

/// How tax is computed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TaxConfig {
    /// Flat percentage of the subtotal
    Percentage { rate: Decimal },
    /// Sum of the per-unit tax amounts supplied with each line
    Itemized,
}

impl Default for TaxConfig {
    fn default() -> Self {
        Self::Percentage {
            rate: Decimal::ZERO,
        }
    }
}

/// Service fee charged as a percentage of the subtotal
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceFeeConfig {
    pub rate: Decimal,
    /// Order types the fee applies to
    #[serde(default)]
    pub order_types: Vec<OrderType>,
}

impl ServiceFeeConfig {
    pub fn applies_to(&self, order_type: OrderType) -> bool {
        self.rate > Decimal::ZERO && self.order_types.contains(&order_type)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingConfig {
    pub tax: TaxConfig,
    pub service_fee: ServiceFeeConfig,
}

/// Order totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    /// Regular lines at their pre-discount price including modifiers
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub service_fee: Decimal,
    /// Σ (original − unit) × quantity over discounted regular lines
    pub item_discount_total: Decimal,
    /// Code, module or list discount
    pub percentage_discount_total: Decimal,
    pub free_discount_amount: Decimal,
    pub delivery_fee: Decimal,
    /// Deal lines at their externally set price, never discounted
    pub fixed_price_total: Decimal,
    pub payable_total: Decimal,
}

impl Totals {
    /// Every discount applied to the order
    pub fn discount_total(&self) -> Decimal {
        self.item_discount_total + self.percentage_discount_total + self.free_discount_amount
    }

    /// Copy rounded half away from zero to cents
    pub fn rounded(&self) -> Totals {
        Totals {
            subtotal: round_money(self.subtotal),
            tax: round_money(self.tax),
            service_fee: round_money(self.service_fee),
            item_discount_total: round_money(self.item_discount_total),
            percentage_discount_total: round_money(self.percentage_discount_total),
            free_discount_amount: round_money(self.free_discount_amount),
            delivery_fee: round_money(self.delivery_fee),
            fixed_price_total: round_money(self.fixed_price_total),
            payable_total: round_money(self.payable_total),
        }
    }
}

/// Round to cents, half away from zero
#[inline]
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Whether `paid` covers `required` once both are rounded to cents
pub fn is_payment_sufficient(paid: Decimal, required: Decimal) -> bool {
    round_money(paid) >= round_money(required)
}

/// Compare two monetary values for equality at cent precision
pub fn money_eq(a: Decimal, b: Decimal) -> bool {
    round_money(a) == round_money(b)
}

/// Clamp a percentage to 0..=100
fn clamp_percentage(p: Decimal) -> Decimal {
    p.max(Decimal::ZERO).min(Decimal::ONE_HUNDRED)
}

/// Per-unit price before any item-level discount: base price plus modifiers
pub fn effective_unit_price(line: &OrderLine) -> Decimal {
    (line.original_unit_price + line.modifiers_total()).max(Decimal::ZERO)
}

/// Amount actually charged for one regular line
pub fn line_total(line: &OrderLine) -> Decimal {
    match line.kind {
        LineKind::Reward => Decimal::ZERO,
        LineKind::Deal => (line.unit_price * line.quantity).max(Decimal::ZERO),
        LineKind::Regular => {
            let discount = (line.original_unit_price - line.unit_price).max(Decimal::ZERO);
            ((effective_unit_price(line) - discount) * line.quantity).max(Decimal::ZERO)
        }
    }
}

/// Order-level discount selected by priority: code > module > list
fn order_discount(
    discount: &DiscountState,
    order_type: OrderType,
    base: Decimal,
) -> Decimal {
    let amount = if let Some(code) = &discount.code {
        base * clamp_percentage(code.percentage) / Decimal::ONE_HUNDRED
    } else if let Some(module) = discount.module.as_ref().filter(|m| m.applies_to(order_type)) {
        base * clamp_percentage(module.percentage) / Decimal::ONE_HUNDRED
    } else if let Some(list) = &discount.list {
        match list.value {
            DiscountValue::Percentage(p) => base * clamp_percentage(p) / Decimal::ONE_HUNDRED,
            DiscountValue::Fixed(amount) => amount.max(Decimal::ZERO),
        }
    } else {
        Decimal::ZERO
    };
    amount.min(base)
}

/// Compute the totals of an order
///
/// Formula:
/// payable = subtotal + tax + service_fee + delivery_fee + fixed_price_total
///           − item_discount − percentage_discount − free_discount
///
/// - order-level discounts apply to the running payable excluding deal lines
/// - the free discount is floored so the running payable never goes negative
/// - the payable is never negative
pub fn calculate_totals(
    lines: &[OrderLine],
    discount: &DiscountState,
    pricing: &PricingConfig,
    order_type: OrderType,
    delivery_fee: Decimal,
) -> Totals {
    let mut subtotal = Decimal::ZERO;
    let mut item_discount_total = Decimal::ZERO;
    let mut fixed_price_total = Decimal::ZERO;
    let mut itemized_tax = Decimal::ZERO;

    for line in lines {
        let quantity = line.quantity;
        match line.kind {
            LineKind::Regular => {
                subtotal += effective_unit_price(line) * quantity;
                if line.unit_price < line.original_unit_price {
                    item_discount_total += (line.original_unit_price - line.unit_price) * quantity;
                }
            }
            LineKind::Deal => fixed_price_total += line.unit_price.max(Decimal::ZERO) * quantity,
            LineKind::Reward => continue,
        }
        if let Some(tax) = line.item_tax {
            itemized_tax += tax * quantity;
        }
    }

    let tax = match &pricing.tax {
        TaxConfig::Percentage { rate } => subtotal * *rate / Decimal::ONE_HUNDRED,
        TaxConfig::Itemized => itemized_tax,
    };

    let service_fee = if pricing.service_fee.applies_to(order_type) {
        subtotal * pricing.service_fee.rate / Decimal::ONE_HUNDRED
    } else {
        Decimal::ZERO
    };

    let delivery_fee = if order_type == OrderType::Delivery {
        delivery_fee.max(Decimal::ZERO)
    } else {
        Decimal::ZERO
    };

    // Running payable that order-level discounts may reduce
    let discountable =
        (subtotal + tax + service_fee + delivery_fee - item_discount_total).max(Decimal::ZERO);
    let percentage_discount_total = order_discount(discount, order_type, discountable);

    let after_percentage = discountable - percentage_discount_total;
    let free_discount_amount = discount.free_discount.max(Decimal::ZERO).min(after_percentage);

    let payable_total =
        (after_percentage - free_discount_amount + fixed_price_total).max(Decimal::ZERO);

    tracing::debug!(
        lines = lines.len(),
        order_type = order_type.as_str(),
        subtotal = %subtotal,
        payable = %payable_total,
        "Calculated totals"
    );

    Totals {
        subtotal,
        tax,
        service_fee,
        item_discount_total,
        percentage_discount_total,
        free_discount_amount,
        delivery_fee,
        fixed_price_total,
        payable_total,
    }
}

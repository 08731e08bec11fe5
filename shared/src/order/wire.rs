//! Request/response DTOs of the remote order API
//!
//! Product lines travel flattened: variation, addon, extra and exclude
//! selections are reduced to primitive identifiers.

use super::line::{LineCandidate, OrderLine};
use super::payment::PaymentSplit;
use super::status::PreparationStatus;
use super::types::{OrderContext, OrderType, RemoteLineId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ============================================================================
// Flattened Product
// ============================================================================

/// Variation group with the selected option ids
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VariationIds {
    pub group_id: String,
    pub option_ids: Vec<String>,
}

/// Addon id with its count
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AddonCount {
    pub addon_id: String,
    pub count: u32,
}

/// Product line as the remote API expects it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlattenedProduct {
    pub product_id: String,
    /// Piece count, or weight in kg when `weight_tracked`
    pub count: Decimal,
    #[serde(default)]
    pub weight_tracked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default)]
    pub variations: Vec<VariationIds>,
    #[serde(default)]
    pub addons: Vec<AddonCount>,
    #[serde(default)]
    pub extras: Vec<String>,
    #[serde(default)]
    pub excludes: Vec<String>,
}

impl From<&OrderLine> for FlattenedProduct {
    fn from(line: &OrderLine) -> Self {
        Self {
            product_id: line.product_id.clone(),
            count: line.quantity,
            weight_tracked: line.weight_tracked,
            note: line
                .notes
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string),
            variations: line
                .selected_variations
                .iter()
                .map(|(group_id, options)| VariationIds {
                    group_id: group_id.clone(),
                    option_ids: options.iter().map(|o| o.option_id.clone()).collect(),
                })
                .collect(),
            addons: line
                .selected_addons
                .iter()
                .map(|a| AddonCount {
                    addon_id: a.addon_id.clone(),
                    count: a.quantity,
                })
                .collect(),
            extras: line.selected_extras.iter().map(|e| e.extra_id.clone()).collect(),
            excludes: line.excluded_option_ids.clone(),
        }
    }
}

// ============================================================================
// Line Sync
// ============================================================================

/// Create or append lines on the remote order of a context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLinesRequest {
    pub context: OrderContext,
    pub products: Vec<FlattenedProduct>,
}

/// Remote ids assigned to each submitted product, in request order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateLinesResponse {
    pub remote_line_ids: Vec<Vec<RemoteLineId>>,
}

/// A persisted line as returned when reloading a remote order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoteOrderLine {
    pub remote_line_ids: Vec<RemoteLineId>,
    #[serde(flatten)]
    pub product: LineCandidate,
    pub quantity: Decimal,
    #[serde(default)]
    pub preparation_status: PreparationStatus,
}

// ============================================================================
// Kitchen Status / Void / Transfer
// ============================================================================

/// Preparation status update for a batch of remote lines
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusUpdateRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_id: Option<String>,
    pub remote_line_ids: Vec<RemoteLineId>,
    pub status: String,
}

/// Void remote lines under manager authorization
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VoidLinesRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_id: Option<String>,
    pub remote_line_ids: Vec<RemoteLineId>,
    pub manager_id: String,
    pub manager_password: String,
}

/// Move every remote line of a table to another table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransferRequest {
    pub source_table_id: String,
    pub destination_table_id: String,
    pub remote_line_ids: Vec<RemoteLineId>,
}

// ============================================================================
// Checkout
// ============================================================================

/// Remote endpoint a checkout is submitted to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutEndpoint {
    /// Pays every line of a dine-in order and closes the table
    DineInFull,
    /// Pays a subset of a dine-in order; the table stays open
    DineInPartial,
    TakeAway,
    Delivery,
}

impl CheckoutEndpoint {
    pub fn select(order_type: OrderType, partial: bool) -> Self {
        match order_type {
            OrderType::DineIn if partial => Self::DineInPartial,
            OrderType::DineIn => Self::DineInFull,
            OrderType::TakeAway => Self::TakeAway,
            OrderType::Delivery => Self::Delivery,
        }
    }

    /// Path relative to the API base url
    pub fn path(&self) -> &'static str {
        match self {
            Self::DineInFull => "api/checkout/dine-in",
            Self::DineInPartial => "api/checkout/dine-in/partial",
            Self::TakeAway => "api/checkout/take-away",
            Self::Delivery => "api/checkout/delivery",
        }
    }
}

/// Split as submitted, amounts rounded to cents
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SplitPayload {
    pub account_id: String,
    pub amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_digits: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
}

impl From<&PaymentSplit> for SplitPayload {
    fn from(split: &PaymentSplit) -> Self {
        Self {
            account_id: split.account_id.clone(),
            amount: split.amount,
            reference_digits: split.reference_digits.clone(),
            transaction_id: split.transaction_id.clone(),
        }
    }
}

/// Finalized order submitted at checkout
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckoutRequest {
    pub endpoint: CheckoutEndpoint,
    pub context: OrderContext,
    pub products: Vec<FlattenedProduct>,
    /// Remote ids of the lines being paid (dine-in)
    #[serde(default)]
    pub remote_line_ids: Vec<RemoteLineId>,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub service_fee: Decimal,
    pub delivery_fee: Decimal,
    pub discount_total: Decimal,
    pub payable_total: Decimal,
    #[serde(default)]
    pub splits: Vec<SplitPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_code: Option<String>,
    /// Settled on credit against this customer instead of immediate payment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_customer_id: Option<String>,
    #[serde(default)]
    pub due_module: bool,
}

/// Persisted order summary used for receipt rendering
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckoutReceipt {
    pub order_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_number: Option<String>,
    pub payable_total: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

// ============================================================================
// Discount Code
// ============================================================================

/// Percentage granted by a valid discount code
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiscountCodeGrant {
    pub code: String,
    pub percentage: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::line::PricedOption;
    use crate::order::types::LocalId;

    #[test]
    fn test_flatten_line() {
        let candidate = LineCandidate::new("p-1", "Shawarma", Decimal::from(45))
            .with_variation(
                "bread",
                vec![PricedOption::new("saj", Decimal::ZERO)],
            )
            .with_addon("garlic", 2, Decimal::new(150, 2))
            .with_extra("fries", Decimal::from(10))
            .with_excluded("pickles")
            .with_notes("  cut in half ");
        let line = OrderLine::from_candidate(
            LocalId(9),
            candidate,
            Decimal::from(3),
            PreparationStatus::Pending,
        );

        let flat = FlattenedProduct::from(&line);
        assert_eq!(flat.count, Decimal::from(3));
        assert_eq!(flat.note.as_deref(), Some("cut in half"));
        assert_eq!(
            flat.variations,
            vec![VariationIds {
                group_id: "bread".into(),
                option_ids: vec!["saj".into()],
            }]
        );
        assert_eq!(
            flat.addons,
            vec![AddonCount {
                addon_id: "garlic".into(),
                count: 2,
            }]
        );
        assert_eq!(flat.extras, vec!["fries".to_string()]);
        assert_eq!(flat.excludes, vec!["pickles".to_string()]);
    }

    #[test]
    fn test_endpoint_selection() {
        assert_eq!(
            CheckoutEndpoint::select(OrderType::DineIn, true),
            CheckoutEndpoint::DineInPartial
        );
        assert_eq!(
            CheckoutEndpoint::select(OrderType::DineIn, false),
            CheckoutEndpoint::DineInFull
        );
        // partial flag is only meaningful for dine-in
        assert_eq!(
            CheckoutEndpoint::select(OrderType::Delivery, true),
            CheckoutEndpoint::Delivery
        );
    }

    #[test]
    fn test_remote_line_flattened_product() {
        let json = serde_json::json!({
            "remote_line_ids": ["r-1"],
            "product_id": "p-7",
            "name": "Tea",
            "unit_price": 12.5,
            "quantity": 2,
            "preparation_status": "ready"
        });
        let line: RemoteOrderLine = serde_json::from_value(json).unwrap();
        assert_eq!(line.product.product_id, "p-7");
        assert_eq!(line.product.unit_price, Decimal::new(125, 1));
        assert_eq!(line.preparation_status, PreparationStatus::Ready);
    }
}

//! Financial accounts and payment splits

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A configured account payments can be routed to (cash drawer, card terminal, ...)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FinancialAccount {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub is_cash: bool,
    /// Payments through this account need the last 4 card digits
    #[serde(default)]
    pub requires_reference: bool,
}

/// One allocation within a checkout
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentSplit {
    pub split_id: u32,
    pub account_id: String,
    pub amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_digits: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
}

impl PaymentSplit {
    pub fn new(split_id: u32, account_id: impl Into<String>, amount: Decimal) -> Self {
        Self {
            split_id,
            account_id: account_id.into(),
            amount,
            reference_digits: None,
            transaction_id: None,
        }
    }

    /// Whether the stored reference is exactly four ASCII digits
    pub fn has_valid_reference(&self) -> bool {
        self.reference_digits
            .as_deref()
            .is_some_and(|r| r.len() == 4 && r.bytes().all(|b| b.is_ascii_digit()))
    }
}

/// Customer allowed to settle on credit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DueCustomer {
    pub customer_id: String,
    pub name: String,
    pub credit_limit: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_validation() {
        let mut split = PaymentSplit::new(1, "visa", Decimal::from(10));
        assert!(!split.has_valid_reference());

        for (reference, valid) in [("1234", true), ("123", false), ("12a4", false), ("12345", false)] {
            split.reference_digits = Some(reference.to_string());
            assert_eq!(split.has_valid_reference(), valid, "reference {reference}");
        }
    }
}

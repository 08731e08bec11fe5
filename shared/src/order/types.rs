//! Order type, order context and identifiers

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Identifiers
// ============================================================================

/// Client-generated line identity, unique within one store and never reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalId(pub u64);

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// Backend-assigned line identifier
pub type RemoteLineId = String;

// ============================================================================
// Order Type
// ============================================================================

/// How the order is served
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    /// Served at a table; lines are tracked by the kitchen
    #[default]
    DineIn,
    /// Picked up at the counter
    TakeAway,
    /// Delivered to a customer address
    Delivery,
}

impl OrderType {
    /// Whether lines of this order type carry a kitchen preparation status
    pub fn tracks_preparation(&self) -> bool {
        matches!(self, OrderType::DineIn)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::DineIn => "dine_in",
            OrderType::TakeAway => "take_away",
            OrderType::Delivery => "delivery",
        }
    }
}

// ============================================================================
// Order Context
// ============================================================================

/// The active order an Order Line Store belongs to
///
/// One store exists per table, per take-away session and per delivery customer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderContext {
    DineIn { table_id: String },
    TakeAway { session_id: String },
    Delivery { customer_id: String },
}

impl OrderContext {
    pub fn dine_in(table_id: impl Into<String>) -> Self {
        Self::DineIn {
            table_id: table_id.into(),
        }
    }

    pub fn take_away(session_id: impl Into<String>) -> Self {
        Self::TakeAway {
            session_id: session_id.into(),
        }
    }

    pub fn delivery(customer_id: impl Into<String>) -> Self {
        Self::Delivery {
            customer_id: customer_id.into(),
        }
    }

    pub fn order_type(&self) -> OrderType {
        match self {
            Self::DineIn { .. } => OrderType::DineIn,
            Self::TakeAway { .. } => OrderType::TakeAway,
            Self::Delivery { .. } => OrderType::Delivery,
        }
    }

    /// Table id for dine-in contexts
    pub fn table_id(&self) -> Option<&str> {
        match self {
            Self::DineIn { table_id } => Some(table_id),
            _ => None,
        }
    }

    /// Key under which this context's cart snapshot is persisted
    pub fn cart_key(&self) -> String {
        match self {
            Self::DineIn { table_id } => format!("cart:dine_in:{}", table_id),
            Self::TakeAway { session_id } => format!("cart:take_away:{}", session_id),
            Self::Delivery { customer_id } => format!("cart:delivery:{}", customer_id),
        }
    }
}

impl fmt::Display for OrderContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DineIn { table_id } => write!(f, "table {}", table_id),
            Self::TakeAway { session_id } => write!(f, "take-away {}", session_id),
            Self::Delivery { customer_id } => write!(f, "delivery {}", customer_id),
        }
    }
}

//! Engine response events
//!
//! One `EngineResponse` is published on the bus for every order-lifecycle
//! outcome. Downstream consumers (storage mirror, socket fan-out) apply
//! them without talking to the engine again.

use crate::order::Order;
use crate::trade::Trade;
use serde::{Deserialize, Serialize};

/// Outcome tag of an engine response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EngineStatus {
    OrderAdded,
    OrderFilled,
    OrderPartiallyFilled,
    OrderCancelled,
    OrderInvalidated,
    #[serde(rename = "ERROR_STATUS")]
    Error,
}

/// The engine's answer to one order-lifecycle operation.
///
/// `order` is the full current state of the subject order; `matches`
/// lists the trades the operation produced (or, for invalidation, the
/// trades being reversed). Maker orders touched along the way do not get
/// responses of their own; they are implicit in the trade list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineResponse {
    pub status: EngineStatus,
    pub order: Order,
    pub matches: Option<Vec<Trade>>,
}

impl EngineResponse {
    pub fn added(order: Order) -> Self {
        Self {
            status: EngineStatus::OrderAdded,
            order,
            matches: None,
        }
    }

    pub fn filled(order: Order, trades: Vec<Trade>) -> Self {
        Self {
            status: EngineStatus::OrderFilled,
            order,
            matches: Some(trades),
        }
    }

    pub fn partially_filled(order: Order, trades: Vec<Trade>) -> Self {
        Self {
            status: EngineStatus::OrderPartiallyFilled,
            order,
            matches: Some(trades),
        }
    }

    pub fn cancelled(order: Order) -> Self {
        Self {
            status: EngineStatus::OrderCancelled,
            order,
            matches: None,
        }
    }

    pub fn invalidated(order: Order, reversed: Vec<Trade>) -> Self {
        Self {
            status: EngineStatus::OrderInvalidated,
            order,
            matches: Some(reversed),
        }
    }

    pub fn error(order: Order) -> Self {
        Self {
            status: EngineStatus::Error,
            order,
            matches: None,
        }
    }

    /// Trades carried by this response, empty if none.
    pub fn trades(&self) -> &[Trade] {
        self.matches.as_deref().unwrap_or(&[])
    }
}

//! Match bundle
//!
//! The atomic (taker order, maker orders, trades) unit that settlement
//! validates on chain. Invalidation messages carry it back to the engine
//! when a participant's on-chain state no longer covers the trades.

use crate::order::Order;
use crate::trade::Trade;
use serde::{Deserialize, Serialize};

/// One taker order together with the maker orders and trades it produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Matches {
    pub taker_order: Order,
    pub maker_orders: Vec<Order>,
    pub trades: Vec<Trade>,
}

impl Matches {
    pub fn new(taker_order: Order) -> Self {
        Self {
            taker_order,
            maker_orders: Vec::new(),
            trades: Vec::new(),
        }
    }

    /// Pair code of the bundle, derived from the taker order.
    pub fn pair_code(&self) -> String {
        self.taker_order.pair_code()
    }

    /// Trades in which the given maker order participated.
    pub fn trades_for_maker(&self, maker_order: &Order) -> Vec<Trade> {
        self.trades
            .iter()
            .filter(|t| t.maker_order_hash == maker_order.hash)
            .cloned()
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }
}

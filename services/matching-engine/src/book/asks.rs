//! Ask (sell-side) ladder
//!
//! Price levels sorted ascending: the lowest ask is consumed first.

use ethers::types::H256;
use types::numeric::{Amount, Price};
use types::order::Order;

use std::collections::BTreeMap;

use super::price_level::PriceLevel;

/// Sell-side price ladder.
#[derive(Debug, Clone, Default)]
pub struct AskLadder {
    levels: BTreeMap<Price, PriceLevel>,
}

impl AskLadder {
    pub fn new() -> Self {
        Self {
            levels: BTreeMap::new(),
        }
    }

    /// Rest an order, creating its price level if absent.
    pub fn insert(&mut self, order: Order) {
        self.levels.entry(order.price).or_default().append(order);
    }

    /// Remove an order; drops the level when it empties.
    pub fn remove(&mut self, price: Price, hash: &H256) -> Option<Order> {
        let level = self.levels.get_mut(&price)?;
        let removed = level.remove(hash);
        if level.is_empty() {
            self.levels.remove(&price);
        }
        removed
    }

    /// Lowest ask price.
    pub fn best_price(&self) -> Option<Price> {
        self.levels.keys().next().copied()
    }

    /// Lowest ask price and its aggregate remaining volume.
    pub fn best(&self) -> Option<(Price, Amount)> {
        self.levels
            .iter()
            .next()
            .map(|(price, level)| (*price, level.total_remaining()))
    }

    pub fn level_mut(&mut self, price: Price) -> Option<&mut PriceLevel> {
        self.levels.get_mut(&price)
    }

    /// Drop a level once matching has emptied it.
    pub fn prune(&mut self, price: Price) {
        if self.levels.get(&price).is_some_and(|l| l.is_empty()) {
            self.levels.remove(&price);
        }
    }

    /// Top `depth` levels, best first.
    pub fn depth(&self, depth: usize) -> Vec<(Price, Amount)> {
        self.levels
            .iter()
            .take(depth)
            .map(|(price, level)| (*price, level.total_remaining()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub fn iter_orders(&self) -> impl Iterator<Item = &Order> {
        self.levels.values().flat_map(|level| level.iter())
    }
}

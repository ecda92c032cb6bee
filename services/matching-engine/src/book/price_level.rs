//! Price level with time-priority queue
//!
//! A price level holds every resting order at one price. Orders are kept
//! sorted by (creation timestamp, order hash) so consumption order is
//! deterministic even when two orders carry the same timestamp.

use ethers::types::H256;
use types::numeric::Amount;
use types::order::Order;

use std::collections::VecDeque;

/// All resting orders at a single price.
#[derive(Debug, Clone, Default)]
pub struct PriceLevel {
    /// Orders sorted by priority key, front consumed first
    orders: VecDeque<Order>,
    /// Sum of the remaining amounts of all orders at this level
    total_remaining: Amount,
}

impl PriceLevel {
    pub fn new() -> Self {
        Self {
            orders: VecDeque::new(),
            total_remaining: Amount::zero(),
        }
    }

    /// Insert an order at its time-priority position.
    ///
    /// Orders arriving in timestamp order append at the back; a replayed
    /// order with an earlier timestamp slots in before later ones.
    pub fn append(&mut self, order: Order) {
        self.total_remaining = self.total_remaining + order.remaining();
        let key = order.priority_key();
        let position = self
            .orders
            .iter()
            .rposition(|resting| resting.priority_key() <= key)
            .map(|i| i + 1)
            .unwrap_or(0);
        self.orders.insert(position, order);
        self.check_volume();
    }

    /// Remove an order by hash, returning it with its fill state intact.
    pub fn remove(&mut self, hash: &H256) -> Option<Order> {
        let position = self.orders.iter().position(|o| &o.hash == hash)?;
        let order = self.orders.remove(position)?;
        self.total_remaining = self.total_remaining - order.remaining();
        self.check_volume();
        Some(order)
    }

    /// The order with the highest time priority.
    pub fn front(&self) -> Option<&Order> {
        self.orders.front()
    }

    /// Fill the front order by `amount` and return its updated state.
    ///
    /// A fully filled front order is removed from the queue.
    pub fn fill_front(&mut self, amount: Amount) -> Option<Order> {
        let front = self.orders.front_mut()?;
        front.fill(amount);
        self.total_remaining = self.total_remaining - amount;

        let updated = if front.is_filled() {
            self.orders.pop_front()
        } else {
            Some(front.clone())
        };
        self.check_volume();
        updated
    }

    /// Sum of remaining amounts across the level.
    pub fn total_remaining(&self) -> Amount {
        self.total_remaining
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Order> {
        self.orders.iter()
    }

    fn check_volume(&self) {
        debug_assert_eq!(
            self.total_remaining,
            self.orders
                .iter()
                .fold(Amount::zero(), |sum, o| sum + o.remaining()),
            "level volume diverged from order remainders"
        );
        debug_assert!(
            self.orders.iter().all(|o| !o.remaining().is_zero()),
            "fully consumed order left inside a level"
        );
    }
}

//! In-memory port adapters
//!
//! Back the `OrderStore`, `MessageBus` and `ChainProvider` ports with
//! plain collections for tests and local runs. Production drivers live
//! outside this crate.

use async_trait::async_trait;
use ethers::types::{Address, U256};
use tokio::sync::Mutex;
use types::errors::{BusError, ChainError, StoreError};
use types::order::Order;
use types::pair::Pair;
use types::response::EngineResponse;

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex as StdMutex;

use crate::ports::{BusMessage, ChainProvider, MessageBus, OrderStore};

/// Order store backed by a per-topic map.
#[derive(Default)]
pub struct MemoryOrderStore {
    pairs: Vec<Pair>,
    pending: StdMutex<HashMap<String, Vec<Order>>>,
}

impl MemoryOrderStore {
    pub fn new(pairs: Vec<Pair>) -> Self {
        Self {
            pairs,
            pending: StdMutex::new(HashMap::new()),
        }
    }

    /// Seed pending orders under a topic, kept in creation-timestamp
    /// order the way the real store returns them.
    pub fn seed(&self, topic: &str, orders: Vec<Order>) {
        let mut pending = self.pending.lock().unwrap();
        let slot = pending.entry(topic.to_string()).or_default();
        slot.extend(orders);
        slot.sort_by_key(|o| o.priority_key());
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn list_pairs(&self) -> Result<Vec<Pair>, StoreError> {
        Ok(self.pairs.clone())
    }

    async fn list_pending(&self, topic: &str) -> Result<Vec<Order>, StoreError> {
        let pending = self.pending.lock().unwrap();
        Ok(pending.get(topic).cloned().unwrap_or_default())
    }
}

/// Message bus backed by an in-process queue.
///
/// `consume` drains messages pushed with `push`; publishing records the
/// responses for inspection. `fail_publishes` makes the next N publish
/// calls return `BusError::Unavailable`, which is how the redelivery
/// tests exercise the idempotent retry path.
#[derive(Default)]
pub struct MemoryBus {
    inbox: Mutex<VecDeque<BusMessage>>,
    published: StdMutex<Vec<EngineResponse>>,
    publish_failures: AtomicUsize,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push(&self, message: BusMessage) {
        self.inbox.lock().await.push_back(message);
    }

    /// Engine responses published so far, in publish order.
    pub fn published(&self) -> Vec<EngineResponse> {
        self.published.lock().unwrap().clone()
    }

    /// Make the next `count` publish calls fail.
    pub fn fail_publishes(&self, count: usize) {
        self.publish_failures.store(count, Ordering::SeqCst);
    }
}

#[async_trait]
impl MessageBus for MemoryBus {
    async fn consume(&self) -> Result<Option<BusMessage>, BusError> {
        Ok(self.inbox.lock().await.pop_front())
    }

    async fn publish_engine_response(&self, response: &EngineResponse) -> Result<(), BusError> {
        let remaining = self.publish_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.publish_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(BusError::Unavailable("injected publish failure".to_string()));
        }
        self.published.lock().unwrap().push(response.clone());
        Ok(())
    }
}

/// Chain provider answering every query with a fixed balance.
pub struct StaticChainProvider {
    balance: U256,
}

impl StaticChainProvider {
    pub fn new(balance: U256) -> Self {
        Self { balance }
    }
}

impl Default for StaticChainProvider {
    fn default() -> Self {
        Self::new(U256::MAX)
    }
}

#[async_trait]
impl ChainProvider for StaticChainProvider {
    async fn balance_of(&self, _token: Address, _owner: Address) -> Result<U256, ChainError> {
        Ok(self.balance)
    }

    async fn allowance(
        &self,
        _token: Address,
        _owner: Address,
        _spender: Address,
    ) -> Result<U256, ChainError> {
        Ok(self.balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::numeric::{Amount, Price};
    use types::order::{OrderType, Side};

    fn pair() -> Pair {
        Pair::new(Address::from([0xB0; 20]), Address::from([0x90; 20]))
    }

    fn order(created_at: i64) -> Order {
        Order::new(
            pair(),
            Address::from([0x01; 20]),
            Side::Buy,
            OrderType::Limit,
            Price::from_u64(100),
            Amount::from_u64(10),
            created_at as u64,
            created_at,
        )
    }

    #[tokio::test]
    async fn test_store_returns_seeded_orders_in_time_order() {
        let store = MemoryOrderStore::new(vec![pair()]);
        store.seed("topic", vec![order(5), order(1), order(3)]);

        let orders = store.list_pending("topic").await.unwrap();
        let stamps: Vec<_> = orders.iter().map(|o| o.created_at).collect();
        assert_eq!(stamps, vec![1, 3, 5]);
    }

    #[tokio::test]
    async fn test_store_unknown_topic_is_empty() {
        let store = MemoryOrderStore::new(vec![pair()]);
        assert!(store.list_pending("nothing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bus_consume_drains_in_order() {
        let bus = MemoryBus::new();
        bus.push(BusMessage::new_order(&order(1)).unwrap()).await;
        bus.push(BusMessage::cancel_order(&order(1)).unwrap()).await;

        assert!(matches!(
            bus.consume().await.unwrap().unwrap().kind,
            crate::ports::MessageKind::NewOrder
        ));
        assert!(matches!(
            bus.consume().await.unwrap().unwrap().kind,
            crate::ports::MessageKind::CancelOrder
        ));
        assert!(bus.consume().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_bus_publish_failure_injection() {
        let bus = MemoryBus::new();
        bus.fail_publishes(1);

        let response = EngineResponse::added(order(1));
        assert!(bus.publish_engine_response(&response).await.is_err());
        assert!(bus.publish_engine_response(&response).await.is_ok());
        assert_eq!(bus.published().len(), 1);
    }
}

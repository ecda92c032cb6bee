//! Message dispatcher
//!
//! A pool of workers consuming the order-lifecycle topic. Each worker
//! decodes the envelope, routes the payload to the engine by pair code,
//! and lets the engine publish the resulting responses.
//!
//! Dispatch is per-message atomic: a decode failure propagates to the
//! bus consumer, which governs redelivery; a domain failure inside a
//! book has already been answered with an ERROR_STATUS response and
//! counts as handled. Unknown message types are logged and dropped.

use tracing::{debug, error, info, warn};
use types::errors::EngineError;
use types::matches::Matches;
use types::order::Order;

use std::sync::Arc;

use crate::engine::Engine;
use crate::ports::{BusMessage, MessageBus, MessageKind};

/// Worker-pool configuration.
///
/// Workers map one-to-one onto bus partitions; each worker processes its
/// messages sequentially, which preserves per-partition order.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub workers: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self { workers: 4 }
    }
}

/// Routes bus messages into the engine.
pub struct Dispatcher {
    engine: Arc<Engine>,
    bus: Arc<dyn MessageBus>,
    config: DispatcherConfig,
}

impl Dispatcher {
    pub fn new(engine: Arc<Engine>, bus: Arc<dyn MessageBus>) -> Self {
        Self::with_config(engine, bus, DispatcherConfig::default())
    }

    pub fn with_config(
        engine: Arc<Engine>,
        bus: Arc<dyn MessageBus>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            engine,
            bus,
            config,
        }
    }

    /// Run the worker pool until the bus closes.
    pub async fn run(&self) {
        info!(workers = self.config.workers, "dispatcher starting");

        let mut handles = Vec::with_capacity(self.config.workers);
        for worker in 0..self.config.workers {
            let engine = Arc::clone(&self.engine);
            let bus = Arc::clone(&self.bus);
            handles.push(tokio::spawn(async move {
                worker_loop(worker, engine, bus).await;
            }));
        }

        for handle in handles {
            if let Err(err) = handle.await {
                error!(error = %err, "dispatcher worker panicked");
            }
        }
        info!("dispatcher stopped");
    }

    /// Handle a single message. Exposed so tests can drive the routing
    /// without a worker pool.
    pub async fn dispatch(&self, message: BusMessage) -> Result<(), EngineError> {
        dispatch(&self.engine, message).await
    }
}

async fn worker_loop(worker: usize, engine: Arc<Engine>, bus: Arc<dyn MessageBus>) {
    debug!(worker, "worker started");
    loop {
        match bus.consume().await {
            Ok(Some(message)) => {
                if let Err(err) = dispatch(&engine, message).await {
                    // the bus driver decides whether to redeliver
                    error!(worker, error = %err, "message handling failed");
                }
            }
            Ok(None) => {
                debug!(worker, "bus drained, worker exiting");
                break;
            }
            Err(err) => {
                error!(worker, error = %err, "bus consume failed, worker exiting");
                break;
            }
        }
    }
}

async fn dispatch(engine: &Engine, message: BusMessage) -> Result<(), EngineError> {
    match message.kind {
        MessageKind::NewOrder => {
            let order: Order = serde_json::from_value(message.payload)?;
            engine.new_order(order).await
        }
        MessageKind::CancelOrder => {
            let order: Order = serde_json::from_value(message.payload)?;
            engine.cancel_order(order).await
        }
        MessageKind::InvalidateMakerOrders => {
            let matches: Matches = serde_json::from_value(message.payload)?;
            engine.invalidate_maker_orders(matches).await
        }
        MessageKind::InvalidateTakerOrders => {
            let matches: Matches = serde_json::from_value(message.payload)?;
            engine.invalidate_taker_orders(matches).await
        }
        MessageKind::Unknown => {
            warn!("unknown message type dropped");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::types::Address;
    use serde_json::json;
    use types::numeric::{Amount, Price};
    use types::order::{OrderType, Side};
    use types::pair::Pair;
    use types::response::EngineStatus;

    use crate::memory::{MemoryBus, MemoryOrderStore, StaticChainProvider};

    fn pair() -> Pair {
        Pair::new(Address::from([0xB0; 20]), Address::from([0x90; 20]))
    }

    fn limit(maker: u8, side: Side, price: u64, amount: u64, created_at: i64) -> Order {
        Order::new(
            pair(),
            Address::from([maker; 20]),
            side,
            OrderType::Limit,
            Price::from_u64(price),
            Amount::from_u64(amount),
            created_at as u64,
            created_at,
        )
    }

    async fn dispatcher_with_workers(workers: usize) -> (Dispatcher, Arc<MemoryBus>) {
        let store = Arc::new(MemoryOrderStore::new(vec![pair()]));
        let bus = Arc::new(MemoryBus::new());
        let provider = Arc::new(StaticChainProvider::default());
        let engine = Arc::new(
            Engine::new(store, bus.clone(), provider).await.unwrap(),
        );
        let config = DispatcherConfig { workers };
        (
            Dispatcher::with_config(engine, bus.clone(), config),
            bus,
        )
    }

    async fn dispatcher() -> (Dispatcher, Arc<MemoryBus>) {
        dispatcher_with_workers(1).await
    }

    #[tokio::test]
    async fn test_run_drains_bus_and_publishes() {
        let (dispatcher, bus) = dispatcher().await;

        bus.push(BusMessage::new_order(&limit(0x01, Side::Sell, 100, 10, 1)).unwrap())
            .await;
        bus.push(BusMessage::new_order(&limit(0x02, Side::Buy, 100, 4, 2)).unwrap())
            .await;

        dispatcher.run().await;

        let statuses: Vec<_> = bus.published().iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            vec![EngineStatus::OrderAdded, EngineStatus::OrderFilled]
        );
    }

    #[tokio::test]
    async fn test_cancel_routing() {
        let (dispatcher, bus) = dispatcher().await;
        let order = limit(0x01, Side::Buy, 100, 10, 1);

        dispatcher
            .dispatch(BusMessage::new_order(&order).unwrap())
            .await
            .unwrap();
        dispatcher
            .dispatch(BusMessage::cancel_order(&order).unwrap())
            .await
            .unwrap();

        let statuses: Vec<_> = bus.published().iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            vec![EngineStatus::OrderAdded, EngineStatus::OrderCancelled]
        );
    }

    #[tokio::test]
    async fn test_decode_failure_surfaces_to_consumer() {
        let (dispatcher, bus) = dispatcher().await;

        let malformed = BusMessage {
            kind: MessageKind::NewOrder,
            payload: json!({"amount": "not a number"}),
        };
        let result = dispatcher.dispatch(malformed).await;
        assert!(matches!(result, Err(EngineError::Decode(_))));
        assert!(bus.published().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_type_dropped_without_error() {
        let (dispatcher, bus) = dispatcher().await;

        let message: BusMessage =
            serde_json::from_str(r#"{"type":"REINDEX_PAIRS","payload":{}}"#).unwrap();
        dispatcher.dispatch(message).await.unwrap();
        assert!(bus.published().is_empty());
    }

    #[tokio::test]
    async fn test_worker_pool_processes_all_messages() {
        let (dispatcher, bus) = dispatcher_with_workers(4).await;

        for i in 0..20 {
            bus.push(
                BusMessage::new_order(&limit(0x10 + i, Side::Sell, 100 + i as u64, 1, i as i64))
                    .unwrap(),
            )
            .await;
        }

        dispatcher.run().await;
        assert_eq!(bus.published().len(), 20);
    }
}

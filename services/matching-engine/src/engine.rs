//! Engine core
//!
//! Owns the book registry and runs every order-lifecycle operation:
//! resolve the book by pair code, mutate it, publish the responses. Each
//! book sits behind its own async mutex and the lock is held until its
//! responses are on the bus, so responses for one book always go out in
//! production order and before the book's next message is processed.
//! Different pairs proceed in parallel.

use tokio::sync::Mutex;
use tracing::{error, info};
use types::errors::EngineError;
use types::matches::Matches;
use types::order::{Order, OrderStatus};
use types::pair::Pair;
use types::response::EngineResponse;

use std::collections::HashMap;
use std::sync::Arc;

use crate::book::{BookSnapshot, OrderBook};
use crate::ports::{ChainProvider, MessageBus, OrderStore};
use crate::recovery::{RecoveryLoader, RecoveryReport};

/// The matching engine: one order book per active trading pair.
///
/// The registry is built once at construction and never changes while
/// the engine runs; pair-set changes require a restart or a quiesced
/// reload.
pub struct Engine {
    books: HashMap<String, Arc<Mutex<OrderBook>>>,
    store: Arc<dyn OrderStore>,
    bus: Arc<dyn MessageBus>,
    provider: Arc<dyn ChainProvider>,
}

impl Engine {
    /// Build the registry from the store's active pairs.
    pub async fn new(
        store: Arc<dyn OrderStore>,
        bus: Arc<dyn MessageBus>,
        provider: Arc<dyn ChainProvider>,
    ) -> Result<Self, EngineError> {
        let pairs = store.list_pairs().await?;

        let mut books = HashMap::with_capacity(pairs.len());
        for pair in pairs {
            books.insert(pair.code(), Arc::new(Mutex::new(OrderBook::new(pair))));
        }
        info!(books = books.len(), "order books initialized");

        Ok(Self {
            books,
            store,
            bus,
            provider,
        })
    }

    /// Chain access for collaborators upstream of matching.
    pub fn provider(&self) -> Arc<dyn ChainProvider> {
        Arc::clone(&self.provider)
    }

    /// Place an incoming order and publish the outcome.
    pub async fn new_order(&self, order: Order) -> Result<(), EngineError> {
        let code = order.pair_code();
        let Some(book) = self.books.get(&code) else {
            return self.reject_unknown_pair(order, &code).await;
        };

        let mut book = book.lock().await;
        let response = book.place(order);
        self.publish(&response).await
    }

    /// Cancel an order and publish the outcome.
    pub async fn cancel_order(&self, order: Order) -> Result<(), EngineError> {
        let code = order.pair_code();
        let Some(book) = self.books.get(&code) else {
            return self.reject_unknown_pair(order, &code).await;
        };

        let mut book = book.lock().await;
        let response = book.cancel(order);
        self.publish(&response).await
    }

    /// Invalidate the maker side of a match bundle.
    pub async fn invalidate_maker_orders(&self, matches: Matches) -> Result<(), EngineError> {
        let code = matches.pair_code();
        let Some(book) = self.books.get(&code) else {
            return self
                .reject_unknown_pair(matches.taker_order.clone(), &code)
                .await;
        };

        let mut book = book.lock().await;
        for response in book.invalidate_maker_orders(&matches) {
            self.publish(&response).await?;
        }
        Ok(())
    }

    /// Invalidate the taker side of a match bundle.
    pub async fn invalidate_taker_orders(&self, matches: Matches) -> Result<(), EngineError> {
        let code = matches.pair_code();
        let Some(book) = self.books.get(&code) else {
            return self
                .reject_unknown_pair(matches.taker_order.clone(), &code)
                .await;
        };

        let mut book = book.lock().await;
        for response in book.invalidate_taker_orders(&matches) {
            self.publish(&response).await?;
        }
        Ok(())
    }

    /// Rebuild every book from storage. Run once at boot, before the
    /// dispatcher starts consuming.
    pub async fn recover(&self) -> RecoveryReport {
        RecoveryLoader::new(self).recover_all().await
    }

    /// Replay one pair's pending orders into its current book.
    ///
    /// Assumes the book started empty for the pair; callers must ensure
    /// that precondition.
    pub async fn sync_order_book(&self, pair: &Pair) -> Result<(), EngineError> {
        RecoveryLoader::new(self).replay_pair(pair).await?;
        Ok(())
    }

    /// Top-of-book view of one pair.
    pub async fn snapshot(&self, code: &str, depth: usize) -> Option<BookSnapshot> {
        let book = self.books.get(code)?;
        Some(book.lock().await.snapshot(depth))
    }

    pub fn pair_codes(&self) -> Vec<String> {
        self.books.keys().cloned().collect()
    }

    pub(crate) fn books(&self) -> &HashMap<String, Arc<Mutex<OrderBook>>> {
        &self.books
    }

    pub(crate) fn store(&self) -> &Arc<dyn OrderStore> {
        &self.store
    }

    pub(crate) fn bus(&self) -> &Arc<dyn MessageBus> {
        &self.bus
    }

    async fn reject_unknown_pair(&self, mut order: Order, code: &str) -> Result<(), EngineError> {
        error!(pair = code, order = %order.hash, "no order book registered for pair");
        order.status = OrderStatus::Error;
        self.publish(&EngineResponse::error(order)).await
    }

    async fn publish(&self, response: &EngineResponse) -> Result<(), EngineError> {
        self.bus
            .publish_engine_response(response)
            .await
            .map_err(EngineError::from)
    }
}

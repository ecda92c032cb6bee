//! Recovery loader
//!
//! Rebuilds order books from persisted orders at boot and on explicit
//! resync. Every stored order goes through the live `place()` path, so
//! matches that would have occurred are re-derived and the published
//! responses converge downstream storage — recovery never reimplements
//! matching.
//!
//! A failure on one order aborts that pair's recovery and is surfaced in
//! the report; other pairs continue.

use tokio::sync::Mutex;
use tracing::{error, info};
use types::errors::EngineError;
use types::pair::Pair;

use std::sync::Arc;

use crate::book::OrderBook;
use crate::engine::Engine;

/// Outcome of replaying one pair.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplayStats {
    pub orders_replayed: u64,
    pub responses_published: u64,
}

/// A pair whose recovery aborted.
#[derive(Debug)]
pub struct PairFailure {
    pub pair_code: String,
    pub error: EngineError,
}

/// Aggregate outcome of a full recovery pass.
#[derive(Debug, Default)]
pub struct RecoveryReport {
    pub pairs_recovered: usize,
    pub orders_replayed: u64,
    pub responses_published: u64,
    pub failures: Vec<PairFailure>,
}

impl RecoveryReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Replays persisted orders into the engine's books.
pub struct RecoveryLoader<'a> {
    engine: &'a Engine,
}

impl<'a> RecoveryLoader<'a> {
    pub fn new(engine: &'a Engine) -> Self {
        Self { engine }
    }

    /// Recover every registered pair.
    pub async fn recover_all(&self) -> RecoveryReport {
        let mut report = RecoveryReport::default();
        info!(pairs = self.engine.books().len(), "recovery started");

        for (code, book) in self.engine.books() {
            match self.replay_book(code, book).await {
                Ok(stats) => {
                    report.pairs_recovered += 1;
                    report.orders_replayed += stats.orders_replayed;
                    report.responses_published += stats.responses_published;
                }
                Err(err) => {
                    error!(pair = code.as_str(), error = %err, "pair recovery aborted");
                    report.failures.push(PairFailure {
                        pair_code: code.clone(),
                        error: err,
                    });
                }
            }
        }

        info!(
            pairs = report.pairs_recovered,
            orders = report.orders_replayed,
            failures = report.failures.len(),
            "recovery finished"
        );
        report
    }

    /// Replay one pair's pending orders into its current book.
    pub async fn replay_pair(&self, pair: &Pair) -> Result<ReplayStats, EngineError> {
        let code = pair.code();
        let book = self
            .engine
            .books()
            .get(&code)
            .ok_or_else(|| EngineError::UnknownPair(code.clone()))?;
        self.replay_book(&code, book).await
    }

    async fn replay_book(
        &self,
        code: &str,
        book: &Arc<Mutex<OrderBook>>,
    ) -> Result<ReplayStats, EngineError> {
        let mut book = book.lock().await;
        let orders = self.engine.store().list_pending(book.topic()).await?;
        let mut stats = ReplayStats {
            orders_replayed: orders.len() as u64,
            responses_published: 0,
        };

        for order in orders {
            let response = book.place(order);
            self.engine.bus().publish_engine_response(&response).await?;
            stats.responses_published += 1;
        }

        info!(
            pair = code,
            orders = stats.orders_replayed,
            "order book recovered"
        );
        Ok(stats)
    }
}

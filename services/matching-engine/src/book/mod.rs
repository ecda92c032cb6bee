//! Per-pair order book
//!
//! Two opposing price ladders plus an order-hash index. All mutation goes
//! through `place`, `cancel` and the invalidation entry points; the engine
//! serializes those calls per book, so nothing in here locks.
//!
//! Matching is price-time priority with execution at the maker's price.
//! Every operation is idempotent keyed by order hash: re-delivery of a
//! message the book already processed returns the response produced the
//! first time, without touching state.

pub mod asks;
pub mod bids;
pub mod price_level;

pub use asks::AskLadder;
pub use bids::BidLadder;
pub use price_level::PriceLevel;

use ethers::types::H256;
use types::errors::OrderError;
use types::matches::Matches;
use types::numeric::{Amount, Price};
use types::order::{Order, OrderStatus, OrderType, Side};
use types::pair::Pair;
use types::response::{EngineResponse, EngineStatus};
use types::trade::Trade;

use std::collections::HashMap;

use tracing::warn;

/// Order book for one trading pair.
#[derive(Debug)]
pub struct OrderBook {
    pair: Pair,
    /// Storage key scoping this pair's orders for recovery queries
    topic: String,
    bids: BidLadder,
    asks: AskLadder,
    /// Location of every live order: hash → (side, price)
    index: HashMap<H256, (Side, Price)>,
    /// Response produced when an order was first placed
    placements: HashMap<H256, EngineResponse>,
    /// Latest response for orders that left the book (filled, cancelled,
    /// invalidated); re-delivered operations answer from here
    closures: HashMap<H256, EngineResponse>,
}

/// Aggregate top-of-book view for observers and tests.
#[derive(Debug, Clone)]
pub struct BookSnapshot {
    pub pair_code: String,
    pub bids: Vec<(Price, Amount)>,
    pub asks: Vec<(Price, Amount)>,
}

impl OrderBook {
    pub fn new(pair: Pair) -> Self {
        Self {
            topic: pair.topic(),
            pair,
            bids: BidLadder::new(),
            asks: AskLadder::new(),
            index: HashMap::new(),
            placements: HashMap::new(),
            closures: HashMap::new(),
        }
    }

    pub fn pair(&self) -> &Pair {
        &self.pair
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Place an order: match against the opposing side, then rest or
    /// discard the remainder.
    ///
    /// Returns one response bundling the taker's final state and the
    /// trades produced. Maker orders consumed along the way do not get
    /// responses of their own.
    pub fn place(&mut self, order: Order) -> EngineResponse {
        if let Some(prior) = self.placements.get(&order.hash) {
            return prior.clone();
        }

        let mut taker = order;
        if let Err(reason) = self.validate(&taker) {
            warn!(order = %taker.hash, %reason, "rejecting order");
            taker.status = OrderStatus::Error;
            return EngineResponse::error(taker);
        }

        taker.status = OrderStatus::New;
        taker.filled_amount = Amount::zero();

        let mut trades = Vec::new();
        match taker.side {
            Side::Buy => self.match_asks(&mut taker, &mut trades),
            Side::Sell => self.match_bids(&mut taker, &mut trades),
        }

        let response = self.settle_taker(taker, trades);
        self.placements
            .insert(response.order.hash, response.clone());
        debug_assert!(!self.is_crossed(), "book crossed after matching round");
        response
    }

    /// Cancel a resting order.
    ///
    /// Fills already executed are preserved on the returned order. A hash
    /// the book has never seen cancels idempotently without state change;
    /// a hash that already left the book answers with its latest
    /// response.
    pub fn cancel(&mut self, request: Order) -> EngineResponse {
        if let Some(&(side, price)) = self.index.get(&request.hash) {
            let removed = match side {
                Side::Buy => self.bids.remove(price, &request.hash),
                Side::Sell => self.asks.remove(price, &request.hash),
            };
            self.index.remove(&request.hash);
            debug_assert!(removed.is_some(), "id-index entry without level membership");
            if let Some(mut order) = removed {
                order.status = OrderStatus::Cancelled;
                let response = EngineResponse::cancelled(order);
                self.closures.insert(request.hash, response.clone());
                return response;
            }
        }

        if let Some(prior) = self.closures.get(&request.hash) {
            return prior.clone();
        }

        let mut order = request;
        order.status = OrderStatus::Cancelled;
        EngineResponse::cancelled(order)
    }

    /// Invalidate every maker order referenced by a match bundle.
    ///
    /// Each response carries the trades being reversed so downstream
    /// storage can net them out. Idempotent and commutative with taker
    /// invalidation.
    pub fn invalidate_maker_orders(&mut self, matches: &Matches) -> Vec<EngineResponse> {
        matches
            .maker_orders
            .iter()
            .map(|maker| {
                let reversed = matches.trades_for_maker(maker);
                self.invalidate(maker, reversed)
            })
            .collect()
    }

    /// Invalidate the taker order of a match bundle.
    pub fn invalidate_taker_orders(&mut self, matches: &Matches) -> Vec<EngineResponse> {
        vec![self.invalidate(&matches.taker_order, matches.trades.clone())]
    }

    fn invalidate(&mut self, subject: &Order, reversed: Vec<Trade>) -> EngineResponse {
        if let Some(prior) = self.closures.get(&subject.hash) {
            if prior.status == EngineStatus::OrderInvalidated {
                return prior.clone();
            }
        }

        let mut order = if let Some(&(side, price)) = self.index.get(&subject.hash) {
            let removed = match side {
                Side::Buy => self.bids.remove(price, &subject.hash),
                Side::Sell => self.asks.remove(price, &subject.hash),
            };
            self.index.remove(&subject.hash);
            debug_assert!(removed.is_some(), "id-index entry without level membership");
            removed.unwrap_or_else(|| subject.clone())
        } else {
            subject.clone()
        };

        order.status = OrderStatus::Invalidated;
        let response = EngineResponse::invalidated(order, reversed);
        self.closures.insert(subject.hash, response.clone());
        response
    }

    // ── Matching ────────────────────────────────────────────────────

    fn match_asks(&mut self, taker: &mut Order, trades: &mut Vec<Trade>) {
        while !taker.is_filled() {
            let Some(best) = self.asks.best_price() else {
                break;
            };
            if taker.order_type == OrderType::Limit && best > taker.price {
                break;
            }
            let Some(level) = self.asks.level_mut(best) else {
                break;
            };
            let Some(maker) = level.front().cloned() else {
                break;
            };

            let amount = taker.remaining().min(maker.remaining());
            taker.fill(amount);
            trades.push(Trade::from_match(taker, &maker, amount));

            if let Some(updated) = level.fill_front(amount) {
                if updated.is_filled() {
                    self.index.remove(&updated.hash);
                    self.closures.insert(
                        updated.hash,
                        EngineResponse {
                            status: EngineStatus::OrderFilled,
                            order: updated,
                            matches: None,
                        },
                    );
                }
            }
            self.asks.prune(best);
        }
    }

    fn match_bids(&mut self, taker: &mut Order, trades: &mut Vec<Trade>) {
        while !taker.is_filled() {
            let Some(best) = self.bids.best_price() else {
                break;
            };
            if taker.order_type == OrderType::Limit && best < taker.price {
                break;
            }
            let Some(level) = self.bids.level_mut(best) else {
                break;
            };
            let Some(maker) = level.front().cloned() else {
                break;
            };

            let amount = taker.remaining().min(maker.remaining());
            taker.fill(amount);
            trades.push(Trade::from_match(taker, &maker, amount));

            if let Some(updated) = level.fill_front(amount) {
                if updated.is_filled() {
                    self.index.remove(&updated.hash);
                    self.closures.insert(
                        updated.hash,
                        EngineResponse {
                            status: EngineStatus::OrderFilled,
                            order: updated,
                            matches: None,
                        },
                    );
                }
            }
            self.bids.prune(best);
        }
    }

    /// Decide the taker's final state after the matching round.
    fn settle_taker(&mut self, mut taker: Order, trades: Vec<Trade>) -> EngineResponse {
        if taker.is_filled() {
            let response = EngineResponse::filled(taker, trades);
            self.closures
                .insert(response.order.hash, response.clone());
            return response;
        }

        if taker.has_fills() {
            // fill() already moved the status to PARTIAL_FILLED
            match taker.order_type {
                OrderType::Limit => {
                    self.rest(taker.clone());
                    EngineResponse::partially_filled(taker, trades)
                }
                OrderType::Market => {
                    let response = EngineResponse::partially_filled(taker, trades);
                    self.closures
                        .insert(response.order.hash, response.clone());
                    response
                }
            }
        } else {
            match taker.order_type {
                OrderType::Limit => {
                    taker.status = OrderStatus::Open;
                    self.rest(taker.clone());
                    EngineResponse::added(taker)
                }
                OrderType::Market => {
                    // nothing to match against; the order dies here
                    taker.status = OrderStatus::Cancelled;
                    let response = EngineResponse::cancelled(taker);
                    self.closures
                        .insert(response.order.hash, response.clone());
                    response
                }
            }
        }
    }

    fn rest(&mut self, order: Order) {
        self.index.insert(order.hash, (order.side, order.price));
        match order.side {
            Side::Buy => self.bids.insert(order),
            Side::Sell => self.asks.insert(order),
        }
    }

    fn validate(&self, order: &Order) -> Result<(), OrderError> {
        if order.pair() != self.pair {
            return Err(OrderError::PairMismatch {
                expected: self.pair.code(),
                got: order.pair_code(),
            });
        }
        if order.amount.is_zero() {
            return Err(OrderError::ZeroAmount);
        }
        if order.order_type == OrderType::Limit && order.price.is_zero() {
            return Err(OrderError::ZeroPrice);
        }
        if order.status.is_terminal() {
            return Err(OrderError::AlreadyTerminal(format!("{:?}", order.status)));
        }
        Ok(())
    }

    // ── Inspection ──────────────────────────────────────────────────

    pub fn best_bid(&self) -> Option<(Price, Amount)> {
        self.bids.best()
    }

    pub fn best_ask(&self) -> Option<(Price, Amount)> {
        self.asks.best()
    }

    /// A live order and its current fill state.
    pub fn resting(&self, hash: &H256) -> Option<&Order> {
        let &(side, _) = self.index.get(hash)?;
        match side {
            Side::Buy => self.bids.iter_orders().find(|o| &o.hash == hash),
            Side::Sell => self.asks.iter_orders().find(|o| &o.hash == hash),
        }
    }

    /// Number of live orders.
    pub fn resting_count(&self) -> usize {
        self.index.len()
    }

    pub fn is_crossed(&self) -> bool {
        match (self.bids.best_price(), self.asks.best_price()) {
            (Some(bid), Some(ask)) => bid >= ask,
            _ => false,
        }
    }

    pub fn snapshot(&self, depth: usize) -> BookSnapshot {
        BookSnapshot {
            pair_code: self.pair.code(),
            bids: self.bids.depth(depth),
            asks: self.asks.depth(depth),
        }
    }
}

//! End-to-end scenarios for the matching engine
//!
//! Drives full message flows through the dispatcher and validates the
//! published response streams, then checks the universal book invariants
//! with property tests:
//! - no crossed book after any operation sequence
//! - conservation of executed amounts
//! - execution at the maker's resting price
//! - idempotent replay of a whole message stream

use ethers::types::{Address, H256};
use matching_engine::book::OrderBook;
use matching_engine::memory::{MemoryBus, MemoryOrderStore, StaticChainProvider};
use matching_engine::ports::BusMessage;
use matching_engine::{Dispatcher, DispatcherConfig, Engine};
use types::matches::Matches;
use types::numeric::{Amount, Price};
use types::order::{Order, OrderStatus, OrderType, Side};
use types::pair::Pair;
use types::response::{EngineResponse, EngineStatus};

use std::collections::HashMap;
use std::sync::Arc;

use proptest::prelude::*;

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

async fn harness() -> (Dispatcher, Arc<MemoryBus>) {
    let store = Arc::new(MemoryOrderStore::new(vec![pair()]));
    let bus = Arc::new(MemoryBus::new());
    let provider = Arc::new(StaticChainProvider::default());
    let engine = Arc::new(Engine::new(store, bus.clone(), provider).await.unwrap());
    let dispatcher = Dispatcher::with_config(engine, bus.clone(), DispatcherConfig { workers: 1 });
    (dispatcher, bus)
}

// ── Scenarios ───────────────────────────────────────────────────────

#[tokio::test]
async fn s1_rest_then_match() {
    let (dispatcher, bus) = harness().await;

    let a = limit(0x01, Side::Sell, 100, 10, 1);
    let b = limit(0x02, Side::Buy, 100, 4, 2);
    bus.push(BusMessage::new_order(&a).unwrap()).await;
    bus.push(BusMessage::new_order(&b).unwrap()).await;
    dispatcher.run().await;

    let published = bus.published();
    assert_eq!(published.len(), 2);

    assert_eq!(published[0].status, EngineStatus::OrderAdded);
    assert!(published[0].trades().is_empty());

    assert_eq!(published[1].status, EngineStatus::OrderFilled);
    let trades = published[1].trades();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].price, Price::from_u64(100));
    assert_eq!(trades[0].amount, Amount::from_u64(4));
    assert_eq!(trades[0].maker_order_hash, a.hash);
}

#[tokio::test]
async fn s2_price_improvement() {
    let (dispatcher, bus) = harness().await;

    bus.push(BusMessage::new_order(&limit(0x01, Side::Sell, 100, 5, 1)).unwrap())
        .await;
    bus.push(BusMessage::new_order(&limit(0x02, Side::Buy, 110, 5, 2)).unwrap())
        .await;
    dispatcher.run().await;

    let published = bus.published();
    assert_eq!(published[1].status, EngineStatus::OrderFilled);
    let trades = published[1].trades();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].price, Price::from_u64(100));
    assert_eq!(trades[0].amount, Amount::from_u64(5));
    assert_eq!(published[1].order.status, OrderStatus::Filled);
}

#[tokio::test]
async fn s3_time_priority() {
    let (dispatcher, bus) = harness().await;

    let a = limit(0x01, Side::Sell, 100, 3, 1);
    let b = limit(0x02, Side::Sell, 100, 3, 2);
    let c = limit(0x03, Side::Buy, 100, 5, 3);
    for order in [&a, &b, &c] {
        bus.push(BusMessage::new_order(order).unwrap()).await;
    }
    dispatcher.run().await;

    let published = bus.published();
    let trades = published[2].trades();
    assert_eq!(trades.len(), 2);
    assert_eq!(trades[0].maker_order_hash, a.hash);
    assert_eq!(trades[0].amount, Amount::from_u64(3));
    assert_eq!(trades[1].maker_order_hash, b.hash);
    assert_eq!(trades[1].amount, Amount::from_u64(2));
    assert_eq!(published[2].order.status, OrderStatus::Filled);
}

#[tokio::test]
async fn s4_cancel() {
    let (dispatcher, bus) = harness().await;

    let a = limit(0x01, Side::Buy, 100, 10, 1);
    bus.push(BusMessage::new_order(&a).unwrap()).await;
    bus.push(BusMessage::cancel_order(&a).unwrap()).await;
    dispatcher.run().await;

    let published = bus.published();
    assert_eq!(published[1].status, EngineStatus::OrderCancelled);
    assert_eq!(published[1].order.status, OrderStatus::Cancelled);
}

#[tokio::test]
async fn s5_invalidate_maker_reverses_trade() {
    let (dispatcher, bus) = harness().await;

    let a = limit(0x01, Side::Sell, 100, 10, 1);
    let b = limit(0x02, Side::Buy, 100, 4, 2);
    bus.push(BusMessage::new_order(&a).unwrap()).await;
    bus.push(BusMessage::new_order(&b).unwrap()).await;
    dispatcher.run().await;

    let fill = bus.published()[1].clone();
    let mut bundle = Matches::new(fill.order.clone());
    bundle.maker_orders = vec![a.clone()];
    bundle.trades = fill.trades().to_vec();

    // invalidate twice: the second delivery must be a no-op with the
    // same terminal response
    bus.push(BusMessage::invalidate_maker_orders(&bundle).unwrap())
        .await;
    bus.push(BusMessage::invalidate_maker_orders(&bundle).unwrap())
        .await;
    dispatcher.run().await;

    let published = bus.published();
    assert_eq!(published.len(), 4);
    assert_eq!(published[2].status, EngineStatus::OrderInvalidated);
    assert_eq!(published[2].order.hash, a.hash);
    assert_eq!(published[2].order.status, OrderStatus::Invalidated);
    assert_eq!(published[2].trades(), fill.trades());
    assert_eq!(published[3], published[2]);
}

#[tokio::test]
async fn s5b_invalidation_nets_trades_to_zero() {
    let (dispatcher, bus) = harness().await;

    let a = limit(0x01, Side::Sell, 100, 10, 1);
    let b = limit(0x02, Side::Buy, 100, 4, 2);
    bus.push(BusMessage::new_order(&a).unwrap()).await;
    bus.push(BusMessage::new_order(&b).unwrap()).await;
    dispatcher.run().await;

    let fill = bus.published()[1].clone();
    let mut bundle = Matches::new(fill.order.clone());
    bundle.maker_orders = vec![a];
    bundle.trades = fill.trades().to_vec();

    bus.push(BusMessage::invalidate_maker_orders(&bundle).unwrap())
        .await;
    dispatcher.run().await;

    // replay the response stream into a fresh trade ledger: fills add,
    // reversals subtract, affected trades must net to zero
    let mut ledger: HashMap<H256, i128> = HashMap::new();
    for response in bus.published() {
        match response.status {
            EngineStatus::OrderFilled | EngineStatus::OrderPartiallyFilled => {
                for trade in response.trades() {
                    *ledger.entry(trade.hash).or_default() +=
                        trade.amount.as_u256().as_u128() as i128;
                }
            }
            EngineStatus::OrderInvalidated => {
                for trade in response.trades() {
                    *ledger.entry(trade.hash).or_default() -=
                        trade.amount.as_u256().as_u128() as i128;
                }
            }
            _ => {}
        }
    }
    assert!(ledger.values().all(|net| *net == 0));
}

#[tokio::test]
async fn s6_replay_idempotence() {
    let (dispatcher, bus) = harness().await;

    let a = limit(0x01, Side::Sell, 100, 10, 1);
    let b = limit(0x02, Side::Buy, 100, 4, 2);
    let stream = [
        BusMessage::new_order(&a).unwrap(),
        BusMessage::new_order(&b).unwrap(),
        BusMessage::cancel_order(&a).unwrap(),
    ];

    for message in stream.iter().chain(stream.iter()) {
        bus.push(message.clone()).await;
    }
    dispatcher.run().await;

    let published = bus.published();
    assert_eq!(published.len(), 6);
    let first: Vec<_> = published[..3].to_vec();
    let second: Vec<_> = published[3..].to_vec();
    assert_eq!(first, second);

    assert_eq!(first[2].status, EngineStatus::OrderCancelled);
    assert_eq!(first[2].order.filled_amount, Amount::from_u64(4));
    assert_eq!(first[2].order.remaining(), Amount::from_u64(6));
}

// ── Property tests ──────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Op {
    Place {
        sell: bool,
        market: bool,
        price: u64,
        amount: u64,
    },
    Cancel {
        target: usize,
    },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (
            any::<bool>(),
            prop::bool::weighted(0.15),
            1u64..=12,
            1u64..=10,
        )
            .prop_map(|(sell, market, price, amount)| Op::Place {
                sell,
                market,
                price,
                amount,
            }),
        1 => (0usize..64).prop_map(|target| Op::Cancel { target }),
    ]
}

/// A concrete operation against one book: the same command stream can be
/// applied any number of times, which is what "replay" means on the bus.
#[derive(Debug, Clone)]
enum Command {
    Place(Order),
    Cancel(Order),
}

/// Materialize ops into commands once, so a replayed stream carries
/// byte-identical orders (same hashes, same timestamps).
fn build_commands(ops: &[Op]) -> Vec<Command> {
    let mut placed: Vec<Order> = Vec::new();
    let mut commands = Vec::new();

    for (i, op) in ops.iter().enumerate() {
        match op {
            Op::Place {
                sell,
                market,
                price,
                amount,
            } => {
                let order = Order::new(
                    pair(),
                    Address::from([(i % 251 + 1) as u8; 20]),
                    if *sell { Side::Sell } else { Side::Buy },
                    if *market {
                        OrderType::Market
                    } else {
                        OrderType::Limit
                    },
                    if *market {
                        Price::zero()
                    } else {
                        Price::from_u64(*price)
                    },
                    Amount::from_u64(*amount),
                    i as u64,
                    i as i64,
                );
                placed.push(order.clone());
                commands.push(Command::Place(order));
            }
            Op::Cancel { target } => {
                if placed.is_empty() {
                    continue;
                }
                commands.push(Command::Cancel(placed[target % placed.len()].clone()));
            }
        }
    }
    commands
}

fn placed_orders(commands: &[Command]) -> Vec<Order> {
    commands
        .iter()
        .filter_map(|c| match c {
            Command::Place(order) => Some(order.clone()),
            Command::Cancel(_) => None,
        })
        .collect()
}

fn apply_commands(book: &mut OrderBook, commands: &[Command]) -> Vec<EngineResponse> {
    commands
        .iter()
        .map(|command| match command {
            Command::Place(order) => book.place(order.clone()),
            Command::Cancel(order) => book.cancel(order.clone()),
        })
        .collect()
}

proptest! {
    #[test]
    fn prop_book_never_crossed(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let commands = build_commands(&ops);
        let mut book = OrderBook::new(pair());
        apply_commands(&mut book, &commands);
        prop_assert!(!book.is_crossed(), "bid/ask ladders crossed");
    }

    #[test]
    fn prop_conservation_of_executed_amounts(
        ops in prop::collection::vec(op_strategy(), 1..60),
    ) {
        let commands = build_commands(&ops);
        let mut book = OrderBook::new(pair());
        let responses = apply_commands(&mut book, &commands);

        // executed amount accrues equally to both sides of every trade;
        // a trade hash counts once no matter how many responses carry it
        let mut seen_trades = std::collections::HashSet::new();
        let mut fills: HashMap<H256, u128> = HashMap::new();
        for response in &responses {
            for trade in response.trades() {
                if !seen_trades.insert(trade.hash) {
                    continue;
                }
                *fills.entry(trade.taker_order_hash).or_default() +=
                    trade.amount.as_u256().as_u128();
                *fills.entry(trade.maker_order_hash).or_default() +=
                    trade.amount.as_u256().as_u128();
            }
        }

        for order in placed_orders(&commands) {
            let executed = fills.get(&order.hash).copied().unwrap_or(0);
            prop_assert!(
                executed <= order.amount.as_u256().as_u128(),
                "order overfilled: {} > {}",
                executed,
                order.amount
            );
            if let Some(resting) = book.resting(&order.hash) {
                prop_assert_eq!(resting.filled_amount.as_u256().as_u128(), executed);
                prop_assert!(!resting.remaining().is_zero());
            }
        }
    }

    #[test]
    fn prop_trades_execute_at_maker_price(
        ops in prop::collection::vec(op_strategy(), 1..60),
    ) {
        let commands = build_commands(&ops);
        let mut book = OrderBook::new(pair());
        let responses = apply_commands(&mut book, &commands);

        let prices: HashMap<H256, Price> = placed_orders(&commands)
            .iter()
            .map(|o| (o.hash, o.price))
            .collect();

        for response in &responses {
            for trade in response.trades() {
                let maker_price = prices.get(&trade.maker_order_hash);
                prop_assert_eq!(maker_price, Some(&trade.price));
            }
        }
    }

    #[test]
    fn prop_replay_is_idempotent(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let commands = build_commands(&ops);

        let mut once = OrderBook::new(pair());
        let single = apply_commands(&mut once, &commands);

        let mut twice = OrderBook::new(pair());
        let doubled: Vec<Command> =
            commands.iter().chain(commands.iter()).cloned().collect();
        let repeated = apply_commands(&mut twice, &doubled);

        let mut expected = single.clone();
        expected.extend(single);
        prop_assert_eq!(repeated, expected);

        let a = once.snapshot(usize::MAX);
        let b = twice.snapshot(usize::MAX);
        prop_assert_eq!(a.bids, b.bids);
        prop_assert_eq!(a.asks, b.asks);
    }
}

//! Matching Engine Service
//!
//! Core of the exchange relay: consumes order-lifecycle messages from the
//! durable bus, maintains one price-time-priority order book per trading
//! pair, and publishes engine responses describing every outcome.
//!
//! **Key Invariants:**
//! - Price-time priority strictly enforced; execution at the maker's price
//! - No crossed book after a matching round
//! - One writer per book; responses published in production order
//! - Every operation idempotent keyed by order hash (at-least-once bus)

pub mod book;
pub mod dispatcher;
pub mod engine;
pub mod memory;
pub mod ports;
pub mod recovery;

pub use dispatcher::{Dispatcher, DispatcherConfig};
pub use engine::Engine;
pub use recovery::{RecoveryLoader, RecoveryReport};

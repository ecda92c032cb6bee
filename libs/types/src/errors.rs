//! Error taxonomy for the matching engine
//!
//! Domain failures inside a book become ERROR_STATUS engine responses and
//! never surface here; these types cover the edges — decoding, the book
//! registry, and the storage/bus ports.

use thiserror::Error;

/// Top-level engine error
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("payload decode failed: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("unknown pair: {0}")]
    UnknownPair(String),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    #[error("bus error: {0}")]
    Bus(#[from] BusError),
}

/// Order validation errors
///
/// These never escape the engine: the dispatcher converts them into
/// ERROR_STATUS responses and acks the message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    #[error("amount must be positive")]
    ZeroAmount,

    #[error("limit order price must be positive")]
    ZeroPrice,

    #[error("order pair {got} does not match book pair {expected}")]
    PairMismatch { expected: String, got: String },

    #[error("order arrived in terminal state {0}")]
    AlreadyTerminal(String),
}

/// Storage port errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Bus port errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BusError {
    #[error("bus unavailable: {0}")]
    Unavailable(String),

    #[error("bus closed")]
    Closed,
}

/// Chain provider errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("chain provider unavailable: {0}")]
    Unavailable(String),

    #[error("chain call failed: {0}")]
    CallFailed(String),
}

//! External ports
//!
//! Narrow interfaces to the collaborators the engine consumes: the order
//! store (recovery only), the message bus, and the chain provider.
//! Drivers live outside this crate; tests and local runs use the
//! in-memory adapters in `memory`.

use async_trait::async_trait;
use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};
use types::errors::{BusError, ChainError, StoreError};
use types::matches::Matches;
use types::order::Order;
use types::pair::Pair;
use types::response::EngineResponse;

/// Type tags on the order-lifecycle topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageKind {
    NewOrder,
    CancelOrder,
    InvalidateMakerOrders,
    InvalidateTakerOrders,
    /// Anything this engine version does not understand; logged and
    /// dropped by the dispatcher
    #[serde(other)]
    Unknown,
}

/// Envelope delivered on the order-lifecycle topic.
///
/// The payload stays raw JSON until the dispatcher knows the tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusMessage {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub payload: serde_json::Value,
}

impl BusMessage {
    pub fn new_order(order: &Order) -> Result<Self, serde_json::Error> {
        Ok(Self {
            kind: MessageKind::NewOrder,
            payload: serde_json::to_value(order)?,
        })
    }

    pub fn cancel_order(order: &Order) -> Result<Self, serde_json::Error> {
        Ok(Self {
            kind: MessageKind::CancelOrder,
            payload: serde_json::to_value(order)?,
        })
    }

    pub fn invalidate_maker_orders(matches: &Matches) -> Result<Self, serde_json::Error> {
        Ok(Self {
            kind: MessageKind::InvalidateMakerOrders,
            payload: serde_json::to_value(matches)?,
        })
    }

    pub fn invalidate_taker_orders(matches: &Matches) -> Result<Self, serde_json::Error> {
        Ok(Self {
            kind: MessageKind::InvalidateTakerOrders,
            payload: serde_json::to_value(matches)?,
        })
    }
}

/// Order persistence, consumed by recovery only. The engine never writes
/// it; the storage mirror converges by applying published responses.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Active trading pairs; called once at startup to build the book
    /// registry.
    async fn list_pairs(&self) -> Result<Vec<Pair>, StoreError>;

    /// Orders in status NEW or OPEN on a topic, in creation-timestamp
    /// order.
    async fn list_pending(&self, topic: &str) -> Result<Vec<Order>, StoreError>;
}

/// Durable message bus with at-least-once delivery.
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Next order-lifecycle message, or `None` once the stream closes.
    /// Callable from several workers; each message is delivered to one.
    async fn consume(&self) -> Result<Option<BusMessage>, BusError>;

    /// Publish one engine response on the engine-response topic.
    async fn publish_engine_response(&self, response: &EngineResponse) -> Result<(), BusError>;
}

/// On-chain state access.
///
/// Held by the engine for upstream collaborators (settlement validation
/// decides invalidation with it); the matching path never calls it.
#[async_trait]
pub trait ChainProvider: Send + Sync {
    async fn balance_of(&self, token: Address, owner: Address) -> Result<U256, ChainError>;

    async fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, ChainError>;
}

//! Order lifecycle types
//!
//! An order is identified by the keccak digest of its canonical field
//! encoding: two orders with identical content carry identical hashes,
//! which is what makes replayed bus deliveries idempotent.

use crate::numeric::{Amount, Price};
use crate::pair::Pair;
use ethers::types::{Address, H256};
use ethers::utils::keccak256;
use serde::{Deserialize, Serialize};

/// Order side (buyer or seller)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// Buy order (bid)
    Buy,
    /// Sell order (ask)
    Sell,
}

impl Side {
    /// Get the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// Order type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderType {
    /// Rests any unmatched remainder in the book at its limit price
    Limit,
    /// Matches against whatever liquidity exists; remainder is discarded
    Market,
}

/// Order status
///
/// `Filled`, `Cancelled`, `Invalidated` and `Error` are terminal: a book
/// never mutates an order again once it reaches one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Accepted by the engine, not yet matched
    New,
    /// Resting in the book with no fills
    Open,
    /// Partially matched
    PartialFilled,
    /// Completely matched (terminal)
    Filled,
    /// Cancelled by the maker (terminal)
    Cancelled,
    /// Rejected post-trade because the maker's on-chain state no longer
    /// covers it (terminal)
    Invalidated,
    /// Failed validation or processing (terminal)
    Error,
}

impl OrderStatus {
    /// Check if status is terminal (no further transitions possible)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled
                | OrderStatus::Cancelled
                | OrderStatus::Invalidated
                | OrderStatus::Error
        )
    }
}

/// A limit or market order on one trading pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub hash: H256,
    pub base_token: Address,
    pub quote_token: Address,
    /// Address of the off-chain actor that signed the order
    pub maker: Address,
    pub side: Side,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub price: Price,
    pub amount: Amount,
    pub filled_amount: Amount,
    pub status: OrderStatus,
    pub nonce: u64,
    /// Unix nanoseconds; the tie-break inside a price level
    pub created_at: i64,
}

impl Order {
    /// Create a new order with its hash derived from content.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pair: Pair,
        maker: Address,
        side: Side,
        order_type: OrderType,
        price: Price,
        amount: Amount,
        nonce: u64,
        created_at: i64,
    ) -> Self {
        let mut order = Self {
            hash: H256::zero(),
            base_token: pair.base_token,
            quote_token: pair.quote_token,
            maker,
            side,
            order_type,
            price,
            amount,
            filled_amount: Amount::zero(),
            status: OrderStatus::New,
            nonce,
            created_at,
        };
        order.hash = order.compute_hash();
        order
    }

    /// Keccak digest of the canonical field encoding.
    ///
    /// Identical content always hashes identically; the digest is the
    /// order's identity on the bus and in storage.
    pub fn compute_hash(&self) -> H256 {
        let mut bytes = Vec::with_capacity(142);
        bytes.extend_from_slice(self.base_token.as_bytes());
        bytes.extend_from_slice(self.quote_token.as_bytes());
        bytes.extend_from_slice(self.maker.as_bytes());
        bytes.push(match self.side {
            Side::Buy => 0,
            Side::Sell => 1,
        });
        bytes.push(match self.order_type {
            OrderType::Limit => 0,
            OrderType::Market => 1,
        });
        let mut word = [0u8; 32];
        self.price.as_u256().to_big_endian(&mut word);
        bytes.extend_from_slice(&word);
        self.amount.as_u256().to_big_endian(&mut word);
        bytes.extend_from_slice(&word);
        bytes.extend_from_slice(&self.nonce.to_be_bytes());
        bytes.extend_from_slice(&self.created_at.to_be_bytes());
        H256::from(keccak256(bytes))
    }

    pub fn pair(&self) -> Pair {
        Pair::new(self.base_token, self.quote_token)
    }

    pub fn pair_code(&self) -> String {
        self.pair().code()
    }

    /// Amount still unmatched
    pub fn remaining(&self) -> Amount {
        self.amount - self.filled_amount
    }

    pub fn is_filled(&self) -> bool {
        self.filled_amount == self.amount
    }

    pub fn has_fills(&self) -> bool {
        !self.filled_amount.is_zero()
    }

    /// Record a fill and advance the status.
    ///
    /// Debug builds assert the fill cannot exceed the order amount;
    /// release builds rely on callers clamping to `remaining()`.
    pub fn fill(&mut self, fill_amount: Amount) {
        let new_filled = self.filled_amount + fill_amount;
        debug_assert!(
            new_filled.as_u256() <= self.amount.as_u256(),
            "Fill would exceed order amount"
        );

        self.filled_amount = new_filled;
        self.status = if self.is_filled() {
            OrderStatus::Filled
        } else {
            OrderStatus::PartialFilled
        };
    }

    /// Time-priority key inside a price level: creation timestamp first,
    /// hash lexical order as the deterministic tie-break.
    pub fn priority_key(&self) -> (i64, H256) {
        (self.created_at, self.hash)
    }
}

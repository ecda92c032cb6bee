//! Trade execution types
//!
//! A trade records one match between an incoming taker order and a
//! resting maker order, always at the maker's price.

use crate::numeric::{Amount, Price};
use crate::order::Order;
use crate::pair::Pair;
use ethers::types::{Address, H256};
use ethers::utils::keccak256;
use serde::{Deserialize, Serialize};

/// An executed match between a taker and a maker order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub hash: H256,
    pub taker_order_hash: H256,
    pub maker_order_hash: H256,
    pub base_token: Address,
    pub quote_token: Address,
    pub maker: Address,
    pub taker: Address,
    /// Execution price: the maker's resting price
    pub price: Price,
    /// Executed amount in base units
    pub amount: Amount,
    pub executed_at: i64,
}

impl Trade {
    /// Build a trade from a matched (taker, maker) pair.
    ///
    /// `executed_at` is the taker's creation timestamp so a replayed
    /// message stream reproduces identical trades.
    pub fn from_match(taker: &Order, maker: &Order, amount: Amount) -> Self {
        let mut trade = Self {
            hash: H256::zero(),
            taker_order_hash: taker.hash,
            maker_order_hash: maker.hash,
            base_token: taker.base_token,
            quote_token: taker.quote_token,
            maker: maker.maker,
            taker: taker.maker,
            price: maker.price,
            amount,
            executed_at: taker.created_at,
        };
        trade.hash = trade.compute_hash();
        trade
    }

    /// Keccak digest of the canonical field encoding.
    pub fn compute_hash(&self) -> H256 {
        let mut bytes = Vec::with_capacity(144);
        bytes.extend_from_slice(self.taker_order_hash.as_bytes());
        bytes.extend_from_slice(self.maker_order_hash.as_bytes());
        let mut word = [0u8; 32];
        self.price.as_u256().to_big_endian(&mut word);
        bytes.extend_from_slice(&word);
        self.amount.as_u256().to_big_endian(&mut word);
        bytes.extend_from_slice(&word);
        bytes.extend_from_slice(&self.executed_at.to_be_bytes());
        H256::from(keccak256(bytes))
    }

    pub fn pair(&self) -> Pair {
        Pair::new(self.base_token, self.quote_token)
    }
}

//! Trading pair identity
//!
//! A pair is the (base token, quote token) address tuple. Its canonical
//! code keys the book registry and its derived topic scopes recovery
//! queries in storage.

use ethers::types::{Address, H256};
use ethers::utils::keccak256;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A trading pair of ERC20 token contract addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pair {
    pub base_token: Address,
    pub quote_token: Address,
}

impl Pair {
    pub fn new(base_token: Address, quote_token: Address) -> Self {
        Self {
            base_token,
            quote_token,
        }
    }

    /// Canonical pair code: `"<lowercase hex base>/<lowercase hex quote>"`.
    ///
    /// This string keys the book registry; two pairs with the same token
    /// addresses always produce the same code.
    pub fn code(&self) -> String {
        format!("{:#x}/{:#x}", self.base_token, self.quote_token)
    }

    /// Recovery topic: keccak digest of base ‖ quote, hex encoded.
    ///
    /// Opaque to the engine; storage scopes pending-order queries by it.
    pub fn topic(&self) -> String {
        let mut bytes = [0u8; 40];
        bytes[..20].copy_from_slice(self.base_token.as_bytes());
        bytes[20..].copy_from_slice(self.quote_token.as_bytes());
        format!("{:#x}", H256::from(keccak256(bytes)))
    }
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

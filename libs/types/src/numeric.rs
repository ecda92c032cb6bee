//! Integer price and amount types
//!
//! Prices are quote units per base unit, amounts are base units in the
//! smallest token denomination. Both are 256-bit unsigned integers so the
//! engine never touches floating point, and both serialize as decimal
//! strings to prevent JSON number precision loss.

use ethers::types::U256;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};
use thiserror::Error;

/// Rejected decimal-string input for a price or amount.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid decimal integer: {0}")]
pub struct InvalidNumber(String);

/// Price in quote units per base unit.
///
/// Zero is a valid value only for MARKET orders, where the field is
/// ignored during matching. Serialized as a decimal string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price(U256);

impl Price {
    pub fn new(value: U256) -> Self {
        Self(value)
    }

    pub fn zero() -> Self {
        Self(U256::zero())
    }

    /// Create from integer (for testing/convenience)
    pub fn from_u64(value: u64) -> Self {
        Self(U256::from(value))
    }

    /// Parse a decimal string
    pub fn from_dec_str(s: &str) -> Result<Self, InvalidNumber> {
        U256::from_dec_str(s)
            .map(Self)
            .map_err(|e| InvalidNumber(e.to_string()))
    }

    pub fn as_u256(&self) -> U256 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl Serialize for Price {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let value = U256::from_dec_str(&s).map_err(serde::de::Error::custom)?;
        Ok(Self(value))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Amount in base units (smallest denomination).
///
/// Serialized as a decimal string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(U256);

impl Amount {
    pub fn new(value: U256) -> Self {
        Self(value)
    }

    pub fn zero() -> Self {
        Self(U256::zero())
    }

    /// Create from integer (for testing/convenience)
    pub fn from_u64(value: u64) -> Self {
        Self(U256::from(value))
    }

    /// Parse a decimal string
    pub fn from_dec_str(s: &str) -> Result<Self, InvalidNumber> {
        U256::from_dec_str(s)
            .map(Self)
            .map_err(|e| InvalidNumber(e.to_string()))
    }

    pub fn as_u256(&self) -> U256 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn min(self, other: Self) -> Self {
        if self.0 <= other.0 {
            self
        } else {
            other
        }
    }
}

impl Add for Amount {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Amount {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        debug_assert!(self.0 >= rhs.0, "Amount subtraction would underflow");
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let value = U256::from_dec_str(&s).map_err(serde::de::Error::custom)?;
        Ok(Self(value))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

//! Non-negative arbitrary-precision integers with flexible JSON parsing.
//!
//! [`HexInteger`] is the numeric value type of the JSON surfaces: it accepts
//! `0x`-prefixed hex strings, decimal strings, and plain JSON numbers on the
//! way in, and always emits minimal `0x` hex on the way out (`0x0` for
//! zero). Negative inputs are rejected.

use core::result::Result as CoreResult;
use std::fmt;

use alloy_primitives::U256;
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::{Error, Result};

/// A non-negative integer carried as `0x`-prefixed hex in JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct HexInteger(U256);

impl HexInteger {
    /// The zero value.
    pub const ZERO: Self = Self(U256::ZERO);

    /// Wraps a [`U256`].
    #[must_use]
    pub const fn new(value: U256) -> Self {
        Self(value)
    }

    /// Parses from any of the accepted textual forms: `0x` hex or decimal.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadHexInteger`] on empty hex (`"0x"`), overflow, a
    /// leading minus sign, or malformed digits.
    pub fn from_string(s: &str) -> Result<Self> {
        if s.starts_with('-') {
            return Err(Error::BadHexInteger(format!(
                "{s}: negative values are not supported"
            )));
        }
        let parsed = if let Some(hex_digits) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))
        {
            if hex_digits.is_empty() {
                return Err(Error::BadHexInteger(format!("{s}: missing hex digits")));
            }
            U256::from_str_radix(hex_digits, 16)
        } else {
            if s.is_empty() {
                return Err(Error::BadHexInteger("empty string".to_string()));
            }
            U256::from_str_radix(s, 10)
        };
        parsed
            .map(Self)
            .map_err(|e| Error::BadHexInteger(format!("{s}: {e}")))
    }

    /// Parses from a JSON value: string (hex or decimal) or number.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadHexInteger`] for negative or fractional numbers,
    /// or any non string/number value.
    pub fn from_json(value: &Value) -> Result<Self> {
        match value {
            Value::String(s) => Self::from_string(s),
            Value::Number(n) => {
                if let Some(u) = n.as_u64() {
                    Ok(Self(U256::from(u)))
                } else if n.as_i64().is_some() {
                    Err(Error::BadHexInteger(format!(
                        "{n}: negative values are not supported"
                    )))
                } else {
                    Err(Error::BadHexInteger(format!("{n}: not an integer")))
                }
            }
            other => Err(Error::BadHexInteger(format!("unexpected JSON type {other}"))),
        }
    }

    /// Returns the minimal `0x` hex form (`0x0` for zero).
    #[must_use]
    pub fn to_hex(&self) -> String {
        format!("{:#x}", self.0)
    }

    /// Returns the wrapped [`U256`].
    #[must_use]
    pub const fn value(&self) -> U256 {
        self.0
    }

    /// Returns the minimal big-endian byte representation (empty for zero).
    ///
    /// This is the form RLP integer encoding expects.
    #[must_use]
    pub fn to_minimal_be_bytes(&self) -> Vec<u8> {
        let bytes = self.0.to_be_bytes::<32>();
        let start = bytes.iter().position(|&b| b != 0).unwrap_or(32);
        bytes[start..].to_vec()
    }

    /// Returns the value as `u64` if it fits.
    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        if self.0 <= U256::from(u64::MAX) {
            Some(self.0.to::<u64>())
        } else {
            None
        }
    }
}

impl From<u64> for HexInteger {
    fn from(value: u64) -> Self {
        Self(U256::from(value))
    }
}

impl From<U256> for HexInteger {
    fn from(value: U256) -> Self {
        Self(value)
    }
}

impl fmt::Display for HexInteger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for HexInteger {
    fn serialize<S: Serializer>(&self, serializer: S) -> CoreResult<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for HexInteger {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> CoreResult<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_json(&value).map_err(DeError::custom)
    }
}

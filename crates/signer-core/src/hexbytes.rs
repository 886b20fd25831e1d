//! Arbitrary-length byte strings with `0x`-prefixed hex JSON form.

use core::result::Result as CoreResult;
use std::fmt;
use std::ops::Deref;

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Result;

/// A byte string whose textual form is `0x`-prefixed hex.
///
/// Empty bytes serialize as `"0x"`. Input is accepted with or without the
/// prefix, any case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct HexBytes(Vec<u8>);

impl HexBytes {
    /// Creates a `HexBytes` from raw bytes.
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Parses a hex string, with or without `0x` prefix.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HexDecodeFailed`] on malformed hex.
    pub fn from_hex(s: &str) -> Result<Self> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        Ok(Self(hex::decode(stripped)?))
    }

    /// Returns the `0x`-prefixed hex form.
    #[must_use]
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.0))
    }

    /// Returns the raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consumes self, returning the raw bytes.
    #[must_use]
    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }
}

impl Deref for HexBytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for HexBytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for HexBytes {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl fmt::Display for HexBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for HexBytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> CoreResult<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for HexBytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> CoreResult<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(DeError::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_serializes_as_0x() {
        let b = HexBytes::default();
        assert_eq!(serde_json::to_string(&b).unwrap(), "\"0x\"");
    }

    #[test]
    fn hex_roundtrip() {
        let b = HexBytes::from_hex("0xdeadbeef").unwrap();
        assert_eq!(b.as_bytes(), &[0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(b.to_hex(), "0xdeadbeef");

        let no_prefix = HexBytes::from_hex("DEADBEEF").unwrap();
        assert_eq!(b, no_prefix);
    }

    #[test]
    fn json_roundtrip() {
        let b = HexBytes::from(vec![0x00, 0x01, 0xff]);
        let json = serde_json::to_string(&b).unwrap();
        assert_eq!(json, "\"0x0001ff\"");
        let back: HexBytes = serde_json::from_str(&json).unwrap();
        assert_eq!(b, back);
    }

    #[test]
    fn rejects_bad_hex() {
        assert!(HexBytes::from_hex("0xzz").is_err());
        assert!(HexBytes::from_hex("0x123").is_err());
    }
}

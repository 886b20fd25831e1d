//! Ethereum address derivation from secp256k1 public keys.
//!
//! This module provides the 20-byte [`Address`] value type. The derivation
//! process follows the standard Ethereum address computation:
//!
//! 1. Take the uncompressed public key (65 bytes: `0x04 || x || y`)
//! 2. Remove the `0x04` prefix to get 64 bytes (`x || y`)
//! 3. Compute the Keccak-256 hash of the 64 bytes
//! 4. Take the last 20 bytes of the hash as the address
//!
//! The canonical textual form is lowercase `0x`-prefixed hex. EIP-55
//! mixed-case checksums are accepted on parse (hex decoding is case
//! insensitive) but not enforced, and not emitted by default.
//!
//! # Example
//!
//! ```
//! use evm_signer_core::Address;
//!
//! let addr = Address::from_hex("0x497eedc4299dea2f2a364be10025d0ad0f702de3").unwrap();
//! assert_eq!(addr.to_hex(), "0x497eedc4299dea2f2a364be10025d0ad0f702de3");
//! ```

use core::result::Result as CoreResult;
use std::fmt;
use std::str::FromStr;

use alloy_primitives::{Address as AlloyAddress, keccak256};
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

/// An Ethereum address (20 bytes).
///
/// Wraps [`alloy_primitives::Address`] and adds the parse/emit conventions
/// this library uses on its JSON surfaces: lowercase hex out, any case in,
/// `0x` prefix optional on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address(AlloyAddress);

impl Address {
    /// The length of an Ethereum address in bytes.
    pub const BYTE_LEN: usize = 20;

    /// Creates a new address from a 20-byte array.
    #[must_use]
    pub const fn new(bytes: [u8; Self::BYTE_LEN]) -> Self {
        Self(AlloyAddress::new(bytes))
    }

    /// Returns the zero address (`0x0000...0000`).
    #[must_use]
    pub const fn zero() -> Self {
        Self(AlloyAddress::ZERO)
    }

    /// Checks if this is the zero address.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Derives an Ethereum address from raw uncompressed public key bytes.
    ///
    /// # Arguments
    ///
    /// * `bytes` - Either 65 bytes (`0x04 || x || y`) or 64 bytes (`x || y`)
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSignature`] if the byte length is not 64 or
    /// 65, or a 65-byte input does not start with `0x04`.
    pub fn from_public_key_bytes(bytes: &[u8]) -> Result<Self> {
        let pubkey_bytes = match bytes.len() {
            64 => bytes,
            65 => {
                if bytes[0] != 0x04 {
                    return Err(Error::InvalidSignature(
                        "65-byte public key must start with 0x04".to_string(),
                    ));
                }
                &bytes[1..]
            }
            len => {
                return Err(Error::InvalidSignature(format!(
                    "expected 64 or 65 public key bytes, got {len}"
                )));
            }
        };

        let hash = keccak256(pubkey_bytes);

        let mut address_bytes = [0u8; Self::BYTE_LEN];
        address_bytes.copy_from_slice(&hash[12..]);
        Ok(Self::new(address_bytes))
    }

    /// Returns the address as a byte slice.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; Self::BYTE_LEN] {
        self.0.as_ref()
    }

    /// Returns the address as a 20-byte array.
    #[must_use]
    pub const fn to_bytes(&self) -> [u8; Self::BYTE_LEN] {
        self.0.0.0
    }

    /// Returns the canonical lowercase hex form with `0x` prefix.
    #[must_use]
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.as_bytes()))
    }

    /// Returns the EIP-55 mixed-case checksum form.
    ///
    /// Accepted anywhere an address is parsed, but never required: the
    /// canonical emit of this library is [`Address::to_hex`].
    #[must_use]
    pub fn to_checksum_hex(&self) -> String {
        self.0.to_checksum(None)
    }

    /// Parses an address from a hex string, with or without `0x` prefix.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadAddress`] if the input is not 40 hex characters.
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let stripped = hex_str.strip_prefix("0x").unwrap_or(hex_str);
        let bytes =
            hex::decode(stripped).map_err(|e| Error::BadAddress(format!("{hex_str}: {e}")))?;
        if bytes.len() != Self::BYTE_LEN {
            return Err(Error::BadAddress(format!(
                "expected {} bytes, got {}",
                Self::BYTE_LEN,
                bytes.len()
            )));
        }
        let mut address_bytes = [0u8; Self::BYTE_LEN];
        address_bytes.copy_from_slice(&bytes);
        Ok(Self::new(address_bytes))
    }

    /// Returns the inner [`alloy_primitives::Address`].
    #[must_use]
    pub const fn inner(&self) -> AlloyAddress {
        self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl From<AlloyAddress> for Address {
    fn from(addr: AlloyAddress) -> Self {
        Self(addr)
    }
}

impl From<Address> for AlloyAddress {
    fn from(addr: Address) -> Self {
        addr.0
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Self::new(bytes)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> CoreResult<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> CoreResult<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(DeError::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_new() {
        let bytes = [1u8; 20];
        let addr = Address::new(bytes);
        assert_eq!(addr.as_bytes(), &bytes);
    }

    #[test]
    fn address_zero() {
        let zero = Address::zero();
        assert!(zero.is_zero());
        assert_eq!(zero.as_bytes(), &[0u8; 20]);
    }

    #[test]
    fn address_from_public_key_bytes_64() {
        let pubkey_bytes = [0u8; 64];
        let addr = Address::from_public_key_bytes(&pubkey_bytes).unwrap();

        let expected_hash = keccak256(pubkey_bytes);
        let expected_addr: [u8; 20] = expected_hash[12..].try_into().unwrap();
        assert_eq!(addr.to_bytes(), expected_addr);
    }

    #[test]
    fn address_from_public_key_bytes_65() {
        let mut pubkey_bytes = [0u8; 65];
        pubkey_bytes[0] = 0x04;

        let addr = Address::from_public_key_bytes(&pubkey_bytes).unwrap();
        let addr_64 = Address::from_public_key_bytes(&[0u8; 64]).unwrap();
        assert_eq!(addr, addr_64);
    }

    #[test]
    fn address_from_public_key_bytes_invalid_prefix() {
        let mut pubkey_bytes = [0u8; 65];
        pubkey_bytes[0] = 0x02;

        let result = Address::from_public_key_bytes(&pubkey_bytes);
        assert!(matches!(result, Err(Error::InvalidSignature(_))));
    }

    #[test]
    fn address_from_public_key_bytes_invalid_length() {
        let result = Address::from_public_key_bytes(&[0u8; 63]);
        assert!(matches!(result, Err(Error::InvalidSignature(_))));
    }

    #[test]
    fn address_hex_roundtrip() {
        let original = Address::new([0xab; 20]);
        let hex = original.to_hex();
        let recovered = Address::from_hex(&hex).unwrap();
        assert_eq!(original, recovered);
    }

    #[test]
    fn address_accepts_checksum_and_no_prefix() {
        // EIP-55 sample address, mixed case
        let addr = Address::from_hex("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed").unwrap();
        assert_eq!(addr.to_hex(), "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed");

        let no_prefix = Address::from_hex("5aaeb6053f3e94c9b9a09f33669435e7ef1beaed").unwrap();
        assert_eq!(addr, no_prefix);
    }

    #[test]
    fn address_rejects_bad_input() {
        assert!(matches!(
            Address::from_hex("0x1234"),
            Err(Error::BadAddress(_))
        ));
        assert!(matches!(
            Address::from_hex("0xzz5aaeb6053f3e94c9b9a09f33669435e7ef1be"),
            Err(Error::BadAddress(_))
        ));
    }

    #[test]
    fn address_display_is_lowercase() {
        let addr = Address::from_hex("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed").unwrap();
        assert_eq!(
            format!("{addr}"),
            "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed"
        );
    }

    #[test]
    fn address_checksum() {
        let addr = Address::from_hex("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed").unwrap();
        assert_eq!(
            addr.to_checksum_hex(),
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"
        );
    }

    #[test]
    fn address_json_roundtrip() {
        let addr = Address::new([0xcd; 20]);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"0xcdcdcdcdcdcdcdcdcdcdcdcdcdcdcdcdcdcdcdcd\"");
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(addr, back);
    }
}

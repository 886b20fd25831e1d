//! Ethereum ECDSA signature components and public key recovery.
//!
//! A [`SignatureData`] is the `(R, S, V)` triple every Ethereum signature
//! reduces to. R and S are 32-byte big-endian scalars; V encodes the
//! recovery parity plus, for EIP-155 protected payloads, the chain id
//! offset.
//!
//! # V Encoding Policy
//!
//! - Legacy unprotected: `27 + parity`
//! - EIP-155 legacy: `chain_id * 2 + 35 + parity`
//! - Typed transactions (EIP-2930/EIP-1559): raw `parity` (0/1)
//! - EIP-712: `27 + parity` (the chain id lives in the domain)

use std::fmt;

use alloy_primitives::U256;
use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, VerifyingKey};
use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::error::{Error, Result};

/// The `(R, S, V)` components of an Ethereum signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureData {
    /// The recovery value, per the policy of the signed payload shape.
    v: u64,

    /// The R scalar (32 bytes, big-endian).
    #[serde(with = "hex_bytes32")]
    r: [u8; 32],

    /// The S scalar (32 bytes, big-endian).
    #[serde(with = "hex_bytes32")]
    s: [u8; 32],
}

/// Serde helper for hex encoding/decoding 32-byte arrays.
mod hex_bytes32 {
    use hex::{decode, encode};
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub(super) fn serialize<S>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("0x{}", encode(bytes)))
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 32], D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let s = s.strip_prefix("0x").unwrap_or(&s);
        let bytes = decode(s).map_err(de::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| de::Error::custom("expected 32 bytes"))
    }
}

impl SignatureData {
    /// Creates a signature from raw components.
    #[must_use]
    pub const fn new(v: u64, r: [u8; 32], s: [u8; 32]) -> Self {
        Self { v, r, s }
    }

    /// Returns the V component.
    #[must_use]
    pub const fn v(&self) -> u64 {
        self.v
    }

    /// Returns the R component.
    #[must_use]
    pub const fn r(&self) -> &[u8; 32] {
        &self.r
    }

    /// Returns the S component.
    #[must_use]
    pub const fn s(&self) -> &[u8; 32] {
        &self.s
    }

    /// Returns R as an unsigned 256-bit integer.
    #[must_use]
    pub const fn r_u256(&self) -> U256 {
        U256::from_be_bytes(self.r)
    }

    /// Returns S as an unsigned 256-bit integer.
    #[must_use]
    pub const fn s_u256(&self) -> U256 {
        U256::from_be_bytes(self.s)
    }

    /// Returns a copy with V re-encoded for an EIP-155 protected payload.
    ///
    /// The stored V must be the raw `27 + parity` form produced by signing.
    #[must_use]
    pub const fn with_eip155_v(&self, chain_id: u64) -> Self {
        Self {
            v: chain_id * 2 + 35 + (self.v - 27),
            r: self.r,
            s: self.s,
        }
    }

    /// Returns a copy with V as the raw parity (0/1), the typed-envelope form.
    #[must_use]
    pub const fn with_parity_v(&self) -> Self {
        Self {
            v: self.v - 27,
            r: self.r,
            s: self.s,
        }
    }

    /// Extracts the recovery parity (0 or 1) for the given chain context.
    ///
    /// With `chain_id < 0`, V is read as raw parity 27/28 (the EIP-712
    /// path). With `chain_id >= 0`, V is read as either a typed-envelope
    /// parity (0/1) or `chain_id * 2 + 35 + parity` (EIP-155).
    fn parity(&self, chain_id: i64) -> Result<u8> {
        if chain_id < 0 {
            return match self.v {
                27 | 28 => Ok((self.v - 27) as u8),
                v => Err(Error::InvalidSignature(format!(
                    "V must be 27 or 28, got {v}"
                ))),
            };
        }
        match self.v {
            0 | 1 => Ok(self.v as u8),
            v => {
                let base = (chain_id as u64) * 2 + 35;
                match v.checked_sub(base) {
                    Some(parity @ (0 | 1)) => Ok(parity as u8),
                    _ => Err(Error::InvalidSignature(format!(
                        "V {v} does not match chain id {chain_id}"
                    ))),
                }
            }
        }
    }

    /// Recovers the signing address from a digest.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSignature`] when the scalars are out of range
    /// or V does not fit the chain context.
    pub fn recover(&self, digest: &[u8], chain_id: i64) -> Result<Address> {
        let parity = self.parity(chain_id)?;

        let mut scalars = [0u8; 64];
        scalars[..32].copy_from_slice(&self.r);
        scalars[32..].copy_from_slice(&self.s);
        let signature = EcdsaSignature::from_slice(&scalars)
            .map_err(|e| Error::InvalidSignature(e.to_string()))?;

        let recovery_id = RecoveryId::from_byte(parity)
            .ok_or_else(|| Error::InvalidSignature("bad recovery parity".to_string()))?;

        let verifying_key = VerifyingKey::recover_from_prehash(digest, &signature, recovery_id)
            .map_err(|e| Error::InvalidSignature(e.to_string()))?;

        let encoded = verifying_key.to_encoded_point(false);
        Address::from_public_key_bytes(encoded.as_bytes())
    }
}

impl fmt::Display for SignatureData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "r=0x{}, s=0x{}, v={}",
            hex::encode(self.r),
            hex::encode(self.s),
            self.v
        )
    }
}

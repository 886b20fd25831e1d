//! secp256k1 key pairs for Ethereum signing.
//!
//! A [`KeyPair`] owns a 32-byte private scalar together with its derived
//! 64-byte uncompressed public key and Ethereum [`Address`]. Signing
//! produces canonical low-S signatures: when the raw S lands in the upper
//! half of the curve order it is negated modulo `n` and the recovery parity
//! flipped.
//!
//! The private scalar zeroizes when the pair is dropped, so key material
//! does not outlive its owner (typically a signer-cache entry).
//!
//! # Example
//!
//! ```
//! use evm_signer_core::KeyPair;
//!
//! let keypair = KeyPair::generate().unwrap();
//! let digest = [0x42u8; 32];
//! let sig = keypair.sign(&digest).unwrap();
//! let recovered = sig.recover(digest.as_slice(), -1).unwrap();
//! assert_eq!(recovered, keypair.address());
//! ```

use std::fmt;

use k256::ecdsa::{SigningKey, VerifyingKey};
use rand::rngs::OsRng;

use crate::address::Address;
use crate::error::{Error, Result};
use crate::signature::SignatureData;

/// A secp256k1 key pair with its derived Ethereum address.
pub struct KeyPair {
    signing_key: SigningKey,
    /// Uncompressed public key without the 0x04 prefix (x || y).
    public_key: [u8; 64],
    address: Address,
}

impl KeyPair {
    /// Generates a new key pair from the platform CSPRNG.
    ///
    /// The scalar is drawn uniformly from `[1, n-1]`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SignerInternal`] if the backend rejects the
    /// generated scalar, which indicates a broken RNG.
    pub fn generate() -> Result<Self> {
        let signing_key = SigningKey::random(&mut OsRng);
        Self::from_signing_key(signing_key)
    }

    /// Builds a key pair from a raw 32-byte private scalar.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] if the bytes are zero or not below the
    /// curve order.
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self> {
        let signing_key = SigningKey::from_bytes(bytes.into()).map_err(|_| Error::InvalidKey)?;
        Self::from_signing_key(signing_key)
    }

    fn from_signing_key(signing_key: SigningKey) -> Result<Self> {
        let verifying_key = signing_key.verifying_key();
        let encoded = verifying_key.to_encoded_point(false);
        let uncompressed = encoded.as_bytes();

        let mut public_key = [0u8; 64];
        public_key.copy_from_slice(&uncompressed[1..]);

        let address = Address::from_public_key_bytes(&public_key)?;
        Ok(Self {
            signing_key,
            public_key,
            address,
        })
    }

    /// Returns the derived Ethereum address.
    #[must_use]
    pub const fn address(&self) -> Address {
        self.address
    }

    /// Returns the uncompressed public key coordinates (`x || y`, 64 bytes).
    #[must_use]
    pub const fn public_key(&self) -> &[u8; 64] {
        &self.public_key
    }

    /// Returns the private scalar as 32 big-endian bytes.
    ///
    /// Needed by the keystore write path; never log or serialize this
    /// outside an encrypted document.
    #[must_use]
    pub fn private_key_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes().into()
    }

    /// Returns the backend verifying key.
    #[must_use]
    pub fn verifying_key(&self) -> &VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Signs a 32-byte digest, producing a canonical low-S signature.
    ///
    /// The returned V is `27 + parity` (the legacy unprotected base);
    /// transaction shapes re-derive their own V encoding from the parity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SignerInternal`] on crypto backend failure.
    pub fn sign(&self, digest: &[u8; 32]) -> Result<SignatureData> {
        let (signature, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(digest)
            .map_err(|e| Error::SignerInternal(e.to_string()))?;

        // Normalize to low-S; a flipped S flips the recovery parity
        let (signature, recovery_id) = match signature.normalize_s() {
            Some(normalized) => (normalized, recovery_id.to_byte() ^ 1),
            None => (signature, recovery_id.to_byte()),
        };

        let bytes = signature.to_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..]);

        Ok(SignatureData::new(27 + u64::from(recovery_id), r, s))
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never expose the private scalar
        f.debug_struct("KeyPair")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::keccak256;

    use super::*;

    #[test]
    fn generate_derives_consistent_address() {
        let keypair = KeyPair::generate().unwrap();
        let hash = keccak256(keypair.public_key());
        assert_eq!(keypair.address().as_bytes(), &hash[12..]);
    }

    #[test]
    fn from_bytes_roundtrip() {
        let keypair = KeyPair::generate().unwrap();
        let rebuilt = KeyPair::from_bytes(&keypair.private_key_bytes()).unwrap();
        assert_eq!(keypair.address(), rebuilt.address());
        assert_eq!(keypair.public_key(), rebuilt.public_key());
    }

    #[test]
    fn from_bytes_rejects_zero_scalar() {
        assert!(matches!(
            KeyPair::from_bytes(&[0u8; 32]),
            Err(Error::InvalidKey)
        ));
    }

    #[test]
    fn known_key_address() {
        // secp256k1 scalar 1: the generator point; address is well known
        let mut one = [0u8; 32];
        one[31] = 1;
        let keypair = KeyPair::from_bytes(&one).unwrap();
        assert_eq!(
            keypair.address().to_hex(),
            "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf"
        );
    }

    #[test]
    fn sign_produces_low_s() {
        // secp256k1 order / 2
        let half_n =
            hex::decode("7fffffffffffffffffffffffffffffff5d576e7357a4501ddfe92f46681b20a0")
                .unwrap();
        let keypair = KeyPair::generate().unwrap();
        for i in 0..8u8 {
            let digest = keccak256([i]);
            let sig = keypair.sign(&digest).unwrap();
            assert!(sig.s().as_slice() <= half_n.as_slice());
            assert!(sig.v() == 27 || sig.v() == 28);
        }
    }

    #[test]
    fn sign_recover_roundtrip() {
        let keypair = KeyPair::generate().unwrap();
        let digest = keccak256(b"roundtrip");
        let sig = keypair.sign(&digest).unwrap();
        assert_eq!(sig.recover(digest.as_slice(), -1).unwrap(), keypair.address());
    }

    #[test]
    fn debug_hides_private_key() {
        let keypair = KeyPair::generate().unwrap();
        let debug = format!("{keypair:?}");
        let private_hex = hex::encode(keypair.private_key_bytes());
        assert!(!debug.contains(&private_hex));
    }
}

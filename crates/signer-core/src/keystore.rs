//! Ethereum JSON keystore (version 3) reading and writing.
//!
//! A keystore v3 document wraps a secp256k1 private scalar under a
//! password-derived key:
//!
//! 1. `DK = KDF(password)` where the KDF is scrypt or PBKDF2-HMAC-SHA256
//! 2. `mac = keccak256(DK[16..32] || ciphertext)` authenticates the password
//! 3. `plaintext = AES-128-CTR(key = DK[0..16], iv, ciphertext)` is the scalar
//!
//! Documents produced here interoperate with standard Ethereum wallet
//! exports; hex fields carry no `0x` prefix, matching the ecosystem format.
//!
//! # Example
//!
//! ```
//! use evm_signer_core::{KeyPair, keystore};
//!
//! let keypair = KeyPair::generate().unwrap();
//! let doc = keystore::KeystoreV3::encrypt_scrypt(
//!     &keypair,
//!     b"correct horse",
//!     &keystore::ScryptSpec::test_weak(),
//! )
//! .unwrap();
//!
//! let recovered = doc.decrypt(b"correct horse").unwrap();
//! assert_eq!(recovered.address(), keypair.address());
//! assert!(doc.decrypt(b"wrong").is_err());
//! ```

use aes::Aes128;
use aes::cipher::{KeyIvInit, StreamCipher};
use alloy_primitives::keccak256;
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::address::Address;
use crate::error::{Error, Result};
use crate::keypair::KeyPair;

type Aes128Ctr = ctr::Ctr128BE<Aes128>;

/// The only cipher the v3 format defines.
const CIPHER_AES_128_CTR: &str = "aes-128-ctr";
/// The only PBKDF2 PRF the v3 format defines.
const PRF_HMAC_SHA256: &str = "hmac-sha256";

/// scrypt cost parameters for the write path.
#[derive(Debug, Clone, Copy)]
pub struct ScryptSpec {
    /// CPU/memory cost; must be a power of two greater than one.
    pub n: u64,
    /// Block size.
    pub r: u32,
    /// Parallelism.
    pub p: u32,
}

impl ScryptSpec {
    /// The standard production cost (geth's default).
    #[must_use]
    pub const fn standard() -> Self {
        Self {
            n: 262_144,
            r: 8,
            p: 1,
        }
    }

    /// Deliberately weak parameters for fast tests. Never use for real keys.
    #[must_use]
    pub const fn test_weak() -> Self {
        Self { n: 1024, r: 8, p: 1 }
    }
}

impl Default for ScryptSpec {
    fn default() -> Self {
        Self::standard()
    }
}

/// A keystore v3 JSON document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeystoreV3 {
    /// Format version; always 3.
    pub version: u32,

    /// Random UUID identifying the document.
    pub id: String,

    /// The key's address as 40 hex characters, no prefix. Optional in the
    /// wild; verified against the decrypted key when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    /// The encrypted payload.
    pub crypto: CryptoSection,
}

/// The `crypto` object of a keystore document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CryptoSection {
    /// Cipher algorithm; only `aes-128-ctr` is defined.
    pub cipher: String,

    /// Hex-encoded ciphertext (the encrypted 32-byte scalar).
    pub ciphertext: String,

    /// Cipher parameters.
    pub cipherparams: CipherParams,

    /// Key derivation function: `scrypt` or `pbkdf2`.
    pub kdf: String,

    /// KDF-specific parameters.
    pub kdfparams: KdfParams,

    /// Hex-encoded `keccak256(DK[16..32] || ciphertext)`.
    pub mac: String,
}

/// Cipher parameters; AES-CTR needs only the IV.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CipherParams {
    /// Hex-encoded 16-byte initialization vector.
    pub iv: String,
}

/// KDF parameters, discriminated by shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KdfParams {
    /// scrypt parameters.
    Scrypt(ScryptKdfParams),
    /// PBKDF2 parameters.
    Pbkdf2(Pbkdf2KdfParams),
}

/// scrypt KDF parameters as they appear in the document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScryptKdfParams {
    /// CPU/memory cost.
    pub n: u64,
    /// Block size.
    pub r: u32,
    /// Parallelism.
    pub p: u32,
    /// Derived key length; at least 32.
    pub dklen: usize,
    /// Hex-encoded salt.
    pub salt: String,
}

/// PBKDF2 KDF parameters as they appear in the document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pbkdf2KdfParams {
    /// Iteration count.
    pub c: u32,
    /// Derived key length; at least 32.
    pub dklen: usize,
    /// Pseudo-random function; only `hmac-sha256` is defined.
    pub prf: String,
    /// Hex-encoded salt.
    pub salt: String,
}

impl KeystoreV3 {
    /// Parses a keystore document and decrypts it in one step.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadKeystoreFormat`] for unparseable documents, plus
    /// everything [`KeystoreV3::decrypt`] can return.
    pub fn read_wallet_file(data: &[u8], password: &[u8]) -> Result<KeyPair> {
        let doc: KeystoreV3 = serde_json::from_slice(data)
            .map_err(|e| Error::BadKeystoreFormat(e.to_string()))?;
        doc.decrypt(password)
    }

    /// Decrypts the document with the supplied password.
    ///
    /// # Errors
    ///
    /// - [`Error::BadKeystoreFormat`] for structural problems
    /// - [`Error::UnsupportedKdf`] for unknown ciphers, KDFs, or PRFs
    /// - [`Error::BadPassword`] when the MAC does not verify
    /// - [`Error::AddressMismatch`] when the document address disagrees with
    ///   the recomputed one
    pub fn decrypt(&self, password: &[u8]) -> Result<KeyPair> {
        if self.version != 3 {
            return Err(Error::BadKeystoreFormat(format!(
                "unsupported version {}",
                self.version
            )));
        }
        if self.crypto.cipher != CIPHER_AES_128_CTR {
            return Err(Error::UnsupportedKdf(self.crypto.cipher.clone()));
        }

        let iv = decode_hex_field("cipherparams.iv", &self.crypto.cipherparams.iv)?;
        if iv.len() != 16 {
            return Err(Error::BadKeystoreFormat(format!(
                "iv must be 16 bytes, got {}",
                iv.len()
            )));
        }
        let ciphertext = decode_hex_field("ciphertext", &self.crypto.ciphertext)?;
        let expected_mac = decode_hex_field("mac", &self.crypto.mac)?;

        let dk = self.derive_key(password)?;

        let mut mac_input = Vec::with_capacity(16 + ciphertext.len());
        mac_input.extend_from_slice(&dk[16..32]);
        mac_input.extend_from_slice(&ciphertext);
        let mac = keccak256(&mac_input);
        if mac.as_slice() != expected_mac.as_slice() {
            return Err(Error::BadPassword);
        }

        let mut plaintext = Zeroizing::new(ciphertext);
        let mut cipher = Aes128Ctr::new(dk[..16].into(), iv.as_slice().into());
        cipher.apply_keystream(&mut plaintext);

        let scalar: &[u8; 32] = plaintext
            .as_slice()
            .try_into()
            .map_err(|_| Error::BadKeystoreFormat("plaintext is not a 32-byte key".to_string()))?;
        let keypair = KeyPair::from_bytes(scalar)?;

        if let Some(ref addr_hex) = self.address
            && !addr_hex.is_empty()
        {
            let expected = Address::from_hex(addr_hex)?;
            if keypair.address() != expected {
                return Err(Error::AddressMismatch {
                    derived: keypair.address(),
                    expected,
                });
            }
        }

        Ok(keypair)
    }

    /// Runs the document's KDF over the password.
    fn derive_key(&self, password: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        match (self.crypto.kdf.as_str(), &self.crypto.kdfparams) {
            ("scrypt", KdfParams::Scrypt(params)) => {
                if params.dklen < 32 {
                    return Err(Error::BadKeystoreFormat(format!(
                        "dklen must be >= 32, got {}",
                        params.dklen
                    )));
                }
                if !params.n.is_power_of_two() || params.n < 2 {
                    return Err(Error::BadKeystoreFormat(format!(
                        "scrypt n must be a power of two > 1, got {}",
                        params.n
                    )));
                }
                let salt = decode_hex_field("kdfparams.salt", &params.salt)?;
                let log_n = params.n.trailing_zeros() as u8;
                let scrypt_params =
                    scrypt::Params::new(log_n, params.r, params.p, params.dklen)
                        .map_err(|e| Error::BadKeystoreFormat(format!("scrypt params: {e}")))?;
                let mut dk = Zeroizing::new(vec![0u8; params.dklen]);
                scrypt::scrypt(password, &salt, &scrypt_params, &mut dk)
                    .map_err(|e| Error::SignerInternal(format!("scrypt: {e}")))?;
                Ok(dk)
            }
            ("pbkdf2", KdfParams::Pbkdf2(params)) => {
                if params.dklen < 32 {
                    return Err(Error::BadKeystoreFormat(format!(
                        "dklen must be >= 32, got {}",
                        params.dklen
                    )));
                }
                if params.prf != PRF_HMAC_SHA256 {
                    return Err(Error::UnsupportedKdf(params.prf.clone()));
                }
                let salt = decode_hex_field("kdfparams.salt", &params.salt)?;
                let mut dk = Zeroizing::new(vec![0u8; params.dklen]);
                pbkdf2::pbkdf2_hmac::<sha2::Sha256>(password, &salt, params.c, &mut dk);
                Ok(dk)
            }
            (kdf @ ("scrypt" | "pbkdf2"), _) => Err(Error::BadKeystoreFormat(format!(
                "kdfparams do not match kdf {kdf}"
            ))),
            (kdf, _) => Err(Error::UnsupportedKdf(kdf.to_string())),
        }
    }

    /// Encrypts a key pair under scrypt, producing a fresh document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadKeystoreFormat`] for out-of-range cost
    /// parameters, or [`Error::SignerInternal`] on backend failure.
    pub fn encrypt_scrypt(
        keypair: &KeyPair,
        password: &[u8],
        spec: &ScryptSpec,
    ) -> Result<KeystoreV3> {
        if !spec.n.is_power_of_two() || spec.n < 2 {
            return Err(Error::BadKeystoreFormat(format!(
                "scrypt n must be a power of two > 1, got {}",
                spec.n
            )));
        }
        let salt = random_bytes::<32>();
        let log_n = spec.n.trailing_zeros() as u8;
        let scrypt_params = scrypt::Params::new(log_n, spec.r, spec.p, 32)
            .map_err(|e| Error::BadKeystoreFormat(format!("scrypt params: {e}")))?;
        let mut dk = Zeroizing::new([0u8; 32]);
        scrypt::scrypt(password, &salt, &scrypt_params, dk.as_mut())
            .map_err(|e| Error::SignerInternal(format!("scrypt: {e}")))?;

        let kdfparams = KdfParams::Scrypt(ScryptKdfParams {
            n: spec.n,
            r: spec.r,
            p: spec.p,
            dklen: 32,
            salt: hex::encode(salt),
        });
        Ok(Self::assemble(keypair, &dk[..], "scrypt", kdfparams))
    }

    /// Encrypts a key pair under PBKDF2-HMAC-SHA256.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SignerInternal`] on backend failure.
    pub fn encrypt_pbkdf2(keypair: &KeyPair, password: &[u8], c: u32) -> Result<KeystoreV3> {
        let salt = random_bytes::<32>();
        let mut dk = Zeroizing::new([0u8; 32]);
        pbkdf2::pbkdf2_hmac::<sha2::Sha256>(password, &salt, c, dk.as_mut());

        let kdfparams = KdfParams::Pbkdf2(Pbkdf2KdfParams {
            c,
            dklen: 32,
            prf: PRF_HMAC_SHA256.to_string(),
            salt: hex::encode(salt),
        });
        Ok(Self::assemble(keypair, &dk[..], "pbkdf2", kdfparams))
    }

    /// Builds the document body from a derived key.
    fn assemble(keypair: &KeyPair, dk: &[u8], kdf: &str, kdfparams: KdfParams) -> KeystoreV3 {
        let iv = random_bytes::<16>();

        let mut ciphertext = keypair.private_key_bytes().to_vec();
        let mut cipher = Aes128Ctr::new(dk[..16].into(), iv.as_slice().into());
        cipher.apply_keystream(&mut ciphertext);

        let mut mac_input = Vec::with_capacity(16 + ciphertext.len());
        mac_input.extend_from_slice(&dk[16..32]);
        mac_input.extend_from_slice(&ciphertext);
        let mac = keccak256(&mac_input);

        KeystoreV3 {
            version: 3,
            id: Uuid::new_v4().to_string(),
            address: Some(hex::encode(keypair.address().as_bytes())),
            crypto: CryptoSection {
                cipher: CIPHER_AES_128_CTR.to_string(),
                ciphertext: hex::encode(&ciphertext),
                cipherparams: CipherParams {
                    iv: hex::encode(iv),
                },
                kdf: kdf.to_string(),
                kdfparams,
                mac: hex::encode(mac),
            },
        }
    }

    /// Serializes the document to JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadJson`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

fn decode_hex_field(name: &str, value: &str) -> Result<Vec<u8>> {
    let stripped = value.strip_prefix("0x").unwrap_or(value);
    hex::decode(stripped).map_err(|e| Error::BadKeystoreFormat(format!("{name}: {e}")))
}

fn random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scrypt_roundtrip() {
        let keypair = KeyPair::generate().unwrap();
        let doc =
            KeystoreV3::encrypt_scrypt(&keypair, b"testpassword", &ScryptSpec::test_weak())
                .unwrap();

        assert_eq!(doc.version, 3);
        assert_eq!(doc.crypto.cipher, "aes-128-ctr");
        assert_eq!(doc.crypto.kdf, "scrypt");

        let recovered = doc.decrypt(b"testpassword").unwrap();
        assert_eq!(recovered.address(), keypair.address());
        assert_eq!(
            recovered.private_key_bytes(),
            keypair.private_key_bytes()
        );
    }

    #[test]
    fn pbkdf2_roundtrip() {
        let keypair = KeyPair::generate().unwrap();
        let doc = KeystoreV3::encrypt_pbkdf2(&keypair, b"testpassword", 1024).unwrap();
        assert_eq!(doc.crypto.kdf, "pbkdf2");

        let recovered = doc.decrypt(b"testpassword").unwrap();
        assert_eq!(recovered.address(), keypair.address());
    }

    #[test]
    fn wrong_password_is_mac_mismatch() {
        let keypair = KeyPair::generate().unwrap();
        let doc =
            KeystoreV3::encrypt_scrypt(&keypair, b"testpassword", &ScryptSpec::test_weak())
                .unwrap();
        assert!(matches!(
            doc.decrypt(b"wrongpassword"),
            Err(Error::BadPassword)
        ));
    }

    #[test]
    fn tampered_address_is_mismatch() {
        let keypair = KeyPair::generate().unwrap();
        let mut doc =
            KeystoreV3::encrypt_scrypt(&keypair, b"testpassword", &ScryptSpec::test_weak())
                .unwrap();
        doc.address = Some("497eedc4299dea2f2a364be10025d0ad0f702de3".to_string());
        assert!(matches!(
            doc.decrypt(b"testpassword"),
            Err(Error::AddressMismatch { .. })
        ));
    }

    #[test]
    fn missing_address_is_accepted() {
        let keypair = KeyPair::generate().unwrap();
        let mut doc =
            KeystoreV3::encrypt_scrypt(&keypair, b"testpassword", &ScryptSpec::test_weak())
                .unwrap();
        doc.address = None;
        let recovered = doc.decrypt(b"testpassword").unwrap();
        assert_eq!(recovered.address(), keypair.address());
    }

    #[test]
    fn json_roundtrip_interop_shape() {
        let keypair = KeyPair::generate().unwrap();
        let doc = KeystoreV3::encrypt_pbkdf2(&keypair, b"pw", 64).unwrap();
        let json = doc.to_json().unwrap();

        // Hex fields carry no 0x prefix in the interop format
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let ciphertext = value["crypto"]["ciphertext"].as_str().unwrap();
        assert!(!ciphertext.starts_with("0x"));
        assert_eq!(value["crypto"]["kdfparams"]["prf"], "hmac-sha256");

        let recovered = KeystoreV3::read_wallet_file(json.as_bytes(), b"pw").unwrap();
        assert_eq!(recovered.address(), keypair.address());
    }

    #[test]
    fn unsupported_kdf_rejected() {
        let keypair = KeyPair::generate().unwrap();
        let mut doc = KeystoreV3::encrypt_pbkdf2(&keypair, b"pw", 64).unwrap();
        doc.crypto.kdf = "argon2id".to_string();
        assert!(matches!(
            doc.decrypt(b"pw"),
            Err(Error::UnsupportedKdf(_))
        ));
    }

    #[test]
    fn non_power_of_two_scrypt_n_rejected() {
        let keypair = KeyPair::generate().unwrap();
        let result = KeystoreV3::encrypt_scrypt(
            &keypair,
            b"pw",
            &ScryptSpec { n: 1000, r: 8, p: 1 },
        );
        assert!(matches!(result, Err(Error::BadKeystoreFormat(_))));
    }

    #[test]
    fn malformed_document_rejected() {
        assert!(matches!(
            KeystoreV3::read_wallet_file(b"{not json", b"pw"),
            Err(Error::BadKeystoreFormat(_))
        ));
        assert!(matches!(
            KeystoreV3::read_wallet_file(b"{\"version\":2}", b"pw"),
            Err(Error::BadKeystoreFormat(_))
        ));
    }
}

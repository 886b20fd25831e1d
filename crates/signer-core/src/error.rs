//! Error types for the Ethereum signing core.
//!
//! This module provides a single error type [`enum@Error`] covering every
//! failure mode of the signing pipeline: value parsing, the RLP codec,
//! keystore decryption, EIP-712 hashing, and signature production.
//!
//! # Error Categories
//!
//! - **Input errors**: malformed addresses, hex integers, and JSON documents
//! - **Codec errors**: non-canonical or truncated RLP
//! - **Keystore errors**: unsupported KDFs, MAC mismatches, address mismatches
//! - **Typed-data errors**: unknown types, field/type disagreements
//! - **Signing errors**: invalid key material and crypto backend failures

use core::result::Result as CoreResult;

use hex::FromHexError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

use crate::address::Address;

/// The main error type for the Ethereum signing core.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    // =========================================================================
    // Input Errors
    // =========================================================================
    /// The input is not a valid 20-byte Ethereum address.
    #[error("bad address: {0}")]
    BadAddress(String),

    /// The input could not be parsed as a non-negative integer.
    #[error("unable to parse integer: {0}")]
    BadHexInteger(String),

    /// JSON serialization or deserialization failed.
    #[error("bad JSON: {0}")]
    BadJson(String),

    /// Failed to parse hex data.
    #[error("hex decoding failed: {0}")]
    HexDecodeFailed(String),

    // =========================================================================
    // RLP Codec Errors
    // =========================================================================
    /// The RLP input ended before the declared length was satisfied.
    #[error("RLP data truncated")]
    RlpTruncated,

    /// An RLP length header was not the minimal encoding of its value.
    #[error("non-minimal RLP length encoding")]
    RlpNonMinimalLength,

    /// An RLP integer carried leading zero bytes.
    #[error("non-minimal RLP integer encoding")]
    RlpNonMinimalInteger,

    /// An RLP length header exceeds addressable memory.
    #[error("RLP length overflow")]
    RlpOverflow,

    /// The decoded RLP item was not of the expected variant.
    #[error("unexpected RLP item: expected {0}")]
    RlpUnexpectedItem(&'static str),

    // =========================================================================
    // Keystore Errors
    // =========================================================================
    /// The keystore document is structurally invalid.
    #[error("bad keystore v3 format: {0}")]
    BadKeystoreFormat(String),

    /// The keystore names a KDF or cipher this implementation does not support.
    #[error("unsupported keystore KDF or cipher: {0}")]
    UnsupportedKdf(String),

    /// The derived MAC did not match the document MAC.
    #[error("invalid password provided (MAC mismatch)")]
    BadPassword,

    /// The recomputed address disagrees with the expected address.
    #[error("address mismatch: derived {derived}, expected {expected}")]
    AddressMismatch {
        /// Address recomputed from the decrypted key.
        derived: Address,
        /// Address the caller (or the keystore document) expected.
        expected: Address,
    },

    // =========================================================================
    // EIP-712 Errors
    // =========================================================================
    /// A referenced struct type is absent from the `types` map.
    #[error("undefined type in EIP-712 data: {0}")]
    UnknownType(String),

    /// An array type suffix could not be parsed.
    #[error("bad EIP-712 array type: {0}")]
    BadArrayType(String),

    /// An atomic type name is outside the EIP-712 grammar.
    #[error("bad EIP-712 atomic type: {0}")]
    BadAtomic(String),

    /// A message value does not conform to its declared field type.
    #[error("value does not match field type {field_type}: {detail}")]
    FieldTypeMismatch {
        /// The declared field type.
        field_type: String,
        /// What went wrong.
        detail: String,
    },

    // =========================================================================
    // Signing Errors
    // =========================================================================
    /// The private key bytes are not a valid secp256k1 scalar.
    #[error("invalid private key")]
    InvalidKey,

    /// The signature components are invalid or unrecoverable.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    /// The crypto backend failed internally.
    #[error("signer internal error: {0}")]
    SignerInternal(String),

    // =========================================================================
    // Wallet Errors
    // =========================================================================
    /// No key material is mapped for the requested address.
    #[error("wallet does not contain key for address {0}")]
    WalletNotAvailable(Address),

    /// The wallet holds a mapping for the address but could not use it.
    #[error("wallet failed to load key for address {0}")]
    WalletFailed(Address),

    /// The configured filename pattern is not a usable regular expression.
    #[error("bad regular expression: {0}")]
    BadRegex(String),

    /// A metadata path template failed to parse or resolve.
    #[error("bad template: {0}")]
    BadTemplate(String),

    /// The wallet directory could not be listed.
    #[error("failed to read directory {path}: {detail}")]
    ReadDirFailed {
        /// The directory that was being listed.
        path: String,
        /// The underlying I/O failure.
        detail: String,
    },
}

impl From<FromHexError> for Error {
    fn from(err: FromHexError) -> Self {
        Error::HexDecodeFailed(err.to_string())
    }
}

impl From<SerdeJsonError> for Error {
    fn from(err: SerdeJsonError) -> Self {
        Error::BadJson(err.to_string())
    }
}

/// A specialized [`Result`] type for signing-core operations.
pub type Result<T> = CoreResult<T, Error>;

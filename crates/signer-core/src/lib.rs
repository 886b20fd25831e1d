//! Ethereum Signing Core Library
//!
//! This crate provides the cryptographic and encoding primitives of an
//! Ethereum-compatible signing service: secp256k1 key management, keystore
//! v3 files, the RLP codec, EIP-712 typed-data hashing, and transaction
//! signing for legacy, EIP-155, EIP-2930 and EIP-1559 payloads.
//!
//! # Overview
//!
//! This library provides:
//!
//! - **Value Types**: [`Address`], [`HexBytes`] and [`HexInteger`] with the
//!   textual round-trips Ethereum JSON surfaces expect
//! - **Keys**: [`KeyPair`] generation, keystore v3 load/store, address
//!   derivation
//! - **RLP**: a canonical [`rlp`] codec for byte strings and nested lists
//! - **EIP-712**: schema-driven structured-data hashing and signing
//! - **Transactions**: payload construction and signing across all four
//!   envelope shapes
//! - **Wallet Capability**: the [`Wallet`] trait higher layers sign through
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Wallet Capability                        │
//! │        (MemoryWallet here, filesystem wallet elsewhere)      │
//! ├──────────────┬───────────────┬──────────────────────────────┤
//! │ Transaction  │    EIP-712    │        Keystore V3           │
//! │   Signing    │    Hashing    │   (scrypt/PBKDF2 + AES-CTR)  │
//! ├──────────────┴───────────────┴──────────────────────────────┤
//! │        RLP Codec   │   secp256k1   │   Value Types          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ## Signing a Transaction
//!
//! ```rust
//! use evm_signer_core::{KeyPair, Transaction};
//!
//! let keypair = KeyPair::generate().unwrap();
//! let tx: Transaction = serde_json::from_str(
//!     r#"{
//!         "nonce": "0x0",
//!         "maxPriorityFeePerGas": "0x3b9aca00",
//!         "maxFeePerGas": "0x174876e800",
//!         "gas": "0x5208",
//!         "to": "0x497eedc4299dea2f2a364be10025d0ad0f702de3",
//!         "value": "0x0",
//!         "data": "0x"
//!     }"#,
//! )
//! .unwrap();
//!
//! let raw = tx.sign(&keypair, 1).unwrap();
//! assert_eq!(raw[0], 0x02); // EIP-1559 envelope
//! ```
//!
//! ## Loading a Keystore File
//!
//! ```rust
//! use evm_signer_core::{KeyPair, keystore::{KeystoreV3, ScryptSpec}};
//!
//! let keypair = KeyPair::generate().unwrap();
//! let doc = KeystoreV3::encrypt_scrypt(&keypair, b"pass", &ScryptSpec::test_weak()).unwrap();
//! let json = doc.to_json().unwrap();
//!
//! let loaded = KeystoreV3::read_wallet_file(json.as_bytes(), b"pass").unwrap();
//! assert_eq!(loaded.address(), keypair.address());
//! ```
//!
//! ## Hashing Typed Data
//!
//! ```rust
//! use evm_signer_core::eip712::TypedData;
//! use serde_json::json;
//!
//! let payload: TypedData = serde_json::from_value(json!({
//!     "types": {
//!         "Transfer": [
//!             {"name": "to", "type": "address"},
//!             {"name": "amount", "type": "uint256"}
//!         ]
//!     },
//!     "primaryType": "Transfer",
//!     "domain": {"name": "My DApp", "chainId": 1},
//!     "message": {
//!         "to": "0x0000000000000000000000000000000000000001",
//!         "amount": "1000000000000000000"
//!     }
//! }))
//! .unwrap();
//!
//! let digest = payload.signing_hash().unwrap();
//! ```
//!
//! # Security Considerations
//!
//! - Private scalars zeroize on drop and are never logged or serialized in
//!   the clear
//! - Signatures are normalized to low-S form to prevent malleability
//! - Keystore MACs are verified before any decryption output is used

// Modules
pub mod address;
pub mod eip712;
pub mod error;
pub mod hexbytes;
pub mod hexint;
pub mod keypair;
pub mod keystore;
pub mod rlp;
pub mod signature;
pub mod transaction;
pub mod wallet;

// Re-exports for convenience
pub use address::Address;
pub use eip712::{TypedData, encode_typed_data_v4, sign_typed_data_v4};
pub use error::{Error, Result};
pub use hexbytes::HexBytes;
pub use hexint::HexInteger;
pub use keypair::KeyPair;
pub use keystore::KeystoreV3;
pub use signature::SignatureData;
pub use transaction::{AccessListEntry, Transaction, TransactionShape};
pub use wallet::{MemoryWallet, Wallet};

// Re-export commonly used alloy types
pub use alloy_primitives::{B256, U256, keccak256};

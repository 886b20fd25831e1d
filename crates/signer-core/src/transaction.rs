//! Ethereum transaction payload construction and signing.
//!
//! A single [`Transaction`] record covers every supported envelope; the
//! shape signed is derived from which fee fields are present:
//!
//! - `max_fee_per_gas`/`max_priority_fee_per_gas` set ⇒ **EIP-1559** (type 2)
//! - else `access_list` set ⇒ **EIP-2930** (type 1)
//! - else `chain_id > 0` ⇒ **EIP-155** protected legacy
//! - else ⇒ unprotected legacy
//!
//! # Signing Flow
//!
//! 1. Build the transaction (typically parsed from JSON)
//! 2. [`Transaction::signing_hash`] gives the digest for the chain id
//! 3. [`Transaction::sign`] signs and assembles the wire bytes, applying
//!    the V encoding of the selected shape
//!
//! # Example
//!
//! ```
//! use evm_signer_core::{KeyPair, Transaction};
//!
//! let tx: Transaction = serde_json::from_str(
//!     r#"{
//!         "nonce": "0x1",
//!         "gasPrice": "0x3b9aca00",
//!         "gas": "0x5208",
//!         "to": "0x497eedc4299dea2f2a364be10025d0ad0f702de3",
//!         "value": "0xde0b6b3a7640000",
//!         "data": "0x"
//!     }"#,
//! )
//! .unwrap();
//!
//! let keypair = KeyPair::generate().unwrap();
//! let raw = tx.sign(&keypair, 1).unwrap();
//! assert!(!raw.is_empty());
//! ```

use alloy_primitives::{B256, U256, keccak256};
use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::error::{Error, Result};
use crate::hexbytes::HexBytes;
use crate::hexint::HexInteger;
use crate::keypair::KeyPair;
use crate::rlp::{self, Item};
use crate::signature::SignatureData;

/// EIP-2930 envelope type byte.
const TX_TYPE_EIP2930: u8 = 0x01;
/// EIP-1559 envelope type byte.
const TX_TYPE_EIP1559: u8 = 0x02;

/// An access list entry for EIP-2930/EIP-1559 transactions.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessListEntry {
    /// The address being accessed.
    pub address: Address,

    /// The 32-byte storage keys accessed at this address.
    #[serde(default)]
    pub storage_keys: Vec<HexBytes>,
}

/// The envelope a transaction will be signed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionShape {
    /// Unprotected legacy (V = 27/28).
    Legacy,
    /// EIP-155 protected legacy (V folds in the chain id).
    Eip155,
    /// Type 1, access-list envelope (V = 0/1).
    Eip2930,
    /// Type 2, dynamic-fee envelope (V = 0/1).
    Eip1559,
}

/// An Ethereum transaction awaiting signature.
///
/// Absent `to` means contract creation. `from` is not part of any signed
/// payload; wallets use it to select key material.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Transaction {
    /// The sender address; used for key selection only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,

    /// The account nonce.
    pub nonce: HexInteger,

    /// Gas price for legacy and EIP-2930 shapes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<HexInteger>,

    /// Priority fee (tip) for the EIP-1559 shape.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_priority_fee_per_gas: Option<HexInteger>,

    /// Fee ceiling for the EIP-1559 shape.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_fee_per_gas: Option<HexInteger>,

    /// The gas limit.
    #[serde(rename = "gas")]
    pub gas_limit: HexInteger,

    /// The recipient, or `None` for contract creation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,

    /// The value transferred in wei.
    pub value: HexInteger,

    /// The call data.
    pub data: HexBytes,

    /// The optional access list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_list: Option<Vec<AccessListEntry>>,
}

impl Transaction {
    /// Parses a transaction from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadJson`] if parsing fails.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serializes the transaction to JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadJson`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Determines the envelope this transaction signs under.
    #[must_use]
    pub fn shape(&self, chain_id: i64) -> TransactionShape {
        if self.max_fee_per_gas.is_some() || self.max_priority_fee_per_gas.is_some() {
            TransactionShape::Eip1559
        } else if self.access_list.is_some() {
            TransactionShape::Eip2930
        } else if chain_id > 0 {
            TransactionShape::Eip155
        } else {
            TransactionShape::Legacy
        }
    }

    /// Builds the exact byte string that gets hashed for signing, including
    /// the envelope type prefix for typed transactions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SignerInternal`] when a typed envelope is requested
    /// without a usable chain id.
    pub fn signing_payload(&self, chain_id: i64) -> Result<Vec<u8>> {
        match self.shape(chain_id) {
            TransactionShape::Legacy => Ok(rlp::encode(&Item::List(self.legacy_fields()))),
            TransactionShape::Eip155 => {
                let mut fields = self.legacy_fields();
                fields.push(Item::from_uint(U256::from(chain_id as u64)));
                fields.push(Item::empty());
                fields.push(Item::empty());
                Ok(rlp::encode(&Item::List(fields)))
            }
            TransactionShape::Eip2930 => {
                let fields = self.eip2930_fields(require_chain_id(chain_id)?);
                Ok(prefixed(TX_TYPE_EIP2930, &rlp::encode(&Item::List(fields))))
            }
            TransactionShape::Eip1559 => {
                let fields = self.eip1559_fields(require_chain_id(chain_id)?);
                Ok(prefixed(TX_TYPE_EIP1559, &rlp::encode(&Item::List(fields))))
            }
        }
    }

    /// The 32-byte digest to sign for the given chain id.
    ///
    /// # Errors
    ///
    /// See [`Transaction::signing_payload`].
    pub fn signing_hash(&self, chain_id: i64) -> Result<B256> {
        Ok(keccak256(self.signing_payload(chain_id)?))
    }

    /// Signs the transaction and assembles the raw wire bytes.
    ///
    /// # Errors
    ///
    /// Payload errors per [`Transaction::signing_payload`] plus
    /// [`Error::SignerInternal`] from the crypto backend.
    pub fn sign(&self, keypair: &KeyPair, chain_id: i64) -> Result<Vec<u8>> {
        let digest = self.signing_hash(chain_id)?;
        let sig = keypair.sign(&digest)?;
        self.assemble(chain_id, &sig)
    }

    /// Splices a signature into the final wire encoding.
    fn assemble(&self, chain_id: i64, sig: &SignatureData) -> Result<Vec<u8>> {
        match self.shape(chain_id) {
            TransactionShape::Legacy => {
                let mut fields = self.legacy_fields();
                push_signature(&mut fields, sig);
                Ok(rlp::encode(&Item::List(fields)))
            }
            TransactionShape::Eip155 => {
                let mut fields = self.legacy_fields();
                push_signature(&mut fields, &sig.with_eip155_v(chain_id as u64));
                Ok(rlp::encode(&Item::List(fields)))
            }
            TransactionShape::Eip2930 => {
                let mut fields = self.eip2930_fields(require_chain_id(chain_id)?);
                push_signature(&mut fields, &sig.with_parity_v());
                Ok(prefixed(TX_TYPE_EIP2930, &rlp::encode(&Item::List(fields))))
            }
            TransactionShape::Eip1559 => {
                let mut fields = self.eip1559_fields(require_chain_id(chain_id)?);
                push_signature(&mut fields, &sig.with_parity_v());
                Ok(prefixed(TX_TYPE_EIP1559, &rlp::encode(&Item::List(fields))))
            }
        }
    }

    /// `[nonce, gasPrice, gas, to, value, data]`
    fn legacy_fields(&self) -> Vec<Item> {
        vec![
            uint_item(self.nonce),
            uint_item(self.gas_price.unwrap_or_default()),
            uint_item(self.gas_limit),
            address_item(&self.to),
            uint_item(self.value),
            Item::Bytes(self.data.as_bytes().to_vec()),
        ]
    }

    /// `[chainId, nonce, gasPrice, gas, to, value, data, accessList]`
    fn eip2930_fields(&self, chain_id: u64) -> Vec<Item> {
        vec![
            Item::from_uint(U256::from(chain_id)),
            uint_item(self.nonce),
            uint_item(self.gas_price.unwrap_or_default()),
            uint_item(self.gas_limit),
            address_item(&self.to),
            uint_item(self.value),
            Item::Bytes(self.data.as_bytes().to_vec()),
            access_list_item(self.access_list.as_deref().unwrap_or_default()),
        ]
    }

    /// `[chainId, nonce, maxPriorityFeePerGas, maxFeePerGas, gas, to, value,
    /// data, accessList]`
    fn eip1559_fields(&self, chain_id: u64) -> Vec<Item> {
        vec![
            Item::from_uint(U256::from(chain_id)),
            uint_item(self.nonce),
            uint_item(self.max_priority_fee_per_gas.unwrap_or_default()),
            uint_item(self.max_fee_per_gas.unwrap_or_default()),
            uint_item(self.gas_limit),
            address_item(&self.to),
            uint_item(self.value),
            Item::Bytes(self.data.as_bytes().to_vec()),
            access_list_item(self.access_list.as_deref().unwrap_or_default()),
        ]
    }
}

fn require_chain_id(chain_id: i64) -> Result<u64> {
    u64::try_from(chain_id).map_err(|_| {
        Error::SignerInternal(format!(
            "typed transactions require a non-negative chain id, got {chain_id}"
        ))
    })
}

fn uint_item(value: HexInteger) -> Item {
    Item::from_uint(value.value())
}

fn address_item(to: &Option<Address>) -> Item {
    match to {
        Some(addr) => Item::Bytes(addr.as_bytes().to_vec()),
        None => Item::empty(),
    }
}

fn access_list_item(entries: &[AccessListEntry]) -> Item {
    Item::List(
        entries
            .iter()
            .map(|entry| {
                Item::List(vec![
                    Item::Bytes(entry.address.as_bytes().to_vec()),
                    Item::List(
                        entry
                            .storage_keys
                            .iter()
                            .map(|key| Item::Bytes(key.as_bytes().to_vec()))
                            .collect(),
                    ),
                ])
            })
            .collect(),
    )
}

fn push_signature(fields: &mut Vec<Item>, sig: &SignatureData) {
    fields.push(Item::from_uint(U256::from(sig.v())));
    fields.push(Item::from_uint(sig.r_u256()));
    fields.push(Item::from_uint(sig.s_u256()));
}

fn prefixed(tx_type: u8, rlp_bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(1 + rlp_bytes.len());
    out.push(tx_type);
    out.extend_from_slice(rlp_bytes);
    out
}

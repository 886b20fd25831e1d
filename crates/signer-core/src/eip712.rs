//! EIP-712 typed structured data hashing and signing.
//!
//! This module implements [EIP-712] for hashing typed structured data,
//! enabling human-readable signing of structured messages.
//!
//! # Hash Computation
//!
//! The final digest is:
//!
//! ```text
//! keccak256("\x19\x01" || domainSeparator || hashStruct(primaryType, message))
//! ```
//!
//! When `primaryType` is `EIP712Domain` itself, the domain separator is the
//! whole payload and the digest is `keccak256("\x19\x01" || domainSeparator)`.
//!
//! Type encoding walks the schema recursively: the primary type's fragment
//! is followed by the fragments of every transitively referenced struct
//! type, each exactly once, sorted alphabetically. Fields missing from the
//! message encode as the zero value of their declared type.
//!
//! # Example
//!
//! ```
//! use evm_signer_core::eip712::TypedData;
//! use serde_json::json;
//!
//! let typed_data: TypedData = serde_json::from_value(json!({
//!     "types": {
//!         "Person": [
//!             {"name": "name", "type": "string"},
//!             {"name": "wallet", "type": "address"}
//!         ]
//!     },
//!     "primaryType": "Person",
//!     "domain": {"name": "My DApp", "version": "1", "chainId": 1},
//!     "message": {
//!         "name": "Alice",
//!         "wallet": "0x0000000000000000000000000000000000000001"
//!     }
//! }))
//! .unwrap();
//!
//! let digest = typed_data.signing_hash().unwrap();
//! assert!(!digest.is_zero());
//! ```
//!
//! [EIP-712]: https://eips.ethereum.org/EIPS/eip-712

use std::borrow::Cow;
use std::collections::{BTreeSet, HashMap};

use alloy_primitives::{B256, U256, keccak256};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::address::Address;
use crate::error::{Error, Result};
use crate::hexint::HexInteger;
use crate::keypair::KeyPair;
use crate::rlp::{self, Item};

/// The reserved domain type name.
pub const EIP712_DOMAIN: &str = "EIP712Domain";

/// A single field descriptor inside a type definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeField {
    /// The field name.
    pub name: String,

    /// The field type (e.g. `string`, `uint256`, `Person`, `address[]`).
    #[serde(rename = "type")]
    pub field_type: String,
}

/// Typed structured data for EIP-712 signing.
///
/// `domain` and `message` stay as raw JSON values: the schema in `types`
/// drives their interpretation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TypedData {
    /// Type definitions: name to ordered field list.
    pub types: HashMap<String, Vec<TypeField>>,

    /// The primary type being signed; empty means `EIP712Domain`.
    pub primary_type: String,

    /// Values for the `EIP712Domain` fields.
    pub domain: Value,

    /// Values for the primary type's fields.
    pub message: Value,
}

impl TypedData {
    /// Computes the EIP-712 digest for this payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownType`], [`Error::BadArrayType`],
    /// [`Error::BadAtomic`], or [`Error::FieldTypeMismatch`] for schema or
    /// value problems.
    pub fn signing_hash(&self) -> Result<B256> {
        let domain_separator = self.hash_struct(EIP712_DOMAIN, &self.domain)?;

        let primary_type = if self.primary_type.is_empty() {
            EIP712_DOMAIN
        } else {
            self.primary_type.as_str()
        };

        let mut data = Vec::with_capacity(2 + 32 + 32);
        data.extend_from_slice(&[0x19, 0x01]);
        data.extend_from_slice(domain_separator.as_slice());
        if primary_type != EIP712_DOMAIN {
            let struct_hash = self.hash_struct(primary_type, &self.message)?;
            data.extend_from_slice(struct_hash.as_slice());
        }

        Ok(keccak256(&data))
    }

    /// Computes the domain separator: `hashStruct(EIP712Domain, domain)`.
    ///
    /// # Errors
    ///
    /// Same error set as [`TypedData::signing_hash`].
    pub fn domain_separator(&self) -> Result<B256> {
        self.hash_struct(EIP712_DOMAIN, &self.domain)
    }

    /// Computes `hashStruct(type, value) = keccak256(typeHash || encodeData)`.
    pub(crate) fn hash_struct(&self, type_name: &str, data: &Value) -> Result<B256> {
        let type_hash = self.type_hash(type_name)?;
        let encoded_data = self.encode_data(type_name, data)?;

        let mut buf = Vec::with_capacity(32 + encoded_data.len());
        buf.extend_from_slice(type_hash.as_slice());
        buf.extend_from_slice(&encoded_data);

        Ok(keccak256(&buf))
    }

    /// Computes `typeHash = keccak256(encodeType(type))`.
    fn type_hash(&self, type_name: &str) -> Result<B256> {
        let type_string = self.encode_type(type_name)?;
        Ok(keccak256(type_string.as_bytes()))
    }

    /// Encodes the type definition: the primary fragment immediately
    /// followed by the fragments of every transitively referenced struct
    /// type, sorted alphabetically, each exactly once.
    pub(crate) fn encode_type(&self, type_name: &str) -> Result<String> {
        let mut referenced = BTreeSet::new();
        self.collect_referenced_types(type_name, &mut referenced)?;
        referenced.remove(type_name);

        let mut result = self.type_fragment(type_name)?;
        for ref_type in &referenced {
            result.push_str(&self.type_fragment(ref_type)?);
        }
        Ok(result)
    }

    /// One `Name(type1 name1,type2 name2)` fragment.
    fn type_fragment(&self, type_name: &str) -> Result<String> {
        let fields = self.fields_of(type_name)?;
        let field_strings: Vec<String> = fields
            .iter()
            .map(|f| format!("{} {}", f.field_type, f.name))
            .collect();
        Ok(format!("{type_name}({})", field_strings.join(",")))
    }

    /// Walks the schema accumulating struct types reachable from `type_name`.
    fn collect_referenced_types(&self, type_name: &str, seen: &mut BTreeSet<String>) -> Result<()> {
        if !seen.insert(type_name.to_string()) {
            return Ok(());
        }
        let fields = self.fields_of(type_name)?.into_owned();
        for field in fields {
            let base = strip_array_suffixes(&field.field_type)?;
            if self.is_struct_type(base) {
                self.collect_referenced_types(base, seen)?;
            }
        }
        Ok(())
    }

    fn is_struct_type(&self, name: &str) -> bool {
        self.types.contains_key(name) || name == EIP712_DOMAIN
    }

    /// Resolves a type's field list. `EIP712Domain` falls back to a
    /// definition synthesized from the domain fields actually present, in
    /// declaration order `name, version, chainId, verifyingContract, salt`.
    fn fields_of(&self, type_name: &str) -> Result<Cow<'_, [TypeField]>> {
        if let Some(fields) = self.types.get(type_name) {
            return Ok(Cow::Borrowed(fields));
        }
        if type_name == EIP712_DOMAIN {
            return Ok(Cow::Owned(self.default_domain_fields()));
        }
        Err(Error::UnknownType(type_name.to_string()))
    }

    fn default_domain_fields(&self) -> Vec<TypeField> {
        const DOMAIN_FIELDS: [(&str, &str); 5] = [
            ("name", "string"),
            ("version", "string"),
            ("chainId", "uint256"),
            ("verifyingContract", "address"),
            ("salt", "bytes32"),
        ];

        let empty = serde_json::Map::new();
        let domain = self.domain.as_object().unwrap_or(&empty);
        DOMAIN_FIELDS
            .iter()
            .filter(|(name, _)| domain.contains_key(*name))
            .map(|(name, field_type)| TypeField {
                name: (*name).to_string(),
                field_type: (*field_type).to_string(),
            })
            .collect()
    }

    /// Concatenates the 32-byte encodings of every declared field.
    fn encode_data(&self, type_name: &str, data: &Value) -> Result<Vec<u8>> {
        let fields = self.fields_of(type_name)?.into_owned();

        let obj = match data {
            Value::Object(map) => Cow::Borrowed(map),
            Value::Null => Cow::Owned(serde_json::Map::new()),
            other => {
                return Err(Error::FieldTypeMismatch {
                    field_type: type_name.to_string(),
                    detail: format!("expected object, got {other}"),
                });
            }
        };

        let mut encoded = Vec::with_capacity(32 * fields.len());
        for field in &fields {
            let value = obj.get(&field.name).unwrap_or(&Value::Null);
            let field_encoded = self.encode_value(&field.field_type, value)?;
            encoded.extend_from_slice(&field_encoded);
        }
        Ok(encoded)
    }

    /// Encodes a single value to its 32-byte form.
    fn encode_value(&self, field_type: &str, value: &Value) -> Result<[u8; 32]> {
        if let Some((element_type, fixed_len)) = parse_array_type(field_type)? {
            return self.encode_array(field_type, element_type, fixed_len, value);
        }

        if self.is_struct_type(field_type) {
            let hash = self.hash_struct(field_type, value)?;
            return Ok(hash.0);
        }

        encode_atomic(field_type, value)
    }

    fn encode_array(
        &self,
        field_type: &str,
        element_type: &str,
        fixed_len: Option<usize>,
        value: &Value,
    ) -> Result<[u8; 32]> {
        static EMPTY: Vec<Value> = Vec::new();
        let elements = match value {
            Value::Array(elements) => elements,
            Value::Null => &EMPTY,
            other => {
                return Err(Error::FieldTypeMismatch {
                    field_type: field_type.to_string(),
                    detail: format!("expected array, got {other}"),
                });
            }
        };

        if let Some(expected) = fixed_len
            && elements.len() != expected
        {
            return Err(Error::FieldTypeMismatch {
                field_type: field_type.to_string(),
                detail: format!("expected {expected} elements, got {}", elements.len()),
            });
        }

        let mut concatenated = Vec::with_capacity(32 * elements.len());
        for element in elements {
            concatenated.extend_from_slice(&self.encode_value(element_type, element)?);
        }
        Ok(keccak256(&concatenated).0)
    }
}

/// Computes the EIP-712 digest of a typed-data payload.
///
/// # Errors
///
/// See [`TypedData::signing_hash`].
pub fn encode_typed_data_v4(payload: &TypedData) -> Result<B256> {
    payload.signing_hash()
}

/// Signs a typed-data payload, returning the RLP list
/// `[digest, R, S, V]` with V as raw parity 27/28 (any chain id is already
/// baked into the domain separator).
///
/// # Errors
///
/// Hashing errors per [`TypedData::signing_hash`], plus
/// [`Error::SignerInternal`] from the backend.
pub fn sign_typed_data_v4(keypair: &KeyPair, payload: &TypedData) -> Result<Vec<u8>> {
    let digest = payload.signing_hash()?;
    let sig = keypair.sign(&digest)?;

    let list = Item::List(vec![
        Item::Bytes(digest.to_vec()),
        Item::from_uint(sig.r_u256()),
        Item::from_uint(sig.s_u256()),
        Item::from_uint(U256::from(sig.v())),
    ]);
    Ok(rlp::encode(&list))
}

/// Splits an array type into (element type, fixed length), if it is one.
fn parse_array_type(field_type: &str) -> Result<Option<(&str, Option<usize>)>> {
    if !field_type.ends_with(']') {
        return Ok(None);
    }
    let open = field_type
        .rfind('[')
        .ok_or_else(|| Error::BadArrayType(field_type.to_string()))?;
    let element_type = &field_type[..open];
    if element_type.is_empty() {
        return Err(Error::BadArrayType(field_type.to_string()));
    }
    let suffix = &field_type[open + 1..field_type.len() - 1];
    if suffix.is_empty() {
        return Ok(Some((element_type, None)));
    }
    let len: usize = suffix
        .parse()
        .map_err(|_| Error::BadArrayType(field_type.to_string()))?;
    Ok(Some((element_type, Some(len))))
}

/// Strips every trailing array suffix, yielding the base type name.
fn strip_array_suffixes(field_type: &str) -> Result<&str> {
    let mut base = field_type;
    while let Some((element_type, _)) = parse_array_type(base)? {
        base = element_type;
    }
    Ok(base)
}

/// Encodes an atomic (non-struct, non-array) value to 32 bytes.
fn encode_atomic(field_type: &str, value: &Value) -> Result<[u8; 32]> {
    let mut buf = [0u8; 32];

    match field_type {
        "string" => {
            let s = match value {
                Value::Null => "",
                Value::String(s) => s.as_str(),
                other => return Err(mismatch(field_type, format!("expected string, got {other}"))),
            };
            Ok(keccak256(s.as_bytes()).0)
        }
        "bytes" => {
            let bytes = decode_hex_value(field_type, value)?;
            Ok(keccak256(&bytes).0)
        }
        "bool" => {
            let b = match value {
                Value::Null => false,
                Value::Bool(b) => *b,
                other => return Err(mismatch(field_type, format!("expected bool, got {other}"))),
            };
            buf[31] = u8::from(b);
            Ok(buf)
        }
        "address" => {
            let addr = match value {
                Value::Null => Address::zero(),
                Value::String(s) => Address::from_hex(s)
                    .map_err(|e| mismatch(field_type, e.to_string()))?,
                other => {
                    return Err(mismatch(field_type, format!("expected address, got {other}")));
                }
            };
            buf[12..].copy_from_slice(addr.as_bytes());
            Ok(buf)
        }
        t if t.starts_with("bytes") => {
            let size: usize = t[5..]
                .parse()
                .map_err(|_| Error::BadAtomic(t.to_string()))?;
            if size == 0 || size > 32 {
                return Err(Error::BadAtomic(t.to_string()));
            }
            let bytes = decode_hex_value(field_type, value)?;
            if bytes.len() > size {
                return Err(mismatch(
                    field_type,
                    format!("{} bytes exceed the declared width", bytes.len()),
                ));
            }
            buf[..bytes.len()].copy_from_slice(&bytes);
            Ok(buf)
        }
        t if t.starts_with("uint") => {
            let bits = parse_int_bits(t, 4)?;
            let uint = parse_uint_value(t, value)?;
            if bits < 256 && uint >= (U256::from(1) << bits) {
                return Err(mismatch(t, format!("{uint} does not fit uint{bits}")));
            }
            Ok(uint.to_be_bytes::<32>())
        }
        t if t.starts_with("int") => {
            let bits = parse_int_bits(t, 3)?;
            let (negative, magnitude) = parse_int_value(t, value)?;
            let limit = U256::from(1) << (bits - 1);
            if (negative && magnitude > limit) || (!negative && magnitude >= limit) {
                return Err(mismatch(t, format!("magnitude does not fit int{bits}")));
            }
            let encoded = if negative && magnitude > U256::ZERO {
                // Two's complement over 256 bits sign-extends to 32 bytes
                (!magnitude).wrapping_add(U256::from(1))
            } else {
                magnitude
            };
            Ok(encoded.to_be_bytes::<32>())
        }
        t => Err(Error::BadAtomic(t.to_string())),
    }
}

fn mismatch(field_type: &str, detail: String) -> Error {
    Error::FieldTypeMismatch {
        field_type: field_type.to_string(),
        detail,
    }
}

/// Parses the bit width of `uintN`/`intN`; a bare `uint`/`int` means 256.
fn parse_int_bits(type_name: &str, prefix_len: usize) -> Result<usize> {
    let suffix = &type_name[prefix_len..];
    if suffix.is_empty() {
        return Ok(256);
    }
    let bits: usize = suffix
        .parse()
        .map_err(|_| Error::BadAtomic(type_name.to_string()))?;
    if bits == 0 || bits > 256 || bits % 8 != 0 {
        return Err(Error::BadAtomic(type_name.to_string()));
    }
    Ok(bits)
}

fn parse_uint_value(field_type: &str, value: &Value) -> Result<U256> {
    if value.is_null() {
        return Ok(U256::ZERO);
    }
    HexInteger::from_json(value)
        .map(|i| i.value())
        .map_err(|e| mismatch(field_type, e.to_string()))
}

/// Parses a possibly negative integer into (sign, magnitude).
fn parse_int_value(field_type: &str, value: &Value) -> Result<(bool, U256)> {
    match value {
        Value::Null => Ok((false, U256::ZERO)),
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                Ok((false, U256::from(u)))
            } else if let Some(i) = n.as_i64() {
                Ok((true, U256::from(i.unsigned_abs())))
            } else {
                Err(mismatch(field_type, format!("{n}: not an integer")))
            }
        }
        Value::String(s) => {
            let (negative, digits) = match s.strip_prefix('-') {
                Some(rest) => (true, rest),
                None => (false, s.as_str()),
            };
            let magnitude = if let Some(hex_digits) = digits.strip_prefix("0x") {
                U256::from_str_radix(hex_digits, 16)
            } else {
                U256::from_str_radix(digits, 10)
            }
            .map_err(|e| mismatch(field_type, format!("{s}: {e}")))?;
            Ok((negative, magnitude))
        }
        other => Err(mismatch(field_type, format!("expected integer, got {other}"))),
    }
}

fn decode_hex_value(field_type: &str, value: &Value) -> Result<Vec<u8>> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::String(s) => {
            let stripped = s.strip_prefix("0x").unwrap_or(s);
            hex::decode(stripped).map_err(|e| mismatch(field_type, e.to_string()))
        }
        other => Err(mismatch(field_type, format!("expected hex string, got {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn typed_data(value: Value) -> TypedData {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn empty_payload_digest() {
        // primaryType EIP712Domain, empty domain: digest is
        // keccak256(0x19 0x01 || keccak256(keccak256("EIP712Domain()")))
        let payload = TypedData::default();
        let digest = payload.signing_hash().unwrap();
        assert_eq!(
            hex::encode(digest),
            "8d4a3f4082945b7879e2b55f181c31a77c8c0a464b70669458abbaaf99de4c38"
        );

        let explicit = typed_data(json!({
            "primaryType": "EIP712Domain",
            "domain": {},
            "message": {}
        }));
        assert_eq!(explicit.signing_hash().unwrap(), digest);
    }

    #[test]
    fn domain_only_digest_skips_message_block() {
        let payload = typed_data(json!({
            "primaryType": "EIP712Domain",
            "domain": {"name": "Test", "version": "1", "chainId": 1}
        }));
        let domain_hash = payload
            .hash_struct(EIP712_DOMAIN, &payload.domain)
            .unwrap();
        let mut pre_image = vec![0x19, 0x01];
        pre_image.extend_from_slice(domain_hash.as_slice());
        assert_eq!(payload.signing_hash().unwrap(), keccak256(&pre_image));
    }

    #[test]
    fn encode_type_sorts_transitive_references() {
        let payload = typed_data(json!({
            "types": {
                "Transaction": [
                    {"name": "from", "type": "Person"},
                    {"name": "tx", "type": "Asset"}
                ],
                "Person": [
                    {"name": "wallet", "type": "address"}
                ],
                "Asset": [
                    {"name": "owner", "type": "Person"},
                    {"name": "amount", "type": "uint256"}
                ]
            },
            "primaryType": "Transaction"
        }));
        assert_eq!(
            payload.encode_type("Transaction").unwrap(),
            "Transaction(Person from,Asset tx)\
             Asset(Person owner,uint256 amount)\
             Person(address wallet)"
        );
    }

    #[test]
    fn encode_type_handles_array_references() {
        let payload = typed_data(json!({
            "types": {
                "Batch": [
                    {"name": "entries", "type": "Entry[]"}
                ],
                "Entry": [
                    {"name": "value", "type": "uint256"}
                ]
            },
            "primaryType": "Batch"
        }));
        assert_eq!(
            payload.encode_type("Batch").unwrap(),
            "Batch(Entry[] entries)Entry(uint256 value)"
        );
    }

    #[test]
    fn unknown_primary_type() {
        let payload = typed_data(json!({"primaryType": "missing"}));
        assert!(matches!(
            payload.signing_hash(),
            Err(Error::UnknownType(name)) if name == "missing"
        ));
    }

    #[test]
    fn unknown_referenced_type() {
        let payload = typed_data(json!({
            "types": {
                "Outer": [{"name": "inner", "type": "Inner"}]
            },
            "primaryType": "Outer",
            "message": {"inner": {}}
        }));
        // Inner is not declared, and not a known atomic type
        assert!(matches!(
            payload.signing_hash(),
            Err(Error::BadAtomic(name)) if name == "Inner"
        ));
    }

    #[test]
    fn nested_struct_hashing() {
        let payload = typed_data(json!({
            "types": {
                "Mail": [
                    {"name": "from", "type": "Person"},
                    {"name": "to", "type": "Person"},
                    {"name": "contents", "type": "string"}
                ],
                "Person": [
                    {"name": "name", "type": "string"},
                    {"name": "wallet", "type": "address"}
                ]
            },
            "primaryType": "Mail",
            "domain": {"name": "Ether Mail", "version": "1", "chainId": 1,
                       "verifyingContract": "0xCcCCccccCCCCcCCCCCCcCcCccCcCCCcCcccccccC"},
            "message": {
                "from": {"name": "Cow", "wallet": "0xCD2a3d9F938E13CD947Ec05AbC7FE734Df8DD826"},
                "to": {"name": "Bob", "wallet": "0xbBbBBBBbbBBBbbbBbbBbbbbBBbBbbbbBbBbbBBbB"},
                "contents": "Hello, Bob!"
            }
        }));

        assert_eq!(
            payload.encode_type("Mail").unwrap(),
            "Mail(Person from,Person to,string contents)Person(string name,address wallet)"
        );

        // Reference digest from the EIP-712 specification example
        assert_eq!(
            hex::encode(payload.signing_hash().unwrap()),
            "be609aee343fb3c4b28e1df9e632fca64fcfaede20f02e86244efddf30957bd2"
        );
    }

    #[test]
    fn missing_fields_encode_as_zero() {
        let sparse = typed_data(json!({
            "types": {
                "Thing": [
                    {"name": "count", "type": "uint32"},
                    {"name": "label", "type": "string"},
                    {"name": "owner", "type": "address"},
                    {"name": "flag", "type": "bool"},
                    {"name": "tag", "type": "bytes32"}
                ]
            },
            "primaryType": "Thing",
            "message": {}
        }));
        let explicit = typed_data(json!({
            "types": {
                "Thing": [
                    {"name": "count", "type": "uint32"},
                    {"name": "label", "type": "string"},
                    {"name": "owner", "type": "address"},
                    {"name": "flag", "type": "bool"},
                    {"name": "tag", "type": "bytes32"}
                ]
            },
            "primaryType": "Thing",
            "message": {
                "count": 0,
                "label": "",
                "owner": "0x0000000000000000000000000000000000000000",
                "flag": false,
                "tag": "0x0000000000000000000000000000000000000000000000000000000000000000"
            }
        }));
        assert_eq!(
            sparse.signing_hash().unwrap(),
            explicit.signing_hash().unwrap()
        );
    }

    #[test]
    fn fixed_array_length_enforced() {
        let payload = typed_data(json!({
            "types": {
                "Pair": [{"name": "values", "type": "uint256[2]"}]
            },
            "primaryType": "Pair",
            "message": {"values": ["1", "2", "3"]}
        }));
        assert!(matches!(
            payload.signing_hash(),
            Err(Error::FieldTypeMismatch { .. })
        ));
    }

    #[test]
    fn dynamic_array_hashing() {
        let payload = typed_data(json!({
            "types": {
                "Batch": [
                    {"name": "recipients", "type": "address[]"},
                    {"name": "amounts", "type": "uint256[]"}
                ]
            },
            "primaryType": "Batch",
            "message": {
                "recipients": [
                    "0x0000000000000000000000000000000000000001",
                    "0x0000000000000000000000000000000000000002"
                ],
                "amounts": ["1000000000000000000", "2000000000000000000"]
            }
        }));
        assert!(!payload.signing_hash().unwrap().is_zero());
    }

    #[test]
    fn atomic_validation() {
        assert!(matches!(
            encode_atomic("uint7", &json!(1)),
            Err(Error::BadAtomic(_))
        ));
        assert!(matches!(
            encode_atomic("uint264", &json!(1)),
            Err(Error::BadAtomic(_))
        ));
        assert!(matches!(
            encode_atomic("bytes33", &json!("0x00")),
            Err(Error::BadAtomic(_))
        ));
        assert!(matches!(
            encode_atomic("bytes0", &json!("0x00")),
            Err(Error::BadAtomic(_))
        ));
        assert!(matches!(
            encode_atomic("float", &json!(1)),
            Err(Error::BadAtomic(_))
        ));

        // Range checks
        assert!(matches!(
            encode_atomic("uint8", &json!(256)),
            Err(Error::FieldTypeMismatch { .. })
        ));
        assert!(encode_atomic("uint8", &json!(255)).is_ok());
        assert!(matches!(
            encode_atomic("int8", &json!(128)),
            Err(Error::FieldTypeMismatch { .. })
        ));
        assert!(encode_atomic("int8", &json!(-128)).is_ok());
    }

    #[test]
    fn int_two_complement_encoding() {
        let encoded = encode_atomic("int32", &json!(-1)).unwrap();
        assert_eq!(encoded, [0xff; 32]);

        let encoded = encode_atomic("int256", &json!("-2")).unwrap();
        let mut expected = [0xff; 32];
        expected[31] = 0xfe;
        assert_eq!(encoded, expected);

        let encoded = encode_atomic("int32", &json!(5)).unwrap();
        let mut expected = [0u8; 32];
        expected[31] = 5;
        assert_eq!(encoded, expected);
    }

    #[test]
    fn bytes_n_padding() {
        let encoded = encode_atomic("bytes4", &json!("0xdeadbeef")).unwrap();
        let mut expected = [0u8; 32];
        expected[..4].copy_from_slice(&[0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(encoded, expected);

        assert!(matches!(
            encode_atomic("bytes2", &json!("0xdeadbeef")),
            Err(Error::FieldTypeMismatch { .. })
        ));
    }

    #[test]
    fn bad_array_types() {
        assert!(matches!(
            parse_array_type("[3]"),
            Err(Error::BadArrayType(_))
        ));
        assert!(matches!(
            parse_array_type("uint256[x]"),
            Err(Error::BadArrayType(_))
        ));
        assert_eq!(
            parse_array_type("uint256[3]").unwrap(),
            Some(("uint256", Some(3)))
        );
        assert_eq!(parse_array_type("uint256[]").unwrap(), Some(("uint256", None)));
        assert_eq!(parse_array_type("uint256").unwrap(), None);
    }

    #[test]
    fn sign_typed_data_emits_rlp_quad() {
        let keypair = KeyPair::generate().unwrap();
        let payload = TypedData::default();

        let raw = sign_typed_data_v4(&keypair, &payload).unwrap();
        let (item, consumed) = rlp::decode(&raw).unwrap();
        assert_eq!(consumed, raw.len());

        let parts = item.as_list().unwrap();
        assert_eq!(parts.len(), 4);

        let digest = parts[0].as_bytes().unwrap();
        assert_eq!(
            hex::encode(digest),
            "8d4a3f4082945b7879e2b55f181c31a77c8c0a464b70669458abbaaf99de4c38"
        );

        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        let r_bytes = parts[1].as_bytes().unwrap();
        let s_bytes = parts[2].as_bytes().unwrap();
        r[32 - r_bytes.len()..].copy_from_slice(r_bytes);
        s[32 - s_bytes.len()..].copy_from_slice(s_bytes);
        let v = parts[3].as_uint().unwrap().to::<u64>();

        let sig = crate::signature::SignatureData::new(v, r, s);
        let recovered = sig.recover(digest, -1).unwrap();
        assert_eq!(recovered, keypair.address());
    }

    #[test]
    fn sign_typed_data_unknown_type_fails() {
        let keypair = KeyPair::generate().unwrap();
        let payload = typed_data(json!({"primaryType": "missing"}));
        assert!(matches!(
            sign_typed_data_v4(&keypair, &payload),
            Err(Error::UnknownType(_))
        ));
    }
}

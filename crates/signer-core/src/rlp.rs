//! Recursive Length Prefix (RLP) encoding and decoding.
//!
//! RLP is Ethereum's canonical serialization for byte strings and nested
//! lists. An [`Item`] is either a byte string or an ordered list of items,
//! fully recursive; decoding always produces a tree.
//!
//! # Encoding Rules
//!
//! - A single byte in `[0x00, 0x7f]` encodes as itself.
//! - A byte string of length `L <= 55` encodes as `(0x80 + L) || bytes`.
//! - A byte string of length `L > 55` encodes as
//!   `(0xb7 + len(L)) || be(L) || bytes`.
//! - A list whose concatenated payload has length `P <= 55` encodes as
//!   `(0xc0 + P) || payload`; longer lists as `(0xf7 + len(P)) || be(P) || payload`.
//!
//! Integers encode as their minimal big-endian byte string; zero is the
//! empty string (`0x80`).
//!
//! # Canonical Decoding
//!
//! The decoder rejects every non-minimal alternative encoding: a single byte
//! below `0x80` wrapped in a `0x81` header, long-form headers for payloads
//! that fit the short form, and length fields with leading zero bytes. It
//! also rejects headers that overflow the remaining buffer.
//!
//! # Example
//!
//! ```
//! use evm_signer_core::rlp::{self, Item};
//!
//! let item = Item::List(vec![
//!     Item::Bytes(b"cat".to_vec()),
//!     Item::Bytes(b"dog".to_vec()),
//! ]);
//! let encoded = rlp::encode(&item);
//! assert_eq!(hex::encode(&encoded), "c88363617483646f67");
//!
//! let (decoded, consumed) = rlp::decode(&encoded).unwrap();
//! assert_eq!(decoded, item);
//! assert_eq!(consumed, encoded.len());
//! ```

use alloy_primitives::U256;

use crate::error::{Error, Result};

/// Offset of a short byte-string header.
const SHORT_STRING: u8 = 0x80;
/// Offset of a long byte-string header.
const LONG_STRING: u8 = 0xb7;
/// Offset of a short list header.
const SHORT_LIST: u8 = 0xc0;
/// Offset of a long list header.
const LONG_LIST: u8 = 0xf7;
/// Longest payload expressible with a short header.
const SHORT_MAX: usize = 55;

/// A single RLP item: a byte string or an ordered list of items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    /// An opaque byte string.
    Bytes(Vec<u8>),
    /// An ordered, possibly nested, list of items.
    List(Vec<Item>),
}

impl Item {
    /// An empty byte string (the RLP encoding of integer zero).
    #[must_use]
    pub const fn empty() -> Self {
        Item::Bytes(Vec::new())
    }

    /// Builds a byte-string item from a non-negative integer, using the
    /// minimal big-endian representation (zero becomes the empty string).
    #[must_use]
    pub fn from_uint(value: U256) -> Self {
        let bytes = value.to_be_bytes::<32>();
        let start = bytes.iter().position(|&b| b != 0).unwrap_or(32);
        Item::Bytes(bytes[start..].to_vec())
    }

    /// Reads this item back as an integer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RlpUnexpectedItem`] for lists,
    /// [`Error::RlpNonMinimalInteger`] for leading zero bytes, and
    /// [`Error::RlpOverflow`] for values wider than 32 bytes.
    pub fn as_uint(&self) -> Result<U256> {
        let bytes = self.as_bytes()?;
        if bytes.first() == Some(&0) {
            return Err(Error::RlpNonMinimalInteger);
        }
        if bytes.len() > 32 {
            return Err(Error::RlpOverflow);
        }
        Ok(U256::from_be_slice(bytes))
    }

    /// Returns the byte-string payload of this item.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RlpUnexpectedItem`] if this is a list.
    pub fn as_bytes(&self) -> Result<&[u8]> {
        match self {
            Item::Bytes(b) => Ok(b),
            Item::List(_) => Err(Error::RlpUnexpectedItem("byte string")),
        }
    }

    /// Returns the element list of this item.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RlpUnexpectedItem`] if this is a byte string.
    pub fn as_list(&self) -> Result<&[Item]> {
        match self {
            Item::Bytes(_) => Err(Error::RlpUnexpectedItem("list")),
            Item::List(items) => Ok(items),
        }
    }
}

impl From<&[u8]> for Item {
    fn from(bytes: &[u8]) -> Self {
        Item::Bytes(bytes.to_vec())
    }
}

impl From<Vec<u8>> for Item {
    fn from(bytes: Vec<u8>) -> Self {
        Item::Bytes(bytes)
    }
}

impl From<Vec<Item>> for Item {
    fn from(items: Vec<Item>) -> Self {
        Item::List(items)
    }
}

/// Encodes an item to its unique minimal RLP byte form.
#[must_use]
pub fn encode(item: &Item) -> Vec<u8> {
    let mut out = Vec::new();
    encode_into(item, &mut out);
    out
}

fn encode_into(item: &Item, out: &mut Vec<u8>) {
    match item {
        Item::Bytes(bytes) => {
            if bytes.len() == 1 && bytes[0] < SHORT_STRING {
                out.push(bytes[0]);
            } else {
                encode_header(SHORT_STRING, LONG_STRING, bytes.len(), out);
                out.extend_from_slice(bytes);
            }
        }
        Item::List(items) => {
            let mut payload = Vec::new();
            for child in items {
                encode_into(child, &mut payload);
            }
            encode_header(SHORT_LIST, LONG_LIST, payload.len(), out);
            out.extend_from_slice(&payload);
        }
    }
}

fn encode_header(short_offset: u8, long_offset: u8, len: usize, out: &mut Vec<u8>) {
    if len <= SHORT_MAX {
        out.push(short_offset + len as u8);
    } else {
        let be = len.to_be_bytes();
        let start = be.iter().position(|&b| b != 0).unwrap_or(be.len() - 1);
        let len_bytes = &be[start..];
        out.push(long_offset + len_bytes.len() as u8);
        out.extend_from_slice(len_bytes);
    }
}

/// Decodes the first item in `data`.
///
/// Returns the item together with the number of bytes consumed, so callers
/// framing a stream can verify full consumption.
///
/// # Errors
///
/// - [`Error::RlpTruncated`] when the buffer ends inside a header or payload
/// - [`Error::RlpNonMinimalLength`] for any non-canonical length prefix
/// - [`Error::RlpOverflow`] when a declared length does not fit in memory
pub fn decode(data: &[u8]) -> Result<(Item, usize)> {
    let (item, consumed) = decode_at(data)?;
    Ok((item, consumed))
}

fn decode_at(data: &[u8]) -> Result<(Item, usize)> {
    let &prefix = data.first().ok_or(Error::RlpTruncated)?;

    match prefix {
        0x00..=0x7f => Ok((Item::Bytes(vec![prefix]), 1)),
        0x80..=0xb7 => {
            let len = (prefix - SHORT_STRING) as usize;
            let payload = slice_payload(data, 1, len)?;
            if len == 1 && payload[0] < SHORT_STRING {
                // A single byte below 0x80 must encode as itself
                return Err(Error::RlpNonMinimalLength);
            }
            Ok((Item::Bytes(payload.to_vec()), 1 + len))
        }
        0xb8..=0xbf => {
            let len_of_len = (prefix - LONG_STRING) as usize;
            let (len, header) = decode_long_length(data, len_of_len)?;
            let payload = slice_payload(data, header, len)?;
            Ok((Item::Bytes(payload.to_vec()), header + len))
        }
        0xc0..=0xf7 => {
            let len = (prefix - SHORT_LIST) as usize;
            let payload = slice_payload(data, 1, len)?;
            let items = decode_list_payload(payload)?;
            Ok((Item::List(items), 1 + len))
        }
        0xf8..=0xff => {
            let len_of_len = (prefix - LONG_LIST) as usize;
            let (len, header) = decode_long_length(data, len_of_len)?;
            let payload = slice_payload(data, header, len)?;
            let items = decode_list_payload(payload)?;
            Ok((Item::List(items), header + len))
        }
    }
}

/// Reads a long-form length field, returning (payload length, header size).
fn decode_long_length(data: &[u8], len_of_len: usize) -> Result<(usize, usize)> {
    if data.len() < 1 + len_of_len {
        return Err(Error::RlpTruncated);
    }
    let len_bytes = &data[1..1 + len_of_len];
    if len_bytes[0] == 0 {
        return Err(Error::RlpNonMinimalLength);
    }
    if len_of_len > size_of::<usize>() {
        return Err(Error::RlpOverflow);
    }
    let mut len: usize = 0;
    for &b in len_bytes {
        len = len.checked_shl(8).ok_or(Error::RlpOverflow)? | b as usize;
    }
    if len <= SHORT_MAX {
        // Would have fit the short form
        return Err(Error::RlpNonMinimalLength);
    }
    Ok((len, 1 + len_of_len))
}

fn slice_payload(data: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
    let end = offset.checked_add(len).ok_or(Error::RlpOverflow)?;
    data.get(offset..end).ok_or(Error::RlpTruncated)
}

/// Decodes a list payload, requiring its items to consume it exactly.
fn decode_list_payload(mut payload: &[u8]) -> Result<Vec<Item>> {
    let mut items = Vec::new();
    while !payload.is_empty() {
        let (item, consumed) = decode_at(payload)?;
        items.push(item);
        payload = &payload[consumed..];
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(item: &Item) -> Vec<u8> {
        let encoded = encode(item);
        let (decoded, consumed) = decode(&encoded).unwrap();
        assert_eq!(&decoded, item);
        assert_eq!(consumed, encoded.len());
        encoded
    }

    #[test]
    fn encode_single_bytes() {
        assert_eq!(roundtrip(&Item::Bytes(vec![0x00])), vec![0x00]);
        assert_eq!(roundtrip(&Item::Bytes(vec![0x0f])), vec![0x0f]);
        assert_eq!(roundtrip(&Item::Bytes(vec![0x7f])), vec![0x7f]);
        assert_eq!(roundtrip(&Item::Bytes(vec![0x80])), vec![0x81, 0x80]);
    }

    #[test]
    fn encode_empty_string_and_list() {
        assert_eq!(roundtrip(&Item::empty()), vec![0x80]);
        assert_eq!(roundtrip(&Item::List(vec![])), vec![0xc0]);
    }

    #[test]
    fn encode_short_string() {
        let encoded = roundtrip(&Item::Bytes(b"dog".to_vec()));
        assert_eq!(hex::encode(encoded), "83646f67");
    }

    #[test]
    fn encode_long_string() {
        // The canonical 56-byte example from the RLP specification
        let s = b"Lorem ipsum dolor sit amet, consectetur adipisicing elit".to_vec();
        assert_eq!(s.len(), 56);
        let encoded = roundtrip(&Item::Bytes(s.clone()));
        assert_eq!(encoded[0], 0xb8);
        assert_eq!(encoded[1], 56);
        assert_eq!(&encoded[2..], s.as_slice());
    }

    #[test]
    fn encode_cat_dog_list() {
        let item = Item::List(vec![
            Item::Bytes(b"cat".to_vec()),
            Item::Bytes(b"dog".to_vec()),
        ]);
        assert_eq!(hex::encode(roundtrip(&item)), "c88363617483646f67");
    }

    #[test]
    fn encode_set_theoretic_representation() {
        // [ [], [[]], [ [], [[]] ] ]
        let item = Item::List(vec![
            Item::List(vec![]),
            Item::List(vec![Item::List(vec![])]),
            Item::List(vec![
                Item::List(vec![]),
                Item::List(vec![Item::List(vec![])]),
            ]),
        ]);
        assert_eq!(hex::encode(roundtrip(&item)), "c7c0c1c0c3c0c1c0");
    }

    #[test]
    fn encode_long_list() {
        let items: Vec<Item> = (0..60).map(|_| Item::Bytes(vec![0x42])).collect();
        let encoded = roundtrip(&Item::List(items));
        assert_eq!(encoded[0], 0xf8);
        assert_eq!(encoded[1], 60);
    }

    #[test]
    fn uint_encoding() {
        assert_eq!(encode(&Item::from_uint(U256::ZERO)), vec![0x80]);
        assert_eq!(encode(&Item::from_uint(U256::from(0x0f))), vec![0x0f]);
        assert_eq!(
            encode(&Item::from_uint(U256::from(0x0400))),
            vec![0x82, 0x04, 0x00]
        );
    }

    #[test]
    fn uint_decoding() {
        let (item, _) = decode(&[0x82, 0x04, 0x00]).unwrap();
        assert_eq!(item.as_uint().unwrap(), U256::from(0x0400));

        let (item, _) = decode(&[0x80]).unwrap();
        assert_eq!(item.as_uint().unwrap(), U256::ZERO);

        // Leading zero byte is not a minimal integer
        let item = Item::Bytes(vec![0x00, 0x04]);
        assert!(matches!(
            item.as_uint(),
            Err(Error::RlpNonMinimalInteger)
        ));
    }

    #[test]
    fn decode_rejects_wrapped_single_byte() {
        assert!(matches!(
            decode(&[0x81, 0x00]),
            Err(Error::RlpNonMinimalLength)
        ));
        assert!(matches!(
            decode(&[0x81, 0x7f]),
            Err(Error::RlpNonMinimalLength)
        ));
        // 0x80 genuinely needs the wrapper
        let (item, _) = decode(&[0x81, 0x80]).unwrap();
        assert_eq!(item, Item::Bytes(vec![0x80]));
    }

    #[test]
    fn decode_rejects_non_minimal_long_form() {
        // 3-byte payload declared with a long header
        assert!(matches!(
            decode(&[0xb8, 0x03, 0x61, 0x62, 0x63]),
            Err(Error::RlpNonMinimalLength)
        ));
        // Length field with a leading zero byte
        assert!(matches!(
            decode(&[0xb9, 0x00, 0x38]),
            Err(Error::RlpNonMinimalLength)
        ));
    }

    #[test]
    fn decode_rejects_truncation() {
        assert!(matches!(decode(&[]), Err(Error::RlpTruncated)));
        assert!(matches!(decode(&[0x83, 0x61]), Err(Error::RlpTruncated)));
        assert!(matches!(decode(&[0xb8]), Err(Error::RlpTruncated)));
        assert!(matches!(
            decode(&[0xc8, 0x83, 0x61, 0x62]),
            Err(Error::RlpTruncated)
        ));
    }

    #[test]
    fn decode_rejects_overflowing_length() {
        // Declares a 2^64-ish payload on a tiny buffer
        let data = [0xbf, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x01];
        assert!(decode(&data).is_err());
    }

    #[test]
    fn decode_reports_consumed_with_trailing_data() {
        let mut data = encode(&Item::Bytes(b"cat".to_vec()));
        let expected = data.len();
        data.extend_from_slice(&[0xde, 0xad]);
        let (item, consumed) = decode(&data).unwrap();
        assert_eq!(item, Item::Bytes(b"cat".to_vec()));
        assert_eq!(consumed, expected);
    }

    #[test]
    fn nested_list_must_fill_payload() {
        // List header declares 2 bytes but inner item consumes 1, leaving a
        // truncated second item
        assert!(decode(&[0xc2, 0x81]).is_err());
    }
}

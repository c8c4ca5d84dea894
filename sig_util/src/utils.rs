//! Hex and byte conversion helpers shared by the encoders and the signing facade.

use alloy_primitives::{Address, Signature, B256};
use k256::ecdsa::VerifyingKey;
use num_bigint::{BigInt, BigUint, Sign};
use num_traits::ToPrimitive;

use crate::{
    error::{Error, Result},
    value::Value,
};

/// `0x` followed by any number of hex digits (including none).
pub fn is_hex_string(s: &str) -> bool {
    s.strip_prefix("0x")
        .is_some_and(|digits| digits.bytes().all(|b| b.is_ascii_hexdigit()))
}

/// Left-pads an unprefixed hex string with `0` up to `target_length` characters.
/// Longer input is returned as is.
pub fn pad_with_zeroes(number: &str, target_length: isize) -> Result<String> {
    if !number.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(Error::NotUnprefixedHex(number.to_owned()));
    }
    let target = usize::try_from(target_length).map_err(|_| Error::NegativeLength(target_length))?;
    Ok(format!("{number:0>target$}"))
}

/// Lower-cased, `0x`-prefixed hex form of a number or string; `None` for `null`.
///
/// Negative numbers normalize to the empty `0x`.
pub fn normalize(input: &Value) -> Result<Option<String>> {
    match input {
        Value::Null => Ok(None),
        Value::Number(n) => Ok(Some(format!("0x{}", hex::encode(number_to_bytes(n))))),
        Value::String(s) => {
            let lower = s.to_lowercase();
            Ok(Some(if lower.starts_with("0x") {
                lower
            } else {
                format!("0x{lower}")
            }))
        }
        other => Err(Error::CannotNormalize {
            kind: other.kind(),
            value: other.to_string(),
        }),
    }
}

/// Joins signature components into the 65-byte RPC form, `0x || r || s || v`.
///
/// `r` and `s` are padded to 32 bytes; `v` is appended as its minimal hex digits.
pub fn concat_sig(v: &[u8], r: &[u8], s: &[u8]) -> String {
    let hex_of = |bytes: &[u8]| format!("{:x}", BigUint::from_bytes_be(bytes));
    format!(
        "0x{:0>64}{:0>64}{}",
        hex_of(r),
        hex_of(s),
        hex_of(v)
    )
}

/// Minimal big-endian bytes of a non-negative integer (`[0]` for zero); empty when negative.
pub fn number_to_bytes(n: &BigInt) -> Vec<u8> {
    if n.sign() == Sign::Minus {
        Vec::new()
    } else {
        n.magnitude().to_bytes_be()
    }
}

/// Strict byte conversion: strings must be `0x` hex, numbers non-negative.
pub fn to_bytes(value: &Value) -> Result<Vec<u8>> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Bytes(b) => Ok(b.clone()),
        Value::String(s) if is_hex_string(s) => decode_hex(&s[2..]),
        Value::String(s) => Err(Error::NotHexString(s.clone())),
        Value::Number(n) if n.sign() == Sign::Minus => Err(Error::InvalidInteger(n.to_string())),
        Value::Number(n) => Ok(number_to_bytes(n)),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Number(n) => n.to_u8().ok_or(Error::NotBytesLike("array")),
                _ => Err(Error::NotBytesLike("array")),
            })
            .collect(),
        other => Err(Error::NotBytesLike(other.kind())),
    }
}

/// Like [`to_bytes`], except that strings which are not `0x` hex are taken as UTF-8 text.
pub fn legacy_to_bytes(value: &Value) -> Result<Vec<u8>> {
    match value {
        Value::String(s) if !is_hex_string(s) => Ok(s.as_bytes().to_vec()),
        other => to_bytes(other),
    }
}

/// Zero-pads on the left, or keeps the last `len` bytes.
pub fn set_length_left(bytes: &[u8], len: usize) -> Vec<u8> {
    let mut out = vec![0u8; len.saturating_sub(bytes.len())];
    out.extend_from_slice(&bytes[bytes.len().saturating_sub(len)..]);
    out
}

/// Zero-pads on the right, or keeps the first `len` bytes.
pub fn set_length_right(bytes: &[u8], len: usize) -> Vec<u8> {
    let mut out = bytes[..bytes.len().min(len)].to_vec();
    out.resize(len, 0);
    out
}

pub fn recover_public_key(hash: &B256, signature: &Signature) -> Result<VerifyingKey> {
    Ok(signature.recover_from_prehash(hash)?)
}

pub fn public_to_address(key: &VerifyingKey) -> Address {
    Address::from_public_key(key)
}

/// Hex digits to bytes; an odd number of digits gets a leading zero nibble.
pub(crate) fn decode_hex(digits: &str) -> Result<Vec<u8>> {
    if digits.len() % 2 == 1 {
        Ok(hex::decode(format!("0{digits}"))?)
    } else {
        Ok(hex::decode(digits)?)
    }
}

//! Standard (32-byte word aligned) contract ABI encoding.

use num_bigint::{BigInt, BigUint, Sign};
use num_traits::One;

use crate::{
    error::{Error, Result},
    number::{bit_length, parse_number},
    solidity_type::{ArrayDim, BaseKind, SolidityType},
    utils,
    value::Value,
};

pub(crate) const WORD: usize = 32;

/// Encodes `values` as the ABI types named in `types`, using the default (lenient) encoder.
pub fn raw_encode<T: AsRef<str>>(types: &[T], values: &[Value]) -> Result<Vec<u8>> {
    AbiEncoder::default().encode(types, values)
}

/// Like [`raw_encode`], for a type list and value list that are themselves dynamic values,
/// e.g. straight out of a JSON document.
pub fn raw_encode_json(types: &Value, values: &Value) -> Result<Vec<u8>> {
    let types = types
        .as_array()
        .ok_or(Error::TypesNotIterable)?
        .iter()
        .map(|ty| ty.as_str().map(str::to_owned).ok_or(Error::TypesNotIterable))
        .collect::<Result<Vec<_>>>()?;
    let values = values.as_array().unwrap_or_default();
    raw_encode(&types, values)
}

/// ABI encoder.
///
/// A fixed-size array type `T[N]` given more than `N` elements is always rejected. Given fewer,
/// the default encoder encodes just the supplied elements; a [strict](AbiEncoder::strict)
/// encoder rejects them.
#[derive(Debug, Clone, Copy, Default)]
pub struct AbiEncoder {
    strict_arrays: bool,
}

impl AbiEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strict() -> Self {
        Self {
            strict_arrays: true,
        }
    }

    pub fn with_strict_arrays(mut self, strict: bool) -> Self {
        self.strict_arrays = strict;
        self
    }

    /// Encodes one value per type. Values beyond the number of types are ignored.
    pub fn encode<T: AsRef<str>>(&self, types: &[T], values: &[Value]) -> Result<Vec<u8>> {
        let items = types
            .iter()
            .enumerate()
            .map(|(index, ty)| {
                let ty = ty.as_ref();
                let value = values.get(index).ok_or_else(|| Error::MissingValue {
                    ty: ty.to_owned(),
                    index,
                })?;
                Ok((SolidityType::parse(ty)?, value))
            })
            .collect::<Result<Vec<_>>>()?;
        self.encode_sequence(items)
    }

    /// Lays out a sequence head/tail style: static encodings inline, dynamic ones as an offset
    /// (relative to the start of the head) into the tail.
    fn encode_sequence<'a>(
        &self,
        items: impl IntoIterator<Item = (SolidityType, &'a Value)>,
    ) -> Result<Vec<u8>> {
        let encoded = items
            .into_iter()
            .map(|(ty, value)| Ok((ty.is_dynamic(), self.encode_single(&ty, value)?)))
            .collect::<Result<Vec<_>>>()?;
        let head_len: usize = encoded
            .iter()
            .map(|(dynamic, bytes)| if *dynamic { WORD } else { bytes.len() })
            .sum();

        let mut head = Vec::with_capacity(head_len);
        let mut tail = Vec::new();
        for (dynamic, bytes) in encoded {
            if dynamic {
                head.extend_from_slice(&usize_word(head_len + tail.len()));
                tail.extend(bytes);
            } else {
                head.extend(bytes);
            }
        }
        head.extend(tail);
        Ok(head)
    }

    pub fn encode_single(&self, ty: &SolidityType, value: &Value) -> Result<Vec<u8>> {
        if let Some((element, dim)) = ty.element() {
            return self.encode_array(ty, element, dim, value);
        }
        match ty.kind {
            BaseKind::Address => uint_word(160, &parse_number(value)?).map(Vec::from),
            BaseKind::Bool => Ok(usize_word(value.is_truthy() as usize).to_vec()),
            BaseKind::String => Ok(encode_dynamic_bytes(&text_bytes(value))),
            BaseKind::Bytes => Ok(encode_dynamic_bytes(&buffer_from(value)?)),
            // Only the word width bounds the input; bytes past N but within 32 are kept.
            BaseKind::FixedBytes(_) => Ok(right_pad_word(&fixed_bytes_input(value)?).to_vec()),
            BaseKind::Int(bits) => int_word(bits, &parse_number(value)?).map(Vec::from),
            BaseKind::Uint(bits) => uint_word(bits, &parse_number(value)?).map(Vec::from),
            BaseKind::UFixed { decimals, .. } => {
                let scaled = parse_number(value)? << decimals;
                if scaled.sign() == Sign::Minus {
                    return Err(Error::NegativeUnsigned { kind: "ufixed" });
                }
                uint_word(256, &scaled).map(Vec::from)
            }
            BaseKind::Fixed { decimals, .. } => {
                int_word(256, &(parse_number(value)? << decimals)).map(Vec::from)
            }
            BaseKind::Function => Err(Error::UnsupportedType(ty.kind.to_string())),
        }
    }

    fn encode_array(
        &self,
        ty: &SolidityType,
        element: SolidityType,
        dim: ArrayDim,
        value: &Value,
    ) -> Result<Vec<u8>> {
        let parsed;
        let items = match value {
            Value::Array(items) => items.as_slice(),
            // Arrays may arrive as their JSON text
            Value::String(text) => {
                parsed = Value::from_json(serde_json::from_str(text)?)?;
                parsed
                    .as_array()
                    .ok_or_else(|| Error::NotAnArray(ty.to_string()))?
            }
            _ => return Err(Error::NotAnArray(ty.to_string())),
        };

        if let ArrayDim::Fixed(size) = dim {
            check_array_size(size, items.len())?;
            if self.strict_arrays && items.len() != size {
                return Err(Error::ArrayLengthMismatch {
                    expected: size,
                    actual: items.len(),
                });
            }
        }

        let body = self.encode_sequence(items.iter().map(|item| (element.clone(), item)))?;
        Ok(match dim {
            ArrayDim::Dynamic => [usize_word(items.len()).as_slice(), &body].concat(),
            ArrayDim::Fixed(_) => body,
        })
    }
}

pub(crate) fn check_array_size(size: usize, len: usize) -> Result<()> {
    if size != 0 && len > size {
        return Err(Error::ArraySizeExceeded(size));
    }
    Ok(())
}

pub(crate) fn usize_word(n: usize) -> [u8; WORD] {
    left_pad_word(&BigUint::from(n).to_bytes_be())
}

/// Big-endian unsigned word, after checking the value is non-negative and fits in `bits`.
pub(crate) fn uint_word(bits: usize, n: &BigInt) -> Result<[u8; WORD]> {
    if n.sign() == Sign::Minus {
        return Err(Error::NegativeUnsigned { kind: "uint" });
    }
    check_width("uint", bits, n)?;
    Ok(left_pad_word(&n.magnitude().to_bytes_be()))
}

/// 256-bit two's complement word, after checking the magnitude fits in `bits`.
pub(crate) fn int_word(bits: usize, n: &BigInt) -> Result<[u8; WORD]> {
    check_width("int", bits, n)?;
    Ok(left_pad_word(&twos_complement(n, WORD)))
}

pub(crate) fn check_width(kind: &'static str, bits: usize, n: &BigInt) -> Result<()> {
    let actual = bit_length(n);
    if actual > bits as u64 {
        return Err(Error::WidthExceeded {
            kind,
            width: bits,
            actual,
        });
    }
    Ok(())
}

/// `n` as a `len`-byte two's complement integer. The magnitude must fit in `len * 8` bits.
pub(crate) fn twos_complement(n: &BigInt, len: usize) -> Vec<u8> {
    let unsigned = if n.sign() == Sign::Minus {
        ((BigInt::one() << (len * 8)) + n).magnitude().clone()
    } else {
        n.magnitude().clone()
    };
    utils::set_length_left(&unsigned.to_bytes_be(), len)
}

pub(crate) fn left_pad_word(bytes: &[u8]) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    let bytes = &bytes[bytes.len().saturating_sub(WORD)..];
    word[WORD - bytes.len()..].copy_from_slice(bytes);
    word
}

pub(crate) fn right_pad_word(bytes: &[u8]) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    let len = bytes.len().min(WORD);
    word[..len].copy_from_slice(&bytes[..len]);
    word
}

/// `bytes<N>` input: numbers as their minimal big-endian bytes, everything else as `0x` hex or
/// raw bytes.
pub(crate) fn fixed_bytes_input(value: &Value) -> Result<Vec<u8>> {
    match value {
        Value::Number(n) => Ok(utils::number_to_bytes(n)),
        other => utils::to_bytes(other),
    }
}

fn encode_dynamic_bytes(payload: &[u8]) -> Vec<u8> {
    let padded_len = payload.len().div_ceil(WORD) * WORD;
    let mut out = Vec::with_capacity(WORD + padded_len);
    out.extend_from_slice(&usize_word(payload.len()));
    out.extend_from_slice(payload);
    out.resize(WORD + padded_len, 0);
    out
}

/// `string` payload. Anything that is not already text or bytes is stringified.
fn text_bytes(value: &Value) -> Vec<u8> {
    match value {
        Value::String(s) => s.as_bytes().to_vec(),
        Value::Bytes(b) => b.clone(),
        other => other.to_string().into_bytes(),
    }
}

/// `bytes` payload: raw bytes, UTF-8 text or a list of octets.
pub(crate) fn buffer_from(value: &Value) -> Result<Vec<u8>> {
    match value {
        Value::Bytes(b) => Ok(b.clone()),
        Value::String(s) => Ok(s.as_bytes().to_vec()),
        Value::Array(_) => utils::to_bytes(value),
        other => Err(Error::NotStringLike {
            kind: other.kind(),
            value: other.to_string(),
        }),
    }
}

//! Tightly packed encoding, as produced by Solidity's `abi.encodePacked`.

use crate::{
    abi::{
        buffer_from, check_array_size, check_width, fixed_bytes_input, int_word, right_pad_word,
        twos_complement, uint_word, usize_word,
    },
    error::{Error, Result},
    number::parse_number,
    solidity_type::{ArrayDim, BaseKind, SolidityType},
    utils,
    value::Value,
};

const ADDRESS_LEN: usize = 20;

/// Packs `values` without padding.
///
/// Scalars take their natural width (`bool` is one byte, `uint16` two, `bytes3` three) and
/// `string`/`bytes` contribute their raw bytes with no length prefix. Array elements are the
/// exception: each one is padded to a full 32-byte word, and arrays carry no length.
pub fn solidity_pack<T: AsRef<str>>(types: &[T], values: &[Value]) -> Result<Vec<u8>> {
    if types.len() != values.len() {
        return Err(Error::LengthMismatch);
    }
    let mut out = Vec::new();
    for (ty, value) in types.iter().zip(values) {
        pack_into(&mut out, &SolidityType::parse(ty.as_ref())?, value, false)?;
    }
    Ok(out)
}

fn pack_into(out: &mut Vec<u8>, ty: &SolidityType, value: &Value, in_array: bool) -> Result<()> {
    if let Some((element, dim)) = ty.element() {
        let items = value
            .as_array()
            .ok_or_else(|| Error::NotAnArray(ty.to_string()))?;
        if let ArrayDim::Fixed(size) = dim {
            check_array_size(size, items.len())?;
        }
        for item in items {
            pack_into(out, &element, item, true)?;
        }
        return Ok(());
    }

    match ty.kind {
        BaseKind::Bytes => out.extend(utils::legacy_to_bytes(value)?),
        BaseKind::String => out.extend(buffer_from(value)?),
        BaseKind::Bool => {
            let flag = value.is_truthy() as u8;
            if in_array {
                out.extend(usize_word(flag.into()));
            } else {
                out.push(flag);
            }
        }
        BaseKind::Address => {
            let len = if in_array { 32 } else { ADDRESS_LEN };
            out.extend(utils::set_length_left(&utils::to_bytes(value)?, len));
        }
        BaseKind::FixedBytes(len) => {
            let bytes = utils::set_length_right(&fixed_bytes_input(value)?, len);
            if in_array {
                out.extend(right_pad_word(&bytes));
            } else {
                out.extend(bytes);
            }
        }
        BaseKind::Uint(bits) => {
            let n = parse_number(value)?;
            if in_array {
                out.extend(uint_word(bits, &n)?);
            } else {
                check_width("uint", bits, &n)?;
                out.extend(utils::set_length_left(&n.magnitude().to_bytes_be(), bits / 8));
            }
        }
        BaseKind::Int(bits) => {
            let n = parse_number(value)?;
            if in_array {
                out.extend(int_word(bits, &n)?);
            } else {
                check_width("int", bits, &n)?;
                out.extend(twos_complement(&n, bits / 8));
            }
        }
        BaseKind::Fixed { .. } | BaseKind::UFixed { .. } | BaseKind::Function => {
            return Err(Error::UnsupportedType(ty.to_string()));
        }
    }
    Ok(())
}

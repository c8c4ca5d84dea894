//! Solidity type descriptors.

use std::{borrow::Cow, fmt, str::FromStr};

use crate::error::{Error, Result};

/// Element type of a (possibly array) Solidity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseKind {
    Bool,
    Address,
    /// `uint<bits>`
    Uint(usize),
    /// `int<bits>`
    Int(usize),
    /// `bytes<len>`
    FixedBytes(usize),
    Bytes,
    String,
    /// `fixed<bits>x<decimals>`
    Fixed { bits: usize, decimals: usize },
    /// `ufixed<bits>x<decimals>`
    UFixed { bits: usize, decimals: usize },
    /// Parses, but has no encoding
    Function,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrayDim {
    Fixed(usize),
    Dynamic,
}

/// A parsed type string such as `uint8`, `bytes32[]` or `string[2][]`.
///
/// `dims` is ordered innermost first: the last entry is the rightmost `[...]` of the type string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SolidityType {
    pub kind: BaseKind,
    pub dims: Vec<ArrayDim>,
}

impl SolidityType {
    pub fn parse(ty: &str) -> Result<Self> {
        let name = elementary_name(ty);
        let mut base = name.as_ref();
        let mut dims = Vec::new();
        while let Some(stripped) = base.strip_suffix(']') {
            let open = stripped
                .rfind('[')
                .ok_or_else(|| Error::UnsupportedType(ty.to_owned()))?;
            let size = &stripped[open + 1..];
            dims.push(if size.is_empty() {
                ArrayDim::Dynamic
            } else {
                ArrayDim::Fixed(
                    size.parse()
                        .map_err(|_| Error::UnsupportedType(ty.to_owned()))?,
                )
            });
            base = &stripped[..open];
        }
        dims.reverse();
        Ok(Self {
            kind: BaseKind::parse(base)?,
            dims,
        })
    }

    pub fn is_array(&self) -> bool {
        !self.dims.is_empty()
    }

    /// Whether the encoded size depends on the value: `string`, `bytes`, any dynamic dimension,
    /// and fixed arrays of any of those.
    pub fn is_dynamic(&self) -> bool {
        matches!(self.kind, BaseKind::String | BaseKind::Bytes)
            || self.dims.iter().any(|d| *d == ArrayDim::Dynamic)
    }

    /// Splits off the outermost dimension, returning the element type and that dimension.
    pub fn element(&self) -> Option<(SolidityType, ArrayDim)> {
        let (outer, inner) = self.dims.split_last()?;
        Some((
            SolidityType {
                kind: self.kind,
                dims: inner.to_vec(),
            },
            *outer,
        ))
    }

    /// Bit width of integer, address and bool scalars.
    pub fn bit_width(&self) -> Option<usize> {
        match self.kind {
            BaseKind::Uint(bits) | BaseKind::Int(bits) => Some(bits),
            BaseKind::Address => Some(160),
            BaseKind::Bool => Some(8),
            _ => None,
        }
    }

    /// Byte width of `bytes<N>` scalars.
    pub fn byte_width(&self) -> Option<usize> {
        match self.kind {
            BaseKind::FixedBytes(len) => Some(len),
            _ => None,
        }
    }
}

impl BaseKind {
    fn parse(base: &str) -> Result<Self> {
        let unsupported = || Error::UnsupportedType(base.to_owned());
        Ok(match base {
            "address" => BaseKind::Address,
            "bool" => BaseKind::Bool,
            "string" => BaseKind::String,
            "bytes" => BaseKind::Bytes,
            "function" => BaseKind::Function,
            _ => {
                if let Some(n) = base.strip_prefix("bytes") {
                    let len = parse_type_n(n).ok_or_else(unsupported)?;
                    if !(1..=32).contains(&len) {
                        return Err(Error::InvalidWidth {
                            kind: "bytes",
                            width: len,
                        });
                    }
                    BaseKind::FixedBytes(len)
                } else if let Some(n) = base.strip_prefix("int") {
                    BaseKind::Int(integer_width("int", n).ok_or_else(unsupported)??)
                } else if let Some(n) = base.strip_prefix("uint") {
                    BaseKind::Uint(integer_width("uint", n).ok_or_else(unsupported)??)
                } else if let Some(nxm) = base.strip_prefix("ufixed") {
                    let (bits, decimals) = parse_type_nxm(nxm)
                        .ok_or_else(|| Error::InvalidFixedType(base.to_owned()))?;
                    BaseKind::UFixed { bits, decimals }
                } else if let Some(nxm) = base.strip_prefix("fixed") {
                    let (bits, decimals) = parse_type_nxm(nxm)
                        .ok_or_else(|| Error::InvalidFixedType(base.to_owned()))?;
                    BaseKind::Fixed { bits, decimals }
                } else {
                    return Err(unsupported());
                }
            }
        })
    }
}

impl FromStr for SolidityType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        SolidityType::parse(s)
    }
}

impl fmt::Display for BaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BaseKind::Bool => f.write_str("bool"),
            BaseKind::Address => f.write_str("address"),
            BaseKind::Uint(bits) => write!(f, "uint{bits}"),
            BaseKind::Int(bits) => write!(f, "int{bits}"),
            BaseKind::FixedBytes(len) => write!(f, "bytes{len}"),
            BaseKind::Bytes => f.write_str("bytes"),
            BaseKind::String => f.write_str("string"),
            BaseKind::Fixed { bits, decimals } => write!(f, "fixed{bits}x{decimals}"),
            BaseKind::UFixed { bits, decimals } => write!(f, "ufixed{bits}x{decimals}"),
            BaseKind::Function => f.write_str("function"),
        }
    }
}

impl fmt::Display for SolidityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        for dim in &self.dims {
            match dim {
                ArrayDim::Fixed(n) => write!(f, "[{n}]")?,
                ArrayDim::Dynamic => f.write_str("[]")?,
            }
        }
        Ok(())
    }
}

/// Expands the width-less aliases `int`, `uint`, `fixed` and `ufixed`, also as array elements.
fn elementary_name(ty: &str) -> Cow<'_, str> {
    const ALIASES: [(&str, &str); 4] = [
        ("int", "int256"),
        ("uint", "uint256"),
        ("fixed", "fixed128x128"),
        ("ufixed", "ufixed128x128"),
    ];
    for (alias, full) in ALIASES {
        if let Some(rest) = ty.strip_prefix(alias) {
            if rest.is_empty() || rest.starts_with('[') {
                return Cow::Owned(format!("{full}{rest}"));
            }
        }
    }
    Cow::Borrowed(ty)
}

fn parse_type_n(n: &str) -> Option<usize> {
    if n.is_empty() || !n.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    n.parse().ok()
}

/// `None` when the suffix is not numeric, `Some(Err)` when the width is out of range.
fn integer_width(kind: &'static str, n: &str) -> Option<Result<usize>> {
    let width = parse_type_n(n)?;
    Some(if width % 8 != 0 || !(8..=256).contains(&width) {
        Err(Error::InvalidWidth { kind, width })
    } else {
        Ok(width)
    })
}

fn parse_type_nxm(nxm: &str) -> Option<(usize, usize)> {
    let (n, m) = nxm.split_once('x')?;
    Some((parse_type_n(n)?, parse_type_n(m)?))
}

use num_bigint::BigInt;
use num_traits::Num;

use crate::{
    error::{Error, Result},
    value::Value,
};

/// Coerces a value into an arbitrary-precision integer.
///
/// Numbers are taken as is. Strings may carry a leading sign and are read as hexadecimal when
/// `0x`-prefixed, decimal otherwise. Every other value fails with [`Error::NotANumber`].
pub fn parse_number(arg: &Value) -> Result<BigInt> {
    match arg {
        Value::Number(n) => Ok(n.clone()),
        Value::String(s) => parse_numeric_str(s),
        _ => Err(Error::NotANumber),
    }
}

fn parse_numeric_str(s: &str) -> Result<BigInt> {
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let (radix, digits) = match digits.strip_prefix("0x") {
        Some(hex) => (16, hex),
        None => (10, digits),
    };
    // "" and "0x" read as zero
    if digits.is_empty() {
        return Ok(BigInt::default());
    }
    if digits.starts_with(|c| c == '-' || c == '+') {
        return Err(Error::InvalidNumber(s.to_owned()));
    }
    let magnitude =
        BigInt::from_str_radix(digits, radix).map_err(|_| Error::InvalidNumber(s.to_owned()))?;
    Ok(if negative { -magnitude } else { magnitude })
}

/// Number of significant bits in the magnitude of `n`.
pub(crate) fn bit_length(n: &BigInt) -> u64 {
    n.magnitude().bits()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numbers_and_strings() {
        assert_eq!(parse_number(&Value::from(42)).unwrap(), BigInt::from(42));
        assert_eq!(parse_number(&Value::from("42")).unwrap(), BigInt::from(42));
        assert_eq!(parse_number(&Value::from("-42")).unwrap(), BigInt::from(-42));
        assert_eq!(parse_number(&Value::from("0x2a")).unwrap(), BigInt::from(42));
        assert_eq!(parse_number(&Value::from("-0x2a")).unwrap(), BigInt::from(-42));
        assert_eq!(parse_number(&Value::from("0x")).unwrap(), BigInt::from(0));
    }

    #[test]
    fn parses_values_wider_than_256_bits() {
        let n = parse_number(&Value::from(format!("0x1{}", "0".repeat(70)))).unwrap();
        assert_eq!(bit_length(&n), 281);
    }

    #[test]
    fn rejects_non_numbers() {
        for value in [
            Value::Null,
            Value::Bool(true),
            Value::Bytes(vec![1]),
            Value::Object(Default::default()),
        ] {
            let err = parse_number(&value).unwrap_err();
            assert_eq!(err.to_string(), "Argument is not a number");
        }
    }

    #[test]
    fn rejects_garbage_digits() {
        assert!(matches!(
            parse_number(&Value::from("0xzz")),
            Err(Error::InvalidNumber(_))
        ));
        assert!(matches!(
            parse_number(&Value::from("--1")),
            Err(Error::InvalidNumber(_))
        ));
    }
}

pub mod abi;
pub mod error;
pub mod number;
pub mod packed;
pub mod signing;
pub mod solidity_type;
pub mod typed_data;
pub mod utils;
pub mod value;

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

pub use abi::{raw_encode, raw_encode_json, AbiEncoder};
pub use error::{Error, Result};
pub use number::parse_number;
pub use packed::solidity_pack;
pub use signing::{
    recover_typed_signature, sign_typed_data, typed_data_hash, typed_signature_hash,
    RecoverTypedSignatureOptions, SignTypedDataOptions, TypedData, TypedValue,
};
pub use solidity_type::SolidityType;
pub use typed_data::{TypedField, TypedMessage, Types};
pub use value::Value;

/// Typed data signing scheme.
///
/// - `V1`: the early EIP-712 draft, a flat list of `{type, name, value}` entries
/// - `V3`: EIP-712 without arrays or recursive structs
/// - `V4`: EIP-712 with arrays and recursive structs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignTypedDataVersion {
    V1,
    V3,
    V4,
}

/// Versions that implement EIP-712 proper.
pub(crate) const EIP712_VERSIONS: &[SignTypedDataVersion] =
    &[SignTypedDataVersion::V3, SignTypedDataVersion::V4];

impl SignTypedDataVersion {
    pub const ALL: [SignTypedDataVersion; 3] = [Self::V1, Self::V3, Self::V4];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V1 => "V1",
            Self::V3 => "V3",
            Self::V4 => "V4",
        }
    }

    /// Fails with [`Error::VersionNotAllowed`] unless `self` is one of `allowed`.
    pub fn validate(self, allowed: &'static [SignTypedDataVersion]) -> Result<()> {
        if allowed.contains(&self) {
            Ok(())
        } else {
            Err(Error::VersionNotAllowed {
                version: self,
                allowed,
            })
        }
    }
}

impl fmt::Display for SignTypedDataVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignTypedDataVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|version| version.as_str() == s)
            .ok_or_else(|| Error::InvalidVersion(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_versions() {
        assert_eq!("V4".parse::<SignTypedDataVersion>().unwrap(), SignTypedDataVersion::V4);
        let err = "V0".parse::<SignTypedDataVersion>().unwrap_err();
        assert_eq!(err.to_string(), "Invalid version: 'V0'");
        assert!("v4".parse::<SignTypedDataVersion>().is_err());
    }

    #[test]
    fn restricts_versions() {
        assert!(SignTypedDataVersion::V3.validate(EIP712_VERSIONS).is_ok());
        let err = SignTypedDataVersion::V1.validate(EIP712_VERSIONS).unwrap_err();
        assert_eq!(
            err.to_string(),
            "SignTypedDataVersion not allowed: 'V1'. Allowed versions are: V3, V4"
        );
    }

    #[test]
    fn versions_serialize_by_name() {
        assert_eq!(serde_json::to_string(&SignTypedDataVersion::V3).unwrap(), "\"V3\"");
        let version: SignTypedDataVersion = serde_json::from_str("\"V1\"").unwrap();
        assert_eq!(version, SignTypedDataVersion::V1);
    }
}

//! Typed data signing and signer recovery.

use alloy_primitives::{hex, keccak256, Address, Signature, B256, U256};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::{
    error::{Error, Result},
    packed::solidity_pack,
    typed_data::{eip712_hash, TypedMessage},
    utils::{concat_sig, legacy_to_bytes, public_to_address, recover_public_key},
    value::Value,
    SignTypedDataVersion,
};

/// One entry of a V1 typed message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedValue {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub value: Value,
}

impl TypedValue {
    pub fn new(ty: impl Into<String>, name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            r#type: Some(ty.into()),
            name: Some(name.into()),
            value: value.into(),
        }
    }
}

/// Data accepted by [`sign_typed_data`]: a V1 entry list or an EIP-712 message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypedData {
    Legacy(Vec<TypedValue>),
    Message(TypedMessage),
}

impl TypedData {
    /// Reads typed data out of a JSON document. Anything but an array or an object is rejected
    /// with [`Error::ExpectedNonEmptyArray`].
    pub fn from_json(document: serde_json::Value) -> Result<Self> {
        match document {
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
                Ok(serde_json::from_value(document)?)
            }
            _ => Err(Error::ExpectedNonEmptyArray),
        }
    }
}

impl From<Vec<TypedValue>> for TypedData {
    fn from(entries: Vec<TypedValue>) -> Self {
        TypedData::Legacy(entries)
    }
}

impl From<TypedMessage> for TypedData {
    fn from(message: TypedMessage) -> Self {
        TypedData::Message(message)
    }
}

#[derive(Debug, Clone)]
pub struct SignTypedDataOptions {
    pub private_key: Option<B256>,
    pub data: Option<TypedData>,
    pub version: SignTypedDataVersion,
}

#[derive(Debug, Clone)]
pub struct RecoverTypedSignatureOptions {
    pub data: Option<TypedData>,
    /// `0x`-prefixed 65-byte `r || s || v` signature
    pub signature: Option<String>,
    pub version: SignTypedDataVersion,
}

/// The V1 hash of `typed_data`, as `0x`-prefixed hex.
pub fn typed_signature_hash(typed_data: &[TypedValue]) -> Result<String> {
    Ok(hex::encode_prefixed(legacy_hash(typed_data)?))
}

/// `keccak256(keccak256(pack(schema)) || keccak256(pack(values)))`, where the schema lists every
/// entry as `"<type> <name>"`.
fn legacy_hash(entries: &[TypedValue]) -> Result<B256> {
    if entries.is_empty() {
        return Err(Error::ExpectedNonEmptyArray);
    }

    let data = entries
        .iter()
        .map(|entry| match entry.r#type.as_deref() {
            Some("bytes") => Ok(Value::Bytes(legacy_to_bytes(&entry.value)?)),
            _ => Ok(entry.value.clone()),
        })
        .collect::<Result<Vec<_>>>()?;
    let schema = entries
        .iter()
        .map(|entry| {
            let name = entry
                .name
                .as_deref()
                .filter(|name| !name.is_empty())
                .ok_or(Error::ExpectedNonEmptyArray)?;
            let ty = entry.r#type.as_deref().unwrap_or("undefined");
            Ok(Value::from(format!("{ty} {name}")))
        })
        .collect::<Result<Vec<_>>>()?;
    let types = entries
        .iter()
        .enumerate()
        .map(|(index, entry)| entry.r#type.as_deref().ok_or(Error::MissingEntryType(index)))
        .collect::<Result<Vec<_>>>()?;

    let schema_hash = keccak256(solidity_pack(&vec!["string"; entries.len()], &schema)?);
    let data_hash = keccak256(solidity_pack(&types, &data)?);
    trace!(%schema_hash, %data_hash, "hashed legacy typed data");

    Ok(keccak256(solidity_pack(
        &["bytes32", "bytes32"],
        &[Value::from(schema_hash), Value::from(data_hash)],
    )?))
}

/// The digest that gets signed for `data` under `version`.
pub fn typed_data_hash(data: &TypedData, version: SignTypedDataVersion) -> Result<B256> {
    debug!(%version, "hashing typed data");
    let hash = match (version, data) {
        (SignTypedDataVersion::V1, TypedData::Legacy(entries)) => legacy_hash(entries)?,
        (SignTypedDataVersion::V1, TypedData::Message(_)) => {
            return Err(Error::ExpectedNonEmptyArray)
        }
        (_, TypedData::Message(message)) => eip712_hash(message, version)?,
        (_, TypedData::Legacy(_)) => return Err(Error::ExpectedTypedMessage(version)),
    };
    trace!(%hash, "typed data digest");
    Ok(hash)
}

/// Signs typed data, returning the `0x`-prefixed `r || s || v` signature with `v` in `{27, 28}`.
pub fn sign_typed_data(options: &SignTypedDataOptions) -> Result<String> {
    let data = options.data.as_ref().ok_or(Error::MissingData)?;
    let private_key = options.private_key.as_ref().ok_or(Error::MissingPrivateKey)?;

    let hash = typed_data_hash(data, options.version)?;
    let signer = PrivateKeySigner::from_bytes(private_key)
        .map_err(|e| Error::InvalidPrivateKey(e.to_string()))?;
    let signature = signer.sign_hash_sync(&hash)?;
    debug!(signer = %signer.address(), version = %options.version, "signed typed data");

    Ok(concat_sig(
        &[27 + signature.v() as u8],
        &signature.r().to_be_bytes::<32>(),
        &signature.s().to_be_bytes::<32>(),
    ))
}

/// Recovers the address that produced `options.signature` over the typed data.
pub fn recover_typed_signature(options: &RecoverTypedSignatureOptions) -> Result<Address> {
    let data = options.data.as_ref().ok_or(Error::MissingData)?;
    let signature = options.signature.as_deref().ok_or(Error::MissingSignature)?;

    let hash = typed_data_hash(data, options.version)?;
    let signature = parse_rpc_signature(signature)?;
    let public_key = recover_public_key(&hash, &signature)?;
    let address = public_to_address(&public_key);
    debug!(%address, version = %options.version, "recovered typed data signer");
    Ok(address)
}

/// Parses a 65-byte `r || s || v` signature. `v` may be given as `0`/`1` or `27`/`28`.
fn parse_rpc_signature(signature: &str) -> Result<Signature> {
    let bytes = hex::decode(signature).map_err(|e| Error::InvalidSignature(e.to_string()))?;
    let [r @ .., v] = bytes.as_slice() else {
        return Err(Error::InvalidSignature("empty signature".to_owned()));
    };
    if r.len() != 64 {
        return Err(Error::InvalidSignature(format!(
            "expected 65 bytes, got {}",
            bytes.len()
        )));
    }
    let y_parity = match v {
        0 | 27 => false,
        1 | 28 => true,
        other => {
            return Err(Error::InvalidSignature(format!(
                "invalid signature v value {other}"
            )))
        }
    };
    Ok(Signature::new(
        U256::from_be_slice(&r[..32]),
        U256::from_be_slice(&r[32..]),
        y_parity,
    ))
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{address, b256};
    use serde_json::json;

    use super::*;

    const PRIVATE_KEY: B256 =
        b256!("4af1bceebf7f3634ec3cff8a2c38e51178d5d4ce585c52d6043e5e2cc3418bb0");
    const SIGNER: Address = address!("29c76e6ad8f28bb1004902578fb108c507be341b");

    const V1_SIGNATURE: &str = "0x49e75d475d767de7fcc67f521e0d86590723d872e6111e51c393e8c1e2f21d032dfaf5833af158915f035db6af4f37bf2d5d29781cd81f28a44c5cb4b9d241531b";
    const MESSAGE_SIGNATURE: &str = "0xf6cda8eaf5137e8cc15d48d03a002b0512446e2a7acbc576c01cfbe40ad9345663ccda8884520d98dece9a8bfe38102851bdae7f69b3d8612b9808e6337801601b";

    fn alice() -> TypedData {
        vec![TypedValue::new("string", "message", "Hi, Alice!")].into()
    }

    fn test_message() -> TypedData {
        TypedData::from_json(json!({
            "types": {
                "EIP712Domain": [],
                "Message": [{ "name": "data", "type": "string" }]
            },
            "primaryType": "Message",
            "domain": {},
            "message": { "data": "test" }
        }))
        .unwrap()
    }

    fn sign(data: TypedData, version: SignTypedDataVersion) -> Result<String> {
        sign_typed_data(&SignTypedDataOptions {
            private_key: Some(PRIVATE_KEY),
            data: Some(data),
            version,
        })
    }

    fn recover(data: TypedData, signature: &str, version: SignTypedDataVersion) -> Result<Address> {
        recover_typed_signature(&RecoverTypedSignatureOptions {
            data: Some(data),
            signature: Some(signature.to_owned()),
            version,
        })
    }

    #[test_log::test]
    fn hashes_legacy_entries() {
        let entries = vec![
            TypedValue::new("string", "message", "Hi, Alice!"),
            TypedValue::new("uint8", "value", 10),
        ];
        assert_eq!(
            typed_signature_hash(&entries).unwrap(),
            "0xf7ad23226db5c1c00ca0ca1468fd49c8f8bbc1489bc1c382de5adc557a69c229"
        );
        assert_eq!(
            typed_signature_hash(&[TypedValue::new("string", "message", "Hi, Alice!")]).unwrap(),
            "0x14b9f24872e28cc49e72dc104d7380d8e0ba84a3fe2e712704bcac66a5702bd5"
        );
    }

    #[test]
    fn legacy_hash_rejects_malformed_entries() {
        assert_eq!(
            typed_signature_hash(&[]).unwrap_err().to_string(),
            "Expect argument to be non-empty array"
        );

        let nameless = TypedValue {
            name: None,
            ..TypedValue::new("string", "", "Hi, Alice!")
        };
        assert!(matches!(
            typed_signature_hash(&[nameless]),
            Err(Error::ExpectedNonEmptyArray)
        ));

        let typeless = TypedValue {
            r#type: None,
            ..TypedValue::new("", "message", "Hi, Alice!")
        };
        assert!(matches!(
            typed_signature_hash(&[typeless]),
            Err(Error::MissingEntryType(0))
        ));

        let err = typed_signature_hash(&[TypedValue::new("jocker", "message", "Hi, Alice!")])
            .unwrap_err();
        assert_eq!(err.to_string(), "Unsupported or invalid type: \"jocker\"");
    }

    #[test]
    fn legacy_hash_value_errors() {
        let err = typed_signature_hash(&[TypedValue::new("string", "message", 10)]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "The first argument must be of type string or an instance of Buffer, ArrayBuffer, or Array or an Array-like Object. Received type number (10)"
        );

        let err = typed_signature_hash(&[TypedValue::new(
            "address",
            "message",
            "bBbBBBBbbBBBbbbBbbBbbbbBBbBbbbbBbBbbBBbB",
        )])
        .unwrap_err();
        assert!(err.to_string().starts_with("Cannot convert string to buffer"));

        let err = typed_signature_hash(&[TypedValue::new("int8", "message", "256")]).unwrap_err();
        assert_eq!(err.to_string(), "Supplied int exceeds width: 8 vs 9");

        let err = typed_signature_hash(&[TypedValue::new("int32", "data", Value::Null)])
            .unwrap_err();
        assert_eq!(err.to_string(), "Argument is not a number");
    }

    #[test]
    fn legacy_bytes_accept_text_and_hex() {
        let text = typed_signature_hash(&[TypedValue::new("bytes", "message", "10")]).unwrap();
        let hex = typed_signature_hash(&[TypedValue::new("bytes", "message", "0x3130")]).unwrap();
        assert_eq!(text, hex);
    }

    #[test_log::test]
    fn signs_and_recovers_v1() {
        assert_eq!(sign(alice(), SignTypedDataVersion::V1).unwrap(), V1_SIGNATURE);
        assert_eq!(recover(alice(), V1_SIGNATURE, SignTypedDataVersion::V1).unwrap(), SIGNER);
    }

    #[test_log::test]
    fn signs_and_recovers_eip712() {
        for version in [SignTypedDataVersion::V3, SignTypedDataVersion::V4] {
            assert_eq!(sign(test_message(), version).unwrap(), MESSAGE_SIGNATURE);
            assert_eq!(recover(test_message(), MESSAGE_SIGNATURE, version).unwrap(), SIGNER);
        }
    }

    #[test]
    fn signs_ether_mail() {
        let data = TypedData::from_json(json!({
            "types": {
                "EIP712Domain": [
                    { "name": "name", "type": "string" },
                    { "name": "version", "type": "string" },
                    { "name": "chainId", "type": "uint256" },
                    { "name": "verifyingContract", "type": "address" }
                ],
                "Person": [
                    { "name": "name", "type": "string" },
                    { "name": "wallet", "type": "address" }
                ],
                "Mail": [
                    { "name": "from", "type": "Person" },
                    { "name": "to", "type": "Person" },
                    { "name": "contents", "type": "string" }
                ]
            },
            "primaryType": "Mail",
            "domain": {
                "name": "Ether Mail",
                "version": "1",
                "chainId": 1,
                "verifyingContract": "0xCcCCccccCCCCcCCCCCCcCcCccCcCCCcCcccccccC"
            },
            "message": {
                "from": { "name": "Cow", "wallet": "0xCD2a3d9F938E13CD947Ec05AbC7FE734Df8DD826" },
                "to": { "name": "Bob", "wallet": "0xbBbBBBBbbBBBbbbBbbBbbbbBBbBbbbbBbBbbBBbB" },
                "contents": "Hello, Bob!"
            }
        }))
        .unwrap();

        let signature = sign_typed_data(&SignTypedDataOptions {
            private_key: Some(keccak256("cow")),
            data: Some(data.clone()),
            version: SignTypedDataVersion::V4,
        })
        .unwrap();
        assert_eq!(
            signature,
            "0x4355c47d63924e8a72e509b65029052eb6c299d53a04e167c5775fd466751c9d07299936d304c153f6443dfa05f40ff007d72911b6f72307f996231605b915621c"
        );
        assert_eq!(
            recover(data, &signature, SignTypedDataVersion::V3).unwrap(),
            address!("CD2a3d9F938E13CD947Ec05AbC7FE734Df8DD826")
        );
    }

    #[test]
    fn random_key_round_trip() {
        let signer = PrivateKeySigner::random();
        let signature = sign_typed_data(&SignTypedDataOptions {
            private_key: Some(signer.to_bytes()),
            data: Some(test_message()),
            version: SignTypedDataVersion::V4,
        })
        .unwrap();
        assert_eq!(
            recover(test_message(), &signature, SignTypedDataVersion::V4).unwrap(),
            signer.address()
        );
    }

    #[test]
    fn recovers_with_unshifted_recovery_id() {
        let zero_based = format!("{}00", &V1_SIGNATURE[..V1_SIGNATURE.len() - 2]);
        assert_eq!(recover(alice(), &zero_based, SignTypedDataVersion::V1).unwrap(), SIGNER);
    }

    #[test]
    fn rejects_malformed_signatures() {
        assert!(matches!(
            recover(alice(), "0x1234", SignTypedDataVersion::V1),
            Err(Error::InvalidSignature(_))
        ));
        let bad_v = format!("{}05", &V1_SIGNATURE[..V1_SIGNATURE.len() - 2]);
        assert!(matches!(
            recover(alice(), &bad_v, SignTypedDataVersion::V1),
            Err(Error::InvalidSignature(_))
        ));
    }

    #[test]
    fn requires_data_key_and_signature() {
        let err = sign_typed_data(&SignTypedDataOptions {
            private_key: Some(PRIVATE_KEY),
            data: None,
            version: SignTypedDataVersion::V1,
        })
        .unwrap_err();
        assert_eq!(err.to_string(), "Missing data parameter");

        let err = sign_typed_data(&SignTypedDataOptions {
            private_key: None,
            data: Some(alice()),
            version: SignTypedDataVersion::V1,
        })
        .unwrap_err();
        assert_eq!(err.to_string(), "Missing private key parameter");

        let err = recover_typed_signature(&RecoverTypedSignatureOptions {
            data: Some(alice()),
            signature: None,
            version: SignTypedDataVersion::V1,
        })
        .unwrap_err();
        assert_eq!(err.to_string(), "Missing signature parameter");

        let err = recover_typed_signature(&RecoverTypedSignatureOptions {
            data: None,
            signature: Some(V1_SIGNATURE.to_owned()),
            version: SignTypedDataVersion::V3,
        })
        .unwrap_err();
        assert_eq!(err.to_string(), "Missing data parameter");
    }

    #[test]
    fn rejects_mismatched_data_and_version() {
        assert!(matches!(
            sign(test_message(), SignTypedDataVersion::V1),
            Err(Error::ExpectedNonEmptyArray)
        ));
        assert!(matches!(
            sign(alice(), SignTypedDataVersion::V4),
            Err(Error::ExpectedTypedMessage(SignTypedDataVersion::V4))
        ));
        assert!(matches!(
            sign(TypedData::Legacy(Vec::new()), SignTypedDataVersion::V1),
            Err(Error::ExpectedNonEmptyArray)
        ));
    }

    #[test]
    fn reads_typed_data_from_json() {
        assert_eq!(
            TypedData::from_json(json!([{ "type": "string", "name": "message", "value": "Hi, Alice!" }]))
                .unwrap(),
            alice()
        );
        assert!(matches!(test_message(), TypedData::Message(_)));
        assert!(matches!(
            TypedData::from_json(serde_json::Value::Null),
            Err(Error::ExpectedNonEmptyArray)
        ));
        assert!(matches!(
            TypedData::from_json(json!(1)),
            Err(Error::ExpectedNonEmptyArray)
        ));
    }
}

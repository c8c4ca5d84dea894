//! EIP-712 structured data hashing.
//!
//! All functions are parameterised by [`SignTypedDataVersion`]: V3 leaves missing fields out of
//! the encoding and has no array support, while V4 encodes missing struct fields as a zero word
//! and hashes arrays element-wise. V1 is not EIP-712 at all and is rejected here; see
//! [`crate::typed_signature_hash`].

use std::collections::{BTreeMap, BTreeSet};

use alloy_primitives::{keccak256, B256};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    abi::{buffer_from, raw_encode},
    error::{Error, Result},
    utils::{decode_hex, is_hex_string, number_to_bytes},
    value::Value,
    SignTypedDataVersion, EIP712_VERSIONS,
};

pub const EIP712_DOMAIN: &str = "EIP712Domain";

const BYTES32: &str = "bytes32";

/// One member of a struct type definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedField {
    pub name: String,
    #[serde(rename = "type")]
    pub r#type: String,
}

impl TypedField {
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            r#type: ty.into(),
        }
    }
}

/// Struct type definitions, keyed by type name.
pub type Types = BTreeMap<String, Vec<TypedField>>;

/// A typed message as passed to `eth_signTypedData_v3`/`_v4`.
///
/// Every member is optional so that incomplete requests can be represented and rejected with a
/// precise error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub types: Option<Types>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Value>,
}

/// Every struct type reachable from `primary_type`, including itself.
///
/// Array suffixes are ignored (`Person[]` depends on `Person`) and names without a definition
/// are skipped.
pub fn find_type_dependencies(primary_type: &str, types: &Types) -> BTreeSet<String> {
    let mut found = BTreeSet::new();
    collect_dependencies(primary_type, types, &mut found);
    found
}

fn collect_dependencies(ty: &str, types: &Types, found: &mut BTreeSet<String>) {
    let name = struct_name(ty);
    if found.contains(name) {
        return;
    }
    let Some(fields) = types.get(name) else {
        return;
    };
    found.insert(name.to_owned());
    for field in fields {
        collect_dependencies(&field.r#type, types, found);
    }
}

/// Leading identifier characters of a type reference.
fn struct_name(ty: &str) -> &str {
    let end = ty
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(ty.len());
    &ty[..end]
}

/// `Primary(type name,...)` followed by each dependency's signature, in name order.
pub fn encode_type(primary_type: &str, types: &Types) -> Result<String> {
    let mut deps = find_type_dependencies(primary_type, types);
    deps.remove(primary_type);
    std::iter::once(primary_type)
        .chain(deps.iter().map(String::as_str))
        .map(|ty| {
            let fields = types
                .get(ty)
                .ok_or_else(|| Error::NoTypeDefinition(ty.to_owned()))?;
            let members = fields
                .iter()
                .map(|field| format!("{} {}", field.r#type, field.name))
                .collect::<Vec<_>>()
                .join(",");
            Ok(format!("{ty}({members})"))
        })
        .collect()
}

pub fn hash_type(primary_type: &str, types: &Types) -> Result<B256> {
    Ok(keccak256(encode_type(primary_type, types)?))
}

/// Encodes one struct member into the ABI type and value it contributes to [`encode_data`].
///
/// `value` is `None` when the member is absent from its object.
pub fn encode_field(
    types: &Types,
    name: &str,
    ty: &str,
    value: Option<&Value>,
    version: SignTypedDataVersion,
) -> Result<(String, Value)> {
    version.validate(EIP712_VERSIONS)?;

    if types.contains_key(ty) {
        let word = match value {
            None | Some(Value::Null) if version == SignTypedDataVersion::V4 => B256::ZERO,
            _ => keccak256(encode_data(ty, value, types, version)?),
        };
        return Ok(hashed(word));
    }

    let value = value.ok_or_else(|| Error::MissingField {
        name: name.to_owned(),
        ty: ty.to_owned(),
    })?;

    match ty {
        "bytes" => {
            let bytes = match value {
                Value::Number(n) => number_to_bytes(n),
                Value::String(s) if is_hex_string(s) => decode_hex(&s[2..])?,
                other => buffer_from(other)?,
            };
            Ok(hashed(keccak256(bytes)))
        }
        "string" => {
            let bytes = match value {
                Value::Number(n) => number_to_bytes(n),
                Value::Null => Vec::new(),
                other => buffer_from(other)?,
            };
            Ok(hashed(keccak256(bytes)))
        }
        _ if ty.ends_with(']') => {
            if version == SignTypedDataVersion::V3 {
                return Err(Error::ArraysUnsupported);
            }
            let element_ty = ty
                .rfind('[')
                .map_or(ty.trim_end_matches(']'), |open| &ty[..open]);
            let items = value
                .as_array()
                .ok_or_else(|| Error::NotAnArray(ty.to_owned()))?;
            let (item_types, item_values): (Vec<String>, Vec<Value>) = items
                .iter()
                .map(|item| encode_field(types, name, element_ty, Some(item), version))
                .collect::<Result<Vec<_>>>()?
                .into_iter()
                .unzip();
            Ok(hashed(keccak256(raw_encode(&item_types, &item_values)?)))
        }
        _ => Ok((ty.to_owned(), value.clone())),
    }
}

fn hashed(word: B256) -> (String, Value) {
    (BYTES32.to_owned(), word.into())
}

/// `hashType(primary_type) || enc(member_1) || ... || enc(member_n)`.
///
/// `data` is `None` when the struct itself is absent. Reading a member of an absent or `null`
/// struct fails with [`Error::NotAnObject`]; members of any other non-object value are all
/// treated as missing.
pub fn encode_data(
    primary_type: &str,
    data: Option<&Value>,
    types: &Types,
    version: SignTypedDataVersion,
) -> Result<Vec<u8>> {
    version.validate(EIP712_VERSIONS)?;

    let mut encoded_types = vec![BYTES32.to_owned()];
    let mut encoded_values = vec![Value::from(hash_type(primary_type, types)?)];

    let fields = types
        .get(primary_type)
        .ok_or_else(|| Error::NoTypeDefinition(primary_type.to_owned()))?;
    for field in fields {
        let value = member(data, &field.name)?;
        if version == SignTypedDataVersion::V3 && value.is_none() {
            continue;
        }
        let (ty, value) = encode_field(types, &field.name, &field.r#type, value, version)?;
        encoded_types.push(ty);
        encoded_values.push(value);
    }

    raw_encode(&encoded_types, &encoded_values)
}

fn member<'a>(data: Option<&'a Value>, name: &str) -> Result<Option<&'a Value>> {
    match data {
        None => Err(Error::NotAnObject {
            found: "undefined",
            field: name.to_owned(),
        }),
        Some(Value::Null) => Err(Error::NotAnObject {
            found: "null",
            field: name.to_owned(),
        }),
        Some(value) => Ok(value.get(name)),
    }
}

pub fn hash_struct(
    primary_type: &str,
    data: Option<&Value>,
    types: &Types,
    version: SignTypedDataVersion,
) -> Result<B256> {
    version.validate(EIP712_VERSIONS)?;
    Ok(keccak256(encode_data(primary_type, data, types, version)?))
}

/// Drops empty members and makes sure `types` defines `EIP712Domain`.
pub fn sanitize_data(data: &TypedMessage) -> TypedMessage {
    let types = data.types.clone().map(|mut types| {
        types.entry(EIP712_DOMAIN.to_owned()).or_default();
        types
    });
    TypedMessage {
        types,
        primary_type: data.primary_type.clone().filter(|ty| !ty.is_empty()),
        domain: data.domain.clone().filter(Value::is_truthy),
        message: data.message.clone().filter(Value::is_truthy),
    }
}

/// The domain separator: `hashStruct(EIP712Domain, domain)`.
pub fn eip712_domain_hash(data: &TypedMessage, version: SignTypedDataVersion) -> Result<B256> {
    version.validate(EIP712_VERSIONS)?;
    let sanitized = sanitize_data(data);
    let mut types = sanitized.types.ok_or(Error::MissingTypes)?;
    let domain_types = Types::from([(
        EIP712_DOMAIN.to_owned(),
        types.remove(EIP712_DOMAIN).unwrap_or_default(),
    )]);
    hash_struct(
        EIP712_DOMAIN,
        sanitized.domain.as_ref(),
        &domain_types,
        version,
    )
}

/// The EIP-712 signing digest, `keccak256(0x1901 || domainSeparator || hashStruct(message))`.
///
/// A message whose primary type is `EIP712Domain` only signs the domain.
pub fn eip712_hash(data: &TypedMessage, version: SignTypedDataVersion) -> Result<B256> {
    version.validate(EIP712_VERSIONS)?;
    let sanitized = sanitize_data(data);

    let mut parts = Vec::with_capacity(2 + 2 * 32);
    parts.extend_from_slice(&[0x19, 0x01]);
    parts.extend_from_slice(eip712_domain_hash(data, version)?.as_slice());

    if sanitized.primary_type.as_deref() != Some(EIP712_DOMAIN) {
        let primary_type = sanitized
            .primary_type
            .as_deref()
            .ok_or_else(|| Error::InvalidPrimaryType("undefined".to_owned()))?;
        let types = sanitized.types.as_ref().ok_or(Error::MissingTypes)?;
        let message_hash = hash_struct(primary_type, sanitized.message.as_ref(), types, version)?;
        parts.extend_from_slice(message_hash.as_slice());
    }

    Ok(keccak256(parts))
}

/// JSON schema of a well-formed typed message.
pub fn typed_message_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "types": {
                "type": "object",
                "additionalProperties": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "name": { "type": "string" },
                            "type": { "type": "string" }
                        },
                        "required": ["name", "type"]
                    }
                }
            },
            "primaryType": { "type": "string" },
            "domain": { "type": "object" },
            "message": { "type": "object" }
        },
        "required": ["types", "primaryType", "domain", "message"]
    })
}

/// Checks a raw JSON document against [`typed_message_schema`].
pub fn validate_typed_message(document: &serde_json::Value) -> bool {
    conforms(document, &typed_message_schema())
}

/// Evaluates the subset of JSON schema used by [`typed_message_schema`]: `type`, `properties`,
/// `required`, `additionalProperties` and `items`.
fn conforms(value: &serde_json::Value, schema: &serde_json::Value) -> bool {
    use serde_json::Value as Json;

    let type_ok = match schema.get("type").and_then(Json::as_str) {
        Some("object") => value.is_object(),
        Some("array") => value.is_array(),
        Some("string") => value.is_string(),
        Some("number") => value.is_number(),
        Some("boolean") => value.is_boolean(),
        _ => true,
    };
    if !type_ok {
        return false;
    }

    if let Some(object) = value.as_object() {
        let properties = schema.get("properties").and_then(Json::as_object);
        let required = schema
            .get("required")
            .and_then(Json::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        if !required
            .iter()
            .filter_map(Json::as_str)
            .all(|key| object.contains_key(key))
        {
            return false;
        }
        for (key, member) in object {
            let member_schema = properties
                .and_then(|properties| properties.get(key))
                .or_else(|| schema.get("additionalProperties"));
            if let Some(member_schema) = member_schema {
                if !conforms(member, member_schema) {
                    return false;
                }
            }
        }
    }

    if let (Some(items), Some(item_schema)) = (value.as_array(), schema.get("items")) {
        return items.iter().all(|item| conforms(item, item_schema));
    }
    true
}

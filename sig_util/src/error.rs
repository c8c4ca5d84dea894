use thiserror::Error;

use crate::SignTypedDataVersion;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// A value that must be numeric was something else
    #[error("Argument is not a number")]
    NotANumber,

    /// A numeric string with digits outside of its radix
    #[error("Invalid number: {0:?}")]
    InvalidNumber(String),

    #[error("Unsupported or invalid type: \"{0}\"")]
    UnsupportedType(String),

    #[error("Invalid parseTypeNxM input \"{0}\".")]
    InvalidFixedType(String),

    /// `kind` is one of `int`, `uint` or `bytes`
    #[error("Invalid {kind}<N> width: {width}")]
    InvalidWidth { kind: &'static str, width: usize },

    #[error("Supplied {kind} exceeds width: {width} vs {actual}")]
    WidthExceeded {
        kind: &'static str,
        width: usize,
        actual: u64,
    },

    #[error("Supplied {kind} is negative")]
    NegativeUnsigned { kind: &'static str },

    #[error("Elements exceed array size: {0}")]
    ArraySizeExceeded(usize),

    /// Only raised by a strict [`crate::AbiEncoder`]
    #[error("Expected {expected} array elements, got {actual}")]
    ArrayLengthMismatch { expected: usize, actual: usize },

    #[error("Not an array? Expected a list of values for type {0}")]
    NotAnArray(String),

    #[error("types.forEach is not a function")]
    TypesNotIterable,

    #[error("Number of types are not matching the values")]
    LengthMismatch,

    #[error("Missing value for type {ty} at position {index}")]
    MissingValue { ty: String, index: usize },

    #[error("Cannot convert string to buffer. toBuffer only supports 0x-prefixed hex strings and this string was given: {0}")]
    NotHexString(String),

    #[error("Received an invalid integer type: {0}")]
    InvalidInteger(String),

    #[error("Cannot convert {0} to bytes")]
    NotBytesLike(&'static str),

    #[error("The first argument must be of type string or an instance of Buffer, ArrayBuffer, or Array or an Array-like Object. Received type {kind} ({value})")]
    NotStringLike { kind: &'static str, value: String },

    #[error("Expected an unprefixed hex string. Received: {0}")]
    NotUnprefixedHex(String),

    #[error("Expected a non-negative integer target length. Received: {0}")]
    NegativeLength(isize),

    #[error("eth-sig-util.normalize() requires hex string or integer input. received {kind}: {value}")]
    CannotNormalize { kind: &'static str, value: String },

    #[error("Invalid version: '{0}'")]
    InvalidVersion(String),

    #[error("SignTypedDataVersion not allowed: '{version}'. Allowed versions are: {}", allowed_list(.allowed))]
    VersionNotAllowed {
        version: SignTypedDataVersion,
        allowed: &'static [SignTypedDataVersion],
    },

    #[error("No type definition specified: {0}")]
    NoTypeDefinition(String),

    #[error("Invalid findTypeDependencies input {0}")]
    InvalidPrimaryType(String),

    #[error("missing value for field {name} of type {ty}")]
    MissingField { name: String, ty: String },

    #[error("Arrays are unimplemented in encodeData; use V4 extension")]
    ArraysUnsupported,

    /// A struct field was read from a `null` or missing object
    #[error("Cannot read properties of {found} (reading '{field}')")]
    NotAnObject { found: &'static str, field: String },

    #[error("Typed message has no `types` definitions")]
    MissingTypes,

    #[error("Expect argument to be non-empty array")]
    ExpectedNonEmptyArray,

    #[error("Cannot read property 'type' of entry {0}")]
    MissingEntryType(usize),

    #[error("Expected a typed message object for version {0}")]
    ExpectedTypedMessage(SignTypedDataVersion),

    #[error("Missing data parameter")]
    MissingData,

    #[error("Missing private key parameter")]
    MissingPrivateKey,

    #[error("Missing signature parameter")]
    MissingSignature,

    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Fractional numbers are not supported: {0}")]
    FractionalNumber(f64),

    #[error("Number {0} is too large to be represented exactly; pass it as a string")]
    ImpreciseNumber(f64),

    #[error(transparent)]
    Signature(#[from] alloy_primitives::SignatureError),

    #[error(transparent)]
    Signer(#[from] alloy_signer::Error),

    #[error(transparent)]
    FromHex(#[from] hex::FromHexError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn allowed_list(allowed: &[SignTypedDataVersion]) -> String {
    allowed
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

//! Request validation.
//!
//! Two phases run before any step logic:
//!
//! 1. **Structural**: the raw JSON body is walked against a static schema
//!    for its endpoint. The first violation comes back as a typed
//!    [`SchemaViolation`] (a path plus what was wrong) and is looked up
//!    directly in [`SchemaViolation::error_kind`]. Endpoints without a
//!    schema pass.
//! 2. **Semantic**: network identifier against the configured chain,
//!    identifier hashes as even-length hex (a missing `0x` is added in
//!    place), account addresses as valid c32check.
//!
//! The first failure wins in both phases.

use std::fmt;

use serde_json::Value;

use crate::address::StacksAddress;
use crate::config::RosettaConfig;

use super::errors::{RosettaError, RosettaErrorKind};
use super::models::{CurveType, OperationType, SignatureType};

// ---------------------------------------------------------------------------
// Schema tree
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub enum Schema {
    Any,
    String,
    Integer,
    Number,
    Bool,
    /// A string restricted to the listed values.
    Enum(&'static [&'static str]),
    Array(&'static Schema),
    Object(&'static [Field]),
}

#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub name: &'static str,
    pub required: bool,
    pub schema: Schema,
}

const fn req(name: &'static str, schema: Schema) -> Field {
    Field {
        name,
        required: true,
        schema,
    }
}

const fn opt(name: &'static str, schema: Schema) -> Field {
    Field {
        name,
        required: false,
        schema,
    }
}

const METADATA: Field = opt("metadata", Schema::Any);

const NETWORK_IDENTIFIER: Schema = Schema::Object(&[
    req("blockchain", Schema::String),
    req("network", Schema::String),
    opt(
        "sub_network_identifier",
        Schema::Object(&[req("network", Schema::String), METADATA]),
    ),
]);

const BLOCK_IDENTIFIER: Schema = Schema::Object(&[req("index", Schema::Integer), req("hash", Schema::String)]);

const PARTIAL_BLOCK_IDENTIFIER: Schema =
    Schema::Object(&[opt("index", Schema::Integer), opt("hash", Schema::String)]);

const TRANSACTION_IDENTIFIER: Schema = Schema::Object(&[req("hash", Schema::String)]);

const ACCOUNT_IDENTIFIER: Schema = Schema::Object(&[
    req("address", Schema::String),
    opt(
        "sub_account",
        Schema::Object(&[req("address", Schema::String), METADATA]),
    ),
    METADATA,
]);

const CURRENCY: Schema = Schema::Object(&[
    req("symbol", Schema::String),
    req("decimals", Schema::Integer),
    METADATA,
]);

const AMOUNT: Schema = Schema::Object(&[req("value", Schema::String), req("currency", CURRENCY), METADATA]);

const OPERATION_IDENTIFIER: Schema = Schema::Object(&[
    req("index", Schema::Integer),
    opt("network_index", Schema::Integer),
]);

const OPERATION: Schema = Schema::Object(&[
    req("operation_identifier", OPERATION_IDENTIFIER),
    opt("related_operations", Schema::Array(&OPERATION_IDENTIFIER)),
    req("type", Schema::Enum(&OperationType::NAMES)),
    opt("status", Schema::String),
    opt("account", ACCOUNT_IDENTIFIER),
    opt("amount", AMOUNT),
    opt("coin_change", Schema::Any),
    METADATA,
]);

const PUBLIC_KEY: Schema = Schema::Object(&[
    req("hex_bytes", Schema::String),
    req("curve_type", Schema::Enum(&CurveType::NAMES)),
]);

const SIGNING_PAYLOAD: Schema = Schema::Object(&[
    opt("address", Schema::String),
    opt("account_identifier", ACCOUNT_IDENTIFIER),
    req("hex_bytes", Schema::String),
    opt("signature_type", Schema::Enum(&SignatureType::NAMES)),
]);

const SIGNATURE: Schema = Schema::Object(&[
    req("signing_payload", SIGNING_PAYLOAD),
    req("public_key", PUBLIC_KEY),
    req("signature_type", Schema::Enum(&SignatureType::NAMES)),
    req("hex_bytes", Schema::String),
]);

const NETWORK: Field = req("network_identifier", NETWORK_IDENTIFIER);

const NETWORK_LIST: &[Field] = &[METADATA];
const NETWORK_REQUEST: &[Field] = &[NETWORK, METADATA];
const BLOCK: &[Field] = &[NETWORK, req("block_identifier", PARTIAL_BLOCK_IDENTIFIER)];
const BLOCK_TRANSACTION: &[Field] = &[
    NETWORK,
    req("block_identifier", BLOCK_IDENTIFIER),
    req("transaction_identifier", TRANSACTION_IDENTIFIER),
];
const MEMPOOL_TRANSACTION: &[Field] = &[NETWORK, req("transaction_identifier", TRANSACTION_IDENTIFIER)];
const ACCOUNT_BALANCE: &[Field] = &[
    NETWORK,
    req("account_identifier", ACCOUNT_IDENTIFIER),
    opt("block_identifier", PARTIAL_BLOCK_IDENTIFIER),
];
const DERIVE: &[Field] = &[NETWORK, req("public_key", PUBLIC_KEY), METADATA];
const PREPROCESS: &[Field] = &[
    NETWORK,
    req("operations", Schema::Array(&OPERATION)),
    METADATA,
    opt("max_fee", Schema::Array(&AMOUNT)),
    opt("suggested_fee_multiplier", Schema::Number),
];
const CONSTRUCTION_METADATA: &[Field] = &[
    NETWORK,
    req("options", Schema::Object(&[])),
    opt("public_keys", Schema::Array(&PUBLIC_KEY)),
];
const PAYLOADS: &[Field] = &[
    NETWORK,
    req("operations", Schema::Array(&OPERATION)),
    METADATA,
    opt("public_keys", Schema::Array(&PUBLIC_KEY)),
];
const COMBINE: &[Field] = &[
    NETWORK,
    req("unsigned_transaction", Schema::String),
    req("signatures", Schema::Array(&SIGNATURE)),
];
const SIGNED_TRANSACTION: &[Field] = &[NETWORK, req("signed_transaction", Schema::String)];
const PARSE: &[Field] = &[
    NETWORK,
    req("signed", Schema::Bool),
    req("transaction", Schema::String),
];

/// The schema registered for `endpoint`, if any.
pub fn schema_for(endpoint: &str) -> Option<&'static [Field]> {
    let fields = match endpoint {
        "/network/list" => NETWORK_LIST,
        "/network/options" | "/network/status" | "/mempool" => NETWORK_REQUEST,
        "/block" => BLOCK,
        "/block/transaction" => BLOCK_TRANSACTION,
        "/mempool/transaction" => MEMPOOL_TRANSACTION,
        "/account/balance" => ACCOUNT_BALANCE,
        "/construction/derive" => DERIVE,
        "/construction/preprocess" => PREPROCESS,
        "/construction/metadata" => CONSTRUCTION_METADATA,
        "/construction/payloads" => PAYLOADS,
        "/construction/combine" => COMBINE,
        "/construction/hash" | "/construction/submit" => SIGNED_TRANSACTION,
        "/construction/parse" => PARSE,
        _ => return None,
    };
    Some(fields)
}

// ---------------------------------------------------------------------------
// Violations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Field(&'static str),
    Index(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationKind {
    MissingProperty,
    WrongType { expected: &'static str },
    /// Not one of an enum's allowed values.
    InvalidValue,
}

/// The first place a request body departs from its schema. For a missing
/// property, the path ends with the property's name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    pub path: Vec<PathSegment>,
    pub kind: ViolationKind,
}

impl SchemaViolation {
    fn field_at(&self, i: usize) -> Option<&'static str> {
        match self.path.get(i) {
            Some(PathSegment::Field(name)) => Some(name),
            _ => None,
        }
    }

    fn leaf(&self) -> Option<&'static str> {
        self.path.iter().rev().find_map(|seg| match seg {
            PathSegment::Field(name) => Some(*name),
            PathSegment::Index(_) => None,
        })
    }

    /// Maps the violation to its error kind.
    pub fn error_kind(&self) -> RosettaErrorKind {
        use RosettaErrorKind as K;

        let missing = self.kind == ViolationKind::MissingProperty;
        if self.kind == ViolationKind::InvalidValue {
            match self.leaf() {
                Some("curve_type") => return K::InvalidCurveType,
                Some("signature_type") => return K::SignatureTypeNotSupported,
                _ => {}
            }
        }

        match (self.field_at(0), self.field_at(1)) {
            (Some("network_identifier"), None) => K::EmptyNetworkIdentifier,
            (Some("network_identifier"), Some("blockchain")) if missing => K::EmptyBlockchain,
            (Some("network_identifier"), Some("blockchain")) => K::InvalidBlockchain,
            (Some("network_identifier"), Some("network")) if missing => K::EmptyNetwork,
            (Some("network_identifier"), Some("network")) => K::InvalidNetwork,
            (Some("block_identifier"), _) => K::InvalidBlockIdentifier,
            (Some("transaction_identifier"), _) => K::InvalidTransactionIdentifier,
            (Some("operations"), _) => K::InvalidOperation,
            (Some("account_identifier"), None) if missing => K::EmptyAccountIdentifier,
            _ => K::InvalidParams,
        }
    }

    pub fn into_error(self) -> RosettaError {
        RosettaError::with_message(self.error_kind(), &self)
    }
}

fn render_path(path: &[PathSegment]) -> String {
    path.iter()
        .map(|seg| match seg {
            PathSegment::Field(name) => format!("/{name}"),
            PathSegment::Index(i) => format!("/{i}"),
        })
        .collect()
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ViolationKind::MissingProperty => {
                let (name, parent) = match self.path.split_last() {
                    Some((PathSegment::Field(name), parent)) => (*name, parent),
                    _ => ("", self.path.as_slice()),
                };
                let parent = render_path(parent);
                if parent.is_empty() {
                    write!(f, "must have required property '{name}'")
                } else {
                    write!(f, "{parent} must have required property '{name}'")
                }
            }
            ViolationKind::WrongType { expected } => {
                write!(f, "{} must be {expected}", render_path(&self.path))
            }
            ViolationKind::InvalidValue => {
                write!(f, "{} must be equal to one of the allowed values", render_path(&self.path))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Structural validation
// ---------------------------------------------------------------------------

fn check(value: &Value, schema: &Schema, path: &mut Vec<PathSegment>) -> Result<(), SchemaViolation> {
    let wrong = |path: &[PathSegment], expected| SchemaViolation {
        path: path.to_vec(),
        kind: ViolationKind::WrongType { expected },
    };

    match schema {
        Schema::Any => Ok(()),
        Schema::String if value.is_string() => Ok(()),
        Schema::String => Err(wrong(path, "string")),
        Schema::Integer if value.is_i64() || value.is_u64() => Ok(()),
        Schema::Integer => Err(wrong(path, "integer")),
        Schema::Number if value.is_number() => Ok(()),
        Schema::Number => Err(wrong(path, "number")),
        Schema::Bool if value.is_boolean() => Ok(()),
        Schema::Bool => Err(wrong(path, "boolean")),
        Schema::Enum(allowed) => match value.as_str() {
            Some(s) if allowed.contains(&s) => Ok(()),
            Some(_) => Err(SchemaViolation {
                path: path.to_vec(),
                kind: ViolationKind::InvalidValue,
            }),
            None => Err(wrong(path, "string")),
        },
        Schema::Array(item) => {
            let items = value.as_array().ok_or_else(|| wrong(path, "array"))?;
            for (i, v) in items.iter().enumerate() {
                path.push(PathSegment::Index(i));
                check(v, item, path)?;
                path.pop();
            }
            Ok(())
        }
        Schema::Object(fields) => {
            let object = value.as_object().ok_or_else(|| wrong(path, "object"))?;
            check_fields(object, fields, path)
        }
    }
}

fn check_fields(
    object: &serde_json::Map<String, Value>,
    fields: &[Field],
    path: &mut Vec<PathSegment>,
) -> Result<(), SchemaViolation> {
    for field in fields {
        path.push(PathSegment::Field(field.name));
        match object.get(field.name) {
            None | Some(Value::Null) if field.required => {
                return Err(SchemaViolation {
                    path: path.clone(),
                    kind: ViolationKind::MissingProperty,
                })
            }
            None | Some(Value::Null) => {}
            Some(value) => check(value, &field.schema, path)?,
        }
        path.pop();
    }
    Ok(())
}

/// Structural check of `body` for `endpoint`.
pub fn validate_schema(endpoint: &str, body: &Value) -> Result<(), SchemaViolation> {
    let Some(fields) = schema_for(endpoint) else {
        return Ok(());
    };
    let mut path = Vec::new();
    let object = body.as_object().ok_or_else(|| SchemaViolation {
        path: Vec::new(),
        kind: ViolationKind::WrongType { expected: "object" },
    })?;
    check_fields(object, fields, &mut path)
}

// ---------------------------------------------------------------------------
// Semantic validation
// ---------------------------------------------------------------------------

/// Even-length hex, with or without `0x`.
pub fn is_valid_hex(s: &str) -> bool {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    digits.len() % 2 == 0 && digits.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Validates an identifier hash and prefixes it with `0x` in place.
fn normalize_hash(object: Option<&mut Value>, kind: RosettaErrorKind) -> Result<(), RosettaError> {
    let Some(hash) = object.and_then(|o| o.get_mut("hash")) else {
        return Ok(());
    };
    let Some(s) = hash.as_str() else {
        return Ok(());
    };
    if !is_valid_hex(s) {
        return Err(RosettaError::with_message(kind, format!("invalid hash '{s}'")));
    }
    if !s.starts_with("0x") {
        *hash = Value::String(format!("0x{s}"));
    }
    Ok(())
}

fn check_network(body: &Value, config: &RosettaConfig) -> Result<(), RosettaError> {
    let Some(network_identifier) = body.get("network_identifier") else {
        return Ok(());
    };
    if let Some(blockchain) = network_identifier.get("blockchain").and_then(Value::as_str) {
        if blockchain != config.blockchain() {
            return Err(RosettaError::with_message(
                RosettaErrorKind::InvalidBlockchain,
                format!("expected '{}', got '{blockchain}'", config.blockchain()),
            ));
        }
    }
    if let Some(network) = network_identifier.get("network").and_then(Value::as_str) {
        if network != config.network.as_str() {
            return Err(RosettaError::with_message(
                RosettaErrorKind::InvalidNetwork,
                format!("expected '{}', got '{network}'", config.network.as_str()),
            ));
        }
    }
    Ok(())
}

fn check_account(body: &Value) -> Result<(), RosettaError> {
    let Some(address) = body
        .get("account_identifier")
        .and_then(|a| a.get("address"))
        .and_then(Value::as_str)
    else {
        return Ok(());
    };
    address
        .parse::<StacksAddress>()
        .map(|_| ())
        .map_err(|e| RosettaError::with_message(RosettaErrorKind::InvalidAccount, e))
}

/// Runs both phases. `body` may be rewritten (hash prefixes).
pub fn validate_request(endpoint: &str, body: &mut Value, config: &RosettaConfig) -> Result<(), RosettaError> {
    validate_schema(endpoint, body).map_err(SchemaViolation::into_error)?;

    check_network(body, config)?;
    normalize_hash(body.get_mut("block_identifier"), RosettaErrorKind::InvalidBlockHash)?;
    normalize_hash(
        body.get_mut("transaction_identifier"),
        RosettaErrorKind::InvalidTransactionHash,
    )?;
    check_account(body)
}

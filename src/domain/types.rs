//! Core decode-tree model
//!
//! Everything here is built fresh per decode call and immutable once
//! constructed. Numeric leaves are stringified when the tree is built, so
//! serializing a tree with plain serde_json is lossless for uint256-sized
//! values.

use alloy_dyn_abi::DynSolValue;
use alloy_primitives::{Address, Bytes, U256};
use serde::Serialize;

/// Function name used when bytes were decoded as a bare ABI-encoded payload
/// rather than a `selector + params` call. Consumers must not render this as
/// a callable function name.
pub const RAW_PARAMETERS_NAME: &str = "__abi_decoded__";

/// Where the schema behind a decode came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CallSource {
    /// Verified-source ABI fetched for the target address
    VerifiedAbi,
    /// ABI supplied locally (scanned artifact files)
    LocalAbi,
    /// Signature-database lookup by selector
    SignatureLookup,
    /// Safe MultiSend packed batch
    MultiSend,
    /// Function fragment inferred from the encoding shape
    GuessedFragment,
    /// Whole input treated as an ABI-encoded tuple (no selector)
    RawParameters,
}

/// One input parameter: name plus canonical Solidity type.
///
/// `kind` is the canonical type string (`uint256`, `(uint8,address)`,
/// `address[]`); tuple member specs live in `components`.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: String,
    pub kind: String,
    pub components: Vec<ParamSpec>,
}

impl ParamSpec {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            components: Vec::new(),
        }
    }

    /// ABI base type family used for recursion dispatch:
    /// `array`, `tuple`, `uint`, `int`, `bytes`, or the type itself.
    pub fn base_type(&self) -> &'static str {
        base_type_of(&self.kind)
    }

    /// Spec for one element of an array type (strips the last `[..]`).
    pub fn element_spec(&self) -> ParamSpec {
        let kind = match self.kind.rfind('[') {
            Some(idx) => self.kind[..idx].to_string(),
            None => self.kind.clone(),
        };
        ParamSpec {
            name: self.name.clone(),
            kind,
            components: self.components.clone(),
        }
    }
}

/// Classify a canonical type string into its base family.
pub fn base_type_of(kind: &str) -> &'static str {
    if kind.ends_with(']') {
        "array"
    } else if kind.starts_with('(') || kind == "tuple" || kind.starts_with("tuple") {
        "tuple"
    } else if kind.starts_with("uint") {
        "uint"
    } else if kind.starts_with("int") {
        "int"
    } else if kind.starts_with("bytes") {
        "bytes"
    } else if kind == "address" {
        "address"
    } else if kind == "bool" {
        "bool"
    } else if kind == "string" {
        "string"
    } else {
        "unknown"
    }
}

/// Flat, one-level decode of a single call: the schema that matched plus the
/// raw decoded values in declaration order.
#[derive(Debug, Clone)]
pub struct FlatCall {
    pub name: String,
    pub signature: String,
    pub source: CallSource,
    pub inputs: Vec<ParamSpec>,
    pub values: Vec<DynSolValue>,
}

/// Fully expanded decode tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedCall {
    pub function_name: String,
    pub signature: String,
    pub source: CallSource,
    pub args: Vec<DecodedParam>,
}

/// One decoded parameter node. `raw_value` is the flat string form;
/// `value` is the structurally expanded form.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedParam {
    pub name: String,
    pub base_type: String,
    #[serde(rename = "type")]
    pub ty: String,
    pub raw_value: String,
    pub value: ParamValue,
}

/// Expanded parameter value.
///
/// A `bytes` value shorter than 4 bytes stays `Plain` (no decode was
/// attempted); `Nested { decoded: None }` means a nested decode was attempted
/// and failed. Callers can and should distinguish the two.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Stringified primitive (ints in decimal, bytes as 0x hex)
    Plain(String),
    /// Bytes value re-submitted to the pipeline as nested calldata
    Nested { decoded: Option<Box<DecodedCall>> },
    /// Tuple components, positional
    Tuple(Vec<DecodedParam>),
    /// Array elements, in encoding order
    Array(Vec<DecodedParam>),
}

/// One entry of a Safe MultiSend packed batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiSendEntry {
    pub operation: u8,
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
}

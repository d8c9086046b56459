//! Decode strategy orchestration
//!
//! `Decoder` tries a fixed priority order of speculative strategies and
//! stops at the first one that produces a plausible decode. Every strategy
//! failure is caught and logged; only total exhaustion yields `None`.

use std::sync::Arc;

use alloy_dyn_abi::{DynSolType, DynSolValue};
use alloy_primitives::{Address, U256};
use tracing::{debug, warn};

use crate::domain::{
    AbiRegistry, AbiSource, CallSource, FlatCall, MultiSendEntry, ParamSpec, SignatureSource,
    RAW_PARAMETERS_NAME,
};

use super::{abi, guess, multisend};

/// Default bound on nested-bytes recursion depth.
pub const DEFAULT_MAX_DEPTH: usize = 8;

/// The decode pipeline with its collaborators.
///
/// Construction is additive: a bare `Decoder::new()` works fully offline
/// (multisend + shape guessing only); sources widen the strategy set.
pub struct Decoder {
    abis: Option<Arc<dyn AbiSource>>,
    signatures: Option<Arc<dyn SignatureSource>>,
    registry: AbiRegistry,
    pub(crate) max_depth: usize,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder {
    pub fn new() -> Self {
        Self {
            abis: None,
            signatures: None,
            registry: AbiRegistry::new(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Use a verified-ABI lookup source (e.g. Sourcify).
    pub fn with_abi_source(mut self, source: Arc<dyn AbiSource>) -> Self {
        self.abis = Some(source);
        self
    }

    /// Use a signature-database lookup source.
    pub fn with_signature_source(mut self, source: Arc<dyn SignatureSource>) -> Self {
        self.signatures = Some(source);
        self
    }

    /// Use locally scanned ABIs, consulted before any network lookup.
    pub fn with_registry(mut self, registry: AbiRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Bound nested-bytes recursion depth.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Decode with address context: try the verified ABI for the target
    /// first, and fall through to selector-based decoding on any failure.
    pub async fn decode_with_address(
        &self,
        calldata: &[u8],
        address: Address,
        chain_id: u64,
    ) -> Option<FlatCall> {
        if calldata.len() >= 4 {
            if let Some(source) = &self.abis {
                match source.fetch_contract_abi(chain_id, address).await {
                    Ok(Some(contract)) => {
                        match abi::decode_with_abi(&contract.abi, calldata, CallSource::VerifiedAbi)
                        {
                            Ok(call) => return Some(call),
                            Err(err) => {
                                debug!(%address, chain_id, "verified ABI decode failed: {err:#}")
                            }
                        }
                    }
                    Ok(None) => debug!(%address, chain_id, "no verified ABI for address"),
                    Err(err) => warn!(%address, chain_id, "ABI lookup failed: {err:#}"),
                }
            }
        }
        self.decode_with_selector(calldata).await
    }

    /// Decode without address context, trying in order: local registry,
    /// resolved signatures, MultiSend, guessed fragment, raw parameters.
    pub async fn decode_with_selector(&self, calldata: &[u8]) -> Option<FlatCall> {
        if calldata.len() < 4 {
            return None;
        }
        let mut selector = [0u8; 4];
        selector.copy_from_slice(&calldata[..4]);

        if let Some(known) = self.registry.lookup(selector) {
            match abi::decode_with_function(&known.function, calldata, CallSource::LocalAbi) {
                Ok(call) => return Some(call),
                Err(err) => debug!(
                    selector = %known.selector_hex(),
                    "local ABI decode failed: {err:#}"
                ),
            }
        }

        if let Some(source) = &self.signatures {
            for signature in source.fetch_function_signatures(selector).await {
                match abi::decode_with_signature(&signature, calldata, CallSource::SignatureLookup)
                {
                    Ok(call) => return Some(call),
                    Err(err) => debug!(%signature, "resolved signature rejected: {err:#}"),
                }
            }
        }

        // MultiSend payloads are raw parameter lists with no selector, so
        // this is attempted unconditionally
        match multisend::parse_multi_send(calldata) {
            Ok(entries) => return Some(multisend_call(entries)),
            Err(err) => debug!("not a MultiSend payload: {err}"),
        }

        if let Some(types) = guess::guess_parameter_types(&calldata[4..]) {
            if let Some(call) = guessed_fragment_call(selector, &calldata[4..], types) {
                return Some(call);
            }
        }

        if let Some(types) = guess::guess_parameter_types(calldata) {
            if let Some(call) = raw_parameters_call(calldata, types) {
                return Some(call);
            }
        }

        debug!(
            selector = %format!("0x{}", hex::encode(selector)),
            "all decode strategies exhausted"
        );
        None
    }
}

/// Present a MultiSend batch as a synthetic call with one
/// `(operation, to, value, data)` tuple argument per entry, so the
/// recursive decoder expands each inner `data` like any other parameter.
fn multisend_call(entries: Vec<MultiSendEntry>) -> FlatCall {
    let inputs = (0..entries.len())
        .map(|i| ParamSpec {
            name: format!("tx{i}"),
            kind: "(uint8,address,uint256,bytes)".to_string(),
            components: vec![
                ParamSpec::new("operation", "uint8"),
                ParamSpec::new("to", "address"),
                ParamSpec::new("value", "uint256"),
                ParamSpec::new("data", "bytes"),
            ],
        })
        .collect();

    let values = entries
        .into_iter()
        .map(|entry| {
            DynSolValue::Tuple(vec![
                DynSolValue::Uint(U256::from(entry.operation), 8),
                DynSolValue::Address(entry.to),
                DynSolValue::Uint(entry.value, 256),
                DynSolValue::Bytes(entry.data.to_vec()),
            ])
        })
        .collect();

    FlatCall {
        name: "multiSendTransactions".to_string(),
        signature: String::new(),
        source: CallSource::MultiSend,
        inputs,
        values,
    }
}

/// Decode the post-selector bytes against a guessed type layout.
fn guessed_fragment_call(
    selector: [u8; 4],
    args_data: &[u8],
    types: Vec<DynSolType>,
) -> Option<FlatCall> {
    let values = decode_as_tuple(&types, args_data)?;
    let selector_hex = hex::encode(selector);
    let type_names: Vec<String> = types.iter().map(|t| t.sol_type_name().into_owned()).collect();

    Some(FlatCall {
        name: format!("unresolved_{selector_hex}"),
        signature: format!("unresolved_{selector_hex}({})", type_names.join(",")),
        source: CallSource::GuessedFragment,
        inputs: type_names
            .iter()
            .enumerate()
            .map(|(i, ty)| ParamSpec::new(format!("arg{i}"), ty.clone()))
            .collect(),
        values,
    })
}

/// Decode the whole input (no selector split) against a guessed layout.
fn raw_parameters_call(data: &[u8], types: Vec<DynSolType>) -> Option<FlatCall> {
    let values = decode_as_tuple(&types, data)?;

    // a single decoded value identical to the input is not a decode
    if let [value] = values.as_slice() {
        let degenerate = match value {
            DynSolValue::Bytes(bytes) => bytes == data,
            DynSolValue::FixedBytes(word, size) => &word[..*size] == data,
            _ => false,
        };
        if degenerate {
            return None;
        }
    }

    let type_names: Vec<String> = types.iter().map(|t| t.sol_type_name().into_owned()).collect();
    Some(FlatCall {
        name: RAW_PARAMETERS_NAME.to_string(),
        signature: String::new(),
        source: CallSource::RawParameters,
        inputs: type_names
            .iter()
            .enumerate()
            .map(|(i, ty)| ParamSpec::new(format!("arg{i}"), ty.clone()))
            .collect(),
        values,
    })
}

fn decode_as_tuple(types: &[DynSolType], data: &[u8]) -> Option<Vec<DynSolValue>> {
    let tuple_type = DynSolType::Tuple(types.to_vec());
    match tuple_type.abi_decode(data) {
        Ok(DynSolValue::Tuple(values)) => Some(values),
        Ok(other) => Some(vec![other]),
        Err(err) => {
            debug!("guessed layout failed to decode: {err}");
            None
        }
    }
}

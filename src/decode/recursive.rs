//! Recursive structural decoding
//!
//! Takes the flat decode produced by the strategy orchestrator and expands
//! it into a tree: every `bytes`-typed leaf that could itself be calldata is
//! re-submitted to the whole pipeline, tuples and arrays are walked
//! per-element with their type metadata preserved, numeric values are
//! stringified. Sibling elements carry no data dependency on each other, so
//! they are expanded concurrently.

use alloy_dyn_abi::DynSolValue;
use alloy_primitives::Address;
use futures::future::{join_all, BoxFuture};
use tracing::debug;

use crate::domain::{DecodedCall, DecodedParam, FlatCall, ParamSpec, ParamValue};

use super::strategy::Decoder;

impl Decoder {
    /// Decode calldata into a fully expanded tree.
    ///
    /// With `context`, the verified ABI for the target address is tried
    /// first; without it decoding is selector-based. Returns `None` only
    /// when the root-level decode itself fails; nested failures degrade to
    /// `ParamValue::Nested { decoded: None }` at their leaf.
    pub async fn decode_recursive(
        &self,
        calldata: &[u8],
        context: Option<(Address, u64)>,
    ) -> Option<DecodedCall> {
        self.decode_nested(calldata, context, self.max_depth).await
    }

    fn decode_nested<'a>(
        &'a self,
        calldata: &'a [u8],
        context: Option<(Address, u64)>,
        depth: usize,
    ) -> BoxFuture<'a, Option<DecodedCall>> {
        Box::pin(async move {
            let flat = match context {
                Some((address, chain_id)) => {
                    self.decode_with_address(calldata, address, chain_id).await
                }
                None => self.decode_with_selector(calldata).await,
            }?;
            Some(self.expand_call(flat, depth).await)
        })
    }

    async fn expand_call(&self, flat: FlatCall, depth: usize) -> DecodedCall {
        let args = join_all(
            flat.inputs
                .iter()
                .zip(flat.values.iter())
                .map(|(spec, value)| self.expand_param(spec, value, depth)),
        )
        .await;

        DecodedCall {
            function_name: flat.name,
            signature: flat.signature,
            source: flat.source,
            args,
        }
    }

    fn expand_param<'a>(
        &'a self,
        spec: &'a ParamSpec,
        value: &'a DynSolValue,
        depth: usize,
    ) -> BoxFuture<'a, DecodedParam> {
        Box::pin(async move {
            let base_type = spec.base_type();
            let raw_value = raw_display(value);

            let expanded = match (base_type, value) {
                ("bytes", DynSolValue::Bytes(bytes)) => self.expand_bytes(bytes, depth).await,
                ("bytes", DynSolValue::FixedBytes(word, size)) => {
                    self.expand_bytes(&word[..(*size).min(32)], depth).await
                }
                ("tuple", DynSolValue::Tuple(values)) => {
                    let specs = component_specs(spec, values);
                    let params = join_all(
                        specs
                            .iter()
                            .zip(values.iter())
                            .map(|(spec, value)| self.expand_param(spec, value, depth)),
                    )
                    .await;
                    ParamValue::Tuple(params)
                }
                ("array", DynSolValue::Array(values))
                | ("array", DynSolValue::FixedArray(values)) => {
                    let element = spec.element_spec();
                    let params = join_all(
                        values
                            .iter()
                            .map(|value| self.expand_param(&element, value, depth)),
                    )
                    .await;
                    ParamValue::Array(params)
                }
                // a non-array value under an array type degrades to empty
                ("array", _) => ParamValue::Array(Vec::new()),
                // ints/uints are already stringified in decimal; addresses
                // and everything else pass through
                _ => ParamValue::Plain(raw_value.clone()),
            };

            DecodedParam {
                name: spec.name.clone(),
                base_type: base_type.to_string(),
                ty: spec.kind.clone(),
                raw_value,
                value: expanded,
            }
        })
    }

    /// Bytes values long enough to carry a selector are re-submitted to the
    /// pipeline; shorter values stay opaque with no decode attempted. The
    /// depth budget keeps adversarially nested payloads from recursing
    /// without bound.
    async fn expand_bytes(&self, bytes: &[u8], depth: usize) -> ParamValue {
        if bytes.len() < 4 {
            return ParamValue::Plain(format!("0x{}", hex::encode(bytes)));
        }
        if depth == 0 {
            debug!("recursion depth budget exhausted, leaving bytes opaque");
            return ParamValue::Plain(format!("0x{}", hex::encode(bytes)));
        }
        let decoded = self.decode_nested(bytes, None, depth - 1).await;
        ParamValue::Nested {
            decoded: decoded.map(Box::new),
        }
    }
}

/// Tuple member specs: use the declared components when they line up,
/// otherwise synthesize positional specs from the values themselves.
fn component_specs(spec: &ParamSpec, values: &[DynSolValue]) -> Vec<ParamSpec> {
    if spec.components.len() == values.len() {
        spec.components.clone()
    } else {
        values
            .iter()
            .enumerate()
            .map(|(i, value)| {
                let kind = value
                    .sol_type_name()
                    .map(|name| name.into_owned())
                    .unwrap_or_else(|| "bytes".to_string());
                ParamSpec::new(format!("{i}"), kind)
            })
            .collect()
    }
}

/// Flat string form of a decoded value: decimal for numbers, 0x hex for
/// bytes, checksummed for addresses, recursively joined for aggregates.
pub fn raw_display(value: &DynSolValue) -> String {
    match value {
        DynSolValue::Bool(b) => b.to_string(),
        DynSolValue::Int(i, _) => i.to_string(),
        DynSolValue::Uint(u, _) => u.to_string(),
        // bytesN is right-padded in the word, so take the first `size` bytes
        DynSolValue::FixedBytes(word, size) => {
            format!("0x{}", hex::encode(&word[..(*size).min(32)]))
        }
        DynSolValue::Address(address) => address.to_string(),
        DynSolValue::Function(f) => format!("0x{}", hex::encode(f)),
        DynSolValue::Bytes(bytes) => format!("0x{}", hex::encode(bytes)),
        DynSolValue::String(s) => s.clone(),
        DynSolValue::Array(values) | DynSolValue::FixedArray(values) => {
            let items: Vec<String> = values.iter().map(raw_display).collect();
            format!("[{}]", items.join(", "))
        }
        DynSolValue::Tuple(values) => {
            let items: Vec<String> = values.iter().map(raw_display).collect();
            format!("({})", items.join(", "))
        }
        other => format!("{other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::U256;

    use crate::domain::CallSource;

    fn transfer_calldata() -> Vec<u8> {
        hex::decode(concat!(
            "a9059cbb",
            "000000000000000000000000d8da6bf26964af9d7eed9e03e53415d37aa96045",
            "0000000000000000000000000000000000000000000000000de0b6b3a7640000",
        ))
        .unwrap()
    }

    #[test]
    fn test_raw_display_scalars() {
        assert_eq!(
            raw_display(&DynSolValue::Uint(U256::from(1000u64), 256)),
            "1000"
        );
        assert_eq!(raw_display(&DynSolValue::Bool(true)), "true");
        assert_eq!(
            raw_display(&DynSolValue::Bytes(vec![0xde, 0xad])),
            "0xdead"
        );
        assert_eq!(
            raw_display(&DynSolValue::FixedBytes(alloy_primitives::B256::ZERO, 4)),
            "0x00000000"
        );
    }

    #[tokio::test]
    async fn test_short_bytes_stay_opaque() {
        // decoding f(bytes) where the bytes value is 2 bytes long: no
        // recursive attempt may happen, so the value stays Plain
        let calldata = build_bytes_call(&[0x12, 0x34]);
        let decoder = Decoder::new();

        // decode against the known signature directly to keep this offline
        let flat = crate::decode::abi::decode_with_signature(
            "execute(bytes payload)",
            &calldata,
            CallSource::LocalAbi,
        )
        .unwrap();
        let call = decoder.expand_call(flat, decoder.max_depth).await;

        assert_eq!(call.args.len(), 1);
        assert_eq!(call.args[0].base_type, "bytes");
        assert_eq!(call.args[0].value, ParamValue::Plain("0x1234".to_string()));
    }

    #[tokio::test]
    async fn test_undecodable_nested_bytes_yield_null_decode() {
        // 4 bytes of garbage: long enough to attempt a nested decode, which
        // fails everywhere -> Nested { decoded: None }, distinguishable from
        // the Plain passthrough above
        let calldata = build_bytes_call(&[0xde, 0xad, 0xbe, 0xef]);
        let decoder = Decoder::new();

        let flat = crate::decode::abi::decode_with_signature(
            "execute(bytes payload)",
            &calldata,
            CallSource::LocalAbi,
        )
        .unwrap();
        let call = decoder.expand_call(flat, decoder.max_depth).await;

        assert_eq!(call.args[0].value, ParamValue::Nested { decoded: None });
    }

    #[tokio::test]
    async fn test_nested_calldata_expands() {
        let calldata = build_bytes_call(&transfer_calldata());
        let mut registry = crate::domain::AbiRegistry::new();
        registry.insert(
            alloy_json_abi::Function::parse("transfer(address to, uint256 amount)").unwrap(),
            std::path::PathBuf::from("erc20.json"),
        );
        let decoder = Decoder::new().with_registry(registry);

        let flat = crate::decode::abi::decode_with_signature(
            "execute(bytes payload)",
            &calldata,
            CallSource::LocalAbi,
        )
        .unwrap();
        let call = decoder.expand_call(flat, decoder.max_depth).await;

        match &call.args[0].value {
            ParamValue::Nested { decoded: Some(inner) } => {
                assert_eq!(inner.function_name, "transfer");
                assert_eq!(inner.args.len(), 2);
                assert_eq!(inner.args[0].name, "to");
                assert_eq!(
                    inner.args[1].value,
                    ParamValue::Plain("1000000000000000000".to_string())
                );
            }
            other => panic!("expected nested decode, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_depth_budget_stops_recursion() {
        let calldata = build_bytes_call(&transfer_calldata());
        let decoder = Decoder::new().with_max_depth(0);

        let flat = crate::decode::abi::decode_with_signature(
            "execute(bytes payload)",
            &calldata,
            CallSource::LocalAbi,
        )
        .unwrap();
        let call = decoder.expand_call(flat, 0).await;

        // at the budget the bytes leaf stays opaque instead of recursing
        assert!(matches!(call.args[0].value, ParamValue::Plain(_)));
    }

    /// ABI-encode `execute(bytes)` calldata around an inner payload.
    fn build_bytes_call(payload: &[u8]) -> Vec<u8> {
        let func = alloy_json_abi::Function::parse("execute(bytes payload)").unwrap();
        let mut out = func.selector().to_vec();
        let encoded = DynSolValue::Tuple(vec![DynSolValue::Bytes(payload.to_vec())]).abi_encode_params();
        out.extend_from_slice(&encoded);
        out
    }
}

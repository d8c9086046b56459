//! ABI decoding wrappers using alloy-dyn-abi

use alloy_dyn_abi::{DynSolType, DynSolValue};
use alloy_json_abi::{Function, JsonAbi, Param};
use anyhow::{bail, Context, Result};

use crate::domain::{CallSource, FlatCall, ParamSpec};

/// Convert an ABI input parameter into a spec, keeping tuple components.
pub fn param_spec(param: &Param) -> ParamSpec {
    ParamSpec {
        name: param.name.clone(),
        kind: param.selector_type().into_owned(),
        components: param.components.iter().map(param_spec).collect(),
    }
}

/// Decode calldata against a human-readable signature.
///
/// Uses `alloy_json_abi::Function::parse()` for signature parsing, so both
/// bare (`transfer(address,uint256)`) and named-parameter forms work.
pub fn decode_with_signature(signature: &str, data: &[u8], source: CallSource) -> Result<FlatCall> {
    let func = Function::parse(signature)
        .with_context(|| format!("invalid signature '{signature}'"))?;
    decode_with_function(&func, data, source)
}

/// Decode calldata against one parsed function.
pub fn decode_with_function(func: &Function, data: &[u8], source: CallSource) -> Result<FlatCall> {
    if data.len() < 4 {
        bail!("calldata too short (need at least 4 bytes for selector)");
    }

    let selector = func.selector();
    if data[..4] != selector[..] {
        bail!(
            "selector mismatch: got 0x{}, expected 0x{}",
            hex::encode(&data[..4]),
            hex::encode(selector)
        );
    }

    decode_inputs(func, &data[4..], source)
}

/// Decode calldata against a full ABI, matching the selector against every
/// function in it.
pub fn decode_with_abi(abi: &JsonAbi, data: &[u8], source: CallSource) -> Result<FlatCall> {
    if data.len() < 4 {
        bail!("calldata too short (need at least 4 bytes for selector)");
    }

    let func = abi
        .functions()
        .find(|f| f.selector()[..] == data[..4])
        .with_context(|| format!("no function with selector 0x{}", hex::encode(&data[..4])))?;

    decode_inputs(func, &data[4..], source)
}

/// Decode the post-selector argument bytes as the function's input tuple.
fn decode_inputs(func: &Function, args_data: &[u8], source: CallSource) -> Result<FlatCall> {
    let inputs: Vec<ParamSpec> = func.inputs.iter().map(param_spec).collect();

    let types: Vec<DynSolType> = inputs
        .iter()
        .map(|spec| {
            spec.kind.parse::<DynSolType>().with_context(|| {
                format!("failed to parse type '{}' for param '{}'", spec.kind, spec.name)
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let values = if types.is_empty() {
        // a no-argument function must not carry trailing bytes, otherwise a
        // speculative match would succeed against arbitrary data
        if !args_data.is_empty() {
            bail!(
                "function '{}' takes no arguments but calldata has {} extra bytes",
                func.name,
                args_data.len()
            );
        }
        Vec::new()
    } else {
        let tuple_type = DynSolType::Tuple(types);
        let decoded = tuple_type
            .abi_decode(args_data)
            .context("failed to decode calldata")?;

        match decoded {
            DynSolValue::Tuple(values) => values,
            other => vec![other],
        }
    };

    Ok(FlatCall {
        name: func.name.clone(),
        signature: func.signature(),
        source,
        inputs,
        values,
    })
}

//! Offline end-to-end tests for the decode pipeline
//!
//! The network collaborators are stubbed through the domain traits, so these
//! tests exercise the full strategy chain and recursive expansion without
//! touching any external service.

use std::collections::HashMap;
use std::sync::Arc;

use alloy_json_abi::JsonAbi;
use alloy_primitives::{Address, U256};
use async_trait::async_trait;

use peel::decode::{encode_multi_send, Decoder};
use peel::domain::{
    AbiSource, CallSource, ContractAbi, MultiSendEntry, ParamValue, SignatureSource,
    RAW_PARAMETERS_NAME,
};

const TOKEN: Address = Address::new([0x42; 20]);
const RECIPIENT: &str = "d8da6bf26964af9d7eed9e03e53415d37aa96045";

struct StaticAbis(HashMap<(u64, Address), ContractAbi>);

#[async_trait]
impl AbiSource for StaticAbis {
    async fn fetch_contract_abi(
        &self,
        chain_id: u64,
        address: Address,
    ) -> anyhow::Result<Option<ContractAbi>> {
        Ok(self.0.get(&(chain_id, address)).cloned())
    }
}

struct StaticSignatures(HashMap<[u8; 4], Vec<String>>);

#[async_trait]
impl SignatureSource for StaticSignatures {
    async fn fetch_function_signatures(&self, selector: [u8; 4]) -> Vec<String> {
        self.0.get(&selector).cloned().unwrap_or_default()
    }
}

fn erc20_abi() -> JsonAbi {
    serde_json::from_str(
        r#"[
            {"type":"function","name":"transfer","stateMutability":"nonpayable",
             "inputs":[{"name":"to","type":"address"},{"name":"amount","type":"uint256"}],
             "outputs":[{"name":"","type":"bool"}]}
        ]"#,
    )
    .unwrap()
}

/// transfer(0xd8dA...6045, 1e18)
fn transfer_calldata() -> Vec<u8> {
    hex::decode(format!(
        "a9059cbb000000000000000000000000{RECIPIENT}0000000000000000000000000000000000000000000000000de0b6b3a7640000"
    ))
    .unwrap()
}

fn abi_decoder() -> Decoder {
    let abis = StaticAbis(HashMap::from([(
        (1u64, TOKEN),
        ContractAbi {
            abi: erc20_abi(),
            name: Some("TestToken".to_string()),
        },
    )]));
    Decoder::new().with_abi_source(Arc::new(abis))
}

#[tokio::test]
async fn transfer_decodes_from_known_abi() {
    let decoder = abi_decoder();
    let tree = decoder
        .decode_recursive(&transfer_calldata(), Some((TOKEN, 1)))
        .await
        .expect("decode should succeed");

    assert_eq!(tree.function_name, "transfer");
    assert_eq!(tree.signature, "transfer(address,uint256)");
    assert_eq!(tree.source, CallSource::VerifiedAbi);
    assert_eq!(tree.args.len(), 2);

    assert_eq!(tree.args[0].name, "to");
    assert_eq!(tree.args[0].base_type, "address");
    match &tree.args[0].value {
        ParamValue::Plain(addr) => {
            assert_eq!(addr.to_lowercase(), format!("0x{RECIPIENT}"));
        }
        other => panic!("expected address passthrough, got {other:?}"),
    }

    assert_eq!(tree.args[1].name, "amount");
    assert_eq!(tree.args[1].base_type, "uint");
    assert_eq!(
        tree.args[1].value,
        ParamValue::Plain("1000000000000000000".to_string())
    );
}

#[tokio::test]
async fn decoding_is_idempotent() {
    let decoder = abi_decoder();
    let first = decoder
        .decode_recursive(&transfer_calldata(), Some((TOKEN, 1)))
        .await
        .unwrap();
    let second = decoder
        .decode_recursive(&transfer_calldata(), Some((TOKEN, 1)))
        .await
        .unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn unknown_address_falls_back_to_signature_lookup() {
    let signatures = StaticSignatures(HashMap::from([(
        [0xa9, 0x05, 0x9c, 0xbb],
        vec!["transfer(address,uint256)".to_string()],
    )]));
    let decoder = abi_decoder().with_signature_source(Arc::new(signatures));

    let other_address = Address::new([0x99; 20]);
    let tree = decoder
        .decode_recursive(&transfer_calldata(), Some((other_address, 1)))
        .await
        .unwrap();

    assert_eq!(tree.function_name, "transfer");
    assert_eq!(tree.source, CallSource::SignatureLookup);
}

#[tokio::test]
async fn incompatible_resolved_signature_is_rejected() {
    // the resolver answer cannot decode the actual bytes, so the pipeline
    // must fall through instead of returning a garbage decode
    let signatures = StaticSignatures(HashMap::from([(
        [0xa9, 0x05, 0x9c, 0xbb],
        vec!["transferFrom(address,address,uint256)".to_string()],
    )]));
    let decoder = Decoder::new().with_signature_source(Arc::new(signatures));

    let tree = decoder
        .decode_recursive(&transfer_calldata(), None)
        .await
        .unwrap();
    assert_eq!(tree.source, CallSource::GuessedFragment);
    assert_eq!(tree.function_name, "unresolved_a9059cbb");
}

#[tokio::test]
async fn multisend_batch_expands_nested_transfers() {
    let entries = vec![
        MultiSendEntry {
            operation: 0,
            to: TOKEN,
            value: U256::ZERO,
            data: transfer_calldata().into(),
        },
        MultiSendEntry {
            operation: 0,
            to: Address::new([0x55; 20]),
            value: U256::from(7u64),
            data: alloy_primitives::Bytes::new(),
        },
    ];
    let blob = encode_multi_send(&entries);

    let signatures = StaticSignatures(HashMap::from([(
        [0xa9, 0x05, 0x9c, 0xbb],
        vec!["transfer(address,uint256)".to_string()],
    )]));
    let decoder = Decoder::new().with_signature_source(Arc::new(signatures));

    let tree = decoder.decode_recursive(&blob, None).await.unwrap();
    assert_eq!(tree.source, CallSource::MultiSend);
    assert_eq!(tree.args.len(), 2);

    // first entry: tuple whose `data` component decoded as a transfer
    let ParamValue::Tuple(components) = &tree.args[0].value else {
        panic!("expected tuple entry");
    };
    assert_eq!(components.len(), 4);
    assert_eq!(components[0].name, "operation");
    assert_eq!(components[0].value, ParamValue::Plain("0".to_string()));
    assert_eq!(components[3].name, "data");
    match &components[3].value {
        ParamValue::Nested { decoded: Some(inner) } => {
            assert_eq!(inner.function_name, "transfer");
            assert_eq!(
                inner.args[1].value,
                ParamValue::Plain("1000000000000000000".to_string())
            );
        }
        other => panic!("expected nested transfer decode, got {other:?}"),
    }

    // second entry: empty data stays an opaque passthrough, not a failed
    // nested decode
    let ParamValue::Tuple(components) = &tree.args[1].value else {
        panic!("expected tuple entry");
    };
    assert_eq!(components[3].value, ParamValue::Plain("0x".to_string()));
}

#[tokio::test]
async fn raw_abi_encoded_payload_uses_sentinel() {
    let payload = hex::decode(format!(
        "000000000000000000000000{RECIPIENT}0000000000000000000000000000000000000000000000000de0b6b3a7640000"
    ))
    .unwrap();

    let decoder = Decoder::new();
    let tree = decoder.decode_recursive(&payload, None).await.unwrap();

    assert_eq!(tree.function_name, RAW_PARAMETERS_NAME);
    assert_eq!(tree.source, CallSource::RawParameters);
    assert_eq!(tree.args.len(), 2);

    // the sentinel must not be rendered as a callable name; serialization
    // keeps it verbatim for consumers to special-case
    let json = serde_json::to_value(&tree).unwrap();
    assert_eq!(json["functionName"], RAW_PARAMETERS_NAME);
}

#[tokio::test]
async fn empty_calldata_returns_none_everywhere() {
    let decoder = abi_decoder();
    assert!(decoder.decode_recursive(&[], None).await.is_none());
    assert!(decoder
        .decode_recursive(&[], Some((TOKEN, 1)))
        .await
        .is_none());
    assert!(decoder.decode_with_selector(&[]).await.is_none());
}

#[tokio::test]
async fn tree_serializes_without_bigint_loss() {
    // amount far beyond f64/i64 precision must survive serialization intact
    let decoder = abi_decoder();
    let mut calldata = transfer_calldata();
    calldata.truncate(36);
    calldata.extend_from_slice(&U256::MAX.to_be_bytes::<32>());

    let tree = decoder
        .decode_recursive(&calldata, Some((TOKEN, 1)))
        .await
        .unwrap();
    let json = serde_json::to_value(&tree).unwrap();
    assert_eq!(
        json["args"][1]["value"],
        U256::MAX.to_string(),
        "uint256 values must serialize as decimal strings"
    );
}

#[tokio::test]
async fn nested_decode_preserves_argument_order() {
    let abi: JsonAbi = serde_json::from_str(
        r#"[
            {"type":"function","name":"swap","stateMutability":"nonpayable",
             "inputs":[
                {"name":"amountIn","type":"uint256"},
                {"name":"path","type":"address[]"},
                {"name":"deadline","type":"uint256"}],
             "outputs":[]}
        ]"#,
    )
    .unwrap();
    let func = abi.functions().next().unwrap().clone();

    let path = vec![Address::new([0x01; 20]), Address::new([0x02; 20])];
    let encoded = alloy_dyn_abi::DynSolValue::Tuple(vec![
        alloy_dyn_abi::DynSolValue::Uint(U256::from(500u64), 256),
        alloy_dyn_abi::DynSolValue::Array(
            path.iter()
                .map(|a| alloy_dyn_abi::DynSolValue::Address(*a))
                .collect(),
        ),
        alloy_dyn_abi::DynSolValue::Uint(U256::from(1_700_000_000u64), 256),
    ])
    .abi_encode_params();
    let mut calldata = func.selector().to_vec();
    calldata.extend_from_slice(&encoded);

    let abis = StaticAbis(HashMap::from([(
        (1u64, TOKEN),
        ContractAbi { abi, name: None },
    )]));
    let decoder = Decoder::new().with_abi_source(Arc::new(abis));

    let tree = decoder
        .decode_recursive(&calldata, Some((TOKEN, 1)))
        .await
        .unwrap();

    let names: Vec<&str> = tree.args.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["amountIn", "path", "deadline"]);

    let ParamValue::Array(elements) = &tree.args[1].value else {
        panic!("expected array expansion");
    };
    assert_eq!(elements.len(), 2);
    assert_eq!(elements[0].ty, "address");
    match (&elements[0].value, &elements[1].value) {
        (ParamValue::Plain(first), ParamValue::Plain(second)) => {
            assert!(first.to_lowercase().contains("0101010101"));
            assert!(second.to_lowercase().contains("0202020202"));
        }
        other => panic!("expected address elements, got {other:?}"),
    }
}

#[tokio::test]
async fn multisend_rejection_overshoot_is_not_silently_truncated() {
    let entries = vec![MultiSendEntry {
        operation: 0,
        to: TOKEN,
        value: U256::ZERO,
        data: transfer_calldata().into(),
    }];
    let mut blob = encode_multi_send(&entries);
    // declare one byte more data than the payload actually carries
    let len = blob.len();
    blob[84] = (transfer_calldata().len() + 1) as u8;
    assert_eq!(blob.len(), len);

    // the selector path has nothing for this blob and the MultiSend parse
    // must reject it outright; the garbage is not 32-byte aligned either, so
    // the whole decode comes back undecodable rather than truncated
    let decoder = Decoder::new();
    assert!(decoder.decode_recursive(&blob, None).await.is_none());
}

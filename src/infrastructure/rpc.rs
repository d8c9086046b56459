//! Transaction lookup over JSON-RPC
//!
//! Uses a raw JSON request for the fetch so non-standard transaction types
//! on L2 chains (deposit transactions and the like) parse fine: the decode
//! pipeline only ever needs `input` and `to`.

use std::collections::HashMap;

use alloy::providers::{Provider, ProviderBuilder};
use alloy_primitives::{Address, Bytes, B256};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;

use crate::domain::{FetchedTransaction, TransactionSource};

/// JSON-RPC backed transaction source with per-chain endpoints
pub struct RpcTransactionSource {
    endpoints: HashMap<u64, String>,
}

impl RpcTransactionSource {
    pub fn new(endpoints: HashMap<u64, String>) -> Self {
        Self { endpoints }
    }
}

#[async_trait]
impl TransactionSource for RpcTransactionSource {
    async fn fetch_transaction(&self, chain_id: u64, hash: B256) -> Result<FetchedTransaction> {
        let endpoint = self
            .endpoints
            .get(&chain_id)
            .with_context(|| format!("no RPC endpoint configured for chain {chain_id}"))?;
        let url: reqwest::Url = endpoint
            .parse()
            .with_context(|| format!("invalid RPC endpoint '{endpoint}'"))?;

        let provider = ProviderBuilder::new().connect_http(url);
        let tx: serde_json::Value = provider
            .raw_request("eth_getTransactionByHash".into(), [format!("{hash}")])
            .await
            .context("eth_getTransactionByHash failed")?;

        if tx.is_null() {
            bail!("transaction {hash} not found on chain {chain_id}");
        }

        let input = tx
            .get("input")
            .and_then(|value| value.as_str())
            .context("transaction has no input field")?;
        let input = Bytes::from(crate::decode::parse_hex_bytes(input)?);

        let to = tx
            .get("to")
            .and_then(|value| value.as_str())
            .and_then(|value| value.parse::<Address>().ok());

        Ok(FetchedTransaction { input, to })
    }
}

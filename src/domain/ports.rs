//! Collaborator contracts consumed by the decode pipeline
//!
//! The pipeline never talks to the network directly; it goes through these
//! traits so the whole thing stays testable offline. Implementations live in
//! `crate::infrastructure`.

use alloy_json_abi::JsonAbi;
use alloy_primitives::{Address, Bytes, B256};
use anyhow::Result;
use async_trait::async_trait;

/// Verified contract ABI with the contract's name, when the source knows it.
#[derive(Debug, Clone)]
pub struct ContractAbi {
    pub abi: JsonAbi,
    pub name: Option<String>,
}

/// Verified-source ABI lookup keyed by chain + address.
#[async_trait]
pub trait AbiSource: Send + Sync {
    /// `Ok(None)` means the address has no verified ABI; `Err` means the
    /// lookup itself failed (the caller logs and moves on).
    async fn fetch_contract_abi(
        &self,
        chain_id: u64,
        address: Address,
    ) -> Result<Option<ContractAbi>>;
}

/// Selector -> human-readable function signature lookup.
///
/// Returns candidates best-first; an empty vec means "nothing known", which
/// covers both a genuine miss and an upstream failure. Failures never
/// propagate past this boundary.
#[async_trait]
pub trait SignatureSource: Send + Sync {
    async fn fetch_function_signatures(&self, selector: [u8; 4]) -> Vec<String>;
}

/// Transaction input bytes fetched by hash.
#[derive(Debug, Clone)]
pub struct FetchedTransaction {
    pub input: Bytes,
    pub to: Option<Address>,
}

/// On-chain transaction lookup, for resolving tx-hash / explorer-URL inputs.
#[async_trait]
pub trait TransactionSource: Send + Sync {
    async fn fetch_transaction(&self, chain_id: u64, hash: B256) -> Result<FetchedTransaction>;
}

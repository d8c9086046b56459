//! Explorer URL and transaction hash resolution
//!
//! Maps user-supplied transaction references (a bare hash, or an explorer
//! URL like `https://etherscan.io/tx/0x...`) onto `(chain_id, hash)` using a
//! per-chain table of known explorer hosts.

use alloy_primitives::B256;
use thiserror::Error;

/// Known explorer hosts for one chain (default plus alternates).
#[derive(Debug, Clone)]
pub struct ExplorerEntry {
    pub chain_id: u64,
    pub hosts: Vec<String>,
}

#[derive(Debug, Error)]
pub enum TxRefError {
    #[error("a bare transaction hash needs an explicit chain id")]
    MissingChainId,
    #[error("no known explorer matches host '{0}'")]
    UnknownExplorer(String),
    #[error("no transaction hash found in '{0}'")]
    MissingHash(String),
}

/// Per-chain explorer host table
#[derive(Debug, Clone, Default)]
pub struct ExplorerTable {
    entries: Vec<ExplorerEntry>,
}

impl ExplorerTable {
    pub fn new(entries: Vec<ExplorerEntry>) -> Self {
        Self { entries }
    }

    /// Resolve a transaction reference to `(chain_id, hash)`.
    ///
    /// Bare hashes require the explicit `chain_id`; URLs are matched by
    /// host, first chain whose table contains the host wins, and the hash is
    /// pulled from the URL's path segments.
    pub fn resolve(&self, input: &str, chain_id: Option<u64>) -> Result<(u64, B256), TxRefError> {
        let trimmed = input.trim();

        if let Some(hash) = parse_tx_hash(trimmed) {
            return match chain_id {
                Some(id) => Ok((id, hash)),
                None => Err(TxRefError::MissingChainId),
            };
        }

        let rest = trimmed
            .strip_prefix("https://")
            .or_else(|| trimmed.strip_prefix("http://"))
            .unwrap_or(trimmed);
        let (host, path) = rest.split_once('/').unwrap_or((rest, ""));
        let host = host
            .split(':')
            .next()
            .unwrap_or(host)
            .trim_start_matches("www.")
            .to_lowercase();

        let chain = self
            .entries
            .iter()
            .find(|entry| entry.hosts.iter().any(|h| h.eq_ignore_ascii_case(&host)))
            .ok_or_else(|| TxRefError::UnknownExplorer(host.clone()))?;

        let hash = path
            .split(['/', '?', '#'])
            .find_map(parse_tx_hash)
            .ok_or_else(|| TxRefError::MissingHash(trimmed.to_string()))?;

        Ok((chain.chain_id, hash))
    }
}

/// Parse a 32-byte transaction hash (with or without 0x prefix).
pub fn parse_tx_hash(segment: &str) -> Option<B256> {
    let payload = segment.strip_prefix("0x").unwrap_or(segment);
    if payload.len() != 64 || !payload.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let bytes = hex::decode(payload).ok()?;
    Some(B256::from_slice(&bytes))
}

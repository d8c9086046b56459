//! Verified contract ABI lookup via the Sourcify API

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use alloy_primitives::Address;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::domain::{AbiSource, ContractAbi};
use crate::store::LookupCache;

pub const SOURCIFY_API_URL: &str = "https://sourcify.dev/server";

/// Sourcify API response structures
#[derive(Debug, Deserialize)]
struct SourcifyResponse {
    #[serde(default)]
    abi: Option<serde_json::Value>,
    #[serde(default)]
    name: Option<String>,
}

/// Sourcify-backed ABI source with negative-result caching
pub struct SourcifyClient {
    http: reqwest::Client,
    base_url: String,
    /// Cache: (chain_id, lowercase address) -> ABI, including "not verified"
    cache: RwLock<HashMap<(u64, String), Option<ContractAbi>>>,
    store: Option<Mutex<LookupCache>>,
}

impl SourcifyClient {
    pub fn new(base_url: String, timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            base_url,
            cache: RwLock::new(HashMap::new()),
            store: None,
        }
    }

    /// Write lookups through to a persistent cache
    pub fn with_store(mut self, store: LookupCache) -> Self {
        self.store = Some(Mutex::new(store));
        self
    }

    fn load_stored(&self, chain_id: u64, address: &str) -> Option<ContractAbi> {
        let store = self.store.as_ref()?;
        let guard = store.lock().ok()?;
        let cached = match guard.get_abi(chain_id, address) {
            Ok(found) => found?,
            Err(err) => {
                warn!("abi cache read failed: {err:#}");
                return None;
            }
        };
        match serde_json::from_str(&cached.abi_json) {
            Ok(abi) => Some(ContractAbi {
                abi,
                name: cached.contract_name,
            }),
            Err(err) => {
                warn!("abi cache entry unreadable: {err:#}");
                None
            }
        }
    }

    fn persist(&self, chain_id: u64, address: &str, contract: &ContractAbi) {
        let Some(store) = &self.store else {
            return;
        };
        let abi_json = match serde_json::to_string(&contract.abi) {
            Ok(encoded) => encoded,
            Err(err) => {
                warn!("abi serialization failed: {err:#}");
                return;
            }
        };
        if let Ok(guard) = store.lock() {
            if let Err(err) = guard.save_abi(chain_id, address, &abi_json, contract.name.as_deref())
            {
                warn!("abi cache write failed: {err:#}");
            }
        }
    }
}

#[async_trait]
impl AbiSource for SourcifyClient {
    async fn fetch_contract_abi(
        &self,
        chain_id: u64,
        address: Address,
    ) -> Result<Option<ContractAbi>> {
        let addr = address.to_string().to_lowercase();
        let cache_key = (chain_id, addr.clone());

        {
            let cache = self.cache.read().await;
            if let Some(abi) = cache.get(&cache_key) {
                return Ok(abi.clone());
            }
        }

        if let Some(contract) = self.load_stored(chain_id, &addr) {
            let mut cache = self.cache.write().await;
            cache.insert(cache_key, Some(contract.clone()));
            return Ok(Some(contract));
        }

        let url = format!(
            "{}/v2/contract/{}/{}?fields=abi,name",
            self.base_url, chain_id, addr
        );

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .context("failed to query Sourcify API")?;

        let contract = if response.status().is_success() {
            let data: SourcifyResponse = response
                .json()
                .await
                .context("failed to parse Sourcify response")?;

            match data.abi {
                Some(abi_value) => {
                    let abi = serde_json::from_value(abi_value)
                        .context("Sourcify returned an unreadable ABI")?;
                    Some(ContractAbi {
                        abi,
                        name: data.name,
                    })
                }
                None => None,
            }
        } else {
            debug!(%address, chain_id, status = %response.status(), "no verified ABI on Sourcify");
            None
        };

        if let Some(found) = &contract {
            self.persist(chain_id, &addr, found);
        }

        // cache the result either way so unverified contracts are not
        // re-queried on every nested decode
        {
            let mut cache = self.cache.write().await;
            cache.insert(cache_key, contract.clone());
        }

        Ok(contract)
    }
}

//! Remote signature resolution via the OpenChain and 4byte.directory APIs
//!
//! OpenChain is queried first with spam filtering on; 4byte.directory is the
//! larger but noisier fallback when OpenChain has nothing. Lookup failures
//! never escape this module: they are logged and flattened into "no
//! candidates known".

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::domain::SignatureSource;
use crate::store::LookupCache;

pub const OPENCHAIN_LOOKUP_URL: &str =
    "https://api.openchain.xyz/signature-database/v1/lookup";
pub const FOURBYTE_LOOKUP_URL: &str = "https://www.4byte.directory/api/v1/signatures/";

/// OpenChain API response structures
#[derive(Debug, Deserialize)]
struct OpenChainResponse {
    ok: bool,
    result: OpenChainResult,
}

#[derive(Debug, Deserialize)]
struct OpenChainResult {
    function: HashMap<String, Option<Vec<OpenChainSignature>>>,
}

#[derive(Debug, Deserialize)]
struct OpenChainSignature {
    name: String,
}

/// 4byte.directory API response structures
#[derive(Debug, Deserialize)]
struct FourByteResponse {
    results: Vec<FourByteSignature>,
}

#[derive(Debug, Deserialize)]
struct FourByteSignature {
    id: u64,
    text_signature: String,
}

/// Two-tier signature lookup client with in-memory and on-disk caching
pub struct SignatureClient {
    http: reqwest::Client,
    openchain_url: String,
    fourbyte_url: String,
    /// Cache: selector hex -> candidate signatures, best first
    cache: RwLock<HashMap<String, Vec<String>>>,
    store: Option<Mutex<LookupCache>>,
}

impl SignatureClient {
    pub fn new(openchain_url: String, fourbyte_url: String, timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            openchain_url,
            fourbyte_url,
            cache: RwLock::new(HashMap::new()),
            store: None,
        }
    }

    /// Write lookups through to a persistent cache
    pub fn with_store(mut self, store: LookupCache) -> Self {
        self.store = Some(Mutex::new(store));
        self
    }

    async fn lookup_openchain(&self, selector_hex: &str) -> Result<Vec<String>> {
        let url = format!(
            "{}?function={}&filter=true",
            self.openchain_url, selector_hex
        );

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .context("failed to query OpenChain API")?;

        if !response.status().is_success() {
            anyhow::bail!("OpenChain API returned status {}", response.status());
        }

        let data: OpenChainResponse = response
            .json()
            .await
            .context("failed to parse OpenChain response")?;

        if !data.ok {
            anyhow::bail!("OpenChain API returned ok=false");
        }

        Ok(data
            .result
            .function
            .get(selector_hex)
            .and_then(|entry| entry.as_ref())
            .map(|sigs| sigs.iter().map(|s| s.name.clone()).collect())
            .unwrap_or_default())
    }

    async fn lookup_fourbyte(&self, selector_hex: &str) -> Result<Vec<String>> {
        let url = format!("{}?hex_signature={}", self.fourbyte_url, selector_hex);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .context("failed to query 4byte.directory API")?;

        if !response.status().is_success() {
            anyhow::bail!("4byte.directory API returned status {}", response.status());
        }

        let mut data: FourByteResponse = response
            .json()
            .await
            .context("failed to parse 4byte.directory response")?;

        // earliest-registered entries are the least likely to be spam
        data.results.sort_by_key(|s| s.id);
        Ok(data.results.into_iter().map(|s| s.text_signature).collect())
    }

    fn load_stored(&self, selector_hex: &str) -> Option<Vec<String>> {
        let store = self.store.as_ref()?;
        let guard = store.lock().ok()?;
        match guard.get_signatures(selector_hex) {
            Ok(found) => found,
            Err(err) => {
                warn!("signature cache read failed: {err:#}");
                None
            }
        }
    }

    fn persist(&self, selector_hex: &str, signatures: &[String]) {
        if signatures.is_empty() {
            return;
        }
        if let Some(store) = &self.store {
            if let Ok(guard) = store.lock() {
                if let Err(err) = guard.save_signatures(selector_hex, signatures) {
                    warn!("signature cache write failed: {err:#}");
                }
            }
        }
    }
}

#[async_trait]
impl SignatureSource for SignatureClient {
    async fn fetch_function_signatures(&self, selector: [u8; 4]) -> Vec<String> {
        let selector_hex = format!("0x{}", hex::encode(selector));

        {
            let cache = self.cache.read().await;
            if let Some(sigs) = cache.get(&selector_hex) {
                return sigs.clone();
            }
        }

        if let Some(sigs) = self.load_stored(&selector_hex) {
            let mut cache = self.cache.write().await;
            cache.insert(selector_hex, sigs.clone());
            return sigs;
        }

        let signatures = match self.lookup_openchain(&selector_hex).await {
            Ok(sigs) if !sigs.is_empty() => sigs,
            Ok(_) => {
                debug!(selector = %selector_hex, "OpenChain has no entry, trying 4byte.directory");
                self.lookup_fourbyte(&selector_hex).await.unwrap_or_else(|err| {
                    warn!(selector = %selector_hex, "4byte.directory lookup failed: {err:#}");
                    Vec::new()
                })
            }
            Err(err) => {
                warn!(selector = %selector_hex, "OpenChain lookup failed: {err:#}");
                self.lookup_fourbyte(&selector_hex).await.unwrap_or_else(|err| {
                    warn!(selector = %selector_hex, "4byte.directory lookup failed: {err:#}");
                    Vec::new()
                })
            }
        };

        self.persist(&selector_hex, &signatures);
        {
            let mut cache = self.cache.write().await;
            cache.insert(selector_hex, signatures.clone());
        }

        signatures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openchain_response_parsing() {
        let body = r#"{
            "ok": true,
            "result": {
                "function": {
                    "0xa9059cbb": [
                        {"name": "transfer(address,uint256)", "filtered": false}
                    ],
                    "0xdeadbeef": null
                }
            }
        }"#;
        let parsed: OpenChainResponse = serde_json::from_str(body).unwrap();
        assert!(parsed.ok);

        let hit = parsed.result.function.get("0xa9059cbb").unwrap();
        assert_eq!(
            hit.as_ref().unwrap()[0].name,
            "transfer(address,uint256)"
        );
        assert!(parsed.result.function.get("0xdeadbeef").unwrap().is_none());
    }

    #[test]
    fn test_fourbyte_response_orders_by_id() {
        let body = r#"{
            "count": 2,
            "results": [
                {"id": 842, "text_signature": "spam_entry(uint256)"},
                {"id": 145, "text_signature": "transfer(address,uint256)"}
            ]
        }"#;
        let mut parsed: FourByteResponse = serde_json::from_str(body).unwrap();
        parsed.results.sort_by_key(|s| s.id);
        assert_eq!(parsed.results[0].text_signature, "transfer(address,uint256)");
    }
}

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::infrastructure::{signatures, sourcify, ExplorerEntry};

/// One supported chain: RPC endpoint plus known explorer hosts.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainSpec {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub rpc: Option<String>,
    #[serde(default)]
    pub explorers: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Extra or overriding chain entries; merged over the built-in table
    #[serde(default)]
    pub chains: Vec<ChainSpec>,

    #[serde(default = "default_openchain_url")]
    pub openchain_url: String,
    #[serde(default = "default_fourbyte_url")]
    pub fourbyte_url: String,
    #[serde(default = "default_sourcify_url")]
    pub sourcify_url: String,

    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Directories scanned for local ABI JSON files
    #[serde(default)]
    pub abi_paths: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chains: Vec::new(),
            openchain_url: default_openchain_url(),
            fourbyte_url: default_fourbyte_url(),
            sourcify_url: default_sourcify_url(),
            http_timeout_secs: default_http_timeout_secs(),
            max_depth: default_max_depth(),
            listen: default_listen(),
            abi_paths: Vec::new(),
        }
    }
}

impl Config {
    /// All chains: user entries first, then built-ins not shadowed by id
    pub fn chains(&self) -> Vec<ChainSpec> {
        let mut merged = self.chains.clone();
        for builtin in builtin_chains() {
            if !merged.iter().any(|chain| chain.id == builtin.id) {
                merged.push(builtin);
            }
        }
        merged
    }

    pub fn rpc_endpoints(&self) -> HashMap<u64, String> {
        self.chains()
            .into_iter()
            .filter_map(|chain| chain.rpc.map(|rpc| (chain.id, rpc)))
            .collect()
    }

    pub fn explorer_entries(&self) -> Vec<ExplorerEntry> {
        self.chains()
            .into_iter()
            .map(|chain| ExplorerEntry {
                chain_id: chain.id,
                hosts: chain.explorers,
            })
            .collect()
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

pub fn load() -> Config {
    let Some(path) = config_path() else {
        return Config::default();
    };
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(_) => return Config::default(),
    };
    toml::from_str::<Config>(&content).unwrap_or_default()
}

pub fn config_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os("PEEL_CONFIG").map(PathBuf::from) {
        return Some(path);
    }
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from) {
        return Some(xdg.join("peel").join("config.toml"));
    }
    if let Some(home) = std::env::var_os("HOME").map(PathBuf::from) {
        return Some(home.join(".config").join("peel").join("config.toml"));
    }

    directories::ProjectDirs::from("io", "peel", "peel")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

pub fn data_dir() -> Option<PathBuf> {
    if let Some(xdg) = std::env::var_os("XDG_DATA_HOME").map(PathBuf::from) {
        return Some(xdg.join("peel"));
    }
    if let Some(home) = std::env::var_os("HOME").map(PathBuf::from) {
        return Some(home.join(".local").join("share").join("peel"));
    }
    directories::ProjectDirs::from("io", "peel", "peel").map(|dirs| dirs.data_dir().to_path_buf())
}

pub fn cache_db_path() -> Option<PathBuf> {
    data_dir().map(|dir| dir.join("lookups.sqlite3"))
}

fn default_openchain_url() -> String {
    signatures::OPENCHAIN_LOOKUP_URL.to_string()
}

fn default_fourbyte_url() -> String {
    signatures::FOURBYTE_LOOKUP_URL.to_string()
}

fn default_sourcify_url() -> String {
    sourcify::SOURCIFY_API_URL.to_string()
}

fn default_http_timeout_secs() -> u64 {
    10
}

fn default_max_depth() -> usize {
    crate::decode::DEFAULT_MAX_DEPTH
}

fn default_listen() -> String {
    "127.0.0.1:5842".to_string()
}

fn builtin_chains() -> Vec<ChainSpec> {
    fn chain(id: u64, name: &str, rpc: &str, explorers: &[&str]) -> ChainSpec {
        ChainSpec {
            id,
            name: name.to_string(),
            rpc: Some(rpc.to_string()),
            explorers: explorers.iter().map(|host| host.to_string()).collect(),
        }
    }

    vec![
        chain(
            1,
            "ethereum",
            "https://eth.llamarpc.com",
            &["etherscan.io", "eth.blockscout.com"],
        ),
        chain(
            10,
            "optimism",
            "https://mainnet.optimism.io",
            &["optimistic.etherscan.io", "optimism.blockscout.com"],
        ),
        chain(
            56,
            "bnb",
            "https://bsc-dataseed.bnbchain.org",
            &["bscscan.com"],
        ),
        chain(
            100,
            "gnosis",
            "https://rpc.gnosischain.com",
            &["gnosisscan.io", "gnosis.blockscout.com"],
        ),
        chain(
            137,
            "polygon",
            "https://polygon-rpc.com",
            &["polygonscan.com"],
        ),
        chain(
            8453,
            "base",
            "https://mainnet.base.org",
            &["basescan.org", "base.blockscout.com"],
        ),
        chain(
            42161,
            "arbitrum",
            "https://arb1.arbitrum.io/rpc",
            &["arbiscan.io"],
        ),
        chain(
            11155111,
            "sepolia",
            "https://rpc.sepolia.org",
            &["sepolia.etherscan.io"],
        ),
    ]
}

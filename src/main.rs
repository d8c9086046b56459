use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use peel::api::{self, AppState};
use peel::config::{self, Config};
use peel::decode::{parse_hex_bytes, Decoder};
use peel::domain::{DecodedCall, DecodedParam, ParamValue, TransactionSource, RAW_PARAMETERS_NAME};
use peel::infrastructure::{
    explorers, AbiScanner, ExplorerTable, RpcTransactionSource, SignatureClient, SourcifyClient,
};
use peel::store::LookupCache;

#[derive(Debug, Parser)]
#[command(
    name = "peel",
    version,
    about = "Recursive EVM calldata decoder"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Decode calldata: a hex string, a transaction hash, or an explorer URL
    Decode {
        /// Hex calldata (0x...), 32-byte tx hash, or explorer tx URL
        input: String,

        /// Contract address, enables verified-ABI decoding with --chain-id
        #[arg(long)]
        address: Option<String>,

        /// Chain id for --address or a bare tx hash
        #[arg(long)]
        chain_id: Option<u64>,

        /// Directory of ABI JSON files to consult before any network lookup
        #[arg(long)]
        abi_dir: Option<PathBuf>,

        /// Skip all network lookups
        #[arg(long)]
        offline: bool,

        /// Print the decode tree as JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Run the HTTP decode API
    Serve {
        /// Listen address, e.g. 127.0.0.1:5842
        #[arg(long)]
        listen: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("peel=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = config::load();

    match cli.command {
        Command::Decode {
            input,
            address,
            chain_id,
            abi_dir,
            offline,
            json,
        } => run_decode(&config, input, address, chain_id, abi_dir, offline, json).await,
        Command::Serve { listen } => run_serve(&config, listen).await,
    }
}

fn build_decoder(config: &Config, abi_dir: Option<&PathBuf>, offline: bool) -> Decoder {
    let mut decoder = Decoder::new().with_max_depth(config.max_depth);

    let mut abi_roots: Vec<PathBuf> = config.abi_paths.iter().map(PathBuf::from).collect();
    if let Some(dir) = abi_dir {
        abi_roots.insert(0, dir.clone());
    }
    if !abi_roots.is_empty() {
        let registry = AbiScanner::scan_roots(&abi_roots);
        for error in &registry.errors {
            tracing::warn!("abi scan: {error}");
        }
        tracing::info!(
            functions = registry.len(),
            files = registry.scanned_files,
            "loaded local ABIs"
        );
        decoder = decoder.with_registry(registry);
    }

    if !offline {
        let mut signatures = SignatureClient::new(
            config.openchain_url.clone(),
            config.fourbyte_url.clone(),
            config.http_timeout(),
        );
        let mut abis = SourcifyClient::new(config.sourcify_url.clone(), config.http_timeout());

        if let Some(path) = config::cache_db_path() {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            match (LookupCache::open(&path), LookupCache::open(&path)) {
                (Ok(signature_store), Ok(abi_store)) => {
                    signatures = signatures.with_store(signature_store);
                    abis = abis.with_store(abi_store);
                }
                (Err(err), _) | (_, Err(err)) => {
                    tracing::warn!("lookup cache disabled: {err:#}");
                }
            }
        }

        decoder = decoder
            .with_signature_source(Arc::new(signatures))
            .with_abi_source(Arc::new(abis));
    }

    decoder
}

async fn run_decode(
    config: &Config,
    input: String,
    address: Option<String>,
    chain_id: Option<u64>,
    abi_dir: Option<PathBuf>,
    offline: bool,
    json: bool,
) -> Result<()> {
    let decoder = build_decoder(config, abi_dir.as_ref(), offline);

    let trimmed = input.trim();
    let (calldata, mut context) = if explorers::parse_tx_hash(trimmed).is_some()
        || trimmed.contains("://")
    {
        if offline {
            bail!("--offline cannot resolve a transaction reference");
        }
        let table = ExplorerTable::new(config.explorer_entries());
        let (chain, hash) = table.resolve(trimmed, chain_id)?;
        let transactions = RpcTransactionSource::new(config.rpc_endpoints());
        let fetched = transactions
            .fetch_transaction(chain, hash)
            .await
            .context("transaction fetch failed")?;
        (fetched.input.to_vec(), fetched.to.map(|to| (to, chain)))
    } else {
        (parse_hex_bytes(trimmed)?, None)
    };

    if context.is_none() {
        if let (Some(address), Some(chain)) = (address.as_deref(), chain_id) {
            context = Some((address.parse().context("invalid --address")?, chain));
        }
    }

    let Some(tree) = decoder.decode_recursive(&calldata, context).await else {
        bail!("unable to decode calldata");
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&tree)?);
    } else {
        print!("{}", render_tree(&tree, 0));
    }
    Ok(())
}

async fn run_serve(config: &Config, listen: Option<String>) -> Result<()> {
    let decoder = build_decoder(config, None, false);
    let state = Arc::new(AppState {
        decoder,
        transactions: Arc::new(RpcTransactionSource::new(config.rpc_endpoints())),
        explorers: ExplorerTable::new(config.explorer_entries()),
    });

    let listen = listen.unwrap_or_else(|| config.listen.clone());
    api::serve(state, &listen).await
}

/// Render a decode tree for the terminal.
fn render_tree(call: &DecodedCall, depth: usize) -> String {
    let pad = "  ".repeat(depth);
    let mut out = String::new();

    // the raw-parameters sentinel is not a callable function name
    if call.function_name == RAW_PARAMETERS_NAME {
        out.push_str(&format!("{pad}(raw ABI-encoded parameters)\n"));
    } else if call.signature.is_empty() {
        out.push_str(&format!("{pad}{}\n", call.function_name));
    } else {
        out.push_str(&format!("{pad}{}\n", call.signature));
    }

    for arg in &call.args {
        out.push_str(&render_param(arg, depth + 1));
    }
    out
}

fn render_param(param: &DecodedParam, depth: usize) -> String {
    let pad = "  ".repeat(depth);
    let label = if param.name.is_empty() {
        param.ty.clone()
    } else {
        format!("{} {}", param.ty, param.name)
    };

    match &param.value {
        ParamValue::Plain(value) => format!("{pad}{label} = {value}\n"),
        ParamValue::Nested { decoded: Some(inner) } => {
            format!("{pad}{label}:\n{}", render_tree(inner, depth + 1))
        }
        ParamValue::Nested { decoded: None } => {
            format!("{pad}{label} = {} (undecoded)\n", param.raw_value)
        }
        ParamValue::Tuple(items) | ParamValue::Array(items) => {
            let mut out = format!("{pad}{label}:\n");
            for item in items {
                out.push_str(&render_param(item, depth + 1));
            }
            out
        }
    }
}

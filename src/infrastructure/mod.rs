//! Infrastructure layer - external service integrations
//!
//! This layer contains:
//! - OpenChain / 4byte.directory signature lookup
//! - Sourcify verified-ABI lookup
//! - JSON-RPC transaction fetch (alloy HTTP provider)
//! - Explorer URL resolution and local ABI file scanning

pub mod explorers;
pub mod rpc;
pub mod scanner;
pub mod signatures;
pub mod sourcify;

pub use explorers::{ExplorerEntry, ExplorerTable, TxRefError};
pub use rpc::RpcTransactionSource;
pub use scanner::AbiScanner;
pub use signatures::SignatureClient;
pub use sourcify::SourcifyClient;

//! The decoding pipeline: ABI wrappers, MultiSend parsing, layout guessing,
//! strategy orchestration and recursive tree expansion.

pub mod abi;
pub mod guess;
pub mod multisend;
pub mod recursive;
pub mod strategy;

pub use multisend::{encode_multi_send, parse_multi_send, MultiSendError};
pub use strategy::{Decoder, DEFAULT_MAX_DEPTH};

use anyhow::{ensure, Context, Result};

/// Parse user-supplied hex calldata (with or without a 0x prefix).
pub fn parse_hex_bytes(input: &str) -> Result<Vec<u8>> {
    let trimmed = input.trim();
    let payload = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    ensure!(payload.len() % 2 == 0, "odd-length hex string");
    hex::decode(payload).context("invalid hex calldata")
}

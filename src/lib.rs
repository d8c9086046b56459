//! peel - recursive EVM calldata decoder
//!
//! Given opaque transaction input bytes, peel works out what was called and
//! recursively decodes every nested parameter, with or without a verified
//! ABI: verified-ABI decode, signature-database lookup, Safe MultiSend
//! parsing and shape-based layout guessing are tried in priority order, and
//! every `bytes` leaf that could itself be calldata is fed back through the
//! whole pipeline.

pub mod api;
pub mod config;
pub mod decode;
pub mod domain;
pub mod infrastructure;
pub mod store;

pub use decode::Decoder;
pub use domain::{CallSource, DecodedCall, DecodedParam, ParamValue, RAW_PARAMETERS_NAME};

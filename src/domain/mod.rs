//! Domain models and collaborator contracts
//!
//! Pure types and traits for calldata decoding, independent of the network
//! implementations in `crate::infrastructure`.

mod ports;
mod registry;
mod types;

pub use ports::{
    AbiSource, ContractAbi, FetchedTransaction, SignatureSource, TransactionSource,
};
pub use registry::{AbiRegistry, RegisteredFunction};
pub use types::{
    base_type_of, CallSource, DecodedCall, DecodedParam, FlatCall, MultiSendEntry, ParamSpec,
    ParamValue, RAW_PARAMETERS_NAME,
};

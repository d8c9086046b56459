//! Local ABI registry - stores known functions by selector

use std::collections::HashMap;
use std::path::PathBuf;

use alloy_json_abi::Function;

/// A function loaded from a local ABI file.
#[derive(Debug, Clone)]
pub struct RegisteredFunction {
    /// 4-byte function selector
    pub selector: [u8; 4],
    /// Parsed function definition (keeps parameter names)
    pub function: Function,
    /// File the ABI was found in
    pub source: PathBuf,
}

impl RegisteredFunction {
    /// Get selector as hex string
    pub fn selector_hex(&self) -> String {
        format!("0x{}", hex::encode(self.selector))
    }
}

/// Registry of locally known functions indexed by selector
#[derive(Debug, Default, Clone)]
pub struct AbiRegistry {
    functions: HashMap<[u8; 4], RegisteredFunction>,
    /// Number of files scanned
    pub scanned_files: usize,
    /// Scan errors
    pub errors: Vec<String>,
}

impl AbiRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a function
    ///
    /// Note: First function for a given selector wins (no overwrite)
    pub fn insert(&mut self, function: Function, source: PathBuf) {
        let selector: [u8; 4] = function.selector().into();
        self.functions.entry(selector).or_insert(RegisteredFunction {
            selector,
            function,
            source,
        });
    }

    /// Look up a function by selector
    pub fn lookup(&self, selector: [u8; 4]) -> Option<&RegisteredFunction> {
        self.functions.get(&selector)
    }

    /// Get the number of registered functions
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Merge another registry into this one (first wins per selector)
    pub fn merge(&mut self, other: Self) {
        self.scanned_files = self.scanned_files.saturating_add(other.scanned_files);
        self.errors.extend(other.errors);
        for (selector, function) in other.functions {
            self.functions.entry(selector).or_insert(function);
        }
    }

    /// Get all registered functions
    pub fn functions(&self) -> impl Iterator<Item = &RegisteredFunction> {
        self.functions.values()
    }
}

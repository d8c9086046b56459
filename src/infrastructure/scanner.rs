//! ABI file scanner - discovers and parses ABI files from the filesystem

use std::fs;
use std::path::{Path, PathBuf};

use alloy_json_abi::JsonAbi;
use walkdir::WalkDir;

use crate::domain::AbiRegistry;

/// ABI file scanner
pub struct AbiScanner;

impl AbiScanner {
    /// Scan a directory tree for ABI JSON files
    pub fn scan(root: impl AsRef<Path>) -> AbiRegistry {
        let root = root.as_ref();
        let mut registry = AbiRegistry::new();
        let mut scanned_files = 0;
        let mut errors = Vec::new();

        for entry in WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| !Self::is_ignored_dir(e.path()))
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    errors.push(err.to_string());
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }

            // Skip files larger than 5MB
            let metadata = match entry.metadata() {
                Ok(meta) => meta,
                Err(err) => {
                    errors.push(format!("{}: {}", path.display(), err));
                    continue;
                }
            };
            if metadata.len() > 5 * 1024 * 1024 {
                continue;
            }

            scanned_files += 1;

            if let Err(err) = Self::load_abi_file(path, &mut registry) {
                errors.push(format!("{}: {}", path.display(), err));
            }
        }

        registry.scanned_files = scanned_files;
        registry.errors = errors;

        registry
    }

    /// Scan multiple root directories
    pub fn scan_roots(roots: &[PathBuf]) -> AbiRegistry {
        let mut registry = AbiRegistry::new();
        for root in roots {
            registry.merge(Self::scan(root));
        }
        registry
    }

    /// Load a single ABI file
    fn load_abi_file(path: &Path, registry: &mut AbiRegistry) -> anyhow::Result<()> {
        let content = fs::read_to_string(path)?;
        let value: serde_json::Value = serde_json::from_str(&content)?;

        // Accept either a raw ABI array or an artifact with an "abi" field
        let abi_value = if value.is_array() {
            value
        } else if let Some(abi) = value.get("abi") {
            abi.clone()
        } else {
            return Ok(()); // No ABI found, skip silently
        };

        let abi: JsonAbi = serde_json::from_value(abi_value)?;

        for function in abi.functions() {
            registry.insert(function.clone(), path.to_path_buf());
        }

        Ok(())
    }

    /// Check if a path should be ignored
    fn is_ignored_dir(path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .map(|name| {
                matches!(
                    name,
                    ".git" | "target" | "node_modules" | ".next" | "dist" | "build"
                )
            })
            .unwrap_or(false)
    }
}

//! Persistent cache for signature and ABI lookups

use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use std::path::Path;

/// Cached contract ABI from a verified-source lookup
#[derive(Debug, Clone)]
pub struct CachedAbi {
    pub chain_id: u64,
    pub address: String,
    pub abi_json: String,
    pub contract_name: Option<String>,
}

/// SQLite-backed lookup cache
///
/// The decode pipeline itself is cache-agnostic; this sits behind the
/// network collaborators so repeated decodes of the same selectors and
/// contracts stay offline.
#[derive(Debug)]
pub struct LookupCache {
    conn: Connection,
}

impl LookupCache {
    /// Open or create the cache database
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).with_context(|| format!("open db {}", path.display()))?;
        let cache = Self { conn };
        cache.init()?;
        Ok(cache)
    }

    /// Initialize database schema
    fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            -- Selector lookups (candidate lists as a JSON array, best first)
            CREATE TABLE IF NOT EXISTS selectors (
                selector    TEXT PRIMARY KEY,
                signatures  TEXT NOT NULL,
                created_at  INTEGER DEFAULT (strftime('%s', 'now'))
            );

            -- Verified contract ABI lookups
            CREATE TABLE IF NOT EXISTS abis (
                chain_id      INTEGER NOT NULL,
                address       TEXT NOT NULL,
                abi_json      TEXT NOT NULL,
                contract_name TEXT,
                created_at    INTEGER DEFAULT (strftime('%s', 'now')),
                PRIMARY KEY (chain_id, address)
            );

            CREATE INDEX IF NOT EXISTS idx_selectors_created ON selectors(created_at);
            CREATE INDEX IF NOT EXISTS idx_abis_created ON abis(created_at);
            ",
        )?;
        Ok(())
    }

    /// Save a selector's resolved candidate signatures
    pub fn save_signatures(&self, selector: &str, signatures: &[String]) -> Result<()> {
        let encoded = serde_json::to_string(signatures)?;
        self.conn.execute(
            "INSERT INTO selectors(selector, signatures) VALUES (?1, ?2)
             ON CONFLICT(selector) DO UPDATE SET signatures=excluded.signatures",
            params![selector, encoded],
        )?;
        Ok(())
    }

    /// Get cached candidate signatures for a selector
    pub fn get_signatures(&self, selector: &str) -> Result<Option<Vec<String>>> {
        let mut stmt = self
            .conn
            .prepare("SELECT signatures FROM selectors WHERE selector = ?1")?;

        let mut rows = stmt.query(params![selector])?;
        if let Some(row) = rows.next()? {
            let encoded: String = row.get(0)?;
            Ok(Some(serde_json::from_str(&encoded)?))
        } else {
            Ok(None)
        }
    }

    /// Save a fetched contract ABI
    pub fn save_abi(
        &self,
        chain_id: u64,
        address: &str,
        abi_json: &str,
        contract_name: Option<&str>,
    ) -> Result<()> {
        self.conn.execute(
            "INSERT INTO abis(chain_id, address, abi_json, contract_name) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(chain_id, address) DO UPDATE SET
                abi_json=excluded.abi_json,
                contract_name=excluded.contract_name",
            params![chain_id, address.to_lowercase(), abi_json, contract_name],
        )?;
        Ok(())
    }

    /// Get a cached contract ABI
    pub fn get_abi(&self, chain_id: u64, address: &str) -> Result<Option<CachedAbi>> {
        let mut stmt = self.conn.prepare(
            "SELECT chain_id, address, abi_json, contract_name FROM abis
             WHERE chain_id = ?1 AND address = ?2",
        )?;

        let mut rows = stmt.query(params![chain_id, address.to_lowercase()])?;
        if let Some(row) = rows.next()? {
            Ok(Some(CachedAbi {
                chain_id: row.get(0)?,
                address: row.get(1)?,
                abi_json: row.get(2)?,
                contract_name: row.get(3)?,
            }))
        } else {
            Ok(None)
        }
    }

    /// Get cache statistics
    pub fn stats(&self) -> Result<(usize, usize)> {
        let sig_count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM selectors", [], |row| row.get(0))?;
        let abi_count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM abis", [], |row| row.get(0))?;
        Ok((sig_count as usize, abi_count as usize))
    }

    /// Clean entries older than the given age
    pub fn cleanup_old_entries(&self, max_age_days: u32) -> Result<usize> {
        let cutoff = max_age_days as i64 * 24 * 60 * 60;
        let deleted: usize = self.conn.execute(
            "DELETE FROM selectors WHERE created_at < (strftime('%s', 'now') - ?1)",
            params![cutoff],
        )?;
        let deleted_abis: usize = self.conn.execute(
            "DELETE FROM abis WHERE created_at < (strftime('%s', 'now') - ?1)",
            params![cutoff],
        )?;
        Ok(deleted + deleted_abis)
    }
}

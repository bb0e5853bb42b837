//! Backing tables and their initialize-once cache.
//!
//! RULES:
//!   - The risk table, base table, and default snapshot load together, once.
//!   - The first caller loads while holding the lock; concurrent callers
//!     wait and then share the same `Arc<Tables>`.
//!   - A failed load leaves the cache empty, so a later call retries.

use crate::{
    config::EngineConfig,
    error::{RiskError, RiskResult},
    snapshot::{Snapshot, SnapshotStore},
    store::TableStore,
    table::{BaseTable, RiskTable},
    types::shock_percent,
};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

pub struct Tables {
    pub risk: RiskTable,
    pub base: BaseTable,
    pub default_snapshot: Snapshot,
}

/// Where the backing tables come from. Tests substitute fixtures.
pub trait TableSource: Send + Sync {
    fn load(&self) -> RiskResult<Tables>;
}

/// Reads the three tables from SQLite files in the processed directory.
pub struct SqliteTableSource {
    risk_path: PathBuf,
    risk_table: String,
    base_path: PathBuf,
    base_table: String,
    snapshot_path: PathBuf,
    snapshot_table: String,
    snapshot_percent: u32,
}

impl SqliteTableSource {
    pub fn from_config(config: &EngineConfig) -> Self {
        let snapshot_percent = shock_percent(config.default_shock_pct);
        let snapshot_file = SnapshotStore::new(config).file_name(snapshot_percent);
        Self {
            risk_path: config.risk_path(),
            risk_table: config.risk_table.clone(),
            base_path: config.base_path(),
            base_table: config.base_table.clone(),
            snapshot_path: config.processed_dir.join(snapshot_file),
            snapshot_table: config.snapshot_table.clone(),
            snapshot_percent,
        }
    }
}

impl TableSource for SqliteTableSource {
    fn load(&self) -> RiskResult<Tables> {
        let missing: Vec<PathBuf> = [&self.risk_path, &self.base_path, &self.snapshot_path]
            .into_iter()
            .filter(|p| !p.is_file())
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(RiskError::UpstreamUnavailable { missing });
        }

        let risk = TableStore::open_read_only(&self.risk_path)?.read_risk_table(&self.risk_table)?;
        let base = TableStore::open_read_only(&self.base_path)?.read_base_table(&self.base_table)?;
        let default_snapshot =
            Snapshot::read(&self.snapshot_path, self.snapshot_percent, &self.snapshot_table)?;
        Ok(Tables { risk, base, default_snapshot })
    }
}

pub struct TableCache {
    source: Box<dyn TableSource>,
    slot: Mutex<Option<Arc<Tables>>>,
}

impl TableCache {
    pub fn new(source: Box<dyn TableSource>) -> Self {
        Self { source, slot: Mutex::new(None) }
    }

    /// The loaded tables, loading them on first use.
    pub fn get(&self) -> RiskResult<Arc<Tables>> {
        // The slot is only ever written with a complete value.
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(tables) = slot.as_ref() {
            return Ok(Arc::clone(tables));
        }
        let tables = match self.source.load() {
            Ok(tables) => Arc::new(tables),
            Err(e) => {
                log::warn!("Backing tables failed to load: {e}");
                return Err(e);
            }
        };
        log::info!(
            "Backing tables loaded: {} risk rows, {} base rows, {} snapshot rows",
            tables.risk.rows.len(),
            tables.base.rows.len(),
            tables.default_snapshot.table.len()
        );
        *slot = Some(Arc::clone(&tables));
        Ok(tables)
    }

    pub fn is_loaded(&self) -> bool {
        self.slot.lock().map(|slot| slot.is_some()).unwrap_or(false)
    }
}

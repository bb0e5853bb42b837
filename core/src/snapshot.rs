//! Snapshot store: precomputed shock simulations, one file per fraction.
//!
//! A snapshot file is named `<prefix><percent><extension>`, e.g.
//! `shock_simulation_latest_importdrop35.db` for a 35% import drop.
//! The directory listing is the authoritative menu of cached shocks.
//! Fractions resolve by rounding to the nearest integer percent, so
//! 0.351 and 0.349 both address the 35% snapshot.

use crate::{
    config::EngineConfig,
    error::{RiskError, RiskResult},
    store::{SnapshotMeta, TableStore},
    table::ShockedTable,
    types::{shock_percent, validate_shock},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// One discoverable snapshot file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CachedShock {
    pub shock_pct: f64,
    pub percent: u32,
    pub file: String,
}

/// A shocked table tagged with the fraction it was computed at.
/// Immutable once loaded.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub shock_pct: f64,
    pub percent: u32,
    pub file: String,
    pub created_at: Option<DateTime<Utc>>,
    pub table: ShockedTable,
}

impl Snapshot {
    /// Read a snapshot file.
    pub fn read(path: &Path, percent: u32, table: &str) -> RiskResult<Self> {
        let store = TableStore::open_read_only(path)?;
        let shocked = store.read_shocked_table(table)?;
        let meta = store.read_snapshot_meta()?;
        let file = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        log::info!("Loaded snapshot {file} ({} rows)", shocked.len());
        Ok(Self {
            shock_pct: percent as f64 / 100.0,
            percent,
            file,
            created_at: meta.map(|m| m.created_at),
            table: shocked,
        })
    }
}

pub struct SnapshotStore {
    dir: PathBuf,
    prefix: String,
    extension: String,
    table: String,
    loaded: Mutex<HashMap<u32, Arc<Snapshot>>>,
}

impl SnapshotStore {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            dir: config.processed_dir.clone(),
            prefix: config.snapshot_prefix.clone(),
            extension: config.snapshot_extension.clone(),
            table: config.snapshot_table.clone(),
            loaded: Mutex::new(HashMap::new()),
        }
    }

    pub fn file_name(&self, percent: u32) -> String {
        format!("{}{percent}{}", self.prefix, self.extension)
    }

    /// Percent embedded in a file name following the convention.
    pub fn parse_percent(&self, file_name: &str) -> Option<u32> {
        let digits = file_name
            .strip_prefix(self.prefix.as_str())?
            .strip_suffix(self.extension.as_str())?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }

    /// Every snapshot on disk, ascending by fraction.
    /// A missing directory means no snapshots.
    pub fn list_available(&self) -> RiskResult<Vec<CachedShock>> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("Snapshot directory {} does not exist", self.dir.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut shocks = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if let Some(percent) = self.parse_percent(&name) {
                shocks.push(CachedShock {
                    shock_pct: percent as f64 / 100.0,
                    percent,
                    file: name,
                });
            }
        }
        shocks.sort_by_key(|s| s.percent);
        Ok(shocks)
    }

    pub fn available_fractions(&self) -> RiskResult<Vec<f64>> {
        Ok(self.list_available()?.into_iter().map(|s| s.shock_pct).collect())
    }

    /// Map a fraction to its snapshot file, or `SnapshotNotFound` listing
    /// what is cached.
    pub fn resolve(&self, shock_pct: f64) -> RiskResult<CachedShock> {
        let shock_pct = validate_shock(shock_pct)?;
        let percent = shock_percent(shock_pct);
        let file = self.file_name(percent);
        if self.dir.join(&file).is_file() {
            log::debug!("shock_pct={shock_pct} resolved to {file}");
            return Ok(CachedShock { shock_pct: percent as f64 / 100.0, percent, file });
        }
        Err(RiskError::SnapshotNotFound {
            requested: shock_pct,
            available: self.available_fractions()?,
        })
    }

    /// Load (once per process) the snapshot a fraction resolves to.
    pub fn load(&self, shock_pct: f64) -> RiskResult<Arc<Snapshot>> {
        let cached = self.resolve(shock_pct)?;
        let mut loaded = self.loaded.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(snapshot) = loaded.get(&cached.percent) {
            return Ok(Arc::clone(snapshot));
        }
        let snapshot = Arc::new(Snapshot::read(
            &self.dir.join(&cached.file),
            cached.percent,
            &self.table,
        )?);
        loaded.insert(cached.percent, Arc::clone(&snapshot));
        Ok(snapshot)
    }

    /// Write a new snapshot file. Existing snapshots are never replaced.
    ///
    /// The table is written under `<file>.partial`, which discovery ignores,
    /// and linked to its final name only once fully written.
    pub fn write(&self, shock_pct: f64, table: &ShockedTable) -> RiskResult<CachedShock> {
        let shock_pct = validate_shock(shock_pct)?;
        let percent = shock_percent(shock_pct);
        let file = self.file_name(percent);
        let path = self.dir.join(&file);
        if path.exists() {
            return Err(already_exists(&file));
        }

        std::fs::create_dir_all(&self.dir)?;
        let partial = self.dir.join(format!("{file}.partial"));
        remove_if_present(&partial)?;

        let meta = SnapshotMeta {
            shock_pct: percent as f64 / 100.0,
            n_rows: table.len() as i64,
            created_at: Utc::now(),
        };
        let linked = write_file(&partial, &self.table, table, &meta).and_then(|()| {
            std::fs::hard_link(&partial, &path).map_err(|e| match e.kind() {
                std::io::ErrorKind::AlreadyExists => already_exists(&file),
                _ => e.into(),
            })
        });
        if let Err(e) = remove_if_present(&partial) {
            log::warn!("Cannot remove {}: {e}", partial.display());
        }
        linked?;

        log::info!("Wrote snapshot {file} ({} rows)", table.len());
        Ok(CachedShock { shock_pct: percent as f64 / 100.0, percent, file })
    }
}

fn write_file(path: &Path, name: &str, table: &ShockedTable, meta: &SnapshotMeta) -> RiskResult<()> {
    let store = TableStore::open(path)?;
    store.write_shocked_table(name, table)?;
    store.write_snapshot_meta(meta)
}

fn remove_if_present(path: &Path) -> RiskResult<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn already_exists(file: &str) -> RiskError {
    RiskError::InvalidParameter(format!("Snapshot {file} already exists; snapshots are immutable"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_round_trip_through_the_convention() {
        let store = SnapshotStore::new(&EngineConfig::with_data_dir("unused"));
        assert_eq!(store.parse_percent("shock_simulation_latest_importdrop35.db"), Some(35));
        assert_eq!(store.parse_percent(&store.file_name(5)), Some(5));
        assert_eq!(store.parse_percent("shock_simulation_latest_importdrop.db"), None);
        assert_eq!(store.parse_percent("shock_simulation_latest_importdrop3a.db"), None);
        assert_eq!(store.parse_percent("shock_simulation_latest_importdrop35.db-journal"), None);
        assert_eq!(store.parse_percent("risk_index_latest.db"), None);
    }
}

//! Shared fixtures for the integration tests.
//!
//! The fixture world is small enough to check by hand. Shortfalls at a
//! 20% shock (latest year, shortfall = 0.2 * min(imports, consumption)):
//!
//!   Nigeria / Wheat       100
//!   China, mainland / Wheat 180   (special area, never surfaces)
//!   Malta / Wheat          24   (2021 row; the 2020 row is older)
//!   Niger / Wheat          20
//!   France / Wheat         10
//!   Malta / Barley          8
//!   Chad / Sorghum          0   (no risk score)

#![allow(dead_code)]

use foodrisk_core::{
    cache::{TableSource, Tables},
    config::EngineConfig,
    engine::RiskEngine,
    error::{RiskError, RiskResult},
    records::{BaseRecord, RiskRecord},
    shock,
    snapshot::{Snapshot, SnapshotStore},
    table::{BaseTable, RiskTable},
    types::RiskBand,
};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn base_rows() -> Vec<BaseRecord> {
    vec![
        BaseRecord::new("Malta", "Wheat", 2020).with_trade(0.0, 100.0, 0.0),
        BaseRecord::new("Malta", "Wheat", 2021).with_trade(10.0, 120.0, 10.0),
        BaseRecord::new("Malta", "Barley", 2021).with_trade(5.0, 40.0, 0.0),
        BaseRecord::new("France", "Wheat", 2021).with_trade(1000.0, 50.0, 400.0),
        BaseRecord::new("Nigeria", "Wheat", 2021).with_trade(100.0, 500.0, 0.0),
        BaseRecord::new("Niger", "Wheat", 2021).with_trade(50.0, 100.0, 0.0),
        BaseRecord::new("China, mainland", "Wheat", 2021).with_trade(1000.0, 900.0, 0.0),
        BaseRecord::new("Chad", "Sorghum", 2021).with_trade(200.0, 0.0, 0.0),
    ]
}

pub fn risk_rows() -> Vec<RiskRecord> {
    vec![
        RiskRecord::new("Malta", "Wheat", 0.9, RiskBand::High),
        RiskRecord::new("Malta", "Barley", 0.5, RiskBand::Medium),
        RiskRecord::new("Malta", "Olives", 0.3, RiskBand::Low),
        RiskRecord::new("France", "Wheat", 0.2, RiskBand::Low),
        RiskRecord::new("Nigeria", "Wheat", 0.7, RiskBand::High),
        RiskRecord::new("Niger", "Wheat", 0.6, RiskBand::Medium),
        RiskRecord::new("China, mainland", "Wheat", 0.95, RiskBand::High),
    ]
}

pub fn base_table() -> BaseTable {
    BaseTable::new(base_rows())
}

pub fn risk_table() -> RiskTable {
    RiskTable::new(risk_rows())
}

/// The 20% snapshot the country profile reads, computed from the fixture.
pub fn default_snapshot() -> Snapshot {
    let table = shock::simulate(&base_table().latest_per_key(), 0.20).expect("simulate");
    Snapshot {
        shock_pct: 0.20,
        percent: 20,
        file: "shock_simulation_latest_importdrop20.db".into(),
        created_at: None,
        table,
    }
}

/// In-memory table source. Counts loads and can be told to fail.
pub struct FixtureSource {
    pub loads: Arc<AtomicUsize>,
    pub failures_left: AtomicUsize,
}

impl FixtureSource {
    pub fn new() -> Self {
        Self { loads: Arc::new(AtomicUsize::new(0)), failures_left: AtomicUsize::new(0) }
    }

    /// Fails the first `n` loads with `UpstreamUnavailable`.
    pub fn failing(n: usize) -> Self {
        Self { loads: Arc::new(AtomicUsize::new(0)), failures_left: AtomicUsize::new(n) }
    }
}

impl TableSource for FixtureSource {
    fn load(&self) -> RiskResult<Tables> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(RiskError::UpstreamUnavailable { missing: vec!["fixture".into()] });
        }
        Ok(Tables {
            risk: risk_table(),
            base: base_table(),
            default_snapshot: default_snapshot(),
        })
    }
}

/// Engine over the fixture tables, with snapshots under `data_dir/processed`.
pub fn engine_in(data_dir: &Path) -> RiskEngine {
    init_logging();
    RiskEngine::with_source(EngineConfig::with_data_dir(data_dir), Box::new(FixtureSource::new()))
}

pub fn engine_with(config: EngineConfig) -> RiskEngine {
    init_logging();
    RiskEngine::with_source(config, Box::new(FixtureSource::new()))
}

/// Write fixture-derived snapshot files for each percent.
pub fn seed_snapshots(config: &EngineConfig, percents: &[u32]) {
    let store = SnapshotStore::new(config);
    let latest = base_table().latest_per_key();
    for &percent in percents {
        let shock_pct = percent as f64 / 100.0;
        let table = shock::simulate(&latest, shock_pct).expect("simulate");
        store.write(shock_pct, &table).expect("write snapshot");
    }
}

pub fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

//! Initialize-once table cache and the SQLite table source.

mod common;

use common::FixtureSource;
use foodrisk_core::{
    cache::{SqliteTableSource, TableCache, TableSource},
    config::EngineConfig,
    error::RiskError,
    records::col,
    store::TableStore,
    table::{ColumnSet, RiskTable},
};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

#[test]
fn concurrent_first_access_loads_once() {
    common::init_logging();
    let source = FixtureSource::new();
    let loads = Arc::clone(&source.loads);
    let cache = Arc::new(TableCache::new(Box::new(source)));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || cache.get().expect("tables"))
        })
        .collect();
    let tables: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert!(tables.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    assert!(cache.is_loaded());
}

#[test]
fn failed_load_leaves_the_cache_empty_and_retries() {
    common::init_logging();
    let source = FixtureSource::failing(1);
    let loads = Arc::clone(&source.loads);
    let cache = TableCache::new(Box::new(source));

    let err = cache.get().err().expect("first load fails");
    assert_eq!(err.kind(), "upstream_unavailable");
    assert!(!cache.is_loaded());

    let tables = cache.get().expect("second load succeeds");
    assert_eq!(tables.risk.rows.len(), common::risk_rows().len());
    assert!(cache.is_loaded());
    cache.get().unwrap();
    assert_eq!(loads.load(Ordering::SeqCst), 2);
}

#[test]
fn missing_files_are_upstream_unavailable() {
    common::init_logging();
    let dir = TempDir::new().unwrap();
    let config = EngineConfig::with_data_dir(dir.path());
    match SqliteTableSource::from_config(&config).load() {
        Err(RiskError::UpstreamUnavailable { missing }) => {
            assert_eq!(missing.len(), 3);
            assert!(missing.contains(&config.risk_path()));
            assert!(missing.contains(&config.base_path()));
        }
        other => panic!("expected UpstreamUnavailable, got {:?}", other.err()),
    }
}

fn write_fixture_files(config: &EngineConfig, risk: &RiskTable) {
    std::fs::create_dir_all(&config.processed_dir).unwrap();
    TableStore::open(&config.risk_path())
        .unwrap()
        .write_risk_table(&config.risk_table, risk)
        .unwrap();
    TableStore::open(&config.base_path())
        .unwrap()
        .write_base_table(&config.base_table, &common::base_table())
        .unwrap();
    common::seed_snapshots(config, &[20]);
}

#[test]
fn sqlite_source_reads_all_three_tables() {
    common::init_logging();
    let dir = TempDir::new().unwrap();
    let config = EngineConfig::with_data_dir(dir.path());
    write_fixture_files(&config, &common::risk_table());

    let tables = SqliteTableSource::from_config(&config).load().unwrap();
    assert_eq!(tables.base.rows, common::base_rows());
    assert_eq!(tables.risk.rows, common::risk_rows());
    assert_eq!(tables.default_snapshot.percent, 20);
    assert_eq!(tables.default_snapshot.table.len(), 7);
    assert!(tables.risk.columns.contains(col::RISK_BAND));
}

#[test]
fn optional_risk_columns_may_be_absent() {
    common::init_logging();
    let dir = TempDir::new().unwrap();
    let config = EngineConfig::with_data_dir(dir.path());
    let slim = RiskTable::with_columns(
        ColumnSet::of(&[col::COUNTRY, col::COMMODITY, col::RISK_SCORE]),
        common::risk_rows(),
    );
    write_fixture_files(&config, &slim);

    let tables = SqliteTableSource::from_config(&config).load().unwrap();
    assert!(!tables.risk.columns.contains(col::RISK_BAND));
    assert!(tables.risk.rows.iter().all(|r| r.risk_band.is_none()));
    assert_eq!(tables.risk.rows[0].risk_score, Some(0.9));
}

#[test]
fn risk_table_without_keys_is_a_schema_error() {
    common::init_logging();
    let dir = TempDir::new().unwrap();
    let config = EngineConfig::with_data_dir(dir.path());
    let keyless = RiskTable::with_columns(
        ColumnSet::of(&[col::COUNTRY, col::RISK_SCORE]),
        common::risk_rows(),
    );
    write_fixture_files(&config, &keyless);

    match SqliteTableSource::from_config(&config).load() {
        Err(RiskError::Schema { missing, .. }) => assert_eq!(missing, vec!["commodity".to_string()]),
        other => panic!("expected schema error, got {:?}", other.err()),
    }
}

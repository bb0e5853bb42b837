//! Shock simulator tests: worked examples, boundary fractions, schema
//! errors, and seeded property checks over random inputs.

mod common;

use common::approx;
use foodrisk_core::{
    error::RiskError,
    records::{col, BaseRecord},
    shock::{self, shock_record},
    table::{BaseTable, ColumnSet},
};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;

fn record(consumption: Option<f64>, imports: Option<f64>) -> BaseRecord {
    let mut r = BaseRecord::new("Malta", "Wheat", 2021);
    r.apparent_consumption = consumption;
    r.import_qty = imports;
    r
}

#[test]
fn malta_wheat_worked_example() {
    let out = shock_record(&record(Some(100_000.0), Some(80_000.0)), 0.20);
    let s = &out.shock;
    assert!(approx(s.imports_used.unwrap(), 80_000.0));
    assert!(approx(s.imports_shocked.unwrap(), 64_000.0));
    assert!(approx(s.consumption_shocked, 84_000.0));
    assert!(approx(s.shortfall_abs, 16_000.0));
    assert!(approx(s.shortfall_pct.unwrap(), 0.16));
    assert_eq!(s.flag_imports_exceed_consumption, Some(false));
    assert_eq!(s.flag_zero_consumption_after_shock, Some(false));
}

#[test]
fn imports_above_consumption_are_capped_and_flagged() {
    let out = shock_record(&record(Some(100_000.0), Some(120_000.0)), 0.20);
    assert_eq!(out.shock.flag_imports_exceed_consumption, Some(true));
    assert!(approx(out.shock.imports_used.unwrap(), 100_000.0));
    assert!(approx(out.shock.consumption_shocked, 80_000.0));
    // Cleaned quantities are carried on the output.
    assert_eq!(out.base.import_qty, Some(120_000.0));
}

#[test]
fn zero_shock_changes_nothing() {
    let out = shock_record(&record(Some(500.0), Some(300.0)), 0.0);
    assert_eq!(out.shock.consumption_shocked, 500.0);
    assert_eq!(out.shock.shortfall_abs, 0.0);
    assert_eq!(out.shock.shortfall_pct, Some(0.0));
}

#[test]
fn full_shock_removes_all_shockable_imports() {
    let out = shock_record(&record(Some(500.0), Some(300.0)), 1.0);
    assert_eq!(out.shock.imports_shocked, Some(0.0));
    assert_eq!(out.shock.consumption_shocked, 200.0);
    assert_eq!(out.shock.shortfall_abs, 300.0);

    // Fully import-dependent: nothing left after the shock.
    let out = shock_record(&record(Some(300.0), Some(300.0)), 1.0);
    assert_eq!(out.shock.consumption_shocked, 0.0);
    assert_eq!(out.shock.flag_zero_consumption_after_shock, Some(true));
    assert_eq!(out.shock.idr_shocked_raw, None);
    assert_eq!(out.shock.idr_shocked, None);
    assert_eq!(out.shock.flag_idr_over_1, Some(false));
}

#[test]
fn missing_and_negative_quantities_count_as_zero() {
    let out = shock_record(&record(None, Some(-40.0)), 0.5);
    assert_eq!(out.base.apparent_consumption, Some(0.0));
    assert_eq!(out.base.import_qty, Some(0.0));
    assert_eq!(out.shock.shortfall_abs, 0.0);
    assert_eq!(out.shock.shortfall_pct, None, "zero baseline has no shortfall share");
    assert_eq!(out.shock.flag_zero_consumption_after_shock, Some(true));

    let out = shock_record(&record(Some(f64::NAN), Some(10.0)), 0.5);
    assert_eq!(out.base.apparent_consumption, Some(0.0));
    assert_eq!(out.shock.imports_used, Some(0.0));
    assert_eq!(out.shock.flag_imports_exceed_consumption, Some(true));
}

#[test]
fn fully_import_dependent_idr_stays_at_one() {
    let out = shock_record(&record(Some(100.0), Some(100.0)), 0.5);
    assert!(approx(out.shock.idr_shocked_raw.unwrap(), 1.0));
    assert!(approx(out.shock.idr_shocked.unwrap(), 1.0));
    assert_eq!(out.shock.flag_idr_over_1, Some(false));
}

#[test]
fn out_of_range_fractions_are_rejected() {
    let table = BaseTable::new(vec![record(Some(1.0), Some(1.0))]);
    for bad in [-0.1, 1.5, f64::NAN, f64::INFINITY] {
        let err = shock::simulate(&table, bad).unwrap_err();
        assert!(matches!(err, RiskError::InvalidParameter(_)), "{bad}: {err}");
    }
}

#[test]
fn missing_input_columns_are_a_schema_error() {
    let columns = ColumnSet::of(&[col::COUNTRY, col::COMMODITY, col::YEAR, col::IMPORT_QTY]);
    let table = BaseTable::with_columns(columns, vec![record(Some(1.0), Some(1.0))]);
    match shock::simulate(&table, 0.2) {
        Err(RiskError::Schema { missing, .. }) => {
            assert_eq!(missing, vec![col::APPARENT_CONSUMPTION.to_string()]);
        }
        other => panic!("expected schema error, got {other:?}"),
    }
}

#[test]
fn simulate_adds_simulated_columns_and_keeps_row_order() {
    let table = common::base_table();
    let shocked = shock::simulate(&table, 0.35).unwrap();
    assert_eq!(shocked.len(), table.rows.len());
    assert!(shocked.columns.contains(col::SHORTFALL_ABS));
    assert!(shocked.columns.contains(col::IDR_SHOCKED));
    for (input, output) in table.rows.iter().zip(&shocked.rows) {
        assert_eq!(input.country, output.base.country);
        assert_eq!(input.year, output.base.year);
    }
}

#[test]
fn random_inputs_respect_the_bounds() {
    let mut rng = Pcg64Mcg::seed_from_u64(0x5EED_F00D);
    for _ in 0..5_000 {
        let consumption = rng.gen_range(0.0..1e7);
        let imports = rng.gen_range(0.0..2e7);
        let shock_pct = rng.gen_range(0.0..=1.0);
        let out = shock_record(&record(Some(consumption), Some(imports)), shock_pct);
        let s = &out.shock;

        assert!(s.consumption_shocked >= 0.0);
        assert!(s.consumption_shocked <= consumption);
        assert!(s.shortfall_abs >= 0.0);
        assert!(s.imports_used.unwrap() <= consumption);
        if let Some(idr) = s.idr_shocked {
            assert!((0.0..=1.0).contains(&idr));
        }
        if let Some(pct) = s.shortfall_pct {
            assert!((0.0..=1.0 + 1e-12).contains(&pct));
        }
    }
}

#[test]
fn same_inputs_give_identical_rows() {
    let mut rng = Pcg64Mcg::seed_from_u64(42);
    let rows: Vec<BaseRecord> = (0..200)
        .map(|i| {
            let mut r = record(Some(rng.gen_range(0.0..1e6)), Some(rng.gen_range(0.0..1e6)));
            r.commodity = format!("Commodity {i}");
            r
        })
        .collect();
    let table = BaseTable::new(rows);
    let a = shock::simulate(&table, 0.35).unwrap();
    let b = shock::simulate(&table, 0.35).unwrap();
    assert_eq!(a, b);
}

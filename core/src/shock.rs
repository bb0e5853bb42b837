//! Shock simulator.
//!
//! Removes a fraction of the shockable imports (the part of reported
//! imports that fits inside apparent consumption) and reports what is
//! left. Pure: no I/O, no shared state, same inputs give the same rows.

use crate::{
    error::RiskResult,
    records::{col, BaseRecord, ShockFields, ShockedRecord},
    table::{BaseTable, ShockedTable},
    types::validate_shock,
};

/// Columns the simulator needs on its input.
pub const REQUIRED_INPUTS: &[&str] = &[col::APPARENT_CONSUMPTION, col::IMPORT_QTY];

/// Simulate an import shock over every row of `table`.
pub fn simulate(table: &BaseTable, shock_pct: f64) -> RiskResult<ShockedTable> {
    let shock_pct = validate_shock(shock_pct)?;
    table.columns.require("base", REQUIRED_INPUTS)?;

    let rows: Vec<ShockedRecord> = table
        .rows
        .iter()
        .map(|record| shock_record(record, shock_pct))
        .collect();

    let mut columns = table.columns.clone();
    columns.extend(ShockedTable::SIMULATED);
    log::debug!("Simulated {} rows at shock_pct={shock_pct}", rows.len());
    Ok(ShockedTable::with_columns(columns, rows))
}

/// Apply the shock to a single record. `shock_pct` must already be in [0, 1].
pub fn shock_record(record: &BaseRecord, shock_pct: f64) -> ShockedRecord {
    let consumption = non_negative(record.apparent_consumption);
    let imports = non_negative(record.import_qty);

    let imports_used = imports.min(consumption);
    let imports_shocked = imports_used * (1.0 - shock_pct);
    let consumption_shocked = (consumption - shock_pct * imports_used).max(0.0);
    let shortfall_abs = (consumption - consumption_shocked).max(0.0);

    // Undefined rather than zero: a zero baseline says nothing about risk.
    let shortfall_pct = (consumption > 0.0).then(|| shortfall_abs / consumption);
    let idr_shocked_raw =
        (consumption_shocked > 0.0).then(|| imports_shocked / consumption_shocked);
    let idr_shocked = idr_shocked_raw.map(|raw| raw.clamp(0.0, 1.0));

    let mut base = record.clone();
    base.apparent_consumption = Some(consumption);
    base.import_qty = Some(imports);

    ShockedRecord {
        base,
        shock: ShockFields {
            imports_used: Some(imports_used),
            imports_shocked: Some(imports_shocked),
            consumption_shocked,
            shortfall_abs,
            shortfall_pct,
            idr_shocked_raw,
            idr_shocked,
            flag_imports_exceed_consumption: Some(imports > consumption),
            flag_idr_over_1: Some(idr_shocked_raw.is_some_and(|raw| raw > 1.0)),
            flag_zero_consumption_after_shock: Some(consumption_shocked == 0.0),
        },
    }
}

/// Missing, non-finite, or negative quantities count as zero.
fn non_negative(value: Option<f64>) -> f64 {
    match value {
        Some(v) if v.is_finite() && v > 0.0 => v,
        _ => 0.0,
    }
}

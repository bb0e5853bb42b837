//! Store methods for the base production/trade/consumption table.

use crate::{
    error::RiskResult,
    records::{col, BaseRecord},
    table::BaseTable,
};
use rusqlite::types::Value;

use super::{cell_f64, cell_i64, cell_string, real, TableStore};

pub(super) const SCHEMA: &[(&str, &str)] = &[
    (col::COUNTRY, "TEXT"),
    (col::COMMODITY, "TEXT"),
    (col::YEAR, "INTEGER"),
    (col::PRODUCTION_QTY, "REAL"),
    (col::IMPORT_QTY, "REAL"),
    (col::EXPORT_QTY, "REAL"),
    (col::APPARENT_CONSUMPTION, "REAL"),
    (col::IMPORT_DEPENDENCY_RATIO, "REAL"),
];

impl TableStore {
    pub fn read_base_table(&self, table: &str) -> RiskResult<BaseTable> {
        let columns = self.columns(table)?;
        columns.require(table, BaseTable::REQUIRED)?;

        let wanted: Vec<&str> = SCHEMA.iter().map(|(name, _)| *name).collect();
        let raw = self.read_rows(table, &wanted, &columns)?;
        let total = raw.len();
        let rows: Vec<BaseRecord> = raw.iter().filter_map(|cells| base_from_cells(cells)).collect();
        if rows.len() < total {
            log::warn!(
                "Skipped {} rows of '{table}' with a null country or commodity",
                total - rows.len()
            );
        }
        log::info!("Loaded {} base rows from '{table}'", rows.len());
        Ok(BaseTable::with_columns(columns, rows))
    }

    pub fn write_base_table(&self, table: &str, base: &BaseTable) -> RiskResult<()> {
        let rows: Vec<Vec<Value>> = base.rows.iter().map(base_to_cells).collect();
        self.write_rows(table, SCHEMA, &base.columns, &rows)
    }
}

pub(super) fn base_from_cells(cells: &[Value]) -> Option<BaseRecord> {
    Some(BaseRecord {
        country: cell_string(&cells[0])?,
        commodity: cell_string(&cells[1])?,
        year: cell_i64(&cells[2]),
        production_qty: cell_f64(&cells[3]),
        import_qty: cell_f64(&cells[4]),
        export_qty: cell_f64(&cells[5]),
        apparent_consumption: cell_f64(&cells[6]),
        import_dependency_ratio: cell_f64(&cells[7]),
    })
}

pub(super) fn base_to_cells(record: &BaseRecord) -> Vec<Value> {
    vec![
        Value::Text(record.country.clone()),
        Value::Text(record.commodity.clone()),
        record.year.map_or(Value::Null, Value::Integer),
        real(record.production_qty),
        real(record.import_qty),
        real(record.export_qty),
        real(record.apparent_consumption),
        real(record.import_dependency_ratio),
    ]
}

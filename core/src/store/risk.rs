//! Store methods for the upstream risk index.

use crate::{
    error::RiskResult,
    records::{col, RiskRecord},
    table::RiskTable,
    types::RiskBand,
};
use rusqlite::types::Value;

use super::{cell_f64, cell_string, real, TableStore};

const SCHEMA: &[(&str, &str)] = &[
    (col::COUNTRY, "TEXT"),
    (col::COMMODITY, "TEXT"),
    (col::RISK_SCORE, "REAL"),
    (col::RISK_BAND, "TEXT"),
    (col::MEAN_IDR, "REAL"),
    (col::PROD_VOL_NORM, "REAL"),
    (col::IMPORT_VOL_NORM, "REAL"),
];

impl TableStore {
    pub fn read_risk_table(&self, table: &str) -> RiskResult<RiskTable> {
        let columns = self.columns(table)?;
        columns.require(table, RiskTable::REQUIRED)?;

        let wanted: Vec<&str> = SCHEMA.iter().map(|(name, _)| *name).collect();
        let raw = self.read_rows(table, &wanted, &columns)?;
        let total = raw.len();
        let rows: Vec<RiskRecord> = raw.iter().filter_map(|cells| risk_from_cells(cells)).collect();
        if rows.len() < total {
            log::warn!(
                "Skipped {} rows of '{table}' with a null country or commodity",
                total - rows.len()
            );
        }
        log::info!("Loaded {} risk rows from '{table}'", rows.len());
        Ok(RiskTable::with_columns(columns, rows))
    }

    pub fn write_risk_table(&self, table: &str, risk: &RiskTable) -> RiskResult<()> {
        let rows: Vec<Vec<Value>> = risk.rows.iter().map(risk_to_cells).collect();
        self.write_rows(table, SCHEMA, &risk.columns, &rows)
    }
}

fn risk_from_cells(cells: &[Value]) -> Option<RiskRecord> {
    let band = cell_string(&cells[3]);
    let risk_band = band.as_deref().and_then(RiskBand::parse);
    if let (Some(label), None) = (&band, risk_band) {
        log::debug!("Unrecognised risk_band '{label}' treated as undefined");
    }
    Some(RiskRecord {
        country: cell_string(&cells[0])?,
        commodity: cell_string(&cells[1])?,
        risk_score: cell_f64(&cells[2]),
        risk_band,
        mean_idr: cell_f64(&cells[4]),
        prod_vol_norm: cell_f64(&cells[5]),
        import_vol_norm: cell_f64(&cells[6]),
    })
}

fn risk_to_cells(record: &RiskRecord) -> Vec<Value> {
    vec![
        Value::Text(record.country.clone()),
        Value::Text(record.commodity.clone()),
        real(record.risk_score),
        record
            .risk_band
            .map_or(Value::Null, |b| Value::Text(b.as_str().to_string())),
        real(record.mean_idr),
        real(record.prod_vol_norm),
        real(record.import_vol_norm),
    ]
}

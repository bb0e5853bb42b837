//! Store methods for shocked tables (snapshot files).

use crate::{
    error::RiskResult,
    records::{col, ShockFields, ShockedRecord},
    table::ShockedTable,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, types::Value, OptionalExtension};

use super::{base, cell_bool, cell_f64, flag, real, TableStore};

/// Columns after the base columns, in storage order.
const SHOCK_SCHEMA: &[(&str, &str)] = &[
    (col::IMPORTS_USED, "REAL"),
    (col::IMPORTS_SHOCKED, "REAL"),
    (col::CONSUMPTION_SHOCKED, "REAL"),
    (col::SHORTFALL_ABS, "REAL"),
    (col::SHORTFALL_PCT, "REAL"),
    (col::IDR_SHOCKED_RAW, "REAL"),
    (col::IDR_SHOCKED, "REAL"),
    (col::FLAG_IMPORTS_EXCEED_CONSUMPTION, "INTEGER"),
    (col::FLAG_IDR_OVER_1, "INTEGER"),
    (col::FLAG_ZERO_CONSUMPTION_AFTER_SHOCK, "INTEGER"),
];

const META_TABLE: &str = "snapshot_meta";

/// Provenance row written next to a materialized snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotMeta {
    pub shock_pct: f64,
    pub n_rows: i64,
    pub created_at: DateTime<Utc>,
}

fn full_schema() -> Vec<(&'static str, &'static str)> {
    base::SCHEMA.iter().chain(SHOCK_SCHEMA).copied().collect()
}

impl TableStore {
    pub fn read_shocked_table(&self, table: &str) -> RiskResult<ShockedTable> {
        let mut columns = self.columns(table)?;
        columns.require(table, ShockedTable::REQUIRED)?;

        let schema = full_schema();
        let wanted: Vec<&str> = schema.iter().map(|(name, _)| *name).collect();
        let raw = self.read_rows(table, &wanted, &columns)?;
        let has_shortfall = columns.contains(col::SHORTFALL_ABS);

        let total = raw.len();
        let rows: Vec<ShockedRecord> = raw
            .iter()
            .filter_map(|cells| shocked_from_cells(cells, has_shortfall))
            .collect();
        if rows.len() < total {
            log::warn!(
                "Skipped {} rows of '{table}' with a null country or commodity",
                total - rows.len()
            );
        }
        if !has_shortfall {
            log::debug!("'{table}' has no shortfall_abs column, deriving it");
            columns.insert(col::SHORTFALL_ABS);
        }
        Ok(ShockedTable::with_columns(columns, rows))
    }

    pub fn write_shocked_table(&self, table: &str, shocked: &ShockedTable) -> RiskResult<()> {
        let rows: Vec<Vec<Value>> = shocked.rows.iter().map(shocked_to_cells).collect();
        self.write_rows(table, &full_schema(), &shocked.columns, &rows)
    }

    pub fn write_snapshot_meta(&self, meta: &SnapshotMeta) -> RiskResult<()> {
        self.conn.execute_batch(&format!(
            "DROP TABLE IF EXISTS {META_TABLE};
             CREATE TABLE {META_TABLE} (shock_pct REAL NOT NULL, n_rows INTEGER NOT NULL, created_at TEXT NOT NULL);"
        ))?;
        self.conn.execute(
            &format!("INSERT INTO {META_TABLE} (shock_pct, n_rows, created_at) VALUES (?1, ?2, ?3)"),
            params![meta.shock_pct, meta.n_rows, meta.created_at.to_rfc3339()],
        )?;
        Ok(())
    }

    /// Provenance of a snapshot file, when it carries a meta table.
    pub fn read_snapshot_meta(&self) -> RiskResult<Option<SnapshotMeta>> {
        if self.columns(META_TABLE)?.is_empty() {
            return Ok(None);
        }
        let row = self
            .conn
            .query_row(
                &format!("SELECT shock_pct, n_rows, created_at FROM {META_TABLE} LIMIT 1"),
                [],
                |row| {
                    Ok((
                        row.get::<_, f64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;
        Ok(row.and_then(|(shock_pct, n_rows, created_at)| {
            let created_at = DateTime::parse_from_rfc3339(&created_at)
                .map_err(|e| log::warn!("Bad snapshot created_at '{created_at}': {e}"))
                .ok()?
                .with_timezone(&Utc);
            Some(SnapshotMeta { shock_pct, n_rows, created_at })
        }))
    }
}

fn shocked_from_cells(cells: &[Value], has_shortfall: bool) -> Option<ShockedRecord> {
    let base_width = base::SCHEMA.len();
    let base = base::base_from_cells(&cells[..base_width])?;
    let s = &cells[base_width..];

    // Null shocked consumption counts as zero, like any other missing quantity.
    let consumption_shocked = cell_f64(&s[2]).unwrap_or(0.0);
    let shortfall_abs = match (has_shortfall, cell_f64(&s[3])) {
        (true, Some(v)) => v.max(0.0),
        _ => (base.apparent_consumption.unwrap_or(0.0) - consumption_shocked).max(0.0),
    };

    Some(ShockedRecord {
        base,
        shock: ShockFields {
            imports_used: cell_f64(&s[0]),
            imports_shocked: cell_f64(&s[1]),
            consumption_shocked,
            shortfall_abs,
            shortfall_pct: cell_f64(&s[4]),
            idr_shocked_raw: cell_f64(&s[5]),
            idr_shocked: cell_f64(&s[6]),
            flag_imports_exceed_consumption: cell_bool(&s[7]),
            flag_idr_over_1: cell_bool(&s[8]),
            flag_zero_consumption_after_shock: cell_bool(&s[9]),
        },
    })
}

fn shocked_to_cells(record: &ShockedRecord) -> Vec<Value> {
    let s = &record.shock;
    let mut cells = base::base_to_cells(&record.base);
    cells.extend([
        real(s.imports_used),
        real(s.imports_shocked),
        Value::Real(s.consumption_shocked),
        Value::Real(s.shortfall_abs),
        real(s.shortfall_pct),
        real(s.idr_shocked_raw),
        real(s.idr_shocked),
        flag(s.flag_imports_exceed_consumption),
        flag(s.flag_idr_over_1),
        flag(s.flag_zero_consumption_after_shock),
    ]);
    cells
}


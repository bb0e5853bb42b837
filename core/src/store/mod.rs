//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! Everything else works on the typed tables it returns.

use crate::{error::RiskResult, table::ColumnSet};
mod base;
mod risk;
mod shocked;
pub use shocked::SnapshotMeta;
use rusqlite::{types::Value, Connection, OpenFlags};
use std::path::Path;

pub struct TableStore {
    conn: Connection,
}

impl TableStore {
    /// Open an existing table file for reading.
    pub fn open_read_only(path: &Path) -> RiskResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self { conn })
    }

    /// Open (or create) a table file for writing.
    pub fn open(path: &Path) -> RiskResult<Self> {
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> RiskResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Columns physically present in `table`. Empty when the table is absent.
    pub fn columns(&self, table: &str) -> RiskResult<ColumnSet> {
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info({})", quote_ident(table)))?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<Result<ColumnSet, _>>()?;
        Ok(names)
    }

    /// Read `wanted` columns of every row, substituting NULL for columns the
    /// table lacks. Values come back in `wanted` order.
    fn read_rows(
        &self,
        table: &str,
        wanted: &[&str],
        present: &ColumnSet,
    ) -> RiskResult<Vec<Vec<Value>>> {
        let select = wanted
            .iter()
            .map(|name| {
                if present.contains(name) {
                    quote_ident(name)
                } else {
                    format!("NULL AS {}", quote_ident(name))
                }
            })
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("SELECT {select} FROM {} ORDER BY rowid", quote_ident(table));
        let mut stmt = self.conn.prepare(&sql)?;
        let width = wanted.len();
        let rows = stmt
            .query_map([], |row| {
                (0..width)
                    .map(|i| row.get::<_, Value>(i))
                    .collect::<Result<Vec<_>, _>>()
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Create `table` with the columns of `schema` that are in `present`
    /// and insert `rows` in one transaction.
    fn write_rows(
        &self,
        table: &str,
        schema: &[(&str, &str)],
        present: &ColumnSet,
        rows: &[Vec<Value>],
    ) -> RiskResult<()> {
        let keep: Vec<usize> = schema
            .iter()
            .enumerate()
            .filter(|(_, (name, _))| present.contains(name))
            .map(|(i, _)| i)
            .collect();
        let defs = keep
            .iter()
            .map(|&i| format!("{} {}", quote_ident(schema[i].0), schema[i].1))
            .collect::<Vec<_>>()
            .join(", ");
        let names = keep
            .iter()
            .map(|&i| quote_ident(schema[i].0))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=keep.len())
            .map(|n| format!("?{n}"))
            .collect::<Vec<_>>()
            .join(", ");

        let tx = self.conn.unchecked_transaction()?;
        tx.execute_batch(&format!(
            "DROP TABLE IF EXISTS {t}; CREATE TABLE {t} ({defs});",
            t = quote_ident(table)
        ))?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {} ({names}) VALUES ({placeholders})",
                quote_ident(table)
            ))?;
            for row in rows {
                stmt.execute(rusqlite::params_from_iter(keep.iter().map(|&i| &row[i])))?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

// ── Cell coercion ──────────────────────────────────────────────────
//
// Source tables are loosely typed. Numbers may arrive as integers, reals,
// or numeric text; anything unparseable or non-finite is undefined.

pub(crate) fn cell_f64(value: &Value) -> Option<f64> {
    let v = match value {
        Value::Integer(i) => *i as f64,
        Value::Real(r) => *r,
        Value::Text(t) => t.trim().parse::<f64>().ok()?,
        Value::Null | Value::Blob(_) => return None,
    };
    v.is_finite().then_some(v)
}

pub(crate) fn cell_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Integer(i) => Some(*i),
        Value::Real(r) if r.is_finite() => Some(r.trunc() as i64),
        Value::Text(t) => t.trim().parse::<i64>().ok(),
        _ => None,
    }
}

pub(crate) fn cell_string(value: &Value) -> Option<String> {
    match value {
        Value::Text(t) => Some(t.clone()),
        Value::Integer(i) => Some(i.to_string()),
        Value::Real(r) => Some(r.to_string()),
        Value::Null | Value::Blob(_) => None,
    }
}

pub(crate) fn cell_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Integer(i) => Some(*i != 0),
        Value::Real(r) => Some(*r != 0.0),
        Value::Text(t) => match t.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

pub(crate) fn real(value: Option<f64>) -> Value {
    value.map_or(Value::Null, Value::Real)
}

pub(crate) fn flag(value: Option<bool>) -> Value {
    value.map_or(Value::Null, |b| Value::Integer(b as i64))
}

//! In-memory tables and the column policy.
//!
//! Each table kind declares the columns it cannot do without and the ones
//! it tolerates missing. A `ColumnSet` records what the source actually
//! carried, so output schemas can omit fields the source never had.

use crate::{
    error::{RiskError, RiskResult},
    records::{col, BaseRecord, Keyed, RiskRecord, ShockedRecord},
};
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnSet(BTreeSet<String>);

impl ColumnSet {
    pub fn of(names: &[&str]) -> Self {
        Self(names.iter().map(|n| n.to_string()).collect())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn insert(&mut self, name: &str) {
        self.0.insert(name.to_string());
    }

    pub fn extend(&mut self, names: &[&str]) {
        for name in names {
            self.insert(name);
        }
    }

    pub fn union(&self, other: &ColumnSet) -> ColumnSet {
        Self(self.0.union(&other.0).cloned().collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Names in `required` that this set lacks, in declaration order.
    pub fn missing(&self, required: &[&str]) -> Vec<String> {
        required
            .iter()
            .filter(|name| !self.contains(name))
            .map(|name| name.to_string())
            .collect()
    }

    pub fn require(&self, table: &str, required: &[&str]) -> RiskResult<()> {
        let missing = self.missing(required);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(RiskError::Schema { table: table.to_string(), missing })
        }
    }
}

impl FromIterator<String> for ColumnSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Index of rows by exact join key. First occurrence wins.
pub fn index_by_key<T: Keyed>(rows: &[T]) -> HashMap<(&str, &str), &T> {
    let mut index = HashMap::with_capacity(rows.len());
    for row in rows {
        index.entry(row.key()).or_insert(row);
    }
    index
}

// ── Base ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BaseTable {
    pub columns: ColumnSet,
    pub rows: Vec<BaseRecord>,
}

impl BaseTable {
    pub const REQUIRED: &'static [&'static str] = &[col::COUNTRY, col::COMMODITY, col::YEAR];
    pub const OPTIONAL: &'static [&'static str] = &[
        col::PRODUCTION_QTY,
        col::IMPORT_QTY,
        col::EXPORT_QTY,
        col::APPARENT_CONSUMPTION,
        col::IMPORT_DEPENDENCY_RATIO,
    ];

    /// A table carrying every base column.
    pub fn new(rows: Vec<BaseRecord>) -> Self {
        let mut columns = ColumnSet::of(Self::REQUIRED);
        columns.extend(Self::OPTIONAL);
        Self { columns, rows }
    }

    pub fn with_columns(columns: ColumnSet, rows: Vec<BaseRecord>) -> Self {
        Self { columns, rows }
    }

    /// Same columns, rows narrowed by `keep`.
    pub fn filtered(&self, keep: impl Fn(&BaseRecord) -> bool) -> BaseTable {
        Self {
            columns: self.columns.clone(),
            rows: self.rows.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }

    /// The maximum-year row per (country, commodity), ordered by key.
    /// Equal years keep the later row.
    pub fn latest_per_key(&self) -> BaseTable {
        let mut latest: BTreeMap<(&str, &str), &BaseRecord> = BTreeMap::new();
        for row in &self.rows {
            let newer = latest
                .get(&row.key())
                .map_or(true, |current| row.year >= current.year);
            if newer {
                latest.insert(row.key(), row);
            }
        }
        Self {
            columns: self.columns.clone(),
            rows: latest.into_values().cloned().collect(),
        }
    }
}

// ── Risk ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RiskTable {
    pub columns: ColumnSet,
    pub rows: Vec<RiskRecord>,
}

impl RiskTable {
    pub const REQUIRED: &'static [&'static str] = &[col::COUNTRY, col::COMMODITY];
    pub const OPTIONAL: &'static [&'static str] = &[
        col::RISK_SCORE,
        col::RISK_BAND,
        col::MEAN_IDR,
        col::PROD_VOL_NORM,
        col::IMPORT_VOL_NORM,
    ];

    pub fn new(rows: Vec<RiskRecord>) -> Self {
        let mut columns = ColumnSet::of(Self::REQUIRED);
        columns.extend(Self::OPTIONAL);
        Self { columns, rows }
    }

    pub fn with_columns(columns: ColumnSet, rows: Vec<RiskRecord>) -> Self {
        Self { columns, rows }
    }

    pub fn filtered(&self, keep: impl Fn(&RiskRecord) -> bool) -> RiskTable {
        Self {
            columns: self.columns.clone(),
            rows: self.rows.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }
}

// ── Shocked ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShockedTable {
    pub columns: ColumnSet,
    pub rows: Vec<ShockedRecord>,
}

impl ShockedTable {
    /// `shortfall_abs` is not listed: it is derived when a source lacks it.
    pub const REQUIRED: &'static [&'static str] =
        &[col::COUNTRY, col::COMMODITY, col::CONSUMPTION_SHOCKED];

    /// Columns produced by the simulator on top of the base columns.
    pub const SIMULATED: &'static [&'static str] = &[
        col::IMPORTS_USED,
        col::IMPORTS_SHOCKED,
        col::CONSUMPTION_SHOCKED,
        col::SHORTFALL_ABS,
        col::SHORTFALL_PCT,
        col::IDR_SHOCKED_RAW,
        col::IDR_SHOCKED,
        col::FLAG_IMPORTS_EXCEED_CONSUMPTION,
        col::FLAG_IDR_OVER_1,
        col::FLAG_ZERO_CONSUMPTION_AFTER_SHOCK,
    ];

    pub fn with_columns(columns: ColumnSet, rows: Vec<ShockedRecord>) -> Self {
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

//! Output schemas and float rounding.
//!
//! Each response declares its field list up front. A field is emitted
//! only when one of the joined sources carried its column; a row that
//! simply missed the join gets `null` for it.

use crate::{
    records::{col, RankedRow},
    table::ColumnSet,
    types::round_to,
};
use serde_json::{Map, Value};

/// One response record, fields in schema order.
pub type Record = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Country,
    Commodity,
    RiskScore,
    RiskBand,
    MeanIdr,
    ProdVolNorm,
    ImportVolNorm,
    Year,
    ProductionQty,
    ImportQty,
    ExportQty,
    ApparentConsumption,
    ImportDependencyRatio,
    ShortfallPct,
    ShortfallAbs,
    ConsumptionShocked,
    IdrShocked,
    FlagZeroConsumptionAfterShock,
}

impl Field {
    pub fn name(&self) -> &'static str {
        match self {
            Field::Country                       => col::COUNTRY,
            Field::Commodity                     => col::COMMODITY,
            Field::RiskScore                     => col::RISK_SCORE,
            Field::RiskBand                      => col::RISK_BAND,
            Field::MeanIdr                       => col::MEAN_IDR,
            Field::ProdVolNorm                   => col::PROD_VOL_NORM,
            Field::ImportVolNorm                 => col::IMPORT_VOL_NORM,
            Field::Year                          => col::YEAR,
            Field::ProductionQty                 => col::PRODUCTION_QTY,
            Field::ImportQty                     => col::IMPORT_QTY,
            Field::ExportQty                     => col::EXPORT_QTY,
            Field::ApparentConsumption           => col::APPARENT_CONSUMPTION,
            Field::ImportDependencyRatio         => col::IMPORT_DEPENDENCY_RATIO,
            Field::ShortfallPct                  => col::SHORTFALL_PCT,
            Field::ShortfallAbs                  => col::SHORTFALL_ABS,
            Field::ConsumptionShocked            => col::CONSUMPTION_SHOCKED,
            Field::IdrShocked                    => col::IDR_SHOCKED,
            Field::FlagZeroConsumptionAfterShock => col::FLAG_ZERO_CONSUMPTION_AFTER_SHOCK,
        }
    }

    fn value(&self, row: &RankedRow, decimals: u32) -> Value {
        let risk = row.risk.as_ref();
        let base = row.base.as_ref();
        let shock = row.shock.as_ref();
        let float = |v: Option<f64>| match v {
            Some(x) => Value::from(round_to(x, decimals)),
            None => Value::Null,
        };
        match self {
            Field::Country     => Value::from(row.country.clone()),
            Field::Commodity   => Value::from(row.commodity.clone()),
            Field::RiskScore   => float(risk.and_then(|r| r.risk_score)),
            Field::RiskBand    => risk
                .and_then(|r| r.risk_band)
                .map_or(Value::Null, |b| Value::from(b.as_str())),
            Field::MeanIdr       => float(risk.and_then(|r| r.mean_idr)),
            Field::ProdVolNorm   => float(risk.and_then(|r| r.prod_vol_norm)),
            Field::ImportVolNorm => float(risk.and_then(|r| r.import_vol_norm)),
            Field::Year          => base.and_then(|b| b.year).map_or(Value::Null, Value::from),
            Field::ProductionQty => float(base.and_then(|b| b.production_qty)),
            Field::ImportQty     => float(base.and_then(|b| b.import_qty)),
            Field::ExportQty     => float(base.and_then(|b| b.export_qty)),
            Field::ApparentConsumption   => float(base.and_then(|b| b.apparent_consumption)),
            Field::ImportDependencyRatio => float(base.and_then(|b| b.import_dependency_ratio)),
            Field::ShortfallPct        => float(shock.and_then(|s| s.shortfall_pct)),
            Field::ShortfallAbs        => float(shock.map(|s| s.shortfall_abs)),
            Field::ConsumptionShocked  => float(shock.map(|s| s.consumption_shocked)),
            Field::IdrShocked          => float(shock.and_then(|s| s.idr_shocked)),
            Field::FlagZeroConsumptionAfterShock => shock
                .and_then(|s| s.flag_zero_consumption_after_shock)
                .map_or(Value::Null, Value::from),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OutputSchema(&'static [Field]);

/// Ranked and simulated rows.
pub const RANKED_SCHEMA: OutputSchema = OutputSchema(&[
    Field::Country,
    Field::Commodity,
    Field::RiskScore,
    Field::RiskBand,
    Field::MeanIdr,
    Field::ProdVolNorm,
    Field::ImportVolNorm,
    Field::Year,
    Field::ProductionQty,
    Field::ImportQty,
    Field::ExportQty,
    Field::ApparentConsumption,
    Field::ImportDependencyRatio,
    Field::ShortfallPct,
    Field::ShortfallAbs,
    Field::ConsumptionShocked,
    Field::IdrShocked,
    Field::FlagZeroConsumptionAfterShock,
]);

/// Country drilldown: same as ranked rows without `idr_shocked`.
pub const PROFILE_SCHEMA: OutputSchema = OutputSchema(&[
    Field::Country,
    Field::Commodity,
    Field::RiskScore,
    Field::RiskBand,
    Field::MeanIdr,
    Field::ProdVolNorm,
    Field::ImportVolNorm,
    Field::Year,
    Field::ProductionQty,
    Field::ImportQty,
    Field::ExportQty,
    Field::ApparentConsumption,
    Field::ImportDependencyRatio,
    Field::ShortfallPct,
    Field::ShortfallAbs,
    Field::ConsumptionShocked,
    Field::FlagZeroConsumptionAfterShock,
]);

impl OutputSchema {
    /// Fields this schema emits given the columns present in the sources.
    pub fn present(&self, columns: &ColumnSet) -> Vec<Field> {
        self.0
            .iter()
            .copied()
            .filter(|f| columns.contains(f.name()))
            .collect()
    }

    pub fn render(&self, rows: &[RankedRow], columns: &ColumnSet, decimals: u32) -> Vec<Record> {
        let fields = self.present(columns);
        rows.iter()
            .map(|row| {
                fields
                    .iter()
                    .map(|f| (f.name().to_string(), f.value(row, decimals)))
                    .collect()
            })
            .collect()
    }
}

//! Row types for the base, risk, and shocked tables, and the merged row
//! that leaves the ranking engine.

use crate::types::{Commodity, Country, RiskBand};
use serde::{Deserialize, Serialize};

/// Column names, shared by the table store, the column policy, and the
/// output schemas.
pub mod col {
    pub const COUNTRY: &str = "country";
    pub const COMMODITY: &str = "commodity";
    pub const YEAR: &str = "year";
    pub const PRODUCTION_QTY: &str = "production_qty";
    pub const IMPORT_QTY: &str = "import_qty";
    pub const EXPORT_QTY: &str = "export_qty";
    pub const APPARENT_CONSUMPTION: &str = "apparent_consumption";
    pub const IMPORT_DEPENDENCY_RATIO: &str = "import_dependency_ratio";

    pub const RISK_SCORE: &str = "risk_score";
    pub const RISK_BAND: &str = "risk_band";
    pub const MEAN_IDR: &str = "mean_idr";
    pub const PROD_VOL_NORM: &str = "prod_vol_norm";
    pub const IMPORT_VOL_NORM: &str = "import_vol_norm";

    pub const IMPORTS_USED: &str = "imports_used";
    pub const IMPORTS_SHOCKED: &str = "imports_shocked";
    pub const CONSUMPTION_SHOCKED: &str = "consumption_shocked";
    pub const SHORTFALL_ABS: &str = "shortfall_abs";
    pub const SHORTFALL_PCT: &str = "shortfall_pct";
    pub const IDR_SHOCKED_RAW: &str = "idr_shocked_raw";
    pub const IDR_SHOCKED: &str = "idr_shocked";
    pub const FLAG_IMPORTS_EXCEED_CONSUMPTION: &str = "flag_imports_exceed_consumption";
    pub const FLAG_IDR_OVER_1: &str = "flag_idr_over_1";
    pub const FLAG_ZERO_CONSUMPTION_AFTER_SHOCK: &str = "flag_zero_consumption_after_shock";
}

/// Anything addressable by the (country, commodity) join key.
pub trait Keyed {
    fn country(&self) -> &str;
    fn commodity(&self) -> &str;

    fn key(&self) -> (&str, &str) {
        (self.country(), self.commodity())
    }
}

/// One production/trade/consumption observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseRecord {
    pub country: Country,
    pub commodity: Commodity,
    pub year: Option<i64>,
    pub production_qty: Option<f64>,
    pub import_qty: Option<f64>,
    pub export_qty: Option<f64>,
    pub apparent_consumption: Option<f64>,
    pub import_dependency_ratio: Option<f64>,
}

impl BaseRecord {
    pub fn new(country: impl Into<Country>, commodity: impl Into<Commodity>, year: i64) -> Self {
        Self {
            country: country.into(),
            commodity: commodity.into(),
            year: Some(year),
            production_qty: None,
            import_qty: None,
            export_qty: None,
            apparent_consumption: None,
            import_dependency_ratio: None,
        }
    }

    /// Fill the trade figures and derive consumption and IDR the way the
    /// ingestion pipeline does.
    pub fn with_trade(mut self, production: f64, imports: f64, exports: f64) -> Self {
        let consumption = (production + imports - exports).max(0.0);
        self.production_qty = Some(production);
        self.import_qty = Some(imports);
        self.export_qty = Some(exports);
        self.apparent_consumption = Some(consumption);
        self.import_dependency_ratio = if consumption > 0.0 {
            Some(imports / consumption)
        } else {
            None
        };
        self
    }
}

impl Keyed for BaseRecord {
    fn country(&self) -> &str { &self.country }
    fn commodity(&self) -> &str { &self.commodity }
}

/// Upstream risk score for one country and commodity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskRecord {
    pub country: Country,
    pub commodity: Commodity,
    pub risk_score: Option<f64>,
    pub risk_band: Option<RiskBand>,
    pub mean_idr: Option<f64>,
    pub prod_vol_norm: Option<f64>,
    pub import_vol_norm: Option<f64>,
}

impl RiskRecord {
    pub fn new(
        country: impl Into<Country>,
        commodity: impl Into<Commodity>,
        risk_score: f64,
        risk_band: RiskBand,
    ) -> Self {
        Self {
            country: country.into(),
            commodity: commodity.into(),
            risk_score: Some(risk_score),
            risk_band: Some(risk_band),
            mean_idr: None,
            prod_vol_norm: None,
            import_vol_norm: None,
        }
    }
}

impl Keyed for RiskRecord {
    fn country(&self) -> &str { &self.country }
    fn commodity(&self) -> &str { &self.commodity }
}

/// Simulation output attached to a base record.
///
/// `consumption_shocked` and `shortfall_abs` are always known; the rest
/// may be absent when the row was read from a snapshot that lacks them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShockFields {
    pub imports_used: Option<f64>,
    pub imports_shocked: Option<f64>,
    pub consumption_shocked: f64,
    pub shortfall_abs: f64,
    pub shortfall_pct: Option<f64>,
    pub idr_shocked_raw: Option<f64>,
    pub idr_shocked: Option<f64>,
    pub flag_imports_exceed_consumption: Option<bool>,
    pub flag_idr_over_1: Option<bool>,
    pub flag_zero_consumption_after_shock: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShockedRecord {
    pub base: BaseRecord,
    pub shock: ShockFields,
}

impl Keyed for ShockedRecord {
    fn country(&self) -> &str { &self.base.country }
    fn commodity(&self) -> &str { &self.base.commodity }
}

/// A merged row: any side of the join may be missing.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedRow {
    pub country: Country,
    pub commodity: Commodity,
    pub risk: Option<RiskRecord>,
    pub base: Option<BaseRecord>,
    pub shock: Option<ShockFields>,
}

impl RankedRow {
    pub fn shortfall_abs(&self) -> Option<f64> {
        self.shock.as_ref().map(|s| s.shortfall_abs)
    }

    pub fn risk_score(&self) -> Option<f64> {
        self.risk.as_ref().and_then(|r| r.risk_score)
    }

    pub fn risk_band(&self) -> Option<RiskBand> {
        self.risk.as_ref().and_then(|r| r.risk_band)
    }

    pub fn apparent_consumption(&self) -> Option<f64> {
        self.base.as_ref().and_then(|b| b.apparent_consumption)
    }
}

impl Keyed for RankedRow {
    fn country(&self) -> &str { &self.country }
    fn commodity(&self) -> &str { &self.commodity }
}

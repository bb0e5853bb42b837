//! Response envelopes. Every float in them is already rounded.

use crate::{output::Record, region::Region, types::RiskBand};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct TopRiskResponse {
    /// "cached" or "live": where the shortfall fields came from.
    pub mode: &'static str,
    pub shock_pct: f64,
    pub commodity: Option<String>,
    pub region: Region,
    pub n_records: usize,
    pub records: Vec<Record>,
    pub note: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CountryProfileResponse {
    pub country: String,
    pub n_records: usize,
    pub records: Vec<Record>,
    pub note: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationResponse {
    pub country: String,
    pub shock_pct: f64,
    pub n_records: usize,
    pub records: Vec<Record>,
    pub note: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommodityList {
    pub n: usize,
    pub commodities: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CountryList {
    pub n: usize,
    pub countries: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CachedShockList {
    pub n: usize,
    pub shocks: Vec<f64>,
    pub files: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub country: String,
    pub commodity: String,
    pub shortfall_abs_a: Option<f64>,
    pub shortfall_abs_b: Option<f64>,
    pub shortfall_diff: Option<f64>,
    pub risk_band: Option<RiskBand>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShockComparisonResponse {
    pub shock_a: f64,
    pub shock_b: f64,
    pub n_records: usize,
    pub records: Vec<ComparisonRow>,
    pub note: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub status: &'static str,
    pub tables_loaded: bool,
    pub cached_shocks: Vec<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MaterializedSnapshot {
    pub shock_pct: f64,
    pub file: String,
    pub n_records: usize,
}

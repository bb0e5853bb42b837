use crate::region::Region;
use serde::{Deserialize, Serialize};

pub const DEFAULT_TOP_N: usize = 20;
pub const DEFAULT_SHOCK_PCT: f64 = 0.20;

fn default_n() -> usize { DEFAULT_TOP_N }
fn default_shock() -> f64 { DEFAULT_SHOCK_PCT }

/// Every operation the engine serves, as a tagged request.
/// Used by the runner's JSON-lines loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum EngineQuery {
    TopRisk {
        #[serde(default = "default_n")]
        n: usize,
        #[serde(default = "default_shock")]
        shock_pct: f64,
        #[serde(default)]
        commodity: Option<String>,
        #[serde(default)]
        region: Option<String>,
        #[serde(default)]
        cached: bool,
    },
    RiskByCountry {
        country: String,
    },
    SimulateRisk {
        country: String,
        #[serde(default = "default_shock")]
        shock_pct: f64,
    },
    ListCommodities,
    ListCountries {
        #[serde(default)]
        q: Option<String>,
    },
    ListCachedShocks,
    CompareShocks {
        #[serde(default = "default_n")]
        n: usize,
        shock_a: f64,
        shock_b: f64,
        #[serde(default)]
        commodity: Option<String>,
        #[serde(default)]
        region: Option<String>,
        #[serde(default)]
        cached: bool,
    },
    ServiceInfo,
    MaterializeSnapshot {
        shock_pct: f64,
    },
}

/// Parameters of a top-N ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct TopRequest {
    pub n: usize,
    pub shock_pct: f64,
    pub commodity: Option<String>,
    pub region: Region,
    pub cached: bool,
}

impl TopRequest {
    pub fn new(n: usize, shock_pct: f64) -> Self {
        Self { n, shock_pct, commodity: None, region: Region::All, cached: false }
    }

    pub fn commodity(mut self, commodity: impl Into<String>) -> Self {
        self.commodity = Some(commodity.into());
        self
    }

    pub fn region(mut self, region: Region) -> Self {
        self.region = region;
        self
    }

    pub fn cached(mut self, cached: bool) -> Self {
        self.cached = cached;
        self
    }

    /// Empty commodity strings mean "any commodity".
    pub(crate) fn commodity_filter(&self) -> Option<String> {
        self.commodity
            .as_ref()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
    }
}

/// Parameters of a two-shock comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct CompareRequest {
    pub n: usize,
    pub shock_a: f64,
    pub shock_b: f64,
    pub commodity: Option<String>,
    pub region: Region,
    pub cached: bool,
}

impl CompareRequest {
    pub fn new(n: usize, shock_a: f64, shock_b: f64) -> Self {
        Self { n, shock_a, shock_b, commodity: None, region: Region::All, cached: false }
    }

    pub(crate) fn top(&self, shock_pct: f64) -> TopRequest {
        TopRequest {
            n: self.n,
            shock_pct,
            commodity: self.commodity.clone(),
            region: self.region,
            cached: self.cached,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queries_fill_defaults() {
        let q: EngineQuery = serde_json::from_str(r#"{"op":"top_risk","cached":true}"#).unwrap();
        match q {
            EngineQuery::TopRisk { n, shock_pct, cached, commodity, .. } => {
                assert_eq!(n, DEFAULT_TOP_N);
                assert_eq!(shock_pct, DEFAULT_SHOCK_PCT);
                assert!(cached);
                assert!(commodity.is_none());
            }
            other => panic!("unexpected query {other:?}"),
        }

        let q: EngineQuery = serde_json::from_str(r#"{"op":"list_commodities"}"#).unwrap();
        assert!(matches!(q, EngineQuery::ListCommodities));
    }
}

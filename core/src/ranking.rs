//! Ranking engine: merge shocked rows with risk scores, filter, sort,
//! truncate.
//!
//! RULES:
//!   - The join is a left join on (country, commodity). Unscored rows stay.
//!   - Special areas are removed before any other comparison.
//!   - Sorting is stable and descending per key; undefined values sort last.
//!   - "No rows" is an empty result, never an error.

use crate::{
    config::EngineConfig,
    country::SpecialAreas,
    records::{Keyed, RankedRow},
    region::{Region, RegionTable},
    table::{index_by_key, ColumnSet, RiskTable, ShockedTable},
};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    ShortfallAbs,
    RiskScore,
    ApparentConsumption,
}

impl SortKey {
    fn extract(&self, row: &RankedRow) -> Option<f64> {
        match self {
            SortKey::ShortfallAbs        => row.shortfall_abs(),
            SortKey::RiskScore           => row.risk_score(),
            SortKey::ApparentConsumption => row.apparent_consumption(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SortKey::ShortfallAbs        => "shortfall_abs",
            SortKey::RiskScore           => "risk_score",
            SortKey::ApparentConsumption => "apparent_consumption",
        }
    }
}

/// Exposure ranking used by `top`.
pub const SHOCK_RANKING: &[SortKey] =
    &[SortKey::ShortfallAbs, SortKey::RiskScore, SortKey::ApparentConsumption];

/// Order of ad-hoc simulation results.
pub const SIMULATION_ORDER: &[SortKey] = &[SortKey::ShortfallAbs, SortKey::RiskScore];

/// Order of the country profile.
pub const PROFILE_ORDER: &[SortKey] = &[SortKey::RiskScore];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RankingFilters {
    pub region: Region,
    pub commodity: Option<String>,
}

impl RankingFilters {
    pub fn commodity(commodity: impl Into<String>) -> Self {
        Self { commodity: Some(commodity.into()), ..Self::default() }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RankedResult {
    pub rows: Vec<RankedRow>,
    /// Columns present across the joined sources.
    pub columns: ColumnSet,
    /// Rows that entered the ranking before filters and truncation.
    pub candidates: usize,
}

impl RankedResult {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

pub struct RankingEngine {
    special: SpecialAreas,
    regions: RegionTable,
}

impl RankingEngine {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            special: SpecialAreas::new(&config.special_areas),
            regions: config.region_table(),
        }
    }

    pub fn special_areas(&self) -> &SpecialAreas {
        &self.special
    }

    /// Filter chain: special area, region, commodity.
    pub fn admits(&self, country: &str, commodity: &str, filters: &RankingFilters) -> bool {
        if self.special.is_special(country) {
            return false;
        }
        if !self.regions.admits(filters.region, country) {
            return false;
        }
        match &filters.commodity {
            Some(wanted) => commodity.to_lowercase() == wanted.trim().to_lowercase(),
            None => true,
        }
    }

    pub fn build_ranking(
        &self,
        shocked: &ShockedTable,
        risk: &RiskTable,
        filters: &RankingFilters,
        order: &[SortKey],
        top_n: Option<usize>,
    ) -> RankedResult {
        let risk_index = index_by_key(&risk.rows);

        let mut rows: Vec<RankedRow> = shocked
            .rows
            .iter()
            .filter(|row| self.admits(row.country(), row.commodity(), filters))
            .map(|row| RankedRow {
                country: row.base.country.clone(),
                commodity: row.base.commodity.clone(),
                risk: risk_index.get(&row.key()).map(|r| (*r).clone()),
                base: Some(row.base.clone()),
                shock: Some(row.shock.clone()),
            })
            .collect();

        sort_rows(&mut rows, order);
        if let Some(n) = top_n {
            rows.truncate(n);
        }

        log::debug!(
            "Ranking kept {} of {} rows (region={}, commodity={:?})",
            rows.len(),
            shocked.len(),
            filters.region.as_str(),
            filters.commodity
        );

        RankedResult {
            rows,
            columns: shocked.columns.union(&risk.columns),
            candidates: shocked.len(),
        }
    }
}

/// Stable multi-key sort, each key descending with undefined values last.
pub fn sort_rows(rows: &mut [RankedRow], order: &[SortKey]) {
    rows.sort_by(|a, b| {
        order
            .iter()
            .map(|key| desc_nulls_last(key.extract(a), key.extract(b)))
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    });
}

pub fn desc_nulls_last(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None)    => Ordering::Less,
        (None, Some(_))    => Ordering::Greater,
        (None, None)       => Ordering::Equal,
    }
}

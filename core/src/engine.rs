//! The risk engine: the serving façade over tables, snapshots, the shock
//! simulator, and the ranking engine.
//!
//! RULES:
//!   - Every operation is synchronous and works on already-loaded tables.
//!   - Nothing mutates a shared table; every filter/sort/merge is a new view.
//!   - A response is complete and rounded, or the call fails. Never partial.
//!   - `n_records` is the length of the returned records, after truncation.

use crate::{
    cache::{SqliteTableSource, TableCache, TableSource, Tables},
    config::EngineConfig,
    country::CountryResolver,
    error::{RiskError, RiskResult},
    output::{PROFILE_SCHEMA, RANKED_SCHEMA},
    query::{CompareRequest, EngineQuery, TopRequest},
    ranking::{
        desc_nulls_last, sort_rows, RankedResult, RankingEngine, RankingFilters, PROFILE_ORDER,
        SHOCK_RANKING, SIMULATION_ORDER,
    },
    records::{col, Keyed, RankedRow, ShockFields},
    region::Region,
    response::{
        CachedShockList, CommodityList, ComparisonRow, CountryList, CountryProfileResponse,
        MaterializedSnapshot, ServiceInfo, ShockComparisonResponse, SimulationResponse,
        TopRiskResponse,
    },
    shock,
    snapshot::{Snapshot, SnapshotStore},
    table::{index_by_key, BaseTable, RiskTable, ShockedTable},
    types::{round_to, validate_shock},
};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

const RANKING_NOTE: &str =
    "Ranked by shortfall_abs DESC, then risk_score DESC, then apparent_consumption DESC";

/// Where a ranking's shocked rows came from.
enum ShockSource {
    Cached(Arc<Snapshot>),
    Live(ShockedTable),
}

impl ShockSource {
    fn table(&self) -> &ShockedTable {
        match self {
            ShockSource::Cached(snapshot) => &snapshot.table,
            ShockSource::Live(table) => table,
        }
    }

    fn mode(&self) -> &'static str {
        match self {
            ShockSource::Cached(_) => "cached",
            ShockSource::Live(_) => "live",
        }
    }
}

pub struct RiskEngine {
    config: EngineConfig,
    tables: TableCache,
    snapshots: SnapshotStore,
    ranking: RankingEngine,
}

impl RiskEngine {
    /// Engine over the SQLite files named by `config`.
    pub fn open(config: EngineConfig) -> Self {
        let source = SqliteTableSource::from_config(&config);
        Self::with_source(config, Box::new(source))
    }

    /// Engine over any table source. Snapshots still come from
    /// `config.processed_dir`.
    pub fn with_source(config: EngineConfig, source: Box<dyn TableSource>) -> Self {
        Self {
            tables: TableCache::new(source),
            snapshots: SnapshotStore::new(&config),
            ranking: RankingEngine::new(&config),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn snapshots(&self) -> &SnapshotStore {
        &self.snapshots
    }

    pub fn tables(&self) -> RiskResult<Arc<Tables>> {
        self.tables.get()
    }

    fn round(&self, value: f64) -> f64 {
        round_to(value, self.config.float_decimals)
    }

    fn resolver(&self) -> CountryResolver<'_> {
        CountryResolver::new(self.ranking.special_areas())
    }

    // ── top ────────────────────────────────────────────────────────

    pub fn top_risk(&self, req: &TopRequest) -> RiskResult<TopRiskResponse> {
        let (result, source, note) = self.rank_top(req)?;
        let records = RANKED_SCHEMA.render(&result.rows, &result.columns, self.config.float_decimals);
        Ok(TopRiskResponse {
            mode: source.mode(),
            shock_pct: self.round(req.shock_pct),
            commodity: req.commodity_filter(),
            region: req.region,
            n_records: records.len(),
            records,
            note,
        })
    }

    fn rank_top(&self, req: &TopRequest) -> RiskResult<(RankedResult, ShockSource, String)> {
        if req.n < 1 || req.n > self.config.max_top_n {
            return Err(RiskError::InvalidParameter(format!(
                "n must be between 1 and {}, got {}",
                self.config.max_top_n, req.n
            )));
        }
        let shock_pct = validate_shock(req.shock_pct)?;
        let filters = RankingFilters { region: req.region, commodity: req.commodity_filter() };
        let tables = self.tables.get()?;

        let (source, note) = if req.cached {
            match self.snapshots.load(shock_pct) {
                Ok(snapshot) => {
                    let mut note = format!(
                        "Loaded from cached snapshot: {} (precomputed). {RANKING_NOTE}.",
                        snapshot.file
                    );
                    if (snapshot.shock_pct - shock_pct).abs() > 1e-9 {
                        note.push_str(&format!(
                            " Requested shock_pct={shock_pct} was rounded to the {}% snapshot.",
                            snapshot.percent
                        ));
                    }
                    (ShockSource::Cached(snapshot), note)
                }
                Err(e) if e.is_not_found() && self.config.cached_fallback_to_live => {
                    log::warn!("{e} Falling back to live simulation.");
                    let live = self.simulate_latest(&tables.base, &filters, shock_pct)?;
                    let note = format!(
                        "No cached snapshot for shock_pct={shock_pct}; fell back to live simulation. \
                         {RANKING_NOTE} (simulation computed live)."
                    );
                    (ShockSource::Live(live), note)
                }
                Err(e) => return Err(e),
            }
        } else {
            let live = self.simulate_latest(&tables.base, &filters, shock_pct)?;
            (ShockSource::Live(live), format!("{RANKING_NOTE} (simulation computed live)."))
        };

        let result = self.ranking.build_ranking(
            source.table(),
            &tables.risk,
            &filters,
            SHOCK_RANKING,
            Some(req.n),
        );
        if result.is_empty() {
            return Err(RiskError::NotFound(
                "No rows match your filters after cleaning.".into(),
            ));
        }
        Ok((result, source, note))
    }

    /// Latest-year base rows admitted by `filters`, simulated live.
    fn simulate_latest(
        &self,
        base: &BaseTable,
        filters: &RankingFilters,
        shock_pct: f64,
    ) -> RiskResult<ShockedTable> {
        let latest = base
            .filtered(|r| self.ranking.admits(&r.country, &r.commodity, filters))
            .latest_per_key();
        shock::simulate(&latest, shock_pct)
    }

    // ── country profile ────────────────────────────────────────────

    pub fn risk_by_country(&self, country: &str) -> RiskResult<CountryProfileResponse> {
        let tables = self.tables.get()?;
        let resolver = self.resolver();

        let base_rows = resolver.resolve(country, &tables.base.rows);
        let risk_rows = resolver.resolve(country, &tables.risk.rows);
        if base_rows.is_empty() && risk_rows.is_empty() {
            return Err(RiskError::NotFound(format!(
                "No risk data for country='{}' (after cleaning)",
                country.trim()
            )));
        }
        let snapshot = &tables.default_snapshot;
        let snap_rows = resolver.resolve(country, &snapshot.table.rows);

        let latest = BaseTable::with_columns(tables.base.columns.clone(), base_rows).latest_per_key();
        let risk_index = index_by_key(&risk_rows);
        let snap_index = index_by_key(&snap_rows);

        let mut rows: Vec<RankedRow> = latest
            .rows
            .iter()
            .map(|b| RankedRow {
                country: b.country.clone(),
                commodity: b.commodity.clone(),
                risk: risk_index.get(&b.key()).map(|r| (*r).clone()),
                base: Some(b.clone()),
                // Shortfall is re-derived against this row's own consumption.
                shock: snap_index.get(&b.key()).map(|s| ShockFields {
                    shortfall_abs: (b.apparent_consumption.unwrap_or(0.0)
                        - s.shock.consumption_shocked)
                        .max(0.0),
                    ..s.shock.clone()
                }),
            })
            .collect();

        let with_base: HashSet<(&str, &str)> = latest.rows.iter().map(|b| b.key()).collect();
        rows.extend(
            risk_rows
                .iter()
                .filter(|r| !with_base.contains(&r.key()))
                .map(|r| RankedRow {
                    country: r.country.clone(),
                    commodity: r.commodity.clone(),
                    risk: Some(r.clone()),
                    base: None,
                    shock: None,
                }),
        );
        sort_rows(&mut rows, PROFILE_ORDER);

        let mut columns = tables.base.columns.union(&tables.risk.columns);
        for field in [
            col::SHORTFALL_PCT,
            col::CONSUMPTION_SHOCKED,
            col::FLAG_ZERO_CONSUMPTION_AFTER_SHOCK,
        ] {
            if snapshot.table.columns.contains(field) {
                columns.insert(field);
            }
        }
        columns.insert(col::SHORTFALL_ABS);

        let records = PROFILE_SCHEMA.render(&rows, &columns, self.config.float_decimals);
        Ok(CountryProfileResponse {
            country: rows[0].country.clone(),
            n_records: records.len(),
            records,
            note: format!(
                "shortfall_* / consumption_shocked come from the precomputed {}% import-drop \
                 snapshot ({}).",
                snapshot.percent, snapshot.file
            ),
        })
    }

    // ── ad-hoc simulation ──────────────────────────────────────────

    pub fn simulate_risk(&self, country: &str, shock_pct: f64) -> RiskResult<SimulationResponse> {
        let shock_pct = validate_shock(shock_pct)?;
        let tables = self.tables.get()?;
        let resolver = self.resolver();

        let base_rows = resolver.resolve(country, &tables.base.rows);
        if base_rows.is_empty() {
            return Err(RiskError::NotFound(format!(
                "No base data for country='{}' (after cleaning)",
                country.trim()
            )));
        }
        let latest = BaseTable::with_columns(tables.base.columns.clone(), base_rows).latest_per_key();
        let shocked = shock::simulate(&latest, shock_pct)?;
        let risk = RiskTable::with_columns(
            tables.risk.columns.clone(),
            resolver.resolve(country, &tables.risk.rows),
        );

        let result = self.ranking.build_ranking(
            &shocked,
            &risk,
            &RankingFilters::default(),
            SIMULATION_ORDER,
            None,
        );
        let records = RANKED_SCHEMA.render(&result.rows, &result.columns, self.config.float_decimals);
        Ok(SimulationResponse {
            country: country.trim().to_string(),
            shock_pct: self.round(shock_pct),
            n_records: records.len(),
            records,
            note: "This simulation is computed live from latest base-year data per commodity."
                .into(),
        })
    }

    // ── metadata ───────────────────────────────────────────────────

    pub fn list_commodities(&self) -> RiskResult<CommodityList> {
        let tables = self.tables.get()?;
        let commodities: Vec<String> = tables
            .risk
            .rows
            .iter()
            .map(|r| r.commodity.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        Ok(CommodityList { n: commodities.len(), commodities })
    }

    pub fn list_countries(&self, q: Option<&str>) -> RiskResult<CountryList> {
        let tables = self.tables.get()?;
        let special = self.ranking.special_areas();
        let needle = q.map(|s| s.trim().to_lowercase()).filter(|s| !s.is_empty());

        let countries: Vec<String> = tables
            .risk
            .rows
            .iter()
            .map(|r| r.country.as_str())
            .filter(|c| !special.is_special(c))
            .filter(|c| needle.as_ref().map_or(true, |n| c.to_lowercase().contains(n.as_str())))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .take(self.config.max_countries)
            .map(str::to_string)
            .collect();
        Ok(CountryList { n: countries.len(), countries })
    }

    pub fn list_cached_shocks(&self) -> RiskResult<CachedShockList> {
        let available = self.snapshots.list_available()?;
        Ok(CachedShockList {
            n: available.len(),
            shocks: available.iter().map(|s| s.shock_pct).collect(),
            files: available.into_iter().map(|s| s.file).collect(),
        })
    }

    pub fn service_info(&self) -> ServiceInfo {
        let cached_shocks = self.snapshots.available_fractions().unwrap_or_else(|e| {
            log::warn!("Cannot list cached shocks: {e}");
            Vec::new()
        });
        ServiceInfo {
            name: "Food Import Risk Engine",
            version: env!("CARGO_PKG_VERSION"),
            status: "ok",
            tables_loaded: self.tables.is_loaded(),
            cached_shocks,
        }
    }

    // ── comparison ─────────────────────────────────────────────────

    /// Rank the same filters under two shocks and report the change in
    /// absolute shortfall for rows present in both rankings.
    pub fn compare_shocks(&self, req: &CompareRequest) -> RiskResult<ShockComparisonResponse> {
        let shock_a = validate_shock(req.shock_a)?;
        let shock_b = validate_shock(req.shock_b)?;
        if shock_a == shock_b {
            return Err(RiskError::InvalidParameter(
                "shock_a and shock_b must differ".into(),
            ));
        }
        let (a, _, note_a) = self.rank_top(&req.top(shock_a))?;
        let (b, _, note_b) = self.rank_top(&req.top(shock_b))?;

        let b_index = index_by_key(&b.rows);
        let mut records: Vec<ComparisonRow> = a
            .rows
            .iter()
            .filter_map(|row_a| {
                let row_b = b_index.get(&row_a.key())?;
                let sa = row_a.shortfall_abs().map(|v| self.round(v));
                let sb = row_b.shortfall_abs().map(|v| self.round(v));
                let diff = match (row_a.shortfall_abs(), row_b.shortfall_abs()) {
                    (Some(x), Some(y)) => Some(self.round(y - x)),
                    _ => None,
                };
                Some(ComparisonRow {
                    country: row_a.country.clone(),
                    commodity: row_a.commodity.clone(),
                    shortfall_abs_a: sa,
                    shortfall_abs_b: sb,
                    shortfall_diff: diff,
                    risk_band: row_b.risk_band(),
                })
            })
            .collect();
        records.sort_by(|x, y| desc_nulls_last(x.shortfall_diff, y.shortfall_diff));

        Ok(ShockComparisonResponse {
            shock_a: self.round(shock_a),
            shock_b: self.round(shock_b),
            n_records: records.len(),
            records,
            note: format!("Shock A: {note_a} Shock B: {note_b}"),
        })
    }

    // ── materialization ────────────────────────────────────────────

    /// Simulate every latest-year row (special areas excluded) and write
    /// the result as a new snapshot file.
    pub fn materialize_snapshot(&self, shock_pct: f64) -> RiskResult<MaterializedSnapshot> {
        let shock_pct = validate_shock(shock_pct)?;
        let tables = self.tables.get()?;
        let shocked = self.simulate_latest(&tables.base, &RankingFilters::default(), shock_pct)?;
        let written = self.snapshots.write(shock_pct, &shocked)?;
        Ok(MaterializedSnapshot {
            shock_pct: written.shock_pct,
            file: written.file,
            n_records: shocked.len(),
        })
    }

    // ── dispatch ───────────────────────────────────────────────────

    /// Run a tagged query and serialise its response.
    pub fn dispatch(&self, query: EngineQuery) -> RiskResult<serde_json::Value> {
        let value = match query {
            EngineQuery::TopRisk { n, shock_pct, commodity, region, cached } => {
                let req = TopRequest {
                    n,
                    shock_pct,
                    commodity,
                    region: region.as_deref().map_or(Region::All, Region::parse_lenient),
                    cached,
                };
                serde_json::to_value(self.top_risk(&req)?)?
            }
            EngineQuery::RiskByCountry { country } => {
                serde_json::to_value(self.risk_by_country(&country)?)?
            }
            EngineQuery::SimulateRisk { country, shock_pct } => {
                serde_json::to_value(self.simulate_risk(&country, shock_pct)?)?
            }
            EngineQuery::ListCommodities => serde_json::to_value(self.list_commodities()?)?,
            EngineQuery::ListCountries { q } => {
                serde_json::to_value(self.list_countries(q.as_deref())?)?
            }
            EngineQuery::ListCachedShocks => serde_json::to_value(self.list_cached_shocks()?)?,
            EngineQuery::CompareShocks { n, shock_a, shock_b, commodity, region, cached } => {
                let req = CompareRequest {
                    n,
                    shock_a,
                    shock_b,
                    commodity,
                    region: region.as_deref().map_or(Region::All, Region::parse_lenient),
                    cached,
                };
                serde_json::to_value(self.compare_shocks(&req)?)?
            }
            EngineQuery::ServiceInfo => serde_json::to_value(self.service_info())?,
            EngineQuery::MaterializeSnapshot { shock_pct } => {
                serde_json::to_value(self.materialize_snapshot(shock_pct)?)?
            }
        };
        Ok(value)
    }
}


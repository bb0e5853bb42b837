use crate::region::{default_regions, RegionConfig, RegionTable};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Engine configuration. Every field has a default, so a partial JSON
/// file is valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory holding the processed tables and snapshot files.
    pub processed_dir: PathBuf,

    pub risk_file: String,
    pub risk_table: String,
    pub base_file: String,
    pub base_table: String,
    pub snapshot_table: String,
    pub snapshot_prefix: String,
    pub snapshot_extension: String,

    /// Fraction backing the country profile's shortfall fields.
    pub default_shock_pct: f64,

    pub max_top_n: usize,
    pub max_countries: usize,
    pub float_decimals: u32,

    /// Cached-mode `top` requests fall back to live simulation when the
    /// snapshot is missing.
    pub cached_fallback_to_live: bool,

    /// Case-insensitive substrings marking special areas.
    pub special_areas: Vec<String>,

    pub regions: Vec<RegionConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::with_data_dir("data")
    }
}

impl EngineConfig {
    /// Default configuration rooted at `data_dir` (tables in `data_dir/processed`).
    pub fn with_data_dir(data_dir: impl AsRef<Path>) -> Self {
        Self {
            processed_dir: data_dir.as_ref().join("processed"),
            risk_file: "risk_index_latest.db".into(),
            risk_table: "risk_index_latest".into(),
            base_file: "base_country_commodity_year.db".into(),
            base_table: "base_country_commodity_year".into(),
            snapshot_table: "shock_simulation".into(),
            snapshot_prefix: "shock_simulation_latest_importdrop".into(),
            snapshot_extension: ".db".into(),
            default_shock_pct: 0.20,
            max_top_n: 200,
            max_countries: 200,
            float_decimals: 6,
            cached_fallback_to_live: true,
            special_areas: vec![
                ", mainland".into(),
                "Taiwan Province of".into(),
                "(Kingdom of the)".into(),
            ],
            regions: default_regions(),
        }
    }

    /// Load from a JSON file.
    /// In tests, use EngineConfig::with_data_dir().
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {}: {e}", path.display()))?;
        let config: EngineConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {}: {e}", path.display()))?;
        if !(0.0..=1.0).contains(&config.default_shock_pct) {
            anyhow::bail!(
                "default_shock_pct must be between 0 and 1, got {}",
                config.default_shock_pct
            );
        }
        Ok(config)
    }

    pub fn risk_path(&self) -> PathBuf {
        self.processed_dir.join(&self.risk_file)
    }

    pub fn base_path(&self) -> PathBuf {
        self.processed_dir.join(&self.base_file)
    }

    pub fn region_table(&self) -> RegionTable {
        RegionTable::from_config(&self.regions)
    }
}

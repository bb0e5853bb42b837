//! Region allow-lists.
//!
//! A region is a closed enumeration; the countries in each region come
//! from the configuration table, never from inline conditionals.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum Region {
    #[default]
    All,
    Africa,
    #[serde(rename = "EU")]
    Eu,
}

impl Region {
    pub fn as_str(&self) -> &'static str {
        match self {
            Region::All    => "All",
            Region::Africa => "Africa",
            Region::Eu     => "EU",
        }
    }

    /// Lenient parse: an unknown label means "no filter".
    pub fn parse_lenient(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "africa" => Region::Africa,
            "eu"     => Region::Eu,
            "all" | "" => Region::All,
            other => {
                log::warn!("Unknown region '{other}', applying no region filter");
                Region::All
            }
        }
    }
}

/// One row of the region configuration table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionConfig {
    pub region: Region,
    pub countries: Vec<String>,
}

/// Lookup built from the configuration table.
#[derive(Debug, Clone, Default)]
pub struct RegionTable {
    members: HashMap<Region, BTreeSet<String>>,
}

impl RegionTable {
    pub fn from_config(regions: &[RegionConfig]) -> Self {
        let mut members: HashMap<Region, BTreeSet<String>> = HashMap::new();
        for entry in regions {
            members
                .entry(entry.region)
                .or_default()
                .extend(entry.countries.iter().cloned());
        }
        Self { members }
    }

    /// `All`, or a region without a configured list, admits every country.
    pub fn admits(&self, region: Region, country: &str) -> bool {
        if region == Region::All {
            return true;
        }
        match self.members.get(&region) {
            Some(set) => set.contains(country),
            None => true,
        }
    }
}

pub fn default_regions() -> Vec<RegionConfig> {
    let africa = [
        "Nigeria", "Egypt", "Algeria", "Morocco", "Tunisia", "Kenya", "Ethiopia",
        "Ghana", "Senegal", "South Africa",
    ];
    let eu = [
        "Germany", "France", "Italy", "Spain", "Netherlands", "Belgium",
        "Poland", "Portugal", "Greece", "Austria", "Sweden", "Finland",
    ];
    vec![
        RegionConfig {
            region: Region::Africa,
            countries: africa.iter().map(|c| c.to_string()).collect(),
        },
        RegionConfig {
            region: Region::Eu,
            countries: eu.iter().map(|c| c.to_string()).collect(),
        },
    ]
}

//! Special-area exclusion and country resolution.

use crate::records::Keyed;

/// Case-insensitive substring blocklist for administrative or duplicate
/// geographic entries (e.g. "China, mainland").
#[derive(Debug, Clone, Default)]
pub struct SpecialAreas {
    needles: Vec<String>,
}

impl SpecialAreas {
    pub fn new(substrings: &[String]) -> Self {
        Self {
            needles: substrings
                .iter()
                .map(|s| s.to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    pub fn is_special(&self, country: &str) -> bool {
        let lower = country.to_lowercase();
        self.needles.iter().any(|needle| lower.contains(needle.as_str()))
    }

    /// Rows whose country is not a special area.
    pub fn retain<T: Keyed + Clone>(&self, rows: &[T]) -> Vec<T> {
        rows.iter()
            .filter(|row| !self.is_special(row.country()))
            .cloned()
            .collect()
    }
}

/// Maps a user-supplied country string to table rows.
///
/// Exact case-insensitive match wins; otherwise substring containment.
/// Special areas are dropped before either tier, so a partial match can
/// never surface one.
pub struct CountryResolver<'a> {
    special: &'a SpecialAreas,
}

impl<'a> CountryResolver<'a> {
    pub fn new(special: &'a SpecialAreas) -> Self {
        Self { special }
    }

    pub fn resolve<T: Keyed + Clone>(&self, query: &str, rows: &[T]) -> Vec<T> {
        let q = query.trim().to_lowercase();
        if q.is_empty() {
            return Vec::new();
        }

        let eligible: Vec<&T> = rows
            .iter()
            .filter(|row| !self.special.is_special(row.country()))
            .collect();

        let exact: Vec<T> = eligible
            .iter()
            .filter(|row| row.country().to_lowercase() == q)
            .map(|row| (*row).clone())
            .collect();
        if !exact.is_empty() {
            return exact;
        }

        eligible
            .into_iter()
            .filter(|row| row.country().to_lowercase().contains(&q))
            .cloned()
            .collect()
    }
}

//! Shared primitive types used across the engine.

use crate::error::{RiskError, RiskResult};
use serde::{Deserialize, Serialize};

/// Country name as it appears in the source tables.
pub type Country = String;

/// Commodity name as it appears in the source tables.
pub type Commodity = String;

/// Upstream risk category.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum RiskBand {
    Low,
    Medium,
    High,
}

impl RiskBand {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskBand::Low    => "Low",
            RiskBand::Medium => "Medium",
            RiskBand::High   => "High",
        }
    }

    /// Case-insensitive parse. Unknown labels yield `None`.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "low"    => Some(RiskBand::Low),
            "medium" => Some(RiskBand::Medium),
            "high"   => Some(RiskBand::High),
            _ => None,
        }
    }
}

/// Reject shock fractions outside [0, 1] (and NaN).
pub fn validate_shock(shock_pct: f64) -> RiskResult<f64> {
    if !(0.0..=1.0).contains(&shock_pct) {
        return Err(RiskError::InvalidParameter(format!(
            "shock_pct must be between 0 and 1, got {shock_pct}"
        )));
    }
    Ok(shock_pct)
}

/// Integer percent a fraction resolves to (0.351 -> 35).
/// Half-percent ties go to the even percent (0.125 -> 12).
pub fn shock_percent(shock_pct: f64) -> u32 {
    (shock_pct * 100.0).round_ties_even() as u32
}

/// Round to `decimals` places, leaving non-finite values untouched.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10f64.powi(decimals as i32);
    let rounded = (value * factor).round() / factor;
    // Normalise -0.0 so identical inputs serialise identically.
    if rounded == 0.0 { 0.0 } else { rounded }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_rounds_to_nearest() {
        assert_eq!(shock_percent(0.35), 35);
        assert_eq!(shock_percent(0.351), 35);
        assert_eq!(shock_percent(0.349), 35);
        assert_eq!(shock_percent(0.2), 20);
        assert_eq!(shock_percent(1.0), 100);
    }

    #[test]
    fn half_percent_ties_round_to_even() {
        assert_eq!(shock_percent(0.125), 12);
        assert_eq!(shock_percent(0.625), 62);
        assert_eq!(shock_percent(0.375), 38);
    }

    #[test]
    fn rounding_is_six_places() {
        assert_eq!(round_to(0.123_456_789, 6), 0.123457);
        assert_eq!(round_to(-0.000_000_1, 6), 0.0);
        assert!(round_to(f64::NAN, 6).is_nan());
    }

    #[test]
    fn shock_bounds() {
        assert!(validate_shock(0.0).is_ok());
        assert!(validate_shock(1.0).is_ok());
        assert!(validate_shock(-0.01).is_err());
        assert!(validate_shock(1.01).is_err());
        assert!(validate_shock(f64::NAN).is_err());
    }

    #[test]
    fn band_parse_is_case_insensitive() {
        assert_eq!(RiskBand::parse("high"), Some(RiskBand::High));
        assert_eq!(RiskBand::parse(" Medium "), Some(RiskBand::Medium));
        assert_eq!(RiskBand::parse("severe"), None);
    }
}

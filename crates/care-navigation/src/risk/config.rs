use serde::{Deserialize, Serialize};

use super::RiskLevel;

pub const DEFAULT_DEMOGRAPHIC_WEIGHT: f64 = 0.25;
pub const DEFAULT_CLINICAL_WEIGHT: f64 = 0.40;
pub const DEFAULT_BEHAVIORAL_WEIGHT: f64 = 0.20;
pub const DEFAULT_HISTORICAL_WEIGHT: f64 = 0.15;

pub const DEFAULT_MEDIUM_THRESHOLD: f64 = 25.0;
pub const DEFAULT_HIGH_THRESHOLD: f64 = 50.0;
pub const DEFAULT_CRITICAL_THRESHOLD: f64 = 75.0;

/// Component weights and level cut-offs for the composite risk score.
///
/// The defaults are a compatibility contract with downstream care-plan rules; override them only
/// when those consumers are updated in lockstep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub demographic_weight: f64,
    pub clinical_weight: f64,
    pub behavioral_weight: f64,
    pub historical_weight: f64,
    pub medium_threshold: f64,
    pub high_threshold: f64,
    pub critical_threshold: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            demographic_weight: DEFAULT_DEMOGRAPHIC_WEIGHT,
            clinical_weight: DEFAULT_CLINICAL_WEIGHT,
            behavioral_weight: DEFAULT_BEHAVIORAL_WEIGHT,
            historical_weight: DEFAULT_HISTORICAL_WEIGHT,
            medium_threshold: DEFAULT_MEDIUM_THRESHOLD,
            high_threshold: DEFAULT_HIGH_THRESHOLD,
            critical_threshold: DEFAULT_CRITICAL_THRESHOLD,
        }
    }
}

impl RiskConfig {
    pub fn level_for(&self, score: f64) -> RiskLevel {
        if score >= self.critical_threshold {
            RiskLevel::Critical
        } else if score >= self.high_threshold {
            RiskLevel::High
        } else if score >= self.medium_threshold {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_are_inclusive_lower_bounds() {
        let config = RiskConfig::default();
        assert_eq!(config.level_for(0.0), RiskLevel::Low);
        assert_eq!(config.level_for(24.99), RiskLevel::Low);
        assert_eq!(config.level_for(25.0), RiskLevel::Medium);
        assert_eq!(config.level_for(50.0), RiskLevel::High);
        assert_eq!(config.level_for(74.9), RiskLevel::High);
        assert_eq!(config.level_for(75.0), RiskLevel::Critical);
        assert_eq!(config.level_for(100.0), RiskLevel::Critical);
    }

    #[test]
    fn partial_json_keeps_remaining_defaults() {
        let config: RiskConfig =
            serde_json::from_str(r#"{ "critical_threshold": 80.0 }"#).expect("config parses");
        assert_eq!(config.critical_threshold, 80.0);
        assert_eq!(config.clinical_weight, DEFAULT_CLINICAL_WEIGHT);
    }
}

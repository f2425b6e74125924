use serde::{Deserialize, Serialize};

use crate::risk::RiskConfig;

/// Criterion weights for navigator matching. Must sum to 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigatorWeights {
    pub specialization: f64,
    pub language: f64,
    pub workload: f64,
    pub performance: f64,
    pub geography: f64,
}

impl Default for NavigatorWeights {
    fn default() -> Self {
        Self {
            specialization: 0.40,
            language: 0.20,
            workload: 0.20,
            performance: 0.15,
            geography: 0.05,
        }
    }
}

/// Criterion weights for provider ranking. Must sum to 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderWeights {
    pub distance: f64,
    pub quality: f64,
    pub availability: f64,
    pub satisfaction: f64,
    pub cost: f64,
}

impl Default for ProviderWeights {
    fn default() -> Self {
        Self {
            distance: 0.30,
            quality: 0.25,
            availability: 0.20,
            satisfaction: 0.15,
            cost: 0.10,
        }
    }
}

/// Thresholds for the caseload control loop, expressed as multiples of the average workload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BalancerConfig {
    pub overload_factor: f64,
    pub underload_factor: f64,
}

impl Default for BalancerConfig {
    fn default() -> Self {
        Self {
            overload_factor: 1.3,
            underload_factor: 0.7,
        }
    }
}

/// Tunable weights and thresholds for the whole engine.
///
/// Defaults reproduce the production constants; a JSON file can override any subset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    pub navigator: NavigatorWeights,
    pub provider: ProviderWeights,
    pub balancer: BalancerConfig,
    pub risk: RiskConfig,
}

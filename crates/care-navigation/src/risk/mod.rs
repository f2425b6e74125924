//! Composite clinical and behavioral risk scoring.

mod components;
mod config;

pub use config::RiskConfig;

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::beneficiary::{BeneficiaryId, BeneficiaryProfile, SmokingStatus};
use components::score_components;

const ELDERLY_AGE: u32 = 65;
const OBESITY_BMI: f64 = 30.0;
const HIGH_ER_VISITS: u32 = 3;

/// Coarse classification derived from the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub const fn label(self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskSeverity {
    Medium,
    High,
}

/// A single contributing factor surfaced alongside the score for care-plan audits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskFactor {
    pub code: String,
    pub description: String,
    pub severity: RiskSeverity,
}

/// Output of one scoring call. Recompute rather than mutate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskScore {
    pub beneficiary_id: BeneficiaryId,
    pub total_score: f64,
    pub risk_level: RiskLevel,
    pub demographic_component: f64,
    pub clinical_component: f64,
    pub behavioral_component: f64,
    pub historical_component: f64,
    pub factors: Vec<RiskFactor>,
    pub calculated_at: DateTime<Utc>,
}

/// Profile problems that make scoring or matching impossible.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProfileError {
    #[error("profile belongs to beneficiary {found}, not {expected}")]
    BeneficiaryMismatch {
        expected: BeneficiaryId,
        found: BeneficiaryId,
    },
    #[error("beneficiary {0} has no birth date")]
    MissingBirthDate(BeneficiaryId),
    #[error("beneficiary {beneficiary_id} birth date {birth_date} is after {today}")]
    BirthDateInFuture {
        beneficiary_id: BeneficiaryId,
        birth_date: NaiveDate,
        today: NaiveDate,
    },
}

/// Stateless scorer applying a [`RiskConfig`] to beneficiary profiles.
#[derive(Debug, Clone, Default)]
pub struct RiskScorer {
    config: RiskConfig,
}

impl RiskScorer {
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Score a profile using today's local date for the age calculation.
    pub fn score(&self, profile: &BeneficiaryProfile) -> Result<RiskScore, ProfileError> {
        self.score_on(profile, Local::now().date_naive())
    }

    pub fn score_on(
        &self,
        profile: &BeneficiaryProfile,
        today: NaiveDate,
    ) -> Result<RiskScore, ProfileError> {
        let age = age_on(profile, today)?;
        let components = score_components(profile, age);

        let weighted = components.demographic * self.config.demographic_weight
            + components.clinical * self.config.clinical_weight
            + components.behavioral * self.config.behavioral_weight
            + components.historical * self.config.historical_weight;
        let total_score = weighted.clamp(0.0, 100.0);
        let risk_level = self.config.level_for(total_score);

        info!(
            beneficiary_id = %profile.beneficiary_id,
            total_score,
            risk_level = risk_level.label(),
            "risk score calculated"
        );

        Ok(RiskScore {
            beneficiary_id: profile.beneficiary_id.clone(),
            total_score,
            risk_level,
            demographic_component: components.demographic,
            clinical_component: components.clinical,
            behavioral_component: components.behavioral,
            historical_component: components.historical,
            factors: identify_factors(profile, age),
            calculated_at: Utc::now(),
        })
    }
}

fn age_on(profile: &BeneficiaryProfile, today: NaiveDate) -> Result<u32, ProfileError> {
    let birth_date = profile
        .demographics
        .birth_date
        .ok_or_else(|| ProfileError::MissingBirthDate(profile.beneficiary_id.clone()))?;

    today
        .years_since(birth_date)
        .ok_or_else(|| ProfileError::BirthDateInFuture {
            beneficiary_id: profile.beneficiary_id.clone(),
            birth_date,
            today,
        })
}

fn identify_factors(profile: &BeneficiaryProfile, age: u32) -> Vec<RiskFactor> {
    let mut factors = Vec::new();

    if age > ELDERLY_AGE {
        factors.push(factor("AGE", "Advanced age (65+)".to_string(), RiskSeverity::High));
    }

    for condition in &profile.clinical.chronic_conditions {
        factors.push(factor(
            "CHRONIC_CONDITION",
            format!("Chronic condition: {condition}"),
            RiskSeverity::High,
        ));
    }

    if profile.behavior.smoking == SmokingStatus::Current {
        factors.push(factor("SMOKING", "Active smoker".to_string(), RiskSeverity::High));
    }

    if profile.clinical.bmi.is_some_and(|bmi| bmi >= OBESITY_BMI) {
        factors.push(factor("OBESITY", "Obesity".to_string(), RiskSeverity::Medium));
    }

    if profile.clinical.er_visits_last_year >= HIGH_ER_VISITS {
        factors.push(factor(
            "HIGH_ER_USE",
            "High emergency room utilization".to_string(),
            RiskSeverity::Medium,
        ));
    }

    factors
}

fn factor(code: &str, description: String, severity: RiskSeverity) -> RiskFactor {
    RiskFactor {
        code: code.to_string(),
        description,
        severity,
    }
}

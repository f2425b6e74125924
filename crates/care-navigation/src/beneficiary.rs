use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Identifier wrapper for health-plan members.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BeneficiaryId(pub String);

impl fmt::Display for BeneficiaryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Geographic point in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

/// Immutable snapshot of a beneficiary supplied by the orchestration layer.
///
/// Only the identifier is mandatory on the wire. Risk scoring additionally requires
/// `demographics.birth_date`; every other attribute falls back to a documented default so
/// partial profiles can still be matched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeneficiaryProfile {
    pub beneficiary_id: BeneficiaryId,
    #[serde(default)]
    pub required_specializations: BTreeSet<String>,
    #[serde(default)]
    pub preferred_language: Option<String>,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub demographics: Demographics,
    #[serde(default)]
    pub clinical: ClinicalHistory,
    #[serde(default)]
    pub behavior: BehavioralHabits,
    #[serde(default)]
    pub utilization: UtilizationHistory,
}

impl BeneficiaryProfile {
    pub fn new(beneficiary_id: BeneficiaryId) -> Self {
        Self {
            beneficiary_id,
            required_specializations: BTreeSet::new(),
            preferred_language: None,
            location: None,
            demographics: Demographics::default(),
            clinical: ClinicalHistory::default(),
            behavior: BehavioralHabits::default(),
            utilization: UtilizationHistory::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Demographics {
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default)]
    pub zip_code: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gender {
    Female,
    Male,
    #[default]
    Unspecified,
}

/// Clinical picture over the trailing twelve months.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClinicalHistory {
    #[serde(default)]
    pub chronic_conditions: Vec<String>,
    #[serde(default)]
    pub medication_count: u32,
    #[serde(default)]
    pub hospitalizations_last_year: u32,
    #[serde(default)]
    pub er_visits_last_year: u32,
    #[serde(default)]
    pub bmi: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BehavioralHabits {
    #[serde(default)]
    pub smoking: SmokingStatus,
    #[serde(default)]
    pub alcohol: AlcoholConsumption,
    #[serde(default)]
    pub weekly_exercise_hours: Option<f64>,
    #[serde(default)]
    pub diet_quality: Option<DietQuality>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SmokingStatus {
    #[default]
    Never,
    Former,
    Current,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlcoholConsumption {
    #[default]
    None,
    Light,
    Moderate,
    Heavy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DietQuality {
    Poor,
    Fair,
    Good,
}

/// Plan utilization history used by the historical risk component.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UtilizationHistory {
    #[serde(default)]
    pub claims_last_year: u32,
    #[serde(default)]
    pub preventive_care_up_to_date: bool,
    #[serde(default)]
    pub no_show_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_payload_uses_defaults() {
        let profile: BeneficiaryProfile =
            serde_json::from_str(r#"{ "beneficiary_id": "ben-1" }"#).expect("profile parses");

        assert_eq!(profile.beneficiary_id, BeneficiaryId("ben-1".to_string()));
        assert!(profile.required_specializations.is_empty());
        assert_eq!(profile.demographics.gender, Gender::Unspecified);
        assert_eq!(profile.behavior.smoking, SmokingStatus::Never);
        assert!(profile.clinical.chronic_conditions.is_empty());
        assert!(!profile.utilization.preventive_care_up_to_date);
    }

    #[test]
    fn enums_use_upper_snake_case_on_the_wire() {
        let profile: BeneficiaryProfile = serde_json::from_str(
            r#"{
                "beneficiary_id": "ben-2",
                "demographics": { "birth_date": "1960-04-02", "gender": "FEMALE" },
                "behavior": { "smoking": "FORMER", "alcohol": "HEAVY", "diet_quality": "POOR" }
            }"#,
        )
        .expect("profile parses");

        assert_eq!(profile.demographics.gender, Gender::Female);
        assert_eq!(profile.behavior.smoking, SmokingStatus::Former);
        assert_eq!(profile.behavior.alcohol, AlcoholConsumption::Heavy);
        assert_eq!(profile.behavior.diet_quality, Some(DietQuality::Poor));
    }
}

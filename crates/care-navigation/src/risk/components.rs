use crate::beneficiary::{
    AlcoholConsumption, BeneficiaryProfile, DietQuality, Gender, SmokingStatus,
};

const COMPONENT_CEILING: f64 = 100.0;

const AGE_BASE_SCORE: f64 = 20.0;
/// Upper age (inclusive) and multiplier per band; anyone older uses `ELDERLY_AGE_MULTIPLIER`.
const AGE_BANDS: [(u32, f64); 4] = [(17, 0.8), (40, 1.0), (60, 1.5), (75, 2.2)];
const ELDERLY_AGE_MULTIPLIER: f64 = 3.0;

const DEFAULT_CONDITION_WEIGHT: f64 = 1.0;
const CHRONIC_CONDITION_WEIGHTS: [(&str, f64); 7] = [
    ("DIABETES", 2.5),
    ("HYPERTENSION", 2.0),
    ("HEART_DISEASE", 3.0),
    ("COPD", 2.8),
    ("CANCER", 3.5),
    ("KIDNEY_DISEASE", 3.2),
    ("OBESITY", 1.8),
];

const LOCATION_RISK: f64 = 10.0;
const UNKNOWN_BMI_RISK: f64 = 5.0;
const MINIMUM_EXERCISE_HOURS: f64 = 2.0;
const NO_SHOW_RATE_LIMIT: f64 = 0.2;

pub(crate) struct ComponentScores {
    pub demographic: f64,
    pub clinical: f64,
    pub behavioral: f64,
    pub historical: f64,
}

pub(crate) fn score_components(profile: &BeneficiaryProfile, age: u32) -> ComponentScores {
    ComponentScores {
        demographic: demographic_risk(profile, age),
        clinical: clinical_risk(profile),
        behavioral: behavioral_risk(profile),
        historical: historical_risk(profile),
    }
}

fn demographic_risk(profile: &BeneficiaryProfile, age: u32) -> f64 {
    age_risk(age) * 0.6 + gender_risk(profile.demographics.gender) * 0.2 + LOCATION_RISK * 0.2
}

pub(crate) fn age_risk(age: u32) -> f64 {
    let multiplier = AGE_BANDS
        .iter()
        .find(|(upper, _)| age <= *upper)
        .map(|(_, multiplier)| *multiplier)
        .unwrap_or(ELDERLY_AGE_MULTIPLIER);
    multiplier * AGE_BASE_SCORE
}

fn gender_risk(gender: Gender) -> f64 {
    match gender {
        Gender::Female => 15.0,
        Gender::Male => 12.0,
        Gender::Unspecified => 10.0,
    }
}

fn clinical_risk(profile: &BeneficiaryProfile) -> f64 {
    let clinical = &profile.clinical;
    let condition_weight: f64 = clinical
        .chronic_conditions
        .iter()
        .map(|condition| chronic_condition_weight(condition))
        .sum();
    let medication = (clinical.medication_count as f64 * 3.0).min(30.0);
    let hospitalizations = clinical.hospitalizations_last_year as f64 * 15.0;

    (condition_weight * 10.0 + medication + hospitalizations + bmi_risk(clinical.bmi))
        .min(COMPONENT_CEILING)
}

/// Looks up the table weight, matching `heart disease`, `Heart-Disease` and `HEART_DISEASE` alike.
pub(crate) fn chronic_condition_weight(condition: &str) -> f64 {
    let key: String = condition
        .trim()
        .chars()
        .map(|c| match c {
            ' ' | '-' => '_',
            other => other.to_ascii_uppercase(),
        })
        .collect();

    CHRONIC_CONDITION_WEIGHTS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, weight)| *weight)
        .unwrap_or(DEFAULT_CONDITION_WEIGHT)
}

pub(crate) fn bmi_risk(bmi: Option<f64>) -> f64 {
    match bmi {
        None => UNKNOWN_BMI_RISK,
        Some(value) if value < 18.5 => 15.0,
        Some(value) if value < 25.0 => 0.0,
        Some(value) if value < 30.0 => 10.0,
        Some(value) if value < 35.0 => 20.0,
        Some(value) if value < 40.0 => 30.0,
        Some(_) => 40.0,
    }
}

fn behavioral_risk(profile: &BeneficiaryProfile) -> f64 {
    let behavior = &profile.behavior;
    let mut risk: f64 = match behavior.smoking {
        SmokingStatus::Current => 30.0,
        SmokingStatus::Former => 10.0,
        SmokingStatus::Never => 0.0,
    };

    risk += match behavior.alcohol {
        AlcoholConsumption::Heavy => 25.0,
        AlcoholConsumption::Moderate => 10.0,
        AlcoholConsumption::Light => 5.0,
        AlcoholConsumption::None => 0.0,
    };

    if behavior
        .weekly_exercise_hours
        .map_or(true, |hours| hours < MINIMUM_EXERCISE_HOURS)
    {
        risk += 20.0;
    }

    risk += match behavior.diet_quality {
        Some(DietQuality::Poor) => 15.0,
        Some(DietQuality::Fair) => 8.0,
        Some(DietQuality::Good) | None => 0.0,
    };

    risk.min(COMPONENT_CEILING)
}

fn historical_risk(profile: &BeneficiaryProfile) -> f64 {
    let utilization = &profile.utilization;
    let mut risk = (profile.clinical.er_visits_last_year as f64 * 10.0).min(COMPONENT_CEILING);
    risk += (utilization.claims_last_year as f64 * 2.0).min(30.0);

    if !utilization.preventive_care_up_to_date {
        risk += 20.0;
    }
    if utilization.no_show_rate > NO_SHOW_RATE_LIMIT {
        risk += 10.0;
    }

    risk.min(COMPONENT_CEILING)
}

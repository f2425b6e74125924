use std::collections::BTreeMap;

use crate::beneficiary::BeneficiaryProfile;

use super::super::config::NavigatorWeights;
use super::super::domain::{Navigator, NavigatorId};
use super::super::geo::{distance_band_score, haversine_km};
use super::super::scoring::{Candidate, Criterion, Notability};

/// Score used whenever a criterion has nothing to compare against.
pub(crate) const NEUTRAL_SCORE: f64 = 0.5;
const LANGUAGE_MISMATCH_SCORE: f64 = 0.3;

impl Candidate for Navigator {
    fn candidate_id(&self) -> &str {
        &self.id.0
    }
}

/// Inputs shared by every navigator criterion during one matching call.
pub(crate) struct NavigatorContext {
    pub profile: BeneficiaryProfile,
    pub workloads: BTreeMap<NavigatorId, u32>,
}

impl NavigatorContext {
    fn workload_of(&self, navigator: &Navigator) -> u32 {
        self.workloads.get(&navigator.id).copied().unwrap_or(0)
    }
}

pub(crate) fn navigator_criteria(
    weights: &NavigatorWeights,
) -> Vec<Criterion<Navigator, NavigatorContext>> {
    vec![
        Criterion {
            name: "specialization",
            weight: weights.specialization,
            notability: Notability::Above(0.7),
            reason: "Specialization match",
            score: specialization_overlap,
        },
        Criterion {
            name: "language",
            weight: weights.language,
            notability: Notability::AtLeast(1.0),
            reason: "Speaks preferred language",
            score: language_match,
        },
        Criterion {
            name: "workload",
            weight: weights.workload,
            notability: Notability::Above(0.7),
            reason: "Available capacity",
            score: workload_balance,
        },
        Criterion {
            name: "performance",
            weight: weights.performance,
            notability: Notability::Above(0.8),
            reason: "High performance",
            score: performance,
        },
        Criterion {
            name: "geography",
            weight: weights.geography,
            notability: Notability::Silent,
            reason: "Nearby",
            score: geographic_proximity,
        },
    ]
}

/// Share of the beneficiary's required specializations the navigator covers.
fn specialization_overlap(navigator: &Navigator, context: &NavigatorContext) -> f64 {
    let required = &context.profile.required_specializations;
    if required.is_empty() {
        return NEUTRAL_SCORE;
    }

    let covered = required
        .iter()
        .filter(|specialization| navigator.specializations.contains(*specialization))
        .count();
    covered as f64 / required.len() as f64
}

fn language_match(navigator: &Navigator, context: &NavigatorContext) -> f64 {
    let Some(preferred) = context.profile.preferred_language.as_deref() else {
        return NEUTRAL_SCORE;
    };

    if navigator
        .languages
        .iter()
        .any(|language| language.eq_ignore_ascii_case(preferred))
    {
        1.0
    } else {
        LANGUAGE_MISMATCH_SCORE
    }
}

fn workload_balance(navigator: &Navigator, context: &NavigatorContext) -> f64 {
    utilization_score(context.workload_of(navigator), navigator.max_caseload)
}

/// Bell-shaped preference: a navigator at 50-70% utilization is ideal, idle ones are good,
/// nearly full ones are tolerated, and overloaded ones are a last resort.
pub(crate) fn utilization_score(current: u32, max_caseload: u32) -> f64 {
    if max_caseload == 0 {
        return 0.3;
    }

    let utilization = current as f64 / max_caseload as f64;
    if (0.5..=0.7).contains(&utilization) {
        1.0
    } else if utilization < 0.5 {
        0.8
    } else if utilization <= 0.85 {
        0.6
    } else {
        0.3
    }
}

fn performance(navigator: &Navigator, _context: &NavigatorContext) -> f64 {
    navigator.performance_score
}

fn geographic_proximity(navigator: &Navigator, context: &NavigatorContext) -> f64 {
    match (&navigator.location, &context.profile.location) {
        (Some(navigator_location), Some(beneficiary_location)) => {
            distance_band_score(haversine_km(navigator_location, beneficiary_location))
        }
        _ => NEUTRAL_SCORE,
    }
}

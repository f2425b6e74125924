use chrono::{DateTime, Duration, Utc};

use crate::beneficiary::Location;

use super::super::config::ProviderWeights;
use super::super::domain::{PlanDetails, ProviderCandidate};
use super::super::geo::{distance_band_score, haversine_km};
use super::super::navigator::NEUTRAL_SCORE;
use super::super::scoring::{Candidate, Criterion, Notability};

pub(crate) const AVAILABILITY_WINDOW_DAYS: i64 = 14;
pub(crate) const NEXT_SLOT_WINDOW_DAYS: i64 = 30;
const MAX_RATING: f64 = 5.0;

/// Slot-count floors within the availability window and the score each earns.
const AVAILABILITY_BANDS: [(usize, f64); 5] = [(20, 1.0), (10, 0.8), (5, 0.6), (2, 0.4), (1, 0.2)];

impl Candidate for ProviderCandidate {
    fn candidate_id(&self) -> &str {
        &self.id.0
    }
}

pub(crate) struct ProviderContext {
    pub location: Location,
    pub plan: PlanDetails,
    pub now: DateTime<Utc>,
}

impl ProviderContext {
    pub fn distance_km(&self, provider: &ProviderCandidate) -> f64 {
        haversine_km(&self.location, &provider.location)
    }

    pub fn next_available_slot(&self, provider: &ProviderCandidate) -> Option<DateTime<Utc>> {
        next_slot_after(provider, self.now)
    }

    pub fn open_slots(&self, provider: &ProviderCandidate) -> usize {
        open_slots_after(provider, self.now)
    }
}

fn slots_within(
    provider: &ProviderCandidate,
    now: DateTime<Utc>,
    days: i64,
) -> impl Iterator<Item = DateTime<Utc>> + '_ {
    let until = now + Duration::days(days);
    provider
        .slots
        .iter()
        .map(|slot| slot.starts_at)
        .filter(move |starts_at| *starts_at >= now && *starts_at <= until)
}

pub(crate) fn next_slot_after(
    provider: &ProviderCandidate,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    slots_within(provider, now, NEXT_SLOT_WINDOW_DAYS).min()
}

pub(crate) fn open_slots_after(provider: &ProviderCandidate, now: DateTime<Utc>) -> usize {
    slots_within(provider, now, AVAILABILITY_WINDOW_DAYS).count()
}

pub(crate) fn mean_rating(provider: &ProviderCandidate) -> Option<f64> {
    if provider.review_ratings.is_empty() {
        return None;
    }
    Some(provider.review_ratings.iter().sum::<f64>() / provider.review_ratings.len() as f64)
}

pub(crate) fn provider_criteria(
    weights: &ProviderWeights,
) -> Vec<Criterion<ProviderCandidate, ProviderContext>> {
    vec![
        Criterion {
            name: "distance",
            weight: weights.distance,
            notability: Notability::Above(0.8),
            reason: "Nearby location",
            score: distance,
        },
        Criterion {
            name: "quality",
            weight: weights.quality,
            notability: Notability::Above(0.8),
            reason: "High quality",
            score: quality,
        },
        Criterion {
            name: "availability",
            weight: weights.availability,
            notability: Notability::Above(0.7),
            reason: "Good availability",
            score: availability,
        },
        Criterion {
            name: "satisfaction",
            weight: weights.satisfaction,
            notability: Notability::Above(0.8),
            reason: "High patient satisfaction",
            score: satisfaction,
        },
        Criterion {
            name: "cost",
            weight: weights.cost,
            notability: Notability::Above(0.8),
            reason: "Cost effective",
            score: cost_effectiveness,
        },
    ]
}

fn distance(provider: &ProviderCandidate, context: &ProviderContext) -> f64 {
    distance_band_score(context.distance_km(provider))
}

fn quality(provider: &ProviderCandidate, _context: &ProviderContext) -> f64 {
    provider.quality_score
}

fn availability(provider: &ProviderCandidate, context: &ProviderContext) -> f64 {
    let open = context.open_slots(provider);
    AVAILABILITY_BANDS
        .iter()
        .find(|(floor, _)| open >= *floor)
        .map(|(_, score)| *score)
        .unwrap_or(0.0)
}

fn satisfaction(provider: &ProviderCandidate, _context: &ProviderContext) -> f64 {
    mean_rating(provider).map_or(NEUTRAL_SCORE, |mean| mean / MAX_RATING)
}

fn cost_effectiveness(provider: &ProviderCandidate, context: &ProviderContext) -> f64 {
    let max_allowed = context.plan.max_allowed_cost;
    if max_allowed.is_nan() || max_allowed <= 0.0 {
        return NEUTRAL_SCORE;
    }
    // Providers above the plan ceiling score zero rather than negative.
    (1.0 - provider.average_cost_per_visit / max_allowed).clamp(0.0, 1.0)
}

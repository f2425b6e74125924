//! Preferred-network provider ranking.

mod criteria;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::beneficiary::Location;

use super::config::ProviderWeights;
use super::domain::{
    AvailableSlots, PlanDetails, ProviderCandidate, ProviderDetails, ProviderId, ProviderMatch,
    ProviderRanking,
};
use super::error::MatchingError;
use super::repository::CandidateRepository;
use super::scoring::{MatchScorer, WeightError};
use criteria::{
    mean_rating, next_slot_after, open_slots_after, provider_criteria, ProviderContext,
};

/// Number of providers returned in a ranking.
pub const MAX_RESULTS: usize = 10;

pub struct ProviderRanker<R> {
    candidates: Arc<R>,
    scorer: MatchScorer<ProviderCandidate, ProviderContext>,
}

impl<R> ProviderRanker<R>
where
    R: CandidateRepository,
{
    pub fn new(candidates: Arc<R>, weights: &ProviderWeights) -> Result<Self, WeightError> {
        Ok(Self {
            candidates,
            scorer: MatchScorer::new(provider_criteria(weights))?,
        })
    }

    pub fn rank(
        &self,
        specialization: &str,
        location: Location,
        plan: PlanDetails,
    ) -> Result<ProviderRanking, MatchingError> {
        self.rank_at(specialization, location, plan, Utc::now())
    }

    /// Rank in-network providers as of `now`, which anchors the slot windows.
    pub fn rank_at(
        &self,
        specialization: &str,
        location: Location,
        plan: PlanDetails,
        now: DateTime<Utc>,
    ) -> Result<ProviderRanking, MatchingError> {
        info!(
            specialization,
            network_id = %plan.network_id,
            "ranking providers"
        );

        let pool = self
            .candidates
            .find_providers_by_network_and_specialization(&plan.network_id, specialization)?;
        let total_found = pool.len();

        let context = ProviderContext {
            location,
            plan,
            now,
        };
        let recommended = self
            .scorer
            .rank(pool, &context)?
            .into_iter()
            .take(MAX_RESULTS)
            .map(|ranked| {
                let distance_km = context.distance_km(&ranked.candidate);
                let next_available_slot = context.next_available_slot(&ranked.candidate);
                debug!(
                    provider_id = %ranked.candidate.id,
                    score = ranked.score,
                    distance_km,
                    "provider scored"
                );
                ProviderMatch {
                    provider: ranked.candidate,
                    score: ranked.score,
                    reasons: ranked.reasons,
                    components: ranked.components,
                    distance_km,
                    next_available_slot,
                }
            })
            .collect::<Vec<_>>();

        info!(
            specialization,
            total_found,
            returned = recommended.len(),
            "provider ranking complete"
        );

        let ProviderContext { location, plan, .. } = context;
        Ok(ProviderRanking {
            specialization: specialization.to_string(),
            network_id: plan.network_id,
            network_name: plan.network_name,
            recommended,
            total_found,
            search_location: location,
            generated_at: now,
        })
    }

    pub fn provider_details(
        &self,
        provider_id: &ProviderId,
    ) -> Result<ProviderDetails, MatchingError> {
        self.provider_details_at(provider_id, Utc::now())
    }

    pub fn provider_details_at(
        &self,
        provider_id: &ProviderId,
        now: DateTime<Utc>,
    ) -> Result<ProviderDetails, MatchingError> {
        let provider = self.require(provider_id)?;
        Ok(ProviderDetails {
            average_rating: mean_rating(&provider),
            open_slots: open_slots_after(&provider, now),
            next_available_slot: next_slot_after(&provider, now),
            provider,
            generated_at: now,
        })
    }

    /// Slots starting inside `[from, to]`. An empty or inverted window is rejected.
    pub fn available_slots(
        &self,
        provider_id: &ProviderId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<AvailableSlots, MatchingError> {
        if to <= from {
            return Err(MatchingError::InvalidSlotWindow { from, to });
        }
        let provider = self.require(provider_id)?;
        let mut slots = provider
            .slots
            .into_iter()
            .filter(|slot| slot.starts_at >= from && slot.starts_at <= to)
            .collect::<Vec<_>>();
        slots.sort_by_key(|slot| slot.starts_at);
        debug!(%provider_id, found = slots.len(), "slot lookup complete");

        Ok(AvailableSlots {
            provider_id: provider.id,
            from,
            to,
            slots,
        })
    }

    fn require(&self, provider_id: &ProviderId) -> Result<ProviderCandidate, MatchingError> {
        self.candidates
            .find_provider(provider_id)?
            .ok_or_else(|| MatchingError::ProviderNotFound(provider_id.clone()))
    }
}

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::beneficiary::{BeneficiaryId, BeneficiaryProfile, Location};
use crate::risk::{RiskScore, RiskScorer};

use super::balancer::WorkloadBalancer;
use super::config::MatchingConfig;
use super::domain::{
    Assignment, AvailableSlots, NavigatorId, NavigatorMatch, PlanDetails, ProviderDetails,
    ProviderId, ProviderRanking, RebalancingResult, WorkloadDistribution,
};
use super::error::MatchingError;
use super::navigator::NavigatorMatcher;
use super::provider::ProviderRanker;
use super::repository::{CandidateRepository, CaseLedger, WorkloadTracker};
use super::scoring::WeightError;

/// Facade composing risk scoring, navigator matching, provider ranking, and workload balancing
/// over one set of collaborators.
pub struct CareNavigationService<R, W, L> {
    risk: Arc<RiskScorer>,
    matcher: Arc<NavigatorMatcher<R, W, L>>,
    providers: Arc<ProviderRanker<R>>,
    balancer: Arc<WorkloadBalancer<R, W, L>>,
}

impl<R, W, L> CareNavigationService<R, W, L>
where
    R: CandidateRepository + 'static,
    W: WorkloadTracker + 'static,
    L: CaseLedger + 'static,
{
    pub fn new(
        candidates: Arc<R>,
        workload: Arc<W>,
        ledger: Arc<L>,
        config: &MatchingConfig,
    ) -> Result<Self, WeightError> {
        let matcher = Arc::new(NavigatorMatcher::new(
            Arc::clone(&candidates),
            workload,
            ledger,
            &config.navigator,
        )?);
        let providers = Arc::new(ProviderRanker::new(candidates, &config.provider)?);
        let balancer = Arc::new(WorkloadBalancer::new(
            Arc::clone(&matcher),
            config.balancer.clone(),
        ));

        Ok(Self {
            risk: Arc::new(RiskScorer::new(config.risk.clone())),
            matcher,
            providers,
            balancer,
        })
    }

    pub fn score_risk(&self, profile: &BeneficiaryProfile) -> Result<RiskScore, MatchingError> {
        Ok(self.risk.score(profile)?)
    }

    pub fn rank_navigators(
        &self,
        profile: &BeneficiaryProfile,
    ) -> Result<Vec<NavigatorMatch>, MatchingError> {
        self.matcher.rank(profile)
    }

    /// Assign a navigator, tagging the case with the beneficiary's risk level when the profile
    /// supports scoring. An unscorable profile still gets a navigator.
    pub fn assign_navigator(
        &self,
        beneficiary_id: &BeneficiaryId,
        profile: &BeneficiaryProfile,
    ) -> Result<Assignment, MatchingError> {
        let risk_level = match self.risk.score(profile) {
            Ok(score) => Some(score.risk_level),
            Err(error) => {
                debug!(%beneficiary_id, %error, "assigning without a risk level");
                None
            }
        };
        self.matcher
            .assign_with_risk(beneficiary_id, profile, risk_level)
    }

    pub fn reassign_navigator(
        &self,
        beneficiary_id: &BeneficiaryId,
        current_navigator_id: &NavigatorId,
        reason: &str,
    ) -> Result<Assignment, MatchingError> {
        self.matcher
            .reassign(beneficiary_id, current_navigator_id, reason)
    }

    pub fn rank_providers(
        &self,
        specialization: &str,
        location: Location,
        plan: PlanDetails,
    ) -> Result<ProviderRanking, MatchingError> {
        self.providers.rank(specialization, location, plan)
    }

    pub fn provider_details(
        &self,
        provider_id: &ProviderId,
    ) -> Result<ProviderDetails, MatchingError> {
        self.providers.provider_details(provider_id)
    }

    pub fn available_slots(
        &self,
        provider_id: &ProviderId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<AvailableSlots, MatchingError> {
        self.providers.available_slots(provider_id, from, to)
    }

    pub fn rebalance(&self) -> Result<RebalancingResult, MatchingError> {
        self.balancer.rebalance()
    }

    pub fn workload_distribution(&self) -> Result<WorkloadDistribution, MatchingError> {
        self.balancer.distribution()
    }

    /// Shared handle for the background worker.
    pub fn balancer(&self) -> Arc<WorkloadBalancer<R, W, L>> {
        Arc::clone(&self.balancer)
    }
}

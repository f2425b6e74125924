//! Navigator assignment and reassignment.

mod criteria;

pub(crate) use criteria::NEUTRAL_SCORE;

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::beneficiary::{BeneficiaryId, BeneficiaryProfile};
use crate::risk::{ProfileError, RiskLevel};

use super::config::NavigatorWeights;
use super::domain::{Assignment, CaseRecord, Navigator, NavigatorId, NavigatorMatch};
use super::error::MatchingError;
use super::repository::{CandidateRepository, CaseLedger, WorkloadTracker};
use super::scoring::{MatchScorer, WeightError};
use criteria::{navigator_criteria, NavigatorContext};

const CASE_LOCK_STRIPES: usize = 64;

/// Striped per-beneficiary locks. Check-then-write sequences on one case never interleave, while
/// different beneficiaries rarely contend.
struct CaseLocks {
    stripes: Vec<Mutex<()>>,
}

impl CaseLocks {
    fn new() -> Self {
        Self {
            stripes: (0..CASE_LOCK_STRIPES).map(|_| Mutex::new(())).collect(),
        }
    }

    fn hold(&self, beneficiary_id: &BeneficiaryId) -> MutexGuard<'_, ()> {
        let mut hasher = DefaultHasher::new();
        beneficiary_id.hash(&mut hasher);
        let stripe = (hasher.finish() % self.stripes.len() as u64) as usize;
        self.stripes[stripe]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Scores navigators for a beneficiary and keeps workload counters and the case ledger in step
/// with every (re)assignment.
pub struct NavigatorMatcher<R, W, L> {
    candidates: Arc<R>,
    workload: Arc<W>,
    ledger: Arc<L>,
    scorer: MatchScorer<Navigator, NavigatorContext>,
    case_locks: CaseLocks,
}

impl<R, W, L> NavigatorMatcher<R, W, L>
where
    R: CandidateRepository,
    W: WorkloadTracker,
    L: CaseLedger,
{
    pub fn new(
        candidates: Arc<R>,
        workload: Arc<W>,
        ledger: Arc<L>,
        weights: &NavigatorWeights,
    ) -> Result<Self, WeightError> {
        Ok(Self {
            candidates,
            workload,
            ledger,
            scorer: MatchScorer::new(navigator_criteria(weights))?,
            case_locks: CaseLocks::new(),
        })
    }

    pub(crate) fn candidates(&self) -> &Arc<R> {
        &self.candidates
    }

    pub(crate) fn workload(&self) -> &Arc<W> {
        &self.workload
    }

    pub(crate) fn ledger(&self) -> &Arc<L> {
        &self.ledger
    }

    /// Rank every active navigator for the profile without assigning anyone.
    pub fn rank(&self, profile: &BeneficiaryProfile) -> Result<Vec<NavigatorMatch>, MatchingError> {
        let pool = self.candidates.list_active_navigators()?;
        self.rank_pool(pool, profile)
    }

    pub fn assign(
        &self,
        beneficiary_id: &BeneficiaryId,
        profile: &BeneficiaryProfile,
    ) -> Result<Assignment, MatchingError> {
        self.assign_with_risk(beneficiary_id, profile, None)
    }

    /// Assign the best navigator, recording the beneficiary's risk level on the case so the
    /// balancer can move low-acuity cases first.
    ///
    /// A beneficiary holds at most one case; moving an existing case goes through
    /// [`reassign`](Self::reassign).
    pub fn assign_with_risk(
        &self,
        beneficiary_id: &BeneficiaryId,
        profile: &BeneficiaryProfile,
        risk_level: Option<RiskLevel>,
    ) -> Result<Assignment, MatchingError> {
        info!(%beneficiary_id, "assigning navigator");

        if &profile.beneficiary_id != beneficiary_id {
            return Err(ProfileError::BeneficiaryMismatch {
                expected: beneficiary_id.clone(),
                found: profile.beneficiary_id.clone(),
            }
            .into());
        }

        let _case = self.case_locks.hold(beneficiary_id);
        if let Some(existing) = self.ledger.find(beneficiary_id)? {
            return Err(MatchingError::AlreadyAssigned {
                beneficiary_id: beneficiary_id.clone(),
                navigator_id: existing.navigator_id,
            });
        }

        let pool = self.candidates.list_active_navigators()?;
        let best = self
            .rank_pool(pool, profile)?
            .into_iter()
            .next()
            .ok_or_else(MatchingError::no_navigators)?;

        self.workload.increment(&best.candidate.id)?;
        let assignment = build_assignment(beneficiary_id, best, None, None);

        let case = CaseRecord {
            beneficiary_id: beneficiary_id.clone(),
            navigator_id: assignment.navigator_id.clone(),
            profile: profile.clone(),
            risk_level,
            assigned_at: assignment.assigned_at,
        };
        if let Err(error) = self.ledger.record(case) {
            if let Err(rollback) = self.workload.decrement(&assignment.navigator_id) {
                warn!(
                    navigator_id = %assignment.navigator_id,
                    error = %rollback,
                    "failed to roll back workload after ledger error"
                );
            }
            return Err(error.into());
        }

        info!(
            %beneficiary_id,
            navigator_id = %assignment.navigator_id,
            score = assignment.match_score,
            "navigator assigned"
        );
        Ok(assignment)
    }

    /// Move a beneficiary to the best navigator other than the current one.
    pub fn reassign(
        &self,
        beneficiary_id: &BeneficiaryId,
        current_navigator_id: &NavigatorId,
        reason: &str,
    ) -> Result<Assignment, MatchingError> {
        info!(%beneficiary_id, %current_navigator_id, reason, "reassigning navigator");

        let _case = self.case_locks.hold(beneficiary_id);
        let case = self.held_case(beneficiary_id, current_navigator_id)?;
        let pool = self
            .candidates
            .list_active_navigators_excluding(current_navigator_id)?;
        self.move_case(case, pool, reason)
    }

    /// Move a beneficiary to one specific navigator, still scoring the match for the record.
    pub fn reassign_to(
        &self,
        beneficiary_id: &BeneficiaryId,
        current_navigator_id: &NavigatorId,
        target_navigator_id: &NavigatorId,
        reason: &str,
    ) -> Result<Assignment, MatchingError> {
        let _case = self.case_locks.hold(beneficiary_id);
        let case = self.held_case(beneficiary_id, current_navigator_id)?;
        let pool = self
            .candidates
            .list_active_navigators_excluding(current_navigator_id)?
            .into_iter()
            .filter(|navigator| &navigator.id == target_navigator_id)
            .collect();
        self.move_case(case, pool, reason)
    }

    /// Callers hold the beneficiary's case lock until the move is recorded.
    fn held_case(
        &self,
        beneficiary_id: &BeneficiaryId,
        navigator_id: &NavigatorId,
    ) -> Result<CaseRecord, MatchingError> {
        let case = self
            .ledger
            .find(beneficiary_id)?
            .ok_or_else(|| MatchingError::CaseNotFound(beneficiary_id.clone()))?;

        if &case.navigator_id != navigator_id {
            return Err(MatchingError::CaseNotHeld {
                beneficiary_id: beneficiary_id.clone(),
                navigator_id: navigator_id.clone(),
            });
        }
        Ok(case)
    }

    fn move_case(
        &self,
        case: CaseRecord,
        pool: Vec<Navigator>,
        reason: &str,
    ) -> Result<Assignment, MatchingError> {
        let best = self
            .rank_pool(pool, &case.profile)?
            .into_iter()
            .next()
            .ok_or_else(MatchingError::no_navigators)?;

        let previous = case.navigator_id.clone();
        self.workload.transfer(&previous, &best.candidate.id)?;
        let assignment = build_assignment(
            &case.beneficiary_id,
            best,
            Some(previous.clone()),
            Some(reason.to_string()),
        );

        let updated = CaseRecord {
            navigator_id: assignment.navigator_id.clone(),
            assigned_at: assignment.assigned_at,
            ..case
        };
        if let Err(error) = self.ledger.record(updated) {
            if let Err(rollback) = self.workload.transfer(&assignment.navigator_id, &previous) {
                warn!(
                    navigator_id = %assignment.navigator_id,
                    error = %rollback,
                    "failed to roll back workload transfer after ledger error"
                );
            }
            return Err(error.into());
        }

        info!(
            beneficiary_id = %assignment.beneficiary_id,
            from = %previous,
            to = %assignment.navigator_id,
            reason,
            "navigator reassigned"
        );
        Ok(assignment)
    }

    fn rank_pool(
        &self,
        pool: Vec<Navigator>,
        profile: &BeneficiaryProfile,
    ) -> Result<Vec<NavigatorMatch>, MatchingError> {
        if pool.is_empty() {
            return Err(MatchingError::no_navigators());
        }

        let mut workloads = BTreeMap::new();
        for navigator in &pool {
            let current = self.workload.current_workload(&navigator.id)?;
            workloads.insert(navigator.id.clone(), current);
        }

        let context = NavigatorContext {
            profile: profile.clone(),
            workloads,
        };
        let ranked = self.scorer.rank(pool, &context)?;

        for entry in &ranked {
            debug!(
                navigator_id = %entry.candidate.id,
                score = entry.score,
                "navigator scored"
            );
        }
        Ok(ranked)
    }
}

fn build_assignment(
    beneficiary_id: &BeneficiaryId,
    best: NavigatorMatch,
    previous_navigator_id: Option<NavigatorId>,
    reassignment_reason: Option<String>,
) -> Assignment {
    let navigator = best.candidate;
    Assignment {
        beneficiary_id: beneficiary_id.clone(),
        navigator_id: navigator.id,
        navigator_name: navigator.name,
        contact: navigator.contact,
        specializations: navigator.specializations,
        match_score: best.score,
        match_reasons: best.reasons,
        assigned_at: Utc::now(),
        previous_navigator_id,
        reassignment_reason,
    }
}

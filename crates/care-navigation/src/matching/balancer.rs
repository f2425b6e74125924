//! Periodic caseload redistribution across active navigators.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use tracing::{debug, info, warn};

use super::config::BalancerConfig;
use super::domain::{
    CaseMove, CaseRecord, NavigatorId, NavigatorLoad, RebalancingResult, WorkloadDistribution,
};
use super::error::MatchingError;
use super::navigator::NavigatorMatcher;
use super::repository::{CandidateRepository, CaseLedger, WorkloadTracker};

/// Reason recorded on every case moved by a rebalancing pass.
pub const WORKLOAD_BALANCING_REASON: &str = "WORKLOAD_BALANCING";

pub struct WorkloadBalancer<R, W, L> {
    matcher: Arc<NavigatorMatcher<R, W, L>>,
    config: BalancerConfig,
    pass: Mutex<()>,
}

impl<R, W, L> WorkloadBalancer<R, W, L>
where
    R: CandidateRepository,
    W: WorkloadTracker,
    L: CaseLedger,
{
    pub fn new(matcher: Arc<NavigatorMatcher<R, W, L>>, config: BalancerConfig) -> Self {
        Self {
            matcher,
            config,
            pass: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &BalancerConfig {
        &self.config
    }

    /// Run one rebalancing pass. Passes never overlap.
    ///
    /// Per-case failures are logged and counted in the result; only failures to read the
    /// navigator pool or the initial snapshot abort the pass.
    pub fn rebalance(&self) -> Result<RebalancingResult, MatchingError> {
        let _pass = self.pass.lock().unwrap_or_else(PoisonError::into_inner);
        info!("starting workload rebalancing");

        let navigators = self.matcher.candidates().list_active_navigators()?;
        if navigators.is_empty() {
            info!("no active navigators, nothing to rebalance");
            return Ok(RebalancingResult {
                reassigned_cases: 0,
                failed_reassignments: 0,
                moves: Vec::new(),
                previous_average: 0.0,
                new_average: 0.0,
                completed_at: Utc::now(),
            });
        }

        let ids: Vec<NavigatorId> = navigators.iter().map(|n| n.id.clone()).collect();
        let snapshot = self.matcher.workload().snapshot(&ids)?;
        let average = average_of(snapshot.values().copied(), ids.len());

        let mut overloaded: Vec<(NavigatorId, u32)> = snapshot
            .iter()
            .filter(|(_, load)| f64::from(**load) > self.config.overload_factor * average)
            .map(|(id, load)| (id.clone(), *load))
            .collect();
        overloaded.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let mut lightest: Vec<(NavigatorId, u32)> = snapshot
            .iter()
            .filter(|(_, load)| f64::from(**load) < self.config.underload_factor * average)
            .map(|(id, load)| (id.clone(), *load))
            .collect();
        lightest.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        let mut underloaded: VecDeque<NavigatorId> =
            lightest.into_iter().map(|(id, _)| id).collect();

        info!(
            average,
            overloaded = overloaded.len(),
            underloaded = underloaded.len(),
            "workload imbalance detected"
        );

        let mut moves = Vec::new();
        let mut failed = 0usize;

        'sources: for (source, load) in overloaded {
            if underloaded.is_empty() {
                break;
            }

            // Truncation keeps the source at or above the average once its excess is gone.
            let excess = (f64::from(load) - average).trunc() as usize;
            let cases = match self.matcher.ledger().cases_for(&source) {
                Ok(cases) => select_cases(cases, excess),
                Err(error) => {
                    warn!(navigator_id = %source, %error, "could not load cases for rebalancing");
                    failed += excess;
                    continue;
                }
            };

            for case in cases {
                let Some((target, target_load)) = self.next_target(&mut underloaded, average)
                else {
                    break 'sources;
                };

                let source_load = match self.matcher.workload().current_workload(&source) {
                    Ok(load) => load,
                    Err(error) => {
                        warn!(navigator_id = %source, %error, "could not read live workload");
                        failed += 1;
                        continue;
                    }
                };
                if f64::from(source_load) <= average {
                    debug!(navigator_id = %source, "navigator no longer overloaded");
                    continue 'sources;
                }
                if source_load < target_load + 2 {
                    warn!(
                        beneficiary_id = %case.beneficiary_id,
                        from = %source,
                        to = %target,
                        source_load,
                        target_load,
                        "skipping move that would not narrow the gap"
                    );
                    continue 'sources;
                }

                match self.matcher.reassign_to(
                    &case.beneficiary_id,
                    &source,
                    &target,
                    WORKLOAD_BALANCING_REASON,
                ) {
                    Ok(_) => {
                        moves.push(CaseMove {
                            beneficiary_id: case.beneficiary_id,
                            from: source.clone(),
                            to: target.clone(),
                        });
                        if f64::from(target_load + 1) >= average {
                            underloaded.pop_front();
                        }
                    }
                    Err(error) => {
                        warn!(
                            beneficiary_id = %case.beneficiary_id,
                            from = %source,
                            to = %target,
                            %error,
                            "rebalancing move failed"
                        );
                        failed += 1;
                    }
                }
            }
        }

        let new_average = match self.matcher.workload().snapshot(&ids) {
            Ok(after) => average_of(after.values().copied(), ids.len()),
            Err(error) => {
                warn!(%error, "could not read workloads after rebalancing");
                average
            }
        };

        info!(
            reassigned = moves.len(),
            failed,
            previous_average = average,
            new_average,
            "workload rebalancing complete"
        );

        Ok(RebalancingResult {
            reassigned_cases: moves.len(),
            failed_reassignments: failed,
            moves,
            previous_average: average,
            new_average,
            completed_at: Utc::now(),
        })
    }

    /// Per-navigator workload across every navigator, active or not.
    pub fn distribution(&self) -> Result<WorkloadDistribution, MatchingError> {
        let mut navigators = self.matcher.candidates().list_all_navigators()?;
        navigators.sort_by(|a, b| a.id.cmp(&b.id));

        let ids: Vec<NavigatorId> = navigators.iter().map(|n| n.id.clone()).collect();
        let snapshot = self.matcher.workload().snapshot(&ids)?;

        let loads: Vec<NavigatorLoad> = navigators
            .into_iter()
            .map(|navigator| NavigatorLoad {
                workload: snapshot.get(&navigator.id).copied().unwrap_or(0),
                navigator_id: navigator.id,
                name: navigator.name,
                max_caseload: navigator.max_caseload,
                active: navigator.active,
            })
            .collect();

        let total_cases = loads.iter().map(|load| load.workload).sum();
        Ok(WorkloadDistribution {
            average_cases_per_navigator: average_of(
                loads.iter().map(|load| load.workload),
                loads.len(),
            ),
            navigators: loads,
            total_cases,
            generated_at: Utc::now(),
        })
    }

    /// Front of the underloaded queue whose live workload is still below average. Navigators
    /// that have caught up are dropped from the queue.
    fn next_target(
        &self,
        underloaded: &mut VecDeque<NavigatorId>,
        average: f64,
    ) -> Option<(NavigatorId, u32)> {
        while let Some(candidate) = underloaded.front() {
            match self.matcher.workload().current_workload(candidate) {
                Ok(load) if f64::from(load) < average => return Some((candidate.clone(), load)),
                Ok(_) => {
                    debug!(navigator_id = %candidate, "navigator reached average workload");
                }
                Err(error) => {
                    warn!(navigator_id = %candidate, %error, "could not read live workload");
                }
            }
            underloaded.pop_front();
        }
        None
    }
}

fn average_of(loads: impl Iterator<Item = u32>, count: usize) -> f64 {
    if count == 0 {
        return 0.0;
    }
    loads.map(f64::from).sum::<f64>() / count as f64
}

/// Pick up to `count` cases to move off a navigator: lowest risk first (unscored cases count as
/// lowest), then the most recently assigned, then by beneficiary id.
pub(crate) fn select_cases(mut cases: Vec<CaseRecord>, count: usize) -> Vec<CaseRecord> {
    cases.sort_by(|a, b| {
        a.risk_level
            .cmp(&b.risk_level)
            .then_with(|| b.assigned_at.cmp(&a.assigned_at))
            .then_with(|| a.beneficiary_id.cmp(&b.beneficiary_id))
    });
    cases.truncate(count);
    cases
}

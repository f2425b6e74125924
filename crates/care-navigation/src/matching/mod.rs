//! Navigator matching, provider ranking, and caseload balancing.
//!
//! Scoring is pure; every side effect goes through the [`repository`] traits so callers decide
//! where navigators, counters, and cases live.

pub mod balancer;
pub mod config;
pub mod domain;
pub mod error;
pub mod geo;
mod navigator;
mod provider;
pub mod repository;
pub mod router;
pub mod scoring;
pub mod service;
pub mod worker;
pub mod workload;

#[cfg(test)]
mod tests;

pub use balancer::{WorkloadBalancer, WORKLOAD_BALANCING_REASON};
pub use config::{BalancerConfig, MatchingConfig, NavigatorWeights, ProviderWeights};
pub use domain::{
    AppointmentSlot, Assignment, AssignmentRequest, AvailableSlots, CaseMove, CaseRecord,
    ContactChannels, MatchResult, Navigator, NavigatorId, NavigatorLoad, NavigatorMatch,
    PlanDetails, ProviderCandidate, ProviderDetails, ProviderId, ProviderMatch,
    ProviderRanking, ProviderSearchRequest, ReassignmentRequest, RebalancingResult,
    ScoreComponent, SlotWindowRequest, WorkloadDistribution,
};
pub use error::MatchingError;
pub use navigator::NavigatorMatcher;
pub use provider::{ProviderRanker, MAX_RESULTS};
pub use repository::{CandidateRepository, CaseLedger, RepositoryError, WorkloadTracker};
pub use router::navigation_router;
pub use scoring::{ScoringError, WeightError};
pub use service::CareNavigationService;
pub use worker::{BalancerWorker, WorkerError};
pub use workload::InMemoryWorkloadTracker;

use std::collections::BTreeMap;

use crate::beneficiary::BeneficiaryId;

use super::domain::{CaseRecord, Navigator, NavigatorId, ProviderCandidate, ProviderId};

/// Read access to navigator and provider reference data.
pub trait CandidateRepository: Send + Sync {
    fn list_active_navigators(&self) -> Result<Vec<Navigator>, RepositoryError>;
    fn list_active_navigators_excluding(
        &self,
        excluded: &NavigatorId,
    ) -> Result<Vec<Navigator>, RepositoryError>;
    fn list_all_navigators(&self) -> Result<Vec<Navigator>, RepositoryError>;
    fn find_providers_by_network_and_specialization(
        &self,
        network_id: &str,
        specialization: &str,
    ) -> Result<Vec<ProviderCandidate>, RepositoryError>;
    fn find_provider(
        &self,
        provider_id: &ProviderId,
    ) -> Result<Option<ProviderCandidate>, RepositoryError>;
}

/// Authoritative per-navigator case counters.
///
/// Implementations must make `increment`, `decrement` and `transfer` atomic per counter, and
/// `snapshot` must never observe half of a `transfer`.
pub trait WorkloadTracker: Send + Sync {
    fn current_workload(&self, navigator: &NavigatorId) -> Result<u32, RepositoryError>;
    fn increment(&self, navigator: &NavigatorId) -> Result<u32, RepositoryError>;
    /// Saturates at zero.
    fn decrement(&self, navigator: &NavigatorId) -> Result<u32, RepositoryError>;
    /// Move one case between counters as a single transition.
    fn transfer(&self, from: &NavigatorId, to: &NavigatorId) -> Result<(), RepositoryError>;
    fn snapshot(
        &self,
        navigators: &[NavigatorId],
    ) -> Result<BTreeMap<NavigatorId, u32>, RepositoryError>;
}

/// Persistence for navigator assignments, keyed by beneficiary.
pub trait CaseLedger: Send + Sync {
    /// Insert or replace the beneficiary's current case.
    fn record(&self, case: CaseRecord) -> Result<(), RepositoryError>;
    fn find(&self, beneficiary: &BeneficiaryId) -> Result<Option<CaseRecord>, RepositoryError>;
    fn cases_for(&self, navigator: &NavigatorId) -> Result<Vec<CaseRecord>, RepositoryError>;
}

/// Error enumeration for collaborator failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("conflicting update: {0}")]
    Conflict(String),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

use chrono::{DateTime, Utc};

use crate::beneficiary::BeneficiaryId;
use crate::risk::ProfileError;

use super::domain::{NavigatorId, ProviderId};
use super::repository::RepositoryError;
use super::scoring::ScoringError;

/// Error raised by matching, ranking, and balancing operations.
///
/// Every variant is fatal to the current call; retries belong to the caller.
#[derive(Debug, thiserror::Error)]
pub enum MatchingError {
    #[error("no active {pool} available")]
    NoCandidates { pool: &'static str },
    #[error("invalid beneficiary profile: {0}")]
    InvalidProfile(#[from] ProfileError),
    #[error("no case recorded for beneficiary {0}")]
    CaseNotFound(BeneficiaryId),
    #[error("beneficiary {beneficiary_id} is not assigned to navigator {navigator_id}")]
    CaseNotHeld {
        beneficiary_id: BeneficiaryId,
        navigator_id: NavigatorId,
    },
    #[error("beneficiary {beneficiary_id} is already assigned to navigator {navigator_id}")]
    AlreadyAssigned {
        beneficiary_id: BeneficiaryId,
        navigator_id: NavigatorId,
    },
    #[error("provider {0} not found")]
    ProviderNotFound(ProviderId),
    #[error("slot window must end after it starts (from {from}, to {to})")]
    InvalidSlotWindow {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Scoring(#[from] ScoringError),
}

impl MatchingError {
    pub(crate) fn no_navigators() -> Self {
        Self::NoCandidates { pool: "navigators" }
    }
}

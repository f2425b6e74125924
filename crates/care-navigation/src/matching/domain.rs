use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::beneficiary::{BeneficiaryId, BeneficiaryProfile, Location};
use crate::risk::RiskLevel;

/// Identifier wrapper for care navigators.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NavigatorId(pub String);

impl fmt::Display for NavigatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for preferred-network providers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProviderId(pub String);

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactChannels {
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Care coordinator reference data, owned by the candidate repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Navigator {
    pub id: NavigatorId,
    pub name: String,
    #[serde(default)]
    pub contact: ContactChannels,
    #[serde(default)]
    pub specializations: BTreeSet<String>,
    #[serde(default)]
    pub languages: BTreeSet<String>,
    pub max_caseload: u32,
    /// Composite of satisfaction and resolution metrics in `[0, 1]`.
    pub performance_score: f64,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentSlot {
    pub starts_at: DateTime<Utc>,
    pub duration_minutes: u32,
}

/// In-network provider reference data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderCandidate {
    pub id: ProviderId,
    pub name: String,
    #[serde(default)]
    pub specializations: BTreeSet<String>,
    pub location: Location,
    /// Composite quality metric in `[0, 1]`.
    pub quality_score: f64,
    /// Recent patient ratings on a 0-5 scale.
    #[serde(default)]
    pub review_ratings: Vec<f64>,
    pub average_cost_per_visit: f64,
    #[serde(default)]
    pub accepting_new_patients: bool,
    #[serde(default)]
    pub slots: Vec<AppointmentSlot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanDetails {
    pub network_id: String,
    #[serde(default)]
    pub network_name: Option<String>,
    pub max_allowed_cost: f64,
}

/// Contribution of one criterion to a match score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreComponent {
    pub criterion: &'static str,
    pub weight: f64,
    pub score: f64,
}

/// Scored candidate produced by the shared match scorer. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult<C> {
    pub candidate: C,
    pub score: f64,
    pub reasons: Vec<String>,
    pub components: Vec<ScoreComponent>,
}

pub type NavigatorMatch = MatchResult<Navigator>;

/// Ranked provider entry returned to the orchestration layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderMatch {
    pub provider: ProviderCandidate,
    pub score: f64,
    pub reasons: Vec<String>,
    pub components: Vec<ScoreComponent>,
    pub distance_km: f64,
    pub next_available_slot: Option<DateTime<Utc>>,
}

/// Outcome of a provider search; `total_found` counts the full pool, not just the returned slice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderRanking {
    pub specialization: String,
    pub network_id: String,
    pub network_name: Option<String>,
    pub recommended: Vec<ProviderMatch>,
    pub total_found: usize,
    pub search_location: Location,
    pub generated_at: DateTime<Utc>,
}

impl ProviderRanking {
    pub fn is_empty(&self) -> bool {
        self.total_found == 0
    }
}

/// Provider record with its near-term availability, as of `generated_at`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderDetails {
    pub provider: ProviderCandidate,
    pub average_rating: Option<f64>,
    pub open_slots: usize,
    pub next_available_slot: Option<DateTime<Utc>>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotWindowRequest {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

/// Slots starting inside `[from, to]`, earliest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AvailableSlots {
    pub provider_id: ProviderId,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub slots: Vec<AppointmentSlot>,
}

/// Navigator assignment handed back to the workflow and persisted by the case ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub beneficiary_id: BeneficiaryId,
    pub navigator_id: NavigatorId,
    pub navigator_name: String,
    pub contact: ContactChannels,
    pub specializations: BTreeSet<String>,
    pub match_score: f64,
    pub match_reasons: Vec<String>,
    pub assigned_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_navigator_id: Option<NavigatorId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reassignment_reason: Option<String>,
}

/// Ledger entry for a beneficiary's current navigator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseRecord {
    pub beneficiary_id: BeneficiaryId,
    pub navigator_id: NavigatorId,
    pub profile: BeneficiaryProfile,
    pub risk_level: Option<RiskLevel>,
    pub assigned_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentRequest {
    pub beneficiary_id: BeneficiaryId,
    pub profile: BeneficiaryProfile,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReassignmentRequest {
    pub beneficiary_id: BeneficiaryId,
    pub current_navigator_id: NavigatorId,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderSearchRequest {
    pub specialization: String,
    pub location: Location,
    pub plan: PlanDetails,
}

/// One case moved by a rebalancing pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseMove {
    pub beneficiary_id: BeneficiaryId,
    pub from: NavigatorId,
    pub to: NavigatorId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RebalancingResult {
    pub reassigned_cases: usize,
    pub failed_reassignments: usize,
    pub moves: Vec<CaseMove>,
    pub previous_average: f64,
    pub new_average: f64,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavigatorLoad {
    pub navigator_id: NavigatorId,
    pub name: String,
    pub workload: u32,
    pub max_caseload: u32,
    pub active: bool,
}

impl NavigatorLoad {
    pub fn utilization(&self) -> f64 {
        if self.max_caseload == 0 {
            return 0.0;
        }
        self.workload as f64 / self.max_caseload as f64
    }
}

/// Caseload snapshot across every navigator, active or not.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkloadDistribution {
    pub navigators: Vec<NavigatorLoad>,
    pub total_cases: u32,
    pub average_cases_per_navigator: f64,
    pub generated_at: DateTime<Utc>,
}

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration as StdDuration;

use axum::response::Response;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde_json::Value;

use crate::beneficiary::{BeneficiaryId, BeneficiaryProfile, Location};
use crate::matching::domain::{
    AppointmentSlot, CaseRecord, ContactChannels, Navigator, NavigatorId, PlanDetails,
    ProviderCandidate, ProviderId,
};
use crate::matching::repository::{CandidateRepository, CaseLedger, RepositoryError};
use crate::matching::{
    CareNavigationService, InMemoryWorkloadTracker, MatchingConfig, NavigatorMatcher,
    NavigatorWeights, ProviderRanker, ProviderWeights,
};

pub(super) const SAO_PAULO: Location = Location {
    latitude: -23.5505,
    longitude: -46.6333,
};

pub(super) fn nav_id(value: &str) -> NavigatorId {
    NavigatorId(value.to_string())
}

pub(super) fn ben_id(value: &str) -> BeneficiaryId {
    BeneficiaryId(value.to_string())
}

pub(super) fn set(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|value| value.to_string()).collect()
}

pub(super) fn navigator(
    id: &str,
    specializations: &[&str],
    languages: &[&str],
    performance_score: f64,
) -> Navigator {
    Navigator {
        id: nav_id(id),
        name: format!("Navigator {id}"),
        contact: ContactChannels {
            phone: Some("+55 11 4000-0000".to_string()),
            email: Some(format!("{id}@care.example")),
        },
        specializations: set(specializations),
        languages: set(languages),
        max_caseload: 20,
        performance_score,
        location: None,
        active: true,
    }
}

pub(super) fn cardiology_team() -> Vec<Navigator> {
    vec![
        navigator("nav-a", &["cardiology"], &["pt"], 0.9),
        navigator("nav-b", &["oncology"], &["en"], 0.95),
    ]
}

pub(super) fn profile(id: &str) -> BeneficiaryProfile {
    let mut profile = BeneficiaryProfile::new(ben_id(id));
    profile.required_specializations = set(&["cardiology"]);
    profile.preferred_language = Some("pt".to_string());
    profile.demographics.birth_date = NaiveDate::from_ymd_opt(1980, 4, 12);
    profile
}

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 3, 8, 0, 0)
        .single()
        .expect("valid time")
}

/// Point roughly `km` kilometres north of São Paulo's centre.
pub(super) fn north_of_sao_paulo(km: f64) -> Location {
    Location {
        latitude: SAO_PAULO.latitude + km / 111.195,
        longitude: SAO_PAULO.longitude,
    }
}

pub(super) fn provider(id: &str, distance_km: f64, quality_score: f64) -> ProviderCandidate {
    ProviderCandidate {
        id: ProviderId(id.to_string()),
        name: format!("Clinic {id}"),
        specializations: set(&["cardiology"]),
        location: north_of_sao_paulo(distance_km),
        quality_score,
        review_ratings: vec![4.0],
        average_cost_per_visit: 200.0,
        accepting_new_patients: true,
        slots: (1..=6)
            .map(|day| AppointmentSlot {
                starts_at: now() + Duration::days(day),
                duration_minutes: 30,
            })
            .collect(),
    }
}

pub(super) fn gold_plan() -> PlanDetails {
    PlanDetails {
        network_id: "net-gold".to_string(),
        network_name: Some("Gold Network".to_string()),
        max_allowed_cost: 400.0,
    }
}

#[derive(Default)]
pub(super) struct MemoryCandidates {
    pub(super) navigators: Mutex<Vec<Navigator>>,
    pub(super) providers: Mutex<HashMap<String, Vec<ProviderCandidate>>>,
}

impl MemoryCandidates {
    pub(super) fn with_navigators(navigators: Vec<Navigator>) -> Self {
        Self {
            navigators: Mutex::new(navigators),
            providers: Mutex::new(HashMap::new()),
        }
    }

    pub(super) fn add_providers(&self, network_id: &str, providers: Vec<ProviderCandidate>) {
        self.providers
            .lock()
            .expect("candidate mutex poisoned")
            .entry(network_id.to_string())
            .or_default()
            .extend(providers);
    }
}

impl CandidateRepository for MemoryCandidates {
    fn list_active_navigators(&self) -> Result<Vec<Navigator>, RepositoryError> {
        let guard = self.navigators.lock().expect("candidate mutex poisoned");
        Ok(guard.iter().filter(|n| n.active).cloned().collect())
    }

    fn list_active_navigators_excluding(
        &self,
        excluded: &NavigatorId,
    ) -> Result<Vec<Navigator>, RepositoryError> {
        let guard = self.navigators.lock().expect("candidate mutex poisoned");
        Ok(guard
            .iter()
            .filter(|n| n.active && &n.id != excluded)
            .cloned()
            .collect())
    }

    fn list_all_navigators(&self) -> Result<Vec<Navigator>, RepositoryError> {
        Ok(self.navigators.lock().expect("candidate mutex poisoned").clone())
    }

    fn find_providers_by_network_and_specialization(
        &self,
        network_id: &str,
        specialization: &str,
    ) -> Result<Vec<ProviderCandidate>, RepositoryError> {
        let guard = self.providers.lock().expect("candidate mutex poisoned");
        Ok(guard
            .get(network_id)
            .map(|providers| {
                providers
                    .iter()
                    .filter(|p| p.specializations.contains(specialization))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn find_provider(
        &self,
        provider_id: &ProviderId,
    ) -> Result<Option<ProviderCandidate>, RepositoryError> {
        let guard = self.providers.lock().expect("candidate mutex poisoned");
        Ok(guard
            .values()
            .flatten()
            .find(|provider| &provider.id == provider_id)
            .cloned())
    }
}

pub(super) struct UnavailableCandidates;

impl CandidateRepository for UnavailableCandidates {
    fn list_active_navigators(&self) -> Result<Vec<Navigator>, RepositoryError> {
        Err(RepositoryError::Unavailable("directory offline".to_string()))
    }

    fn list_active_navigators_excluding(
        &self,
        _excluded: &NavigatorId,
    ) -> Result<Vec<Navigator>, RepositoryError> {
        Err(RepositoryError::Unavailable("directory offline".to_string()))
    }

    fn list_all_navigators(&self) -> Result<Vec<Navigator>, RepositoryError> {
        Err(RepositoryError::Unavailable("directory offline".to_string()))
    }

    fn find_providers_by_network_and_specialization(
        &self,
        _network_id: &str,
        _specialization: &str,
    ) -> Result<Vec<ProviderCandidate>, RepositoryError> {
        Err(RepositoryError::Unavailable("directory offline".to_string()))
    }

    fn find_provider(
        &self,
        _provider_id: &ProviderId,
    ) -> Result<Option<ProviderCandidate>, RepositoryError> {
        Err(RepositoryError::Unavailable("directory offline".to_string()))
    }
}

#[derive(Default)]
pub(super) struct MemoryLedger {
    pub(super) cases: Mutex<HashMap<BeneficiaryId, CaseRecord>>,
}

impl MemoryLedger {
    pub(super) fn case(&self, beneficiary: &str) -> Option<CaseRecord> {
        self.cases
            .lock()
            .expect("ledger mutex poisoned")
            .get(&ben_id(beneficiary))
            .cloned()
    }
}

impl CaseLedger for MemoryLedger {
    fn record(&self, case: CaseRecord) -> Result<(), RepositoryError> {
        self.cases
            .lock()
            .expect("ledger mutex poisoned")
            .insert(case.beneficiary_id.clone(), case);
        Ok(())
    }

    fn find(&self, beneficiary: &BeneficiaryId) -> Result<Option<CaseRecord>, RepositoryError> {
        Ok(self
            .cases
            .lock()
            .expect("ledger mutex poisoned")
            .get(beneficiary)
            .cloned())
    }

    fn cases_for(&self, navigator: &NavigatorId) -> Result<Vec<CaseRecord>, RepositoryError> {
        let guard = self.cases.lock().expect("ledger mutex poisoned");
        let mut cases: Vec<CaseRecord> = guard
            .values()
            .filter(|case| &case.navigator_id == navigator)
            .cloned()
            .collect();
        cases.sort_by(|a, b| a.beneficiary_id.cmp(&b.beneficiary_id));
        Ok(cases)
    }
}

/// Ledger that serves existing cases but refuses every write.
#[derive(Default)]
pub(super) struct ReadOnlyLedger {
    pub(super) inner: MemoryLedger,
}

impl CaseLedger for ReadOnlyLedger {
    fn record(&self, _case: CaseRecord) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("ledger is read only".to_string()))
    }

    fn find(&self, beneficiary: &BeneficiaryId) -> Result<Option<CaseRecord>, RepositoryError> {
        self.inner.find(beneficiary)
    }

    fn cases_for(&self, navigator: &NavigatorId) -> Result<Vec<CaseRecord>, RepositoryError> {
        self.inner.cases_for(navigator)
    }
}

pub(super) fn case_for(beneficiary: &str, navigator: &str, minutes_ago: i64) -> CaseRecord {
    CaseRecord {
        beneficiary_id: ben_id(beneficiary),
        navigator_id: nav_id(navigator),
        profile: profile(beneficiary),
        risk_level: None,
        assigned_at: now() - Duration::minutes(minutes_ago),
    }
}

/// Seed `count` cases on `navigator` in both the ledger and the tracker counts.
pub(super) fn seed_cases(
    ledger: &MemoryLedger,
    navigator: &str,
    count: u32,
) -> (NavigatorId, u32) {
    for index in 0..count {
        let case = case_for(&format!("{navigator}-ben-{index:02}"), navigator, i64::from(index));
        ledger.record(case).expect("memory ledger accepts writes");
    }
    (nav_id(navigator), count)
}

/// Ledger whose lookups stall briefly, widening the window between reading a case and moving it.
#[derive(Default)]
pub(super) struct SlowLedger {
    pub(super) inner: MemoryLedger,
}

impl CaseLedger for SlowLedger {
    fn record(&self, case: CaseRecord) -> Result<(), RepositoryError> {
        self.inner.record(case)
    }

    fn find(&self, beneficiary: &BeneficiaryId) -> Result<Option<CaseRecord>, RepositoryError> {
        let found = self.inner.find(beneficiary);
        thread::sleep(StdDuration::from_millis(20));
        found
    }

    fn cases_for(&self, navigator: &NavigatorId) -> Result<Vec<CaseRecord>, RepositoryError> {
        self.inner.cases_for(navigator)
    }
}

pub(super) type TestMatcher =
    NavigatorMatcher<MemoryCandidates, InMemoryWorkloadTracker, MemoryLedger>;

pub(super) fn build_matcher(
    navigators: Vec<Navigator>,
) -> (
    TestMatcher,
    Arc<InMemoryWorkloadTracker>,
    Arc<MemoryLedger>,
) {
    let workload = Arc::new(InMemoryWorkloadTracker::default());
    let ledger = Arc::new(MemoryLedger::default());
    let matcher = NavigatorMatcher::new(
        Arc::new(MemoryCandidates::with_navigators(navigators)),
        workload.clone(),
        ledger.clone(),
        &NavigatorWeights::default(),
    )
    .expect("default weights are valid");
    (matcher, workload, ledger)
}

pub(super) fn build_ranker(
    network_id: &str,
    providers: Vec<ProviderCandidate>,
) -> ProviderRanker<MemoryCandidates> {
    let candidates = MemoryCandidates::default();
    candidates.add_providers(network_id, providers);
    ProviderRanker::new(Arc::new(candidates), &ProviderWeights::default())
        .expect("default weights are valid")
}

pub(super) type TestService =
    CareNavigationService<MemoryCandidates, InMemoryWorkloadTracker, MemoryLedger>;

pub(super) fn build_service(
    navigators: Vec<Navigator>,
) -> (
    TestService,
    Arc<MemoryCandidates>,
    Arc<InMemoryWorkloadTracker>,
    Arc<MemoryLedger>,
) {
    let candidates = Arc::new(MemoryCandidates::with_navigators(navigators));
    let workload = Arc::new(InMemoryWorkloadTracker::default());
    let ledger = Arc::new(MemoryLedger::default());
    let service = CareNavigationService::new(
        candidates.clone(),
        workload.clone(),
        ledger.clone(),
        &MatchingConfig::default(),
    )
    .expect("default weights are valid");
    (service, candidates, workload, ledger)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

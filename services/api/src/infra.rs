use care_navigation::beneficiary::{BeneficiaryId, BeneficiaryProfile, Location, SmokingStatus};
use care_navigation::error::AppError;
use care_navigation::matching::{
    AppointmentSlot, CandidateRepository, CareNavigationService, CaseLedger, CaseRecord,
    ContactChannels, InMemoryWorkloadTracker, MatchingConfig, MatchingError, Navigator,
    NavigatorId, ProviderCandidate, ProviderId, RepositoryError,
};
use chrono::{Duration, NaiveDate, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};

pub(crate) const DEMO_NETWORK_ID: &str = "net-essencial";

pub(crate) const PAULISTA: Location = Location {
    latitude: -23.5614,
    longitude: -46.6559,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type NavigationService =
    CareNavigationService<InMemoryCandidateRepository, InMemoryWorkloadTracker, InMemoryCaseLedger>;

fn lock<'a, T>(mutex: &'a Mutex<T>, what: &str) -> Result<MutexGuard<'a, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable(format!("{what} lock poisoned")))
}

#[derive(Default)]
pub(crate) struct InMemoryCandidateRepository {
    navigators: Mutex<Vec<Navigator>>,
    providers: Mutex<HashMap<String, Vec<ProviderCandidate>>>,
}

impl InMemoryCandidateRepository {
    pub(crate) fn new(
        navigators: Vec<Navigator>,
        providers: Vec<(String, ProviderCandidate)>,
    ) -> Self {
        let mut by_network: HashMap<String, Vec<ProviderCandidate>> = HashMap::new();
        for (network_id, provider) in providers {
            by_network.entry(network_id).or_default().push(provider);
        }
        Self {
            navigators: Mutex::new(navigators),
            providers: Mutex::new(by_network),
        }
    }
}

impl CandidateRepository for InMemoryCandidateRepository {
    fn list_active_navigators(&self) -> Result<Vec<Navigator>, RepositoryError> {
        let guard = lock(&self.navigators, "navigator")?;
        Ok(guard.iter().filter(|n| n.active).cloned().collect())
    }

    fn list_active_navigators_excluding(
        &self,
        excluded: &NavigatorId,
    ) -> Result<Vec<Navigator>, RepositoryError> {
        let guard = lock(&self.navigators, "navigator")?;
        Ok(guard
            .iter()
            .filter(|n| n.active && &n.id != excluded)
            .cloned()
            .collect())
    }

    fn list_all_navigators(&self) -> Result<Vec<Navigator>, RepositoryError> {
        Ok(lock(&self.navigators, "navigator")?.clone())
    }

    fn find_providers_by_network_and_specialization(
        &self,
        network_id: &str,
        specialization: &str,
    ) -> Result<Vec<ProviderCandidate>, RepositoryError> {
        let guard = lock(&self.providers, "provider")?;
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
        let guard = lock(&self.providers, "provider")?;
        Ok(guard
            .values()
            .flatten()
            .find(|provider| &provider.id == provider_id)
            .cloned())
    }
}

#[derive(Default)]
pub(crate) struct InMemoryCaseLedger {
    cases: Mutex<HashMap<BeneficiaryId, CaseRecord>>,
}

impl CaseLedger for InMemoryCaseLedger {
    fn record(&self, case: CaseRecord) -> Result<(), RepositoryError> {
        lock(&self.cases, "ledger")?.insert(case.beneficiary_id.clone(), case);
        Ok(())
    }

    fn find(&self, beneficiary: &BeneficiaryId) -> Result<Option<CaseRecord>, RepositoryError> {
        Ok(lock(&self.cases, "ledger")?.get(beneficiary).cloned())
    }

    fn cases_for(&self, navigator: &NavigatorId) -> Result<Vec<CaseRecord>, RepositoryError> {
        let guard = lock(&self.cases, "ledger")?;
        let mut cases: Vec<CaseRecord> = guard
            .values()
            .filter(|case| &case.navigator_id == navigator)
            .cloned()
            .collect();
        cases.sort_by(|a, b| a.beneficiary_id.cmp(&b.beneficiary_id));
        Ok(cases)
    }
}

/// Service over the demo roster with an empty caseload.
pub(crate) fn demo_service(config: &MatchingConfig) -> Result<Arc<NavigationService>, AppError> {
    service_with_backlog(config, 0)
}

/// Service over the demo roster where the first navigator already carries `backlog` cases.
pub(crate) fn service_with_backlog(
    config: &MatchingConfig,
    backlog: u32,
) -> Result<Arc<NavigationService>, AppError> {
    let roster = demo_navigators();
    let ledger = InMemoryCaseLedger::default();
    let mut counts = Vec::new();

    if let Some(busiest) = roster.first() {
        let assigned_at = Utc::now();
        for index in 0..backlog {
            let id = format!("backlog-{index:03}");
            let case = CaseRecord {
                beneficiary_id: BeneficiaryId(id.clone()),
                navigator_id: busiest.id.clone(),
                profile: demo_profile(&id, index as usize),
                risk_level: None,
                assigned_at: assigned_at - Duration::minutes(i64::from(index)),
            };
            ledger.record(case).map_err(MatchingError::from)?;
        }
        counts.push((busiest.id.clone(), backlog));
    }

    let providers = demo_providers()
        .into_iter()
        .map(|provider| (DEMO_NETWORK_ID.to_string(), provider))
        .collect();
    let service = CareNavigationService::new(
        Arc::new(InMemoryCandidateRepository::new(roster, providers)),
        Arc::new(InMemoryWorkloadTracker::with_counts(counts)),
        Arc::new(ledger),
        config,
    )?;
    Ok(Arc::new(service))
}

fn set(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|value| value.to_string()).collect()
}

pub(crate) fn demo_navigators() -> Vec<Navigator> {
    let roster = [
        ("nav-ana", "Ana Souza", &["cardiology", "diabetes"][..], &["pt", "en"][..], 0.92),
        ("nav-bruno", "Bruno Lima", &["oncology"][..], &["pt"][..], 0.88),
        ("nav-carla", "Carla Mendes", &["mental_health", "diabetes"][..], &["pt", "es"][..], 0.81),
        ("nav-diego", "Diego Rocha", &["cardiology", "copd"][..], &["pt"][..], 0.76),
    ];

    roster
        .iter()
        .enumerate()
        .map(|(offset, (id, name, specializations, languages, performance))| Navigator {
            id: NavigatorId(id.to_string()),
            name: name.to_string(),
            contact: ContactChannels {
                phone: Some(format!("+55 11 3000-00{offset:02}")),
                email: Some(format!("{id}@navigation.example")),
            },
            specializations: set(specializations),
            languages: set(languages),
            max_caseload: 40,
            performance_score: *performance,
            location: Some(Location {
                latitude: PAULISTA.latitude + offset as f64 * 0.02,
                longitude: PAULISTA.longitude,
            }),
            active: true,
        })
        .collect()
}

pub(crate) fn demo_providers() -> Vec<ProviderCandidate> {
    let now = Utc::now();
    let clinics = [
        ("prov-paulista", "Clínica Paulista", 0.0, 0.91, &[4.8, 4.6, 5.0][..], 220.0, 14),
        ("prov-pinheiros", "Instituto Pinheiros", 0.05, 0.84, &[4.2, 4.5][..], 160.0, 6),
        ("prov-santana", "Hospital Santana", 0.12, 0.95, &[4.9][..], 340.0, 22),
        ("prov-guarulhos", "Centro Guarulhos", 0.30, 0.70, &[][..], 110.0, 2),
    ];

    clinics
        .iter()
        .map(|(id, name, offset, quality, ratings, cost, slots)| ProviderCandidate {
            id: ProviderId(id.to_string()),
            name: name.to_string(),
            specializations: set(&["cardiology", "endocrinology"]),
            location: Location {
                latitude: PAULISTA.latitude + offset,
                longitude: PAULISTA.longitude + offset,
            },
            quality_score: *quality,
            review_ratings: ratings.to_vec(),
            average_cost_per_visit: *cost,
            accepting_new_patients: true,
            slots: (0..*slots)
                .map(|index| AppointmentSlot {
                    starts_at: now + Duration::hours(8 * i64::from(index) + 2),
                    duration_minutes: 30,
                })
                .collect(),
        })
        .collect()
}

/// Deterministic beneficiary variety for demos; `index` picks needs, language and history.
pub(crate) fn demo_profile(id: &str, index: usize) -> BeneficiaryProfile {
    let needs: [&[&str]; 4] = [&["cardiology"], &["diabetes"], &["oncology"], &["mental_health"]];
    let languages = ["pt", "en", "es"];

    let mut profile = BeneficiaryProfile::new(BeneficiaryId(id.to_string()));
    profile.required_specializations = set(needs[index % needs.len()]);
    profile.preferred_language = Some(languages[index % languages.len()].to_string());
    profile.location = Some(Location {
        latitude: PAULISTA.latitude + (index % 5) as f64 * 0.01,
        longitude: PAULISTA.longitude,
    });
    profile.demographics.birth_date = NaiveDate::from_ymd_opt(1950 + (index % 45) as i32, 6, 15);
    profile.clinical.medication_count = (index % 6) as u32;
    profile.clinical.er_visits_last_year = (index % 4) as u32;
    if index % 3 == 0 {
        profile.behavior.smoking = SmokingStatus::Current;
    }
    profile
}

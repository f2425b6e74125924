use super::common::*;
use crate::matching::repository::{CaseLedger, WorkloadTracker};
use crate::matching::{
    InMemoryWorkloadTracker, MatchingError, NavigatorMatcher, NavigatorWeights, RepositoryError,
    ScoringError,
};
use crate::risk::ProfileError;
use std::sync::{Arc, Barrier};
use std::thread;

#[test]
fn empty_pool_fails_without_touching_counters() {
    let (matcher, workload, ledger) = build_matcher(Vec::new());

    let error = matcher
        .assign(&ben_id("ben-1"), &profile("ben-1"))
        .expect_err("no navigators");

    assert!(matches!(error, MatchingError::NoCandidates { .. }));
    assert_eq!(workload.snapshot(&[nav_id("nav-a")]).expect("snapshot")[&nav_id("nav-a")], 0);
    assert!(ledger.case("ben-1").is_none());
}

#[test]
fn inactive_navigators_are_never_assigned() {
    let mut idle = navigator("nav-a", &["cardiology"], &["pt"], 1.0);
    idle.active = false;
    let (matcher, _, _) = build_matcher(vec![idle]);

    assert!(matches!(
        matcher.assign(&ben_id("ben-1"), &profile("ben-1")),
        Err(MatchingError::NoCandidates { .. })
    ));
}

#[test]
fn best_match_is_counted_and_recorded() {
    let (matcher, workload, ledger) = build_matcher(cardiology_team());

    let assignment = matcher
        .assign(&ben_id("ben-1"), &profile("ben-1"))
        .expect("assignment succeeds");

    assert_eq!(assignment.navigator_id, nav_id("nav-a"));
    assert!((assignment.match_score - 0.92).abs() < 1e-9);
    assert_eq!(
        assignment.match_reasons,
        vec![
            "Specialization match",
            "Speaks preferred language",
            "Available capacity",
            "High performance"
        ]
    );
    assert!(assignment.previous_navigator_id.is_none());
    assert_eq!(workload.current_workload(&nav_id("nav-a")).expect("reads"), 1);
    assert_eq!(workload.current_workload(&nav_id("nav-b")).expect("reads"), 0);

    let case = ledger.case("ben-1").expect("case recorded");
    assert_eq!(case.navigator_id, nav_id("nav-a"));
    assert_eq!(case.profile, profile("ben-1"));
}

#[test]
fn ranking_is_deterministic_and_breaks_ties_by_id() {
    let team = vec![
        navigator("nav-c", &["cardiology"], &["pt"], 0.8),
        navigator("nav-a", &["cardiology"], &["pt"], 0.8),
        navigator("nav-b", &["cardiology"], &["pt"], 0.8),
    ];
    let (matcher, _, _) = build_matcher(team);

    let first = matcher.rank(&profile("ben-1")).expect("ranks");
    let second = matcher.rank(&profile("ben-1")).expect("ranks");

    let order: Vec<String> = first.iter().map(|m| m.candidate.id.0.clone()).collect();
    assert_eq!(order, vec!["nav-a", "nav-b", "nav-c"]);
    assert_eq!(first, second);
    assert!(first.iter().all(|m| (0.0..=1.0).contains(&m.score)));
}

#[test]
fn concurrent_assignments_to_one_navigator_are_all_counted() {
    let (matcher, workload, _) = build_matcher(vec![navigator("nav-a", &[], &[], 0.9)]);
    let matcher = Arc::new(matcher);

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let matcher = Arc::clone(&matcher);
            thread::spawn(move || {
                for index in 0..25 {
                    let id = format!("ben-{worker}-{index}");
                    matcher
                        .assign(&ben_id(&id), &profile(&id))
                        .expect("assignment succeeds");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("worker joins");
    }

    assert_eq!(workload.current_workload(&nav_id("nav-a")).expect("reads"), 200);
}

#[test]
fn second_assignment_of_a_beneficiary_is_rejected() {
    let (matcher, workload, ledger) = build_matcher(cardiology_team());
    let first = matcher
        .assign(&ben_id("ben-1"), &profile("ben-1"))
        .expect("assignment succeeds");

    let error = matcher
        .assign(&ben_id("ben-1"), &profile("ben-1"))
        .expect_err("beneficiary already has a navigator");

    assert!(matches!(
        error,
        MatchingError::AlreadyAssigned { ref navigator_id, .. } if *navigator_id == nav_id("nav-a")
    ));
    let counts = workload
        .snapshot(&[nav_id("nav-a"), nav_id("nav-b")])
        .expect("snapshot");
    assert_eq!(counts.values().sum::<u32>(), 1);
    assert_eq!(counts[&nav_id("nav-a")], 1);
    let case = ledger.case("ben-1").expect("case kept");
    assert_eq!(case.navigator_id, first.navigator_id);
    assert_eq!(case.assigned_at, first.assigned_at);
}

#[test]
fn profile_for_another_beneficiary_is_rejected() {
    let (matcher, workload, ledger) = build_matcher(cardiology_team());

    let error = matcher
        .assign(&ben_id("ben-1"), &profile("ben-2"))
        .expect_err("profile belongs to someone else");

    assert!(matches!(
        error,
        MatchingError::InvalidProfile(ProfileError::BeneficiaryMismatch { ref expected, ref found })
            if *expected == ben_id("ben-1") && *found == ben_id("ben-2")
    ));
    assert_eq!(workload.current_workload(&nav_id("nav-a")).expect("reads"), 0);
    assert!(ledger.case("ben-1").is_none());
    assert!(ledger.case("ben-2").is_none());
}

#[test]
fn racing_moves_of_one_case_transfer_it_once() {
    let mut team = vec![navigator("nav-a", &["cardiology"], &["pt"], 0.9)];
    team.push(navigator("nav-b", &["cardiology"], &["pt"], 0.9));
    team.push(navigator("nav-c", &["cardiology"], &["pt"], 0.9));
    let workload = Arc::new(InMemoryWorkloadTracker::with_counts([(nav_id("nav-a"), 1)]));
    let ledger = Arc::new(SlowLedger::default());
    ledger
        .record(case_for("ben-00", "nav-a", 5))
        .expect("memory ledger accepts writes");
    let matcher = Arc::new(
        NavigatorMatcher::new(
            Arc::new(MemoryCandidates::with_navigators(team)),
            workload.clone(),
            ledger.clone(),
            &NavigatorWeights::default(),
        )
        .expect("default weights are valid"),
    );
    let start = Arc::new(Barrier::new(2));

    let handles: Vec<_> = ["nav-b", "nav-c"]
        .into_iter()
        .map(|target| {
            let matcher = Arc::clone(&matcher);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                matcher.reassign_to(&ben_id("ben-00"), &nav_id("nav-a"), &nav_id(target), "QUALITY")
            })
        })
        .collect();
    let outcomes: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().expect("worker joins"))
        .collect();

    let moved: Vec<_> = outcomes.iter().filter_map(|outcome| outcome.as_ref().ok()).collect();
    assert_eq!(moved.len(), 1);
    assert!(outcomes
        .iter()
        .any(|outcome| matches!(outcome, Err(MatchingError::CaseNotHeld { .. }))));

    let counts = workload
        .snapshot(&[nav_id("nav-a"), nav_id("nav-b"), nav_id("nav-c")])
        .expect("snapshot");
    assert_eq!(counts.values().sum::<u32>(), 1);
    assert_eq!(counts[&nav_id("nav-a")], 0);
    assert_eq!(counts[&moved[0].navigator_id], 1);
    let case = ledger
        .find(&ben_id("ben-00"))
        .expect("ledger reads")
        .expect("case kept");
    assert_eq!(case.navigator_id, moved[0].navigator_id);
}

#[test]
fn reassign_moves_the_case_and_the_count() {
    let (matcher, workload, ledger) = build_matcher(cardiology_team());
    matcher
        .assign(&ben_id("ben-1"), &profile("ben-1"))
        .expect("assignment succeeds");

    let moved = matcher
        .reassign(&ben_id("ben-1"), &nav_id("nav-a"), "BENEFICIARY_REQUEST")
        .expect("reassignment succeeds");

    assert_eq!(moved.navigator_id, nav_id("nav-b"));
    assert_eq!(moved.previous_navigator_id, Some(nav_id("nav-a")));
    assert_eq!(moved.reassignment_reason.as_deref(), Some("BENEFICIARY_REQUEST"));
    assert_eq!(workload.current_workload(&nav_id("nav-a")).expect("reads"), 0);
    assert_eq!(workload.current_workload(&nav_id("nav-b")).expect("reads"), 1);
    assert_eq!(
        ledger.case("ben-1").expect("case kept").navigator_id,
        nav_id("nav-b")
    );
}

#[test]
fn reassign_without_alternatives_keeps_the_case() {
    let (matcher, workload, ledger) = build_matcher(vec![navigator("nav-a", &[], &[], 0.9)]);
    matcher
        .assign(&ben_id("ben-1"), &profile("ben-1"))
        .expect("assignment succeeds");

    let error = matcher
        .reassign(&ben_id("ben-1"), &nav_id("nav-a"), "QUALITY")
        .expect_err("nobody else to take the case");

    assert!(matches!(error, MatchingError::NoCandidates { .. }));
    assert_eq!(workload.current_workload(&nav_id("nav-a")).expect("reads"), 1);
    assert_eq!(ledger.case("ben-1").expect("case kept").navigator_id, nav_id("nav-a"));
}

#[test]
fn reassign_checks_the_ledger() {
    let (matcher, _, _) = build_matcher(cardiology_team());

    assert!(matches!(
        matcher.reassign(&ben_id("ghost"), &nav_id("nav-a"), "QUALITY"),
        Err(MatchingError::CaseNotFound(id)) if id == ben_id("ghost")
    ));

    matcher
        .assign(&ben_id("ben-1"), &profile("ben-1"))
        .expect("assignment succeeds");
    assert!(matches!(
        matcher.reassign(&ben_id("ben-1"), &nav_id("nav-b"), "QUALITY"),
        Err(MatchingError::CaseNotHeld { .. })
    ));
}

#[test]
fn reassign_to_targets_one_navigator() {
    let mut team = cardiology_team();
    team.push(navigator("nav-c", &["cardiology"], &["pt"], 0.99));
    let (matcher, workload, _) = build_matcher(team);
    let first = matcher
        .assign(&ben_id("ben-1"), &profile("ben-1"))
        .expect("assignment succeeds");
    assert_eq!(first.navigator_id, nav_id("nav-c"));

    let moved = matcher
        .reassign_to(&ben_id("ben-1"), &nav_id("nav-c"), &nav_id("nav-b"), "WORKLOAD_BALANCING")
        .expect("targeted move succeeds");

    assert_eq!(moved.navigator_id, nav_id("nav-b"));
    assert_eq!(workload.current_workload(&nav_id("nav-b")).expect("reads"), 1);
    assert_eq!(workload.current_workload(&nav_id("nav-c")).expect("reads"), 0);
}

#[test]
fn ledger_failure_rolls_back_the_increment() {
    let workload = Arc::new(InMemoryWorkloadTracker::default());
    let matcher = NavigatorMatcher::new(
        Arc::new(MemoryCandidates::with_navigators(cardiology_team())),
        workload.clone(),
        Arc::new(ReadOnlyLedger::default()),
        &NavigatorWeights::default(),
    )
    .expect("default weights are valid");

    let error = matcher
        .assign(&ben_id("ben-1"), &profile("ben-1"))
        .expect_err("ledger rejects writes");

    assert!(matches!(
        error,
        MatchingError::Repository(RepositoryError::Unavailable(_))
    ));
    assert_eq!(workload.current_workload(&nav_id("nav-a")).expect("reads"), 0);
}

#[test]
fn ledger_failure_rolls_back_a_transfer() {
    let workload = Arc::new(InMemoryWorkloadTracker::with_counts([(nav_id("nav-a"), 1)]));
    let ledger = ReadOnlyLedger::default();
    ledger
        .inner
        .record(case_for("ben-1", "nav-a", 5))
        .expect("memory ledger accepts writes");
    let matcher = NavigatorMatcher::new(
        Arc::new(MemoryCandidates::with_navigators(cardiology_team())),
        workload.clone(),
        Arc::new(ledger),
        &NavigatorWeights::default(),
    )
    .expect("default weights are valid");

    assert!(matcher
        .reassign(&ben_id("ben-1"), &nav_id("nav-a"), "QUALITY")
        .is_err());
    assert_eq!(workload.current_workload(&nav_id("nav-a")).expect("reads"), 1);
    assert_eq!(workload.current_workload(&nav_id("nav-b")).expect("reads"), 0);
}

#[test]
fn out_of_range_performance_is_reported() {
    let (matcher, workload, _) = build_matcher(vec![navigator("nav-a", &[], &[], 1.7)]);

    let error = matcher
        .assign(&ben_id("ben-1"), &profile("ben-1"))
        .expect_err("performance outside [0, 1]");

    assert!(matches!(
        error,
        MatchingError::Scoring(ScoringError::OutOfRange { criterion: "performance", .. })
    ));
    assert_eq!(workload.current_workload(&nav_id("nav-a")).expect("reads"), 0);
}

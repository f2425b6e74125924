use crate::infra::{demo_profile, demo_service, service_with_backlog, DEMO_NETWORK_ID, PAULISTA};
use care_navigation::beneficiary::BeneficiaryId;
use care_navigation::config::AppConfig;
use care_navigation::error::AppError;
use care_navigation::matching::{
    MatchingError, PlanDetails, RebalancingResult, WorkloadDistribution,
};
use clap::Args;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Number of sample beneficiaries to score and assign.
    #[arg(long, default_value_t = 8)]
    pub(crate) beneficiaries: usize,
    /// Specialization used for the provider ranking portion of the demo.
    #[arg(long, default_value = "cardiology")]
    pub(crate) specialization: String,
    /// Skip the provider ranking portion of the demo.
    #[arg(long)]
    pub(crate) skip_providers: bool,
}

#[derive(Args, Debug)]
pub(crate) struct RebalanceArgs {
    /// Cases preloaded onto the first navigator before the pass runs.
    #[arg(long, default_value_t = 12)]
    pub(crate) backlog: u32,
    /// Print the pass result as JSON instead of a table.
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let service = demo_service(&config.matching)?;

    println!("Care navigation demo");
    println!("Assigning {} sample beneficiaries\n", args.beneficiaries);

    for index in 0..args.beneficiaries {
        let id = format!("ben-{:03}", index + 1);
        let profile = demo_profile(&id, index);

        match service.score_risk(&profile) {
            Ok(score) => {
                println!(
                    "{id}: risk {} ({:.1}) with {} factor(s)",
                    score.risk_level.label(),
                    score.total_score,
                    score.factors.len()
                );
                for factor in &score.factors {
                    println!(
                        "    - {} [{:?}] {}",
                        factor.code, factor.severity, factor.description
                    );
                }
            }
            Err(err) => println!("{id}: risk unavailable: {err}"),
        }

        match service.assign_navigator(&BeneficiaryId(id.clone()), &profile) {
            Ok(assignment) => println!(
                "    navigator {} (score {:.2}): {}",
                assignment.navigator_name,
                assignment.match_score,
                assignment.match_reasons.join(", ")
            ),
            Err(MatchingError::NoCandidates { pool }) => {
                println!("    no {pool} available");
            }
            Err(err) => return Err(err.into()),
        }
    }

    if !args.skip_providers {
        let plan = PlanDetails {
            network_id: DEMO_NETWORK_ID.to_string(),
            network_name: Some("Essencial".to_string()),
            max_allowed_cost: 300.0,
        };
        let ranking = service.rank_providers(&args.specialization, PAULISTA, plan)?;

        println!(
            "\nProvider ranking for {} ({} found)",
            ranking.specialization, ranking.total_found
        );
        if ranking.is_empty() {
            println!("  no providers in network {}", ranking.network_id);
        }
        for (position, entry) in ranking.recommended.iter().enumerate() {
            let next_slot = entry
                .next_available_slot
                .map(|slot| slot.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "none".to_string());
            println!(
                "  {}. {} score {:.2}, {:.1} km, next slot {}",
                position + 1,
                entry.provider.name,
                entry.score,
                entry.distance_km,
                next_slot
            );
            if !entry.reasons.is_empty() {
                println!("     {}", entry.reasons.join(", "));
            }
        }
    }

    let result = service.rebalance()?;
    println!();
    render_rebalance(&result);
    render_distribution(&service.workload_distribution()?);
    Ok(())
}

pub(crate) fn run_rebalance(args: RebalanceArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let service = service_with_backlog(&config.matching, args.backlog)?;

    let before = service.workload_distribution()?;
    let result = service.rebalance()?;

    if args.json {
        match serde_json::to_string_pretty(&result) {
            Ok(json) => println!("{json}"),
            Err(err) => println!("rebalancing result unavailable: {err}"),
        }
        return Ok(());
    }

    println!("Before rebalancing");
    render_distribution(&before);
    println!();
    render_rebalance(&result);
    render_distribution(&service.workload_distribution()?);
    Ok(())
}

fn render_rebalance(result: &RebalancingResult) {
    println!(
        "Rebalancing pass: {} moved, {} failed, average {:.2} -> {:.2}",
        result.reassigned_cases,
        result.failed_reassignments,
        result.previous_average,
        result.new_average
    );
    for case in &result.moves {
        println!("  {} : {} -> {}", case.beneficiary_id, case.from, case.to);
    }
}

fn render_distribution(distribution: &WorkloadDistribution) {
    println!(
        "Workload ({} cases, {:.2} per navigator)",
        distribution.total_cases, distribution.average_cases_per_navigator
    );
    for load in &distribution.navigators {
        println!(
            "  {:<12} {:>3}/{:<3} {:>5.1}%{}",
            load.navigator_id.to_string(),
            load.workload,
            load.max_caseload,
            load.utilization() * 100.0,
            if load.active { "" } else { " (inactive)" }
        );
    }
}

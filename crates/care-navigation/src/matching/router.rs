use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;

use crate::beneficiary::BeneficiaryProfile;

use super::domain::{
    AssignmentRequest, ProviderId, ProviderSearchRequest, ReassignmentRequest, SlotWindowRequest,
};
use super::error::MatchingError;
use super::repository::{CandidateRepository, CaseLedger, WorkloadTracker};
use super::service::CareNavigationService;

/// Router exposing risk scoring, navigator assignment, provider ranking, and workload endpoints.
pub fn navigation_router<R, W, L>(service: Arc<CareNavigationService<R, W, L>>) -> Router
where
    R: CandidateRepository + 'static,
    W: WorkloadTracker + 'static,
    L: CaseLedger + 'static,
{
    Router::new()
        .route("/api/v1/risk/score", post(risk_handler::<R, W, L>))
        .route(
            "/api/v1/navigators/assignments",
            post(assign_handler::<R, W, L>),
        )
        .route(
            "/api/v1/navigators/reassignments",
            post(reassign_handler::<R, W, L>),
        )
        .route(
            "/api/v1/navigators/workload",
            get(workload_handler::<R, W, L>),
        )
        .route(
            "/api/v1/navigators/rebalance",
            post(rebalance_handler::<R, W, L>),
        )
        .route(
            "/api/v1/providers/rankings",
            post(providers_handler::<R, W, L>),
        )
        .route(
            "/api/v1/providers/:provider_id",
            get(provider_details_handler::<R, W, L>),
        )
        .route(
            "/api/v1/providers/:provider_id/slots",
            post(provider_slots_handler::<R, W, L>),
        )
        .with_state(service)
}

type SharedService<R, W, L> = State<Arc<CareNavigationService<R, W, L>>>;

pub(crate) async fn risk_handler<R, W, L>(
    State(service): SharedService<R, W, L>,
    Json(profile): Json<BeneficiaryProfile>,
) -> Response
where
    R: CandidateRepository + 'static,
    W: WorkloadTracker + 'static,
    L: CaseLedger + 'static,
{
    respond(service.score_risk(&profile), StatusCode::OK)
}

pub(crate) async fn assign_handler<R, W, L>(
    State(service): SharedService<R, W, L>,
    Json(request): Json<AssignmentRequest>,
) -> Response
where
    R: CandidateRepository + 'static,
    W: WorkloadTracker + 'static,
    L: CaseLedger + 'static,
{
    respond(
        service.assign_navigator(&request.beneficiary_id, &request.profile),
        StatusCode::CREATED,
    )
}

pub(crate) async fn reassign_handler<R, W, L>(
    State(service): SharedService<R, W, L>,
    Json(request): Json<ReassignmentRequest>,
) -> Response
where
    R: CandidateRepository + 'static,
    W: WorkloadTracker + 'static,
    L: CaseLedger + 'static,
{
    respond(
        service.reassign_navigator(
            &request.beneficiary_id,
            &request.current_navigator_id,
            &request.reason,
        ),
        StatusCode::OK,
    )
}

pub(crate) async fn workload_handler<R, W, L>(State(service): SharedService<R, W, L>) -> Response
where
    R: CandidateRepository + 'static,
    W: WorkloadTracker + 'static,
    L: CaseLedger + 'static,
{
    respond(service.workload_distribution(), StatusCode::OK)
}

pub(crate) async fn rebalance_handler<R, W, L>(State(service): SharedService<R, W, L>) -> Response
where
    R: CandidateRepository + 'static,
    W: WorkloadTracker + 'static,
    L: CaseLedger + 'static,
{
    match tokio::task::spawn_blocking(move || service.rebalance()).await {
        Ok(result) => respond(result, StatusCode::OK),
        Err(error) => {
            tracing::error!(%error, "rebalancing task aborted");
            let payload = json!({
                "error": "rebalancing task aborted",
            });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
        }
    }
}

pub(crate) async fn providers_handler<R, W, L>(
    State(service): SharedService<R, W, L>,
    Json(request): Json<ProviderSearchRequest>,
) -> Response
where
    R: CandidateRepository + 'static,
    W: WorkloadTracker + 'static,
    L: CaseLedger + 'static,
{
    respond(
        service.rank_providers(&request.specialization, request.location, request.plan),
        StatusCode::OK,
    )
}

pub(crate) async fn provider_details_handler<R, W, L>(
    State(service): SharedService<R, W, L>,
    Path(provider_id): Path<String>,
) -> Response
where
    R: CandidateRepository + 'static,
    W: WorkloadTracker + 'static,
    L: CaseLedger + 'static,
{
    respond(
        service.provider_details(&ProviderId(provider_id)),
        StatusCode::OK,
    )
}

pub(crate) async fn provider_slots_handler<R, W, L>(
    State(service): SharedService<R, W, L>,
    Path(provider_id): Path<String>,
    Json(window): Json<SlotWindowRequest>,
) -> Response
where
    R: CandidateRepository + 'static,
    W: WorkloadTracker + 'static,
    L: CaseLedger + 'static,
{
    respond(
        service.available_slots(&ProviderId(provider_id), window.from, window.to),
        StatusCode::OK,
    )
}

fn respond<T: Serialize>(result: Result<T, MatchingError>, success: StatusCode) -> Response {
    match result {
        Ok(body) => (success, Json(body)).into_response(),
        Err(error) => {
            let status = status_for(&error);
            if status.is_server_error() {
                tracing::error!(%error, "navigation request failed");
            }
            let payload = json!({
                "error": error.to_string(),
            });
            (status, Json(payload)).into_response()
        }
    }
}

pub(crate) fn status_for(error: &MatchingError) -> StatusCode {
    match error {
        MatchingError::NoCandidates { .. } => StatusCode::SERVICE_UNAVAILABLE,
        MatchingError::InvalidProfile(_) => StatusCode::UNPROCESSABLE_ENTITY,
        MatchingError::CaseNotFound(_) => StatusCode::NOT_FOUND,
        MatchingError::CaseNotHeld { .. } | MatchingError::AlreadyAssigned { .. } => {
            StatusCode::CONFLICT
        }
        MatchingError::ProviderNotFound(_) => StatusCode::NOT_FOUND,
        MatchingError::InvalidSlotWindow { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        MatchingError::Repository(_) | MatchingError::Scoring(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

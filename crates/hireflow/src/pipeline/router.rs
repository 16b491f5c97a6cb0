use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::analytics::PipelineAnalytics;
use super::domain::{Action, CandidateId};
use super::repository::{AuditLog, CandidateStore};
use super::service::{ActionRequest, PipelineError, PipelineService};

/// Shared handler state: executor, read-only analytics, and the bottleneck
/// threshold used when a request does not override it.
pub struct PipelineRouterState<S, L> {
    pub service: Arc<PipelineService<S, L>>,
    pub analytics: Arc<PipelineAnalytics<S, L>>,
    pub default_threshold: f64,
}

impl<S, L> Clone for PipelineRouterState<S, L> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            analytics: Arc::clone(&self.analytics),
            default_threshold: self.default_threshold,
        }
    }
}

/// Router builder exposing the pipeline operation set over HTTP.
pub fn pipeline_router<S, L>(
    service: Arc<PipelineService<S, L>>,
    analytics: Arc<PipelineAnalytics<S, L>>,
    default_threshold: f64,
) -> Router
where
    S: CandidateStore + 'static,
    L: AuditLog + 'static,
{
    let state = PipelineRouterState {
        service,
        analytics,
        default_threshold,
    };
    Router::new()
        .route("/api/v1/pipeline/candidates", post(register_handler::<S, L>))
        .route(
            "/api/v1/pipeline/candidates/:candidate_id/actions",
            get(actions_handler::<S, L>).post(perform_handler::<S, L>),
        )
        .route(
            "/api/v1/pipeline/candidates/:candidate_id/history",
            get(history_handler::<S, L>),
        )
        .route(
            "/api/v1/pipeline/analytics/stages",
            get(stage_summary_handler::<S, L>),
        )
        .route(
            "/api/v1/pipeline/analytics/conversion",
            get(conversion_handler::<S, L>),
        )
        .route(
            "/api/v1/pipeline/analytics/bottlenecks",
            get(bottlenecks_handler::<S, L>),
        )
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub(crate) struct RegisterRequest {
    pub(crate) candidate_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PerformRequest {
    pub(crate) action: String,
    pub(crate) performed_by: String,
    #[serde(default)]
    pub(crate) notes: Option<String>,
    #[serde(default)]
    pub(crate) metadata: BTreeMap<String, String>,
    #[serde(default)]
    pub(crate) idempotency_key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BottleneckQuery {
    pub(crate) threshold: Option<f64>,
}

pub(crate) async fn register_handler<S, L>(
    State(state): State<PipelineRouterState<S, L>>,
    axum::Json(payload): axum::Json<RegisterRequest>,
) -> Response
where
    S: CandidateStore + 'static,
    L: AuditLog + 'static,
{
    match state.service.register(CandidateId(payload.candidate_id)) {
        Ok(candidate) => (StatusCode::CREATED, axum::Json(candidate)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn actions_handler<S, L>(
    State(state): State<PipelineRouterState<S, L>>,
    Path(candidate_id): Path<String>,
) -> Response
where
    S: CandidateStore + 'static,
    L: AuditLog + 'static,
{
    let id = CandidateId(candidate_id);
    match state.service.available_actions(&id) {
        Ok((stage, actions)) => {
            let payload = json!({
                "candidate_id": id.0,
                "stage": stage,
                "stage_label": stage.label(),
                "available_actions": actions,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn perform_handler<S, L>(
    State(state): State<PipelineRouterState<S, L>>,
    Path(candidate_id): Path<String>,
    axum::Json(payload): axum::Json<PerformRequest>,
) -> Response
where
    S: CandidateStore + 'static,
    L: AuditLog + 'static,
{
    // Alias spellings are resolved here, once, at the transport boundary.
    let Some(action) = Action::parse(&payload.action) else {
        let body = json!({
            "error": format!("unknown action '{}'", payload.action),
        });
        return (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(body)).into_response();
    };

    let request = ActionRequest {
        candidate_id: CandidateId(candidate_id),
        action,
        performed_by: payload.performed_by,
        notes: payload.notes,
        metadata: payload.metadata,
        idempotency_key: payload.idempotency_key,
    };

    match state.service.perform_action(request) {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn history_handler<S, L>(
    State(state): State<PipelineRouterState<S, L>>,
    Path(candidate_id): Path<String>,
) -> Response
where
    S: CandidateStore + 'static,
    L: AuditLog + 'static,
{
    let id = CandidateId(candidate_id);
    match state.service.history(&id) {
        Ok(records) => {
            let payload = json!({
                "candidate_id": id.0,
                "records": records,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn stage_summary_handler<S, L>(
    State(state): State<PipelineRouterState<S, L>>,
) -> Response
where
    S: CandidateStore + 'static,
    L: AuditLog + 'static,
{
    match state.analytics.stage_summary() {
        Ok(summary) => (StatusCode::OK, axum::Json(summary)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn conversion_handler<S, L>(
    State(state): State<PipelineRouterState<S, L>>,
) -> Response
where
    S: CandidateStore + 'static,
    L: AuditLog + 'static,
{
    match state.analytics.conversion_rates() {
        Ok(rates) => (StatusCode::OK, axum::Json(rates)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn bottlenecks_handler<S, L>(
    State(state): State<PipelineRouterState<S, L>>,
    Query(query): Query<BottleneckQuery>,
) -> Response
where
    S: CandidateStore + 'static,
    L: AuditLog + 'static,
{
    let threshold = query.threshold.unwrap_or(state.default_threshold);
    match state.analytics.bottlenecks(threshold) {
        Ok(flagged) => (StatusCode::OK, axum::Json(flagged)).into_response(),
        Err(error) => error_response(error),
    }
}

fn error_response(error: PipelineError) -> Response {
    match &error {
        PipelineError::NotFound(_) => {
            let payload = json!({ "error": error.to_string() });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        PipelineError::AlreadyRegistered(_) => {
            let payload = json!({ "error": error.to_string() });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
        PipelineError::InvalidTransition {
            stage, available, ..
        } => {
            let payload = json!({
                "error": error.to_string(),
                "stage": stage,
                "legal_actions": available,
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        PipelineError::PartialFailure { .. } => {
            let payload = json!({ "error": error.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
        PipelineError::Store(_) | PipelineError::Audit(_) => {
            let payload = json!({ "error": error.to_string() });
            (StatusCode::SERVICE_UNAVAILABLE, axum::Json(payload)).into_response()
        }
    }
}

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Router,
};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use serde_json::json;

use super::actions::ActionError;
use super::catalog::CatalogError;
use super::domain::{
    ActionItemId, ActionStatus, CompletionEvidence, InstanceId, LocationId, Verdict,
};
use super::lifecycle::LifecycleError;
use super::repository::{
    ActionItemRepository, Directory, EventPublisher, InstanceRepository, RepositoryError,
    TrailSink,
};
use super::schedule::ScheduleSuggestion;
use super::service::{AuditService, RecordResponseRequest, ServiceError};

/// Router builder exposing the engine's HTTP surface.
pub fn audit_router<R, A, D, T, P>(service: Arc<AuditService<R, A, D, T, P>>) -> Router
where
    R: InstanceRepository + 'static,
    A: ActionItemRepository + 'static,
    D: Directory + 'static,
    T: TrailSink + 'static,
    P: EventPublisher + 'static,
{
    Router::new()
        .route("/api/v1/audits/types", get(types_handler::<R, A, D, T, P>))
        .route(
            "/api/v1/audits/locations/:location/schedule",
            get(schedule_handler::<R, A, D, T, P>),
        )
        .route(
            "/api/v1/audits/locations/:location/dashboard",
            get(dashboard_handler::<R, A, D, T, P>),
        )
        .route(
            "/api/v1/audits/locations/:location",
            delete(bulk_delete_handler::<R, A, D, T, P>),
        )
        .route(
            "/api/v1/audits/instances",
            post(accept_handler::<R, A, D, T, P>),
        )
        .route(
            "/api/v1/audits/instances/:instance_id/responses",
            post(response_handler::<R, A, D, T, P>),
        )
        .route(
            "/api/v1/audits/instances/:instance_id/complete",
            post(complete_handler::<R, A, D, T, P>),
        )
        .route(
            "/api/v1/audits/instances/:instance_id/archive",
            post(archive_handler::<R, A, D, T, P>),
        )
        .route(
            "/api/v1/audits/instances/:instance_id/cancel",
            post(cancel_handler::<R, A, D, T, P>),
        )
        .route(
            "/api/v1/audits/actions/overdue",
            get(overdue_handler::<R, A, D, T, P>),
        )
        .route(
            "/api/v1/audits/actions/:action_id/transition",
            post(action_transition_handler::<R, A, D, T, P>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct ScheduleQuery {
    from: Option<NaiveDate>,
    months: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TodayQuery {
    today: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AcceptBody {
    audit_type: String,
    location: String,
    suggested_date: NaiveDate,
    owner: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponseBody {
    question: String,
    verdict: Verdict,
    #[serde(default)]
    note: Option<String>,
    recorded_by: String,
    #[serde(default)]
    recorded_on: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CompleteBody {
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    completed_on: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BulkDeleteBody {
    confirmation_token: String,
    actor: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ActionTransitionBody {
    status: ActionStatus,
    #[serde(default)]
    note: Option<String>,
    #[serde(default)]
    evidence_ref: Option<String>,
    #[serde(default)]
    completed_on: Option<NaiveDate>,
}

async fn types_handler<R, A, D, T, P>(
    State(service): State<Arc<AuditService<R, A, D, T, P>>>,
) -> Response
where
    R: InstanceRepository + 'static,
    A: ActionItemRepository + 'static,
    D: Directory + 'static,
    T: TrailSink + 'static,
    P: EventPublisher + 'static,
{
    (StatusCode::OK, axum::Json(service.catalog().types().to_vec())).into_response()
}

async fn schedule_handler<R, A, D, T, P>(
    State(service): State<Arc<AuditService<R, A, D, T, P>>>,
    Path(location): Path<String>,
    Query(query): Query<ScheduleQuery>,
) -> Response
where
    R: InstanceRepository + 'static,
    A: ActionItemRepository + 'static,
    D: Directory + 'static,
    T: TrailSink + 'static,
    P: EventPublisher + 'static,
{
    let from = query.from.unwrap_or_else(|| Local::now().date_naive());
    match service.preview_schedule(&LocationId(location), from, query.months) {
        Ok(suggestions) => (StatusCode::OK, axum::Json(suggestions)).into_response(),
        Err(error) => error_response(error),
    }
}

async fn accept_handler<R, A, D, T, P>(
    State(service): State<Arc<AuditService<R, A, D, T, P>>>,
    axum::Json(body): axum::Json<AcceptBody>,
) -> Response
where
    R: InstanceRepository + 'static,
    A: ActionItemRepository + 'static,
    D: Directory + 'static,
    T: TrailSink + 'static,
    P: EventPublisher + 'static,
{
    let suggestion = ScheduleSuggestion {
        audit_type: body.audit_type,
        location: LocationId(body.location),
        suggested_date: body.suggested_date,
    };
    match service.accept_suggestion(&suggestion, &body.owner) {
        Ok(report) => (StatusCode::CREATED, axum::Json(report)).into_response(),
        Err(error) => error_response(error),
    }
}

async fn response_handler<R, A, D, T, P>(
    State(service): State<Arc<AuditService<R, A, D, T, P>>>,
    Path(instance_id): Path<String>,
    axum::Json(body): axum::Json<ResponseBody>,
) -> Response
where
    R: InstanceRepository + 'static,
    A: ActionItemRepository + 'static,
    D: Directory + 'static,
    T: TrailSink + 'static,
    P: EventPublisher + 'static,
{
    let request = RecordResponseRequest {
        question: body.question,
        verdict: body.verdict,
        note: body.note,
        recorded_by: body.recorded_by,
        recorded_on: body.recorded_on.unwrap_or_else(|| Local::now().date_naive()),
    };
    match service.record_response(&InstanceId(instance_id), request) {
        Ok(instance) => (StatusCode::OK, axum::Json(instance)).into_response(),
        Err(error) => error_response(error),
    }
}

async fn complete_handler<R, A, D, T, P>(
    State(service): State<Arc<AuditService<R, A, D, T, P>>>,
    Path(instance_id): Path<String>,
    axum::Json(body): axum::Json<CompleteBody>,
) -> Response
where
    R: InstanceRepository + 'static,
    A: ActionItemRepository + 'static,
    D: Directory + 'static,
    T: TrailSink + 'static,
    P: EventPublisher + 'static,
{
    let completed_on = body.completed_on.unwrap_or_else(|| Local::now().date_naive());
    match service.complete(&InstanceId(instance_id), body.summary, completed_on) {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(error) => error_response(error),
    }
}

async fn archive_handler<R, A, D, T, P>(
    State(service): State<Arc<AuditService<R, A, D, T, P>>>,
    Path(instance_id): Path<String>,
) -> Response
where
    R: InstanceRepository + 'static,
    A: ActionItemRepository + 'static,
    D: Directory + 'static,
    T: TrailSink + 'static,
    P: EventPublisher + 'static,
{
    match service.archive(&InstanceId(instance_id)) {
        Ok(instance) => (StatusCode::OK, axum::Json(instance)).into_response(),
        Err(error) => error_response(error),
    }
}

async fn cancel_handler<R, A, D, T, P>(
    State(service): State<Arc<AuditService<R, A, D, T, P>>>,
    Path(instance_id): Path<String>,
) -> Response
where
    R: InstanceRepository + 'static,
    A: ActionItemRepository + 'static,
    D: Directory + 'static,
    T: TrailSink + 'static,
    P: EventPublisher + 'static,
{
    match service.cancel(&InstanceId(instance_id)) {
        Ok(instance) => (StatusCode::OK, axum::Json(instance)).into_response(),
        Err(error) => error_response(error),
    }
}

async fn bulk_delete_handler<R, A, D, T, P>(
    State(service): State<Arc<AuditService<R, A, D, T, P>>>,
    Path(location): Path<String>,
    axum::Json(body): axum::Json<BulkDeleteBody>,
) -> Response
where
    R: InstanceRepository + 'static,
    A: ActionItemRepository + 'static,
    D: Directory + 'static,
    T: TrailSink + 'static,
    P: EventPublisher + 'static,
{
    let today = Local::now().date_naive();
    match service.bulk_delete(
        &LocationId(location),
        &body.confirmation_token,
        &body.actor,
        today,
    ) {
        Ok(receipt) => (StatusCode::OK, axum::Json(receipt)).into_response(),
        Err(error) => error_response(error),
    }
}

async fn dashboard_handler<R, A, D, T, P>(
    State(service): State<Arc<AuditService<R, A, D, T, P>>>,
    Path(location): Path<String>,
    Query(query): Query<TodayQuery>,
) -> Response
where
    R: InstanceRepository + 'static,
    A: ActionItemRepository + 'static,
    D: Directory + 'static,
    T: TrailSink + 'static,
    P: EventPublisher + 'static,
{
    let today = query.today.unwrap_or_else(|| Local::now().date_naive());
    match service.location_dashboard(&LocationId(location), today) {
        Ok(dashboard) => (StatusCode::OK, axum::Json(dashboard)).into_response(),
        Err(error) => error_response(error),
    }
}

async fn overdue_handler<R, A, D, T, P>(
    State(service): State<Arc<AuditService<R, A, D, T, P>>>,
    Query(query): Query<TodayQuery>,
) -> Response
where
    R: InstanceRepository + 'static,
    A: ActionItemRepository + 'static,
    D: Directory + 'static,
    T: TrailSink + 'static,
    P: EventPublisher + 'static,
{
    let today = query.today.unwrap_or_else(|| Local::now().date_naive());
    match service.overdue_actions(today) {
        Ok(items) => (StatusCode::OK, axum::Json(items)).into_response(),
        Err(error) => error_response(error),
    }
}

async fn action_transition_handler<R, A, D, T, P>(
    State(service): State<Arc<AuditService<R, A, D, T, P>>>,
    Path(action_id): Path<String>,
    axum::Json(body): axum::Json<ActionTransitionBody>,
) -> Response
where
    R: InstanceRepository + 'static,
    A: ActionItemRepository + 'static,
    D: Directory + 'static,
    T: TrailSink + 'static,
    P: EventPublisher + 'static,
{
    let evidence = body.note.map(|note| CompletionEvidence {
        note,
        evidence_ref: body.evidence_ref,
        completed_on: body.completed_on.unwrap_or_else(|| Local::now().date_naive()),
    });
    match service.transition_action(&ActionItemId(action_id), body.status, evidence) {
        Ok(item) => (StatusCode::OK, axum::Json(item)).into_response(),
        Err(error) => error_response(error),
    }
}

fn error_response(error: ServiceError) -> Response {
    let (status, body) = match &error {
        ServiceError::Lifecycle(LifecycleError::Conflict { existing })
        | ServiceError::Lifecycle(LifecycleError::Repository(RepositoryError::Conflict {
            existing,
        }))
        | ServiceError::Repository(RepositoryError::Conflict { existing }) => (
            StatusCode::CONFLICT,
            json!({ "error": error.to_string(), "conflict_with": existing.0 }),
        ),
        ServiceError::Lifecycle(LifecycleError::Incomplete { missing }) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({ "error": error.to_string(), "missing_questions": missing }),
        ),
        ServiceError::Lifecycle(LifecycleError::InstanceNotFound(_))
        | ServiceError::Lifecycle(LifecycleError::QuestionNotFound { .. })
        | ServiceError::Lifecycle(LifecycleError::Catalog(CatalogError::UnknownAuditType(_)))
        | ServiceError::Catalog(CatalogError::UnknownAuditType(_))
        | ServiceError::Action(ActionError::NotFound(_))
        | ServiceError::Repository(RepositoryError::NotFound) => (
            StatusCode::NOT_FOUND,
            json!({ "error": error.to_string() }),
        ),
        ServiceError::Lifecycle(LifecycleError::InvalidState { .. })
        | ServiceError::Lifecycle(LifecycleError::Validation(_))
        | ServiceError::Action(ActionError::MissingEvidence)
        | ServiceError::Action(ActionError::AlreadyCompleted) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({ "error": error.to_string() }),
        ),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "error": error.to_string() }),
        ),
    };

    (status, axum::Json(body)).into_response()
}

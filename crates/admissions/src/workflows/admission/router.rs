use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use super::audit::AuditLogStore;
use super::domain::{
    Actor, ApplicationId, ApplicationIntake, FeeStructureId, PaymentMode, PaymentProof,
};
use super::lifecycle::{AdmissionError, FeeVerdict};
use super::repository::{ApplicationRepository, RepositoryError};
use super::service::AdmissionService;

/// Router builder exposing the admission workflow over HTTP.
pub fn admission_router<R, L>(service: Arc<AdmissionService<R, L>>) -> Router
where
    R: ApplicationRepository + 'static,
    L: AuditLogStore + 'static,
{
    Router::new()
        .route(
            "/api/v1/admissions/applications",
            post(create_handler::<R, L>),
        )
        .route(
            "/api/v1/admissions/applications/:application_id",
            get(get_handler::<R, L>),
        )
        .route(
            "/api/v1/admissions/applications/:application_id/submit",
            post(submit_handler::<R, L>),
        )
        .route(
            "/api/v1/admissions/applications/:application_id/review",
            post(review_handler::<R, L>),
        )
        .route(
            "/api/v1/admissions/applications/:application_id/verify-docs",
            post(verify_docs_handler::<R, L>),
        )
        .route(
            "/api/v1/admissions/applications/:application_id/billing",
            post(billing_handler::<R, L>),
        )
        .route(
            "/api/v1/admissions/applications/:application_id/payment",
            post(payment_handler::<R, L>),
        )
        .route(
            "/api/v1/admissions/applications/:application_id/verify-fee",
            post(verify_fee_handler::<R, L>),
        )
        .route(
            "/api/v1/admissions/applications/:application_id/recommend",
            post(recommend_handler::<R, L>),
        )
        .route(
            "/api/v1/admissions/applications/:application_id/approve",
            post(approve_handler::<R, L>),
        )
        .route(
            "/api/v1/admissions/applications/:application_id/reject",
            post(reject_handler::<R, L>),
        )
        .route(
            "/api/v1/admissions/applications/:application_id/enrol",
            post(enrol_handler::<R, L>),
        )
        .route(
            "/api/v1/admissions/applications/:application_id/revoke",
            post(revoke_handler::<R, L>),
        )
        .route(
            "/api/v1/admissions/applications/:application_id/audit",
            get(audit_handler::<R, L>),
        )
        .route(
            "/api/v1/admissions/applications/:application_id/aging",
            get(aging_handler::<R, L>),
        )
        .route("/api/v1/admissions/batch", post(batch_handler::<R, L>))
        .route("/api/v1/admissions/funnel", get(funnel_handler::<R, L>))
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct ActionRequest {
    pub(crate) actor: Actor,
    #[serde(default)]
    pub(crate) remarks: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RejectRequest {
    pub(crate) actor: Actor,
    pub(crate) reason: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BillingRequest {
    pub(crate) actor: Actor,
    #[serde(default)]
    pub(crate) selected: Vec<FeeStructureId>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PaymentRequest {
    pub(crate) actor: Actor,
    pub(crate) mode: PaymentMode,
    pub(crate) reference: String,
    #[serde(default)]
    pub(crate) proof: Option<PaymentProof>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct VerifyFeeRequest {
    pub(crate) actor: Actor,
    pub(crate) outcome: FeeVerdict,
    #[serde(default)]
    pub(crate) remarks: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BatchRequest {
    pub(crate) actor: Actor,
    pub(crate) action: String,
    pub(crate) ids: Vec<ApplicationId>,
    #[serde(default)]
    pub(crate) remarks: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AuditQuery {
    #[serde(default)]
    pub(crate) staff: bool,
}

fn error_response(error: AdmissionError) -> Response {
    let status = match &error {
        AdmissionError::InvalidTransition { .. }
        | AdmissionError::Conflict { .. }
        | AdmissionError::BillingLocked(_) => StatusCode::CONFLICT,
        AdmissionError::PermissionDenied { .. } | AdmissionError::NotRecordOwner { .. } => {
            StatusCode::FORBIDDEN
        }
        AdmissionError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AdmissionError::NotFound(_) => StatusCode::NOT_FOUND,
        AdmissionError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        AdmissionError::Repository(RepositoryError::AlreadyExists) => StatusCode::CONFLICT,
        AdmissionError::Repository(_) | AdmissionError::Audit(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        AdmissionError::Collaborator(_) => StatusCode::BAD_GATEWAY,
    };

    let body = axum::Json(json!({ "error": error.to_string() }));
    (status, body).into_response()
}

fn updated(result: Result<super::domain::AdmissionApplication, AdmissionError>) -> Response {
    match result {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn create_handler<R, L>(
    State(service): State<Arc<AdmissionService<R, L>>>,
    axum::Json(intake): axum::Json<ApplicationIntake>,
) -> Response
where
    R: ApplicationRepository + 'static,
    L: AuditLogStore + 'static,
{
    match service.create_draft(intake) {
        Ok(record) => (StatusCode::CREATED, axum::Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn get_handler<R, L>(
    State(service): State<Arc<AdmissionService<R, L>>>,
    Path(application_id): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
    L: AuditLogStore + 'static,
{
    let id = ApplicationId(application_id);
    match service.get(&id) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn submit_handler<R, L>(
    State(service): State<Arc<AdmissionService<R, L>>>,
    Path(application_id): Path<String>,
    axum::Json(request): axum::Json<ActionRequest>,
) -> Response
where
    R: ApplicationRepository + 'static,
    L: AuditLogStore + 'static,
{
    let id = ApplicationId(application_id);
    updated(service.submit(&request.actor, &id))
}

pub(crate) async fn review_handler<R, L>(
    State(service): State<Arc<AdmissionService<R, L>>>,
    Path(application_id): Path<String>,
    axum::Json(request): axum::Json<ActionRequest>,
) -> Response
where
    R: ApplicationRepository + 'static,
    L: AuditLogStore + 'static,
{
    let id = ApplicationId(application_id);
    updated(service.review(&request.actor, &id, request.remarks))
}

pub(crate) async fn verify_docs_handler<R, L>(
    State(service): State<Arc<AdmissionService<R, L>>>,
    Path(application_id): Path<String>,
    axum::Json(request): axum::Json<ActionRequest>,
) -> Response
where
    R: ApplicationRepository + 'static,
    L: AuditLogStore + 'static,
{
    let id = ApplicationId(application_id);
    updated(service.verify_docs(&request.actor, &id, request.remarks))
}

pub(crate) async fn billing_handler<R, L>(
    State(service): State<Arc<AdmissionService<R, L>>>,
    Path(application_id): Path<String>,
    axum::Json(request): axum::Json<BillingRequest>,
) -> Response
where
    R: ApplicationRepository + 'static,
    L: AuditLogStore + 'static,
{
    let id = ApplicationId(application_id);
    updated(service.finalize_billing(&request.actor, &id, &request.selected))
}

pub(crate) async fn payment_handler<R, L>(
    State(service): State<Arc<AdmissionService<R, L>>>,
    Path(application_id): Path<String>,
    axum::Json(request): axum::Json<PaymentRequest>,
) -> Response
where
    R: ApplicationRepository + 'static,
    L: AuditLogStore + 'static,
{
    let id = ApplicationId(application_id);
    updated(service.submit_payment(
        &request.actor,
        &id,
        request.mode,
        request.reference,
        request.proof,
    ))
}

pub(crate) async fn verify_fee_handler<R, L>(
    State(service): State<Arc<AdmissionService<R, L>>>,
    Path(application_id): Path<String>,
    axum::Json(request): axum::Json<VerifyFeeRequest>,
) -> Response
where
    R: ApplicationRepository + 'static,
    L: AuditLogStore + 'static,
{
    let id = ApplicationId(application_id);
    updated(service.verify_fee(&request.actor, &id, request.outcome, request.remarks))
}

pub(crate) async fn recommend_handler<R, L>(
    State(service): State<Arc<AdmissionService<R, L>>>,
    Path(application_id): Path<String>,
    axum::Json(request): axum::Json<ActionRequest>,
) -> Response
where
    R: ApplicationRepository + 'static,
    L: AuditLogStore + 'static,
{
    let id = ApplicationId(application_id);
    updated(service.recommend(&request.actor, &id, request.remarks))
}

pub(crate) async fn approve_handler<R, L>(
    State(service): State<Arc<AdmissionService<R, L>>>,
    Path(application_id): Path<String>,
    axum::Json(request): axum::Json<ActionRequest>,
) -> Response
where
    R: ApplicationRepository + 'static,
    L: AuditLogStore + 'static,
{
    let id = ApplicationId(application_id);
    updated(service.approve(&request.actor, &id, request.remarks))
}

pub(crate) async fn reject_handler<R, L>(
    State(service): State<Arc<AdmissionService<R, L>>>,
    Path(application_id): Path<String>,
    axum::Json(request): axum::Json<RejectRequest>,
) -> Response
where
    R: ApplicationRepository + 'static,
    L: AuditLogStore + 'static,
{
    let id = ApplicationId(application_id);
    updated(service.reject(&request.actor, &id, &request.reason))
}

pub(crate) async fn enrol_handler<R, L>(
    State(service): State<Arc<AdmissionService<R, L>>>,
    Path(application_id): Path<String>,
    axum::Json(request): axum::Json<ActionRequest>,
) -> Response
where
    R: ApplicationRepository + 'static,
    L: AuditLogStore + 'static,
{
    let id = ApplicationId(application_id);
    updated(service.enrol(&request.actor, &id))
}

pub(crate) async fn revoke_handler<R, L>(
    State(service): State<Arc<AdmissionService<R, L>>>,
    Path(application_id): Path<String>,
    axum::Json(request): axum::Json<ActionRequest>,
) -> Response
where
    R: ApplicationRepository + 'static,
    L: AuditLogStore + 'static,
{
    let id = ApplicationId(application_id);
    updated(service.revoke(&request.actor, &id, request.remarks))
}

pub(crate) async fn audit_handler<R, L>(
    State(service): State<Arc<AdmissionService<R, L>>>,
    Path(application_id): Path<String>,
    Query(query): Query<AuditQuery>,
) -> Response
where
    R: ApplicationRepository + 'static,
    L: AuditLogStore + 'static,
{
    let id = ApplicationId(application_id);
    match service.list_audit_log(&id, query.staff) {
        Ok(entries) => (StatusCode::OK, axum::Json(entries)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn aging_handler<R, L>(
    State(service): State<Arc<AdmissionService<R, L>>>,
    Path(application_id): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
    L: AuditLogStore + 'static,
{
    let id = ApplicationId(application_id);
    match service.aging(&id, Utc::now()) {
        Ok(profile) => (StatusCode::OK, axum::Json(profile)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn batch_handler<R, L>(
    State(service): State<Arc<AdmissionService<R, L>>>,
    axum::Json(request): axum::Json<BatchRequest>,
) -> Response
where
    R: ApplicationRepository + 'static,
    L: AuditLogStore + 'static,
{
    match service.batch_apply(
        &request.actor,
        &request.action,
        &request.ids,
        request.remarks,
    ) {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn funnel_handler<R, L>(
    State(service): State<Arc<AdmissionService<R, L>>>,
) -> Response
where
    R: ApplicationRepository + 'static,
    L: AuditLogStore + 'static,
{
    match service.funnel() {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(error) => error_response(error),
    }
}

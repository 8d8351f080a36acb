//! # Governance API
//!
//! Approval history, the feedback log, the review schedule and the
//! hash-chained audit trail.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};

use cgw_governance::{
    ApprovalRecord, AuditEntry, AuditEventKind, FeedbackCategory, FeedbackEntry, ReviewSchedule,
    MAX_FEEDBACK_CHARS,
};

use crate::error::AppError;
use crate::extractors::{extract_json_or_default, extract_validated_json, Validate};
use crate::state::AppState;

const DEFAULT_AUDIT_LIMIT: usize = 100;

// -- DTOs ---------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
pub struct FeedbackRequest {
    pub author: String,
    pub message: String,
    #[serde(default)]
    #[schema(value_type = String, example = "process")]
    pub category: FeedbackCategory,
}

impl Validate for FeedbackRequest {
    fn validate(&self) -> Result<(), String> {
        if self.message.trim().is_empty() {
            return Err("message must not be empty".into());
        }
        if self.message.chars().count() > MAX_FEEDBACK_CHARS {
            return Err(format!("message must be at most {MAX_FEEDBACK_CHARS} characters"));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ScheduleView {
    pub cadence_days: u32,
    pub last_review: NaiveDate,
    pub next_review: NaiveDate,
    pub overdue: bool,
    /// Negative once overdue.
    pub days_until_next: i64,
}

impl ScheduleView {
    fn new(schedule: &ReviewSchedule, today: NaiveDate) -> Self {
        Self {
            cadence_days: schedule.cadence_days,
            last_review: schedule.last_review,
            next_review: schedule.next_review,
            overdue: schedule.is_overdue(today),
            days_until_next: schedule.days_until_next(today),
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CompleteReviewRequest {
    /// Date the review was held. Defaults to today (UTC).
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AuditQuery {
    /// Only entries about this subject.
    pub subject: Option<String>,
    /// Most recent entries to return (default 100).
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuditView {
    /// Whether the retained chain verifies end to end.
    pub verified: bool,
    pub error: Option<String>,
    /// Digest of the newest entry, hex.
    pub head: String,
    pub total: usize,
    #[schema(value_type = Vec<Object>)]
    pub entries: Vec<AuditEntry>,
}

// -- Router -------------------------------------------------------------------

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/governance/approvals", get(list_approvals))
        .route(
            "/v1/governance/feedback",
            get(list_feedback).post(submit_feedback),
        )
        .route("/v1/governance/schedule", get(get_schedule))
        .route("/v1/governance/schedule/complete", post(complete_review))
        .route("/v1/governance/audit", get(get_audit))
}

fn today() -> NaiveDate {
    chrono::Utc::now().date_naive()
}

// -- Handlers -----------------------------------------------------------------

/// GET /v1/governance/approvals: Approval history, newest first.
#[utoipa::path(
    get,
    path = "/v1/governance/approvals",
    responses((status = 200, description = "Approval history")),
    tag = "governance"
)]
async fn list_approvals(State(state): State<AppState>) -> Json<Vec<ApprovalRecord>> {
    Json(state.ledger.lock().history().to_vec())
}

/// GET /v1/governance/feedback: Feedback in submission order.
#[utoipa::path(
    get,
    path = "/v1/governance/feedback",
    responses((status = 200, description = "Feedback log")),
    tag = "governance"
)]
async fn list_feedback(State(state): State<AppState>) -> Json<Vec<FeedbackEntry>> {
    Json(state.feedback.lock().entries().to_vec())
}

/// POST /v1/governance/feedback: Submit feedback.
#[utoipa::path(
    post,
    path = "/v1/governance/feedback",
    request_body = FeedbackRequest,
    responses(
        (status = 201, description = "Feedback recorded"),
        (status = 400, description = "Malformed body", body = crate::error::ErrorBody),
        (status = 422, description = "Empty or oversized field", body = crate::error::ErrorBody),
    ),
    tag = "governance"
)]
async fn submit_feedback(
    State(state): State<AppState>,
    body: Result<Json<FeedbackRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<FeedbackEntry>), AppError> {
    let req = extract_validated_json(body)?;
    let entry = state
        .feedback
        .lock()
        .submit(&req.author, &req.message, req.category)?
        .clone();

    state.record_audit(
        AuditEventKind::FeedbackSubmitted,
        entry.id.to_string(),
        json!({ "author": entry.author, "category": entry.category }),
    );
    Ok((StatusCode::CREATED, Json(entry)))
}

/// GET /v1/governance/schedule: Review cadence and next due date.
#[utoipa::path(
    get,
    path = "/v1/governance/schedule",
    responses((status = 200, description = "Review schedule", body = ScheduleView)),
    tag = "governance"
)]
async fn get_schedule(State(state): State<AppState>) -> Json<ScheduleView> {
    let schedule = *state.schedule.lock();
    Json(ScheduleView::new(&schedule, today()))
}

/// POST /v1/governance/schedule/complete: Record a completed review.
#[utoipa::path(
    post,
    path = "/v1/governance/schedule/complete",
    request_body = CompleteReviewRequest,
    responses(
        (status = 200, description = "Schedule advanced", body = ScheduleView),
        (status = 400, description = "Malformed body", body = crate::error::ErrorBody),
        (status = 422, description = "Date precedes the last review", body = crate::error::ErrorBody),
    ),
    tag = "governance"
)]
async fn complete_review(
    State(state): State<AppState>,
    body: Result<Json<CompleteReviewRequest>, JsonRejection>,
) -> Result<Json<ScheduleView>, AppError> {
    let req = extract_json_or_default(body)?;
    let today = today();
    let on = req.date.unwrap_or(today);

    let schedule = {
        let mut schedule = state.schedule.lock();
        schedule.complete_review(on)?;
        *schedule
    };

    state.record_audit(
        AuditEventKind::ReviewCompleted,
        "governance:review",
        json!({
            "last_review": schedule.last_review.to_string(),
            "next_review": schedule.next_review.to_string(),
        }),
    );
    Ok(Json(ScheduleView::new(&schedule, today)))
}

/// GET /v1/governance/audit: Recent audit entries and chain verification.
#[utoipa::path(
    get,
    path = "/v1/governance/audit",
    params(AuditQuery),
    responses((status = 200, description = "Audit trail", body = AuditView)),
    tag = "governance"
)]
async fn get_audit(
    State(state): State<AppState>,
    Query(query): Query<AuditQuery>,
) -> Json<AuditView> {
    let limit = query.limit.unwrap_or(DEFAULT_AUDIT_LIMIT);
    let trail = state.audit.lock();
    let verification = trail.verify();

    let entries: Vec<AuditEntry> = match query.subject.as_deref() {
        Some(subject) => {
            let matching = trail.entries_for(subject);
            let start = matching.len().saturating_sub(limit);
            matching[start..].iter().map(|e| (*e).clone()).collect()
        }
        None => trail.last_n(limit).to_vec(),
    };

    Json(AuditView {
        verified: verification.is_ok(),
        error: verification.err().map(|e| e.to_string()),
        head: trail.head().to_hex(),
        total: trail.len(),
        entries,
    })
}

//! # Deployment Sessions API
//!
//! One session per deployment walking through the gateway:
//! configure, scan, review, approve. Scans run in a background task that
//! folds scan events into the session as they arrive; clients poll
//! `GET /v1/sessions/{id}` for progress.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::mpsc;
use utoipa::ToSchema;
use uuid::Uuid;

use cgw_core::{
    ApprovalId, ApproverName, DeploymentConfig, DeploymentConfigPatch, DeploymentType, Region,
    RiskTier, ScanId, ScanMode, SessionId, ValidationError,
};
use cgw_governance::{ApprovalRecord, ApprovalStatus, AuditEventKind};
use cgw_scan::{apply_event, event_capacity, ScanError, ScanEvent, Scanner};
use cgw_state::{
    ApprovalReceipt, CheckResult, ScanSummary, ScanTicket, Session, Stage, StageTransition,
};

use crate::error::AppError;
use crate::extractors::{extract_json_or_default, extract_validated_json, Validate};
use crate::middleware::metrics::{APPROVALS_TOTAL, CHECKS_TOTAL, SCANS_STARTED_TOTAL};
use crate::state::AppState;

// -- DTOs ---------------------------------------------------------------------

/// Deployment form fields. Absent fields are left unchanged; an empty
/// string clears a name. Region, deployment type and risk tier are
/// matched case-insensitively.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ConfigRequest {
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub approver_name: Option<String>,
    #[serde(default)]
    #[schema(example = "Production")]
    pub deployment_type: Option<String>,
    #[serde(default)]
    #[schema(example = "Medium")]
    pub risk_tier: Option<String>,
    #[serde(default)]
    #[schema(example = "eu")]
    pub region: Option<String>,
}

impl ConfigRequest {
    /// Parse the enum fields. Unknown values are validation errors (422),
    /// not malformed bodies.
    fn into_patch(self) -> Result<DeploymentConfigPatch, ValidationError> {
        Ok(DeploymentConfigPatch {
            project_name: self.project_name,
            approver_name: self.approver_name,
            deployment_type: self
                .deployment_type
                .as_deref()
                .map(str::parse::<DeploymentType>)
                .transpose()?,
            risk_tier: self.risk_tier.as_deref().map(str::parse::<RiskTier>).transpose()?,
            region: self.region.as_deref().map(str::parse::<Region>).transpose()?,
        })
    }
}

/// Updates must change something; creation accepts an empty form.
impl Validate for ConfigRequest {
    fn validate(&self) -> Result<(), String> {
        let empty = self.project_name.is_none()
            && self.approver_name.is_none()
            && self.deployment_type.is_none()
            && self.risk_tier.is_none()
            && self.region.is_none();
        if empty {
            return Err("at least one configuration field is required".into());
        }
        Ok(())
    }
}

/// Approval request. The approver may be named here instead of on the form.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ApproveRequest {
    #[serde(default)]
    pub approver_name: Option<String>,
}

/// Session as returned by the API.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionView {
    pub id: Uuid,
    /// CONFIG, SCANNING, REVIEW or APPROVED.
    #[schema(value_type = String)]
    pub stage: Stage,
    #[schema(value_type = Object)]
    pub config: DeploymentConfig,
    /// Project name as displayed, with the `api/` prefix.
    pub project_path: Option<String>,
    pub scan_id: Option<Uuid>,
    #[schema(value_type = Option<String>)]
    pub approval_id: Option<ApprovalId>,
    #[schema(value_type = Vec<Object>)]
    pub results: Vec<CheckResult>,
    #[schema(value_type = Object)]
    pub summary: ScanSummary,
    /// Whether `POST /approve` would succeed now.
    pub can_approve: bool,
    #[schema(value_type = Vec<Object>)]
    pub transitions: Vec<StageTransition>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Session> for SessionView {
    fn from(s: &Session) -> Self {
        Self {
            id: *s.id().as_uuid(),
            stage: s.stage(),
            config: s.config().clone(),
            project_path: s.config().project_name.as_ref().map(|p| p.display_path()),
            scan_id: s.scan_id().map(|id| *id.as_uuid()),
            approval_id: s.approval_id().cloned(),
            results: s.results().to_vec(),
            summary: s.summary(),
            can_approve: s.check_approvable().is_ok(),
            transitions: s.transitions().to_vec(),
            created_at: *s.created_at().as_datetime(),
            updated_at: *s.updated_at().as_datetime(),
        }
    }
}

/// Returned when a scan is accepted.
#[derive(Debug, Serialize, ToSchema)]
pub struct ScanAccepted {
    pub session_id: Uuid,
    pub scan_id: Uuid,
    pub checks: usize,
    #[schema(value_type = String)]
    pub mode: ScanMode,
}

/// Returned when a deployment is approved.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApprovalResponse {
    pub approval_id: String,
    #[schema(value_type = Object)]
    pub record: ApprovalRecord,
    pub session: SessionView,
}

// -- Router -------------------------------------------------------------------

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/sessions", post(create_session).get(list_sessions))
        .route("/v1/sessions/{id}", get(get_session))
        .route("/v1/sessions/{id}/config", put(update_config))
        .route("/v1/sessions/{id}/scan", post(start_scan))
        .route("/v1/sessions/{id}/approve", post(approve))
        .route("/v1/sessions/{id}/reset", post(reset))
}

fn not_found(id: SessionId) -> AppError {
    AppError::NotFound(format!("session {id} not found"))
}

// -- Handlers -----------------------------------------------------------------

/// POST /v1/sessions: Create a session, optionally with initial form values.
#[utoipa::path(
    post,
    path = "/v1/sessions",
    request_body = ConfigRequest,
    responses(
        (status = 201, description = "Session created", body = SessionView),
        (status = 400, description = "Malformed body", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid form value", body = crate::error::ErrorBody),
    ),
    tag = "sessions"
)]
async fn create_session(
    State(state): State<AppState>,
    body: Result<Json<ConfigRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SessionView>), AppError> {
    let patch = extract_json_or_default(body)?.into_patch()?;
    let mut session = Session::new(DeploymentConfig::default());
    session.update_config(patch)?;

    let id = session.id();
    let view = SessionView::from(&session);
    state.insert_session(session);

    tracing::info!(session_id = %id, "session created");
    state.record_audit(
        AuditEventKind::SessionCreated,
        id.to_string(),
        json!({ "region": view.config.region.id() }),
    );
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /v1/sessions: List sessions, oldest first.
#[utoipa::path(
    get,
    path = "/v1/sessions",
    responses(
        (status = 200, description = "All sessions", body = Vec<SessionView>),
    ),
    tag = "sessions"
)]
async fn list_sessions(State(state): State<AppState>) -> Json<Vec<SessionView>> {
    let mut sessions = state.sessions.list();
    sessions.sort_by_key(|s| (s.created_at(), s.id()));
    Json(sessions.iter().map(SessionView::from).collect())
}

/// GET /v1/sessions/{id}: Session with results and summary.
#[utoipa::path(
    get,
    path = "/v1/sessions/{id}",
    params(("id" = Uuid, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Session found", body = SessionView),
        (status = 404, description = "Unknown session", body = crate::error::ErrorBody),
    ),
    tag = "sessions"
)]
async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let id = SessionId::from(id);
    let session = state.sessions.get(&id).ok_or_else(|| not_found(id))?;
    Ok(Json(SessionView::from(&session)))
}

/// PUT /v1/sessions/{id}/config: Patch the deployment form.
#[utoipa::path(
    put,
    path = "/v1/sessions/{id}/config",
    params(("id" = Uuid, Path, description = "Session ID")),
    request_body = ConfigRequest,
    responses(
        (status = 200, description = "Form updated", body = SessionView),
        (status = 404, description = "Unknown session", body = crate::error::ErrorBody),
        (status = 409, description = "Form is locked", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid form value", body = crate::error::ErrorBody),
    ),
    tag = "sessions"
)]
async fn update_config(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Json<ConfigRequest>, JsonRejection>,
) -> Result<Json<SessionView>, AppError> {
    let id = SessionId::from(id);
    let patch = extract_validated_json(body)?.into_patch()?;
    let view = state
        .sessions
        .try_update(&id, |s| {
            s.update_config(patch)?;
            Ok::<_, AppError>(SessionView::from(&*s))
        })
        .ok_or_else(|| not_found(id))??;

    state.record_audit(
        AuditEventKind::ConfigUpdated,
        id.to_string(),
        serde_json::to_value(&view.config).unwrap_or_default(),
    );
    Ok(Json(view))
}

/// POST /v1/sessions/{id}/scan: Start the scan in the background.
#[utoipa::path(
    post,
    path = "/v1/sessions/{id}/scan",
    params(("id" = Uuid, Path, description = "Session ID")),
    responses(
        (status = 202, description = "Scan started", body = ScanAccepted),
        (status = 404, description = "Unknown session", body = crate::error::ErrorBody),
        (status = 409, description = "Not in CONFIG", body = crate::error::ErrorBody),
        (status = 422, description = "Project name missing", body = crate::error::ErrorBody),
    ),
    tag = "sessions"
)]
async fn start_scan(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<ScanAccepted>), AppError> {
    let id = SessionId::from(id);
    let ticket = state
        .sessions
        .try_update(&id, |s| s.start_scan())
        .ok_or_else(|| not_found(id))??;

    let settings = &state.config.gateway.scan;
    let scanner = Scanner::simulated(settings, state.next_scan_seed());
    let accepted = ScanAccepted {
        session_id: *id.as_uuid(),
        scan_id: *ticket.scan_id.as_uuid(),
        checks: ticket.plan.len(),
        mode: scanner.mode(),
    };

    metrics::counter!(SCANS_STARTED_TOTAL).increment(1);
    tracing::info!(session_id = %id, scan_id = %ticket.scan_id, checks = accepted.checks, "scan accepted");
    state.record_audit(
        AuditEventKind::ScanStarted,
        id.to_string(),
        json!({ "scan_id": ticket.scan_id.to_string(), "checks": accepted.checks }),
    );

    tokio::spawn(run_scan(state.clone(), id, ticket, scanner));
    Ok((StatusCode::ACCEPTED, Json(accepted)))
}

/// Run a scan and fold its events into the session until the scan ends or
/// the session stops accepting them.
pub(crate) async fn run_scan(
    state: AppState,
    session_id: SessionId,
    ticket: ScanTicket,
    mut scanner: Scanner,
) {
    let scan_id = ticket.scan_id;
    let (tx, mut rx) = mpsc::channel(event_capacity(ticket.plan.len()));
    let runner = tokio::spawn(async move { scanner.run(&ticket, tx).await });

    while let Some(event) = rx.recv().await {
        match state.sessions.try_update(&session_id, |s| apply_event(s, &event)) {
            Some(Ok(completed)) => {
                on_event_applied(&state, session_id, &event);
                if completed && matches!(event, ScanEvent::CheckSettled { .. }) {
                    let summary = state
                        .sessions
                        .get(&session_id)
                        .map(|s| s.summary())
                        .unwrap_or_default();
                    state.record_audit(
                        AuditEventKind::ScanCompleted,
                        session_id.to_string(),
                        json!({
                            "scan_id": scan_id.to_string(),
                            "passed": summary.passed,
                            "failed": summary.failed,
                        }),
                    );
                }
            }
            Some(Err(e)) => {
                tracing::info!(%session_id, %scan_id, error = %e, "scan orphaned; stopping");
                break;
            }
            None => {
                tracing::info!(%session_id, %scan_id, "session gone; stopping scan");
                break;
            }
        }
    }
    // Dropping the receiver cancels a scan that is still running.
    drop(rx);

    match runner.await {
        Ok(Ok(report)) => {
            tracing::debug!(%session_id, %scan_id, passed = report.passed, failed = report.failed, "scan task done");
        }
        Ok(Err(ScanError::Cancelled(_))) => {
            tracing::debug!(%session_id, %scan_id, "scan task cancelled");
        }
        Ok(Err(e)) => tracing::warn!(%session_id, %scan_id, error = %e, "scan task failed"),
        Err(e) => tracing::error!(%session_id, %scan_id, error = %e, "scan task panicked"),
    }
}

fn on_event_applied(state: &AppState, session_id: SessionId, event: &ScanEvent) {
    if let ScanEvent::CheckSettled {
        check_id,
        outcome,
        duration_ms,
        ..
    } = event
    {
        let status = match outcome {
            cgw_scan::CheckOutcome::Passed => "passed",
            cgw_scan::CheckOutcome::Failed => "failed",
        };
        metrics::counter!(CHECKS_TOTAL, "status" => status).increment(1);
        state.record_audit(
            AuditEventKind::CheckSettled,
            session_id.to_string(),
            json!({ "check_id": check_id.as_str(), "status": status, "duration_ms": duration_ms }),
        );
    }
}

/// POST /v1/sessions/{id}/approve: Approve a reviewed deployment.
#[utoipa::path(
    post,
    path = "/v1/sessions/{id}/approve",
    params(("id" = Uuid, Path, description = "Session ID")),
    request_body = ApproveRequest,
    responses(
        (status = 200, description = "Deployment approved", body = ApprovalResponse),
        (status = 404, description = "Unknown session", body = crate::error::ErrorBody),
        (status = 409, description = "Not in REVIEW, or checks failed", body = crate::error::ErrorBody),
        (status = 422, description = "Approver name missing or invalid", body = crate::error::ErrorBody),
    ),
    tag = "sessions"
)]
async fn approve(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Json<ApproveRequest>, JsonRejection>,
) -> Result<Json<ApprovalResponse>, AppError> {
    let id = SessionId::from(id);
    let req = extract_json_or_default(body)?;
    let approver = req
        .approver_name
        .as_deref()
        .map(ApproverName::new)
        .transpose()?;

    // Ledger lock spans id issue, session update and record so the id
    // stays unique.
    let mut ledger = state.ledger.lock();
    let outcome = state
        .sessions
        .try_update(&id, |s| {
            // A refused approval must not leave an approval-time name behind.
            s.check_approvable_as(approver.as_ref())?;
            let approval_id = ledger.issue_id(&mut *state.rng.lock())?;
            if let Some(name) = approver {
                s.set_approver(name)?;
            }
            let receipt = s.approve(approval_id)?;
            Ok::<_, AppError>((receipt, SessionView::from(&*s)))
        })
        .ok_or_else(|| not_found(id))?;

    let (receipt, view) = match outcome {
        Ok(done) => done,
        Err(e) => {
            drop(ledger);
            if matches!(e, AppError::Conflict(_) | AppError::Validation(_)) {
                state.record_audit(
                    AuditEventKind::ApprovalRejected,
                    id.to_string(),
                    json!({ "reason": e.to_string() }),
                );
            }
            return Err(e);
        }
    };

    let record = approval_record(&receipt);
    ledger.record(record.clone())?;
    drop(ledger);

    metrics::counter!(APPROVALS_TOTAL).increment(1);
    state.record_audit(
        AuditEventKind::ApprovalRecorded,
        receipt.approval_id.to_string(),
        json!({
            "session_id": id.to_string(),
            "project": receipt.project.as_str(),
            "approver": receipt.approver.as_str(),
            "checks_passed": receipt.checks_passed,
            "checks_total": receipt.checks_total,
        }),
    );

    Ok(Json(ApprovalResponse {
        approval_id: receipt.approval_id.to_string(),
        record,
        session: view,
    }))
}

fn approval_record(receipt: &ApprovalReceipt) -> ApprovalRecord {
    ApprovalRecord {
        id: receipt.approval_id.clone(),
        project: receipt.project.clone(),
        approver: receipt.approver.clone(),
        region: receipt.region,
        deployment_type: receipt.deployment_type,
        risk_tier: receipt.risk_tier,
        date: receipt.approved_at,
        status: ApprovalStatus::Approved,
        checks_passed: receipt.checks_passed,
        checks_total: receipt.checks_total,
    }
}

/// POST /v1/sessions/{id}/reset: Return to CONFIG, keeping the form.
#[utoipa::path(
    post,
    path = "/v1/sessions/{id}/reset",
    params(("id" = Uuid, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Session reset", body = SessionView),
        (status = 404, description = "Unknown session", body = crate::error::ErrorBody),
    ),
    tag = "sessions"
)]
async fn reset(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let id = SessionId::from(id);
    let (from, orphaned, view) = state
        .sessions
        .try_update(&id, |s| {
            let from = s.stage();
            let orphaned: Option<ScanId> = s.scan_id().filter(|_| from == Stage::Scanning);
            s.reset();
            Ok::<_, AppError>((from, orphaned, SessionView::from(&*s)))
        })
        .ok_or_else(|| not_found(id))??;

    tracing::info!(session_id = %id, %from, "session reset");
    state.record_audit(
        AuditEventKind::SessionReset,
        id.to_string(),
        json!({
            "from": from.as_str(),
            "orphaned_scan": orphaned.map(|s| s.to_string()),
        }),
    );
    Ok(Json(view))
}

//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI 3.1 spec,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Compliance Gateway API",
        version = "0.1.0",
        description = "Pre-deployment compliance gateway: configure a deployment, run the regional check plan, review results and record approvals."
    ),
    paths(
        // Sessions
        crate::routes::sessions::create_session,
        crate::routes::sessions::list_sessions,
        crate::routes::sessions::get_session,
        crate::routes::sessions::update_config,
        crate::routes::sessions::start_scan,
        crate::routes::sessions::approve,
        crate::routes::sessions::reset,
        // Catalog
        crate::routes::catalog::list_regions,
        crate::routes::catalog::list_checks,
        // Governance
        crate::routes::governance::list_approvals,
        crate::routes::governance::list_feedback,
        crate::routes::governance::submit_feedback,
        crate::routes::governance::get_schedule,
        crate::routes::governance::complete_review,
        crate::routes::governance::get_audit,
    ),
    components(schemas(
        // Error types
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        // Session DTOs
        crate::routes::sessions::ConfigRequest,
        crate::routes::sessions::ApproveRequest,
        crate::routes::sessions::SessionView,
        crate::routes::sessions::ScanAccepted,
        crate::routes::sessions::ApprovalResponse,
        // Catalog DTOs
        crate::routes::catalog::RegionView,
        crate::routes::catalog::CheckView,
        crate::routes::catalog::CheckPlanView,
        // Governance DTOs
        crate::routes::governance::FeedbackRequest,
        crate::routes::governance::ScheduleView,
        crate::routes::governance::CompleteReviewRequest,
        crate::routes::governance::AuditView,
    )),
    tags(
        (name = "sessions", description = "Deployment sessions: configure, scan, review, approve"),
        (name = "catalog", description = "Regions and compliance checks"),
        (name = "governance", description = "Approval history, feedback, review schedule and audit trail"),
    )
)]
pub struct ApiDoc;

/// Router serving the OpenAPI document.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

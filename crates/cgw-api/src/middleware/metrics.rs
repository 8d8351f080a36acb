//! # Prometheus Metrics
//!
//! Counters are emitted through the `metrics` facade and rendered by the
//! `metrics-exporter-prometheus` recorder that the binary installs. Without
//! an installed recorder the macros are no-ops and `/metrics` answers 404.

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::error::AppError;
use crate::state::AppState;

pub const HTTP_REQUESTS_TOTAL: &str = "cgw_http_requests_total";
pub const CHECKS_TOTAL: &str = "cgw_checks_total";
pub const APPROVALS_TOTAL: &str = "cgw_approvals_total";
pub const SCANS_STARTED_TOTAL: &str = "cgw_scans_started_total";

/// Install the global Prometheus recorder. Call once per process.
pub fn install_recorder() -> Result<PrometheusHandle, anyhow::Error> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    metrics::describe_counter!(HTTP_REQUESTS_TOTAL, "HTTP requests by method and status");
    metrics::describe_counter!(CHECKS_TOTAL, "Settled compliance checks by outcome");
    metrics::describe_counter!(APPROVALS_TOTAL, "Deployments approved");
    metrics::describe_counter!(SCANS_STARTED_TOTAL, "Compliance scans started");
    Ok(handle)
}

/// Middleware that counts every request by method and status.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let response = next.run(request).await;
    metrics::counter!(
        HTTP_REQUESTS_TOTAL,
        "method" => method,
        "status" => response.status().as_u16().to_string()
    )
    .increment(1);
    response
}

/// GET /metrics: Prometheus text exposition.
pub async fn render(State(state): State<AppState>) -> Result<Response, AppError> {
    let handle = state
        .metrics
        .as_ref()
        .ok_or_else(|| AppError::NotFound("metrics recorder not installed".into()))?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        handle.render(),
    )
        .into_response())
}

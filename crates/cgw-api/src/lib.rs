//! # cgw-api: Axum HTTP Service for the Compliance Gateway
//!
//! Drives deployment sessions through the gateway over HTTP and exposes the
//! governance records kept alongside them.
//!
//! ## API Surface
//!
//! | Prefix                 | Module                   | Domain                  |
//! |------------------------|--------------------------|-------------------------|
//! | `/v1/sessions/*`       | [`routes::sessions`]     | Deployment wizard       |
//! | `/v1/catalog/*`        | [`routes::catalog`]      | Regions and checks      |
//! | `/v1/governance/*`     | [`routes::governance`]   | Approvals, feedback, audit |
//! | `/metrics`             | [`middleware::metrics`]  | Prometheus exposition   |
//! | `/openapi.json`        | [`openapi`]              | OpenAPI document        |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → Handler
//! ```

pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

pub use error::AppError;
pub use state::{AppConfig, AppState};

use axum::middleware::from_fn;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

/// Assemble the full application router with all routes and middleware.
///
/// Health probes (`/health/*`) sit outside the middleware stack.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::sessions::router())
        .merge(routes::catalog::router())
        .merge(routes::governance::router())
        .merge(openapi::router())
        .route("/metrics", get(middleware::metrics::render))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let health = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness));

    Router::new().merge(health).merge(api)
}

/// Liveness probe: always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe: returns 200 when the application is ready to serve.
async fn readiness() -> &'static str {
    "ready"
}

//! # Integration Tests for cgw-api
//!
//! Drives the deployment wizard over HTTP: session lifecycle, background
//! scans, approvals, governance records, error mapping, health probes and
//! the OpenAPI document.

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use cgw_api::state::{AppConfig, AppState};
use cgw_core::{GatewayConfig, ScanMode, ScanSettings};

/// Helper: app whose scans finish immediately with every check passing
/// (`pass_probability = 1.0`) or failing (`0.0`).
fn test_app(pass_probability: f64) -> axum::Router {
    let config = AppConfig {
        gateway: GatewayConfig {
            scan: ScanSettings::instant(pass_probability),
            ..GatewayConfig::default()
        },
        scan_seed: Some(7),
        ..AppConfig::default()
    };
    cgw_api::app(AppState::with_config(config))
}

/// Helper: app whose checks take 20-30ms each, long enough to act on a
/// session mid-scan.
fn slow_app() -> axum::Router {
    let config = AppConfig {
        gateway: GatewayConfig {
            scan: ScanSettings {
                mode: ScanMode::Sequential,
                min_delay_ms: 20,
                max_delay_ms: 30,
                pass_probability: 1.0,
            },
            ..GatewayConfig::default()
        },
        scan_seed: Some(7),
        ..AppConfig::default()
    };
    cgw_api::app(AppState::with_config(config))
}

/// Helper: read response body as string.
async fn body_string(response: axum::http::Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: axum::http::Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn send(app: &axum::Router, method: &str, uri: &str, body: Option<Value>) -> axum::http::Response<Body> {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(v) => builder
            .header("content-type", "application/json")
            .body(Body::from(v.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.clone().oneshot(request).await.unwrap()
}

async fn create_session(app: &axum::Router, body: Value) -> String {
    let response = send(app, "POST", "/v1/sessions", Some(body)).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    json["id"].as_str().unwrap().to_string()
}

/// Poll the session until it leaves SCANNING.
async fn wait_for_review(app: &axum::Router, id: &str) -> Value {
    for _ in 0..1000 {
        let response = send(app, "GET", &format!("/v1/sessions/{id}"), None).await;
        let json = body_json(response).await;
        if json["stage"] != "SCANNING" {
            return json;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("scan did not finish");
}

// -- Health Probes ------------------------------------------------------------

#[tokio::test]
async fn test_liveness_probe() {
    let app = test_app(1.0);
    let response = send(&app, "GET", "/health/liveness", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ok");
}

#[tokio::test]
async fn test_readiness_probe() {
    let app = test_app(1.0);
    let response = send(&app, "GET", "/health/readiness", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ready");
}

// -- Catalog ------------------------------------------------------------------

#[tokio::test]
async fn test_catalog_regions_in_display_order() {
    let app = test_app(1.0);
    let json = body_json(send(&app, "GET", "/v1/catalog/regions", None).await).await;
    let ids: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, ["eu", "uk", "us", "apac"]);
    assert_eq!(json[0]["name"], "European Union");
}

#[tokio::test]
async fn test_catalog_plan_is_technical_then_regional() {
    let app = test_app(1.0);
    let json = body_json(send(&app, "GET", "/v1/catalog/checks?region=uk", None).await).await;
    assert_eq!(json["region"], "uk");
    let checks = json["checks"].as_array().unwrap();
    assert_eq!(checks.len(), 12);
    assert!(checks[..8].iter().all(|c| c["scope"] == "technical"));
    assert!(checks[8..].iter().all(|c| c["scope"] == "uk"));
}

#[tokio::test]
async fn test_catalog_without_region_lists_everything() {
    let app = test_app(1.0);
    let json = body_json(send(&app, "GET", "/v1/catalog/checks", None).await).await;
    assert!(json["region"].is_null());
    assert_eq!(json["checks"].as_array().unwrap().len(), 24);
}

#[tokio::test]
async fn test_catalog_unknown_region_returns_422() {
    let app = test_app(1.0);
    let response = send(&app, "GET", "/v1/catalog/checks?region=mars", None).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
}

// -- Sessions -----------------------------------------------------------------

#[tokio::test]
async fn test_full_workflow_passing_scan_is_approved() {
    let app = test_app(1.0);
    let id = create_session(
        &app,
        json!({"project_name": "payments-api", "region": "eu", "approver_name": "Dana Reyes"}),
    )
    .await;

    let response = send(&app, "POST", &format!("/v1/sessions/{id}/scan"), None).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let accepted = body_json(response).await;
    assert_eq!(accepted["checks"], 12);
    assert_eq!(accepted["mode"], "sequential");

    let session = wait_for_review(&app, &id).await;
    assert_eq!(session["stage"], "REVIEW");
    assert_eq!(session["summary"]["passed"], 12);
    assert_eq!(session["summary"]["failed"], 0);
    assert_eq!(session["can_approve"], true);
    assert_eq!(session["project_path"], "api/payments-api");

    let response = send(&app, "POST", &format!("/v1/sessions/{id}/approve"), Some(json!({}))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let approval = body_json(response).await;
    let approval_id = approval["approval_id"].as_str().unwrap();
    assert!(approval_id.starts_with("APP-"));
    assert_eq!(approval_id.len(), 10);
    assert_eq!(approval["session"]["stage"], "APPROVED");
    assert_eq!(approval["record"]["approver"], "Dana Reyes");

    let history = body_json(send(&app, "GET", "/v1/governance/approvals", None).await).await;
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["id"], approval_id);
    assert_eq!(history[0]["status"], "Approved");
}

#[tokio::test]
async fn test_approver_supplied_at_approval_time() {
    let app = test_app(1.0);
    let id = create_session(&app, json!({"project_name": "ledger"})).await;
    send(&app, "POST", &format!("/v1/sessions/{id}/scan"), None).await;
    wait_for_review(&app, &id).await;

    let response = send(&app, "POST", &format!("/v1/sessions/{id}/approve"), Some(json!({}))).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = send(
        &app,
        "POST",
        &format!("/v1/sessions/{id}/approve"),
        Some(json!({"approver_name": "Sam Ortiz"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_failed_checks_block_approval() {
    let app = test_app(0.0);
    let id = create_session(&app, json!({"project_name": "risky", "approver_name": "Dana"})).await;
    send(&app, "POST", &format!("/v1/sessions/{id}/scan"), None).await;

    let session = wait_for_review(&app, &id).await;
    assert_eq!(session["stage"], "REVIEW");
    assert_eq!(session["summary"]["failed"], 12);
    assert_eq!(session["can_approve"], false);

    let response = send(&app, "POST", &format!("/v1/sessions/{id}/approve"), Some(json!({}))).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "CONFLICT");

    let history = body_json(send(&app, "GET", "/v1/governance/approvals", None).await).await;
    assert!(history.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_create_session_without_body() {
    let app = test_app(1.0);
    let response = send(&app, "POST", "/v1/sessions", None).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["stage"], "CONFIG");
    assert_eq!(json["config"]["region"], "eu");
    assert!(json["config"]["project_name"].is_null());
}

#[tokio::test]
async fn test_approve_without_body_uses_form_approver() {
    let app = test_app(1.0);
    let id = create_session(&app, json!({"project_name": "ledger", "approver_name": "Dana"})).await;
    send(&app, "POST", &format!("/v1/sessions/{id}/scan"), None).await;
    wait_for_review(&app, &id).await;

    let response = send(&app, "POST", &format!("/v1/sessions/{id}/approve"), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let approval = body_json(response).await;
    assert_eq!(approval["record"]["approver"], "Dana");
    assert_eq!(approval["session"]["stage"], "APPROVED");
}

#[tokio::test]
async fn test_refused_approval_does_not_keep_approver() {
    let app = test_app(0.0);
    let id = create_session(&app, json!({"project_name": "risky"})).await;
    send(&app, "POST", &format!("/v1/sessions/{id}/scan"), None).await;
    wait_for_review(&app, &id).await;

    let response = send(
        &app,
        "POST",
        &format!("/v1/sessions/{id}/approve"),
        Some(json!({"approver_name": "Sam Ortiz"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let session = body_json(send(&app, "GET", &format!("/v1/sessions/{id}"), None).await).await;
    assert_eq!(session["stage"], "REVIEW");
    assert!(session["config"]["approver_name"].is_null());
}

#[tokio::test]
async fn test_form_enums_accept_any_case() {
    let app = test_app(1.0);
    let id = create_session(&app, json!({"region": "Apac"})).await;

    let response = send(
        &app,
        "PUT",
        &format!("/v1/sessions/{id}/config"),
        Some(json!({"region": "EU", "deployment_type": "production", "risk_tier": "HIGH"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["config"]["region"], "eu");
    assert_eq!(json["config"]["deployment_type"], "Production");
    assert_eq!(json["config"]["risk_tier"], "High");
}

#[tokio::test]
async fn test_unknown_form_enum_returns_422() {
    let app = test_app(1.0);
    let id = create_session(&app, json!({"region": "uk"})).await;

    for body in [json!({"region": "mars"}), json!({"risk_tier": "extreme"}), json!({"deployment_type": "qa"})] {
        let response = send(&app, "PUT", &format!("/v1/sessions/{id}/config"), Some(body.clone())).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY, "{body}");
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
    }

    let response = send(&app, "POST", "/v1/sessions", Some(json!({"region": "mars"}))).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let session = body_json(send(&app, "GET", &format!("/v1/sessions/{id}"), None).await).await;
    assert_eq!(session["config"]["region"], "uk");
}

#[tokio::test]
async fn test_reset_mid_scan_orphans_running_scan() {
    let app = slow_app();
    let id = create_session(&app, json!({"project_name": "settlement"})).await;

    let first = body_json(send(&app, "POST", &format!("/v1/sessions/{id}/scan"), None).await).await;
    let first_scan = first["scan_id"].as_str().unwrap().to_string();

    let response = send(&app, "POST", &format!("/v1/sessions/{id}/reset"), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let reset = body_json(response).await;
    assert_eq!(reset["stage"], "CONFIG");
    let last = reset["transitions"].as_array().unwrap().last().unwrap().clone();
    assert_eq!(last["from"], "SCANNING");

    let response = send(&app, "POST", &format!("/v1/sessions/{id}/scan"), None).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let second_scan = body_json(response).await["scan_id"].as_str().unwrap().to_string();
    assert_ne!(first_scan, second_scan);

    let session = wait_for_review(&app, &id).await;
    assert_eq!(session["stage"], "REVIEW");
    assert_eq!(session["scan_id"], second_scan);
    assert_eq!(session["summary"]["total"], 12);
    assert_eq!(session["summary"]["passed"], 12);
    assert_eq!(session["summary"]["failed"], 0);
    assert!(session["results"]
        .as_array()
        .unwrap()
        .iter()
        .all(|r| r["status"] == "PASSED"));

    let subject = format!("session:{id}");
    let audit = body_json(
        send(&app, "GET", &format!("/v1/governance/audit?subject={subject}"), None).await,
    )
    .await;
    assert_eq!(audit["verified"], true);
    let entries = audit["entries"].as_array().unwrap();
    let reset_entry = entries
        .iter()
        .find(|e| e["kind"] == "session_reset")
        .expect("reset was audited");
    assert_eq!(reset_entry["metadata"]["from"], "SCANNING");
    assert_eq!(reset_entry["metadata"]["orphaned_scan"], format!("scan:{first_scan}"));
    let scans_started = entries.iter().filter(|e| e["kind"] == "scan_started").count();
    assert_eq!(scans_started, 2);
}

#[tokio::test]
async fn test_scan_without_project_name_returns_422() {
    let app = test_app(1.0);
    let id = create_session(&app, json!({})).await;
    let response = send(&app, "POST", &format!("/v1/sessions/{id}/scan"), None).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_invalid_project_name_returns_422() {
    let app = test_app(1.0);
    let response = send(&app, "POST", "/v1/sessions", Some(json!({"project_name": "bad name!"}))).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_malformed_json_returns_400() {
    let app = test_app(1.0);
    let request = Request::builder()
        .method("POST")
        .uri("/v1/sessions")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_unknown_session_returns_404() {
    let app = test_app(1.0);
    let uri = "/v1/sessions/00000000-0000-4000-8000-000000000000";
    let response = send(&app, "GET", uri, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_empty_config_update_returns_422() {
    let app = test_app(1.0);
    let id = create_session(&app, json!({})).await;
    let response = send(&app, "PUT", &format!("/v1/sessions/{id}/config"), Some(json!({}))).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_config_locked_outside_config_stage() {
    let app = test_app(1.0);
    let id = create_session(&app, json!({"project_name": "billing"})).await;

    let response = send(&app, "PUT", &format!("/v1/sessions/{id}/config"), Some(json!({"region": "us"}))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["config"]["region"], "us");

    send(&app, "POST", &format!("/v1/sessions/{id}/scan"), None).await;
    wait_for_review(&app, &id).await;

    let response = send(&app, "PUT", &format!("/v1/sessions/{id}/config"), Some(json!({"region": "eu"}))).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = send(&app, "POST", &format!("/v1/sessions/{id}/scan"), None).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_reset_keeps_form_and_clears_results() {
    let app = test_app(0.0);
    let id = create_session(&app, json!({"project_name": "search", "region": "apac"})).await;
    send(&app, "POST", &format!("/v1/sessions/{id}/scan"), None).await;
    wait_for_review(&app, &id).await;

    let response = send(&app, "POST", &format!("/v1/sessions/{id}/reset"), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["stage"], "CONFIG");
    assert!(json["results"].as_array().unwrap().is_empty());
    assert!(json["scan_id"].is_null());
    assert_eq!(json["config"]["project_name"], "search");
    assert_eq!(json["config"]["region"], "apac");

    let response = send(&app, "POST", &format!("/v1/sessions/{id}/scan"), None).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
}

#[tokio::test]
async fn test_list_sessions() {
    let app = test_app(1.0);
    create_session(&app, json!({"project_name": "a"})).await;
    create_session(&app, json!({"project_name": "b"})).await;
    let json = body_json(send(&app, "GET", "/v1/sessions", None).await).await;
    assert_eq!(json.as_array().unwrap().len(), 2);
}

// -- Governance ---------------------------------------------------------------

#[tokio::test]
async fn test_feedback_submit_and_list() {
    let app = test_app(1.0);
    let response = send(
        &app,
        "POST",
        "/v1/governance/feedback",
        Some(json!({"author": "Dana", "message": "Scan takes too long", "category": "tooling"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let entry = body_json(response).await;
    assert_eq!(entry["category"], "tooling");

    let list = body_json(send(&app, "GET", "/v1/governance/feedback", None).await).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["message"], "Scan takes too long");
}

#[tokio::test]
async fn test_feedback_empty_message_returns_422() {
    let app = test_app(1.0);
    let response = send(
        &app,
        "POST",
        "/v1/governance/feedback",
        Some(json!({"author": "Dana", "message": "   "})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_review_schedule_advances() {
    let app = test_app(1.0);
    let before = body_json(send(&app, "GET", "/v1/governance/schedule", None).await).await;
    assert_eq!(before["cadence_days"], 90);
    assert_eq!(before["overdue"], false);

    let response = send(&app, "POST", "/v1/governance/schedule/complete", Some(json!({}))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let after = body_json(response).await;
    assert_eq!(after["days_until_next"], 90);

    let response = send(&app, "POST", "/v1/governance/schedule/complete", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(
        &app,
        "POST",
        "/v1/governance/schedule/complete",
        Some(json!({"date": "2000-01-01"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_audit_trail_records_workflow_and_verifies() {
    let app = test_app(1.0);
    let id = create_session(&app, json!({"project_name": "audit-me", "approver_name": "Dana"})).await;
    send(&app, "POST", &format!("/v1/sessions/{id}/scan"), None).await;
    wait_for_review(&app, &id).await;
    send(&app, "POST", &format!("/v1/sessions/{id}/approve"), Some(json!({}))).await;

    let audit = body_json(send(&app, "GET", "/v1/governance/audit", None).await).await;
    assert_eq!(audit["verified"], true);
    assert!(audit["error"].is_null());
    let kinds: Vec<&str> = audit["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["kind"].as_str().unwrap())
        .collect();
    for expected in ["session_created", "scan_started", "check_settled", "scan_completed", "approval_recorded"] {
        assert!(kinds.contains(&expected), "missing {expected} in {kinds:?}");
    }

    let subject = format!("session:{id}");
    let filtered = body_json(
        send(&app, "GET", &format!("/v1/governance/audit?subject={subject}&limit=1"), None).await,
    )
    .await;
    let entries = filtered["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["subject"], subject);
}

// -- OpenAPI & Metrics --------------------------------------------------------

#[tokio::test]
async fn test_openapi_document() {
    let app = test_app(1.0);
    let response = send(&app, "GET", "/openapi.json", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json["paths"]["/v1/sessions/{id}/approve"].is_object());
    assert!(json["components"]["schemas"]["SessionView"].is_object());
}

#[tokio::test]
async fn test_metrics_without_recorder_returns_404() {
    let app = test_app(1.0);
    let response = send(&app, "GET", "/metrics", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

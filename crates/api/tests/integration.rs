//! Integration tests for the HTTP host.
//!
//! Each test binds a real server on a random port, backed by a scripted
//! generation client, and talks to it over HTTP.

use std::sync::Arc;

use conclave_agents::prompts::{QA_SYSTEM, ROUTER_SYSTEM, WRITER_SYSTEM};
use conclave_api::{AppState, ServerOptions, create_router};
use conclave_common::{ConclaveError, Result};
use conclave_coordinator::CoordinatorConfig;
use conclave_llm::LlmRequest;
use conclave_llm::testing::ScriptedClient;
use serde_json::{Value, json};

const ROUTE_FINANCE: &str =
    r#"{"selected_agents": ["finance"], "clarifying_questions": [], "user_intent": "Cost center"}"#;
const ROUTE_CLARIFY: &str = r#"{"selected_agents": [], "clarifying_questions": ["Hvilket SAP-modul gælder det?"], "user_intent": "Uklart"}"#;
const QA_PASS: &str = r#"{"pass": true, "issues": [], "required_fixes": []}"#;

fn scripted(router: &'static str) -> ScriptedClient {
    ScriptedClient::new(move |request: &LlmRequest| {
        let system = request.system_prompt.as_deref().unwrap_or_default();
        if system.starts_with(ROUTER_SYSTEM.trim_end()) {
            Ok(router.to_string())
        } else if system.starts_with(QA_SYSTEM.trim_end()) {
            Ok(QA_PASS.to_string())
        } else if system == WRITER_SYSTEM {
            Ok("Opret cost centeret og verificér i systemet.".to_string())
        } else {
            Ok("specialist draft".to_string())
        }
    })
}

fn failing<F>(error: F) -> ScriptedClient
where
    F: Fn() -> ConclaveError + Send + Sync + 'static,
{
    ScriptedClient::new(move |_: &LlmRequest| -> Result<String> { Err(error()) })
}

/// Spin up a test server on a random port and return the base URL.
async fn start_test_server(client: &ScriptedClient) -> String {
    let state = Arc::new(AppState::with_client(
        Arc::new(client.clone()),
        &CoordinatorConfig::default(),
    ));
    let options = ServerOptions {
        cors_origins: Some(vec!["*".to_string()]),
        body_limit: 16 * 1024,
        ..Default::default()
    };
    let router = create_router(state, &options);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    format!("http://{}", addr)
}

async fn get(base: &str, path: &str) -> (u16, String) {
    let resp = reqwest::Client::new()
        .get(format!("{}{}", base, path))
        .send()
        .await
        .unwrap();
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap();
    (status, body)
}

async fn post_raw(base: &str, path: &str, body: String) -> (u16, Value) {
    let resp = reqwest::Client::new()
        .post(format!("{}{}", base, path))
        .header("content-type", "application/json")
        .body(body)
        .send()
        .await
        .unwrap();
    let status = resp.status().as_u16();
    let text = resp.text().await.unwrap();
    (status, serde_json::from_str(&text).unwrap_or(Value::String(text)))
}

async fn post_json(base: &str, path: &str, body: Value) -> (u16, Value) {
    post_raw(base, path, body.to_string()).await
}

// ============================================================================
// Health and static assets
// ============================================================================

#[tokio::test]
async fn test_health_reports_models() {
    let base = start_test_server(&scripted(ROUTE_FINANCE)).await;
    let (status, body) = get(&base, "/health").await;
    assert_eq!(status, 200);

    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["fast_model"], "gemini-2.5-flash");
    assert_eq!(json["smart_model"], "gemini-2.5-pro");
    assert_eq!(json["fan_out"], "sequential");
}

#[tokio::test]
async fn test_index_and_assets_are_served() {
    let base = start_test_server(&scripted(ROUTE_FINANCE)).await;

    let (status, body) = get(&base, "/").await;
    assert_eq!(status, 200);
    assert!(body.contains("<textarea id=\"input\""));

    let (status, body) = get(&base, "/static/app.js").await;
    assert_eq!(status, 200);
    assert!(body.contains("fetch(\"/chat\""));
}

// ============================================================================
// Chat endpoint
// ============================================================================

#[tokio::test]
async fn test_chat_full_pass() {
    let client = scripted(ROUTE_FINANCE);
    let base = start_test_server(&client).await;

    let (status, body) = post_json(
        &base,
        "/chat",
        json!({
            "message": "Hvordan konfigurerer jeg en ny cost center i FI?",
            "history": [{"role": "user", "content": "Hej"}, {"role": "assistant", "content": "Hej!"}]
        }),
    )
    .await;

    assert_eq!(status, 200, "{body}");
    assert_eq!(body["answer"], "Opret cost centeret og verificér i systemet.");
    assert_eq!(body["debug"]["router"]["selected_agents"], json!(["finance"]));
    assert_eq!(body["debug"]["drafts"][0]["agent"], "finance");
    assert_eq!(body["debug"]["qa"]["pass"], true);
    assert_eq!(client.call_count(), 4);
}

#[tokio::test]
async fn test_chat_clarification_only_has_router_trace() {
    let client = scripted(ROUTE_CLARIFY);
    let base = start_test_server(&client).await;

    let (status, body) =
        post_json(&base, "/api/v1/chat", json!({"message": "Det virker ikke"})).await;

    assert_eq!(status, 200);
    assert_eq!(
        body["answer"],
        "Jeg mangler lige lidt info:\n- Hvilket SAP-modul gælder det?"
    );
    let debug = body["debug"].as_object().unwrap();
    assert_eq!(debug.len(), 1);
    assert!(debug.contains_key("router"));
    assert_eq!(client.call_count(), 1);
}

#[tokio::test]
async fn test_blank_message_is_rejected() {
    let client = scripted(ROUTE_FINANCE);
    let base = start_test_server(&client).await;

    let (status, body) = post_json(&base, "/chat", json!({"message": "   "})).await;
    assert_eq!(status, 400);
    assert_eq!(body["code"], "EMPTY_MESSAGE");
    assert_eq!(client.call_count(), 0);
}

#[tokio::test]
async fn test_malformed_body_is_rejected() {
    let base = start_test_server(&scripted(ROUTE_FINANCE)).await;

    let (status, body) = post_json(&base, "/chat", json!({"history": []})).await;
    assert_eq!(status, 400);
    assert_eq!(body["code"], "INVALID_REQUEST");

    let (status, _) = post_raw(&base, "/chat", "{not json".to_string()).await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let base = start_test_server(&scripted(ROUTE_FINANCE)).await;
    let huge = "x".repeat(32 * 1024);
    let (status, _) = post_json(&base, "/chat", json!({"message": huge})).await;
    assert_eq!(status, 413);
}

// ============================================================================
// Error mapping
// ============================================================================

#[tokio::test]
async fn test_model_service_error_is_bad_gateway() {
    let base = start_test_server(&failing(|| {
        ConclaveError::ModelService("Gemini API error 503 Service Unavailable".into())
    }))
    .await;

    let (status, body) = post_json(&base, "/chat", json!({"message": "Hej"})).await;
    assert_eq!(status, 502);
    assert_eq!(body["code"], "MODEL_SERVICE_ERROR");
    assert!(body.get("answer").is_none());
}

#[tokio::test]
async fn test_timeout_is_gateway_timeout() {
    let base = start_test_server(&failing(|| {
        ConclaveError::ModelService("Gemini request timed out after 60000ms".into())
    }))
    .await;

    let (status, body) = post_json(&base, "/chat", json!({"message": "Hej"})).await;
    assert_eq!(status, 504);
    assert_eq!(body["code"], "MODEL_SERVICE_ERROR");
}

#[tokio::test]
async fn test_schema_violation_is_distinguishable() {
    let base = start_test_server(&scripted("Jeg vælger finance.")).await;

    let (status, body) = post_json(&base, "/chat", json!({"message": "Hej"})).await;
    assert_eq!(status, 502);
    assert_eq!(body["code"], "SCHEMA_VALIDATION_ERROR");
}

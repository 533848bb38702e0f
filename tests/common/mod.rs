// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::{
    body::Body,
    http::{header, Request, Response, StatusCode},
    Router,
};
use nutrilife::config::Config;
use nutrilife::db::{FirestoreDb, MemoryStore};
use nutrilife::routes::create_router;
use nutrilife::services::{
    AiGateway, Identity, ReportRenderer, ScriptedOracle, SessionController,
    StaticIdentityVerifier,
};
use nutrilife::AppState;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

/// Google ID token accepted by the static verifier for [`ana`].
#[allow(dead_code)]
pub const ANA_TOKEN: &str = "google-id-token-ana";
#[allow(dead_code)]
pub const BEN_TOKEN: &str = "google-id-token-ben";

#[allow(dead_code)]
pub fn ana() -> Identity {
    Identity {
        uid: "uid-ana".to_string(),
        display_name: "Ana".to_string(),
        email: Some("ana@example.com".to_string()),
    }
}

#[allow(dead_code)]
pub fn ben() -> Identity {
    Identity {
        uid: "uid-ben".to_string(),
        display_name: "Ben".to_string(),
        email: None,
    }
}

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Handles to the fakes behind a test app.
#[allow(dead_code)]
pub struct TestHarness {
    pub state: Arc<AppState>,
    pub oracle: Arc<ScriptedOracle>,
    pub store: Arc<MemoryStore>,
}

/// Create a test app with offline fakes: in-memory store, scripted
/// oracle and a static identity table.
#[allow(dead_code)]
pub fn create_test_app() -> (Router, TestHarness) {
    create_test_app_with_oracle(ScriptedOracle::new())
}

#[allow(dead_code)]
pub fn create_test_app_with_oracle(oracle: ScriptedOracle) -> (Router, TestHarness) {
    let config = Config::test_default();
    let oracle = Arc::new(oracle);
    let store = Arc::new(MemoryStore::new());

    let identity = StaticIdentityVerifier::new()
        .with_identity(ANA_TOKEN, ana())
        .with_identity(BEN_TOKEN, ben());

    let gateway = AiGateway::new(
        oracle.clone(),
        &config.gemini_model,
        &config.response_language,
    );

    let state = Arc::new(AppState {
        config,
        sessions: SessionController::new(store.clone()),
        identity: Arc::new(identity),
        gateway,
        reports: ReportRenderer::new(),
    });

    let harness = TestHarness {
        state: state.clone(),
        oracle,
        store,
    };
    (create_router(state), harness)
}

/// Build a request carrying a Bearer session token and an optional JSON body.
#[allow(dead_code)]
pub fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

#[allow(dead_code)]
pub async fn read_json(response: Response<Body>) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Send a request and return the status with the decoded JSON body.
#[allow(dead_code)]
pub async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    };
    (status, json)
}

/// Sign in with a Google ID token and return the session token.
#[allow(dead_code)]
pub async fn sign_in(app: &Router, id_token: &str) -> String {
    let (status, body) = send(
        app,
        request(
            "POST",
            "/auth/google",
            None,
            Some(json!({ "id_token": id_token })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "sign-in failed: {body}");
    body["token"].as_str().unwrap().to_string()
}

#[allow(dead_code)]
pub fn profile_draft(name: &str) -> Value {
    json!({
        "name": name,
        "condition": "diabetes",
        "goal": "Keep my glucose stable",
        "gender": "female",
        "age": 52,
        "weight": 70.5,
        "height": 165.0,
        "activity_level": "light"
    })
}

/// Sign in and complete onboarding; returns the session token.
#[allow(dead_code)]
pub async fn onboarded(app: &Router, id_token: &str, name: &str) -> String {
    let token = sign_in(app, id_token).await;
    let (status, body) = send(
        app,
        request(
            "POST",
            "/api/onboarding",
            Some(&token),
            Some(profile_draft(name)),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "onboarding failed: {body}");
    token
}

#[allow(dead_code)]
pub fn sample_recipe(name: &str) -> Value {
    json!({
        "recipe_name": name,
        "description": "A light dinner",
        "ingredients": ["200 g hake", "1 lemon", "olive oil"],
        "instructions": ["Season the fish.", "Bake for 15 minutes."],
        "prep_time": "25 minutes"
    })
}

#[allow(dead_code)]
pub fn food_analysis() -> Value {
    json!({
        "total_calories": 520.0,
        "macros": { "protein": 32.0, "carbs": 48.0, "fat": 18.0 },
        "identified_foods": ["Grilled chicken (150 g)", "Brown rice (120 g)"],
        "feedback": {
            "composition_analysis": "Balanced plate",
            "recommendation": "Add more vegetables",
            "is_recommended": true
        }
    })
}

#[allow(dead_code)]
pub fn meal_day() -> Value {
    json!({
        "breakfast": sample_recipe("Oatmeal with berries"),
        "morning_snack": sample_recipe("Greek yogurt"),
        "lunch": sample_recipe("Lentil stew"),
        "afternoon_snack": sample_recipe("Almonds"),
        "dinner": sample_recipe("Baked hake")
    })
}

/// Build a multipart upload with a single `image` field.
#[allow(dead_code)]
pub fn scan_request(token: &str, mime_type: &str, bytes: &[u8]) -> Request<Body> {
    let boundary = "nutrilife-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"image\"; \
             filename=\"meal\"\r\nContent-Type: {mime_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/scan")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap()
}

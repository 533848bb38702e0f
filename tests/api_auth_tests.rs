// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API authentication and CORS tests.
//!
//! These tests verify that:
//! 1. Protected routes reject requests without valid tokens
//! 2. Google sign-in issues a session token and cookie
//! 3. CORS preflight requests return correct headers

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use nutrilife::middleware::auth::{create_jwt, SESSION_COOKIE};
use serde_json::json;
use tower::ServiceExt;

mod common;
use common::{request, send, sign_in, ANA_TOKEN};

#[tokio::test]
async fn test_protected_route_without_token() {
    let (app, _) = common::create_test_app();

    let (status, body) = send(&app, request("GET", "/api/profile", None, None)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn test_protected_route_with_invalid_token() {
    let (app, _) = common::create_test_app();

    let (status, body) = send(
        &app,
        request("GET", "/api/dashboard", Some("invalid.token.here"), None),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_token");
}

#[tokio::test]
async fn test_token_signed_with_other_key_rejected() {
    let (app, _) = common::create_test_app();
    let (token, _) = create_jwt(&common::ana(), b"some_other_key_32_bytes_long!!!!").unwrap();

    let (status, _) = send(&app, request("GET", "/auth/session", Some(&token), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_sign_in_rejects_unknown_id_token() {
    let (app, harness) = common::create_test_app();

    let (status, _) = send(
        &app,
        request(
            "POST",
            "/auth/google",
            None,
            Some(json!({ "id_token": "forged" })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(harness.state.sessions.active_sessions(), 0);
}

#[tokio::test]
async fn test_sign_in_new_identity_starts_onboarding() {
    let (app, _) = common::create_test_app();

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/auth/google",
            None,
            Some(json!({ "id_token": ANA_TOKEN })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with(&format!("{SESSION_COOKIE}=")));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));

    let body = common::read_json(response).await;
    assert_eq!(body["session"]["phase"], "onboarding");
    assert_eq!(body["session"]["view"], "onboarding");
    assert_eq!(body["session"]["display_name"], "Ana");
    assert!(body["session"]["profile"].is_null());
}

#[tokio::test]
async fn test_session_cookie_authenticates() {
    let (app, _) = common::create_test_app();
    let token = sign_in(&app, ANA_TOKEN).await;

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/auth/session")
                .header(header::COOKIE, format!("{SESSION_COOKIE}={token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = common::read_json(response).await;
    assert_eq!(body["uid"], "uid-ana");
}

#[tokio::test]
async fn test_onboarding_activates_session() {
    let (app, _) = common::create_test_app();
    let token = sign_in(&app, ANA_TOKEN).await;

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/api/onboarding",
            Some(&token),
            Some(common::profile_draft("Ana")),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["phase"], "active");
    assert_eq!(body["view"], "habits");
    assert_eq!(body["credits"], 7);
    assert_eq!(body["profile"]["plan"], "free");

    // A second onboarding is not allowed.
    let (status, _) = send(
        &app,
        request(
            "POST",
            "/api/onboarding",
            Some(&token),
            Some(common::profile_draft("Ana")),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_onboarding_rejects_invalid_profile() {
    let (app, _) = common::create_test_app();
    let token = sign_in(&app, ANA_TOKEN).await;

    let mut draft = common::profile_draft("   ");
    draft["age"] = json!(0);
    let (status, body) = send(
        &app,
        request("POST", "/api/onboarding", Some(&token), Some(draft)),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn test_navigation_respects_phase() {
    let (app, _) = common::create_test_app();
    let token = sign_in(&app, ANA_TOKEN).await;

    let (status, _) = send(
        &app,
        request(
            "POST",
            "/api/navigate",
            Some(&token),
            Some(json!({ "view": "dashboard" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let token = common::onboarded(&app, ANA_TOKEN, "Ana").await;
    let (status, body) = send(
        &app,
        request(
            "POST",
            "/api/navigate",
            Some(&token),
            Some(json!({ "view": "weekly_plan" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["view"], "weekly_plan");
}

#[tokio::test]
async fn test_cors_preflight() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/dashboard")
                .header(header::ORIGIN, "http://localhost:5173")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // OPTIONS should return 200 (CORS preflight success)
    assert_eq!(response.status(), StatusCode::OK);

    // Should have CORS headers
    assert!(response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    assert!(response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_METHODS));
}

#[tokio::test]
async fn test_public_route_no_auth_required() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // Health should be accessible without auth
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("X-Content-Type-Options").unwrap(),
        "nosniff"
    );
    let body = common::read_json(response).await;
    assert_eq!(body["status"], "ok");
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google sign-in and session routes.

use axum::{
    extract::State,
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::middleware::auth::{create_jwt, AuthUser, SESSION_COOKIE};
use crate::services::google_identity::IdentityError;
use crate::services::session::{SessionSummary, View};
use crate::AppState;

/// Sign-in route (no session required).
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().route("/auth/google", post(sign_in))
}

/// Session routes; the auth middleware is applied in routes/mod.rs.
pub fn session_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/session", get(session))
        .route("/auth/logout", post(logout))
}

#[derive(Deserialize)]
pub struct SignInRequest {
    id_token: String,
}

#[derive(Serialize)]
pub struct SignInResponse {
    pub token: String,
    pub session: SessionSummary,
}

#[derive(Serialize)]
pub struct LogoutResponse {
    pub view: View,
}

/// Plain-HTTP frontends (local development) cannot receive Secure cookies.
fn secure_cookies(state: &AppState) -> bool {
    !state.config.frontend_url.starts_with("http://")
}

fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::days(30))
        .build()
}

/// Exchange a Google ID token for a session.
async fn sign_in(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<SignInRequest>,
) -> Result<(CookieJar, Json<SignInResponse>)> {
    let identity = state
        .identity
        .verify(&body.id_token)
        .await
        .map_err(|e| match e {
            IdentityError::Rejected(reason) => {
                tracing::info!(reason = %reason, "Sign-in rejected");
                AppError::InvalidToken
            }
            IdentityError::Unavailable(reason) => {
                tracing::warn!(reason = %reason, "Identity provider unavailable");
                AppError::Unauthorized
            }
        })?;

    let session = state.sessions.summary(&identity).await;

    let (token, _claims) = create_jwt(&identity, &state.config.jwt_signing_key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;

    tracing::info!(uid = %identity.uid, phase = ?session.phase, "Signed in");

    let jar = jar.add(session_cookie(token.clone(), secure_cookies(&state)));

    Ok((jar, Json(SignInResponse { token, session })))
}

/// Report the current phase and view.
async fn session(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Json<SessionSummary> {
    Json(state.sessions.summary(&user.identity).await)
}

/// Sign out: drop session state, revoke the token and clear the cookie.
async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    jar: CookieJar,
) -> (CookieJar, Json<LogoutResponse>) {
    let view = state.sessions.sign_out(&user.identity);
    state.sessions.revoke_token(&user.sid, user.expires_at);

    // Removal must carry the same attributes the cookie was set with.
    let jar = jar.remove(session_cookie(String::new(), secure_cookies(&state)));
    (jar, Json(LogoutResponse { view }))
}

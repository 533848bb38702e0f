// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users: profile, habits, notes and saved recipes.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Habit, ProfileDraft, Recipe, SaveOutcome, SavedRecipes, UserProfile};
use crate::services::session::{Dashboard, HabitsSnapshot, SessionSummary, View};
use crate::time_utils::{parse_date_key, parse_month};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post, put},
    Extension, Json, Router,
};
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/onboarding", post(complete_onboarding))
        .route("/api/profile", get(get_profile).put(update_profile))
        .route("/api/profile/upgrade", post(upgrade))
        .route("/api/navigate", post(navigate))
        .route("/api/dashboard", get(get_dashboard))
        .route("/api/notes", get(get_notes))
        .route("/api/notes/{date}", put(save_note))
        .route("/api/habits", get(get_habits).post(add_habit))
        .route("/api/habits/{id}/toggle", post(toggle_habit))
        .route("/api/habits/{id}", delete(delete_habit))
        .route("/api/recipes/saved", get(get_saved_recipes).post(save_recipe))
}

/// Resolve an optional `YYYY-MM` query value, defaulting to the current month.
fn month_or_current(raw: Option<&str>) -> Result<(i32, u32)> {
    match raw {
        Some(raw) => parse_month(raw)
            .ok_or_else(|| AppError::BadRequest(format!("invalid month {raw:?}, expected YYYY-MM"))),
        None => {
            let today = chrono::Utc::now().date_naive();
            Ok((today.year(), today.month()))
        }
    }
}

// ─── Profile ─────────────────────────────────────────────────

async fn complete_onboarding(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(draft): Json<ProfileDraft>,
) -> Result<Json<SessionSummary>> {
    let summary = state
        .sessions
        .complete_onboarding(&user.identity, draft)
        .await?;
    Ok(Json(summary))
}

async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserProfile>> {
    Ok(Json(state.sessions.profile(&user.identity).await?))
}

async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(draft): Json<ProfileDraft>,
) -> Result<Json<UserProfile>> {
    Ok(Json(
        state.sessions.update_profile(&user.identity, draft).await?,
    ))
}

async fn upgrade(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserProfile>> {
    Ok(Json(state.sessions.upgrade(&user.identity).await?))
}

#[derive(Deserialize)]
pub struct NavigateRequest {
    view: View,
}

#[derive(Serialize)]
pub struct NavigateResponse {
    pub view: View,
}

async fn navigate(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<NavigateRequest>,
) -> Result<Json<NavigateResponse>> {
    let view = state.sessions.navigate(&user.identity, body.view).await?;
    Ok(Json(NavigateResponse { view }))
}

// ─── Dashboard & notes ───────────────────────────────────────

#[derive(Deserialize)]
pub struct MonthParams {
    #[serde(default)]
    month: Option<String>,
}

async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<MonthParams>,
) -> Result<Json<Dashboard>> {
    let (year, month) = month_or_current(params.month.as_deref())?;
    Ok(Json(
        state.sessions.dashboard(&user.identity, year, month).await?,
    ))
}

/// Notes for one month, keyed by `YYYY-MM-DD`.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct NotesResponse {
    pub month: String,
    pub notes: BTreeMap<String, String>,
}

async fn get_notes(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<MonthParams>,
) -> Result<Json<NotesResponse>> {
    let (year, month) = month_or_current(params.month.as_deref())?;
    let notes = state
        .sessions
        .notes_for_month(&user.identity, year, month)
        .await?;
    Ok(Json(NotesResponse {
        month: format!("{year:04}-{month:02}"),
        notes,
    }))
}

#[derive(Deserialize)]
pub struct NoteRequest {
    #[serde(default)]
    text: String,
}

/// Set the note for a day. Empty text deletes it.
async fn save_note(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(date): Path<String>,
    Json(body): Json<NoteRequest>,
) -> Result<axum::http::StatusCode> {
    let date = parse_date_key(&date)
        .ok_or_else(|| AppError::BadRequest(format!("invalid date {date:?}, expected YYYY-MM-DD")))?;
    state
        .sessions
        .save_note(&user.identity, date, &body.text)
        .await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}

// ─── Habits ──────────────────────────────────────────────────

async fn get_habits(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<HabitsSnapshot>> {
    Ok(Json(state.sessions.habits(&user.identity).await?))
}

#[derive(Deserialize)]
pub struct NewHabitRequest {
    text: String,
}

async fn add_habit(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<NewHabitRequest>,
) -> Result<(axum::http::StatusCode, Json<Habit>)> {
    let habit = state.sessions.add_habit(&user.identity, &body.text).await?;
    Ok((axum::http::StatusCode::CREATED, Json(habit)))
}

async fn toggle_habit(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<u64>,
) -> Result<Json<HabitsSnapshot>> {
    Ok(Json(state.sessions.toggle_habit(&user.identity, id).await?))
}

async fn delete_habit(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<u64>,
) -> Result<Json<HabitsSnapshot>> {
    Ok(Json(state.sessions.delete_habit(&user.identity, id).await?))
}

// ─── Saved recipes ───────────────────────────────────────────

async fn get_saved_recipes(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<SavedRecipes>> {
    Ok(Json(state.sessions.saved_recipes(&user.identity).await?))
}

#[derive(Serialize)]
pub struct SaveRecipeResponse {
    pub outcome: SaveOutcome,
}

async fn save_recipe(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(recipe): Json<Recipe>,
) -> Result<Json<SaveRecipeResponse>> {
    let outcome = state.sessions.save_recipe(&user.identity, recipe).await?;
    Ok(Json(SaveRecipeResponse { outcome }))
}

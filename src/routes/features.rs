// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Credit-metered AI feature routes.
//!
//! Inputs are validated here, before any credit check or oracle call.
//! Charging, the in-flight guard and result recording happen in
//! [`SessionController::run_gated`].

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{ChatMessage, FoodAnalysis, NutritionalAnalysis, Recipe, WeeklyPlan, WorkoutPlan};
use crate::services::contracts::DayCount;
use crate::services::credits::Feature;
use crate::services::gateway::MAX_IMAGE_BYTES;
use crate::services::session::{Gated, SessionController};
use crate::AppState;
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

const DEFAULT_RECIPE_COUNT: usize = 2;
const DEFAULT_PLAN_DAYS: u32 = 7;

/// Multipart framing on top of the image itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/scan",
            post(scan).layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES + MULTIPART_OVERHEAD)),
        )
        .route("/api/calculator", post(calculator))
        .route("/api/recipes/generate", post(generate_recipes))
        .route("/api/recipes/surprise", post(surprise_recipe))
        .route("/api/weekly-plan", post(weekly_plan))
        .route("/api/workout-plan", post(workout_plan))
        .route("/api/chat", get(chat_transcript).post(chat))
}

fn require_text(value: &str, field: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::BadRequest(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

fn day_count(days: u32) -> Result<DayCount> {
    DayCount::new(days)
        .ok_or_else(|| AppError::BadRequest(format!("days must be between 1 and 7, got {days}")))
}

// ─── Meal scanner ────────────────────────────────────────────

struct UploadedImage {
    mime_type: String,
    bytes: Vec<u8>,
}

/// Pull the `image` field out of a multipart upload and check it.
async fn read_image(mut multipart: Multipart) -> Result<UploadedImage> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("malformed upload: {e}")))?
    {
        if field.name() != Some("image") {
            continue;
        }

        let mime_type = field.content_type().unwrap_or_default().to_string();
        if !mime_type.starts_with("image/") {
            return Err(AppError::BadRequest(format!(
                "expected an image, got {:?}",
                mime_type
            )));
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("failed to read image: {e}")))?;
        if bytes.is_empty() {
            return Err(AppError::BadRequest("image is empty".to_string()));
        }
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(AppError::BadRequest(format!(
                "image is {} bytes; the limit is {MAX_IMAGE_BYTES}",
                bytes.len()
            )));
        }

        return Ok(UploadedImage {
            mime_type,
            bytes: bytes.to_vec(),
        });
    }

    Err(AppError::BadRequest("missing image field".to_string()))
}

async fn scan(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    multipart: Multipart,
) -> Result<Json<Gated<FoodAnalysis>>> {
    let image = read_image(multipart).await?;
    tracing::debug!(uid = %user.identity.uid, mime = %image.mime_type, size = image.bytes.len(), "Meal photo received");

    let gateway = state.gateway.clone();
    let gated = state
        .sessions
        .run_gated(
            &user.identity,
            Feature::Scan,
            |profile| async move {
                gateway
                    .analyze_food_image(&profile, &image.mime_type, image.bytes)
                    .await
            },
            |_, _| {},
        )
        .await?;
    Ok(Json(gated))
}

// ─── Nutrition calculator ────────────────────────────────────

#[derive(Deserialize)]
pub struct CalculatorRequest {
    description: String,
}

async fn calculator(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<CalculatorRequest>,
) -> Result<Json<Gated<NutritionalAnalysis>>> {
    let description = require_text(&body.description, "description")?;

    let gateway = state.gateway.clone();
    let gated = state
        .sessions
        .run_gated(
            &user.identity,
            Feature::Calculator,
            |profile| async move { gateway.calculate_nutrition(&profile, &description).await },
            |_, _| {},
        )
        .await?;
    Ok(Json(gated))
}

// ─── Recipes ─────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct GenerateRecipesRequest {
    request: String,
    #[serde(default)]
    count: Option<usize>,
}

async fn generate_recipes(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<GenerateRecipesRequest>,
) -> Result<Json<Gated<Vec<Recipe>>>> {
    let request = require_text(&body.request, "request")?;
    let count = body.count.unwrap_or(DEFAULT_RECIPE_COUNT);
    if !(1..=2).contains(&count) {
        return Err(AppError::BadRequest(format!(
            "count must be 1 or 2, got {count}"
        )));
    }

    let gateway = state.gateway.clone();
    let gated = state
        .sessions
        .run_gated(
            &user.identity,
            Feature::Recipe,
            |profile| async move { gateway.generate_recipes(&profile, &request, count).await },
            |_, _| {},
        )
        .await?;
    Ok(Json(gated))
}

async fn surprise_recipe(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Gated<Vec<Recipe>>>> {
    let gateway = state.gateway.clone();
    let gated = state
        .sessions
        .run_gated(
            &user.identity,
            Feature::Recipe,
            |profile| async move { gateway.surprise_recipe(&profile).await },
            |_, _| {},
        )
        .await?;
    Ok(Json(gated))
}

// ─── Plans ───────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct WeeklyPlanRequest {
    #[serde(default)]
    days: Option<u32>,
    #[serde(default)]
    preferences: Option<String>,
}

async fn weekly_plan(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<WeeklyPlanRequest>,
) -> Result<Json<Gated<WeeklyPlan>>> {
    let days = day_count(body.days.unwrap_or(DEFAULT_PLAN_DAYS))?;
    let preferences = body
        .preferences
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty());

    let gateway = state.gateway.clone();
    let gated = state
        .sessions
        .run_gated(
            &user.identity,
            Feature::WeeklyPlan,
            |profile| async move {
                gateway
                    .weekly_plan(&profile, days, preferences.as_deref())
                    .await
            },
            |_, _| {},
        )
        .await?;
    Ok(Json(gated))
}

#[derive(Deserialize)]
pub struct WorkoutPlanRequest {
    focus: String,
    days: u32,
}

async fn workout_plan(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<WorkoutPlanRequest>,
) -> Result<Json<Gated<WorkoutPlan>>> {
    let focus = require_text(&body.focus, "focus")?;
    let days = day_count(body.days)?;

    let gateway = state.gateway.clone();
    let gated = state
        .sessions
        .run_gated(
            &user.identity,
            Feature::WorkoutPlan,
            |profile| async move { gateway.workout_plan(&profile, &focus, days).await },
            |_, _| {},
        )
        .await?;
    Ok(Json(gated))
}

// ─── Chat ────────────────────────────────────────────────────

async fn chat_transcript(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<ChatMessage>>> {
    Ok(Json(state.sessions.transcript(&user.identity).await?))
}

#[derive(Deserialize)]
pub struct ChatRequest {
    message: String,
}

async fn chat(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<ChatRequest>,
) -> Result<Json<Gated<ChatMessage>>> {
    let message = require_text(&body.message, "message")?;

    let gateway = state.gateway.clone();
    let prompt = message.clone();
    let gated = state
        .sessions
        .run_gated(
            &user.identity,
            Feature::ChatTurn,
            |profile| async move { gateway.chat(&profile, &prompt).await.map(ChatMessage::ai) },
            |session, reply: &ChatMessage| {
                SessionController::record_chat(session, &message, &reply.text)
            },
        )
        .await?;
    Ok(Json(gated))
}

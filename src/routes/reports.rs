// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! PDF export of recipes and plans.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Recipe, WeeklyPlan, WorkoutPlan};
use crate::services::report::{content_disposition, RenderedReport, ReportError};
use crate::AppState;
use axum::{
    extract::State,
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    routing::post,
    Extension, Json, Router,
};
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/reports/recipe", post(recipe_report))
        .route("/api/reports/weekly-plan", post(weekly_plan_report))
        .route("/api/reports/workout-plan", post(workout_plan_report))
}

/// Run PDF rendering off the async executor.
async fn render<F>(job: F) -> Result<RenderedReport>
where
    F: FnOnce() -> std::result::Result<RenderedReport, ReportError> + Send + 'static,
{
    let report = tokio::task::spawn_blocking(job)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("report task failed: {}", e)))??;
    Ok(report)
}

fn pdf_response(report: RenderedReport) -> Result<Response> {
    let disposition = HeaderValue::from_str(&content_disposition(&report.file_name))
        .map_err(|e| AppError::Report(format!("bad file name: {e}")))?;

    let mut response = report.bytes.into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/pdf"),
    );
    headers.insert(header::CONTENT_DISPOSITION, disposition);
    Ok(response)
}

async fn recipe_report(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(recipe): Json<Recipe>,
) -> Result<Response> {
    let renderer = state.reports.clone();
    let report = render(move || renderer.recipe(&recipe)).await?;
    tracing::info!(uid = %user.identity.uid, file = %report.file_name, "Recipe exported");
    pdf_response(report)
}

async fn weekly_plan_report(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(plan): Json<WeeklyPlan>,
) -> Result<Response> {
    let name = state.sessions.profile(&user.identity).await?.name;
    let renderer = state.reports.clone();
    let report = render(move || renderer.weekly_plan(&plan, &name)).await?;
    tracing::info!(uid = %user.identity.uid, file = %report.file_name, "Weekly plan exported");
    pdf_response(report)
}

async fn workout_plan_report(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(plan): Json<WorkoutPlan>,
) -> Result<Response> {
    let renderer = state.reports.clone();
    let report = render(move || renderer.workout_plan(&plan)).await?;
    tracing::info!(uid = %user.identity.uid, file = %report.file_name, "Workout plan exported");
    pdf_response(report)
}

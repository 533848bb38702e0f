// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::services::credits::Feature;
use crate::services::report::ReportError;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// The session is not in a phase that allows the action (e.g. before onboarding).
    #[error("Action not available: {0}")]
    InvalidPhase(String),

    #[error("A {0} request is already in progress")]
    FeatureBusy(Feature),

    #[error("Insufficient credits: {required} required, {balance} available")]
    InsufficientCredits { required: u32, balance: u32 },

    /// Generation failed; the message is safe to show to the user.
    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Report rendering error: {0}")]
    Report(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token", None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::InvalidPhase(msg) => {
                (StatusCode::CONFLICT, "invalid_phase", Some(msg.clone()))
            }
            AppError::FeatureBusy(_) => (
                StatusCode::CONFLICT,
                "feature_busy",
                Some(self.to_string()),
            ),
            AppError::InsufficientCredits { .. } => (
                StatusCode::PAYMENT_REQUIRED,
                "insufficient_credits",
                Some(self.to_string()),
            ),
            AppError::Generation(msg) => {
                (StatusCode::BAD_GATEWAY, "generation_failed", Some(msg.clone()))
            }
            AppError::Report(msg) => {
                tracing::error!(error = %msg, "Report rendering error");
                (StatusCode::INTERNAL_SERVER_ERROR, "report_error", None)
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl From<ReportError> for AppError {
    fn from(e: ReportError) -> Self {
        AppError::Report(e.to_string())
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! NutriLife API Server
//!
//! Serves the NutriLife diet and fitness assistant: Google sign-in,
//! profile and habit storage, and Gemini-backed nutrition features.

use nutrilife::{
    config::{Config, StoreBackend},
    db::{FirestoreDb, MemoryStore, ProfileStore},
    services::{AiGateway, GeminiClient, GoogleIdentityVerifier, ReportRenderer, SessionController},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting NutriLife API");

    // Durable profile storage
    let store: Arc<dyn ProfileStore> = match config.store_backend {
        StoreBackend::Firestore => {
            let db = FirestoreDb::new(&config.gcp_project_id).await?;
            tracing::info!(project = %config.gcp_project_id, "Using Firestore store");
            Arc::new(db)
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; profiles are lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let gemini = Arc::new(GeminiClient::new(&config.gemini_api_key)?);
    let gateway = AiGateway::new(gemini, &config.gemini_model, &config.response_language);
    tracing::info!(model = %config.gemini_model, language = %config.response_language, "Gemini gateway initialized");

    let identity = Arc::new(GoogleIdentityVerifier::new(&config.google_client_id)?);

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        sessions: SessionController::new(store),
        identity,
        gateway,
        reports: ReportRenderer::new(),
    });

    // Build router
    let app = nutrilife::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("nutrilife=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! NutriLife: a personal nutrition and fitness assistant
//!
//! This crate provides the backend API: Google sign-in, onboarding and
//! profile storage, habits, saved recipes and notes, credit-metered AI
//! features backed by Gemini, and PDF export of recipes and plans.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use services::{AiGateway, IdentityVerifier, ReportRenderer, SessionController};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub sessions: SessionController,
    pub identity: Arc<dyn IdentityVerifier>,
    pub gateway: AiGateway,
    pub reports: ReportRenderer,
}

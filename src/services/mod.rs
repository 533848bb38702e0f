// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod contracts;
pub mod credits;
pub mod gateway;
pub mod gemini;
pub mod google_identity;
pub mod oracle;
pub mod report;
pub mod session;

pub use credits::{CreditLedger, Feature, FeatureGate, GateDecision};
pub use gateway::{AiGateway, FlowError};
pub use gemini::GeminiClient;
pub use google_identity::{
    GoogleIdentityVerifier, Identity, IdentityError, IdentityVerifier, StaticIdentityVerifier,
};
pub use oracle::{GenerationOracle, OracleError, OracleRequest, ScriptedOracle};
pub use report::{ReportError, ReportRenderer};
pub use session::{SessionController, View};

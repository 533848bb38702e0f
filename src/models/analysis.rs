// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Nutrition analysis results from the scanner and calculator flows.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Macronutrients in grams.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Macros {
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

/// Personalized feedback for the user's condition and goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Feedback {
    pub composition_analysis: String,
    pub recommendation: String,
    pub is_recommended: bool,
}

/// Result of analyzing a meal photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct FoodAnalysis {
    pub total_calories: f64,
    pub macros: Macros,
    /// Foods with estimated weights, e.g. "Chicken breast (150g)"
    pub identified_foods: Vec<String>,
    pub feedback: Feedback,
}

/// Result of the text-based nutrition calculator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct NutritionalAnalysis {
    pub total_calories: f64,
    pub macros: Macros,
    /// Total sugars in grams
    pub sugars: f64,
    pub feedback: Feedback,
}

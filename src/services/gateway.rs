// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! AI feature flows: prompt construction, contracts, and response parsing.
//!
//! Each flow builds one [`OracleRequest`], sends it, and parses the answer
//! into a typed result. Any failure becomes a [`FlowError`], which is logged
//! here and carries a message that is safe to show the user.

use rand::seq::SliceRandom;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;

use crate::models::{
    DayKeyMismatch, DayMeals, FoodAnalysis, NutritionalAnalysis, RawWorkoutPlan, Recipe,
    UserProfile, WeeklyPlan, WorkoutPlan,
};
use crate::services::contracts::{self, DayCount};
use crate::services::credits::Feature;
use crate::services::oracle::{GenerationOracle, OracleError, OracleRequest};

/// Upper bound on uploaded meal photos.
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

const SURPRISE_THEMES: [&str; 8] = [
    "a flavorful vegetarian dish",
    "a creative chicken or turkey recipe",
    "an inventive idea built on legumes such as lentils or chickpeas",
    "a light white fish dish (hake or sea bass)",
    "a comforting meal with lean beef or pork",
    "a complete, nourishing salad that works as a main course",
    "an unusual but healthy soup or cream",
    "a vegetable stir-fry with tofu or shrimp",
];

#[derive(Debug, thiserror::Error)]
pub enum FlowFailure {
    #[error(transparent)]
    Oracle(#[from] OracleError),
    #[error("response did not match contract: {0}")]
    Parse(String),
    #[error("day keys did not match request: {0}")]
    DayKeys(#[from] DayKeyMismatch),
    #[error("response was empty")]
    Empty,
}

/// A failed feature flow.
#[derive(Debug, thiserror::Error)]
#[error("{flow} flow failed: {cause}")]
pub struct FlowError {
    pub flow: Feature,
    #[source]
    pub cause: FlowFailure,
}

impl FlowError {
    fn new(flow: Feature, cause: impl Into<FlowFailure>) -> Self {
        let err = Self {
            flow,
            cause: cause.into(),
        };
        tracing::warn!(flow = %err.flow, error = %err.cause, "AI flow failed");
        err
    }

    /// Message suitable for the end user.
    pub fn user_message(&self) -> &'static str {
        match self.flow {
            Feature::Scan => "Could not analyze the image. Please try again.",
            Feature::Calculator => {
                "Could not calculate nutrition. Try again with a clearer description."
            }
            Feature::Recipe => "Could not generate recipes. Please try again.",
            Feature::WeeklyPlan => "Could not generate the weekly plan. Please try again.",
            Feature::WorkoutPlan => "Could not generate the workout plan. Please try again.",
            Feature::ChatTurn => {
                "Sorry, I'm having trouble connecting right now. Please try again later."
            }
        }
    }
}

/// Remove a Markdown code fence some models wrap around JSON.
fn strip_json_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn parse_json<T: DeserializeOwned>(raw: &str) -> Result<T, FlowFailure> {
    serde_json::from_str(strip_json_fence(raw)).map_err(|e| FlowFailure::Parse(e.to_string()))
}

/// Gateway between feature endpoints and the generation oracle.
#[derive(Clone)]
pub struct AiGateway {
    oracle: Arc<dyn GenerationOracle>,
    model: String,
    language: String,
}

impl AiGateway {
    pub fn new(oracle: Arc<dyn GenerationOracle>, model: &str, language: &str) -> Self {
        Self {
            oracle,
            model: model.to_string(),
            language: language.to_string(),
        }
    }

    fn feedback_instructions(&self, profile: &UserProfile) -> String {
        format!(
            "Then give detailed feedback for a user with health condition: {}, goal: \"{}\". \
             The feedback must include 1) an analysis of the meal's composition, \
             2) a detailed recommendation, and 3) a boolean 'is_recommended' that is true if \
             the meal is generally advisable and false if it should be avoided or eaten with \
             great caution. Answer in {}.",
            profile.condition.describe(),
            profile.goal,
            self.language
        )
    }

    async fn call<T: DeserializeOwned>(
        &self,
        flow: Feature,
        request: OracleRequest,
    ) -> Result<T, FlowError> {
        let raw = self
            .oracle
            .generate(request)
            .await
            .map_err(|e| FlowError::new(flow, e))?;
        parse_json(&raw).map_err(|e| FlowError::new(flow, e))
    }

    /// Estimate calories, macros and foods in a meal photo.
    pub async fn analyze_food_image(
        &self,
        profile: &UserProfile,
        mime_type: &str,
        image: Vec<u8>,
    ) -> Result<FoodAnalysis, FlowError> {
        let prompt = format!(
            "Analyze this photo of food. You are a nutrition expert and must answer in JSON. \
             Identify the foods in the image with their estimated weights. Estimate total \
             calories and grams of protein, carbohydrates and fat. {}",
            self.feedback_instructions(profile)
        );

        let request = OracleRequest::text(&self.model, prompt)
            .with_image(mime_type, image)
            .with_contract(contracts::food_analysis_contract());

        self.call(Feature::Scan, request).await
    }

    /// Nutrition facts for a free-text food description.
    pub async fn calculate_nutrition(
        &self,
        profile: &UserProfile,
        description: &str,
    ) -> Result<NutritionalAnalysis, FlowError> {
        let prompt = format!(
            "Calculate the nutrition information for: \"{}\". You are a nutrition expert and \
             must answer in JSON. Estimate total calories, grams of protein, carbohydrates and \
             fat, and grams of sugars. {}",
            description,
            self.feedback_instructions(profile)
        );

        let request = OracleRequest::text(&self.model, prompt)
            .with_contract(contracts::nutrition_contract());

        self.call(Feature::Calculator, request).await
    }

    /// Generate `count` recipes (1 or 2) for a free-text request.
    pub async fn generate_recipes(
        &self,
        profile: &UserProfile,
        request: &str,
        count: usize,
    ) -> Result<Vec<Recipe>, FlowError> {
        let noun = if count > 1 { "recipes" } else { "recipe" };
        let prompt = format!(
            "Given this user profile:\n{}\n\nGenerate {} {} based on this request: \"{}\". \
             Aim for variety rather than the most common ingredients. Make sure they suit \
             people with diabetes and hypertension. Instructions must be clear, easy to \
             follow and well explained. Answer in {}.",
            profile.prompt_details(),
            count,
            noun,
            request,
            self.language
        );

        let request = OracleRequest::text(&self.model, prompt)
            .with_contract(contracts::recipe_list_contract());

        let recipes: Vec<Recipe> = self.call(Feature::Recipe, request).await?;
        if recipes.is_empty() {
            return Err(FlowError::new(Feature::Recipe, FlowFailure::Empty));
        }
        Ok(recipes)
    }

    /// One recipe on a randomly chosen theme.
    pub async fn surprise_recipe(&self, profile: &UserProfile) -> Result<Vec<Recipe>, FlowError> {
        let theme = SURPRISE_THEMES
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(SURPRISE_THEMES[0]);
        tracing::debug!(theme, "Surprise recipe theme");

        let request = format!("a healthy, creative and surprising recipe based on {theme}");
        self.generate_recipes(profile, &request, 1).await
    }

    /// Meal plan for the first `days` weekdays, five meals per day.
    pub async fn weekly_plan(
        &self,
        profile: &UserProfile,
        days: DayCount,
        preferences: Option<&str>,
    ) -> Result<WeeklyPlan, FlowError> {
        let labels = contracts::weekday_labels(days);
        let preferences = preferences
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| format!(" Take these preferences and allergies into account: \"{p}\"."))
            .unwrap_or_default();

        let prompt = format!(
            "Create a {}-day meal plan ({}) for a person with this profile:\n{}\n{} \
             For each day provide 5 recipes: breakfast, morning snack, lunch, afternoon snack \
             and dinner. Snacks must be light and healthy. Every recipe MUST include a name, \
             description, ingredients, clear preparation steps and preparation time. The plan \
             must be simple, healthy and varied, designed for the health conditions above and \
             focused on controlling glucose and sodium. Avoid repeating main ingredients too \
             often. Use exactly the day names given. Answer in {}.",
            days.get(),
            labels.join(", "),
            profile.prompt_details(),
            preferences,
            self.language
        );

        let request = OracleRequest::text(&self.model, prompt)
            .with_contract(contracts::weekly_plan_contract(&labels));

        let by_day: HashMap<String, DayMeals> = self.call(Feature::WeeklyPlan, request).await?;
        WeeklyPlan::from_day_map(by_day, &labels)
            .map_err(|e| FlowError::new(Feature::WeeklyPlan, e))
    }

    /// Low-impact training plan for `days` days.
    pub async fn workout_plan(
        &self,
        profile: &UserProfile,
        focus: &str,
        days: DayCount,
    ) -> Result<WorkoutPlan, FlowError> {
        let labels = contracts::workout_day_labels(days);
        let condition = profile.condition.describe();
        let activity = profile.activity_level.describe();

        let prompt = format!(
            "Create a {days}-day workout plan for a user with this profile:\n\
             - Age: {age}\n- Health condition: {condition}\n- Health goal: \"{goal}\"\n\
             - Activity level: {activity}\n\n\
             The main focus of the routine must be: \"{focus}\".\n\n\
             CRITICAL SAFETY RULES:\n\
             1. The plan MUST be safe for someone with {condition}. Prefer low-impact \
             exercise. Avoid high intensity work, heavy lifting, or movements that can spike \
             blood pressure.\n\
             2. Always include a light warm-up before each session and gentle stretching at \
             the end, described as part of the routine.\n\
             3. The plan must be realistic for someone whose activity level is {activity}.\n\
             4. Plan {days} distinct days named {labels}.\n\
             5. Give 4 to 6 exercises per day.\n\
             6. Include at least 3 important general safety recommendations specific to \
             exercising with {condition}.\n\n\
             Answer in {language}.",
            days = days.get(),
            age = profile.age,
            goal = profile.goal,
            labels = labels.join(", "),
            language = self.language,
        );

        let request = OracleRequest::text(&self.model, prompt)
            .with_contract(contracts::workout_plan_contract(&labels));

        let raw: RawWorkoutPlan = self.call(Feature::WorkoutPlan, request).await?;
        raw.into_plan(&labels)
            .map_err(|e| FlowError::new(Feature::WorkoutPlan, e))
    }

    /// One chat turn. Only the latest message is sent.
    pub async fn chat(&self, profile: &UserProfile, message: &str) -> Result<String, FlowError> {
        let directive = format!(
            "You are NutriLife, a friendly AI assistant and nutrition expert. You are helping \
             {name}, who has {condition} and whose main goal is \"{goal}\". Be motivating and \
             clear, and give safe, evidence-based advice that is specifically relevant to \
             {name} and their conditions and goals. Always answer in {language}.",
            name = profile.name,
            condition = profile.condition.describe(),
            goal = profile.goal,
            language = self.language,
        );

        let request =
            OracleRequest::text(&self.model, message.to_string()).with_system_directive(directive);

        let reply = self
            .oracle
            .generate(request)
            .await
            .map_err(|e| FlowError::new(Feature::ChatTurn, e))?;

        let reply = reply.trim();
        if reply.is_empty() {
            return Err(FlowError::new(Feature::ChatTurn, FlowFailure::Empty));
        }
        Ok(reply.to_string())
    }
}

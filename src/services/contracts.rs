// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Response-shape contracts sent to the oracle as `responseSchema`.
//!
//! Field names match the serde names of the models they deserialize into.

use serde_json::{json, Map, Value};

use crate::models::MealSlot;

const WEEKDAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Number of plan days requested, always 1 through 7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayCount(u8);

impl DayCount {
    pub fn new(days: u32) -> Option<Self> {
        (1..=7).contains(&days).then_some(Self(days as u8))
    }

    pub fn get(self) -> usize {
        self.0 as usize
    }
}

/// Weekday labels for a meal plan, Monday first.
pub fn weekday_labels(days: DayCount) -> Vec<String> {
    WEEKDAYS[..days.get()].iter().map(|d| d.to_string()).collect()
}

/// "Day 1", "Day 2", ... for a workout schedule.
pub fn workout_day_labels(days: DayCount) -> Vec<String> {
    (1..=days.get()).map(|n| format!("Day {n}")).collect()
}

fn string(description: &str) -> Value {
    json!({ "type": "STRING", "description": description })
}

fn number(description: &str) -> Value {
    json!({ "type": "NUMBER", "description": description })
}

fn string_list(description: &str) -> Value {
    json!({ "type": "ARRAY", "items": { "type": "STRING" }, "description": description })
}

pub fn recipe_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "recipe_name": string("Recipe name"),
            "description": string("Short description of the dish"),
            "ingredients": string_list("Ingredients with quantities"),
            "instructions": string_list("Clear, easy to follow preparation steps"),
            "prep_time": string("Total preparation time"),
        },
        "required": ["recipe_name", "description", "ingredients", "instructions", "prep_time"],
        "propertyOrdering": ["recipe_name", "description", "ingredients", "instructions", "prep_time"]
    })
}

pub fn recipe_list_contract() -> Value {
    json!({ "type": "ARRAY", "items": recipe_schema() })
}

fn macros_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "protein": number("Grams of protein"),
            "carbs": number("Grams of carbohydrates"),
            "fat": number("Grams of fat"),
        },
        "required": ["protein", "carbs", "fat"]
    })
}

fn feedback_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "composition_analysis": string("Analysis of the overall composition of the meal"),
            "recommendation": string("Recommendation for the user's goal, driven by their health condition"),
            "is_recommended": {
                "type": "BOOLEAN",
                "description": "True if the meal is advisable for the user"
            },
        },
        "required": ["composition_analysis", "recommendation", "is_recommended"]
    })
}

pub fn food_analysis_contract() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "total_calories": number("Estimated total kilocalories"),
            "macros": macros_schema(),
            "identified_foods": string_list("Foods identified in the image with estimated weights, e.g. 'Chicken breast (150g)'"),
            "feedback": feedback_schema(),
        },
        "required": ["total_calories", "macros", "identified_foods", "feedback"]
    })
}

pub fn nutrition_contract() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "total_calories": number("Estimated total kilocalories"),
            "macros": macros_schema(),
            "sugars": number("Grams of total sugars"),
            "feedback": feedback_schema(),
        },
        "required": ["total_calories", "macros", "sugars", "feedback"]
    })
}

/// Schema for one day of meals: every slot is a recipe.
pub fn meal_day_schema() -> Value {
    let keys: Vec<&str> = MealSlot::ALL.iter().map(|slot| slot.key()).collect();
    let properties: Map<String, Value> = keys
        .iter()
        .map(|key| (key.to_string(), recipe_schema()))
        .collect();

    json!({
        "type": "OBJECT",
        "properties": properties,
        "required": keys,
        "propertyOrdering": keys
    })
}

/// Object schema with one required property per label, each `per_day`.
pub fn build_day_keyed_contract(labels: &[String], per_day: &Value) -> Value {
    let properties: Map<String, Value> = labels
        .iter()
        .map(|label| (label.clone(), per_day.clone()))
        .collect();

    json!({
        "type": "OBJECT",
        "properties": properties,
        "required": labels,
        "propertyOrdering": labels
    })
}

pub fn weekly_plan_contract(labels: &[String]) -> Value {
    build_day_keyed_contract(labels, &meal_day_schema())
}

fn workout_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "name": string("Exercise name"),
            "sets": string("Number of sets, e.g. '3'"),
            "repetitions": string("Repetitions or duration, e.g. '10-12' or '30 seconds'"),
            "description": string("How to perform the exercise correctly"),
            "rest": string("Rest between sets, e.g. '60 seconds'"),
        },
        "required": ["name", "sets", "repetitions", "description", "rest"]
    })
}

pub fn workout_plan_contract(labels: &[String]) -> Value {
    let per_day = json!({ "type": "ARRAY", "items": workout_schema() });
    let duration = format!("Plan length in days, e.g. '{} days'", labels.len());

    json!({
        "type": "OBJECT",
        "properties": {
            "plan_name": string("A motivating name for the plan"),
            "focus": string("Main focus of the plan"),
            "duration": string(&duration),
            "schedule": build_day_keyed_contract(labels, &per_day),
            "recommendations": string_list("Important safety recommendations"),
        },
        "required": ["plan_name", "focus", "duration", "schedule", "recommendations"]
    })
}

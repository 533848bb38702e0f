// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Weekly meal plans and workout plans.
//!
//! The oracle answers with objects keyed by day label. Those are parsed into
//! ordered lists here, checked against the exact set of requested labels.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::Recipe;

/// The five daily meal slots, in serving order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MealSlot {
    Breakfast,
    MorningSnack,
    Lunch,
    AfternoonSnack,
    Dinner,
}

impl MealSlot {
    pub const ALL: [MealSlot; 5] = [
        MealSlot::Breakfast,
        MealSlot::MorningSnack,
        MealSlot::Lunch,
        MealSlot::AfternoonSnack,
        MealSlot::Dinner,
    ];

    /// JSON key used in plan documents and contracts.
    pub fn key(self) -> &'static str {
        match self {
            MealSlot::Breakfast => "breakfast",
            MealSlot::MorningSnack => "morning_snack",
            MealSlot::Lunch => "lunch",
            MealSlot::AfternoonSnack => "afternoon_snack",
            MealSlot::Dinner => "dinner",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MealSlot::Breakfast => "Breakfast",
            MealSlot::MorningSnack => "Morning snack",
            MealSlot::Lunch => "Lunch",
            MealSlot::AfternoonSnack => "Afternoon snack",
            MealSlot::Dinner => "Dinner",
        }
    }
}

/// One day of meals. Every slot is required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DayMeals {
    pub breakfast: Recipe,
    pub morning_snack: Recipe,
    pub lunch: Recipe,
    pub afternoon_snack: Recipe,
    pub dinner: Recipe,
}

impl DayMeals {
    pub fn slot(&self, slot: MealSlot) -> &Recipe {
        match slot {
            MealSlot::Breakfast => &self.breakfast,
            MealSlot::MorningSnack => &self.morning_snack,
            MealSlot::Lunch => &self.lunch,
            MealSlot::AfternoonSnack => &self.afternoon_snack,
            MealSlot::Dinner => &self.dinner,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (MealSlot, &Recipe)> {
        MealSlot::ALL.into_iter().map(move |slot| (slot, self.slot(slot)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PlanDay {
    pub day: String,
    pub meals: DayMeals,
}

/// Meal plan for the requested days, in request order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct WeeklyPlan {
    pub days: Vec<PlanDay>,
}

/// Raised when a day-keyed oracle answer does not match the requested days.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DayKeyMismatch {
    #[error("missing day '{0}'")]
    Missing(String),
    #[error("unexpected day '{0}'")]
    Unexpected(String),
}

/// Reorder a day-keyed map into the requested label order.
///
/// The map must contain exactly the requested labels.
fn order_by_labels<T>(
    mut by_day: HashMap<String, T>,
    labels: &[String],
) -> Result<Vec<(String, T)>, DayKeyMismatch> {
    let mut ordered = Vec::with_capacity(labels.len());
    for label in labels {
        let value = by_day
            .remove(label)
            .ok_or_else(|| DayKeyMismatch::Missing(label.clone()))?;
        ordered.push((label.clone(), value));
    }

    if let Some(extra) = by_day.into_keys().next() {
        return Err(DayKeyMismatch::Unexpected(extra));
    }

    Ok(ordered)
}

impl WeeklyPlan {
    pub fn from_day_map(
        by_day: HashMap<String, DayMeals>,
        labels: &[String],
    ) -> Result<Self, DayKeyMismatch> {
        let days = order_by_labels(by_day, labels)?
            .into_iter()
            .map(|(day, meals)| PlanDay { day, meals })
            .collect();
        Ok(Self { days })
    }
}

/// A single exercise prescription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Workout {
    pub name: String,
    pub sets: String,
    pub repetitions: String,
    pub description: String,
    pub rest: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct WorkoutDay {
    pub day: String,
    pub workouts: Vec<Workout>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct WorkoutPlan {
    pub plan_name: String,
    pub focus: String,
    pub duration: String,
    pub schedule: Vec<WorkoutDay>,
    /// Safety recommendations specific to the user's condition
    pub recommendations: Vec<String>,
}

/// Workout plan exactly as the oracle returns it (schedule keyed by day).
#[derive(Debug, Deserialize)]
pub struct RawWorkoutPlan {
    pub plan_name: String,
    pub focus: String,
    pub duration: String,
    pub schedule: HashMap<String, Vec<Workout>>,
    pub recommendations: Vec<String>,
}

impl RawWorkoutPlan {
    pub fn into_plan(self, labels: &[String]) -> Result<WorkoutPlan, DayKeyMismatch> {
        let schedule = order_by_labels(self.schedule, labels)?
            .into_iter()
            .map(|(day, workouts)| WorkoutDay { day, workouts })
            .collect();

        Ok(WorkoutPlan {
            plan_name: self.plan_name,
            focus: self.focus,
            duration: self.duration,
            schedule,
            recommendations: self.recommendations,
        })
    }
}

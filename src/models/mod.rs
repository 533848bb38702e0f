// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod analysis;
pub mod chat;
pub mod habit;
pub mod notes;
pub mod plan;
pub mod profile;
pub mod recipe;

pub use analysis::{Feedback, FoodAnalysis, Macros, NutritionalAnalysis};
pub use chat::{ChatMessage, Sender};
pub use habit::{Habit, HabitList, StarTally};
pub use notes::DailyNotes;
pub use plan::{
    DayKeyMismatch, DayMeals, MealSlot, PlanDay, RawWorkoutPlan, WeeklyPlan, Workout, WorkoutDay,
    WorkoutPlan,
};
pub use profile::{ActivityLevel, Condition, Gender, Plan, ProfileDraft, UserProfile};
pub use recipe::{Recipe, SaveOutcome, SavedRecipes};

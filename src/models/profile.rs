// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! User health profile for storage and API.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// Primary medical condition the user is managing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Diabetes,
    Hypertension,
    Both,
}

impl Condition {
    /// Human-readable form used inside prompts.
    pub fn describe(self) -> &'static str {
        match self {
            Condition::Diabetes => "diabetes",
            Condition::Hypertension => "hypertension",
            Condition::Both => "diabetes and hypertension",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn describe(self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "not specified",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    Sedentary,
    Light,
    Moderate,
    Active,
    VeryActive,
}

impl ActivityLevel {
    pub fn describe(self) -> &'static str {
        match self {
            ActivityLevel::Sedentary => "sedentary (little or no exercise)",
            ActivityLevel::Light => "light (exercise 1-3 days/week)",
            ActivityLevel::Moderate => "moderate (exercise 3-5 days/week)",
            ActivityLevel::Active => "active (exercise 6-7 days/week)",
            ActivityLevel::VeryActive => "very active (physical job or intense exercise)",
        }
    }
}

/// Subscription tier. Premium users are never charged credits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum Plan {
    #[default]
    Free,
    Premium,
}

/// User profile stored per identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserProfile {
    pub name: String,
    pub condition: Condition,
    /// Free-text health goal
    pub goal: String,
    pub gender: Gender,
    pub age: u32,
    /// Body weight in kilograms
    pub weight: f64,
    /// Height in centimeters
    pub height: f64,
    pub activity_level: ActivityLevel,
    #[serde(default)]
    pub plan: Plan,
}

impl UserProfile {
    /// Multi-line profile description embedded in generation prompts.
    pub fn prompt_details(&self) -> String {
        format!(
            "- Age: {} years\n\
             - Gender: {}\n\
             - Weight: {} kg\n\
             - Height: {} cm\n\
             - Activity level: {}\n\
             - Health condition: {}\n\
             - Main goal: {}",
            self.age,
            self.gender.describe(),
            self.weight,
            self.height,
            self.activity_level.describe(),
            self.condition.describe(),
            self.goal
        )
    }

    /// Apply an edit. The plan is not editable here; it only changes via upgrade.
    pub fn apply_edit(&mut self, draft: ProfileDraft) {
        let plan = self.plan;
        *self = draft.into_profile(plan);
    }
}

/// Profile fields collected by onboarding and profile edits.
#[derive(Debug, Clone, Deserialize, Validate)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ProfileDraft {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub condition: Condition,
    #[validate(length(max = 500))]
    #[serde(default)]
    pub goal: String,
    pub gender: Gender,
    #[validate(range(min = 1, max = 120))]
    pub age: u32,
    #[validate(range(min = 1.0, max = 500.0))]
    pub weight: f64,
    #[validate(range(min = 1.0, max = 300.0))]
    pub height: f64,
    pub activity_level: ActivityLevel,
}

impl ProfileDraft {
    /// Validate field ranges and reject whitespace-only names.
    pub fn check(&self) -> Result<(), String> {
        self.validate().map_err(|e| e.to_string())?;
        if self.name.trim().is_empty() {
            return Err("name: must not be blank".to_string());
        }
        Ok(())
    }

    pub fn into_profile(self, plan: Plan) -> UserProfile {
        UserProfile {
            name: self.name.trim().to_string(),
            condition: self.condition,
            goal: self.goal.trim().to_string(),
            gender: self.gender,
            age: self.age,
            weight: self.weight,
            height: self.height,
            activity_level: self.activity_level,
            plan,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> ProfileDraft {
        ProfileDraft {
            name: "  Ana  ".to_string(),
            condition: Condition::Both,
            goal: "Lower my glucose".to_string(),
            gender: Gender::Female,
            age: 54,
            weight: 72.5,
            height: 162.0,
            activity_level: ActivityLevel::Light,
        }
    }

    #[test]
    fn test_draft_into_profile_trims_name() {
        let profile = draft().into_profile(Plan::Free);
        assert_eq!(profile.name, "Ana");
        assert_eq!(profile.plan, Plan::Free);
    }

    #[test]
    fn test_draft_rejects_blank_name_and_bad_age() {
        let mut blank = draft();
        blank.name = "   ".to_string();
        assert!(blank.check().is_err());

        let mut too_old = draft();
        too_old.age = 300;
        assert!(too_old.check().is_err());

        assert!(draft().check().is_ok());
    }

    #[test]
    fn test_edit_preserves_plan() {
        let mut profile = draft().into_profile(Plan::Premium);
        let mut edit = draft();
        edit.goal = "Walk more".to_string();
        profile.apply_edit(edit);
        assert_eq!(profile.plan, Plan::Premium);
        assert_eq!(profile.goal, "Walk more");
    }

    #[test]
    fn test_profile_serializes_snake_case_enums() {
        let profile = draft().into_profile(Plan::Free);
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["condition"], "both");
        assert_eq!(json["activity_level"], "light");
        assert_eq!(json["plan"], "free");
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Recipes and the saved-recipe collection.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// A recipe as returned by the generation oracle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Recipe {
    pub recipe_name: String,
    pub description: String,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    pub prep_time: String,
}

/// Result of trying to save a recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveOutcome {
    Saved,
    Duplicate,
}

/// Saved recipes, unique by name, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SavedRecipes(Vec<Recipe>);

impl SavedRecipes {
    pub fn new(recipes: Vec<Recipe>) -> Self {
        Self(recipes)
    }

    pub fn as_slice(&self) -> &[Recipe] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, recipe_name: &str) -> bool {
        self.0.iter().any(|r| r.recipe_name == recipe_name)
    }

    pub fn save(&mut self, recipe: Recipe) -> SaveOutcome {
        if self.contains(&recipe.recipe_name) {
            return SaveOutcome::Duplicate;
        }
        self.0.push(recipe);
        SaveOutcome::Saved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipe(name: &str) -> Recipe {
        Recipe {
            recipe_name: name.to_string(),
            description: "Light and quick".to_string(),
            ingredients: vec!["1 zucchini".to_string()],
            instructions: vec!["Slice and grill.".to_string()],
            prep_time: "10 min".to_string(),
        }
    }

    #[test]
    fn test_save_new_recipe_grows_collection() {
        let mut saved = SavedRecipes::default();
        assert_eq!(saved.save(recipe("Grilled zucchini")), SaveOutcome::Saved);
        assert_eq!(saved.save(recipe("Lentil soup")), SaveOutcome::Saved);
        assert_eq!(saved.len(), 2);
    }

    #[test]
    fn test_save_duplicate_name_is_rejected_unchanged() {
        let mut saved = SavedRecipes::default();
        saved.save(recipe("Lentil soup"));
        let before = saved.clone();

        let mut variant = recipe("Lentil soup");
        variant.description = "Different text, same name".to_string();
        assert_eq!(saved.save(variant), SaveOutcome::Duplicate);
        assert_eq!(saved, before);
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Process-local store for development and tests.
//!
//! Records are kept as JSON values so every read goes through the same
//! serialization a durable backend would.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::db::{collections, ProfileStore, StoreError};
use crate::models::{DailyNotes, HabitList, SavedRecipes, UserProfile};

#[derive(Default)]
pub struct MemoryStore {
    documents: DashMap<(&'static str, String), serde_json::Value>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage: every read and write fails while set.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store offline".to_string()));
        }
        Ok(())
    }

    fn read<T: DeserializeOwned>(
        &self,
        collection: &'static str,
        uid: &str,
    ) -> Result<Option<T>, StoreError> {
        self.check_available()?;
        let Some(value) = self.documents.get(&(collection, uid.to_string())) else {
            return Ok(None);
        };

        serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|e| StoreError::Read {
                collection,
                uid: uid.to_string(),
                message: e.to_string(),
            })
    }

    fn write<T: Serialize + ?Sized>(
        &self,
        collection: &'static str,
        uid: &str,
        value: &T,
    ) -> Result<(), StoreError> {
        self.check_available()?;
        let value = serde_json::to_value(value).map_err(|e| StoreError::Write {
            collection,
            uid: uid.to_string(),
            message: e.to_string(),
        })?;
        self.documents.insert((collection, uid.to_string()), value);
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn get_profile(&self, uid: &str) -> Result<Option<UserProfile>, StoreError> {
        self.read(collections::PROFILES, uid)
    }

    async fn set_profile(&self, uid: &str, profile: &UserProfile) -> Result<(), StoreError> {
        self.write(collections::PROFILES, uid, profile)
    }

    async fn get_habits(&self, uid: &str) -> Result<Option<HabitList>, StoreError> {
        self.read(collections::HABITS, uid)
    }

    async fn set_habits(&self, uid: &str, habits: &HabitList) -> Result<(), StoreError> {
        self.write(collections::HABITS, uid, habits)
    }

    async fn get_stars(&self, uid: &str) -> Result<Option<u32>, StoreError> {
        self.read(collections::STARS, uid)
    }

    async fn set_stars(&self, uid: &str, stars: u32) -> Result<(), StoreError> {
        self.write(collections::STARS, uid, &stars)
    }

    async fn get_credits(&self, uid: &str) -> Result<Option<u32>, StoreError> {
        self.read(collections::CREDITS, uid)
    }

    async fn set_credits(&self, uid: &str, credits: u32) -> Result<(), StoreError> {
        self.write(collections::CREDITS, uid, &credits)
    }

    async fn get_recipes(&self, uid: &str) -> Result<Option<SavedRecipes>, StoreError> {
        self.read(collections::RECIPES, uid)
    }

    async fn set_recipes(&self, uid: &str, recipes: &SavedRecipes) -> Result<(), StoreError> {
        self.write(collections::RECIPES, uid, recipes)
    }

    async fn get_notes(&self, uid: &str) -> Result<Option<DailyNotes>, StoreError> {
        self.read(collections::NOTES, uid)
    }

    async fn set_notes(&self, uid: &str, notes: &DailyNotes) -> Result<(), StoreError> {
        self.write(collections::NOTES, uid, notes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{load_records, save_records, RecordsSnapshot};
    use crate::models::{ActivityLevel, Condition, Gender, Plan};

    fn profile() -> UserProfile {
        UserProfile {
            name: "Luis".to_string(),
            condition: Condition::Hypertension,
            goal: "Reduce sodium".to_string(),
            gender: Gender::Male,
            age: 61,
            weight: 88.0,
            height: 175.0,
            activity_level: ActivityLevel::Sedentary,
            plan: Plan::Free,
        }
    }

    #[tokio::test]
    async fn test_missing_profile_skips_dependent_records() {
        let store = MemoryStore::new();
        store.set_credits("uid-1", 4).await.unwrap();

        let records = load_records(&store, "uid-1").await.unwrap();
        assert!(records.profile.is_none());
        assert!(records.credits.is_none());
    }

    #[tokio::test]
    async fn test_save_and_load_records_round_trip() {
        let store = MemoryStore::new();
        let mut habits = HabitList::default();
        habits.add("Walk", 100);

        let snapshot = RecordsSnapshot {
            profile: profile(),
            habits: habits.clone(),
            stars: 2,
            credits: 5,
            recipes: SavedRecipes::default(),
        };
        save_records(&store, "uid-1", &snapshot).await.unwrap();

        let records = load_records(&store, "uid-1").await.unwrap();
        assert_eq!(records.profile, Some(profile()));
        assert_eq!(records.habits, Some(habits));
        assert_eq!(records.stars, Some(2));
        assert_eq!(records.credits, Some(5));
        assert!(records.notes.is_none());
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_reads_and_writes() {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        assert!(store.get_profile("uid-1").await.is_err());
        assert!(store.set_stars("uid-1", 1).await.is_err());

        store.set_unavailable(false);
        assert!(store.set_stars("uid-1", 1).await.is_ok());
        assert_eq!(store.document_count(), 1);
    }
}

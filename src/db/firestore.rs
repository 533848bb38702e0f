// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! One collection per record kind, one document per identity (document ID is
//! the identity uid). Scalar and list records are wrapped in small documents
//! because Firestore documents must be maps.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::db::{collections, ProfileStore, StoreError};
use crate::models::{DailyNotes, HabitList, SavedRecipes, UserProfile};

#[derive(Serialize, Deserialize)]
struct HabitsDocument {
    habits: HabitList,
}

#[derive(Serialize, Deserialize)]
struct CounterDocument {
    value: u32,
}

#[derive(Serialize, Deserialize)]
struct RecipesDocument {
    recipes: SavedRecipes,
}

#[derive(Serialize, Deserialize)]
struct NotesDocument {
    notes: DailyNotes,
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, StoreError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id).await.map_err(|e| {
            StoreError::Unavailable(format!("Failed to connect to Firestore: {}", e))
        })?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, StoreError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            StoreError::Unavailable(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create an offline client. Every operation returns `StoreError::Unavailable`.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, StoreError> {
        self.client
            .as_ref()
            .ok_or_else(|| StoreError::Unavailable("Database not connected (offline mode)".to_string()))
    }

    async fn read<T>(&self, collection: &'static str, uid: &str) -> Result<Option<T>, StoreError>
    where
        T: DeserializeOwned + Send,
    {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collection)
            .obj()
            .one(uid)
            .await
            .map_err(|e| StoreError::Read {
                collection,
                uid: uid.to_string(),
                message: e.to_string(),
            })
    }

    async fn write<T>(&self, collection: &'static str, uid: &str, document: &T) -> Result<(), StoreError>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
    {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collection)
            .document_id(uid)
            .object(document)
            .execute()
            .await
            .map_err(|e| StoreError::Write {
                collection,
                uid: uid.to_string(),
                message: e.to_string(),
            })?;
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for FirestoreDb {
    // ─── Profile ─────────────────────────────────────────────────

    async fn get_profile(&self, uid: &str) -> Result<Option<UserProfile>, StoreError> {
        self.read(collections::PROFILES, uid).await
    }

    async fn set_profile(&self, uid: &str, profile: &UserProfile) -> Result<(), StoreError> {
        self.write(collections::PROFILES, uid, profile).await
    }

    // ─── Habits & Stars ──────────────────────────────────────────

    async fn get_habits(&self, uid: &str) -> Result<Option<HabitList>, StoreError> {
        let doc: Option<HabitsDocument> = self.read(collections::HABITS, uid).await?;
        Ok(doc.map(|d| d.habits))
    }

    async fn set_habits(&self, uid: &str, habits: &HabitList) -> Result<(), StoreError> {
        let doc = HabitsDocument {
            habits: habits.clone(),
        };
        self.write(collections::HABITS, uid, &doc).await
    }

    async fn get_stars(&self, uid: &str) -> Result<Option<u32>, StoreError> {
        let doc: Option<CounterDocument> = self.read(collections::STARS, uid).await?;
        Ok(doc.map(|d| d.value))
    }

    async fn set_stars(&self, uid: &str, stars: u32) -> Result<(), StoreError> {
        self.write(collections::STARS, uid, &CounterDocument { value: stars })
            .await
    }

    // ─── Credits ─────────────────────────────────────────────────

    async fn get_credits(&self, uid: &str) -> Result<Option<u32>, StoreError> {
        let doc: Option<CounterDocument> = self.read(collections::CREDITS, uid).await?;
        Ok(doc.map(|d| d.value))
    }

    async fn set_credits(&self, uid: &str, credits: u32) -> Result<(), StoreError> {
        self.write(collections::CREDITS, uid, &CounterDocument { value: credits })
            .await
    }

    // ─── Recipes & Notes ─────────────────────────────────────────

    async fn get_recipes(&self, uid: &str) -> Result<Option<SavedRecipes>, StoreError> {
        let doc: Option<RecipesDocument> = self.read(collections::RECIPES, uid).await?;
        Ok(doc.map(|d| d.recipes))
    }

    async fn set_recipes(&self, uid: &str, recipes: &SavedRecipes) -> Result<(), StoreError> {
        let doc = RecipesDocument {
            recipes: recipes.clone(),
        };
        self.write(collections::RECIPES, uid, &doc).await
    }

    async fn get_notes(&self, uid: &str) -> Result<Option<DailyNotes>, StoreError> {
        let doc: Option<NotesDocument> = self.read(collections::NOTES, uid).await?;
        Ok(doc.map(|d| d.notes))
    }

    async fn set_notes(&self, uid: &str, notes: &DailyNotes) -> Result<(), StoreError> {
        let doc = NotesDocument {
            notes: notes.clone(),
        };
        self.write(collections::NOTES, uid, &doc).await
    }
}

//! Durable per-identity storage (Firestore or in-memory).
//!
//! Each identity owns six records: profile, habits, stars, credits,
//! saved recipes and daily notes. Absence of the profile record means the
//! identity has not finished onboarding.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryStore;

use async_trait::async_trait;

use crate::models::{DailyNotes, HabitList, SavedRecipes, UserProfile};

/// Collection names as constants.
pub mod collections {
    pub const PROFILES: &str = "profiles";
    pub const HABITS: &str = "habits";
    pub const STARS: &str = "stars";
    pub const CREDITS: &str = "credits";
    pub const RECIPES: &str = "recipes";
    pub const NOTES: &str = "notes";
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("failed to read {collection}/{uid}: {message}")]
    Read {
        collection: &'static str,
        uid: String,
        message: String,
    },

    #[error("failed to write {collection}/{uid}: {message}")]
    Write {
        collection: &'static str,
        uid: String,
        message: String,
    },
}

/// Storage port for per-identity records.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, uid: &str) -> Result<Option<UserProfile>, StoreError>;
    async fn set_profile(&self, uid: &str, profile: &UserProfile) -> Result<(), StoreError>;

    async fn get_habits(&self, uid: &str) -> Result<Option<HabitList>, StoreError>;
    async fn set_habits(&self, uid: &str, habits: &HabitList) -> Result<(), StoreError>;

    async fn get_stars(&self, uid: &str) -> Result<Option<u32>, StoreError>;
    async fn set_stars(&self, uid: &str, stars: u32) -> Result<(), StoreError>;

    async fn get_credits(&self, uid: &str) -> Result<Option<u32>, StoreError>;
    async fn set_credits(&self, uid: &str, credits: u32) -> Result<(), StoreError>;

    async fn get_recipes(&self, uid: &str) -> Result<Option<SavedRecipes>, StoreError>;
    async fn set_recipes(&self, uid: &str, recipes: &SavedRecipes) -> Result<(), StoreError>;

    async fn get_notes(&self, uid: &str) -> Result<Option<DailyNotes>, StoreError>;
    async fn set_notes(&self, uid: &str, notes: &DailyNotes) -> Result<(), StoreError>;
}

/// Records read at session activation. `None` means the record was never written.
#[derive(Debug, Clone, Default)]
pub struct StoredRecords {
    pub profile: Option<UserProfile>,
    pub habits: Option<HabitList>,
    pub stars: Option<u32>,
    pub credits: Option<u32>,
    pub recipes: Option<SavedRecipes>,
    pub notes: Option<DailyNotes>,
}

/// The five records written back on every session mutation.
#[derive(Debug, Clone)]
pub struct RecordsSnapshot {
    pub profile: UserProfile,
    pub habits: HabitList,
    pub stars: u32,
    pub credits: u32,
    pub recipes: SavedRecipes,
}

/// Read every record for an identity.
///
/// Dependent collections are only read when a profile exists.
pub async fn load_records(store: &dyn ProfileStore, uid: &str) -> Result<StoredRecords, StoreError> {
    let Some(profile) = store.get_profile(uid).await? else {
        return Ok(StoredRecords::default());
    };

    Ok(StoredRecords {
        profile: Some(profile),
        habits: store.get_habits(uid).await?,
        stars: store.get_stars(uid).await?,
        credits: store.get_credits(uid).await?,
        recipes: store.get_recipes(uid).await?,
        notes: store.get_notes(uid).await?,
    })
}

/// Write all five session records.
///
/// Every record is attempted; the first failure is returned. There is no
/// atomicity across records.
pub async fn save_records(
    store: &dyn ProfileStore,
    uid: &str,
    snapshot: &RecordsSnapshot,
) -> Result<(), StoreError> {
    let results = [
        store.set_profile(uid, &snapshot.profile).await,
        store.set_habits(uid, &snapshot.habits).await,
        store.set_stars(uid, snapshot.stars).await,
        store.set_credits(uid, snapshot.credits).await,
        store.set_recipes(uid, &snapshot.recipes).await,
    ];

    results.into_iter().collect()
}

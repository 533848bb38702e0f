// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-identity session state and its lifecycle.
//!
//! Each signed-in identity owns one [`SessionState`] behind a
//! `tokio::sync::Mutex`. The lock is never held across an oracle call:
//! [`SessionController::run_gated`] snapshots the profile, releases the lock,
//! awaits the call, and re-locks only to charge credits and record results.
//!
//! Every mutation while active is written back to the [`ProfileStore`].
//! Store failures are logged and otherwise ignored. Since the store holds
//! everything but the chat transcript, idle sessions can be evicted and
//! are restored on next use.

use chrono::NaiveDate;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::db::{load_records, save_records, ProfileStore, RecordsSnapshot, StoredRecords};
use crate::error::{AppError, Result};
use crate::models::{
    ChatMessage, DailyNotes, Habit, HabitList, Plan, ProfileDraft, Recipe, SaveOutcome,
    SavedRecipes, StarTally, UserProfile,
};
use crate::services::credits::{CreditLedger, Feature, FeatureGate, GateDecision, STARTING_CREDITS};
use crate::services::gateway::FlowError;
use crate::services::google_identity::Identity;
use crate::time_utils::now_millis;

/// Loaded sessions untouched for this long are dropped from memory.
pub const SESSION_IDLE_TTL: Duration = Duration::from_secs(2 * 60 * 60);

fn unix_now() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}

/// Top-level navigation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum View {
    Welcome,
    Onboarding,
    Profile,
    Dashboard,
    Habits,
    Scanner,
    Calculator,
    Recipes,
    SavedRecipes,
    WeeklyPlan,
    Coach,
    Chat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Unauthenticated,
    Onboarding,
    Active,
}

/// Everything known about one signed-in identity.
#[derive(Debug)]
pub struct SessionState {
    identity: Identity,
    profile: Option<UserProfile>,
    habits: HabitList,
    stars: StarTally,
    ledger: CreditLedger,
    recipes: SavedRecipes,
    notes: DailyNotes,
    transcript: Vec<ChatMessage>,
    view: View,
}

impl SessionState {
    fn from_records(identity: Identity, records: StoredRecords) -> Self {
        let Some(profile) = records.profile else {
            return Self::onboarding(identity);
        };

        let balance = records.credits.unwrap_or(match profile.plan {
            Plan::Free => STARTING_CREDITS,
            Plan::Premium => 0,
        });

        Self {
            ledger: CreditLedger::new(profile.plan, balance),
            habits: records.habits.unwrap_or_default(),
            stars: StarTally::new(records.stars.unwrap_or(0)),
            recipes: records.recipes.unwrap_or_default(),
            notes: records.notes.unwrap_or_default(),
            transcript: vec![ChatMessage::greeting(&profile.name)],
            view: View::Dashboard,
            profile: Some(profile),
            identity,
        }
    }

    fn onboarding(identity: Identity) -> Self {
        Self {
            identity,
            profile: None,
            habits: HabitList::default(),
            stars: StarTally::default(),
            ledger: CreditLedger::new(Plan::Free, 0),
            recipes: SavedRecipes::default(),
            notes: DailyNotes::default(),
            transcript: Vec::new(),
            view: View::Onboarding,
        }
    }

    pub fn phase(&self) -> Phase {
        if self.profile.is_some() {
            Phase::Active
        } else {
            Phase::Onboarding
        }
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn profile(&self) -> Option<&UserProfile> {
        self.profile.as_ref()
    }

    pub fn credits(&self) -> u32 {
        self.ledger.balance()
    }

    pub fn stars(&self) -> u32 {
        self.stars.get()
    }

    pub fn habits(&self) -> &HabitList {
        &self.habits
    }

    pub fn recipes(&self) -> &SavedRecipes {
        &self.recipes
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    fn active_profile(&self) -> Result<&UserProfile> {
        self.profile
            .as_ref()
            .ok_or_else(|| AppError::InvalidPhase("complete onboarding first".to_string()))
    }

    fn active_profile_mut(&mut self) -> Result<&mut UserProfile> {
        self.profile
            .as_mut()
            .ok_or_else(|| AppError::InvalidPhase("complete onboarding first".to_string()))
    }

    fn snapshot(&self) -> Option<RecordsSnapshot> {
        Some(RecordsSnapshot {
            profile: self.profile.clone()?,
            habits: self.habits.clone(),
            stars: self.stars.get(),
            credits: self.ledger.balance(),
            recipes: self.recipes.clone(),
        })
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            phase: self.phase(),
            view: self.view,
            uid: self.identity.uid.clone(),
            display_name: self.identity.display_name.clone(),
            profile: self.profile.clone(),
            credits: self.ledger.balance(),
            stars: self.stars.get(),
        }
    }
}

/// Session status as reported to the client.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub phase: Phase,
    pub view: View,
    pub uid: String,
    pub display_name: String,
    pub profile: Option<UserProfile>,
    pub credits: u32,
    pub stars: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct HabitsSnapshot {
    pub habits: HabitList,
    pub stars: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub name: String,
    pub plan: Plan,
    pub credits: u32,
    pub stars: u32,
    pub habits_completed: usize,
    pub habits_total: usize,
    pub month: String,
    pub notes: BTreeMap<String, String>,
}

/// Result of a credit-gated call along with the balance after charging.
#[derive(Debug, Clone, Serialize)]
pub struct Gated<T> {
    pub result: T,
    pub credits: u32,
}

/// Removes the in-flight marker for a feature when dropped.
struct InFlightGuard<'a> {
    in_flight: &'a DashMap<(String, Feature), ()>,
    key: (String, Feature),
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.remove(&self.key);
    }
}

/// Credits set aside for one in-flight call. Released when dropped.
struct CreditHold<'a> {
    held: &'a DashMap<String, u32>,
    uid: String,
    amount: u32,
}

impl Drop for CreditHold<'_> {
    fn drop(&mut self) {
        if self.amount == 0 {
            return;
        }
        if let Entry::Occupied(mut held) = self.held.entry(self.uid.clone()) {
            let left = held.get().saturating_sub(self.amount);
            if left == 0 {
                held.remove();
            } else {
                *held.get_mut() = left;
            }
        }
    }
}

/// A loaded session and when it was last resolved (unix seconds).
struct SessionSlot {
    state: Arc<Mutex<SessionState>>,
    last_seen: AtomicU64,
}

impl SessionSlot {
    fn new(state: SessionState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
            last_seen: AtomicU64::new(unix_now()),
        }
    }

    fn touch(&self) -> Arc<Mutex<SessionState>> {
        self.last_seen.store(unix_now(), Ordering::Relaxed);
        self.state.clone()
    }
}

pub struct SessionController {
    store: Arc<dyn ProfileStore>,
    sessions: DashMap<String, SessionSlot>,
    in_flight: DashMap<(String, Feature), ()>,
    /// Credits held by in-flight gated calls, per uid.
    held: DashMap<String, u32>,
    /// Signed-out session token IDs, with their expiry (unix seconds).
    revoked: DashMap<String, u64>,
    idle_ttl: Duration,
}

impl SessionController {
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self::with_idle_ttl(store, SESSION_IDLE_TTL)
    }

    pub fn with_idle_ttl(store: Arc<dyn ProfileStore>, idle_ttl: Duration) -> Self {
        Self {
            store,
            sessions: DashMap::new(),
            in_flight: DashMap::new(),
            held: DashMap::new(),
            revoked: DashMap::new(),
            idle_ttl,
        }
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Drop sessions not resolved within the idle TTL and return how many
    /// were evicted. A session someone still holds is kept.
    pub fn evict_idle(&self) -> usize {
        let now = unix_now();
        let ttl = self.idle_ttl.as_secs();
        let before = self.sessions.len();

        self.sessions.retain(|_, slot| {
            let idle = now.saturating_sub(slot.last_seen.load(Ordering::Relaxed));
            idle < ttl || Arc::strong_count(&slot.state) > 1
        });

        let evicted = before.saturating_sub(self.sessions.len());
        if evicted > 0 {
            tracing::debug!(evicted, "Evicted idle sessions");
        }
        evicted
    }

    /// Load (or return the already loaded) state for an identity.
    pub async fn resolve(&self, identity: &Identity) -> Arc<Mutex<SessionState>> {
        if let Some(slot) = self.sessions.get(&identity.uid) {
            return slot.touch();
        }
        self.evict_idle();

        let records = match load_records(self.store.as_ref(), &identity.uid).await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(uid = %identity.uid, error = %e, "Failed to load records; using defaults");
                StoredRecords::default()
            }
        };

        let state = SessionState::from_records(identity.clone(), records);
        tracing::info!(uid = %identity.uid, phase = ?state.phase(), "Session resolved");

        // A concurrent resolve may have won; keep whichever was stored first.
        self.sessions
            .entry(identity.uid.clone())
            .or_insert_with(|| SessionSlot::new(state))
            .touch()
    }

    pub async fn summary(&self, identity: &Identity) -> SessionSummary {
        let session = self.resolve(identity).await;
        let state = session.lock().await;
        state.summary()
    }

    async fn persist(&self, state: &SessionState) {
        let Some(snapshot) = state.snapshot() else {
            return;
        };
        if let Err(e) = save_records(self.store.as_ref(), &state.identity.uid, &snapshot).await {
            tracing::warn!(uid = %state.identity.uid, error = %e, "Failed to persist session records");
        }
    }

    async fn persist_notes(&self, state: &SessionState) {
        if let Err(e) = self.store.set_notes(&state.identity.uid, &state.notes).await {
            tracing::warn!(uid = %state.identity.uid, error = %e, "Failed to persist notes");
        }
    }

    /// Apply `change` to an active session and write the records back.
    async fn mutate<T>(
        &self,
        identity: &Identity,
        change: impl FnOnce(&mut SessionState) -> Result<T>,
    ) -> Result<T> {
        let session = self.resolve(identity).await;
        let mut state = session.lock().await;
        state.active_profile()?;
        let value = change(&mut state)?;
        self.persist(&state).await;
        Ok(value)
    }

    /// Read from an active session.
    async fn read<T>(
        &self,
        identity: &Identity,
        view: impl FnOnce(&SessionState) -> T,
    ) -> Result<T> {
        let session = self.resolve(identity).await;
        let state = session.lock().await;
        state.active_profile()?;
        Ok(view(&state))
    }

    // ─── Lifecycle ───────────────────────────────────────────────

    pub async fn complete_onboarding(
        &self,
        identity: &Identity,
        draft: ProfileDraft,
    ) -> Result<SessionSummary> {
        draft.check().map_err(AppError::BadRequest)?;

        let session = self.resolve(identity).await;
        let mut state = session.lock().await;
        if state.phase() != Phase::Onboarding {
            return Err(AppError::InvalidPhase("onboarding already completed".to_string()));
        }

        let profile = draft.into_profile(Plan::Free);
        state.transcript = vec![ChatMessage::greeting(&profile.name)];
        state.profile = Some(profile);
        state.ledger = CreditLedger::new(Plan::Free, STARTING_CREDITS);
        state.view = View::Habits;

        tracing::info!(uid = %identity.uid, "Onboarding completed");
        self.persist(&state).await;
        Ok(state.summary())
    }

    /// Drop all in-memory state for the identity. Returns the next view.
    pub fn sign_out(&self, identity: &Identity) -> View {
        if self.sessions.remove(&identity.uid).is_some() {
            tracing::info!(uid = %identity.uid, "Signed out");
        }
        View::Welcome
    }

    /// Reject a session token for the rest of its lifetime.
    pub fn revoke_token(&self, sid: &str, expires_at: u64) {
        let now = unix_now();
        self.revoked.retain(|_, exp| *exp > now);
        self.revoked.insert(sid.to_string(), expires_at);
    }

    pub fn is_revoked(&self, sid: &str) -> bool {
        self.revoked.contains_key(sid)
    }

    pub async fn navigate(&self, identity: &Identity, view: View) -> Result<View> {
        let session = self.resolve(identity).await;
        let mut state = session.lock().await;

        let allowed = match state.phase() {
            Phase::Onboarding => view == View::Onboarding,
            Phase::Active => !matches!(view, View::Welcome | View::Onboarding),
            Phase::Unauthenticated => view == View::Welcome,
        };
        if !allowed {
            return Err(AppError::InvalidPhase(format!(
                "view {:?} is not reachable from {:?}",
                view,
                state.phase()
            )));
        }

        state.view = view;
        Ok(view)
    }

    // ─── Profile ─────────────────────────────────────────────────

    pub async fn profile(&self, identity: &Identity) -> Result<UserProfile> {
        let session = self.resolve(identity).await;
        let state = session.lock().await;
        state.active_profile().cloned()
    }

    pub async fn update_profile(
        &self,
        identity: &Identity,
        draft: ProfileDraft,
    ) -> Result<UserProfile> {
        draft.check().map_err(AppError::BadRequest)?;
        self.mutate(identity, |state| {
            let profile = state.active_profile_mut()?;
            profile.apply_edit(draft);
            Ok(profile.clone())
        })
        .await
    }

    pub async fn upgrade(&self, identity: &Identity) -> Result<UserProfile> {
        let profile = self
            .mutate(identity, |state| {
                let profile = state.active_profile_mut()?;
                profile.plan = Plan::Premium;
                let profile = profile.clone();
                state.ledger.set_plan(Plan::Premium);
                Ok(profile)
            })
            .await?;
        tracing::info!(uid = %identity.uid, "Upgraded to premium");
        Ok(profile)
    }

    // ─── Habits ──────────────────────────────────────────────────

    pub async fn habits(&self, identity: &Identity) -> Result<HabitsSnapshot> {
        self.read(identity, |state| HabitsSnapshot {
            habits: state.habits.clone(),
            stars: state.stars.get(),
        })
        .await
    }

    pub async fn add_habit(&self, identity: &Identity, text: &str) -> Result<Habit> {
        self.mutate(identity, |state| {
            state
                .habits
                .add(text, now_millis())
                .cloned()
                .ok_or_else(|| AppError::BadRequest("habit text must not be empty".to_string()))
        })
        .await
    }

    pub async fn toggle_habit(&self, identity: &Identity, id: u64) -> Result<HabitsSnapshot> {
        self.mutate(identity, |state| {
            let delta = state
                .habits
                .toggle(id)
                .ok_or_else(|| AppError::NotFound(format!("habit {id}")))?;
            state.stars.apply(delta);
            Ok(HabitsSnapshot {
                habits: state.habits.clone(),
                stars: state.stars.get(),
            })
        })
        .await
    }

    /// Remove a habit. The star tally is left as is.
    pub async fn delete_habit(&self, identity: &Identity, id: u64) -> Result<HabitsSnapshot> {
        self.mutate(identity, |state| {
            state
                .habits
                .remove(id)
                .ok_or_else(|| AppError::NotFound(format!("habit {id}")))?;
            Ok(HabitsSnapshot {
                habits: state.habits.clone(),
                stars: state.stars.get(),
            })
        })
        .await
    }

    // ─── Recipes & notes ─────────────────────────────────────────

    pub async fn saved_recipes(&self, identity: &Identity) -> Result<SavedRecipes> {
        self.read(identity, |state| state.recipes.clone()).await
    }

    pub async fn save_recipe(&self, identity: &Identity, recipe: Recipe) -> Result<SaveOutcome> {
        if recipe.recipe_name.trim().is_empty() {
            return Err(AppError::BadRequest("recipe name must not be empty".to_string()));
        }
        self.mutate(identity, |state| Ok(state.recipes.save(recipe)))
            .await
    }

    pub async fn notes_for_month(
        &self,
        identity: &Identity,
        year: i32,
        month: u32,
    ) -> Result<BTreeMap<String, String>> {
        self.read(identity, |state| state.notes.for_month(year, month))
            .await
    }

    pub async fn save_note(&self, identity: &Identity, date: NaiveDate, text: &str) -> Result<()> {
        let session = self.resolve(identity).await;
        let mut state = session.lock().await;
        state.active_profile()?;
        state.notes.set(date, text);
        self.persist_notes(&state).await;
        Ok(())
    }

    pub async fn dashboard(&self, identity: &Identity, year: i32, month: u32) -> Result<Dashboard> {
        self.read(identity, |state| {
            let (name, plan) = state
                .profile
                .as_ref()
                .map(|p| (p.name.clone(), p.plan))
                .unwrap_or_default();
            Dashboard {
                name,
                plan,
                credits: state.ledger.balance(),
                stars: state.stars.get(),
                habits_completed: state.habits.completed_count(),
                habits_total: state.habits.len(),
                month: format!("{year:04}-{month:02}"),
                notes: state.notes.for_month(year, month),
            }
        })
        .await
    }

    pub async fn transcript(&self, identity: &Identity) -> Result<Vec<ChatMessage>> {
        self.read(identity, |state| state.transcript.clone()).await
    }

    // ─── Gated features ──────────────────────────────────────────

    fn begin_flight(&self, uid: &str, feature: Feature) -> Result<InFlightGuard<'_>> {
        let key = (uid.to_string(), feature);
        match self.in_flight.entry(key.clone()) {
            Entry::Occupied(_) => Err(AppError::FeatureBusy(feature)),
            Entry::Vacant(slot) => {
                slot.insert(());
                Ok(InFlightGuard {
                    in_flight: &self.in_flight,
                    key,
                })
            }
        }
    }

    fn hold_credits(&self, uid: &str, amount: u32) -> CreditHold<'_> {
        if amount > 0 {
            *self.held.entry(uid.to_string()).or_insert(0) += amount;
        }
        CreditHold {
            held: &self.held,
            uid: uid.to_string(),
            amount,
        }
    }

    fn held_credits(&self, uid: &str) -> u32 {
        self.held.get(uid).map(|held| *held).unwrap_or(0)
    }

    /// Run a credit-metered feature call.
    ///
    /// The feature's cost is held from the gate check until the call ends.
    /// Credits are charged only when `call` succeeds; `record` then runs
    /// under the session lock to store any result in the session.
    pub async fn run_gated<T, F, Fut>(
        &self,
        identity: &Identity,
        feature: Feature,
        call: F,
        record: impl FnOnce(&mut SessionState, &T),
    ) -> Result<Gated<T>>
    where
        F: FnOnce(UserProfile) -> Fut,
        Fut: Future<Output = std::result::Result<T, FlowError>>,
    {
        let _flight = self.begin_flight(&identity.uid, feature)?;

        let (profile, permit, hold) = {
            let session = self.resolve(identity).await;
            let state = session.lock().await;
            let profile = state.active_profile()?.clone();
            let held = self.held_credits(&identity.uid);
            match FeatureGate::try_consume(feature, &state.ledger, held) {
                GateDecision::Allowed(permit) => {
                    let hold = self.hold_credits(&identity.uid, permit.hold());
                    (profile, permit, hold)
                }
                GateDecision::Denied { required, balance } => {
                    tracing::info!(uid = %identity.uid, feature = %feature, required, balance, "Feature denied");
                    return Err(AppError::InsufficientCredits { required, balance });
                }
            }
        };

        let result = call(profile)
            .await
            .map_err(|e| AppError::Generation(e.user_message().to_string()))?;

        // Sign-out or eviction may have replaced the session during the call.
        let session = self.resolve(identity).await;
        let mut state = session.lock().await;
        let credits = permit.commit(&mut state.ledger);
        drop(hold);
        record(&mut state, &result);
        self.persist(&state).await;

        tracing::debug!(uid = %identity.uid, feature = %feature, credits, "Feature call charged");
        Ok(Gated { result, credits })
    }

    /// Append a completed chat exchange to the transcript.
    pub fn record_chat(state: &mut SessionState, message: &str, reply: &str) {
        state.transcript.push(ChatMessage::user(message));
        state.transcript.push(ChatMessage::ai(reply));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::{ActivityLevel, Condition, Gender};
    use crate::services::gateway::FlowFailure;
    use crate::services::oracle::OracleError;
    use std::time::Duration;

    fn identity() -> Identity {
        Identity {
            uid: "uid-1".to_string(),
            display_name: "Ana".to_string(),
            email: None,
        }
    }

    fn draft() -> ProfileDraft {
        ProfileDraft {
            name: "Ana".to_string(),
            condition: Condition::Diabetes,
            goal: "Lower glucose".to_string(),
            gender: Gender::Female,
            age: 45,
            weight: 68.0,
            height: 165.0,
            activity_level: ActivityLevel::Light,
        }
    }

    fn controller() -> (SessionController, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (SessionController::new(store.clone()), store)
    }

    async fn onboarded() -> (SessionController, Arc<MemoryStore>) {
        let (controller, store) = controller();
        controller
            .complete_onboarding(&identity(), draft())
            .await
            .unwrap();
        (controller, store)
    }

    async fn succeed(controller: &SessionController, feature: Feature) -> Result<Gated<u8>> {
        controller
            .run_gated(&identity(), feature, |_| async { Ok(1u8) }, |_, _| {})
            .await
    }

    #[tokio::test]
    async fn test_new_identity_starts_onboarding() {
        let (controller, _) = controller();
        let summary = controller.summary(&identity()).await;
        assert_eq!(summary.phase, Phase::Onboarding);
        assert_eq!(summary.view, View::Onboarding);
        assert!(summary.profile.is_none());
    }

    #[tokio::test]
    async fn test_onboarding_grants_credits_and_persists() {
        let (controller, store) = onboarded().await;
        let summary = controller.summary(&identity()).await;
        assert_eq!(summary.phase, Phase::Active);
        assert_eq!(summary.view, View::Habits);
        assert_eq!(summary.credits, 7);
        assert_eq!(store.get_credits("uid-1").await.unwrap(), Some(7));
        assert_eq!(
            store.get_profile("uid-1").await.unwrap().unwrap().plan,
            Plan::Free
        );
    }

    #[tokio::test]
    async fn test_onboarding_twice_is_rejected() {
        let (controller, _) = onboarded().await;
        assert!(matches!(
            controller.complete_onboarding(&identity(), draft()).await,
            Err(AppError::InvalidPhase(_))
        ));
    }

    #[tokio::test]
    async fn test_navigation_rules() {
        let (controller, _) = controller();
        assert!(controller.navigate(&identity(), View::Chat).await.is_err());
        assert!(controller
            .navigate(&identity(), View::Onboarding)
            .await
            .is_ok());

        controller
            .complete_onboarding(&identity(), draft())
            .await
            .unwrap();
        assert_eq!(
            controller.navigate(&identity(), View::Chat).await.unwrap(),
            View::Chat
        );
        assert!(controller.navigate(&identity(), View::Welcome).await.is_err());
        assert!(controller
            .navigate(&identity(), View::Onboarding)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_credit_scenario() {
        let (controller, store) = onboarded().await;

        for _ in 0..4 {
            succeed(&controller, Feature::Scan).await.unwrap();
        }
        assert_eq!(controller.summary(&identity()).await.credits, 3);

        let gated = succeed(&controller, Feature::WeeklyPlan).await.unwrap();
        assert_eq!(gated.credits, 0);

        let denied = succeed(&controller, Feature::ChatTurn).await;
        assert!(matches!(
            denied,
            Err(AppError::InsufficientCredits {
                required: 1,
                balance: 0
            })
        ));
        assert_eq!(store.get_credits("uid-1").await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn test_failed_call_is_not_charged() {
        let (controller, _) = onboarded().await;
        let result: Result<Gated<u8>> = controller
            .run_gated(
                &identity(),
                Feature::Scan,
                |_| async {
                    Err(FlowError {
                        flow: Feature::Scan,
                        cause: FlowFailure::Oracle(OracleError::EmptyResponse),
                    })
                },
                |_, _| {},
            )
            .await;

        assert!(matches!(result, Err(AppError::Generation(_))));
        assert_eq!(controller.summary(&identity()).await.credits, 7);
    }

    #[tokio::test]
    async fn test_premium_is_never_charged() {
        let (controller, _) = onboarded().await;
        controller.upgrade(&identity()).await.unwrap();
        for _ in 0..5 {
            succeed(&controller, Feature::WorkoutPlan).await.unwrap();
        }
        assert_eq!(controller.summary(&identity()).await.credits, 7);
    }

    #[tokio::test]
    async fn test_gated_call_before_onboarding_is_invalid_phase() {
        let (controller, _) = controller();
        assert!(matches!(
            succeed(&controller, Feature::Scan).await,
            Err(AppError::InvalidPhase(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_same_feature_is_busy() {
        let (controller, _) = onboarded().await;
        let ident = identity();
        let slow = controller.run_gated(
            &ident,
            Feature::Recipe,
            |_| async {
                tokio::time::sleep(Duration::from_millis(100)).await;
                Ok(1u8)
            },
            |_, _| {},
        );
        let fast = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            succeed(&controller, Feature::Recipe).await
        };

        let (slow, fast) = tokio::join!(slow, fast);
        assert!(slow.is_ok());
        assert!(matches!(fast, Err(AppError::FeatureBusy(Feature::Recipe))));

        // A different feature is unaffected, and the marker is cleared.
        succeed(&controller, Feature::Scan).await.unwrap();
        succeed(&controller, Feature::Recipe).await.unwrap();
    }

    async fn slow_call(
        controller: &SessionController,
        identity: &Identity,
        feature: Feature,
        delay_ms: u64,
    ) -> Result<Gated<u8>> {
        controller
            .run_gated(
                identity,
                feature,
                |_| async move {
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    Ok(1u8)
                },
                |_, _| {},
            )
            .await
    }

    #[tokio::test]
    async fn test_concurrent_features_cannot_overspend() {
        let (controller, _) = onboarded().await;
        for _ in 0..4 {
            succeed(&controller, Feature::Scan).await.unwrap();
        }

        let ident = identity();
        let plan = slow_call(&controller, &ident, Feature::WeeklyPlan, 50);
        let scan = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            slow_call(&controller, &ident, Feature::Scan, 50).await
        };

        let (plan, scan) = tokio::join!(plan, scan);
        assert_eq!(plan.unwrap().credits, 0);
        assert!(matches!(
            scan,
            Err(AppError::InsufficientCredits {
                required: 1,
                balance: 0
            })
        ));
        assert_eq!(controller.summary(&ident).await.credits, 0);
    }

    #[tokio::test]
    async fn test_failed_call_releases_held_credits() {
        let (controller, _) = onboarded().await;
        for _ in 0..4 {
            succeed(&controller, Feature::Scan).await.unwrap();
        }

        let failed: Result<Gated<u8>> = controller
            .run_gated(
                &identity(),
                Feature::WorkoutPlan,
                |_| async {
                    Err(FlowError {
                        flow: Feature::WorkoutPlan,
                        cause: FlowFailure::Oracle(OracleError::EmptyResponse),
                    })
                },
                |_, _| {},
            )
            .await;
        assert!(failed.is_err());

        let gated = succeed(&controller, Feature::WeeklyPlan).await.unwrap();
        assert_eq!(gated.credits, 0);
    }

    #[tokio::test]
    async fn test_sign_out_during_call_still_charges() {
        let (controller, store) = onboarded().await;
        let ident = identity();

        let plan = slow_call(&controller, &ident, Feature::WeeklyPlan, 100);
        let sign_out = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            controller.sign_out(&ident);
            controller.summary(&ident).await
        };

        let (plan, restored) = tokio::join!(plan, sign_out);
        assert_eq!(restored.credits, 7);
        assert_eq!(plan.unwrap().credits, 4);
        assert_eq!(store.get_credits("uid-1").await.unwrap(), Some(4));

        controller.add_habit(&ident, "Walk 30 min").await.unwrap();
        assert_eq!(controller.summary(&ident).await.credits, 4);
        assert_eq!(store.get_credits("uid-1").await.unwrap(), Some(4));
    }

    #[tokio::test]
    async fn test_idle_sessions_are_evicted_and_restored() {
        let store = Arc::new(MemoryStore::new());
        let controller = SessionController::with_idle_ttl(store.clone(), Duration::ZERO);
        controller
            .complete_onboarding(&identity(), draft())
            .await
            .unwrap();
        controller.add_habit(&identity(), "Stretch").await.unwrap();

        let held = controller.resolve(&identity()).await;
        assert_eq!(controller.evict_idle(), 0);
        drop(held);

        assert_eq!(controller.evict_idle(), 1);
        assert_eq!(controller.active_sessions(), 0);

        let summary = controller.summary(&identity()).await;
        assert_eq!(summary.phase, Phase::Active);
        assert_eq!(summary.credits, 7);
        assert_eq!(controller.habits(&identity()).await.unwrap().habits.len(), 1);
    }

    #[tokio::test]
    async fn test_recent_sessions_are_kept() {
        let (controller, _) = onboarded().await;
        assert_eq!(controller.evict_idle(), 0);
        assert_eq!(controller.active_sessions(), 1);
    }

    #[tokio::test]
    async fn test_habit_stars_and_delete() {
        let (controller, _) = onboarded().await;
        let habit = controller.add_habit(&identity(), "Walk 30 min").await.unwrap();

        let snap = controller.toggle_habit(&identity(), habit.id).await.unwrap();
        assert_eq!(snap.stars, 1);

        let snap = controller.delete_habit(&identity(), habit.id).await.unwrap();
        assert_eq!(snap.stars, 1);
        assert!(snap.habits.is_empty());

        assert!(matches!(
            controller.toggle_habit(&identity(), habit.id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            controller.add_habit(&identity(), "   ").await,
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_sign_out_and_back_restores_records() {
        let (controller, _) = onboarded().await;
        let habit = controller.add_habit(&identity(), "Drink water").await.unwrap();
        controller.toggle_habit(&identity(), habit.id).await.unwrap();
        succeed(&controller, Feature::Scan).await.unwrap();
        let before = controller.summary(&identity()).await;

        assert_eq!(controller.sign_out(&identity()), View::Welcome);
        assert_eq!(controller.active_sessions(), 0);

        let after = controller.summary(&identity()).await;
        assert_eq!(after.phase, Phase::Active);
        assert_eq!(after.view, View::Dashboard);
        assert_eq!(after.profile, before.profile);
        assert_eq!(after.credits, 6);
        assert_eq!(after.stars, 1);
        assert_eq!(controller.habits(&identity()).await.unwrap().habits.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_credit_record_falls_back_to_starting_credits() {
        let (controller, store) = controller();
        store
            .set_profile("uid-1", &draft().into_profile(Plan::Free))
            .await
            .unwrap();
        assert_eq!(controller.summary(&identity()).await.credits, 7);

        let (controller, store) = self::controller();
        store
            .set_profile("uid-1", &draft().into_profile(Plan::Free))
            .await
            .unwrap();
        store.set_credits("uid-1", 0).await.unwrap();
        assert_eq!(controller.summary(&identity()).await.credits, 0);
    }

    #[tokio::test]
    async fn test_store_outage_is_absorbed() {
        let (controller, store) = onboarded().await;
        store.set_unavailable(true);
        let habit = controller.add_habit(&identity(), "Stretch").await;
        assert!(habit.is_ok());

        controller.sign_out(&identity());
        let summary = controller.summary(&identity()).await;
        assert_eq!(summary.phase, Phase::Onboarding);
    }

    #[tokio::test]
    async fn test_notes_and_dashboard() {
        let (controller, _) = onboarded().await;
        let date = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
        controller
            .save_note(&identity(), date, "Glucose 110")
            .await
            .unwrap();

        let dashboard = controller.dashboard(&identity(), 2026, 3).await.unwrap();
        assert_eq!(dashboard.month, "2026-03");
        assert_eq!(dashboard.notes.get("2026-03-14").unwrap(), "Glucose 110");
        assert!(controller
            .notes_for_month(&identity(), 2026, 4)
            .await
            .unwrap()
            .is_empty());

        controller.save_note(&identity(), date, "  ").await.unwrap();
        assert!(controller
            .notes_for_month(&identity(), 2026, 3)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_recipe_is_rejected() {
        let (controller, _) = onboarded().await;
        let recipe = Recipe {
            recipe_name: "Lentil soup".to_string(),
            description: String::new(),
            ingredients: vec![],
            instructions: vec![],
            prep_time: "30 min".to_string(),
        };
        assert_eq!(
            controller.save_recipe(&identity(), recipe.clone()).await.unwrap(),
            SaveOutcome::Saved
        );
        assert_eq!(
            controller.save_recipe(&identity(), recipe).await.unwrap(),
            SaveOutcome::Duplicate
        );
        assert_eq!(controller.saved_recipes(&identity()).await.unwrap().len(), 1);
    }

    #[test]
    fn test_revocation() {
        let (controller, _) = controller();
        assert!(!controller.is_revoked("sid-1"));
        controller.revoke_token("sid-1", u64::MAX);
        assert!(controller.is_revoked("sid-1"));
    }
}

//! Profile persistence boundary.
//!
//! Production: back [`ProfileStore`] with the hosted profile database.
//! [`InMemoryProfileStore`] provides the same API surface for development and
//! testing, with a switch that makes every call fail as unreachable.

use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;
use thiserror::Error;
use tracing::{debug, info};
use wellness_core::error::WellnessError;
use wellness_core::types::{Badge, Goal, JourneyProgress, MoodEntry, UserProfile};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("profile {0} not found")]
    NotFound(String),

    #[error("profile store unreachable: {0}")]
    Unreachable(String),
}

impl From<StoreError> for WellnessError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => WellnessError::NotFound(format!("profile {id}")),
            StoreError::Unreachable(msg) => WellnessError::PersistenceUnavailable(msg),
        }
    }
}

/// Per-concern access to learner profiles. Targeted operations touch one
/// record each so concurrent concerns don't overwrite each other wholesale.
pub trait ProfileStore: Send + Sync {
    fn load_profile(&self, user_id: &str) -> Result<UserProfile, StoreError>;

    /// Replaces the whole profile (last write wins).
    fn save_profile(&self, profile: &UserProfile) -> Result<(), StoreError>;

    fn upsert_journey_progress(
        &self,
        user_id: &str,
        progress: &JourneyProgress,
    ) -> Result<(), StoreError>;

    fn remove_journey_progress(&self, user_id: &str, journey_id: &str) -> Result<(), StoreError>;

    fn append_mood(&self, user_id: &str, entry: &MoodEntry) -> Result<(), StoreError>;

    fn upsert_goal(&self, user_id: &str, goal: &Goal) -> Result<(), StoreError>;

    fn add_badge(&self, user_id: &str, badge: &Badge) -> Result<(), StoreError>;

    /// Backend name for logging.
    fn store_name(&self) -> &str;
}

/// One targeted profile change, kept so it can be replayed against the store
/// after a failed write, or re-applied to a freshly loaded profile.
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileWrite {
    UpsertProgress(JourneyProgress),
    RemoveProgress(String),
    AppendMood(MoodEntry),
    UpsertGoal(Goal),
    AddBadge(Badge),
}

impl ProfileWrite {
    pub fn operation(&self) -> &'static str {
        match self {
            ProfileWrite::UpsertProgress(_) => "upsert_journey_progress",
            ProfileWrite::RemoveProgress(_) => "remove_journey_progress",
            ProfileWrite::AppendMood(_) => "append_mood",
            ProfileWrite::UpsertGoal(_) => "upsert_goal",
            ProfileWrite::AddBadge(_) => "add_badge",
        }
    }

    /// Sends the change to `store` through the matching targeted call.
    pub fn send(&self, store: &dyn ProfileStore, user_id: &str) -> Result<(), StoreError> {
        match self {
            ProfileWrite::UpsertProgress(progress) => {
                store.upsert_journey_progress(user_id, progress)
            }
            ProfileWrite::RemoveProgress(journey_id) => {
                store.remove_journey_progress(user_id, journey_id)
            }
            ProfileWrite::AppendMood(entry) => store.append_mood(user_id, entry),
            ProfileWrite::UpsertGoal(goal) => store.upsert_goal(user_id, goal),
            ProfileWrite::AddBadge(badge) => store.add_badge(user_id, badge),
        }
    }

    pub fn apply_to(&self, profile: &mut UserProfile) {
        match self {
            ProfileWrite::UpsertProgress(progress) => profile.upsert_progress(progress.clone()),
            ProfileWrite::RemoveProgress(journey_id) => {
                profile.remove_progress(journey_id);
            }
            ProfileWrite::AppendMood(entry) => profile.mood_log.push(entry.clone()),
            ProfileWrite::UpsertGoal(goal) => profile.upsert_goal(goal.clone()),
            ProfileWrite::AddBadge(badge) => {
                profile.add_badge(badge.clone());
            }
        }
    }
}

/// Thread-safe in-memory profile store backed by DashMap.
pub struct InMemoryProfileStore {
    profiles: DashMap<String, UserProfile>,
    offline: AtomicBool,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        info!("Profile store initialized (in-memory, development mode)");
        Self {
            profiles: DashMap::new(),
            offline: AtomicBool::new(false),
        }
    }

    /// Simulate the backend going away (`true`) or coming back (`false`).
    pub fn set_offline(&self, offline: bool) {
        info!(offline, "Profile store availability changed");
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn is_offline(&self) -> bool {
        self.offline.load(Ordering::SeqCst)
    }

    /// Seeds or overwrites a profile directly, bypassing the offline switch.
    pub fn insert(&self, profile: UserProfile) {
        self.profiles.insert(profile.user_id.clone(), profile);
    }

    /// Raw stored copy, bypassing the offline switch.
    pub fn snapshot(&self, user_id: &str) -> Option<UserProfile> {
        self.profiles.get(user_id).map(|r| r.value().clone())
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.is_offline() {
            return Err(StoreError::Unreachable("in-memory store is offline".to_string()));
        }
        Ok(())
    }

    fn apply(&self, user_id: &str, write: ProfileWrite) -> Result<(), StoreError> {
        self.check_online()?;
        let mut entry = self
            .profiles
            .get_mut(user_id)
            .ok_or_else(|| StoreError::NotFound(user_id.to_string()))?;
        write.apply_to(entry.value_mut());
        Ok(())
    }
}

impl Default for InMemoryProfileStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileStore for InMemoryProfileStore {
    fn load_profile(&self, user_id: &str) -> Result<UserProfile, StoreError> {
        self.check_online()?;
        self.profiles
            .get(user_id)
            .map(|r| r.value().clone())
            .ok_or_else(|| StoreError::NotFound(user_id.to_string()))
    }

    fn save_profile(&self, profile: &UserProfile) -> Result<(), StoreError> {
        self.check_online()?;
        debug!(user_id = %profile.user_id, "Saving full profile");
        self.profiles
            .insert(profile.user_id.clone(), profile.clone());
        Ok(())
    }

    fn upsert_journey_progress(
        &self,
        user_id: &str,
        progress: &JourneyProgress,
    ) -> Result<(), StoreError> {
        self.apply(user_id, ProfileWrite::UpsertProgress(progress.clone()))
    }

    fn remove_journey_progress(&self, user_id: &str, journey_id: &str) -> Result<(), StoreError> {
        self.apply(user_id, ProfileWrite::RemoveProgress(journey_id.to_string()))
    }

    fn append_mood(&self, user_id: &str, entry: &MoodEntry) -> Result<(), StoreError> {
        self.apply(user_id, ProfileWrite::AppendMood(entry.clone()))
    }

    fn upsert_goal(&self, user_id: &str, goal: &Goal) -> Result<(), StoreError> {
        self.apply(user_id, ProfileWrite::UpsertGoal(goal.clone()))
    }

    fn add_badge(&self, user_id: &str, badge: &Badge) -> Result<(), StoreError> {
        self.apply(user_id, ProfileWrite::AddBadge(badge.clone()))
    }

    fn store_name(&self) -> &str {
        "in-memory"
    }
}

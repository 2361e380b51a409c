//! Learner profile and the per-concern records it aggregates.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Journey Progress ───────────────────────────────────────────────────

/// A learner's position within one journey.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JourneyProgress {
    pub journey_id: String,
    /// 1-based position of the step currently eligible for completion.
    pub current_step: u32,
    pub completed_step_ids: HashSet<String>,
    pub started_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    pub completed: bool,
    pub reflections: Vec<Reflection>,
    pub total_time_spent_secs: u64,
    pub completed_at: Option<DateTime<Utc>>,
}

impl JourneyProgress {
    /// Fresh progress positioned at the first step.
    pub fn new(journey_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            journey_id: journey_id.into(),
            current_step: 1,
            completed_step_ids: HashSet::new(),
            started_at: now,
            last_accessed_at: now,
            completed: false,
            reflections: Vec::new(),
            total_time_spent_secs: 0,
            completed_at: None,
        }
    }

    pub fn is_step_completed(&self, step_id: &str) -> bool {
        self.completed_step_ids.contains(step_id)
    }

    pub fn completed_count(&self) -> usize {
        self.completed_step_ids.len()
    }
}

/// Written response captured when a step is completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reflection {
    pub id: Uuid,
    pub step_id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub time_spent_secs: u64,
}

// ─── Activity Records ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: Uuid,
    pub title: String,
    pub completed: bool,
}

impl Goal {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            completed: false,
        }
    }
}

/// One mood check-in on a 1 (low) to 5 (high) scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodEntry {
    pub id: Uuid,
    pub mood: u8,
    #[serde(default)]
    pub note: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl MoodEntry {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    /// Builds an entry, clamping `mood` into the 1..=5 scale.
    pub fn new(mood: u8, note: Option<String>, recorded_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            mood: mood.clamp(Self::MIN, Self::MAX),
            note,
            recorded_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub scheduled_at: DateTime<Utc>,
}

/// Awarded when a learner finishes a journey.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Badge {
    pub id: Uuid,
    pub journey_id: String,
    pub title: String,
    pub awarded_at: DateTime<Utc>,
}

// ─── User Profile ───────────────────────────────────────────────────────

/// Full learner snapshot as held by the profile store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    #[serde(default)]
    pub journey_progress: Vec<JourneyProgress>,
    #[serde(default)]
    pub goals: Vec<Goal>,
    #[serde(default)]
    pub mood_log: Vec<MoodEntry>,
    #[serde(default)]
    pub journal_entries: Vec<JournalEntry>,
    #[serde(default)]
    pub wellness_streak: u32,
    #[serde(default)]
    pub appointments: Vec<Appointment>,
    #[serde(default)]
    pub forum_posts: u32,
    #[serde(default)]
    pub badges: Vec<Badge>,
}

impl UserProfile {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Default::default()
        }
    }

    pub fn progress(&self, journey_id: &str) -> Option<&JourneyProgress> {
        self.journey_progress
            .iter()
            .find(|p| p.journey_id == journey_id)
    }

    pub fn progress_mut(&mut self, journey_id: &str) -> Option<&mut JourneyProgress> {
        self.journey_progress
            .iter_mut()
            .find(|p| p.journey_id == journey_id)
    }

    pub fn is_enrolled(&self, journey_id: &str) -> bool {
        self.progress(journey_id).is_some()
    }

    /// Replaces the progress record for the same journey, or appends it.
    pub fn upsert_progress(&mut self, progress: JourneyProgress) {
        match self.progress_mut(&progress.journey_id) {
            Some(existing) => *existing = progress,
            None => self.journey_progress.push(progress),
        }
    }

    /// Drops the progress record; returns whether one existed.
    pub fn remove_progress(&mut self, journey_id: &str) -> bool {
        let before = self.journey_progress.len();
        self.journey_progress.retain(|p| p.journey_id != journey_id);
        before != self.journey_progress.len()
    }

    pub fn upsert_goal(&mut self, goal: Goal) {
        match self.goals.iter_mut().find(|g| g.id == goal.id) {
            Some(existing) => *existing = goal,
            None => self.goals.push(goal),
        }
    }

    pub fn has_badge_for(&self, journey_id: &str) -> bool {
        self.badges.iter().any(|b| b.journey_id == journey_id)
    }

    /// Adds the badge unless one already exists for the same journey.
    pub fn add_badge(&mut self, badge: Badge) -> bool {
        if self.has_badge_for(&badge.journey_id) {
            return false;
        }
        self.badges.push(badge);
        true
    }
}

//! Engagement gate: decides whether a learner has engaged with a step enough
//! to mark it complete.
//!
//! Three independent pillars are evaluated:
//! - time: elapsed seconds reach the step's minimum
//! - reflection: a written response of sufficient length (reflection,
//!   exercise and meditation steps only)
//! - confirmation: the matching "I did this" acknowledgment (meditation and
//!   article steps only)
//!
//! A pillar that does not apply to the step type is vacuously satisfied.
//! Completion unlocks once the configured number of pillars (2 by default)
//! hold, regardless of which ones.

use serde::{Deserialize, Serialize};
use tracing::debug;
use wellness_core::config::EngagementConfig;

use crate::types::{ConfirmationKind, JourneyStep};

/// What the learner has done so far while viewing one step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngagementSnapshot {
    pub elapsed_secs: u64,
    pub reflection_text: String,
    pub confirmation: Option<ConfirmationKind>,
}

/// Per-pillar result of evaluating a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateStatus {
    pub time_met: bool,
    pub reflection_met: bool,
    pub confirmation_met: bool,
    pub reflection_required: bool,
    pub confirmation_required: bool,
    pub pillars_met: u8,
    pub required_pillars: u8,
    pub secs_remaining: u64,
    pub reflection_chars_remaining: usize,
    pub can_complete: bool,
}

/// Pure evaluator over a step definition and an engagement snapshot.
#[derive(Debug, Clone)]
pub struct EngagementEvaluator {
    required_pillars: u8,
    min_reflection_chars: usize,
    default_min_time_secs: u64,
}

impl EngagementEvaluator {
    pub fn new(config: &EngagementConfig) -> Self {
        Self {
            required_pillars: config.required_pillars.min(3),
            min_reflection_chars: config.min_reflection_chars,
            default_min_time_secs: config.default_min_time_secs,
        }
    }

    /// Minimum engagement time for `step`, falling back to the configured default.
    pub fn min_time_secs(&self, step: &JourneyStep) -> u64 {
        step.min_time_secs.unwrap_or(self.default_min_time_secs)
    }

    pub fn evaluate(&self, step: &JourneyStep, snapshot: &EngagementSnapshot) -> GateStatus {
        let min_time = self.min_time_secs(step);
        let time_met = snapshot.elapsed_secs >= min_time;

        let reflection_required = step.step_type.requires_reflection();
        let reflection_len = snapshot.reflection_text.trim().chars().count();
        let reflection_met = !reflection_required || reflection_len >= self.min_reflection_chars;

        let confirmation_kind = step.step_type.confirmation_kind();
        let confirmation_met = match confirmation_kind {
            Some(kind) => snapshot.confirmation == Some(kind),
            None => true,
        };

        let pillars_met = [time_met, reflection_met, confirmation_met]
            .iter()
            .filter(|met| **met)
            .count() as u8;
        let can_complete = pillars_met >= self.required_pillars;

        debug!(
            step_id = %step.id,
            step_type = step.step_type.label(),
            time_met,
            reflection_met,
            confirmation_met,
            can_complete,
            "Evaluated engagement gate"
        );

        GateStatus {
            time_met,
            reflection_met,
            confirmation_met,
            reflection_required,
            confirmation_required: confirmation_kind.is_some(),
            pillars_met,
            required_pillars: self.required_pillars,
            secs_remaining: min_time.saturating_sub(snapshot.elapsed_secs),
            reflection_chars_remaining: if reflection_required {
                self.min_reflection_chars.saturating_sub(reflection_len)
            } else {
                0
            },
            can_complete,
        }
    }
}

impl Default for EngagementEvaluator {
    fn default() -> Self {
        Self::new(&EngagementConfig::default())
    }
}

/// Presentation-owned state for the step currently open on screen.
///
/// The owner calls [`tick`](Self::tick) once per second. Nothing here is
/// persisted: dropping the session discards it, and reopening a step starts
/// a new session from zero.
#[derive(Debug, Clone, PartialEq)]
pub struct EngagementSession {
    step_id: String,
    elapsed_secs: u64,
    reflection_text: String,
    confirmation: Option<ConfirmationKind>,
}

impl EngagementSession {
    pub fn open(step_id: impl Into<String>) -> Self {
        Self {
            step_id: step_id.into(),
            elapsed_secs: 0,
            reflection_text: String::new(),
            confirmation: None,
        }
    }

    pub fn step_id(&self) -> &str {
        &self.step_id
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed_secs
    }

    pub fn tick(&mut self) {
        self.elapsed_secs = self.elapsed_secs.saturating_add(1);
    }

    pub fn tick_by(&mut self, secs: u64) {
        self.elapsed_secs = self.elapsed_secs.saturating_add(secs);
    }

    pub fn set_reflection(&mut self, text: impl Into<String>) {
        self.reflection_text = text.into();
    }

    pub fn confirm(&mut self, kind: ConfirmationKind) {
        self.confirmation = Some(kind);
    }

    pub fn clear_confirmation(&mut self) {
        self.confirmation = None;
    }

    pub fn snapshot(&self) -> EngagementSnapshot {
        EngagementSnapshot {
            elapsed_secs: self.elapsed_secs,
            reflection_text: self.reflection_text.clone(),
            confirmation: self.confirmation,
        }
    }
}

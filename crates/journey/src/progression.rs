//! Sequential step advancement over a single `JourneyProgress` record.
//!
//! Only the step at `current_step` may be completed. Each completion moves
//! `current_step` forward by exactly one; when every step is done the record
//! flips to completed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use wellness_core::types::{JourneyProgress, Reflection};

use crate::evaluator::{EngagementSession, EngagementSnapshot, GateStatus};
use crate::state_machine::{JourneyStateMachine, ProgressStatus};
use crate::types::{Journey, JourneyStep};

/// Why a progression request was refused. State is unchanged whenever one
/// of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum Rejection {
    #[error("You're already enrolled in this journey")]
    AlreadyEnrolled,

    #[error("You're not enrolled in this journey")]
    NotEnrolled,

    #[error("Please complete previous steps first (step {expected} is next, not step {attempted})")]
    NotCurrentStep { expected: u32, attempted: u32 },

    #[error("This step is already complete")]
    StepAlreadyCompleted { step_id: String },

    #[error("Keep going: {pillars_met} of {required} engagement checks done")]
    GateNotSatisfied { pillars_met: u8, required: u8 },

    #[error("You've already finished this journey")]
    JourneyAlreadyCompleted,
}

/// Input for completing one step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub journey_id: String,
    pub step_id: String,
    pub snapshot: EngagementSnapshot,
    #[serde(default)]
    pub reflection: Option<String>,
    #[serde(default)]
    pub time_spent_secs: Option<u64>,
}

impl CompletionRequest {
    pub fn new(
        journey_id: impl Into<String>,
        step_id: impl Into<String>,
        snapshot: EngagementSnapshot,
    ) -> Self {
        Self {
            journey_id: journey_id.into(),
            step_id: step_id.into(),
            snapshot,
            reflection: None,
            time_spent_secs: None,
        }
    }

    /// Builds a request from an open session, recording its reflection
    /// (if any was written) along with the elapsed time.
    pub fn from_session(journey_id: impl Into<String>, session: &EngagementSession) -> Self {
        let snapshot = session.snapshot();
        let mut request = Self::new(journey_id, session.step_id(), snapshot);
        if !request.snapshot.reflection_text.trim().is_empty() {
            request.reflection = Some(request.snapshot.reflection_text.trim().to_string());
            request.time_spent_secs = Some(request.snapshot.elapsed_secs);
        }
        request
    }

    pub fn with_reflection(mut self, text: impl Into<String>, time_spent_secs: u64) -> Self {
        self.reflection = Some(text.into());
        self.time_spent_secs = Some(time_spent_secs);
        self
    }
}

/// Result of a successful advancement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advance {
    pub completed_position: u32,
    pub next_step: u32,
    pub journey_finished: bool,
}

/// Applies the completion of `step` to `progress`.
///
/// Checks run in a fixed order so the learner sees the most relevant
/// message: finished journey, repeated step, out-of-order step, then the
/// engagement gate.
pub fn advance(
    progress: &mut JourneyProgress,
    journey: &Journey,
    step: &JourneyStep,
    gate: &GateStatus,
    reflection: Option<(&str, u64)>,
    now: DateTime<Utc>,
) -> Result<Advance, Rejection> {
    let mut machine = JourneyStateMachine::for_progress(Some(&*progress));
    if machine.state == ProgressStatus::Completed {
        return Err(Rejection::JourneyAlreadyCompleted);
    }
    if progress.is_step_completed(&step.id) {
        return Err(Rejection::StepAlreadyCompleted {
            step_id: step.id.clone(),
        });
    }
    if step.position != progress.current_step {
        return Err(Rejection::NotCurrentStep {
            expected: progress.current_step,
            attempted: step.position,
        });
    }
    if !gate.can_complete {
        return Err(Rejection::GateNotSatisfied {
            pillars_met: gate.pillars_met,
            required: gate.required_pillars,
        });
    }

    progress.completed_step_ids.insert(step.id.clone());
    progress.current_step += 1;
    progress.last_accessed_at = now;

    if let Some((text, time_spent_secs)) = reflection {
        progress.reflections.push(Reflection {
            id: Uuid::new_v4(),
            step_id: step.id.clone(),
            text: text.to_string(),
            created_at: now,
            time_spent_secs,
        });
        progress.total_time_spent_secs =
            progress.total_time_spent_secs.saturating_add(time_spent_secs);
    }

    let journey_finished = progress.completed_count() >= journey.step_count();
    if journey_finished && machine.transition(ProgressStatus::Completed).is_ok() {
        progress.completed = true;
        progress.completed_at = Some(now);
    }

    Ok(Advance {
        completed_position: step.position,
        next_step: progress.current_step,
        journey_finished,
    })
}

/// Share of steps completed, 0..=100.
pub fn percent_complete(progress: &JourneyProgress, journey: &Journey) -> u8 {
    let total = journey.step_count();
    if total == 0 {
        return 0;
    }
    let pct = progress.completed_count() as f64 / total as f64 * 100.0;
    pct.round().clamp(0.0, 100.0) as u8
}

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use wellness_core::types::JourneyProgress;

/// Where a learner stands in one journey.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    NotEnrolled,
    Enrolled,
    Completed,
}

impl ProgressStatus {
    pub fn of(progress: Option<&JourneyProgress>) -> Self {
        match progress {
            None => ProgressStatus::NotEnrolled,
            Some(p) if p.completed => ProgressStatus::Completed,
            Some(_) => ProgressStatus::Enrolled,
        }
    }
}

/// Describes a single valid state transition for a learner's progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub from: ProgressStatus,
    pub to: ProgressStatus,
    pub trigger: String,
}

/// Guards the progress lifecycle by enforcing a finite set of valid
/// state transitions. Unenrolling deletes the record, so it returns to
/// `NotEnrolled` rather than to a terminal state.
#[derive(Debug, Clone)]
pub struct JourneyStateMachine {
    pub state: ProgressStatus,
    pub transitions: Vec<StateTransition>,
}

impl JourneyStateMachine {
    /// Creates a machine in `state` with all valid transitions pre-configured.
    pub fn new(state: ProgressStatus) -> Self {
        let transitions = vec![
            // NotEnrolled ->
            StateTransition {
                from: ProgressStatus::NotEnrolled,
                to: ProgressStatus::Enrolled,
                trigger: "enroll".to_string(),
            },
            // Enrolled ->
            StateTransition {
                from: ProgressStatus::Enrolled,
                to: ProgressStatus::Enrolled,
                trigger: "complete_step".to_string(),
            },
            StateTransition {
                from: ProgressStatus::Enrolled,
                to: ProgressStatus::Completed,
                trigger: "complete_final_step".to_string(),
            },
            StateTransition {
                from: ProgressStatus::Enrolled,
                to: ProgressStatus::NotEnrolled,
                trigger: "unenroll".to_string(),
            },
            // Completed ->
            StateTransition {
                from: ProgressStatus::Completed,
                to: ProgressStatus::NotEnrolled,
                trigger: "unenroll".to_string(),
            },
        ];

        Self { state, transitions }
    }

    /// Machine positioned at the status implied by an existing record.
    pub fn for_progress(progress: Option<&JourneyProgress>) -> Self {
        Self::new(ProgressStatus::of(progress))
    }

    /// Returns `true` if the given transition is allowed.
    pub fn can_transition(&self, from: &ProgressStatus, to: &ProgressStatus) -> bool {
        self.transitions
            .iter()
            .any(|t| t.from == *from && t.to == *to)
    }

    /// Attempts to move the state machine to `to`. Returns an error if the
    /// transition is not permitted.
    pub fn transition(&mut self, to: ProgressStatus) -> Result<()> {
        if self.can_transition(&self.state, &to) {
            self.state = to;
            Ok(())
        } else {
            Err(anyhow!(
                "Invalid progress transition from {:?} to {:?}",
                self.state,
                to
            ))
        }
    }
}

impl Default for JourneyStateMachine {
    fn default() -> Self {
        Self::new(ProgressStatus::NotEnrolled)
    }
}

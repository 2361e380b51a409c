use serde::{Deserialize, Serialize};

/// A structured, ordered curriculum on a mental-health topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Journey {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub difficulty: Difficulty,
    pub category: String,
    pub steps: Vec<JourneyStep>,
}

impl Journey {
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn step(&self, step_id: &str) -> Option<&JourneyStep> {
        self.steps.iter().find(|s| s.id == step_id)
    }

    /// Step at the 1-based `position`.
    pub fn step_at(&self, position: u32) -> Option<&JourneyStep> {
        self.steps.iter().find(|s| s.position == position)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

/// One unit of content or activity within a journey.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JourneyStep {
    pub id: String,
    /// 1-based position within the journey.
    pub position: u32,
    pub title: String,
    pub step_type: StepType,
    /// Falls back to the configured default (60s) when unset.
    #[serde(default)]
    pub min_time_secs: Option<u64>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub article_id: Option<String>,
}

/// The kind of activity a step asks for. Decides which engagement pillars apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    Article,
    Exercise,
    Meditation,
    Reflection,
    /// Unrecognised type from catalog data; no extra pillar is required.
    #[serde(other)]
    Other,
}

impl StepType {
    /// Whether the written-reflection pillar applies to this step type.
    pub fn requires_reflection(&self) -> bool {
        matches!(
            self,
            StepType::Reflection | StepType::Exercise | StepType::Meditation
        )
    }

    /// The confirmation this step type asks for, if any.
    pub fn confirmation_kind(&self) -> Option<ConfirmationKind> {
        match self {
            StepType::Meditation => Some(ConfirmationKind::Meditation),
            StepType::Article => Some(ConfirmationKind::Article),
            StepType::Exercise | StepType::Reflection | StepType::Other => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StepType::Article => "article",
            StepType::Exercise => "exercise",
            StepType::Meditation => "meditation",
            StepType::Reflection => "reflection",
            StepType::Other => "other",
        }
    }
}

/// Explicit "I did this" acknowledgment, tagged with what was acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationKind {
    /// "I completed the meditation practice."
    Meditation,
    /// "I read the full article."
    Article,
}

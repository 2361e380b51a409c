//! Read-only journey catalog: ordered journey definitions with lookups.

use std::collections::HashSet;
use std::path::Path;

use tracing::info;
use wellness_core::error::{WellnessError, WellnessResult};

use crate::types::{Difficulty, Journey, JourneyStep, StepType};

/// Ordered, validated set of journeys. Cheap to share behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct JourneyCatalog {
    journeys: Vec<Journey>,
}

impl JourneyCatalog {
    /// Builds a catalog, sorting each journey's steps by position and
    /// rejecting duplicate ids or gaps in the 1-based step positions.
    pub fn new(mut journeys: Vec<Journey>) -> WellnessResult<Self> {
        let mut journey_ids = HashSet::new();
        for journey in &mut journeys {
            if !journey_ids.insert(journey.id.clone()) {
                return Err(WellnessError::Catalog(format!(
                    "duplicate journey id {}",
                    journey.id
                )));
            }
            if journey.steps.is_empty() {
                return Err(WellnessError::Catalog(format!(
                    "journey {} has no steps",
                    journey.id
                )));
            }

            journey.steps.sort_by_key(|s| s.position);

            let mut step_ids = HashSet::new();
            for (index, step) in journey.steps.iter().enumerate() {
                let expected = index as u32 + 1;
                if step.position != expected {
                    return Err(WellnessError::Catalog(format!(
                        "journey {} step {} has position {}, expected {}",
                        journey.id, step.id, step.position, expected
                    )));
                }
                if !step_ids.insert(step.id.as_str()) {
                    return Err(WellnessError::Catalog(format!(
                        "journey {} repeats step id {}",
                        journey.id, step.id
                    )));
                }
            }
        }

        info!(journeys = journeys.len(), "Journey catalog loaded");
        Ok(Self { journeys })
    }

    pub fn from_json(json: &str) -> WellnessResult<Self> {
        let journeys: Vec<Journey> = serde_json::from_str(json)?;
        Self::new(journeys)
    }

    pub fn from_path(path: impl AsRef<Path>) -> WellnessResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn get(&self, journey_id: &str) -> Option<&Journey> {
        self.journeys.iter().find(|j| j.id == journey_id)
    }

    pub fn step(&self, journey_id: &str, step_id: &str) -> Option<&JourneyStep> {
        self.get(journey_id)?.step(step_id)
    }

    pub fn step_at(&self, journey_id: &str, position: u32) -> Option<&JourneyStep> {
        self.get(journey_id)?.step_at(position)
    }

    pub fn journeys(&self) -> &[Journey] {
        &self.journeys
    }

    pub fn by_category<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a Journey> + 'a {
        self.journeys
            .iter()
            .filter(move |j| j.category.eq_ignore_ascii_case(category))
    }

    pub fn len(&self) -> usize {
        self.journeys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.journeys.is_empty()
    }

    /// Built-in catalog used for development and the demo binary.
    pub fn seeded() -> Self {
        let journeys = vec![
            Journey {
                id: "anxiety-toolkit".to_string(),
                title: "Anxiety Toolkit".to_string(),
                description: "Practical tools for noticing and easing anxious thoughts".to_string(),
                difficulty: Difficulty::Beginner,
                category: "anxiety".to_string(),
                steps: vec![
                    step(1, "at-understanding", "Understanding Anxiety", StepType::Article, None)
                        .with_article("understanding-anxiety"),
                    step(2, "at-box-breathing", "Box Breathing", StepType::Exercise, Some(120)),
                    step(3, "at-body-scan", "Body Scan Meditation", StepType::Meditation, Some(300)),
                    step(4, "at-thought-record", "Thought Record", StepType::Reflection, None),
                    step(5, "at-action-plan", "Your Calm Plan", StepType::Reflection, None),
                ],
            },
            Journey {
                id: "sleep-reset".to_string(),
                title: "Sleep Reset".to_string(),
                description: "Rebuild an evening routine that supports restful sleep".to_string(),
                difficulty: Difficulty::Intermediate,
                category: "sleep".to_string(),
                steps: vec![
                    step(1, "sr-sleep-hygiene", "Sleep Hygiene Basics", StepType::Article, None)
                        .with_article("sleep-hygiene"),
                    step(2, "sr-wind-down", "Wind-Down Ritual", StepType::Exercise, Some(180)),
                    step(3, "sr-yoga-nidra", "Yoga Nidra", StepType::Meditation, Some(600)),
                    step(4, "sr-sleep-diary", "Sleep Diary Review", StepType::Reflection, None),
                ],
            },
            Journey {
                id: "self-compassion".to_string(),
                title: "Self-Compassion Foundations".to_string(),
                description: "Learn to meet hard moments with kindness".to_string(),
                difficulty: Difficulty::Advanced,
                category: "depression".to_string(),
                steps: vec![
                    step(1, "sc-inner-critic", "Meeting the Inner Critic", StepType::Article, None),
                    step(2, "sc-loving-kindness", "Loving-Kindness Practice", StepType::Meditation, Some(420)),
                    step(3, "sc-letter", "A Letter to Yourself", StepType::Reflection, Some(240)),
                ],
            },
        ];

        Self { journeys }
    }
}

fn step(
    position: u32,
    id: &str,
    title: &str,
    step_type: StepType,
    min_time_secs: Option<u64>,
) -> JourneyStep {
    JourneyStep {
        id: id.to_string(),
        position,
        title: title.to_string(),
        step_type,
        min_time_secs,
        content: None,
        article_id: None,
    }
}

impl JourneyStep {
    fn with_article(mut self, article_id: &str) -> Self {
        self.article_id = Some(article_id.to_string());
        self
    }
}

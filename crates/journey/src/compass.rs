//! Compass Calibration: a four-axis 0-100 wellness reading derived from a
//! learner's accumulated activity.
//!
//! - North (mental clarity): goal completion and active (unfinished) journeys
//! - East (emotional balance): recent mood check-ins
//! - South (physical vitality): wellness streak plus journaling and appointments
//! - West (social connection): appointments and forum participation
//!
//! The reading is a pure function of the profile snapshot and holds no state.

use serde::{Deserialize, Serialize};
use wellness_core::config::CompassConfig;
use wellness_core::types::{MoodEntry, UserProfile};

/// Neutral score used when there is no data yet for a component.
const NEUTRAL: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompassAxis {
    North,
    East,
    South,
    West,
}

impl CompassAxis {
    pub fn label(&self) -> &'static str {
        match self {
            CompassAxis::North => "Mental Clarity",
            CompassAxis::East => "Emotional Balance",
            CompassAxis::South => "Physical Vitality",
            CompassAxis::West => "Social Connection",
        }
    }
}

/// Display band for the overall score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompassBand {
    TrueNorth,
    OnCourse,
    Recalibrating,
    NeedsAttention,
}

impl CompassBand {
    pub fn for_score(overall: u8) -> Self {
        match overall {
            80..=u8::MAX => CompassBand::TrueNorth,
            60..=79 => CompassBand::OnCourse,
            40..=59 => CompassBand::Recalibrating,
            _ => CompassBand::NeedsAttention,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CompassBand::TrueNorth => "True North",
            CompassBand::OnCourse => "On Course",
            CompassBand::Recalibrating => "Recalibrating",
            CompassBand::NeedsAttention => "Needs Attention",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompassReading {
    pub north: u8,
    pub east: u8,
    pub south: u8,
    pub west: u8,
    pub overall: u8,
    pub band: CompassBand,
    /// Lowest-scoring axis; ties resolve in N, E, S, W order.
    pub weakest: CompassAxis,
}

impl CompassReading {
    pub fn axis(&self, axis: CompassAxis) -> u8 {
        match axis {
            CompassAxis::North => self.north,
            CompassAxis::East => self.east,
            CompassAxis::South => self.south,
            CompassAxis::West => self.west,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompassCalibrator {
    mood_window: usize,
}

impl CompassCalibrator {
    pub fn new(config: &CompassConfig) -> Self {
        Self {
            mood_window: config.mood_window.max(1),
        }
    }

    pub fn calibrate(&self, profile: &UserProfile) -> CompassReading {
        let axes = [
            (CompassAxis::North, to_score(self.north(profile))),
            (CompassAxis::East, to_score(self.east(profile))),
            (CompassAxis::South, to_score(self.south(profile))),
            (CompassAxis::West, to_score(self.west(profile))),
        ];
        // Overall is taken from the reported (rounded) axes.
        let sum: u32 = axes.iter().map(|(_, score)| *score as u32).sum();
        let overall = to_score(sum as f64 / 4.0);

        let weakest = axes
            .iter()
            .fold(axes[0], |low, next| if next.1 < low.1 { *next } else { low })
            .0;

        CompassReading {
            north: axes[0].1,
            east: axes[1].1,
            south: axes[2].1,
            west: axes[3].1,
            overall,
            band: CompassBand::for_score(overall),
            weakest,
        }
    }

    fn north(&self, profile: &UserProfile) -> f64 {
        let goal_component = if profile.goals.is_empty() {
            NEUTRAL
        } else {
            let done = profile.goals.iter().filter(|g| g.completed).count();
            done as f64 / profile.goals.len() as f64 * 100.0
        };
        let active = profile
            .journey_progress
            .iter()
            .filter(|p| !p.completed)
            .count();
        let journey_component = capped(active as f64 * 20.0);
        clamp_axis((goal_component + journey_component) / 2.0)
    }

    fn east(&self, profile: &UserProfile) -> f64 {
        if profile.mood_log.is_empty() {
            return NEUTRAL;
        }
        let mut recent: Vec<&MoodEntry> = profile.mood_log.iter().collect();
        recent.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        recent.truncate(self.mood_window);

        let avg = recent.iter().map(|m| m.mood as f64).sum::<f64>() / recent.len() as f64;
        clamp_axis(avg / MoodEntry::MAX as f64 * 100.0)
    }

    fn south(&self, profile: &UserProfile) -> f64 {
        let streak = capped(profile.wellness_streak as f64 * 10.0);
        let activity = capped(
            (profile.journal_entries.len() + profile.appointments.len()) as f64 * 5.0,
        );
        clamp_axis((streak + activity) / 2.0)
    }

    fn west(&self, profile: &UserProfile) -> f64 {
        let sessions = capped(profile.appointments.len() as f64 * 25.0);
        let community = capped(profile.forum_posts as f64 * 10.0);
        clamp_axis((sessions + community) / 2.0)
    }
}

impl Default for CompassCalibrator {
    fn default() -> Self {
        Self::new(&CompassConfig::default())
    }
}

fn capped(value: f64) -> f64 {
    value.min(100.0)
}

fn clamp_axis(value: f64) -> f64 {
    if value.is_nan() {
        return NEUTRAL;
    }
    value.clamp(0.0, 100.0)
}

fn to_score(value: f64) -> u8 {
    clamp_axis(value).round() as u8
}

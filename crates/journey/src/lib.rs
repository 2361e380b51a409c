//! Guided journey progression: sequenced multi-step curricula gated by
//! engagement checks, plus the Compass Calibration wellness reading.

pub mod catalog;
pub mod compass;
pub mod engine;
pub mod evaluator;
pub mod progression;
pub mod recommend;
pub mod state_machine;
pub mod store;
pub mod types;

pub use catalog::JourneyCatalog;
pub use compass::{CompassCalibrator, CompassReading};
pub use engine::JourneyEngine;
pub use evaluator::{EngagementEvaluator, EngagementSession, EngagementSnapshot};
pub use store::{InMemoryProfileStore, ProfileStore, ProfileWrite};

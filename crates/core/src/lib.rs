//! Shared domain types for the guided journey progression engine: learner
//! profiles, configuration, error taxonomy, clock and notification seams.

pub mod clock;
pub mod config;
pub mod error;
pub mod notify;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::AppConfig;
pub use error::{WellnessError, WellnessResult};
pub use notify::{Notification, NotificationKind, NotificationSink};

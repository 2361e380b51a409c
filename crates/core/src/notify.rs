//! User-facing notification sink.
//!
//! The progression engine accepts an `Arc<dyn NotificationSink>` and reports
//! every outcome (enrolled, step rejected, saved locally, ...) through it.
//! Delivery is fire-and-forget; nothing the sink does flows back into the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Success,
    Info,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
    pub user_id: String,
    pub at: DateTime<Utc>,
}

/// Trait for surfacing feedback to the learner. Implementations route to a
/// toast queue, a websocket, or a log.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// No-op sink for callers that don't surface feedback.
pub struct NoOpSink;

impl NotificationSink for NoOpSink {
    fn notify(&self, _notification: Notification) {}
}

/// Writes every notification to the tracing pipeline.
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, notification: Notification) {
        match notification.kind {
            NotificationKind::Error => warn!(
                user_id = %notification.user_id,
                message = %notification.message,
                "Learner notification"
            ),
            kind => info!(
                user_id = %notification.user_id,
                ?kind,
                message = %notification.message,
                "Learner notification"
            ),
        }
    }
}

/// In-memory sink that captures notifications for testing.
#[derive(Default)]
pub struct CaptureSink {
    notifications: Mutex<Vec<Notification>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self {
            notifications: Mutex::new(Vec::new()),
        }
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications
            .lock()
            .expect("notification mutex poisoned")
            .clone()
    }

    pub fn count(&self) -> usize {
        self.notifications
            .lock()
            .expect("notification mutex poisoned")
            .len()
    }

    pub fn count_kind(&self, kind: NotificationKind) -> usize {
        self.notifications
            .lock()
            .expect("notification mutex poisoned")
            .iter()
            .filter(|n| n.kind == kind)
            .count()
    }

    pub fn last(&self) -> Option<Notification> {
        self.notifications
            .lock()
            .expect("notification mutex poisoned")
            .last()
            .cloned()
    }

    pub fn clear(&self) {
        self.notifications
            .lock()
            .expect("notification mutex poisoned")
            .clear();
    }
}

impl NotificationSink for CaptureSink {
    fn notify(&self, notification: Notification) {
        self.notifications
            .lock()
            .expect("notification mutex poisoned")
            .push(notification);
    }
}

/// Convenience builder for a `Notification`.
pub fn make_notification(
    kind: NotificationKind,
    user_id: impl Into<String>,
    message: impl Into<String>,
    at: DateTime<Utc>,
) -> Notification {
    Notification {
        kind,
        message: message.into(),
        user_id: user_id.into(),
        at,
    }
}

pub fn noop_sink() -> Arc<dyn NotificationSink> {
    Arc::new(NoOpSink)
}

pub fn tracing_sink() -> Arc<dyn NotificationSink> {
    Arc::new(TracingSink)
}

pub fn capture_sink() -> Arc<CaptureSink> {
    Arc::new(CaptureSink::new())
}

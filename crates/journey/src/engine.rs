use std::sync::Arc;

use dashmap::{DashMap, DashSet};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use wellness_core::clock::{Clock, SystemClock};
use wellness_core::config::AppConfig;
use wellness_core::notify::{make_notification, noop_sink, NotificationKind, NotificationSink};
use wellness_core::types::{Badge, Goal, JourneyProgress, MoodEntry, UserProfile};

use crate::catalog::JourneyCatalog;
use crate::compass::{CompassCalibrator, CompassReading};
use crate::evaluator::{EngagementEvaluator, EngagementSnapshot, GateStatus};
use crate::progression::{self, CompletionRequest, Rejection};
use crate::recommend::{Recommendation, RecommendationPolicy, StaticRecommendationTable};
use crate::state_machine::ProgressStatus;
use crate::store::{ProfileStore, ProfileWrite, StoreError};
use crate::types::{Journey, JourneyStep};

/// Whether a change reached the profile store or only the local copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Persistence {
    Synced,
    LocalOnly,
}

impl Persistence {
    /// `LocalOnly` if either write stayed local.
    pub fn and(self, other: Persistence) -> Persistence {
        match (self, other) {
            (Persistence::Synced, Persistence::Synced) => Persistence::Synced,
            _ => Persistence::LocalOnly,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum EnrollOutcome {
    Enrolled { persistence: Persistence },
    Rejected { rejection: Rejection },
    UnknownJourney { journey_id: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum CompletionOutcome {
    Advanced {
        completed_step: u32,
        next_step: u32,
        persistence: Persistence,
    },
    JourneyCompleted {
        badge: Option<Badge>,
        persistence: Persistence,
    },
    Rejected {
        rejection: Rejection,
    },
    UnknownStep {
        journey_id: String,
        step_id: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum UnenrollOutcome {
    Unenrolled { persistence: Persistence },
    NotEnrolled,
}

/// Core progression engine: owns the optimistic local copy of each learner's
/// profile and applies enroll / complete / unenroll against the catalog.
///
/// Every mutation lands in the local copy first and is then written through
/// to the profile store as a targeted [`ProfileWrite`]. A failed write is
/// queued; queued writes are replayed in order ahead of the learner's next
/// write, or by [`resync`](Self::resync). The store never receives a whole
/// local snapshot unless it has no profile for the learner.
#[derive(Clone)]
pub struct JourneyEngine {
    catalog: Arc<JourneyCatalog>,
    store: Arc<dyn ProfileStore>,
    profiles: Arc<DashMap<String, UserProfile>>,
    /// Writes that have not reached the store yet, oldest first.
    pending_sync: Arc<DashMap<String, Vec<ProfileWrite>>>,
    /// Learners whose local copy was started while the store was unreachable.
    unloaded: Arc<DashSet<String>>,
    evaluator: Arc<EngagementEvaluator>,
    calibrator: Arc<CompassCalibrator>,
    recommendations: Arc<dyn RecommendationPolicy>,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn NotificationSink>,
}

impl std::fmt::Debug for JourneyEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JourneyEngine")
            .field("journeys", &self.catalog.len())
            .field("profiles", &self.profiles.len())
            .field("pending_sync", &self.pending_sync.len())
            .field("store", &self.store.store_name())
            .finish()
    }
}

impl JourneyEngine {
    /// Creates an engine over `catalog` and `store` with a system clock, a
    /// no-op notifier and the built-in recommendation table.
    pub fn new(catalog: Arc<JourneyCatalog>, store: Arc<dyn ProfileStore>, config: &AppConfig) -> Self {
        info!(
            journeys = catalog.len(),
            store = store.store_name(),
            required_pillars = config.engagement.required_pillars,
            "Journey engine initialized"
        );
        Self {
            catalog,
            store,
            profiles: Arc::new(DashMap::new()),
            pending_sync: Arc::new(DashMap::new()),
            unloaded: Arc::new(DashSet::new()),
            evaluator: Arc::new(EngagementEvaluator::new(&config.engagement)),
            calibrator: Arc::new(CompassCalibrator::new(&config.compass)),
            recommendations: Arc::new(StaticRecommendationTable::seeded()),
            clock: Arc::new(SystemClock),
            notifier: noop_sink(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn NotificationSink>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_recommendations(mut self, policy: Arc<dyn RecommendationPolicy>) -> Self {
        self.recommendations = policy;
        self
    }

    pub fn catalog(&self) -> &JourneyCatalog {
        &self.catalog
    }

    // ─── Profile access ─────────────────────────────────────────────────

    /// Current local view of the learner's profile, loading it from the
    /// store on first access. Unknown learners start with an empty profile.
    pub fn profile(&self, user_id: &str) -> UserProfile {
        self.ensure_cached(user_id);
        self.profiles
            .get(user_id)
            .map(|r| r.value().clone())
            .unwrap_or_else(|| UserProfile::new(user_id))
    }

    /// Loads the learner into the local cache. A copy started while the store
    /// was unreachable is reloaded on every access until a load succeeds; the
    /// stored profile then replaces it with unsent writes re-applied on top.
    fn ensure_cached(&self, user_id: &str) {
        let unloaded = self.unloaded.contains(user_id);
        if !unloaded && self.profiles.contains_key(user_id) {
            return;
        }

        match self.store.load_profile(user_id) {
            Ok(mut stored) => {
                if !unloaded {
                    self.profiles.entry(user_id.to_string()).or_insert(stored);
                    return;
                }
                if let Some(pending) = self.pending_sync.get(user_id) {
                    for write in pending.value() {
                        write.apply_to(&mut stored);
                    }
                }
                info!(user_id = %user_id, "Local profile reloaded from store");
                self.profiles.insert(user_id.to_string(), stored);
                self.unloaded.remove(user_id);
            }
            Err(StoreError::NotFound(_)) => {
                if unloaded {
                    // Nothing stored to lose; the local copy is the profile.
                    self.unloaded.remove(user_id);
                    return;
                }
                info!(user_id = %user_id, "Starting new learner profile");
                self.profiles
                    .entry(user_id.to_string())
                    .or_insert_with(|| UserProfile::new(user_id));
            }
            Err(err @ StoreError::Unreachable(_)) => {
                if unloaded {
                    return;
                }
                warn!(user_id = %user_id, error = %err, "Profile load failed, starting from empty local profile");
                self.unloaded.insert(user_id.to_string());
                self.profiles
                    .entry(user_id.to_string())
                    .or_insert_with(|| UserProfile::new(user_id));
            }
        }
    }

    fn update_local<R>(&self, user_id: &str, apply: impl FnOnce(&mut UserProfile) -> R) -> R {
        self.ensure_cached(user_id);
        let mut entry = self
            .profiles
            .entry(user_id.to_string())
            .or_insert_with(|| UserProfile::new(user_id));
        apply(entry.value_mut())
    }

    /// Queues `write` behind any earlier unsent writes and flushes the queue.
    /// `Synced` only when every queued write reached the store.
    fn persist(&self, user_id: &str, write: ProfileWrite) -> Persistence {
        let operation = write.operation();
        let mut queue = self
            .pending_sync
            .remove(user_id)
            .map(|(_, queue)| queue)
            .unwrap_or_default();
        queue.push(write);

        match self.flush(user_id, &mut queue) {
            Ok(()) => {
                debug!(user_id = %user_id, operation, "Profile change persisted");
                Persistence::Synced
            }
            Err(err) => {
                warn!(
                    user_id = %user_id,
                    operation,
                    queued = queue.len(),
                    error = %err,
                    "Profile write failed, keeping local copy"
                );
                metrics::counter!("profile.sync_failures").increment(1);
                self.pending_sync.insert(user_id.to_string(), queue);
                Persistence::LocalOnly
            }
        }
    }

    /// Sends queued writes oldest first, dropping each one the store accepts.
    /// A learner the store has never seen is created from the full local copy,
    /// which already contains every queued write.
    fn flush(&self, user_id: &str, queue: &mut Vec<ProfileWrite>) -> Result<(), StoreError> {
        while let Some(write) = queue.first() {
            match write.send(self.store.as_ref(), user_id) {
                Ok(()) => {
                    queue.remove(0);
                }
                Err(StoreError::NotFound(_)) => {
                    let snapshot = self
                        .profiles
                        .get(user_id)
                        .map(|r| r.value().clone())
                        .unwrap_or_else(|| UserProfile::new(user_id));
                    self.store.save_profile(&snapshot)?;
                    self.unloaded.remove(user_id);
                    queue.clear();
                }
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    fn notify(&self, user_id: &str, kind: NotificationKind, message: impl Into<String>) {
        self.notifier
            .notify(make_notification(kind, user_id, message, self.clock.now()));
    }

    fn notify_if_local(&self, user_id: &str, persistence: Persistence) {
        if persistence == Persistence::LocalOnly {
            self.notify(
                user_id,
                NotificationKind::Info,
                "Saved locally. We'll sync your progress when the connection returns.",
            );
        }
    }

    // ─── Progression ────────────────────────────────────────────────────

    /// Starts a journey at step 1. Enrolling twice is an informational no-op.
    pub fn enroll(&self, user_id: &str, journey_id: &str) -> EnrollOutcome {
        let Some(journey) = self.catalog.get(journey_id) else {
            debug!(user_id = %user_id, journey_id = %journey_id, "Enroll skipped, unknown journey");
            return EnrollOutcome::UnknownJourney {
                journey_id: journey_id.to_string(),
            };
        };

        let now = self.clock.now();
        let created = self.update_local(user_id, |profile| {
            if ProgressStatus::of(profile.progress(journey_id)) != ProgressStatus::NotEnrolled {
                return None;
            }
            let progress = JourneyProgress::new(journey_id, now);
            profile.upsert_progress(progress.clone());
            Some(progress)
        });

        let Some(progress) = created else {
            self.notify(
                user_id,
                NotificationKind::Info,
                format!("You're already enrolled in {}", journey.title),
            );
            return EnrollOutcome::Rejected {
                rejection: Rejection::AlreadyEnrolled,
            };
        };

        metrics::counter!("journey.enrollments").increment(1);
        info!(user_id = %user_id, journey_id = %journey_id, "Learner enrolled in journey");
        self.notify(
            user_id,
            NotificationKind::Success,
            format!("Enrolled in {}", journey.title),
        );

        let persistence = self.persist(user_id, ProfileWrite::UpsertProgress(progress));
        self.notify_if_local(user_id, persistence);
        EnrollOutcome::Enrolled { persistence }
    }

    /// Gate status for a step as currently viewed. `None` for unknown steps.
    pub fn evaluate_gate(
        &self,
        journey_id: &str,
        step_id: &str,
        snapshot: &EngagementSnapshot,
    ) -> Option<GateStatus> {
        let step = self.catalog.step(journey_id, step_id)?;
        Some(self.evaluator.evaluate(step, snapshot))
    }

    /// Marks the requested step complete if it is the current step and its
    /// engagement gate is open. Completing the last step finishes the journey
    /// and awards its badge.
    pub fn complete_step(&self, user_id: &str, request: &CompletionRequest) -> CompletionOutcome {
        let Some((journey, step)) = self
            .catalog
            .get(&request.journey_id)
            .and_then(|j| j.step(&request.step_id).map(|s| (j, s)))
        else {
            debug!(
                user_id = %user_id,
                journey_id = %request.journey_id,
                step_id = %request.step_id,
                "Completion skipped, unknown step"
            );
            return CompletionOutcome::UnknownStep {
                journey_id: request.journey_id.clone(),
                step_id: request.step_id.clone(),
            };
        };

        let gate = self.evaluator.evaluate(step, &request.snapshot);
        let now = self.clock.now();
        let reflection = match (&request.reflection, request.time_spent_secs) {
            (Some(text), Some(secs)) if !text.trim().is_empty() => Some((text.as_str(), secs)),
            _ => None,
        };

        let applied = self.update_local(user_id, |profile| -> Result<_, Rejection> {
            let progress = profile
                .progress_mut(&journey.id)
                .ok_or(Rejection::NotEnrolled)?;
            let advance = progression::advance(progress, journey, step, &gate, reflection, now)?;
            let snapshot = progress.clone();

            let badge = if advance.journey_finished {
                let badge = completion_badge(journey, now);
                profile.add_badge(badge.clone()).then_some(badge)
            } else {
                None
            };
            Ok((advance, snapshot, badge))
        });

        let (advance, snapshot, badge) = match applied {
            Ok(applied) => applied,
            Err(rejection) => {
                metrics::counter!("journey.step_rejections").increment(1);
                debug!(
                    user_id = %user_id,
                    step_id = %step.id,
                    reason = %rejection,
                    "Step completion rejected"
                );
                let kind = match rejection {
                    Rejection::NotCurrentStep { .. } | Rejection::GateNotSatisfied { .. } => {
                        NotificationKind::Error
                    }
                    _ => NotificationKind::Info,
                };
                self.notify(user_id, kind, rejection.to_string());
                return CompletionOutcome::Rejected { rejection };
            }
        };

        metrics::counter!("journey.steps_completed").increment(1);
        info!(
            user_id = %user_id,
            journey_id = %journey.id,
            step_id = %step.id,
            next_step = advance.next_step,
            "Journey step completed"
        );

        let mut persistence = self.persist(user_id, ProfileWrite::UpsertProgress(snapshot));

        if !advance.journey_finished {
            self.notify(
                user_id,
                NotificationKind::Success,
                format!("Step {} complete: {}", step.position, step.title),
            );
            self.notify_if_local(user_id, persistence);
            return CompletionOutcome::Advanced {
                completed_step: advance.completed_position,
                next_step: advance.next_step,
                persistence,
            };
        }

        if let Some(badge) = &badge {
            persistence =
                persistence.and(self.persist(user_id, ProfileWrite::AddBadge(badge.clone())));
        }
        metrics::counter!("journey.completions").increment(1);
        info!(user_id = %user_id, journey_id = %journey.id, "Journey completed");
        self.notify(
            user_id,
            NotificationKind::Success,
            format!("You finished {}!", journey.title),
        );
        self.notify_if_local(user_id, persistence);

        CompletionOutcome::JourneyCompleted { badge, persistence }
    }

    /// Deletes the learner's progress for a journey. Badges already earned are kept.
    pub fn unenroll(&self, user_id: &str, journey_id: &str) -> UnenrollOutcome {
        let removed = self.update_local(user_id, |profile| profile.remove_progress(journey_id));
        if !removed {
            self.notify(
                user_id,
                NotificationKind::Info,
                Rejection::NotEnrolled.to_string(),
            );
            return UnenrollOutcome::NotEnrolled;
        }

        metrics::counter!("journey.unenrollments").increment(1);
        info!(user_id = %user_id, journey_id = %journey_id, "Learner left journey");
        let title = self
            .catalog
            .get(journey_id)
            .map(|j| j.title.as_str())
            .unwrap_or(journey_id);
        self.notify(user_id, NotificationKind::Info, format!("You left {title}"));

        let persistence =
            self.persist(user_id, ProfileWrite::RemoveProgress(journey_id.to_string()));
        self.notify_if_local(user_id, persistence);
        UnenrollOutcome::Unenrolled { persistence }
    }

    // ─── Reads ──────────────────────────────────────────────────────────

    pub fn progress(&self, user_id: &str, journey_id: &str) -> Option<JourneyProgress> {
        self.profile(user_id).progress(journey_id).cloned()
    }

    pub fn status(&self, user_id: &str, journey_id: &str) -> ProgressStatus {
        ProgressStatus::of(self.progress(user_id, journey_id).as_ref())
    }

    pub fn percent_complete(&self, user_id: &str, journey_id: &str) -> Option<u8> {
        let journey = self.catalog.get(journey_id)?;
        let progress = self.progress(user_id, journey_id)?;
        Some(progression::percent_complete(&progress, journey))
    }

    /// The step the learner may complete next, if enrolled and not finished.
    pub fn next_step(&self, user_id: &str, journey_id: &str) -> Option<JourneyStep> {
        let progress = self.progress(user_id, journey_id)?;
        if progress.completed {
            return None;
        }
        self.catalog
            .step_at(journey_id, progress.current_step)
            .cloned()
    }

    pub fn compass(&self, user_id: &str) -> CompassReading {
        self.calibrator.calibrate(&self.profile(user_id))
    }

    /// Recommendations for a primary struggle, limited to journeys the
    /// catalog actually contains.
    pub fn recommend(&self, primary_struggle: &str) -> Recommendation {
        let mut recommendation = self.recommendations.recommend(primary_struggle);
        recommendation
            .journey_ids
            .retain(|id| self.catalog.get(id).is_some());
        recommendation
    }

    pub fn recommended_journeys(&self, primary_struggle: &str) -> Vec<Journey> {
        self.recommend(primary_struggle)
            .journey_ids
            .iter()
            .filter_map(|id| self.catalog.get(id).cloned())
            .collect()
    }

    // ─── Activity ───────────────────────────────────────────────────────

    pub fn log_mood(&self, user_id: &str, mood: u8, note: Option<String>) -> Persistence {
        let entry = MoodEntry::new(mood, note, self.clock.now());
        let write = ProfileWrite::AppendMood(entry);
        self.update_local(user_id, |profile| write.apply_to(profile));
        let persistence = self.persist(user_id, write);
        self.notify_if_local(user_id, persistence);
        persistence
    }

    pub fn upsert_goal(&self, user_id: &str, goal: Goal) -> Persistence {
        let write = ProfileWrite::UpsertGoal(goal);
        self.update_local(user_id, |profile| write.apply_to(profile));
        let persistence = self.persist(user_id, write);
        self.notify_if_local(user_id, persistence);
        persistence
    }

    // ─── Sync ───────────────────────────────────────────────────────────

    pub fn has_pending_sync(&self, user_id: &str) -> bool {
        self.pending_sync.contains_key(user_id)
    }

    /// Replays the learner's unsent writes, oldest first. A local copy started
    /// during an outage is then replaced by the stored profile.
    pub fn resync(&self, user_id: &str) -> Persistence {
        let Some((_, mut queue)) = self.pending_sync.remove(user_id) else {
            if self.unloaded.contains(user_id) {
                self.ensure_cached(user_id);
            }
            return Persistence::Synced;
        };

        match self.flush(user_id, &mut queue) {
            Ok(()) => {
                self.ensure_cached(user_id);
                info!(user_id = %user_id, "Local profile synced to store");
                self.notify(user_id, NotificationKind::Success, "Your progress is synced");
                Persistence::Synced
            }
            Err(err) => {
                warn!(user_id = %user_id, queued = queue.len(), error = %err, "Resync failed");
                metrics::counter!("profile.sync_failures").increment(1);
                self.pending_sync.insert(user_id.to_string(), queue);
                Persistence::LocalOnly
            }
        }
    }
}

fn completion_badge(journey: &Journey, now: chrono::DateTime<chrono::Utc>) -> Badge {
    Badge {
        id: Uuid::new_v4(),
        journey_id: journey.id.clone(),
        title: format!("{} Finisher", journey.title),
        awarded_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryProfileStore;
    use crate::types::ConfirmationKind;
    use chrono::{TimeZone, Utc};
    use wellness_core::clock::ManualClock;
    use wellness_core::notify::{capture_sink, CaptureSink};

    const REFLECTION: &str = "Naming the worry out loud made it feel smaller and easier to hold.";

    struct Harness {
        engine: JourneyEngine,
        store: Arc<InMemoryProfileStore>,
        sink: Arc<CaptureSink>,
        clock: Arc<ManualClock>,
    }

    fn harness() -> Harness {
        let store = Arc::new(InMemoryProfileStore::new());
        let sink = capture_sink();
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 5, 4, 19, 30, 0).unwrap(),
        ));
        let engine = JourneyEngine::new(
            Arc::new(JourneyCatalog::seeded()),
            store.clone(),
            &AppConfig::default(),
        )
        .with_clock(clock.clone())
        .with_notifier(sink.clone());
        Harness {
            engine,
            store,
            sink,
            clock,
        }
    }

    fn engaged(secs: u64, confirmation: Option<ConfirmationKind>) -> EngagementSnapshot {
        EngagementSnapshot {
            elapsed_secs: secs,
            reflection_text: REFLECTION.to_string(),
            confirmation,
        }
    }

    #[test]
    fn test_enroll_creates_progress_and_persists() {
        let h = harness();
        let outcome = h.engine.enroll("maya", "anxiety-toolkit");
        assert_eq!(
            outcome,
            EnrollOutcome::Enrolled {
                persistence: Persistence::Synced
            }
        );

        let progress = h.engine.progress("maya", "anxiety-toolkit").unwrap();
        assert_eq!(progress.current_step, 1);
        assert!(progress.completed_step_ids.is_empty());
        assert_eq!(progress.started_at, h.clock.now());

        let stored = h.store.snapshot("maya").unwrap();
        assert!(stored.is_enrolled("anxiety-toolkit"));
        assert_eq!(h.sink.count_kind(NotificationKind::Success), 1);
    }

    #[test]
    fn test_double_enroll_is_informational() {
        let h = harness();
        h.engine.enroll("maya", "sleep-reset");
        let second = h.engine.enroll("maya", "sleep-reset");

        assert_eq!(
            second,
            EnrollOutcome::Rejected {
                rejection: Rejection::AlreadyEnrolled
            }
        );
        assert_eq!(h.engine.profile("maya").journey_progress.len(), 1);
        assert_eq!(h.sink.last().unwrap().kind, NotificationKind::Info);
    }

    #[test]
    fn test_unknown_journey_and_step_are_skipped() {
        let h = harness();
        assert!(matches!(
            h.engine.enroll("maya", "no-such-journey"),
            EnrollOutcome::UnknownJourney { .. }
        ));

        h.engine.enroll("maya", "sleep-reset");
        let request = CompletionRequest::new("sleep-reset", "no-such-step", engaged(600, None));
        assert!(matches!(
            h.engine.complete_step("maya", &request),
            CompletionOutcome::UnknownStep { .. }
        ));
        assert!(h.engine.evaluate_gate("sleep-reset", "nope", &engaged(0, None)).is_none());
    }

    #[test]
    fn test_complete_without_enrollment_is_rejected() {
        let h = harness();
        let request = CompletionRequest::new(
            "sleep-reset",
            "sr-sleep-hygiene",
            engaged(600, Some(ConfirmationKind::Article)),
        );
        assert_eq!(
            h.engine.complete_step("maya", &request),
            CompletionOutcome::Rejected {
                rejection: Rejection::NotEnrolled
            }
        );
    }

    #[test]
    fn test_skipping_ahead_is_rejected_with_message() {
        let h = harness();
        h.engine.enroll("maya", "anxiety-toolkit");

        let request = CompletionRequest::new(
            "anxiety-toolkit",
            "at-body-scan",
            engaged(600, Some(ConfirmationKind::Meditation)),
        );
        let outcome = h.engine.complete_step("maya", &request);

        assert_eq!(
            outcome,
            CompletionOutcome::Rejected {
                rejection: Rejection::NotCurrentStep {
                    expected: 1,
                    attempted: 3
                }
            }
        );
        let last = h.sink.last().unwrap();
        assert_eq!(last.kind, NotificationKind::Error);
        assert!(last.message.contains("complete previous steps first"));
        assert_eq!(h.engine.progress("maya", "anxiety-toolkit").unwrap().current_step, 1);
    }

    #[test]
    fn test_closed_gate_is_rejected() {
        let h = harness();
        h.engine.enroll("maya", "anxiety-toolkit");

        // Article step: no time, no confirmation.
        let request = CompletionRequest::new(
            "anxiety-toolkit",
            "at-understanding",
            EngagementSnapshot::default(),
        );
        assert!(matches!(
            h.engine.complete_step("maya", &request),
            CompletionOutcome::Rejected {
                rejection: Rejection::GateNotSatisfied { pillars_met: 1, required: 2 }
            }
        ));
    }

    #[test]
    fn test_finishing_awards_single_badge() {
        let h = harness();
        h.engine.enroll("maya", "self-compassion");

        let steps = [
            ("sc-inner-critic", Some(ConfirmationKind::Article)),
            ("sc-loving-kindness", Some(ConfirmationKind::Meditation)),
            ("sc-letter", None),
        ];
        let mut last = None;
        for (step_id, confirmation) in steps {
            h.clock.advance_secs(600);
            let request = CompletionRequest::new("self-compassion", step_id, engaged(600, confirmation))
                .with_reflection(REFLECTION, 600);
            last = Some(h.engine.complete_step("maya", &request));
        }

        let (badge, persistence) = match last {
            Some(CompletionOutcome::JourneyCompleted { badge, persistence }) => (badge, persistence),
            other => panic!("expected journey completion, got {other:?}"),
        };
        assert_eq!(persistence, Persistence::Synced);
        assert_eq!(badge.unwrap().title, "Self-Compassion Foundations Finisher");

        let progress = h.engine.progress("maya", "self-compassion").unwrap();
        assert!(progress.completed);
        assert_eq!(progress.completed_at, Some(h.clock.now()));
        assert_eq!(progress.current_step, 4);
        assert_eq!(progress.total_time_spent_secs, 1800);
        assert_eq!(h.engine.status("maya", "self-compassion"), ProgressStatus::Completed);
        assert!(h.engine.next_step("maya", "self-compassion").is_none());
        assert_eq!(h.store.snapshot("maya").unwrap().badges.len(), 1);

        // Re-running the final step cannot earn a second badge.
        let again = CompletionRequest::new("self-compassion", "sc-letter", engaged(600, None));
        assert_eq!(
            h.engine.complete_step("maya", &again),
            CompletionOutcome::Rejected {
                rejection: Rejection::JourneyAlreadyCompleted
            }
        );
        assert_eq!(h.engine.profile("maya").badges.len(), 1);
    }

    #[test]
    fn test_offline_store_keeps_local_changes_until_resync() {
        let h = harness();
        h.engine.enroll("maya", "sleep-reset");
        h.store.set_offline(true);

        let request = CompletionRequest::new(
            "sleep-reset",
            "sr-sleep-hygiene",
            engaged(60, Some(ConfirmationKind::Article)),
        );
        let outcome = h.engine.complete_step("maya", &request);
        assert_eq!(
            outcome,
            CompletionOutcome::Advanced {
                completed_step: 1,
                next_step: 2,
                persistence: Persistence::LocalOnly
            }
        );
        assert!(h.engine.has_pending_sync("maya"));
        assert!(h.sink.last().unwrap().message.contains("Saved locally"));
        assert_eq!(h.engine.progress("maya", "sleep-reset").unwrap().current_step, 2);
        assert_eq!(
            h.store.snapshot("maya").unwrap().progress("sleep-reset").unwrap().current_step,
            1
        );

        assert_eq!(h.engine.resync("maya"), Persistence::LocalOnly);
        h.store.set_offline(false);
        assert_eq!(h.engine.resync("maya"), Persistence::Synced);
        assert!(!h.engine.has_pending_sync("maya"));
        assert_eq!(
            h.store.snapshot("maya").unwrap().progress("sleep-reset").unwrap().current_step,
            2
        );
    }

    fn established_profile(user_id: &str) -> UserProfile {
        let mut profile = UserProfile::new(user_id);
        profile.wellness_streak = 30;
        profile.forum_posts = 12;
        profile.goals.push(Goal::new("Hydrate"));
        profile
    }

    #[test]
    fn test_outage_on_first_load_keeps_stored_profile() {
        let h = harness();
        h.store.insert(established_profile("sam"));
        h.store.set_offline(true);

        let outcome = h.engine.enroll("sam", "sleep-reset");
        assert_eq!(
            outcome,
            EnrollOutcome::Enrolled {
                persistence: Persistence::LocalOnly
            }
        );
        assert!(h.engine.has_pending_sync("sam"));

        h.store.set_offline(false);
        assert_eq!(h.engine.resync("sam"), Persistence::Synced);
        assert!(!h.engine.has_pending_sync("sam"));

        let stored = h.store.snapshot("sam").unwrap();
        assert_eq!(stored.wellness_streak, 30);
        assert_eq!(stored.forum_posts, 12);
        assert_eq!(stored.goals.len(), 1);
        assert!(stored.is_enrolled("sleep-reset"));

        let local = h.engine.profile("sam");
        assert_eq!(local, stored);
    }

    #[test]
    fn test_local_copy_reloads_with_unsent_writes_after_outage() {
        let h = harness();
        h.store.insert(established_profile("sam"));
        h.store.set_offline(true);

        assert_eq!(h.engine.log_mood("sam", 2, None), Persistence::LocalOnly);
        assert_eq!(h.engine.profile("sam").wellness_streak, 0);

        h.store.set_offline(false);
        let local = h.engine.profile("sam");
        assert_eq!(local.wellness_streak, 30);
        assert_eq!(local.mood_log.len(), 1);
        assert!(h.engine.has_pending_sync("sam"));
        assert!(h.store.snapshot("sam").unwrap().mood_log.is_empty());

        assert_eq!(h.engine.log_mood("sam", 4, None), Persistence::Synced);
        let stored = h.store.snapshot("sam").unwrap();
        assert_eq!(stored.mood_log.iter().map(|m| m.mood).collect::<Vec<_>>(), vec![2, 4]);
        assert_eq!(stored.wellness_streak, 30);
        assert!(!h.engine.has_pending_sync("sam"));
    }

    #[test]
    fn test_unsent_mood_is_replayed_before_next_write() {
        let h = harness();
        h.engine.enroll("maya", "sleep-reset");
        h.store.set_offline(true);

        assert_eq!(h.engine.log_mood("maya", 3, None), Persistence::LocalOnly);
        assert_eq!(h.engine.upsert_goal("maya", Goal::new("Stretch")), Persistence::LocalOnly);

        h.store.set_offline(false);
        // The store still lacks the queued writes, so this one flushes them first.
        assert_eq!(h.engine.log_mood("maya", 5, None), Persistence::Synced);
        assert!(!h.engine.has_pending_sync("maya"));

        let stored = h.store.snapshot("maya").unwrap();
        assert_eq!(stored.mood_log.iter().map(|m| m.mood).collect::<Vec<_>>(), vec![3, 5]);
        assert_eq!(stored.goals.len(), 1);
        assert_eq!(stored, h.engine.profile("maya"));
    }

    #[test]
    fn test_existing_profile_is_loaded_from_store() {
        let h = harness();
        let mut profile = UserProfile::new("sam");
        profile.wellness_streak = 7;
        profile.forum_posts = 3;
        h.store.insert(profile);

        assert_eq!(h.engine.profile("sam").wellness_streak, 7);
        h.engine.enroll("sam", "anxiety-toolkit");
        let stored = h.store.snapshot("sam").unwrap();
        assert_eq!(stored.forum_posts, 3);
        assert!(stored.is_enrolled("anxiety-toolkit"));
    }

    #[test]
    fn test_unenroll_removes_record() {
        let h = harness();
        assert_eq!(h.engine.unenroll("maya", "sleep-reset"), UnenrollOutcome::NotEnrolled);

        h.engine.enroll("maya", "sleep-reset");
        assert_eq!(
            h.engine.unenroll("maya", "sleep-reset"),
            UnenrollOutcome::Unenrolled {
                persistence: Persistence::Synced
            }
        );
        assert_eq!(h.engine.status("maya", "sleep-reset"), ProgressStatus::NotEnrolled);
        assert!(!h.store.snapshot("maya").unwrap().is_enrolled("sleep-reset"));
    }

    #[test]
    fn test_activity_feeds_compass() {
        let h = harness();
        let baseline = h.engine.compass("maya");
        assert_eq!(baseline.east, 50);

        for mood in [5, 4, 5] {
            h.clock.advance_secs(3600);
            assert_eq!(h.engine.log_mood("maya", mood, None), Persistence::Synced);
        }
        let mut goal = Goal::new("Walk after lunch");
        goal.completed = true;
        h.engine.upsert_goal("maya", goal);
        h.engine.enroll("maya", "anxiety-toolkit");

        let reading = h.engine.compass("maya");
        // (5 + 4 + 5) / 3 / 5 * 100
        assert_eq!(reading.east, 93);
        // (100 + 20) / 2
        assert_eq!(reading.north, 60);
        assert_eq!(h.store.snapshot("maya").unwrap().mood_log.len(), 3);
    }

    #[test]
    fn test_recommendations_skip_unknown_journeys() {
        let h = harness();
        let policy = StaticRecommendationTable::new(Recommendation::default()).with_entry(
            "sleep",
            Recommendation {
                journey_ids: vec!["retired-journey".to_string(), "sleep-reset".to_string()],
                ..Default::default()
            },
        );
        let engine = h.engine.clone().with_recommendations(Arc::new(policy));

        assert_eq!(engine.recommend("sleep").journey_ids, vec!["sleep-reset".to_string()]);
        let journeys = engine.recommended_journeys("sleep");
        assert_eq!(journeys.len(), 1);
        assert_eq!(journeys[0].title, "Sleep Reset");
        assert_eq!(h.engine.recommended_journeys("anxiety")[0].id, "anxiety-toolkit");
    }
}

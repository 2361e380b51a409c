//! End-to-end progression flows against the in-memory profile store.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use wellness_core::clock::ManualClock;
use wellness_core::config::AppConfig;
use wellness_core::notify::capture_sink;
use wellness_journey::engine::{CompletionOutcome, EnrollOutcome, Persistence, UnenrollOutcome};
use wellness_journey::evaluator::{EngagementSession, EngagementSnapshot};
use wellness_journey::progression::{CompletionRequest, Rejection};
use wellness_journey::state_machine::ProgressStatus;
use wellness_journey::types::{ConfirmationKind, Difficulty, Journey, JourneyStep, StepType};
use wellness_journey::{InMemoryProfileStore, JourneyCatalog, JourneyEngine};

fn meditation_journey(steps: u32) -> Journey {
    Journey {
        id: "daily-stillness".to_string(),
        title: "Daily Stillness".to_string(),
        description: "Five short sits".to_string(),
        difficulty: Difficulty::Beginner,
        category: "stress".to_string(),
        steps: (1..=steps)
            .map(|position| JourneyStep {
                id: format!("sit-{position}"),
                position,
                title: format!("Sit {position}"),
                step_type: StepType::Meditation,
                min_time_secs: None,
                content: Some("Breathe and notice.".to_string()),
                article_id: None,
            })
            .collect(),
    }
}

fn engine_with(catalog: JourneyCatalog) -> (JourneyEngine, Arc<InMemoryProfileStore>) {
    let store = Arc::new(InMemoryProfileStore::new());
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 9, 14, 7, 0, 0).unwrap(),
    ));
    let engine = JourneyEngine::new(Arc::new(catalog), store.clone(), &AppConfig::default())
        .with_clock(clock);
    (engine, store)
}

fn confirmed_without_reflection(secs: u64) -> EngagementSnapshot {
    EngagementSnapshot {
        elapsed_secs: secs,
        reflection_text: String::new(),
        confirmation: Some(ConfirmationKind::Meditation),
    }
}

#[test]
fn test_time_and_confirmation_unlock_three_of_five_steps() {
    let catalog = JourneyCatalog::new(vec![meditation_journey(5)]).unwrap();
    let (engine, _store) = engine_with(catalog);
    engine.enroll("ari", "daily-stillness");

    for position in 1..=3 {
        let request = CompletionRequest::new(
            "daily-stillness",
            format!("sit-{position}"),
            confirmed_without_reflection(60 + position as u64),
        );
        let outcome = engine.complete_step("ari", &request);
        assert!(
            matches!(outcome, CompletionOutcome::Advanced { .. }),
            "step {position}: {outcome:?}"
        );
    }

    let progress = engine.progress("ari", "daily-stillness").unwrap();
    assert_eq!(progress.current_step, 4);
    assert_eq!(progress.completed_step_ids.len(), 3);
    assert!(progress.reflections.is_empty());
    assert_eq!(progress.total_time_spent_secs, 0);
    assert!(!progress.completed);
    assert_eq!(engine.percent_complete("ari", "daily-stillness"), Some(60));
    assert_eq!(engine.next_step("ari", "daily-stillness").unwrap().id, "sit-4");
}

#[test]
fn test_completing_every_step_in_order() {
    let steps = 4;
    let catalog = JourneyCatalog::new(vec![meditation_journey(steps)]).unwrap();
    let (engine, store) = engine_with(catalog);
    engine.enroll("ari", "daily-stillness");

    for position in 1..=steps {
        let request = CompletionRequest::new(
            "daily-stillness",
            format!("sit-{position}"),
            confirmed_without_reflection(90),
        );
        engine.complete_step("ari", &request);
    }

    let progress = engine.progress("ari", "daily-stillness").unwrap();
    assert_eq!(progress.current_step, steps + 1);
    assert_eq!(progress.completed_step_ids.len(), steps as usize);
    assert!(progress.completed);
    assert_eq!(engine.status("ari", "daily-stillness"), ProgressStatus::Completed);

    let stored = store.snapshot("ari").unwrap();
    assert_eq!(stored.progress("daily-stillness").unwrap().current_step, steps + 1);
    assert_eq!(stored.badges.len(), 1);
    assert_eq!(stored.badges[0].journey_id, "daily-stillness");
}

#[test]
fn test_out_of_order_leaves_state_unchanged() {
    let (engine, _store) = engine_with(JourneyCatalog::new(vec![meditation_journey(5)]).unwrap());
    engine.enroll("ari", "daily-stillness");
    engine.complete_step(
        "ari",
        &CompletionRequest::new("daily-stillness", "sit-1", confirmed_without_reflection(60)),
    );
    let before = engine.progress("ari", "daily-stillness").unwrap();

    for step_id in ["sit-1", "sit-3", "sit-5"] {
        let outcome = engine.complete_step(
            "ari",
            &CompletionRequest::new("daily-stillness", step_id, confirmed_without_reflection(600)),
        );
        assert!(matches!(outcome, CompletionOutcome::Rejected { .. }), "{step_id}");
    }

    assert_eq!(engine.progress("ari", "daily-stillness").unwrap(), before);
}

#[test]
fn test_unenroll_then_re_enroll_starts_fresh() {
    let (engine, store) = engine_with(JourneyCatalog::new(vec![meditation_journey(5)]).unwrap());
    engine.enroll("ari", "daily-stillness");
    for position in 1..=3 {
        engine.complete_step(
            "ari",
            &CompletionRequest::new(
                "daily-stillness",
                format!("sit-{position}"),
                confirmed_without_reflection(60),
            ),
        );
    }
    assert_eq!(engine.progress("ari", "daily-stillness").unwrap().completed_step_ids.len(), 3);

    assert!(matches!(
        engine.unenroll("ari", "daily-stillness"),
        UnenrollOutcome::Unenrolled { .. }
    ));
    assert!(engine.progress("ari", "daily-stillness").is_none());
    assert!(store.snapshot("ari").unwrap().journey_progress.is_empty());

    assert_eq!(
        engine.enroll("ari", "daily-stillness"),
        EnrollOutcome::Enrolled {
            persistence: Persistence::Synced
        }
    );
    let fresh = engine.progress("ari", "daily-stillness").unwrap();
    assert_eq!(fresh.current_step, 1);
    assert!(fresh.completed_step_ids.is_empty());
    assert!(fresh.reflections.is_empty());
}

#[test]
fn test_double_enroll_keeps_one_record() {
    let (engine, _store) = engine_with(JourneyCatalog::seeded());
    engine.enroll("ari", "sleep-reset");
    assert_eq!(
        engine.enroll("ari", "sleep-reset"),
        EnrollOutcome::Rejected {
            rejection: Rejection::AlreadyEnrolled
        }
    );
    assert_eq!(engine.profile("ari").journey_progress.len(), 1);
}

#[test]
fn test_session_driven_flow_records_reflections() {
    let sink = capture_sink();
    let (engine, _store) = engine_with(JourneyCatalog::seeded());
    let engine = engine.with_notifier(sink.clone());
    engine.enroll("ari", "anxiety-toolkit");

    // Step 1: article read with the acknowledgment ticked.
    let mut session = EngagementSession::open("at-understanding");
    session.tick_by(20);
    session.confirm(ConfirmationKind::Article);
    let status = engine
        .evaluate_gate("anxiety-toolkit", "at-understanding", &session.snapshot())
        .unwrap();
    assert!(status.can_complete);
    assert_eq!(status.secs_remaining, 40);
    engine.complete_step(
        "ari",
        &CompletionRequest::from_session("anxiety-toolkit", &session),
    );

    // Step 2: exercise with a written reflection, before the 120s minimum.
    let mut session = EngagementSession::open("at-box-breathing");
    session.tick_by(45);
    session.set_reflection(
        "Box breathing slowed my heart rate; counting kept my mind from racing ahead.",
    );
    let outcome = engine.complete_step(
        "ari",
        &CompletionRequest::from_session("anxiety-toolkit", &session),
    );
    assert!(matches!(
        outcome,
        CompletionOutcome::Advanced {
            completed_step: 2,
            next_step: 3,
            ..
        }
    ));

    // Navigating away discards the session; a new one starts at zero.
    drop(session);
    let reopened = EngagementSession::open("at-body-scan");
    let status = engine
        .evaluate_gate("anxiety-toolkit", "at-body-scan", &reopened.snapshot())
        .unwrap();
    assert!(!status.can_complete);
    assert_eq!(status.secs_remaining, 300);

    let progress = engine.progress("ari", "anxiety-toolkit").unwrap();
    assert_eq!(progress.reflections.len(), 1);
    assert_eq!(progress.reflections[0].step_id, "at-box-breathing");
    assert_eq!(progress.total_time_spent_secs, 45);
    assert_eq!(sink.count_kind(wellness_core::NotificationKind::Error), 0);
}

#[test]
fn test_compass_south_scenario_through_profile_store() {
    let (engine, store) = engine_with(JourneyCatalog::seeded());
    let now = Utc::now();
    let mut profile = wellness_core::types::UserProfile::new("ari");
    profile.wellness_streak = 7;
    profile.journal_entries = (0..5)
        .map(|_| wellness_core::types::JournalEntry {
            id: uuid::Uuid::new_v4(),
            created_at: now,
        })
        .collect();
    profile.appointments = vec![wellness_core::types::Appointment {
        id: uuid::Uuid::new_v4(),
        scheduled_at: now,
    }];
    store.insert(profile);

    let first = engine.compass("ari");
    assert_eq!(first.south, 50);
    assert_eq!(first, engine.compass("ari"));
}

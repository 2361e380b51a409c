//! Wellness Compass: command-line driver for the guided journey engine.
//!
//! Lists the journey catalog, evaluates engagement gates, and walks a demo
//! learner through a journey, printing progress and the Compass Calibration.

use std::sync::Arc;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};
use wellness_core::config::AppConfig;
use wellness_core::notify::tracing_sink;
use wellness_core::types::{Goal, JourneyProgress};
use wellness_journey::compass::CompassReading;
use wellness_journey::engine::CompletionOutcome;
use wellness_journey::evaluator::{EngagementSession, EngagementSnapshot};
use wellness_journey::progression::CompletionRequest;
use wellness_journey::recommend::Recommendation;
use wellness_journey::{InMemoryProfileStore, JourneyCatalog, JourneyEngine};

#[derive(Parser, Debug)]
#[command(name = "wellness-compass")]
#[command(about = "Guided journey progression and Compass Calibration")]
#[command(version)]
struct Cli {
    /// Optional TOML config file
    #[arg(long, env = "WELLNESS_CONFIG")]
    config: Option<String>,

    /// Journey catalog JSON file (overrides config)
    #[arg(long, env = "WELLNESS__CATALOG__PATH")]
    catalog: Option<String>,

    /// Run with the profile store unreachable
    #[arg(long, default_value_t = false)]
    offline: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List journeys in the catalog
    Catalog {
        /// Only show journeys in this category
        #[arg(long)]
        category: Option<String>,
    },

    /// Evaluate the engagement gate for one step
    Gate {
        #[arg(long)]
        journey: String,

        #[arg(long)]
        step: String,

        /// Seconds spent on the step so far
        #[arg(long, default_value_t = 0)]
        elapsed: u64,

        /// Reflection text written so far
        #[arg(long, default_value = "")]
        reflection: String,

        /// Tick the step's "I did this" acknowledgment
        #[arg(long, default_value_t = false)]
        confirm: bool,
    },

    /// Walk a learner through a journey and report the result
    Demo {
        #[arg(short, long, default_value = "demo-learner")]
        user: String,

        #[arg(short, long, default_value = "anxiety-toolkit")]
        journey: String,

        /// Number of steps to complete (default: all)
        #[arg(long)]
        steps: Option<u32>,

        /// Primary struggle used for recommendations
        #[arg(long, default_value = "anxiety")]
        struggle: String,
    },
}

#[derive(Debug, Serialize)]
struct DemoReport {
    user_id: String,
    progress: Option<JourneyProgress>,
    percent_complete: Option<u8>,
    compass: CompassReading,
    band: &'static str,
    weakest_axis: &'static str,
    recommendations: Recommendation,
    pending_sync: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wellness_compass=info,wellness_journey=info".into()),
        )
        .json()
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref()).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    if let Some(path) = cli.catalog {
        config.catalog.path = Some(path);
    }
    if cli.offline {
        config.store.simulate_offline = true;
    }

    info!(
        service = %config.service_name,
        catalog = config.catalog.path.as_deref().unwrap_or("built-in"),
        offline = config.store.simulate_offline,
        "Configuration loaded"
    );

    let catalog = match &config.catalog.path {
        Some(path) => JourneyCatalog::from_path(path)
            .with_context(|| format!("loading journey catalog from {path}"))?,
        None => JourneyCatalog::seeded(),
    };

    let store = Arc::new(InMemoryProfileStore::new());
    store.set_offline(config.store.simulate_offline);

    let engine = JourneyEngine::new(Arc::new(catalog), store.clone(), &config)
        .with_notifier(tracing_sink());

    match cli.command {
        Commands::Catalog { category } => {
            let journeys: Vec<_> = match &category {
                Some(category) => engine.catalog().by_category(category).collect(),
                None => engine.catalog().journeys().iter().collect(),
            };
            println!("{}", serde_json::to_string_pretty(&journeys)?);
        }
        Commands::Gate {
            journey,
            step,
            elapsed,
            reflection,
            confirm,
        } => {
            let definition = engine
                .catalog()
                .step(&journey, &step)
                .ok_or_else(|| anyhow!("step {step} not found in journey {journey}"))?;
            let snapshot = EngagementSnapshot {
                elapsed_secs: elapsed,
                reflection_text: reflection,
                confirmation: if confirm {
                    definition.step_type.confirmation_kind()
                } else {
                    None
                },
            };
            let status = engine
                .evaluate_gate(&journey, &step, &snapshot)
                .ok_or_else(|| anyhow!("step {step} not found in journey {journey}"))?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Commands::Demo {
            user,
            journey,
            steps,
            struggle,
        } => {
            let report = run_demo(&engine, &user, &journey, steps, &struggle)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

fn run_demo(
    engine: &JourneyEngine,
    user_id: &str,
    journey_id: &str,
    steps: Option<u32>,
    struggle: &str,
) -> anyhow::Result<DemoReport> {
    let journey = engine
        .catalog()
        .get(journey_id)
        .cloned()
        .ok_or_else(|| anyhow!("journey {journey_id} not found"))?;

    for mood in [3, 4, 4] {
        engine.log_mood(user_id, mood, None);
    }
    let mut goal = Goal::new(format!("Finish {}", journey.title));
    engine.upsert_goal(user_id, goal.clone());

    engine.enroll(user_id, journey_id);

    let limit = steps.unwrap_or(journey.step_count() as u32);
    for step in journey.steps.iter().take(limit as usize) {
        let mut session = EngagementSession::open(&step.id);
        session.tick_by(step.min_time_secs.unwrap_or(60));
        if step.step_type.requires_reflection() {
            session.set_reflection(format!(
                "Working through \"{}\" helped me notice what I feel and what I need today.",
                step.title
            ));
        }
        if let Some(kind) = step.step_type.confirmation_kind() {
            session.confirm(kind);
        }

        match engine.complete_step(user_id, &CompletionRequest::from_session(journey_id, &session)) {
            CompletionOutcome::JourneyCompleted { .. } => {
                goal.completed = true;
                engine.upsert_goal(user_id, goal.clone());
            }
            CompletionOutcome::Rejected { rejection } => {
                warn!(step_id = %step.id, reason = %rejection, "Demo step rejected");
                break;
            }
            _ => {}
        }
    }

    let compass = engine.compass(user_id);
    Ok(DemoReport {
        user_id: user_id.to_string(),
        progress: engine.progress(user_id, journey_id),
        percent_complete: engine.percent_complete(user_id, journey_id),
        band: compass.band.label(),
        weakest_axis: compass.weakest.label(),
        compass,
        recommendations: engine.recommend(struggle),
        pending_sync: engine.has_pending_sync(user_id),
    })
}

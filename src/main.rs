//! Demo runner: drives one short session end-to-end against a running
//! backend using the synthetic frame source.
//!
//! Usage: `posepal [config.json] [exercise]`, with `POSEPAL_SERVER_URL`
//! overriding the backend address.

use std::{path::PathBuf, time::Duration};

use anyhow::Result;
use log::{info, warn};

use posepal::{AnalysisState, EngineConfig, Exercise, WorkoutController};

const SESSION_SECS: u64 = 15;
const ANALYSIS_WAIT_SECS: u64 = 60;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let mut args = std::env::args().skip(1);
    let config_path = args.next().map(PathBuf::from);
    let exercise = match args.next() {
        Some(name) => name.parse::<Exercise>()?,
        None => Exercise::Squat,
    };

    let config = EngineConfig::load(config_path.as_deref())?;
    info!("posepal engine starting against {}", config.server_url);

    let controller = WorkoutController::new(config)?;

    let mut events = controller.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let Ok(json) = serde_json::to_string(&event) {
                info!("event: {json}");
            }
        }
    });

    if let Err(err) = controller.health().await {
        warn!("backend health probe failed: {err}");
    }

    controller.start(exercise).await?;
    tokio::time::sleep(Duration::from_secs(SESSION_SECS)).await;
    let snapshot = controller.stop().await?;
    info!(
        "session finished with {} reps over {} samples",
        snapshot.reps.count,
        snapshot.metric_history.len()
    );

    let deadline = tokio::time::Instant::now() + Duration::from_secs(ANALYSIS_WAIT_SECS);
    loop {
        let snapshot = controller.get_snapshot().await;
        match snapshot.analysis {
            AnalysisState::Success { analysis } => {
                info!("posture report: {}", analysis.overall_assessment);
                for suggestion in &analysis.specific_suggestions {
                    info!(
                        "  [{:?}] {}: {}",
                        suggestion.priority, suggestion.issue, suggestion.suggestion
                    );
                }
                if let Some(session_id) = snapshot.completed_session_id {
                    if let Ok(summary) = controller.session_summary(session_id).await {
                        info!(
                            "summary: {} reps across {}s",
                            summary.total_reps, summary.duration_sec
                        );
                    }
                }
                break;
            }
            AnalysisState::Error { message } => {
                warn!("analysis failed: {message}");
                break;
            }
            _ => {
                if tokio::time::Instant::now() >= deadline {
                    warn!("analysis did not resolve in time");
                    break;
                }
                tokio::time::sleep(Duration::from_millis(250)).await;
            }
        }
    }

    controller.shutdown().await;
    Ok(())
}

//! Posture analysis orchestrator: one analyze-and-cleanup round-trip
//! per completed session, exposed as a loading/error/result sub-state
//! rather than a thrown error.

use std::sync::Arc;
use tokio::sync::Mutex;

use crate::api::ApiClient;
use crate::events::{EngineEvent, EventBus};
use crate::session::{AnalysisState, EngineState, LifecyclePhase};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

#[derive(Clone)]
pub struct AnalysisOrchestrator {
    api: ApiClient,
    state: Arc<Mutex<EngineState>>,
    events: EventBus,
}

impl AnalysisOrchestrator {
    pub fn new(api: ApiClient, state: Arc<Mutex<EngineState>>, events: EventBus) -> Self {
        Self { api, state, events }
    }

    /// Kick off analysis for a just-completed session. Supersedes any
    /// prior result; the request itself runs detached and reports back
    /// through the analysis sub-state.
    pub async fn trigger(&self, session_id: i64) {
        let epoch = {
            let mut guard = self.state.lock().await;
            guard.analysis_epoch += 1;
            guard.analysis = AnalysisState::Loading;
            guard.analysis_epoch
        };
        self.events.emit(EngineEvent::AnalysisStateChanged {
            state: AnalysisState::Loading,
        });

        let orchestrator = self.clone();
        tokio::spawn(async move {
            orchestrator.run(session_id, epoch).await;
        });
    }

    async fn run(&self, session_id: i64, epoch: u64) {
        let outcome = self.api.analyze_and_cleanup(session_id).await;

        let mut guard = self.state.lock().await;
        if guard.analysis_epoch != epoch {
            // A newer session superseded this request; only the most
            // recent result is kept.
            log_info!("discarding stale analysis result for session {session_id}");
            return;
        }

        guard.analysis = match outcome {
            Ok(analysis) => {
                log_info!("analysis ready for session {session_id}");
                AnalysisState::Success { analysis }
            }
            Err(err) => {
                log_warn!("analysis failed for session {session_id}: {err}");
                AnalysisState::Error {
                    message: err.message().to_string(),
                }
            }
        };
        if guard.phase == LifecyclePhase::AnalysisPending {
            guard.phase = LifecyclePhase::Idle;
        }
        let analysis = guard.analysis.clone();
        let snapshot = guard.snapshot();
        drop(guard);

        self.events
            .emit(EngineEvent::AnalysisStateChanged { state: analysis });
        self.events.emit(EngineEvent::StateChanged { snapshot });
    }
}

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use log::{info, warn};
use tokio::sync::{broadcast, Mutex};

use crate::analysis::AnalysisOrchestrator;
use crate::api::types::{SessionSummary, TipsRequest, TipsResponse};
use crate::api::ApiClient;
use crate::capture::{EncoderSettings, FrameSource, SyntheticSource};
use crate::config::EngineConfig;
use crate::error::{ApiError, EngineError};
use crate::events::{EngineEvent, EventBus};
use crate::metrics::MetricsForwarder;
use crate::models::Exercise;
use crate::reps::RepPulse;
use crate::streaming::{StreamContext, StreamingController};

use super::state::{EngineSnapshot, EngineState, LifecyclePhase};

type SourceFactory = Arc<dyn Fn() -> Box<dyn FrameSource> + Send + Sync>;

/// Root of the engine: owns the lifecycle state machine and the active
/// session identity, and gates every other component on it. Cheap to
/// clone; clones share the same engine.
#[derive(Clone)]
pub struct WorkoutController {
    state: Arc<Mutex<EngineState>>,
    api: ApiClient,
    events: EventBus,
    config: EngineConfig,
    streaming: Arc<Mutex<StreamingController>>,
    metrics: MetricsForwarder,
    analysis: AnalysisOrchestrator,
    pulse: Arc<Mutex<RepPulse>>,
    source_factory: SourceFactory,
}

impl WorkoutController {
    /// Engine with the synthetic frame source; real deployments inject
    /// a camera through [`WorkoutController::with_frame_source`].
    pub fn new(config: EngineConfig) -> Result<Self> {
        let width = config.frame_max_width;
        let height = config.frame_max_height;
        Self::with_frame_source(
            config,
            Arc::new(move || Box::new(SyntheticSource::new(width, height)) as Box<dyn FrameSource>),
        )
    }

    pub fn with_frame_source(config: EngineConfig, source_factory: SourceFactory) -> Result<Self> {
        let api = ApiClient::new(&config)?;
        let state = Arc::new(Mutex::new(EngineState::default()));
        let events = EventBus::new();

        Ok(Self {
            metrics: MetricsForwarder::new(api.clone(), state.clone(), events.clone()),
            analysis: AnalysisOrchestrator::new(api.clone(), state.clone(), events.clone()),
            pulse: Arc::new(Mutex::new(RepPulse::new(config.rep_display_window()))),
            streaming: Arc::new(Mutex::new(StreamingController::new())),
            state,
            api,
            events,
            config,
            source_factory,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    pub async fn get_snapshot(&self) -> EngineSnapshot {
        self.state.lock().await.snapshot()
    }

    /// Start a session for the given exercise. Fails fast unless the
    /// engine is idle; on backend failure no partial state is retained.
    pub async fn start(&self, exercise: Exercise) -> Result<EngineSnapshot, EngineError> {
        {
            let mut guard = self.state.lock().await;
            if guard.phase != LifecyclePhase::Idle {
                return Err(EngineError::InvalidState {
                    op: "start",
                    phase: guard.phase,
                });
            }
            guard.phase = LifecyclePhase::Starting;
        }
        self.emit_state_changed().await;

        // Acquire the capture device before involving the backend, so a
        // denied camera never leaves an orphaned server-side session.
        let mut source = (self.source_factory)();
        if let Err(err) = source.open() {
            self.revert_to_idle().await;
            return Err(EngineError::CaptureUnavailable(format!("{err:#}")));
        }

        let session_id = match self.api.start_session(exercise).await {
            Ok(id) => id,
            Err(err) => {
                source.close();
                self.revert_to_idle().await;
                return Err(EngineError::StartFailed(err));
            }
        };

        let started_at = Utc::now();
        {
            let mut guard = self.state.lock().await;
            guard.begin_session(session_id, exercise, started_at);
        }
        self.pulse.lock().await.cancel();

        let ctx = StreamContext {
            session_id,
            started_at,
            api: self.api.clone(),
            state: self.state.clone(),
            events: self.events.clone(),
            metrics: self.metrics.clone(),
            pulse: self.pulse.clone(),
            frame_interval: self.config.frame_interval(),
            refresh_interval: self.config.refresh_interval(),
            encoder: EncoderSettings {
                max_width: self.config.frame_max_width,
                max_height: self.config.frame_max_height,
                jpeg_quality: self.config.jpeg_quality,
            },
        };
        self.streaming.lock().await.start_streaming(ctx, source).await;

        info!("session {session_id} started ({exercise})");
        self.emit_state_changed().await;
        Ok(self.get_snapshot().await)
    }

    /// Stop the active session. On backend failure the session stays
    /// active and the caller may retry; on success streaming is torn
    /// down before this returns and analysis is triggered.
    pub async fn stop(&self) -> Result<EngineSnapshot, EngineError> {
        let session_id = {
            let mut guard = self.state.lock().await;
            if guard.phase != LifecyclePhase::Active {
                return Err(EngineError::InvalidState {
                    op: "stop",
                    phase: guard.phase,
                });
            }
            let Some(id) = guard.active_session_id() else {
                return Err(EngineError::InvalidState {
                    op: "stop",
                    phase: guard.phase,
                });
            };
            guard.phase = LifecyclePhase::Stopping;
            id
        };
        self.emit_state_changed().await;

        if let Err(err) = self.api.stop_session(session_id, Utc::now()).await {
            let mut guard = self.state.lock().await;
            guard.phase = LifecyclePhase::Active;
            drop(guard);
            self.emit_state_changed().await;
            return Err(EngineError::StopFailed(err));
        }

        // Stop acknowledged: no further frames may be captured or
        // dispatched from here on.
        self.streaming.lock().await.stop_streaming().await;

        let completed = {
            let mut guard = self.state.lock().await;
            guard.finish_session()
        };
        self.emit_state_changed().await;

        if let Some(completed_id) = completed {
            info!("session {completed_id} stopped, requesting analysis");
            self.events.emit(EngineEvent::SessionCompleted {
                session_id: completed_id,
            });
            self.analysis.trigger(completed_id).await;
        }

        Ok(self.get_snapshot().await)
    }

    /// Teardown path for embedding UIs: cancels streaming and any
    /// pending pulse without talking to the backend.
    pub async fn shutdown(&self) {
        self.streaming.lock().await.stop_streaming().await;
        self.pulse.lock().await.cancel();

        let mut guard = self.state.lock().await;
        if guard.phase != LifecyclePhase::Idle {
            warn!("engine shut down with a session still in flight");
            guard.phase = LifecyclePhase::Idle;
            guard.session = None;
        }
        drop(guard);
        self.emit_state_changed().await;
    }

    pub async fn fetch_tips(
        &self,
        exercise: Exercise,
        flags: Vec<String>,
        level: &str,
    ) -> Result<TipsResponse, ApiError> {
        self.api
            .fetch_tips(&TipsRequest {
                exercise,
                flags,
                level: level.to_string(),
            })
            .await
    }

    pub async fn session_summary(&self, session_id: i64) -> Result<SessionSummary, ApiError> {
        self.api.session_summary(session_id).await
    }

    pub async fn health(&self) -> Result<(), ApiError> {
        self.api.health().await
    }

    async fn revert_to_idle(&self) {
        let mut guard = self.state.lock().await;
        guard.phase = LifecyclePhase::Idle;
        guard.session = None;
        drop(guard);
        self.emit_state_changed().await;
    }

    async fn emit_state_changed(&self) {
        let snapshot = self.state.lock().await.snapshot();
        self.events.emit(EngineEvent::StateChanged { snapshot });
    }
}

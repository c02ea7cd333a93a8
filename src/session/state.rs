use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use crate::api::types::PostureAnalysis;
use crate::metrics::MetricSample;
use crate::models::{Exercise, Session};

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum LifecyclePhase {
    #[default]
    Idle,
    Starting,
    Active,
    Stopping,
    AnalysisPending,
}

impl LifecyclePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecyclePhase::Idle => "idle",
            LifecyclePhase::Starting => "starting",
            LifecyclePhase::Active => "active",
            LifecyclePhase::Stopping => "stopping",
            LifecyclePhase::AnalysisPending => "analysisPending",
        }
    }
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client-held mirror of the backend's authoritative rep count.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RepState {
    pub count: u32,
    pub just_detected: bool,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Sub-state of the posture analysis orchestrator.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum AnalysisState {
    #[default]
    Idle,
    Loading,
    Success {
        analysis: PostureAnalysis,
    },
    Error {
        message: String,
    },
}

/// Mutable engine core. All mutation funnels through the lifecycle
/// manager and the streaming apply path; everything else reads
/// immutable snapshots.
#[derive(Debug, Default)]
pub struct EngineState {
    pub phase: LifecyclePhase,
    pub session: Option<Session>,
    /// Id of the session that just finished, kept for display and
    /// analysis until the next session starts.
    pub completed_session_id: Option<i64>,
    pub reps: RepState,
    pub metric_history: Vec<MetricSample>,
    pub analysis: AnalysisState,
    /// Bumped per analysis trigger so stale completions can be
    /// discarded when a newer session supersedes them.
    pub analysis_epoch: u64,
}

impl EngineState {
    /// Enter `Active` for a freshly started session. Rep state and
    /// metric history belong to the previous session and are cleared
    /// here, not at stop time.
    pub fn begin_session(&mut self, id: i64, exercise: Exercise, started_at: DateTime<Utc>) {
        self.phase = LifecyclePhase::Active;
        self.session = Some(Session {
            id,
            exercise,
            started_at,
        });
        self.completed_session_id = None;
        self.reps = RepState::default();
        self.metric_history.clear();
    }

    /// Clear the active session after an acknowledged stop and hand the
    /// id over for analysis. Rep state and history stay visible.
    pub fn finish_session(&mut self) -> Option<i64> {
        let id = self.session.take().map(|s| s.id);
        self.completed_session_id = id;
        self.phase = LifecyclePhase::AnalysisPending;
        id
    }

    pub fn active_session_id(&self) -> Option<i64> {
        self.session.as_ref().map(|s| s.id)
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            phase: self.phase,
            session: self.session.clone(),
            completed_session_id: self.completed_session_id,
            reps: self.reps.clone(),
            metric_history: self.metric_history.clone(),
            analysis: self.analysis.clone(),
        }
    }
}

/// Immutable view handed to observers on every transition.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineSnapshot {
    pub phase: LifecyclePhase,
    pub session: Option<Session>,
    pub completed_session_id: Option<i64>,
    pub reps: RepState,
    pub metric_history: Vec<MetricSample>,
    pub analysis: AnalysisState,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn active_state() -> EngineState {
        let mut state = EngineState::default();
        state.begin_session(7, Exercise::Squat, Utc::now());
        state
    }

    #[test]
    fn begin_session_resets_previous_counters() {
        let mut state = active_state();
        state.reps.count = 12;
        state.metric_history.push(MetricSample {
            reps: 12,
            duration_sec: 30,
            timestamp: Utc::now(),
        });
        state.finish_session();

        state.begin_session(8, Exercise::Pushup, Utc::now());
        assert_eq!(state.reps.count, 0);
        assert!(state.metric_history.is_empty());
        assert_eq!(state.active_session_id(), Some(8));
        assert_eq!(state.completed_session_id, None);
    }

    #[test]
    fn finish_session_keeps_reps_for_display() {
        let mut state = active_state();
        state.reps.count = 5;

        let completed = state.finish_session();
        assert_eq!(completed, Some(7));
        assert_eq!(state.phase, LifecyclePhase::AnalysisPending);
        assert!(state.session.is_none());
        assert_eq!(state.completed_session_id, Some(7));
        // The just-completed count must survive until the next start.
        assert_eq!(state.reps.count, 5);
    }

    #[test]
    fn snapshot_reflects_state() {
        let state = active_state();
        let snapshot = state.snapshot();
        assert_eq!(snapshot.phase, LifecyclePhase::Active);
        assert_eq!(snapshot.session.unwrap().id, 7);
        assert_eq!(snapshot.analysis, AnalysisState::Idle);
    }
}

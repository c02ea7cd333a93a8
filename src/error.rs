use thiserror::Error;

use crate::session::LifecyclePhase;

/// Failure talking to the backend collaborator.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// Network failure or non-2xx status. `message` carries the
    /// server-provided reason when the body had one.
    #[error("{message}")]
    Transport { message: String },
    /// 2xx response whose body did not have the expected shape. Never
    /// retried.
    #[error("{message}")]
    Malformed { message: String },
}

impl ApiError {
    pub fn message(&self) -> &str {
        match self {
            ApiError::Transport { message } | ApiError::Malformed { message } => message,
        }
    }
}

/// Errors surfaced by the lifecycle manager.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Operation attempted in the wrong lifecycle state. A UI bug, not
    /// something to retry.
    #[error("cannot {op} while {phase}")]
    InvalidState {
        op: &'static str,
        phase: LifecyclePhase,
    },
    #[error("failed to start session: {0}")]
    StartFailed(#[source] ApiError),
    /// The session stays active; the caller may retry stop.
    #[error("failed to stop session: {0}")]
    StopFailed(#[source] ApiError),
    #[error("capture device unavailable: {0}")]
    CaptureUnavailable(String),
}

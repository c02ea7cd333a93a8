mod analysis;
mod api;
mod capture;
mod config;
mod error;
mod events;
mod metrics;
mod models;
mod reps;
mod session;
mod streaming;
mod utils;

pub use api::types::{
    PostureAnalysis, PostureSuggestion, Priority, SessionSummary, TipsResponse,
};
pub use api::ApiClient;
pub use capture::{EncodedFrame, EncoderSettings, FrameSource, RawFrame, SyntheticSource};
pub use config::EngineConfig;
pub use error::{ApiError, EngineError};
pub use events::EngineEvent;
pub use metrics::MetricSample;
pub use models::{Exercise, Session};
pub use session::{
    AnalysisState, EngineSnapshot, LifecyclePhase, RepState, WorkoutController,
};

mod controller;
mod loop_worker;

pub use controller::StreamingController;

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::api::ApiClient;
use crate::capture::EncoderSettings;
use crate::events::EventBus;
use crate::metrics::MetricsForwarder;
use crate::reps::RepPulse;
use crate::session::EngineState;

/// Everything a session's streaming tasks need, cloned into each
/// detached dispatch. `session_id` is the id current at capture time;
/// responses are fenced against it before they may touch rep state.
#[derive(Clone)]
pub struct StreamContext {
    pub session_id: i64,
    pub started_at: DateTime<Utc>,
    pub api: ApiClient,
    pub state: Arc<Mutex<EngineState>>,
    pub events: EventBus,
    pub metrics: MetricsForwarder,
    pub pulse: Arc<Mutex<RepPulse>>,
    pub frame_interval: Duration,
    pub refresh_interval: Duration,
    pub encoder: EncoderSettings,
}

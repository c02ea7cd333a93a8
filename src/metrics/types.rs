use chrono::{DateTime, Utc};
use serde::Serialize;

/// One backend-acknowledged metrics forward. History entries are
/// append-only and scoped to a single session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSample {
    pub reps: u32,
    pub duration_sec: u64,
    pub timestamp: DateTime<Utc>,
}

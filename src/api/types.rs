//! Wire types for the pose-analysis backend. Field names follow the
//! backend's snake_case JSON exactly; engine-facing types live in the
//! owning modules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Exercise;

#[derive(Debug, Serialize)]
pub struct SessionStartRequest {
    pub exercise: Exercise,
}

#[derive(Debug, Deserialize)]
pub struct SessionStartResponse {
    pub session_id: i64,
}

#[derive(Debug, Serialize)]
pub struct SessionStopRequest {
    pub ts: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct FrameRequest {
    /// Base64 JPEG, no data-URL prefix.
    pub frame: String,
}

/// Per-frame detection feedback. Both fields are optional; absence of
/// either is a no-op for the consumer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FrameResult {
    pub current_rep_count: Option<u32>,
    pub rep_completed: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct FrameResponse {
    #[serde(default)]
    pub result: Option<FrameResult>,
}

#[derive(Debug, Serialize)]
pub struct MetricsIngest {
    pub reps: u32,
    pub avg_score: f64,
    pub duration_sec: u64,
    pub ts: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostureSuggestion {
    pub category: String,
    pub issue: String,
    pub suggestion: String,
    pub priority: Priority,
}

/// The AI-generated posture report for one completed session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostureAnalysis {
    #[serde(default)]
    pub overall_assessment: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub areas_for_improvement: Vec<String>,
    #[serde(default)]
    pub specific_suggestions: Vec<PostureSuggestion>,
    #[serde(default)]
    pub exercise_specific_tips: Vec<String>,
    #[serde(default)]
    pub next_session_focus: String,
}

#[derive(Debug, Deserialize)]
pub struct AnalysisEnvelope {
    #[serde(default)]
    pub analysis: Option<AnalysisPayload>,
}

#[derive(Debug, Deserialize)]
pub struct AnalysisPayload {
    #[serde(default)]
    pub suggestions: Option<PostureAnalysis>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionSummary {
    pub session_id: i64,
    pub total_reps: u32,
    pub avg_score: f64,
    pub duration_sec: u64,
    pub exercise: String,
    pub start_ts: DateTime<Utc>,
    pub end_ts: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct TipsRequest {
    pub exercise: Exercise,
    pub flags: Vec<String>,
    pub level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TipsResponse {
    pub tips: Vec<String>,
    pub source: String,
}

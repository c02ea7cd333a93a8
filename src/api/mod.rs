pub mod types;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::Response;
use serde_json::Value;

use crate::config::EngineConfig;
use crate::error::ApiError;
use crate::models::Exercise;

use types::{
    AnalysisEnvelope, FrameRequest, FrameResponse, FrameResult, MetricsIngest, PostureAnalysis,
    SessionStartRequest, SessionStartResponse, SessionStopRequest, SessionSummary, TipsRequest,
    TipsResponse,
};

/// Typed wrapper over the pose-analysis backend. Cheap to clone; every
/// call is a single request/response with the configured timeout.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .context("failed to build http client")?;

        Ok(Self {
            http,
            base_url: config.server_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn start_session(&self, exercise: Exercise) -> Result<i64, ApiError> {
        let response = self
            .http
            .post(self.url("/sessions/start"))
            .json(&SessionStartRequest { exercise })
            .send()
            .await
            .map_err(transport)?;
        let response = ok_or_status(response, "Failed to start session").await?;

        let parsed: SessionStartResponse = decode(response).await?;
        Ok(parsed.session_id)
    }

    pub async fn stop_session(&self, session_id: i64, ts: DateTime<Utc>) -> Result<(), ApiError> {
        let response = self
            .http
            .post(self.url(&format!("/sessions/{session_id}/stop")))
            .json(&SessionStopRequest { ts })
            .send()
            .await
            .map_err(transport)?;
        ok_or_status(response, "Failed to stop session").await?;
        Ok(())
    }

    /// Dispatch one encoded frame. `frame` is base64 JPEG with no
    /// data-URL prefix.
    pub async fn send_frame(&self, session_id: i64, frame: &str) -> Result<FrameResult, ApiError> {
        let response = self
            .http
            .post(self.url(&format!("/frames/{session_id}")))
            .json(&FrameRequest {
                frame: frame.to_string(),
            })
            .send()
            .await
            .map_err(transport)?;
        let response = ok_or_status(response, "Frame rejected").await?;

        let parsed: FrameResponse = decode(response).await?;
        Ok(parsed.result.unwrap_or_default())
    }

    pub async fn send_metrics(
        &self,
        session_id: i64,
        sample: &MetricsIngest,
    ) -> Result<(), ApiError> {
        let response = self
            .http
            .post(self.url(&format!("/sessions/{session_id}/metrics")))
            .json(sample)
            .send()
            .await
            .map_err(transport)?;
        ok_or_status(response, "Failed to forward metrics").await?;
        Ok(())
    }

    /// Combined analyze-and-cleanup for a completed session. A 2xx body
    /// without the suggestions shape is malformed, distinct from a
    /// transport failure.
    pub async fn analyze_and_cleanup(&self, session_id: i64) -> Result<PostureAnalysis, ApiError> {
        let response = self
            .http
            .post(self.url(&format!("/analysis/analyze-and-cleanup/{session_id}")))
            .send()
            .await
            .map_err(transport)?;
        let response = ok_or_status(response, "Failed to analyze session").await?;

        let parsed: AnalysisEnvelope = decode(response).await?;
        parsed
            .analysis
            .and_then(|analysis| analysis.suggestions)
            .ok_or_else(|| ApiError::Malformed {
                message: "Analysis completed but no suggestions were generated".to_string(),
            })
    }

    pub async fn session_summary(&self, session_id: i64) -> Result<SessionSummary, ApiError> {
        let response = self
            .http
            .get(self.url(&format!("/sessions/{session_id}/summary")))
            .send()
            .await
            .map_err(transport)?;
        let response = ok_or_status(response, "Failed to fetch session summary").await?;
        decode(response).await
    }

    pub async fn fetch_tips(&self, request: &TipsRequest) -> Result<TipsResponse, ApiError> {
        let response = self
            .http
            .post(self.url("/tips"))
            .json(request)
            .send()
            .await
            .map_err(transport)?;
        let response = ok_or_status(response, "Failed to fetch tips").await?;
        decode(response).await
    }

    pub async fn health(&self) -> Result<(), ApiError> {
        let response = self
            .http
            .get(self.url("/health"))
            .send()
            .await
            .map_err(transport)?;
        ok_or_status(response, "Backend unhealthy").await?;
        Ok(())
    }
}

fn transport(err: reqwest::Error) -> ApiError {
    let message = if err.is_connect() {
        format!("cannot reach backend: {err}")
    } else if err.is_timeout() {
        "request timed out".to_string()
    } else {
        err.to_string()
    };
    ApiError::Transport { message }
}

/// Map non-2xx to a transport error carrying the body's `message` or
/// `detail` field when one is present, else the per-call fallback.
async fn ok_or_status(response: Response, fallback: &str) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .json::<Value>()
        .await
        .ok()
        .and_then(|body| extract_message(&body))
        .unwrap_or_else(|| format!("{fallback} (status {})", status.as_u16()));
    Err(ApiError::Transport { message })
}

fn extract_message(body: &Value) -> Option<String> {
    body.get("message")
        .and_then(Value::as_str)
        .or_else(|| body.get("detail").and_then(Value::as_str))
        .map(str::to_string)
}

async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    response.json::<T>().await.map_err(|err| ApiError::Malformed {
        message: format!("unexpected response shape: {err}"),
    })
}

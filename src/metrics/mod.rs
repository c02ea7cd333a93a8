mod types;

pub use types::MetricSample;

use chrono::{DateTime, Utc};
use log::warn;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::api::types::MetricsIngest;
use crate::api::ApiClient;
use crate::events::{EngineEvent, EventBus};
use crate::session::EngineState;

/// Best-effort telemetry forwarder. Fired on every rep-count change;
/// failed forwards are logged and dropped, never retried, and never
/// enter local history. History holds only backend-acknowledged
/// samples.
#[derive(Clone)]
pub struct MetricsForwarder {
    api: ApiClient,
    state: Arc<Mutex<EngineState>>,
    events: EventBus,
}

impl MetricsForwarder {
    pub fn new(api: ApiClient, state: Arc<Mutex<EngineState>>, events: EventBus) -> Self {
        Self { api, state, events }
    }

    /// Forward one sample for the given session, detached from the
    /// caller so a slow backend never delays the streaming loop.
    pub fn record(&self, session_id: i64, reps: u32, started_at: DateTime<Utc>) {
        let forwarder = self.clone();
        tokio::spawn(async move {
            forwarder.forward(session_id, reps, started_at).await;
        });
    }

    async fn forward(&self, session_id: i64, reps: u32, started_at: DateTime<Utc>) {
        let now = Utc::now();
        let duration_sec = (now - started_at).num_seconds().max(0) as u64;
        let ingest = MetricsIngest {
            reps,
            // No form scoring yet; the backend accepts 0.0.
            avg_score: 0.0,
            duration_sec,
            ts: now,
        };

        match self.api.send_metrics(session_id, &ingest).await {
            Ok(()) => {
                let sample = MetricSample {
                    reps,
                    duration_sec,
                    timestamp: now,
                };
                let mut guard = self.state.lock().await;
                // Acks landing after the session ended belong to nobody.
                if guard.active_session_id() != Some(session_id) {
                    return;
                }
                guard.metric_history.push(sample.clone());
                drop(guard);
                self.events.emit(EngineEvent::MetricRecorded { sample });
            }
            Err(err) => {
                warn!("metrics forward failed for session {session_id}: {err}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::models::Exercise;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn forwarder_for(server: &MockServer) -> (MetricsForwarder, Arc<Mutex<EngineState>>) {
        let config = EngineConfig {
            server_url: server.uri(),
            ..EngineConfig::default()
        };
        let api = ApiClient::new(&config).unwrap();
        let state = Arc::new(Mutex::new(EngineState::default()));
        let forwarder = MetricsForwarder::new(api, state.clone(), EventBus::new());
        (forwarder, state)
    }

    #[tokio::test]
    async fn acknowledged_sample_enters_history() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sessions/7/metrics"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .mount(&server)
            .await;

        let (forwarder, state) = forwarder_for(&server).await;
        let started_at = Utc::now();
        state.lock().await.begin_session(7, Exercise::Squat, started_at);

        forwarder.forward(7, 3, started_at).await;

        let guard = state.lock().await;
        assert_eq!(guard.metric_history.len(), 1);
        assert_eq!(guard.metric_history[0].reps, 3);
    }

    #[tokio::test]
    async fn failed_forward_is_dropped() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sessions/7/metrics"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let (forwarder, state) = forwarder_for(&server).await;
        let started_at = Utc::now();
        state.lock().await.begin_session(7, Exercise::Squat, started_at);

        forwarder.forward(7, 3, started_at).await;

        assert!(state.lock().await.metric_history.is_empty());
    }

    #[tokio::test]
    async fn ack_for_ended_session_is_discarded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sessions/7/metrics"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"ok": true}))
                    .set_delay(Duration::from_millis(50)),
            )
            .mount(&server)
            .await;

        let (forwarder, state) = forwarder_for(&server).await;
        let started_at = Utc::now();
        state.lock().await.begin_session(7, Exercise::Squat, started_at);

        forwarder.record(7, 3, started_at);
        // Session ends while the forward is still in flight.
        state.lock().await.finish_session();
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert!(state.lock().await.metric_history.is_empty());
    }
}

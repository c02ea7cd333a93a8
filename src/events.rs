use serde::Serialize;
use tokio::sync::broadcast;

use crate::metrics::MetricSample;
use crate::session::{AnalysisState, EngineSnapshot};

/// Push notifications emitted on every engine transition. Variant names
/// double as the wire event names for embedding UIs.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum EngineEvent {
    StateChanged { snapshot: EngineSnapshot },
    RepCountChanged { count: u32 },
    RepDetected { count: u32 },
    MetricRecorded { sample: MetricSample },
    SessionCompleted { session_id: i64 },
    AnalysisStateChanged { state: AnalysisState },
}

const EVENT_CHANNEL_CAPACITY: usize = 128;

/// Broadcast fan-out to engine observers. Slow subscribers lag rather
/// than block the engine.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.tx.subscribe()
    }

    /// Send without caring whether anyone is listening.
    pub fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn emit_without_subscribers_is_fine() {
        let bus = EventBus::new();
        bus.emit(EngineEvent::RepCountChanged { count: 1 });
    }

    #[tokio::test]
    async fn subscribers_receive_events() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        bus.emit(EngineEvent::SessionCompleted { session_id: 3 });
        match rx.recv().await.unwrap() {
            EngineEvent::SessionCompleted { session_id } => assert_eq!(session_id, 3),
            other => panic!("unexpected event: {other:?}"),
        }
    }
}

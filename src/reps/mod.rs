//! Rep feedback consumer: applies streaming responses to the engine's
//! rep state. The backend is the source of truth; the client never
//! increments locally, and each applied response wins over whatever was
//! there before (responses may arrive out of dispatch order).

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::{sync::Mutex, task::JoinHandle};

use crate::api::types::FrameResult;
use crate::events::{EngineEvent, EventBus};
use crate::session::{EngineState, RepState};

/// What one applied response changed.
#[derive(Debug, Default, PartialEq)]
pub struct RepUpdate {
    /// New count if the applied response changed it.
    pub count_changed: Option<u32>,
    pub rep_detected: bool,
}

/// Apply one streaming response. Absent fields are a no-op; a present
/// count replaces the current one unconditionally.
pub fn apply(reps: &mut RepState, result: &FrameResult, now: DateTime<Utc>) -> RepUpdate {
    let mut update = RepUpdate::default();

    if let Some(count) = result.current_rep_count {
        if count != reps.count {
            reps.count = count;
            update.count_changed = Some(count);
        }
        reps.last_updated = Some(now);
    }

    if result.rep_completed == Some(true) {
        reps.just_detected = true;
        reps.last_updated = Some(now);
        update.rep_detected = true;
    }

    update
}

/// Reverts `just_detected` after the display window. Each new detection
/// restarts the window by aborting the previous reversion task.
pub struct RepPulse {
    window: Duration,
    handle: Option<JoinHandle<()>>,
}

impl RepPulse {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            handle: None,
        }
    }

    pub fn trigger(&mut self, state: Arc<Mutex<EngineState>>, events: EventBus) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }

        let window = self.window;
        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(window).await;
            let mut guard = state.lock().await;
            if guard.reps.just_detected {
                guard.reps.just_detected = false;
                let snapshot = guard.snapshot();
                drop(guard);
                events.emit(EngineEvent::StateChanged { snapshot });
            }
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for RepPulse {
    fn drop(&mut self) {
        self.cancel();
    }
}

use log::error;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::capture::FrameSource;

use super::loop_worker::{refresh_loop, streaming_loop, FrameSlot};
use super::StreamContext;

/// Owns the two periodic streaming tasks for one session: the
/// capture-refresh tick and the network tick. Both hang off a single
/// cancellation token so stop() and teardown share one point of
/// cancellation.
pub struct StreamingController {
    refresh_handle: Option<JoinHandle<()>>,
    network_handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl StreamingController {
    pub fn new() -> Self {
        Self {
            refresh_handle: None,
            network_handle: None,
            cancel_token: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.cancel_token.is_some()
    }

    /// Spawn both loops for an already-opened source. Any leftover
    /// tasks from a previous session are cancelled first.
    pub async fn start_streaming(&mut self, ctx: StreamContext, source: Box<dyn FrameSource>) {
        self.stop_streaming().await;

        let cancel_token = CancellationToken::new();
        let slot: FrameSlot = Arc::new(Mutex::new(None));

        self.refresh_handle = Some(tokio::spawn(refresh_loop(
            source,
            slot.clone(),
            ctx.clone(),
            cancel_token.child_token(),
        )));
        self.network_handle = Some(tokio::spawn(streaming_loop(
            ctx,
            slot,
            cancel_token.child_token(),
        )));
        self.cancel_token = Some(cancel_token);
    }

    /// Cancel both loops and wait for them to wind down, which releases
    /// the capture device before this returns.
    pub async fn stop_streaming(&mut self) {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        for handle in [self.refresh_handle.take(), self.network_handle.take()]
            .into_iter()
            .flatten()
        {
            if let Err(err) = handle.await {
                if !err.is_cancelled() {
                    error!("streaming task failed to join: {err}");
                }
            }
        }
    }
}

impl Default for StreamingController {
    fn default() -> Self {
        Self::new()
    }
}

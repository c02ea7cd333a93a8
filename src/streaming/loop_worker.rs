use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::api::types::FrameResult;
use crate::capture::{encode_frame, FrameSource, RawFrame};
use crate::events::EngineEvent;
use crate::reps;

use super::StreamContext;

// Set to false to silence the per-tick logging in this module.
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

pub(crate) type FrameSlot = Arc<Mutex<Option<RawFrame>>>;

/// Polls the frame source into the shared latest-frame slot on its own
/// cadence, so the freshest frame is always available to the network
/// tick even when dispatches are slow. Owns the device handle; releases
/// it on cancellation.
pub(crate) async fn refresh_loop(
    mut source: Box<dyn FrameSource>,
    slot: FrameSlot,
    ctx: StreamContext,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(ctx.refresh_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match source.poll_frame() {
                    Ok(Some(frame)) => {
                        *slot.lock().await = Some(frame);
                    }
                    Ok(None) => {}
                    Err(err) => {
                        log_warn!("frame poll failed for session {}: {err:#}", ctx.session_id);
                    }
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("capture refresh loop shutting down");
                break;
            }
        }
    }

    source.close();
}

/// Network tick: one encode+dispatch per tick, fired regardless of
/// whether the previous dispatch has returned. A failed frame is logged
/// and swallowed; the stream self-heals on the next tick.
pub(crate) async fn streaming_loop(
    ctx: StreamContext,
    slot: FrameSlot,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(ctx.frame_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let frame = slot.lock().await.clone();
                let Some(frame) = frame else { continue };
                if frame.is_empty() {
                    // Capture not ready yet; nothing to dispatch.
                    continue;
                }

                tokio::spawn(dispatch_frame(ctx.clone(), frame));
            }
            _ = cancel_token.cancelled() => {
                log_info!("streaming loop shutting down for session {}", ctx.session_id);
                break;
            }
        }
    }
}

async fn dispatch_frame(ctx: StreamContext, frame: RawFrame) {
    let settings = ctx.encoder;
    let encoded = match tokio::task::spawn_blocking(move || encode_frame(&frame, &settings)).await {
        Ok(Ok(encoded)) => encoded,
        Ok(Err(err)) => {
            log_warn!("frame encode failed for session {}: {err:#}", ctx.session_id);
            return;
        }
        Err(err) => {
            log_error!("encode worker join failed: {err}");
            return;
        }
    };

    match ctx.api.send_frame(ctx.session_id, &encoded.base64).await {
        Ok(result) => apply_frame_result(&ctx, result).await,
        Err(err) => {
            // Absorbed: a single failed frame must never stop the loop.
            log_warn!("frame dispatch failed for session {}: {err}", ctx.session_id);
        }
    }
}

/// Route one streaming response into rep state. Responses tagged with a
/// session id that is no longer active are discarded: a dispatch from
/// just before stop() must not mutate state after the session ended.
pub(crate) async fn apply_frame_result(ctx: &StreamContext, result: FrameResult) {
    let now = Utc::now();

    let (update, count) = {
        let mut guard = ctx.state.lock().await;
        if guard.active_session_id() != Some(ctx.session_id) {
            log_info!(
                "discarding streaming response for ended session {}",
                ctx.session_id
            );
            return;
        }
        let update = reps::apply(&mut guard.reps, &result, now);
        (update, guard.reps.count)
    };

    if update.rep_detected {
        ctx.events.emit(EngineEvent::RepDetected { count });
        ctx.pulse
            .lock()
            .await
            .trigger(ctx.state.clone(), ctx.events.clone());
    }

    if let Some(count) = update.count_changed {
        ctx.events.emit(EngineEvent::RepCountChanged { count });
        ctx.metrics.record(ctx.session_id, count, ctx.started_at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::metrics::MetricsForwarder;
    use crate::models::Exercise;
    use crate::reps::RepPulse;
    use crate::session::EngineState;
    use crate::{api::ApiClient, events::EventBus};
    use std::time::Duration;

    fn context(state: Arc<Mutex<EngineState>>, session_id: i64) -> StreamContext {
        let config = EngineConfig::default();
        let api = ApiClient::new(&config).unwrap();
        let events = EventBus::new();
        StreamContext {
            session_id,
            started_at: Utc::now(),
            api: api.clone(),
            state: state.clone(),
            events: events.clone(),
            metrics: MetricsForwarder::new(api, state, events),
            pulse: Arc::new(Mutex::new(RepPulse::new(Duration::from_secs(2)))),
            frame_interval: config.frame_interval(),
            refresh_interval: config.refresh_interval(),
            encoder: crate::capture::EncoderSettings {
                max_width: config.frame_max_width,
                max_height: config.frame_max_height,
                jpeg_quality: config.jpeg_quality,
            },
        }
    }

    #[tokio::test]
    async fn response_for_ended_session_is_fenced_off() {
        let state = Arc::new(Mutex::new(EngineState::default()));
        state
            .lock()
            .await
            .begin_session(7, Exercise::Squat, Utc::now());

        // Response tagged with a session that is no longer the active one.
        let ctx = context(state.clone(), 6);
        apply_frame_result(
            &ctx,
            FrameResult {
                current_rep_count: Some(9),
                rep_completed: Some(true),
            },
        )
        .await;

        let guard = state.lock().await;
        assert_eq!(guard.reps.count, 0);
        assert!(!guard.reps.just_detected);
    }

    #[tokio::test]
    async fn response_for_active_session_applies() {
        let state = Arc::new(Mutex::new(EngineState::default()));
        state
            .lock()
            .await
            .begin_session(7, Exercise::Squat, Utc::now());

        let ctx = context(state.clone(), 7);
        apply_frame_result(
            &ctx,
            FrameResult {
                current_rep_count: Some(2),
                rep_completed: None,
            },
        )
        .await;

        assert_eq!(state.lock().await.reps.count, 2);
    }
}

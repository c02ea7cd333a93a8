mod encoder;
mod synthetic;

pub use encoder::{encode_frame, EncodedFrame, EncoderSettings};
pub use synthetic::SyntheticSource;

use anyhow::Result;

/// One raw RGB8 frame, row-major. Ephemeral: owned by the streaming
/// loop for exactly one capture/dispatch round-trip.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl RawFrame {
    /// Zero-area frames mean the device is not ready yet; they are
    /// skipped, never dispatched.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Seam over a live video device. The streaming controller owns the
/// source exclusively for the session's duration: `open` on session
/// start, `poll_frame` from the refresh tick, `close` at cancellation.
///
/// `poll_frame` returning `Ok(None)` means no new frame is available
/// yet (device warming up); that is not an error.
pub trait FrameSource: Send {
    fn open(&mut self) -> Result<()>;
    fn poll_frame(&mut self) -> Result<Option<RawFrame>>;
    fn close(&mut self);
}

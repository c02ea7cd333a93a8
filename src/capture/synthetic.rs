use anyhow::{bail, Result};
use rand::Rng;

use super::{FrameSource, RawFrame};

/// Frame source that renders a moving test pattern instead of reading a
/// camera. Used by the demo binary and tests; a real device backend
/// plugs in behind the same trait.
pub struct SyntheticSource {
    width: u32,
    height: u32,
    /// Polls that return no frame before the first one, imitating a
    /// device that needs a moment to deliver its first frame.
    warmup_polls: u32,
    polls: u64,
    opened: bool,
}

impl SyntheticSource {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            warmup_polls: 2,
            polls: 0,
            opened: false,
        }
    }

    pub fn with_warmup(mut self, polls: u32) -> Self {
        self.warmup_polls = polls;
        self
    }
}

impl FrameSource for SyntheticSource {
    fn open(&mut self) -> Result<()> {
        self.opened = true;
        self.polls = 0;
        Ok(())
    }

    fn poll_frame(&mut self) -> Result<Option<RawFrame>> {
        if !self.opened {
            bail!("synthetic source polled before open");
        }

        self.polls += 1;
        if self.polls <= u64::from(self.warmup_polls) {
            return Ok(None);
        }

        let phase = (self.polls * 3 % 256) as u32;
        let mut pixels = Vec::with_capacity((self.width * self.height * 3) as usize);
        for y in 0..self.height {
            for x in 0..self.width {
                let base = ((x + y + phase) % 256) as u8;
                pixels.push(base);
                pixels.push(base / 2);
                pixels.push(255 - base);
            }
        }

        // Sprinkle noise so consecutive frames never encode identically.
        let mut rng = rand::thread_rng();
        for _ in 0..64 {
            let idx = rng.gen_range(0..pixels.len());
            pixels[idx] = rng.gen();
        }

        Ok(Some(RawFrame {
            width: self.width,
            height: self.height,
            pixels,
        }))
    }

    fn close(&mut self) {
        self.opened = false;
    }
}

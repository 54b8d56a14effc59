use crate::config::render::RenderConfig;
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{TradeanimError, TradeanimResult};
use crate::render::backend::FrameRGBA;

/// Encoder quality knobs passed through to the encoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeQuality {
    /// Video codec, e.g. `libx264`.
    pub codec: String,
    /// Output pixel format, e.g. `yuv420p`.
    pub pixel_format: String,
    /// Constant rate factor.
    pub crf: u8,
    /// Speed/quality preset, e.g. `medium`.
    pub preset: String,
}

impl Default for EncodeQuality {
    fn default() -> Self {
        RenderConfig::default().quality()
    }
}

/// Configuration provided to a [`FrameSink`] when it is opened.
#[derive(Debug, Clone, PartialEq)]
pub struct SinkConfig {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Output frames-per-second.
    pub fps: Fps,
    /// Encoder quality parameters.
    pub quality: EncodeQuality,
}

impl SinkConfig {
    /// Sink settings matching a render config.
    pub fn from_render_config(config: &RenderConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            fps: config.fps,
            quality: config.quality(),
        }
    }

    /// Byte length of one RGBA8 frame.
    pub fn frame_len(&self) -> usize {
        FrameRGBA::expected_len(self.width, self.height)
    }

    pub(crate) fn check_frame(&self, frame: &FrameRGBA) -> TradeanimResult<()> {
        if frame.width != self.width || frame.height != self.height {
            return Err(TradeanimError::encode(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, self.width, self.height
            )));
        }
        if frame.data.len() != self.frame_len() {
            return Err(TradeanimError::encode(
                "frame.data size mismatch with width*height*4",
            ));
        }
        Ok(())
    }
}

/// Sink contract for consuming rendered frames in presentation order.
///
/// `submit` is called with indices `0, 1, 2, ...` with no gaps and no repeats. A sink may block
/// inside `submit` for as long as its consumer needs; that is the pipeline's backpressure.
/// Exactly one of `close` or `abort` ends a session.
pub trait FrameSink: Send {
    /// Called once before any frame is submitted.
    fn open(&mut self, cfg: SinkConfig) -> TradeanimResult<()>;
    /// Submit the next frame.
    fn submit(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> TradeanimResult<()>;
    /// Flush and finalize the output after the last frame.
    fn close(&mut self) -> TradeanimResult<()>;
    /// Tear the session down after a failure, discarding partial output. Never fails.
    fn abort(&mut self);
}

/// Guard for the strictly contiguous frame order of [`FrameSink::submit`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameOrder {
    next: u64,
}

impl FrameOrder {
    /// Expect frame 0 next.
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `idx` if it is the expected next index.
    pub fn check(&mut self, idx: FrameIndex) -> TradeanimResult<()> {
        if idx.0 != self.next {
            return Err(TradeanimError::encode(format!(
                "frame order violation: got frame {}, expected frame {}",
                idx.0, self.next
            )));
        }
        self.next += 1;
        Ok(())
    }

    /// Number of frames accepted so far.
    pub fn accepted(&self) -> u64 {
        self.next
    }
}

/// In-memory sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    order: FrameOrder,
    frames: Vec<(FrameIndex, FrameRGBA)>,
    closed: bool,
    aborted: bool,
}

impl InMemorySink {
    /// Create a new in-memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink configuration captured in `open`, if any.
    pub fn config(&self) -> Option<&SinkConfig> {
        self.cfg.as_ref()
    }

    /// Captured frames in submission order.
    pub fn frames(&self) -> &[(FrameIndex, FrameRGBA)] {
        &self.frames
    }

    /// `true` after a successful `close`.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// `true` after `abort`.
    pub fn is_aborted(&self) -> bool {
        self.aborted
    }
}

impl FrameSink for InMemorySink {
    fn open(&mut self, cfg: SinkConfig) -> TradeanimResult<()> {
        self.cfg = Some(cfg);
        self.order = FrameOrder::new();
        self.frames.clear();
        self.closed = false;
        self.aborted = false;
        Ok(())
    }

    fn submit(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> TradeanimResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| TradeanimError::encode("in-memory sink not opened"))?;
        cfg.check_frame(frame)?;
        self.order.check(idx)?;
        self.frames.push((idx, frame.clone()));
        Ok(())
    }

    fn close(&mut self) -> TradeanimResult<()> {
        if self.cfg.is_none() {
            return Err(TradeanimError::encode("in-memory sink not opened"));
        }
        self.closed = true;
        Ok(())
    }

    fn abort(&mut self) {
        self.frames.clear();
        self.aborted = true;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/sink.rs"]
mod tests;

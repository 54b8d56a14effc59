use crate::config::render::RenderConfig;
use crate::eval::state::FrameState;
use crate::foundation::error::TradeanimResult;
use crate::render::text::FontBook;

/// A rendered frame as RGBA8 pixels.
///
/// Frames produced by [`crate::CpuBackend`] are **premultiplied alpha**. The `premultiplied` flag
/// makes this explicit at the sink boundary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
    /// Whether the `data` is premultiplied alpha.
    pub premultiplied: bool,
}

impl FrameRGBA {
    /// Expected byte length for `width * height` RGBA8 pixels.
    pub fn expected_len(width: u32, height: u32) -> usize {
        (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(4)
    }

    /// RGBA at `(x, y)`, or `None` outside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        let px = self.data.get(i..i + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}

/// A rasterizer turning an evaluated [`FrameState`] into a [`FrameRGBA`].
///
/// Implementations must be deterministic: the same state and sample time produce
/// byte-identical output.
pub trait RenderBackend {
    /// Rasterize `state` sampled at `sample_time` seconds.
    fn render(&mut self, state: &FrameState, sample_time: f64) -> TradeanimResult<FrameRGBA>;
}

/// Available backend kinds.
///
/// - `Cpu` is always available.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BackendKind {
    /// CPU raster backend powered by `vello_cpu`.
    #[default]
    Cpu,
}

/// Create a rendering backend implementation.
pub fn create_backend(
    kind: BackendKind,
    config: &RenderConfig,
    fonts: &FontBook,
) -> TradeanimResult<Box<dyn RenderBackend + Send>> {
    match kind {
        BackendKind::Cpu => Ok(Box::new(crate::render::cpu::CpuBackend::new(
            config.clone(),
            fonts.clone(),
        )?)),
    }
}

use crate::config::post::PostProcessConfig;
use crate::config::theme::{Theme, deserialize_theme};
use crate::encode::sink::EncodeQuality;
use crate::foundation::color::Color;
use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::{TradeanimError, TradeanimResult};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// x264/x265 speed presets accepted by [`RenderConfig::preset`].
pub const ENCODER_PRESETS: &[&str] = &[
    "ultrafast",
    "superfast",
    "veryfast",
    "faster",
    "fast",
    "medium",
    "slow",
    "slower",
    "veryslow",
    "placebo",
];

/// Render and encode settings for a scene.
///
/// Every field has a default, so a JSON config only needs to name what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Output frame rate.
    pub fps: Fps,
    /// ffmpeg video codec.
    pub codec: String,
    /// ffmpeg output pixel format.
    pub pixel_format: String,
    /// Constant rate factor (0 = lossless, 51 = worst).
    pub crf: u8,
    /// Encoder speed/quality preset.
    pub preset: String,
    /// Color palette, either a preset name or an object.
    #[serde(deserialize_with = "deserialize_theme")]
    pub theme: Theme,
    /// Font family used for all text.
    pub font_family: String,
    /// Candle body width in index units.
    pub candle_width: f64,
    /// Wick stroke width in pixels.
    pub wick_width: f64,
    /// Fraction of the price range added above the highest high when fitting the camera.
    pub padding_top: f64,
    /// Fraction of the price range added below the lowest low when fitting the camera.
    pub padding_bottom: f64,
    /// Empty index slots kept to the right of the last candle when fitting the camera.
    pub padding_right: f64,
    /// Width of the right price-axis gutter as a fraction of the canvas width.
    pub price_axis_width: f64,
    /// Height of the bottom gutter as a fraction of the canvas height.
    pub time_axis_height: f64,
    /// Draw grid lines.
    pub show_grid: bool,
    /// Grid line opacity.
    pub grid_alpha: f64,
    /// Grid line width in pixels.
    pub grid_width: f64,
    /// Draw price labels in the right gutter.
    pub show_price_labels: bool,
    /// Optional watermark text drawn centered above everything else.
    pub watermark: Option<String>,
    /// Watermark opacity.
    pub watermark_alpha: f64,
    /// Global playback speed; every duration is divided by it.
    pub speed_multiplier: f64,
    /// Optional vertical background gradient `(top, bottom)` replacing the solid background.
    pub background_gradient: Option<(Color, Color)>,
    /// Draw a soft offset shadow under candle bodies.
    pub candle_shadow: bool,
    /// Force a bull body color regardless of theme.
    pub candle_bull_override: Option<Color>,
    /// Force a bear body color regardless of theme.
    pub candle_bear_override: Option<Color>,
    /// Draw a volume panel under the price panel.
    pub show_volume: bool,
    /// Share of the chart height given to the volume panel.
    pub volume_height_ratio: f64,
    /// Rasterize at this multiple of the output size, then shrink.
    pub supersample: u32,
    /// Full-frame effects applied after shrinking.
    pub post: PostProcessConfig,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            fps: Fps { num: 60, den: 1 },
            codec: "libx264".to_owned(),
            pixel_format: "yuv420p".to_owned(),
            crf: 18,
            preset: "medium".to_owned(),
            theme: Theme::dark(),
            font_family: "monospace".to_owned(),
            candle_width: 0.6,
            wick_width: 1.2,
            padding_top: 0.05,
            padding_bottom: 0.05,
            padding_right: 3.0,
            price_axis_width: 0.08,
            time_axis_height: 0.06,
            show_grid: true,
            grid_alpha: 0.3,
            grid_width: 0.5,
            show_price_labels: true,
            watermark: None,
            watermark_alpha: 0.1,
            speed_multiplier: 1.0,
            background_gradient: None,
            candle_shadow: false,
            candle_bull_override: None,
            candle_bear_override: None,
            show_volume: false,
            volume_height_ratio: 0.15,
            supersample: 1,
            post: PostProcessConfig::default(),
        }
    }
}

impl RenderConfig {
    /// Parse a config from a JSON reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> TradeanimResult<Self> {
        serde_json::from_reader(r)
            .map_err(|e| TradeanimError::serde(format!("parse render config JSON: {e}")))
    }

    /// Parse a config from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> TradeanimResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            TradeanimError::config(format!("open render config '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// Output canvas.
    pub fn canvas(&self) -> Canvas {
        Canvas {
            width: self.width,
            height: self.height,
        }
    }

    /// Size of the raster the backend draws before shrinking to the output size.
    pub fn raster_size(&self) -> (u32, u32) {
        let ss = self.supersample.max(1);
        (self.width.saturating_mul(ss), self.height.saturating_mul(ss))
    }

    /// Encoder quality parameters.
    pub fn quality(&self) -> EncodeQuality {
        EncodeQuality {
            codec: self.codec.clone(),
            pixel_format: self.pixel_format.clone(),
            crf: self.crf,
            preset: self.preset.clone(),
        }
    }

    /// Check every field; called before any frame is produced.
    pub fn validate(&self) -> TradeanimResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(TradeanimError::config("width/height must be non-zero"));
        }
        if self.width > u32::from(u16::MAX) || self.height > u32::from(u16::MAX) {
            return Err(TradeanimError::config(format!(
                "width/height must be <= {}",
                u16::MAX
            )));
        }
        if self.pixel_format.starts_with("yuv420")
            && (!self.width.is_multiple_of(2) || !self.height.is_multiple_of(2))
        {
            return Err(TradeanimError::config(format!(
                "width/height must be even for pixel format '{}' (got {}x{})",
                self.pixel_format, self.width, self.height
            )));
        }
        Fps::new(self.fps.num, self.fps.den)?;
        if self.crf > 51 {
            return Err(TradeanimError::config(format!(
                "crf must be in 0..=51 (got {})",
                self.crf
            )));
        }
        if !ENCODER_PRESETS.contains(&self.preset.as_str()) {
            return Err(TradeanimError::config(format!(
                "unknown encoder preset '{}' (expected one of {})",
                self.preset,
                ENCODER_PRESETS.join(", ")
            )));
        }
        if self.codec.trim().is_empty() || self.pixel_format.trim().is_empty() {
            return Err(TradeanimError::config(
                "codec and pixel_format must be non-empty",
            ));
        }
        if !self.speed_multiplier.is_finite() || self.speed_multiplier <= 0.0 {
            return Err(TradeanimError::config("speed_multiplier must be > 0"));
        }
        if !(1..=4).contains(&self.supersample) {
            return Err(TradeanimError::config(format!(
                "supersample must be in 1..=4 (got {})",
                self.supersample
            )));
        }
        let (rw, rh) = self.raster_size();
        if rw > u32::from(u16::MAX) || rh > u32::from(u16::MAX) {
            return Err(TradeanimError::config(format!(
                "supersampled size {rw}x{rh} exceeds {}",
                u16::MAX
            )));
        }
        if !(self.volume_height_ratio > 0.0 && self.volume_height_ratio < 1.0) {
            return Err(TradeanimError::config("volume_height_ratio must be in (0, 1)"));
        }
        self.post.validate()?;
        if !(self.candle_width > 0.0 && self.candle_width <= 1.0) {
            return Err(TradeanimError::config("candle_width must be in (0, 1]"));
        }
        for (name, v) in [
            ("price_axis_width", self.price_axis_width),
            ("time_axis_height", self.time_axis_height),
        ] {
            if !(0.0..0.5).contains(&v) {
                return Err(TradeanimError::config(format!(
                    "{name} must be in [0, 0.5)"
                )));
            }
        }
        for (name, v) in [
            ("grid_alpha", self.grid_alpha),
            ("watermark_alpha", self.watermark_alpha),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return Err(TradeanimError::config(format!("{name} must be in [0, 1]")));
            }
        }
        for (name, v) in [
            ("padding_top", self.padding_top),
            ("padding_bottom", self.padding_bottom),
            ("padding_right", self.padding_right),
            ("wick_width", self.wick_width),
            ("grid_width", self.grid_width),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(TradeanimError::config(format!(
                    "{name} must be finite and >= 0"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/config/render.rs"]
mod tests;

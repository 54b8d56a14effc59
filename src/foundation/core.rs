use crate::foundation::error::{TradeanimError, TradeanimResult};

pub use kurbo::{Affine, BezPath, Point, Rect, Vec2};

/// Absolute 0-based output frame index.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

/// Half-open frame range `[start, end)`; the unit of work handed to a render pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameRange {
    /// First frame.
    pub start: FrameIndex,
    /// One past the last frame.
    pub end: FrameIndex,
}

impl FrameRange {
    /// Range over the first `total` frames.
    pub fn first(total: u64) -> Self {
        Self {
            start: FrameIndex(0),
            end: FrameIndex(total),
        }
    }

    /// Frames in the range.
    pub fn len_frames(self) -> u64 {
        self.end.0.saturating_sub(self.start.0)
    }

    /// Frame indices in order.
    pub fn indices(self) -> impl Iterator<Item = FrameIndex> {
        (self.start.0..self.end.0).map(FrameIndex)
    }

    /// Consecutive sub-ranges of at most `size` frames (a zero size counts as one).
    pub fn chunks(self, size: u64) -> impl Iterator<Item = FrameRange> {
        let size = size.max(1);
        let end = self.end.0;
        (self.start.0..end).step_by(size as usize).map(move |s| FrameRange {
            start: FrameIndex(s),
            end: FrameIndex(s.saturating_add(size).min(end)),
        })
    }
}

/// Frames-per-second represented as a rational `num/den`.
///
/// Deserializes from either a bare integer (`60`) or `{ "num": 30000, "den": 1001 }`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub struct Fps {
    /// Numerator (frames).
    pub num: u32,
    /// Denominator (seconds), must be non-zero.
    pub den: u32,
}

impl Fps {
    /// Create a validated FPS value.
    pub fn new(num: u32, den: u32) -> TradeanimResult<Self> {
        if den == 0 {
            return Err(TradeanimError::config("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(TradeanimError::config("Fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    /// Convert to floating-point FPS.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    /// Sample time of frame `idx`, computed as `idx / fps`.
    pub fn frame_time_secs(self, idx: FrameIndex) -> f64 {
        (idx.0 as f64) / self.as_f64()
    }

    /// Number of frames needed to cover `secs`, computed as `ceil(secs * fps)`.
    ///
    /// Non-positive or non-finite durations yield zero frames.
    pub fn frame_count(self, secs: f64) -> u64 {
        if !secs.is_finite() || secs <= 0.0 {
            return 0;
        }
        (secs * self.as_f64()).ceil() as u64
    }
}

impl<'de> serde::Deserialize<'de> for Fps {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(serde::Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Int(u32),
            Ratio { num: u32, den: u32 },
        }

        let (num, den) = match Repr::deserialize(deserializer)? {
            Repr::Int(n) => (n, 1),
            Repr::Ratio { num, den } => (num, den),
        };
        Fps::new(num, den).map_err(serde::de::Error::custom)
    }
}

/// Output canvas dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Premultiplied RGBA8 (r,g,b already multiplied by a).
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgba8Premul {
    /// Red channel premultiplied by alpha.
    pub r: u8,
    /// Green channel premultiplied by alpha.
    pub g: u8,
    /// Blue channel premultiplied by alpha.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

impl Rgba8Premul {
    /// Fully transparent black.
    pub fn transparent() -> Self {
        Self {
            r: 0,
            g: 0,
            b: 0,
            a: 0,
        }
    }

    /// Convert straight-alpha RGBA8 into premultiplied RGBA8.
    pub fn from_straight_rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        use crate::foundation::math::mul_div255_u8;

        Self {
            r: mul_div255_u8(u16::from(r), u16::from(a)),
            g: mul_div255_u8(u16::from(g), u16::from(a)),
            b: mul_div255_u8(u16::from(b), u16::from(a)),
            a,
        }
    }

    /// Return the channels as a `[r, g, b, a]` array.
    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;

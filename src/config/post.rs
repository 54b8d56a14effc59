use serde::{Deserialize, Serialize};

use crate::foundation::error::{TradeanimError, TradeanimResult};

/// Full-frame effects applied to every output frame, in field order.
///
/// Each effect is off unless its field is present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostProcessConfig {
    /// Blend a blurred copy over the frame.
    pub bloom: Option<Bloom>,
    /// Darken towards the corners.
    pub vignette: Option<Vignette>,
    /// Brightness, contrast and saturation.
    pub color_grading: Option<ColorGrading>,
    /// Split the red and blue channels horizontally.
    pub chromatic_aberration: Option<ChromaticAberration>,
    /// Radial barrel or pincushion warp.
    pub lens_distortion: Option<LensDistortion>,
}

/// Gaussian glow.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bloom {
    /// Blur standard deviation in pixels.
    pub radius: u32,
    /// Weight of the blurred copy.
    pub intensity: f64,
}

impl Default for Bloom {
    fn default() -> Self {
        Self {
            radius: 15,
            intensity: 0.15,
        }
    }
}

/// Radial darkening `1 - strength * (r / r_max)^2`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vignette {
    /// Darkening at the corners.
    pub strength: f64,
}

impl Default for Vignette {
    fn default() -> Self {
        Self { strength: 0.3 }
    }
}

/// Enhancement factors; 1 leaves the frame unchanged.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorGrading {
    /// Scale towards black (< 1) or brighter (> 1).
    pub brightness: f64,
    /// Scale around the mean luminance.
    pub contrast: f64,
    /// Scale around each pixel's own luminance.
    pub saturation: f64,
}

impl Default for ColorGrading {
    fn default() -> Self {
        Self {
            brightness: 1.0,
            contrast: 1.0,
            saturation: 1.0,
        }
    }
}

/// Red sampled `offset` pixels to the right, blue `offset` pixels to the left.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChromaticAberration {
    /// Channel shift in pixels, rounded, at least 1.
    pub offset: f64,
}

impl Default for ChromaticAberration {
    fn default() -> Self {
        Self { offset: 3.0 }
    }
}

/// Sample each pixel from `center + d * (1 + k * r^2)`, with `d` normalized by the half diagonal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LensDistortion {
    /// Negative for barrel, positive for pincushion.
    pub k: f64,
}

impl PostProcessConfig {
    /// Whether any effect is enabled.
    pub fn is_enabled(&self) -> bool {
        self.bloom.is_some()
            || self.vignette.is_some()
            || self.color_grading.is_some()
            || self.chromatic_aberration.is_some()
            || self.lens_distortion.is_some()
    }

    pub(crate) fn validate(&self) -> TradeanimResult<()> {
        let mut checks: Vec<(&str, f64)> = Vec::new();
        if let Some(b) = self.bloom {
            if b.radius > 256 {
                return Err(TradeanimError::config("post.bloom.radius must be <= 256"));
            }
            checks.push(("post.bloom.intensity", b.intensity));
        }
        if let Some(v) = self.vignette {
            checks.push(("post.vignette.strength", v.strength));
        }
        if let Some(g) = self.color_grading {
            checks.push(("post.color_grading.brightness", g.brightness));
            checks.push(("post.color_grading.contrast", g.contrast));
            checks.push(("post.color_grading.saturation", g.saturation));
        }
        if let Some(c) = self.chromatic_aberration {
            checks.push(("post.chromatic_aberration.offset", c.offset));
        }
        for (name, v) in checks {
            if !v.is_finite() || v < 0.0 {
                return Err(TradeanimError::config(format!(
                    "{name} must be finite and >= 0"
                )));
            }
        }
        if let Some(b) = self.bloom
            && b.intensity > 1.0
        {
            return Err(TradeanimError::config("post.bloom.intensity must be <= 1"));
        }
        if let Some(l) = self.lens_distortion
            && !l.k.is_finite()
        {
            return Err(TradeanimError::config("post.lens_distortion.k must be finite"));
        }
        Ok(())
    }
}

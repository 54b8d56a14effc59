use crate::foundation::core::Rgba8Premul;
use crate::foundation::error::{TradeanimError, TradeanimResult};
use serde::{Deserialize, Serialize};

/// Straight-alpha RGBA color with channels in `[0, 1]`.
///
/// Deserializes from `"#RRGGBB"`, `"#RRGGBBAA"`, `{ "r", "g", "b", "a"? }` or `[r, g, b, a?]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Color {
    /// Red channel.
    pub r: f64,
    /// Green channel.
    pub g: f64,
    /// Blue channel.
    pub b: f64,
    /// Alpha channel.
    pub a: f64,
}

impl Color {
    /// Build a color from straight RGBA components.
    pub const fn rgba(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    /// Parse `#RRGGBB` or `#RRGGBBAA` (the leading `#` is optional).
    pub fn hex(s: &str) -> TradeanimResult<Self> {
        parse_hex(s).map_err(TradeanimError::config)
    }

    /// Return a copy with alpha multiplied by `factor` (clamped to `[0, 1]`).
    pub fn with_alpha_mul(self, factor: f64) -> Self {
        Self {
            a: (self.a * factor).clamp(0.0, 1.0),
            ..self
        }
    }

    /// Straight-alpha RGBA8 channels.
    pub fn to_rgba8(self) -> [u8; 4] {
        fn to_u8(x: f64) -> u8 {
            (x.clamp(0.0, 1.0) * 255.0).round() as u8
        }
        [to_u8(self.r), to_u8(self.g), to_u8(self.b), to_u8(self.a)]
    }

    /// Premultiplied RGBA8 channels.
    pub fn to_rgba8_premul(self) -> Rgba8Premul {
        let [r, g, b, a] = self.to_rgba8();
        Rgba8Premul::from_straight_rgba(r, g, b, a)
    }

    /// `#rrggbb` form without alpha, used for SVG paint attributes.
    pub fn to_hex_rgb(self) -> String {
        let [r, g, b, _] = self.to_rgba8();
        format!("#{r:02x}{g:02x}{b:02x}")
    }

    /// Interpolate channel-wise, clamping the result to valid channel values.
    pub fn mix(a: Self, b: Self, t: f64) -> Self {
        fn ch(a: f64, b: f64, t: f64) -> f64 {
            (a + (b - a) * t).clamp(0.0, 1.0)
        }
        Self {
            r: ch(a.r, b.r, t),
            g: ch(a.g, b.g, t),
            b: ch(a.b, b.b, t),
            a: ch(a.a, b.a, t),
        }
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Hex(String),
            RgbaObj {
                r: f64,
                g: f64,
                b: f64,
                #[serde(default = "one")]
                a: f64,
            },
            Arr(Vec<f64>),
        }

        fn one() -> f64 {
            1.0
        }

        match Repr::deserialize(deserializer)? {
            Repr::Hex(s) => parse_hex(&s).map_err(serde::de::Error::custom),
            Repr::RgbaObj { r, g, b, a } => Ok(Self::rgba(r, g, b, a)),
            Repr::Arr(v) => match v.as_slice() {
                [r, g, b] => Ok(Self::rgba(*r, *g, *b, 1.0)),
                [r, g, b, a] => Ok(Self::rgba(*r, *g, *b, *a)),
                _ => Err(serde::de::Error::custom(
                    "rgba array must have len 3 ([r,g,b]) or 4 ([r,g,b,a])",
                )),
            },
        }
    }
}

fn parse_hex(s: &str) -> Result<Color, String> {
    let s = s.trim();
    let s = s.strip_prefix('#').unwrap_or(s);
    if !s.is_ascii() {
        return Err(format!("invalid hex color \"{s}\""));
    }

    fn hex_byte(pair: &str) -> Result<u8, String> {
        u8::from_str_radix(pair, 16).map_err(|_| format!("invalid hex byte \"{pair}\""))
    }

    let (r, g, b, a) = match s.len() {
        6 => (
            hex_byte(&s[0..2])?,
            hex_byte(&s[2..4])?,
            hex_byte(&s[4..6])?,
            255,
        ),
        8 => (
            hex_byte(&s[0..2])?,
            hex_byte(&s[2..4])?,
            hex_byte(&s[4..6])?,
            hex_byte(&s[6..8])?,
        ),
        _ => {
            return Err("hex color must be #RRGGBB or #RRGGBBAA (case-insensitive)".to_owned());
        }
    };

    Ok(Color::rgba(
        f64::from(r) / 255.0,
        f64::from(g) / 255.0,
        f64::from(b) / 255.0,
        f64::from(a) / 255.0,
    ))
}

/// Build a [`Color`] from a hex literal known to be valid at compile time.
///
/// Only used for built-in defaults; falls back to opaque magenta so a typo is visible.
pub(crate) fn hex_or_magenta(s: &str) -> Color {
    parse_hex(s).unwrap_or(Color::rgba(1.0, 0.0, 1.0, 1.0))
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/color.rs"]
mod tests;

use crate::foundation::color::{Color, hex_or_magenta};
use serde::{Deserialize, Serialize};

/// Chart color palette consumed by the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Theme {
    /// Canvas background.
    pub background: Color,
    /// Plot panel fill.
    pub panel_bg: Color,
    /// Grid line color.
    pub grid_color: Color,
    /// Default text color.
    pub text_color: Color,
    /// Axis labels and gutter separators.
    pub axis_color: Color,
    /// Bullish candle body.
    pub bull_body: Color,
    /// Bearish candle body.
    pub bear_body: Color,
    /// Bullish wick.
    pub bull_wick: Color,
    /// Bearish wick.
    pub bear_wick: Color,
    /// Highlight color used by flash animations when none is given.
    pub highlight: Color,
    /// Volume bar under a bullish candle.
    pub volume_up: Color,
    /// Volume bar under a bearish candle.
    pub volume_down: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

fn palette(colors: [&str; 12]) -> Theme {
    let [
        background,
        panel_bg,
        grid_color,
        text_color,
        axis_color,
        bull_body,
        bear_body,
        bull_wick,
        bear_wick,
        highlight,
        volume_up,
        volume_down,
    ] = colors.map(hex_or_magenta);
    Theme {
        background,
        panel_bg,
        grid_color,
        text_color,
        axis_color,
        bull_body,
        bear_body,
        bull_wick,
        bear_wick,
        highlight,
        volume_up,
        volume_down,
    }
}

impl Theme {
    /// TradingView-like dark palette (the default).
    pub fn dark() -> Self {
        palette([
            "#131722", "#1e222d", "#262b3e", "#d1d4dc", "#787b86", "#26a69a", "#ef5350",
            "#26a69a", "#ef5350", "#ffd54f", "#26a69a80", "#ef535080",
        ])
    }

    /// Light background with teal/red candles.
    pub fn light() -> Self {
        palette([
            "#ffffff", "#f5f5f5", "#e0e0e0", "#333333", "#666666", "#26a69a", "#ef5350",
            "#26a69a", "#ef5350", "#ff9800", "#26a69a60", "#ef535060",
        ])
    }

    /// White background, hollow-looking white bull bodies and black bears.
    pub fn white() -> Self {
        palette([
            "#ffffff", "#f5f5f5", "#e0e0e0", "#333333", "#666666", "#ffffff", "#000000",
            "#000000", "#000000", "#999999", "#00000060", "#00000060",
        ])
    }

    /// White background, green bulls and black bears.
    pub fn white_green() -> Self {
        palette([
            "#ffffff", "#f5f5f5", "#e0e0e0", "#333333", "#666666", "#81c784", "#000000",
            "#000000", "#000000", "#999999", "#81c78460", "#00000060",
        ])
    }

    /// Pure black background with saturated candles.
    pub fn black() -> Self {
        palette([
            "#000000", "#0a0a0a", "#1a1a1a", "#d1d4dc", "#787b86", "#11cd83", "#f23645",
            "#11cd83", "#f23645", "#ffd54f", "#11cd8380", "#f2364580",
        ])
    }

    /// Dark slate background, white bulls and grey bears.
    pub fn midnight() -> Self {
        palette([
            "#161b1e", "#1c2226", "#252b30", "#d1d4dc", "#787b86", "#ffffff", "#636363",
            "#ffffff", "#636363", "#ffd54f", "#ffffff60", "#63636360",
        ])
    }

    /// Look up a built-in palette by name.
    pub fn preset(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "dark" => Some(Self::dark()),
            "light" => Some(Self::light()),
            "white" => Some(Self::white()),
            "white_green" | "white-green" => Some(Self::white_green()),
            "black" => Some(Self::black()),
            "midnight" => Some(Self::midnight()),
            _ => None,
        }
    }
}

/// Accept either a preset name or a full (partially defaulted) theme object.
pub(crate) fn deserialize_theme<'de, D>(deserializer: D) -> Result<Theme, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Preset(String),
        Custom(Box<Theme>),
    }

    match Repr::deserialize(deserializer)? {
        Repr::Preset(name) => Theme::preset(&name)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown theme preset '{name}'"))),
        Repr::Custom(theme) => Ok(*theme),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/config/theme.rs"]
mod tests;

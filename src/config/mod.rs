//! Render configuration and color themes.

/// Full-frame post effects.
pub mod post;
/// Render/encode settings.
pub mod render;
/// Color palettes.
pub mod theme;

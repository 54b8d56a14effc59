/// Convenience result type used across tradeanim.
pub type TradeanimResult<T> = Result<T, TradeanimError>;

/// Top-level error taxonomy used by engine APIs.
///
/// `Config`, `Timeline` and `Animation` errors are caller mistakes and are never retried.
/// `Encode` errors come from the external encoder process.
#[derive(thiserror::Error, Debug)]
pub enum TradeanimError {
    /// Invalid render configuration (canvas size, fps, quality parameters).
    #[error("config error: {0}")]
    Config(String),

    /// Invalid scene construction call (unknown element, negative duration).
    #[error("timeline error: {0}")]
    Timeline(String),

    /// An animation was applied to a state it cannot drive.
    #[error("animation error: {0}")]
    Animation(String),

    /// Rasterization failures.
    #[error("render error: {0}")]
    Render(String),

    /// Encoder process failures and frame-order violations.
    #[error("encode error: {0}")]
    Encode(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TradeanimError {
    /// Build a [`TradeanimError::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Build a [`TradeanimError::Timeline`] value.
    pub fn timeline(msg: impl Into<String>) -> Self {
        Self::Timeline(msg.into())
    }

    /// Build a [`TradeanimError::Animation`] value.
    pub fn animation(msg: impl Into<String>) -> Self {
        Self::Animation(msg.into())
    }

    /// Build a [`TradeanimError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build a [`TradeanimError::Encode`] value.
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// Build a [`TradeanimError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;

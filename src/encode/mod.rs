//! Encoding sinks.
//!
//! Sinks consume rendered frames in presentation order and are driven by
//! [`crate::director::Director::render`].

/// `ffmpeg`-based sink (MP4 output via an external `ffmpeg` process).
pub mod ffmpeg;
/// Frame sink trait, order guard and the in-memory sink.
pub mod sink;

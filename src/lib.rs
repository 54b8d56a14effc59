//! tradeanim renders animated trading charts into video.
//!
//! A scene is a set of chart elements (candles, bars, lines, zones, levels, arrows, text) plus a
//! log of timed animation directives. The pipeline is:
//!
//! - Build a [`Scene`] with [`Scene::build`], or load a [`SceneDef`] from JSON
//! - Create a [`Director`], which prepares every directive's start snapshot
//! - Render single frames, or stream every frame into a [`FrameSink`] such as [`FfmpegSink`]
//!
//! ```
//! use tradeanim::{Animation, Director, DirectorOpts, Element, FontBook, InMemorySink, RenderConfig, Scene};
//!
//! let config = RenderConfig { width: 64, height: 36, fps: tradeanim::Fps::new(10, 1)?, ..RenderConfig::default() };
//! let scene = Scene::build(config, |s| {
//!     let c = s.add_element(Element::candle(0, 10.0, 12.0, 9.0, 11.0));
//!     s.play_and_wait([Animation::appear(vec![c])], 1.0)?;
//!     Ok(())
//! })?;
//! let director = Director::new(&scene, DirectorOpts::default())?.with_fonts(FontBook::empty());
//! let mut sink = InMemorySink::new();
//! let stats = director.render(&mut sink)?;
//! assert_eq!(stats.frames, 10);
//! # Ok::<(), tradeanim::TradeanimError>(())
//! ```
#![forbid(unsafe_code)]
#![deny(missing_docs)]

/// Core value types, errors and color.
pub mod foundation;

/// Easing curves and animation variants.
pub mod animation;
/// Render configuration and themes.
pub mod config;
/// Render loop driving scene, renderer and sink.
pub mod director;
/// Encoding sinks.
pub mod encode;
/// Start snapshots and per-frame state evaluation.
pub mod eval;
/// Rasterization backends.
pub mod render;
/// Elements, registry, camera and scene construction.
pub mod scene;
/// Directive log and per-frame resolution.
pub mod timeline;

pub use crate::foundation::color::Color;
pub use crate::foundation::core::{
    Affine, BezPath, Canvas, Fps, FrameIndex, FrameRange, Point, Rect, Rgba8Premul, Vec2,
};
pub use crate::foundation::error::{TradeanimError, TradeanimResult};

pub use crate::animation::anim::{Animation, AppearStyle, Direction};
pub use crate::animation::ease::Ease;
pub use crate::config::post::{
    Bloom, ChromaticAberration, ColorGrading, LensDistortion, PostProcessConfig, Vignette,
};
pub use crate::config::render::RenderConfig;
pub use crate::config::theme::Theme;
pub use crate::director::{Director, DirectorOpts, RenderProgress, RenderStats};
pub use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts, is_ffmpeg_on_path};
pub use crate::encode::sink::{EncodeQuality, FrameOrder, FrameSink, InMemorySink, SinkConfig};
pub use crate::eval::evaluator::PreparedScene;
pub use crate::eval::state::FrameState;
pub use crate::render::backend::{BackendKind, FrameRGBA, RenderBackend, create_backend};
pub use crate::render::cpu::CpuBackend;
pub use crate::render::text::FontBook;
pub use crate::scene::builder::{PlayOpts, Scene, SceneBuilder};
pub use crate::scene::camera::Camera;
pub use crate::scene::def::SceneDef;
pub use crate::scene::element::{Capabilities, Element, ElementKind, Layer};
pub use crate::scene::registry::{ElementId, ElementRegistry};
pub use crate::scene::trade::{
    Bar, Exit, OrderType, Side, Trade, TradeHandle, TradeParts, TradeStatus, TradeStyle,
};
pub use crate::timeline::{Directive, Timeline};

//! Scene model: elements, their registry, the camera and scene construction.

/// Closure-driven scene construction.
pub mod builder;
/// Viewport state and the data-to-pixel transform.
pub mod camera;
/// JSON scene descriptions.
pub mod def;
/// Element kinds and capability tags.
pub mod element;
/// Element ownership and stable handles.
pub mod registry;
/// Trade setups, brackets and live PnL.
pub mod trade;

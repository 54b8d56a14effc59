//! Rasterization of evaluated frame states.

/// Backend trait and the frame type it produces.
pub mod backend;
/// `vello_cpu` raster backend.
pub mod cpu;
/// Supersample shrinking and full-frame effects.
pub mod post;
/// Text layout and rasterization.
pub mod text;

//! Easing curves and the closed animation variant set.

/// Animation variants and their single `apply` operation.
pub mod anim;
/// Easing functions.
pub mod ease;

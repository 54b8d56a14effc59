/// Core value types shared by every layer.
pub mod core;
/// Error taxonomy.
pub mod error;
/// Fixed-point and axis helpers.
pub mod math;
/// Straight-alpha colors and their parsing.
pub mod color;

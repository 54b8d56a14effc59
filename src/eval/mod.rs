//! Per-sample-time state evaluation.

/// Start-snapshot preparation and frame state evaluation.
pub mod evaluator;
/// Frame-local element states and captured snapshots.
pub mod state;

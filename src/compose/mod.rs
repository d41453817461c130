//! Timeline composition: geometric/temporal harmonization and clip
//! concatenation into one composed timeline.

/// Baseline derivation and per-clip transform planning.
pub mod harmonize;
/// Clip loading, concatenation, and the composed timeline.
pub mod timeline;

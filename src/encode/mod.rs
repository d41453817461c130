//! Encoding sinks.
//!
//! Sinks consume harmonized frames in timeline order and own the final
//! encode/mux step.

/// `ffmpeg`-based sink (MP4 output via the system `ffmpeg`).
pub mod ffmpeg;
/// Generic frame sink trait and the in-memory test sink.
pub mod sink;

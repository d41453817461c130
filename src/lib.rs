//! Vidstitch concatenates a selection of video clips into one MP4 with
//! normalized audio and a background music bed.
//!
//! The pipeline is staged:
//!
//! - Analyze every clip's audio peak and derive per-clip normalization gains
//! - Load each clip and harmonize it to the first clip's geometry and rate
//! - Concatenate clips into a [`ComposedTimeline`]
//! - Loop, trim, attenuate, and fade a background track into the mix
//! - Stream the harmonized frames into an `ffmpeg` encode via [`FrameSink`]
//!
//! [`Pipeline::run`] drives the stages and guarantees that every media
//! resource opened along the way is released, on success and failure alike.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

/// Audio normalization, background mixing, and PCM helpers.
pub mod audio;
/// Timeline composition: harmonization planning and concatenation.
pub mod compose;
/// Encoding sinks.
pub mod encode;
/// Media probing, decoding, and resource tracking.
pub mod media;
/// The staged composition pipeline.
pub mod pipeline;
/// Directory scanning for candidate media files.
pub mod scan;
/// Interactive numbered-list selection.
pub mod select;

pub use crate::foundation::core::{Dimensions, Fps};
pub use crate::foundation::error::{VidstitchError, VidstitchResult};

pub use crate::compose::timeline::ComposedTimeline;
pub use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts};
pub use crate::encode::sink::{AudioInputConfig, FrameSink, InMemorySink, SinkConfig};
pub use crate::media::clip::{ClipHandle, ClipRegistry, MediaClip};
pub use crate::pipeline::{Pipeline, PipelineOpts, PipelineState, stream_timeline};

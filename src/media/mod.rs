//! Media resource access: ffprobe metadata, ffmpeg raw decode, and the
//! clip registry that guarantees release of every opened resource.

/// Open clips and the release-tracking registry.
pub mod clip;
/// Raw frame and PCM decoding through the system `ffmpeg`.
pub mod decode;
/// Source metadata via `ffprobe`.
pub mod probe;

//! Helpers over interleaved `f32` PCM buffers.
//!
//! All lengths are in interleaved samples unless a name says frames; one
//! frame is one sample per channel.

use std::path::Path;

use crate::foundation::error::{VidstitchError, VidstitchResult};

/// Peak amplitude: `max(abs(sample))` over the buffer, `0.0` when empty.
pub fn peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()))
}

/// Scale every sample by `gain` in place.
pub fn apply_gain(samples: &mut [f32], gain: f32) {
    for s in samples {
        *s *= gain;
    }
}

/// Number of sequential repetitions of a background track needed to cover
/// the video: `ceil(video / background)`.
pub fn loop_count(video_sec: f64, background_sec: f64) -> u64 {
    if background_sec <= 0.0 {
        return 0;
    }
    (video_sec / background_sec).ceil().max(0.0) as u64
}

/// Repeat `src` end-to-end (no crossfade) until at least `target_len`
/// interleaved samples exist, then trim to exactly `target_len`.
pub fn loop_and_trim(src: &[f32], target_len: usize) -> Vec<f32> {
    if src.is_empty() || target_len == 0 {
        return vec![0.0; target_len];
    }
    let mut out = Vec::with_capacity(target_len);
    while out.len() < target_len {
        let take = (target_len - out.len()).min(src.len());
        out.extend_from_slice(&src[..take]);
    }
    out
}

/// Apply a linear fade-out over the trailing `fade_sec` seconds, tapering to
/// zero at the buffer's end. Buffers shorter than the window fade over their
/// whole length.
pub fn fade_out_linear(samples: &mut [f32], fade_sec: f64, sample_rate: u32, channels: u16) {
    if fade_sec <= 0.0 || samples.is_empty() {
        return;
    }
    let channels = usize::from(channels).max(1);
    let total_frames = samples.len() / channels;
    for frame in 0..total_frames {
        let remaining_sec = (total_frames - frame) as f64 / f64::from(sample_rate);
        let gain = (remaining_sec / fade_sec).clamp(0.0, 1.0) as f32;
        if gain >= 1.0 {
            continue;
        }
        let base = frame * channels;
        for s in &mut samples[base..base + channels] {
            *s *= gain;
        }
    }
}

/// Sum `src` into `dst` element-wise over their common prefix.
pub fn mix_into(dst: &mut [f32], src: &[f32]) {
    for (d, s) in dst.iter_mut().zip(src) {
        *d += *s;
    }
}

/// Clamp every sample to the [-1, 1] range after summation.
pub fn clamp_unity(samples: &mut [f32]) {
    for s in samples {
        *s = s.clamp(-1.0, 1.0);
    }
}

/// Interleaved sample count covering `sec` seconds at `sample_rate`, rounded
/// to a whole frame.
pub fn duration_to_samples(sec: f64, sample_rate: u32, channels: u16) -> usize {
    let frames = (sec * f64::from(sample_rate)).round().max(0.0) as usize;
    frames * usize::from(channels)
}

/// Write interleaved `f32` PCM samples to a raw little-endian `.f32le` file.
pub fn write_f32le_file(samples: &[f32], out_path: &Path) -> VidstitchResult<()> {
    if let Some(parent) = out_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| {
            VidstitchError::encode(format!(
                "failed to create audio output directory '{}': {e}",
                parent.display()
            ))
        })?;
    }

    let mut bytes = Vec::<u8>::with_capacity(samples.len() * 4);
    for &sample in samples {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    std::fs::write(out_path, bytes).map_err(|e| {
        VidstitchError::encode(format!(
            "failed to write mixed audio file '{}': {e}",
            out_path.display()
        ))
    })
}

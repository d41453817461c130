//! Two-pass peak normalization across a batch of clips.
//!
//! Loudness matching is a peak-amplitude proxy: every clip with audio is
//! scaled so its peak meets the loudest clip's peak. This is a deliberate
//! approximation, not integrated/perceptual loudness.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::audio::pcm;
use crate::foundation::error::{VidstitchError, VidstitchResult};
use crate::media::clip::ClipRegistry;

/// Peak-amplitude measurement for one clip's audio track. Ephemeral: only
/// the folded global maximum outlives the analysis pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VolumeProfile {
    /// `max(abs(sample))` over the clip's full audio track.
    pub peak: f32,
}

impl VolumeProfile {
    /// Measure a decoded sample buffer.
    pub fn measure(samples: &[f32]) -> Self {
        Self {
            peak: pcm::peak(samples),
        }
    }
}

/// Gain that lifts a clip with `clip_peak` to `global_peak`.
///
/// `None` means "leave the clip unscaled": either the batch had no audio at
/// all (`global_peak == 0`) or this clip is silent (`clip_peak == 0`). The
/// loudest clip in the batch gets exactly 1.0.
pub fn gain_for(global_peak: f32, clip_peak: f32) -> Option<f32> {
    if global_peak <= 0.0 || clip_peak <= 0.0 {
        return None;
    }
    Some(global_peak / clip_peak)
}

/// Analysis pass: measure every selected clip's peak and fold the global
/// maximum. Clips without audio contribute nothing; a batch with no audio
/// anywhere yields `0.0` and normalization is skipped downstream.
///
/// Any probe or decode failure aborts the run with a clip-identifying error;
/// analysis is not best-effort.
pub fn analyze_global_peak(
    registry: &mut ClipRegistry,
    video_paths: &[PathBuf],
) -> VidstitchResult<f32> {
    let mut global_peak = 0.0f32;
    for path in video_paths {
        let peak = analyze_clip_peak(registry, path)?;
        if let Some(profile) = peak {
            debug!(path = %path.display(), peak = profile.peak, "analyzed clip audio");
            global_peak = global_peak.max(profile.peak);
        }
    }
    debug!(global_peak, "audio analysis complete");
    Ok(global_peak)
}

fn analyze_clip_peak(
    registry: &mut ClipRegistry,
    path: &Path,
) -> VidstitchResult<Option<VolumeProfile>> {
    let mut clip = registry
        .open(path)
        .map_err(|e| analysis_error(path, &e))?;
    let profile = if clip.info.has_audio {
        let samples = clip
            .audio_samples()
            .map_err(|e| analysis_error(path, &e))?;
        Some(VolumeProfile::measure(&samples.interleaved_f32))
    } else {
        None
    };
    registry.release(clip.handle);
    Ok(profile)
}

fn analysis_error(path: &Path, err: &VidstitchError) -> VidstitchError {
    VidstitchError::media(format!(
        "failed to analyze audio in {}: {err}",
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string())
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loudest_clip_gets_unity_gain() {
        let global = 0.8f32;
        assert_eq!(gain_for(global, 0.8), Some(1.0));
    }

    #[test]
    fn quieter_clips_are_lifted_to_global_peak() {
        let global = 0.8f32;
        let clip = 0.2f32;
        let gain = gain_for(global, clip).unwrap();
        assert!((clip * gain - global).abs() < 1e-6);
        assert!(gain >= 1.0);
    }

    #[test]
    fn silent_clip_is_left_unscaled() {
        assert_eq!(gain_for(0.8, 0.0), None);
    }

    #[test]
    fn batch_without_audio_skips_normalization() {
        assert_eq!(gain_for(0.0, 0.5), None);
    }

    #[test]
    fn volume_profile_measures_peak() {
        let p = VolumeProfile::measure(&[0.25, -0.5, 0.1]);
        assert_eq!(p.peak, 0.5);
    }
}

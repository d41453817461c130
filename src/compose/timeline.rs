use std::path::PathBuf;

use tracing::{debug, info};

use crate::audio::normalize::{VolumeProfile, gain_for};
use crate::audio::pcm;
use crate::compose::harmonize::{Baseline, HarmonizePlan, plan_for};
use crate::foundation::core::Fps;
use crate::foundation::error::{VidstitchError, VidstitchResult};
use crate::media::clip::{ClipHandle, ClipRegistry};
use crate::media::decode::{MIX_CHANNELS, MIX_SAMPLE_RATE};

/// One harmonized clip scheduled on the composed timeline.
#[derive(Clone, Debug)]
pub struct TimelineClip {
    /// Registry entry for the underlying resource.
    pub handle: ClipHandle,
    /// Source path, used to re-open the decoder during the write pass.
    pub source_path: PathBuf,
    /// File name for log and error messages.
    pub display_name: String,
    /// Clip duration in seconds.
    pub duration_sec: f64,
    /// Transform bringing the clip to the baseline.
    pub plan: HarmonizePlan,
    /// Normalization gain applied to the clip's audio, when it had any.
    pub gain: Option<f32>,
}

/// A loaded clip plus its normalized audio, awaiting concatenation.
#[derive(Clone, Debug)]
pub struct LoadedClip {
    /// Timeline scheduling data.
    pub clip: TimelineClip,
    /// Normalized interleaved PCM, `None` for clips without audio.
    pub(crate) audio: Option<Vec<f32>>,
}

/// Result of the load/harmonize pass over the selected clips.
#[derive(Clone, Debug, Default)]
pub struct LoadPass {
    /// Harmonization target fixed by the first clip, `None` when the pass
    /// saw no clips at all.
    pub baseline: Option<Baseline>,
    /// Loaded clips in original selection order.
    pub clips: Vec<LoadedClip>,
}

/// The concatenation result: one continuous timeline at the harmonized
/// baseline, owned by the orchestrator until the final write.
#[derive(Clone, Debug)]
pub struct ComposedTimeline {
    /// Geometry and rate shared by every scheduled clip.
    pub baseline: Baseline,
    /// Clips in original selection order.
    pub clips: Vec<TimelineClip>,
    /// Total duration: the sum of constituent durations.
    pub duration_sec: f64,
    /// Concatenated original audio (interleaved 48 kHz stereo), `None` when
    /// no input clip carried audio. Reassigned by the background mixer.
    pub audio: Option<Vec<f32>>,
}

impl ComposedTimeline {
    /// Interleaved sample count covering the full timeline.
    pub fn total_samples(&self) -> usize {
        pcm::duration_to_samples(self.duration_sec, MIX_SAMPLE_RATE, MIX_CHANNELS)
    }

    /// Output frame rate, defaulting to 30 when no input declared one.
    pub fn output_fps(&self) -> Fps {
        self.baseline.fps.unwrap_or_else(Fps::default_output)
    }
}

/// Load pass: open each selected clip in order, normalize its audio against
/// `global_peak` (0.0 disables normalization), and harmonize it against the
/// baseline fixed by the first clip.
///
/// Zero-duration clips are rejected here, before any transform.
pub fn load_and_harmonize(
    registry: &mut ClipRegistry,
    video_paths: &[PathBuf],
    global_peak: f32,
) -> VidstitchResult<LoadPass> {
    let mut pass = LoadPass::default();

    for path in video_paths {
        let mut clip = registry.open(path).map_err(|e| {
            VidstitchError::media(format!("failed to load video {}: {e}", name_of(path)))
        })?;
        let name = clip.info.display_name();

        if clip.info.duration_sec <= 0.0 {
            return Err(VidstitchError::media(format!(
                "video {name} has zero duration"
            )));
        }

        // Normalization runs before any geometric transform.
        let mut gain = None;
        let mut audio = None;
        if clip.info.has_audio {
            let samples = clip
                .audio_samples()
                .map_err(|e| VidstitchError::media(format!("failed to load video {name}: {e}")))?;
            let own_peak = VolumeProfile::measure(&samples.interleaved_f32).peak;
            let mut pcm_buf = clip
                .take_audio()
                .map(|a| a.interleaved_f32)
                .unwrap_or_default();
            gain = gain_for(global_peak, own_peak);
            if let Some(g) = gain {
                pcm::apply_gain(&mut pcm_buf, g);
                debug!(clip = %name, gain = g, "normalized clip audio");
            }
            audio = Some(pcm_buf);
        }

        // The first clip fixes the baseline but is planned like any other:
        // odd dimensions get rounded to even, so it may need a scale itself.
        let base = match &pass.baseline {
            Some(base) => base,
            None => &*pass.baseline.insert(Baseline::from_first(&clip.info)?),
        };
        let plan = plan_for(base, &clip.info)?;
        if !plan.is_noop() {
            debug!(clip = %name, ?plan, "harmonizing clip to baseline");
        }

        pass.clips.push(LoadedClip {
            clip: TimelineClip {
                handle: clip.handle,
                source_path: clip.info.source_path.clone(),
                display_name: name,
                duration_sec: clip.info.duration_sec,
                plan,
                gain,
            },
            audio,
        });
    }

    Ok(pass)
}

/// Concatenate the loaded clips in selection order into one timeline.
///
/// An empty load pass cannot happen when the analysis pass already
/// succeeded, but the invariant is validated defensively.
pub fn concatenate(pass: LoadPass) -> VidstitchResult<ComposedTimeline> {
    let Some(baseline) = pass.baseline else {
        return Err(VidstitchError::compose("no valid video clips to process"));
    };
    if pass.clips.is_empty() {
        return Err(VidstitchError::compose("no valid video clips to process"));
    }

    let total_duration: f64 = pass.clips.iter().map(|c| c.clip.duration_sec).sum();
    let segments: Vec<(f64, Option<&[f32]>)> = pass
        .clips
        .iter()
        .map(|c| (c.clip.duration_sec, c.audio.as_deref()))
        .collect();
    let audio = concat_audio(&segments, total_duration)?;

    let clips: Vec<TimelineClip> = pass.clips.into_iter().map(|c| c.clip).collect();
    info!(
        clips = clips.len(),
        duration_sec = total_duration,
        "composed timeline"
    );
    Ok(ComposedTimeline {
        baseline,
        clips,
        duration_sec: total_duration,
        audio,
    })
}

/// Place each clip's audio at its cumulative offset in one timeline-length
/// buffer. Returns `None` when no clip carried audio.
fn concat_audio(
    segments: &[(f64, Option<&[f32]>)],
    total_duration: f64,
) -> VidstitchResult<Option<Vec<f32>>> {
    if segments.iter().all(|(_, samples)| samples.is_none()) {
        return Ok(None);
    }

    let total = pcm::duration_to_samples(total_duration, MIX_SAMPLE_RATE, MIX_CHANNELS);
    let mut out = vec![0.0f32; total];
    let mut offset_sec = 0.0f64;
    for (duration_sec, samples) in segments {
        if let Some(samples) = samples {
            let start = pcm::duration_to_samples(offset_sec, MIX_SAMPLE_RATE, MIX_CHANNELS);
            if start > total {
                return Err(VidstitchError::compose(
                    "failed to concatenate videos: audio offset exceeds timeline",
                ));
            }
            let end = (start + samples.len()).min(total);
            pcm::mix_into(&mut out[start..end], &samples[..end - start]);
        }
        offset_sec += duration_sec;
    }
    Ok(Some(out))
}

fn name_of(path: &std::path::Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

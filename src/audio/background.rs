//! Background music preparation and compositing.
//!
//! Every failure here is recoverable by design: the orchestrator downgrades
//! errors from this module to a warning and keeps the timeline's original
//! audio. That asymmetry with the rest of the pipeline is deliberate.

use std::path::Path;

use tracing::{debug, info};

use crate::audio::pcm;
use crate::compose::timeline::ComposedTimeline;
use crate::foundation::error::{VidstitchError, VidstitchResult};
use crate::media::clip::ClipRegistry;
use crate::media::decode::{MIX_CHANNELS, MIX_SAMPLE_RATE};

/// Fixed attenuation applied to the background track.
pub const BACKGROUND_GAIN: f32 = 0.3;

/// Fixed linear fade-out length ending at the track's end.
pub const FADE_OUT_SEC: f64 = 3.0;

/// Loop, trim, attenuate, and fade the background track, then composite it
/// with the timeline's existing audio (or install it as the sole track).
///
/// The background resource is tracked in `registry` like every other clip and
/// is released by the orchestrator's cleanup phase.
pub fn mix_background(
    registry: &mut ClipRegistry,
    timeline: &mut ComposedTimeline,
    music_path: &Path,
) -> VidstitchResult<()> {
    let mut background = registry.open(music_path)?;
    if !background.info.has_audio {
        return Err(VidstitchError::media(format!(
            "'{}' has no audio stream",
            background.info.display_name()
        )));
    }

    let source = background.audio_samples()?;
    if source.interleaved_f32.is_empty() {
        return Err(VidstitchError::media(format!(
            "'{}' decoded to an empty audio track",
            background.info.display_name()
        )));
    }

    let video_sec = timeline.duration_sec;
    let background_sec = source.duration_sec();
    if background_sec < video_sec {
        let loops = pcm::loop_count(video_sec, background_sec);
        debug!(loops, background_sec, video_sec, "looping background track");
    }

    // Sequential repetition then an exact trim to the video duration.
    let target = timeline.total_samples();
    let mut track = pcm::loop_and_trim(&source.interleaved_f32, target);
    background.take_audio();

    pcm::apply_gain(&mut track, BACKGROUND_GAIN);
    pcm::fade_out_linear(&mut track, FADE_OUT_SEC, MIX_SAMPLE_RATE, MIX_CHANNELS);

    match timeline.audio.as_mut() {
        Some(original) => {
            pcm::mix_into(original, &track);
            pcm::clamp_unity(original);
            info!("composited background music with original audio");
        }
        None => {
            timeline.audio = Some(track);
            info!("background music installed as sole audio track");
        }
    }
    Ok(())
}

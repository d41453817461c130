//! Pipeline orchestration: the staged run from analysis to the final write.
//!
//! Stages run strictly in order and every failure short-circuits to the
//! terminal error state, with one exception: background music problems are
//! downgraded to a warning so the composed video still gets written. The
//! cleanup phase releases every tracked media resource on success and on
//! every failure path alike.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::audio::background::mix_background;
use crate::audio::normalize::analyze_global_peak;
use crate::audio::pcm;
use crate::compose::timeline::{ComposedTimeline, concatenate, load_and_harmonize};
use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts};
use crate::encode::sink::{AudioInputConfig, FrameSink, SinkConfig};
use crate::foundation::error::{VidstitchError, VidstitchResult};
use crate::media::clip::ClipRegistry;
use crate::media::decode::{FrameStream, MIX_CHANNELS, MIX_SAMPLE_RATE};

/// Everything a run needs up front: the selections and the destination.
#[derive(Clone, Debug)]
pub struct PipelineOpts {
    /// Video clips in the order they will appear in the output.
    pub video_paths: Vec<PathBuf>,
    /// Background music track.
    pub music_path: PathBuf,
    /// Output MP4 path.
    pub output_path: PathBuf,
}

/// Observable run phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PipelineState {
    /// Created, nothing opened yet.
    #[default]
    Init,
    /// Measuring per-clip audio peaks.
    AnalyzingAudio,
    /// Opening clips and planning harmonization.
    LoadingAndHarmonizing,
    /// Joining clips into one timeline.
    Concatenating,
    /// Preparing and compositing the background track.
    MixingBackground,
    /// Final checks before the write.
    Validating,
    /// Streaming frames into the encoder.
    Writing,
    /// Run finished successfully. Terminal.
    Done,
    /// Run aborted with an error. Terminal.
    Error,
}

/// One composition run. Owns the resource registry so callers can inspect
/// open/release accounting after the run finishes.
#[derive(Debug, Default)]
pub struct Pipeline {
    registry: ClipRegistry,
    state: PipelineState,
}

impl Pipeline {
    /// Create a pipeline in the initial state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase. `Done` and `Error` are terminal.
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Resource accounting for the run.
    pub fn registry(&self) -> &ClipRegistry {
        &self.registry
    }

    /// Run the full composition. Cleanup releases every tracked resource
    /// before this returns, whether the run succeeded or not.
    #[tracing::instrument(skip_all, fields(output = %opts.output_path.display()))]
    pub fn run(&mut self, opts: &PipelineOpts) -> VidstitchResult<()> {
        let result = self.run_stages(opts);

        let released = self.registry.release_all();
        info!(
            released,
            opened = self.registry.opened(),
            "released media resources"
        );

        match result {
            Ok(()) => {
                self.set_state(PipelineState::Done);
                Ok(())
            }
            Err(e) => {
                self.set_state(PipelineState::Error);
                Err(e)
            }
        }
    }

    fn run_stages(&mut self, opts: &PipelineOpts) -> VidstitchResult<()> {
        if opts.video_paths.is_empty() {
            return Err(VidstitchError::config("no video clips selected"));
        }

        self.set_state(PipelineState::AnalyzingAudio);
        let global_peak = analyze_global_peak(&mut self.registry, &opts.video_paths)?;

        self.set_state(PipelineState::LoadingAndHarmonizing);
        let pass = load_and_harmonize(&mut self.registry, &opts.video_paths, global_peak)?;

        self.set_state(PipelineState::Concatenating);
        let mut timeline = concatenate(pass)?;

        self.set_state(PipelineState::MixingBackground);
        if let Err(e) = mix_background(&mut self.registry, &mut timeline, &opts.music_path) {
            warn!(error = %e, "could not add background music, continuing without it");
        }

        self.set_state(PipelineState::Validating);
        if timeline.duration_sec <= 0.0 {
            return Err(VidstitchError::compose(
                "composed timeline has zero duration",
            ));
        }

        self.set_state(PipelineState::Writing);
        write_output(&timeline, &opts.output_path)
    }

    fn set_state(&mut self, next: PipelineState) {
        debug!(from = ?self.state, to = ?next, "pipeline state change");
        self.state = next;
    }
}

/// Write pass: re-decode each clip with its harmonization plan applied and
/// stream the frames into one encoder invocation, muxing the assembled audio
/// from a temporary raw PCM file.
///
/// A failure anywhere in the stream aborts the encoder and removes the
/// partial output file, so a run that returns an error leaves nothing on
/// disk.
fn write_output(timeline: &ComposedTimeline, output_path: &Path) -> VidstitchResult<()> {
    let mut temp_audio = TempFileGuard::default();

    let audio = match timeline.audio.as_deref() {
        Some(samples) => {
            let path = temp_audio_path(output_path);
            pcm::write_f32le_file(samples, &path)?;
            temp_audio.track(path.clone());
            Some(AudioInputConfig {
                path,
                sample_rate: MIX_SAMPLE_RATE,
                channels: MIX_CHANNELS,
            })
        }
        None => None,
    };

    let cfg = SinkConfig {
        dims: timeline.baseline.dims,
        fps: timeline.output_fps(),
        audio,
    };
    let mut sink = FfmpegSink::new(FfmpegSinkOpts::new(output_path));
    match stream_timeline(timeline, &mut sink, cfg) {
        Ok(frames) => {
            info!(
                frames,
                duration_sec = timeline.duration_sec,
                path = %output_path.display(),
                "wrote composed video"
            );
            Ok(())
        }
        Err(e) => match sink.abort() {
            Some(stderr) => Err(VidstitchError::encode(format!(
                "{e}; encoder reported: {stderr}"
            ))),
            None => Err(e),
        },
    }
}

/// Stream every clip of `timeline` into `sink` in selection order with
/// strictly increasing frame indices, then finalize the sink. Returns the
/// number of frames pushed.
///
/// Generic over the sink; the caller owns recovery when this fails against
/// a sink with external state.
pub fn stream_timeline<S: FrameSink>(
    timeline: &ComposedTimeline,
    sink: &mut S,
    cfg: SinkConfig,
) -> VidstitchResult<u64> {
    sink.begin(cfg)?;

    let mut frame_idx = 0u64;
    let mut buf = Vec::new();
    for clip in &timeline.clips {
        let first = frame_idx;
        let mut stream = FrameStream::open(
            &clip.source_path,
            timeline.baseline.dims,
            clip.plan.scale,
            clip.plan.resample,
        )?;
        while stream.next_frame(&mut buf)? {
            sink.push_frame(frame_idx, &buf)?;
            frame_idx += 1;
        }
        stream.finish()?;
        debug!(clip = %clip.display_name, frames = frame_idx - first, "streamed clip frames");
    }

    if frame_idx == 0 {
        return Err(VidstitchError::encode("no frames decoded for output"));
    }

    sink.end()?;
    Ok(frame_idx)
}

fn temp_audio_path(output_path: &Path) -> PathBuf {
    let stem = output_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    output_path.with_file_name(format!("{stem}.temp-audio.f32le"))
}

/// Removes a temporary file when dropped, so the write pass cannot leak it
/// on any exit path.
#[derive(Debug, Default)]
struct TempFileGuard {
    path: Option<PathBuf>,
}

impl TempFileGuard {
    fn track(&mut self, path: PathBuf) {
        self.path = Some(path);
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if let Some(path) = self.path.take()
            && let Err(e) = std::fs::remove_file(&path)
        {
            warn!(path = %path.display(), error = %e, "failed to remove temp audio file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_selection_fails_before_any_open() {
        let mut pipeline = Pipeline::new();
        let opts = PipelineOpts {
            video_paths: Vec::new(),
            music_path: PathBuf::from("music.mp3"),
            output_path: PathBuf::from("out.mp4"),
        };
        let err = pipeline.run(&opts).unwrap_err();
        assert!(matches!(err, VidstitchError::Config(_)));
        assert_eq!(pipeline.state(), PipelineState::Error);
        assert_eq!(pipeline.registry().opened(), 0);
    }

    #[test]
    fn temp_audio_path_sits_next_to_output() {
        let p = temp_audio_path(Path::new("/tmp/final/out.mp4"));
        assert_eq!(p, PathBuf::from("/tmp/final/out.temp-audio.f32le"));
    }

    #[test]
    fn temp_file_guard_removes_tracked_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scratch.f32le");
        std::fs::write(&path, b"pcm").unwrap();
        {
            let mut guard = TempFileGuard::default();
            guard.track(path.clone());
        }
        assert!(!path.exists());
    }

    #[test]
    fn untracked_guard_is_a_no_op() {
        let _guard = TempFileGuard::default();
    }
}

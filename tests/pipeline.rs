//! End-to-end pipeline tests against synthesized media.
//!
//! Every test is gated on the ffmpeg tool pair being available on PATH and
//! returns early otherwise.

use std::path::{Path, PathBuf};
use std::process::Command;

use vidstitch::compose::timeline::{concatenate, load_and_harmonize};
use vidstitch::media::clip::ClipRegistry;
use vidstitch::media::probe::probe_media;
use vidstitch::pipeline::{Pipeline, PipelineOpts, PipelineState, stream_timeline};
use vidstitch::{InMemorySink, SinkConfig};

fn ffmpeg_tools_available() -> bool {
    let ffmpeg_ok = Command::new("ffmpeg")
        .arg("-version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false);
    let ffprobe_ok = Command::new("ffprobe")
        .arg("-version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false);
    ffmpeg_ok && ffprobe_ok
}

fn scratch_dir(tag: &str) -> PathBuf {
    let root = std::env::temp_dir().join(format!(
        "vidstitch_{tag}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ));
    std::fs::create_dir_all(&root).unwrap();
    root
}

struct ClipSpec<'a> {
    name: &'a str,
    size: &'a str,
    rate: u32,
    duration_sec: f64,
    /// `None` synthesizes a video without an audio stream.
    tone_volume: Option<f64>,
}

fn synth_clip(root: &Path, spec: &ClipSpec<'_>) -> PathBuf {
    let path = root.join(spec.name);
    let mut cmd = Command::new("ffmpeg");
    cmd.args(["-v", "error", "-y", "-f", "lavfi", "-i"])
        .arg(format!("testsrc=size={}:rate={}", spec.size, spec.rate));
    if spec.tone_volume.is_some() {
        cmd.args(["-f", "lavfi", "-i", "sine=frequency=440:sample_rate=48000"]);
    }
    cmd.args(["-t", &spec.duration_sec.to_string()]);
    match spec.tone_volume {
        Some(volume) => {
            cmd.args(["-af", &format!("volume={volume}")]);
            cmd.args(["-c:a", "aac"]);
        }
        None => {
            cmd.arg("-an");
        }
    }
    cmd.args(["-pix_fmt", "yuv420p", "-c:v", "libx264"]).arg(&path);
    let status = cmd.status().unwrap();
    assert!(status.success(), "ffmpeg failed creating {}", spec.name);
    path
}

fn synth_tone(root: &Path, name: &str, duration_sec: f64) -> PathBuf {
    let path = root.join(name);
    let status = Command::new("ffmpeg")
        .args([
            "-v",
            "error",
            "-y",
            "-f",
            "lavfi",
            "-i",
            "sine=frequency=220:sample_rate=48000",
            "-t",
            &duration_sec.to_string(),
            "-c:a",
            "pcm_s16le",
        ])
        .arg(&path)
        .status()
        .unwrap();
    assert!(status.success(), "ffmpeg failed creating {name}");
    path
}

#[test]
fn composes_mixed_geometry_clips_with_background_music() {
    if !ffmpeg_tools_available() {
        return;
    }
    let root = scratch_dir("compose");

    // Second clip differs in both geometry and rate so the run has to
    // harmonize it, and is quieter so normalization has work to do.
    let a = synth_clip(
        &root,
        &ClipSpec {
            name: "a.mp4",
            size: "64x64",
            rate: 30,
            duration_sec: 1.0,
            tone_volume: Some(0.8),
        },
    );
    let b = synth_clip(
        &root,
        &ClipSpec {
            name: "b.mp4",
            size: "128x72",
            rate: 25,
            duration_sec: 1.0,
            tone_volume: Some(0.2),
        },
    );
    // Shorter than the video so the track must loop.
    let music = synth_tone(&root, "bed.wav", 0.7);
    let out = root.join("out.mp4");

    let mut pipeline = Pipeline::new();
    pipeline
        .run(&PipelineOpts {
            video_paths: vec![a, b],
            music_path: music,
            output_path: out.clone(),
        })
        .unwrap();

    assert_eq!(pipeline.state(), PipelineState::Done);
    assert_eq!(pipeline.registry().opened(), pipeline.registry().released());
    assert!(!root.join("out.temp-audio.f32le").exists());

    let info = probe_media(&out).unwrap();
    let video = info.video.expect("output has a video stream");
    assert_eq!(video.dims.width, 64);
    assert_eq!(video.dims.height, 64);
    assert!(info.has_audio, "output carries the mixed audio track");
    assert!(
        (1.5..=2.6).contains(&info.duration_sec),
        "expected ~2 s, got {}",
        info.duration_sec
    );

    std::fs::remove_dir_all(&root).ok();
}

#[test]
fn music_failure_is_downgraded_and_the_video_still_writes() {
    if !ffmpeg_tools_available() {
        return;
    }
    let root = scratch_dir("nomusic");

    let clip = synth_clip(
        &root,
        &ClipSpec {
            name: "a.mp4",
            size: "64x64",
            rate: 30,
            duration_sec: 1.0,
            tone_volume: Some(0.5),
        },
    );
    let out = root.join("out.mp4");

    let mut pipeline = Pipeline::new();
    pipeline
        .run(&PipelineOpts {
            video_paths: vec![clip],
            music_path: root.join("missing.mp3"),
            output_path: out.clone(),
        })
        .unwrap();

    assert_eq!(pipeline.state(), PipelineState::Done);
    let info = probe_media(&out).unwrap();
    assert!(info.has_audio, "original clip audio survives");

    std::fs::remove_dir_all(&root).ok();
}

#[test]
fn audioless_clips_get_the_music_as_sole_track() {
    if !ffmpeg_tools_available() {
        return;
    }
    let root = scratch_dir("solomusic");

    let clip = synth_clip(
        &root,
        &ClipSpec {
            name: "mute.mp4",
            size: "64x64",
            rate: 30,
            duration_sec: 1.0,
            tone_volume: None,
        },
    );
    let music = synth_tone(&root, "bed.wav", 2.0);
    let out = root.join("out.mp4");

    let mut pipeline = Pipeline::new();
    pipeline
        .run(&PipelineOpts {
            video_paths: vec![clip],
            music_path: music,
            output_path: out.clone(),
        })
        .unwrap();

    assert_eq!(pipeline.state(), PipelineState::Done);
    let info = probe_media(&out).unwrap();
    assert!(info.has_audio, "music becomes the only audio track");

    std::fs::remove_dir_all(&root).ok();
}

/// Remux a clip with the moov atom up front, then cut the file short. The
/// result still probes cleanly but fails partway through decoding.
fn truncate_after_remux(src: &Path, dst: &Path) {
    let status = Command::new("ffmpeg")
        .args(["-v", "error", "-y", "-i"])
        .arg(src)
        .args(["-c", "copy", "-movflags", "+faststart"])
        .arg(dst)
        .status()
        .unwrap();
    assert!(status.success(), "ffmpeg failed remuxing for truncation");

    let bytes = std::fs::read(dst).unwrap();
    std::fs::write(dst, &bytes[..bytes.len() / 2]).unwrap();
    probe_media(dst).expect("truncated clip must still probe");
}

#[test]
fn mid_write_failure_leaves_no_output_file_behind() {
    if !ffmpeg_tools_available() {
        return;
    }
    let root = scratch_dir("midwrite");

    let good = synth_clip(
        &root,
        &ClipSpec {
            name: "good.mp4",
            size: "64x64",
            rate: 30,
            duration_sec: 1.0,
            tone_volume: Some(0.5),
        },
    );
    // Audio-less so the failure surfaces in the write pass, not during the
    // audio analysis decode.
    let whole = synth_clip(
        &root,
        &ClipSpec {
            name: "whole.mp4",
            size: "64x64",
            rate: 30,
            duration_sec: 2.0,
            tone_volume: None,
        },
    );
    let cut = root.join("cut.mp4");
    truncate_after_remux(&whole, &cut);
    let music = synth_tone(&root, "bed.wav", 1.0);
    let out = root.join("out.mp4");

    let mut pipeline = Pipeline::new();
    let err = pipeline
        .run(&PipelineOpts {
            video_paths: vec![good, cut],
            music_path: music,
            output_path: out.clone(),
        })
        .unwrap_err();

    assert!(err.to_string().contains("cut.mp4"), "error names the file: {err}");
    assert_eq!(pipeline.state(), PipelineState::Error);
    assert_eq!(pipeline.registry().opened(), pipeline.registry().released());
    assert!(!out.exists(), "partial output must be removed on failure");
    assert!(!root.join("out.temp-audio.f32le").exists());

    std::fs::remove_dir_all(&root).ok();
}

#[test]
fn timeline_streams_into_any_sink_in_frame_order() {
    if !ffmpeg_tools_available() {
        return;
    }
    let root = scratch_dir("sink");

    let clip = synth_clip(
        &root,
        &ClipSpec {
            name: "a.mp4",
            size: "64x64",
            rate: 8,
            duration_sec: 1.0,
            tone_volume: None,
        },
    );

    let mut registry = ClipRegistry::new();
    let pass = load_and_harmonize(&mut registry, &[clip], 0.0).unwrap();
    let timeline = concatenate(pass).unwrap();

    let mut sink = InMemorySink::new();
    let cfg = SinkConfig {
        dims: timeline.baseline.dims,
        fps: timeline.output_fps(),
        audio: None,
    };
    let frames = stream_timeline(&timeline, &mut sink, cfg).unwrap();

    assert_eq!(frames as usize, sink.frames().len());
    assert!(frames >= 7, "expected about 8 frames, got {frames}");
    let expected_len = timeline.baseline.dims.rgba_frame_len();
    for (pos, (idx, data)) in sink.frames().iter().enumerate() {
        assert_eq!(*idx, pos as u64, "indices are sequential from zero");
        assert_eq!(data.len(), expected_len);
    }
    assert_eq!(sink.config().unwrap().dims, timeline.baseline.dims);

    registry.release_all();
    std::fs::remove_dir_all(&root).ok();
}

#[test]
fn corrupt_clip_aborts_but_every_resource_is_released() {
    if !ffmpeg_tools_available() {
        return;
    }
    let root = scratch_dir("corrupt");

    let good = synth_clip(
        &root,
        &ClipSpec {
            name: "good.mp4",
            size: "64x64",
            rate: 30,
            duration_sec: 1.0,
            tone_volume: Some(0.5),
        },
    );
    let bad = root.join("bad.mp4");
    std::fs::write(&bad, b"this is not a video").unwrap();
    let music = synth_tone(&root, "bed.wav", 1.0);
    let out = root.join("out.mp4");

    let mut pipeline = Pipeline::new();
    let err = pipeline
        .run(&PipelineOpts {
            video_paths: vec![good, bad],
            music_path: music,
            output_path: out.clone(),
        })
        .unwrap_err();

    assert!(err.to_string().contains("bad.mp4"), "error names the file: {err}");
    assert_eq!(pipeline.state(), PipelineState::Error);
    assert_eq!(pipeline.registry().opened(), pipeline.registry().released());
    assert!(!out.exists(), "no output file on a failed run");

    std::fs::remove_dir_all(&root).ok();
}

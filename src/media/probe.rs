use std::path::{Path, PathBuf};

use crate::foundation::core::{Dimensions, Fps};
use crate::foundation::error::{VidstitchError, VidstitchResult};

/// Properties of the video stream of a probed source, when one exists.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VideoStreamInfo {
    /// Frame dimensions in pixels.
    pub dims: Dimensions,
    /// Declared frame rate, when ffprobe reports a usable one.
    pub fps: Option<Fps>,
}

/// Basic metadata about one decodable media source.
#[derive(Clone, Debug)]
pub struct MediaInfo {
    /// Absolute or caller-relative source path used for decoding.
    pub source_path: PathBuf,
    /// Container duration in seconds.
    pub duration_sec: f64,
    /// Video stream properties. `None` for audio-only sources.
    pub video: Option<VideoStreamInfo>,
    /// Whether ffprobe detected at least one audio stream.
    pub has_audio: bool,
}

impl MediaInfo {
    /// File name used in user-facing error messages.
    pub fn display_name(&self) -> String {
        self.source_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.source_path.display().to_string())
    }
}

#[derive(serde::Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    duration: Option<String>,
}

#[derive(serde::Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

#[derive(serde::Deserialize)]
struct ProbeOut {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

/// Probe source metadata through `ffprobe`.
///
/// Fails with a file-identifying [`VidstitchError::Media`] when the path is
/// missing, unreadable, or not decodable.
pub fn probe_media(source_path: &Path) -> VidstitchResult<MediaInfo> {
    let out = std::process::Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(source_path)
        .output()
        .map_err(|e| VidstitchError::media(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(VidstitchError::media(format!(
            "ffprobe failed for '{}': {}",
            source_path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    parse_probe_json(source_path, &out.stdout)
}

/// Parse raw ffprobe JSON into [`MediaInfo`]. Split out for unit testing.
pub(crate) fn parse_probe_json(source_path: &Path, json: &[u8]) -> VidstitchResult<MediaInfo> {
    let parsed: ProbeOut = serde_json::from_slice(json).map_err(|e| {
        VidstitchError::media(format!(
            "ffprobe json parse failed for '{}': {e}",
            source_path.display()
        ))
    })?;

    let video_stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"));
    let has_audio = parsed
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    let video = match video_stream {
        Some(s) => {
            let width = s.width.ok_or_else(|| {
                VidstitchError::media(format!(
                    "missing video width for '{}'",
                    source_path.display()
                ))
            })?;
            let height = s.height.ok_or_else(|| {
                VidstitchError::media(format!(
                    "missing video height for '{}'",
                    source_path.display()
                ))
            })?;
            Some(VideoStreamInfo {
                dims: Dimensions { width, height },
                fps: s.r_frame_rate.as_deref().and_then(parse_rate),
            })
        }
        None => None,
    };

    let duration_sec = parsed
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .or_else(|| {
            parsed
                .streams
                .iter()
                .find_map(|s| s.duration.as_deref())
        })
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);
    if !duration_sec.is_finite() || duration_sec < 0.0 {
        return Err(VidstitchError::media(format!(
            "invalid duration reported for '{}'",
            source_path.display()
        )));
    }

    Ok(MediaInfo {
        source_path: source_path.to_path_buf(),
        duration_sec,
        video,
        has_audio,
    })
}

/// Parse an ffprobe `r_frame_rate` value such as `30/1` or `30000/1001`.
///
/// ffprobe reports `0/0` for streams without a meaningful rate; that maps to
/// `None` rather than an error.
fn parse_rate(raw: &str) -> Option<Fps> {
    let (num, den) = raw.split_once('/')?;
    let num: u32 = num.trim().parse().ok()?;
    let den: u32 = den.trim().parse().ok()?;
    Fps::new(num, den).ok()
}

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};

use tracing::warn;

use crate::encode::sink::{FrameSink, SinkConfig};
use crate::foundation::error::{VidstitchError, VidstitchResult};

/// Options for [`FfmpegSink`] MP4 output.
#[derive(Clone, Debug)]
pub struct FfmpegSinkOpts {
    /// Output MP4 file path.
    pub out_path: PathBuf,
    /// Overwrite the output file if it already exists.
    pub overwrite: bool,
}

impl FfmpegSinkOpts {
    /// Create options for outputting an MP4 to `out_path`.
    pub fn new(out_path: impl Into<PathBuf>) -> Self {
        Self {
            out_path: out_path.into(),
            overwrite: true,
        }
    }
}

/// Sink that spawns the system `ffmpeg` and streams raw RGBA frames to its
/// stdin, encoding `libx264` video and `aac` audio.
///
/// Audio is optional and provided through `SinkConfig.audio` as a raw f32le
/// PCM file; ffmpeg muxes it in one pass with `-shortest`.
pub struct FfmpegSink {
    opts: FfmpegSinkOpts,

    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<std::thread::JoinHandle<std::io::Result<Vec<u8>>>>,

    frame_len: usize,
    last_idx: Option<u64>,
}

impl FfmpegSink {
    /// Create a new sink that streams into `ffmpeg`.
    pub fn new(opts: FfmpegSinkOpts) -> Self {
        Self {
            opts,
            child: None,
            stdin: None,
            stderr_drain: None,
            frame_len: 0,
            last_idx: None,
        }
    }

    /// Abort a failed write: reap the encoder process, join the stderr
    /// drain, and remove the partial output file. Returns whatever the
    /// encoder wrote to stderr, when it captured anything.
    ///
    /// The output file is only touched when an encoder was actually
    /// spawned; a `begin` that failed up front leaves any pre-existing
    /// file alone.
    pub fn abort(&mut self) -> Option<String> {
        drop(self.stdin.take());
        let Some(mut child) = self.child.take() else {
            return None;
        };
        let _ = child.kill();
        let _ = child.wait();

        let mut stderr_text = None;
        if let Some(handle) = self.stderr_drain.take()
            && let Ok(Ok(bytes)) = handle.join()
        {
            let text = String::from_utf8_lossy(&bytes).trim().to_string();
            if !text.is_empty() {
                stderr_text = Some(text);
            }
        }

        remove_partial_output(&self.opts.out_path);
        self.frame_len = 0;
        stderr_text
    }
}

fn remove_partial_output(path: &Path) {
    if path.exists()
        && let Err(e) = std::fs::remove_file(path)
    {
        warn!(path = %path.display(), error = %e, "failed to remove partial output file");
    }
}

impl FrameSink for FfmpegSink {
    fn begin(&mut self, cfg: SinkConfig) -> VidstitchResult<()> {
        if cfg.dims.width == 0 || cfg.dims.height == 0 {
            return Err(VidstitchError::encode(
                "output width/height must be non-zero",
            ));
        }
        if !cfg.dims.width.is_multiple_of(2) || !cfg.dims.height.is_multiple_of(2) {
            return Err(VidstitchError::encode(
                "output width/height must be even (required for yuv420p mp4 output)",
            ));
        }

        ensure_parent_dir(&self.opts.out_path)?;
        if !self.opts.overwrite && self.opts.out_path.exists() {
            return Err(VidstitchError::encode(format!(
                "output file '{}' already exists",
                self.opts.out_path.display()
            )));
        }

        if !is_ffmpeg_on_path() {
            return Err(VidstitchError::encode(
                "ffmpeg is required for MP4 encoding, but was not found on PATH",
            ));
        }

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        if self.opts.overwrite {
            cmd.arg("-y");
        } else {
            cmd.arg("-n");
        }

        // Input: raw opaque RGBA8 frames at the harmonized geometry/rate.
        cmd.args([
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &format!("{}x{}", cfg.dims.width, cfg.dims.height),
            "-r",
            &cfg.fps.as_rate_arg(),
            "-i",
            "pipe:0",
        ]);

        if let Some(audio) = cfg.audio.as_ref() {
            if audio.sample_rate == 0 {
                return Err(VidstitchError::encode(
                    "audio sample_rate must be non-zero when audio is enabled",
                ));
            }
            if audio.channels == 0 {
                return Err(VidstitchError::encode(
                    "audio channels must be non-zero when audio is enabled",
                ));
            }
            cmd.args([
                "-f",
                "f32le",
                "-ar",
                &audio.sample_rate.to_string(),
                "-ac",
                &audio.channels.to_string(),
                "-i",
            ])
            .arg(&audio.path)
            .args([
                "-c:v",
                "libx264",
                "-pix_fmt",
                "yuv420p",
                "-c:a",
                "aac",
                "-shortest",
                "-movflags",
                "+faststart",
            ]);
        } else {
            // Output: h264 + yuv420p for broad compatibility.
            cmd.args([
                "-an",
                "-c:v",
                "libx264",
                "-pix_fmt",
                "yuv420p",
                "-movflags",
                "+faststart",
            ]);
        }
        cmd.arg(&self.opts.out_path);

        let mut child = cmd.spawn().map_err(|e| {
            VidstitchError::encode(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| VidstitchError::encode("failed to open ffmpeg stdin (unexpected)"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| VidstitchError::encode("failed to open ffmpeg stderr (unexpected)"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok(stderr_bytes)
        });

        self.frame_len = cfg.dims.rgba_frame_len();
        self.child = Some(child);
        self.stdin = Some(stdin);
        self.stderr_drain = Some(stderr_drain);
        self.last_idx = None;
        Ok(())
    }

    fn push_frame(&mut self, idx: u64, data: &[u8]) -> VidstitchResult<()> {
        if self.frame_len == 0 {
            return Err(VidstitchError::encode("ffmpeg sink not started"));
        }
        if let Some(last) = self.last_idx
            && idx <= last
        {
            return Err(VidstitchError::encode(
                "ffmpeg sink received out-of-order frame index",
            ));
        }
        self.last_idx = Some(idx);

        if data.len() != self.frame_len {
            return Err(VidstitchError::encode(format!(
                "frame byte length mismatch: got {}, expected {}",
                data.len(),
                self.frame_len
            )));
        }

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(VidstitchError::encode("ffmpeg sink is already finalized"));
        };

        use std::io::Write as _;
        stdin.write_all(data).map_err(|e| {
            VidstitchError::encode(format!("failed to write frame to ffmpeg stdin: {e}"))
        })?;
        Ok(())
    }

    fn end(&mut self) -> VidstitchResult<()> {
        drop(self.stdin.take());
        let mut child = self
            .child
            .take()
            .ok_or_else(|| VidstitchError::encode("ffmpeg sink not started"))?;

        let status = child.wait().map_err(|e| {
            VidstitchError::encode(format!("failed to wait for ffmpeg to finish: {e}"))
        })?;
        let stderr_bytes = match self.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| VidstitchError::encode("ffmpeg stderr drain thread panicked"))?
                .map_err(|e| VidstitchError::encode(format!("ffmpeg stderr read failed: {e}")))?,
            None => Vec::new(),
        };

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            remove_partial_output(&self.opts.out_path);
            return Err(VidstitchError::encode(format!(
                "ffmpeg exited with status {}: {}",
                status,
                stderr.trim()
            )));
        }

        Ok(())
    }
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> VidstitchResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

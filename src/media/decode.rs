use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};

use crate::foundation::core::{Dimensions, Fps};
use crate::foundation::error::{VidstitchError, VidstitchResult};

/// Internal mixing sample rate used across decode/normalize/mix/encode.
pub const MIX_SAMPLE_RATE: u32 = 48_000;

/// Internal mixing channel count (stereo).
pub const MIX_CHANNELS: u16 = 2;

/// Decoded interleaved floating-point PCM.
#[derive(Clone, Debug)]
pub struct AudioPcm {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: u16,
    /// Interleaved `f32` PCM samples.
    pub interleaved_f32: Vec<f32>,
}

impl AudioPcm {
    /// Number of sample frames (one frame = one sample per channel).
    pub fn frames(&self) -> u64 {
        (self.interleaved_f32.len() / usize::from(self.channels)) as u64
    }

    /// Duration covered by the buffer in seconds.
    pub fn duration_sec(&self) -> f64 {
        self.frames() as f64 / f64::from(self.sample_rate)
    }
}

/// Decode the full audio track of a media source to stereo interleaved `f32`
/// PCM at `sample_rate`.
///
/// Video sources without an audio stream decode to an empty buffer rather
/// than an error; every other decode failure is a file-identifying
/// [`VidstitchError::Media`].
pub fn decode_audio_f32_stereo(path: &Path, sample_rate: u32) -> VidstitchResult<AudioPcm> {
    let out = Command::new("ffmpeg")
        .args(["-v", "error", "-i"])
        .arg(path)
        .args([
            "-vn",
            "-f",
            "f32le",
            "-acodec",
            "pcm_f32le",
            "-ac",
            &MIX_CHANNELS.to_string(),
            "-ar",
            &sample_rate.to_string(),
            "pipe:1",
        ])
        .output()
        .map_err(|e| VidstitchError::media(format!("failed to run ffmpeg for audio decode: {e}")))?;

    if !out.status.success() {
        let msg = String::from_utf8_lossy(&out.stderr);
        // ffmpeg reports the absence of an audio stream as an error. Treat it
        // as empty PCM so video-only clips flow through normalization.
        if msg.contains("Stream specifier")
            || msg.contains("matches no streams")
            || msg.contains("does not contain any stream")
        {
            return Ok(AudioPcm {
                sample_rate,
                channels: MIX_CHANNELS,
                interleaved_f32: Vec::new(),
            });
        }
        return Err(VidstitchError::media(format!(
            "ffmpeg audio decode failed for '{}': {}",
            path.display(),
            msg.trim()
        )));
    }

    if !out.stdout.len().is_multiple_of(4) {
        return Err(VidstitchError::media(format!(
            "decoded audio for '{}' is not aligned to f32 samples",
            path.display()
        )));
    }
    let mut pcm = Vec::<f32>::with_capacity(out.stdout.len() / 4);
    for chunk in out.stdout.chunks_exact(4) {
        pcm.push(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
    }

    Ok(AudioPcm {
        sample_rate,
        channels: MIX_CHANNELS,
        interleaved_f32: pcm,
    })
}

/// Incremental rawvideo RGBA8 reader over a spawned `ffmpeg` decode.
///
/// The decode applies the harmonization plan on the way out: an optional
/// rescale to the baseline dimensions and an optional resample to the
/// baseline frame rate. Frames are pulled one at a time so a whole clip never
/// has to fit in memory.
pub struct FrameStream {
    child: Child,
    stdout: Option<ChildStdout>,
    stderr_drain: Option<std::thread::JoinHandle<std::io::Result<Vec<u8>>>>,
    frame_len: usize,
    source_path: PathBuf,
    finished: bool,
}

impl FrameStream {
    /// Spawn the decoder for `source_path`, producing frames at
    /// `output_dims` (scaled when `scale` is set) and at `resample` when the
    /// clip's native rate differs from the baseline.
    pub fn open(
        source_path: &Path,
        output_dims: Dimensions,
        scale: Option<Dimensions>,
        resample: Option<Fps>,
    ) -> VidstitchResult<Self> {
        let frame_len = output_dims.rgba_frame_len();
        if frame_len == 0 {
            return Err(VidstitchError::media(format!(
                "invalid zero-sized frame dimensions for '{}'",
                source_path.display()
            )));
        }

        let mut cmd = Command::new("ffmpeg");
        cmd.args(["-v", "error", "-i"])
            .arg(source_path)
            .arg("-an")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(dims) = scale {
            // Stretch to the exact baseline geometry; aspect is not preserved.
            cmd.args(["-vf", &format!("scale={}:{}", dims.width, dims.height)]);
        }
        if let Some(fps) = resample {
            cmd.args(["-r", &fps.as_rate_arg()]);
        }
        cmd.args(["-f", "rawvideo", "-pix_fmt", "rgba", "pipe:1"]);

        let mut child = cmd.spawn().map_err(|e| {
            VidstitchError::media(format!(
                "failed to spawn ffmpeg for '{}': {e}",
                source_path.display()
            ))
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            VidstitchError::media("failed to open ffmpeg stdout (unexpected)")
        })?;
        let mut stderr = child.stderr.take().ok_or_else(|| {
            VidstitchError::media("failed to open ffmpeg stderr (unexpected)")
        })?;
        let stderr_drain = std::thread::spawn(move || {
            let mut bytes = Vec::new();
            stderr.read_to_end(&mut bytes)?;
            Ok(bytes)
        });

        Ok(Self {
            child,
            stdout: Some(stdout),
            stderr_drain: Some(stderr_drain),
            frame_len,
            source_path: source_path.to_path_buf(),
            finished: false,
        })
    }

    /// Byte length of one decoded frame.
    pub fn frame_len(&self) -> usize {
        self.frame_len
    }

    /// Read the next frame into `buf`, resizing it to the frame length.
    ///
    /// Returns `Ok(false)` on clean end of stream. A stream that ends in the
    /// middle of a frame is a decode error.
    pub fn next_frame(&mut self, buf: &mut Vec<u8>) -> VidstitchResult<bool> {
        let Some(stdout) = self.stdout.as_mut() else {
            return Err(VidstitchError::media(format!(
                "frame stream for '{}' is already finished",
                self.source_path.display()
            )));
        };
        buf.resize(self.frame_len, 0);
        let mut filled = 0usize;
        while filled < self.frame_len {
            let n = stdout.read(&mut buf[filled..]).map_err(|e| {
                VidstitchError::media(format!(
                    "ffmpeg frame read failed for '{}': {e}",
                    self.source_path.display()
                ))
            })?;
            if n == 0 {
                if filled == 0 {
                    return Ok(false);
                }
                return Err(VidstitchError::media(format!(
                    "truncated frame from '{}' ({} of {} bytes)",
                    self.source_path.display(),
                    filled,
                    self.frame_len
                )));
            }
            filled += n;
        }
        Ok(true)
    }

    /// Wait for the decoder to exit and surface any decode error.
    pub fn finish(mut self) -> VidstitchResult<()> {
        self.finished = true;
        drop(self.stdout.take());
        let status = self.child.wait().map_err(|e| {
            VidstitchError::media(format!(
                "failed to wait for ffmpeg decoding '{}': {e}",
                self.source_path.display()
            ))
        })?;
        let stderr_bytes = match self.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| VidstitchError::media("ffmpeg stderr drain thread panicked"))?
                .map_err(|e| VidstitchError::media(format!("ffmpeg stderr read failed: {e}")))?,
            None => Vec::new(),
        };
        if !status.success() {
            return Err(VidstitchError::media(format!(
                "ffmpeg decode failed for '{}': {}",
                self.source_path.display(),
                String::from_utf8_lossy(&stderr_bytes).trim()
            )));
        }
        Ok(())
    }
}

/// Reap the decoder if the stream is dropped before [`FrameStream::finish`]
/// ran, so an abandoned decode never leaves a zombie child behind.
impl Drop for FrameStream {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        drop(self.stdout.take());
        let _ = self.child.kill();
        let _ = self.child.wait();
        if let Some(handle) = self.stderr_drain.take() {
            let _ = handle.join();
        }
    }
}

// The decode entry points shell out to `ffmpeg` and are exercised by the
// ffmpeg-gated integration tests in `tests/pipeline.rs`.

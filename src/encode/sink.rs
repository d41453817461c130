use std::path::PathBuf;

use crate::foundation::core::{Dimensions, Fps};
use crate::foundation::error::VidstitchResult;

/// Configuration provided to a [`FrameSink`] at the start of a write.
#[derive(Debug, Clone)]
pub struct SinkConfig {
    /// Output frame dimensions.
    pub dims: Dimensions,
    /// Output frames-per-second.
    pub fps: Fps,
    /// Optional external raw PCM audio input.
    pub audio: Option<AudioInputConfig>,
}

/// Raw PCM audio input for sinks that support audio muxing.
#[derive(Debug, Clone)]
pub struct AudioInputConfig {
    /// Path to interleaved `f32le` PCM data.
    pub path: PathBuf,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: u16,
}

/// Sink contract for consuming frames in timeline order.
///
/// Ordering contract: `push_frame` is called with strictly increasing frame
/// indices across the whole composed timeline.
pub trait FrameSink {
    /// Called once before any frames are pushed.
    fn begin(&mut self, cfg: SinkConfig) -> VidstitchResult<()>;
    /// Push one raw RGBA8 frame in strictly increasing timeline order.
    fn push_frame(&mut self, idx: u64, data: &[u8]) -> VidstitchResult<()>;
    /// Called once after the last frame is pushed.
    fn end(&mut self) -> VidstitchResult<()>;
}

/// In-memory sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    frames: Vec<(u64, Vec<u8>)>,
}

impl InMemorySink {
    /// Create a new in-memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the configuration captured in `begin`, if any.
    pub fn config(&self) -> Option<SinkConfig> {
        self.cfg.clone()
    }

    /// Borrow the captured frames.
    pub fn frames(&self) -> &[(u64, Vec<u8>)] {
        &self.frames
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> VidstitchResult<()> {
        self.cfg = Some(cfg);
        self.frames.clear();
        Ok(())
    }

    fn push_frame(&mut self, idx: u64, data: &[u8]) -> VidstitchResult<()> {
        self.frames.push((idx, data.to_vec()));
        Ok(())
    }

    fn end(&mut self) -> VidstitchResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pump<S: FrameSink>(sink: &mut S, cfg: SinkConfig, frames: &[&[u8]]) -> VidstitchResult<()> {
        sink.begin(cfg)?;
        for (idx, data) in frames.iter().enumerate() {
            sink.push_frame(idx as u64, data)?;
        }
        sink.end()
    }

    #[test]
    fn in_memory_sink_captures_config_and_frames_in_order() {
        let mut sink = InMemorySink::new();
        let cfg = SinkConfig {
            dims: Dimensions {
                width: 2,
                height: 2,
            },
            fps: Fps::default_output(),
            audio: None,
        };
        pump(&mut sink, cfg, &[&[1u8; 16], &[2u8; 16], &[3u8; 16]]).unwrap();

        let captured = sink.config().unwrap();
        assert_eq!(captured.dims.rgba_frame_len(), 16);
        assert!(captured.audio.is_none());

        let indices: Vec<u64> = sink.frames().iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(sink.frames()[2].1, vec![3u8; 16]);
    }

    #[test]
    fn begin_discards_frames_from_a_previous_run() {
        let mut sink = InMemorySink::new();
        let cfg = SinkConfig {
            dims: Dimensions {
                width: 2,
                height: 2,
            },
            fps: Fps::default_output(),
            audio: None,
        };
        pump(&mut sink, cfg.clone(), &[&[1u8; 16]]).unwrap();
        pump(&mut sink, cfg, &[&[2u8; 16]]).unwrap();
        assert_eq!(sink.frames().len(), 1);
        assert_eq!(sink.frames()[0].1, vec![2u8; 16]);
    }
}

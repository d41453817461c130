use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::foundation::error::VidstitchResult;
use crate::media::decode::{AudioPcm, MIX_CHANNELS, MIX_SAMPLE_RATE, decode_audio_f32_stereo};
use crate::media::probe::{MediaInfo, probe_media};

/// Opaque handle identifying one entry in the registry's release list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClipHandle(usize);

#[cfg(test)]
impl ClipHandle {
    pub(crate) fn from_index(idx: usize) -> Self {
        ClipHandle(idx)
    }
}

/// An open media resource: probed metadata plus a lazily decoded audio track.
///
/// Transforms (normalization, harmonization) derive new state for the same
/// logical handle; the registry entry stays the single release point.
#[derive(Clone, Debug)]
pub struct MediaClip {
    /// Registry entry backing this clip.
    pub handle: ClipHandle,
    /// Probed source metadata.
    pub info: MediaInfo,
    audio: Option<AudioPcm>,
}

impl MediaClip {
    /// Decode and cache the clip's full audio track.
    ///
    /// Sources without an audio stream yield an empty buffer. Used for bulk
    /// peak analysis, not streaming playback.
    pub fn audio_samples(&mut self) -> VidstitchResult<&AudioPcm> {
        match &mut self.audio {
            Some(pcm) => Ok(pcm),
            slot @ None => {
                let pcm = if self.info.has_audio {
                    decode_audio_f32_stereo(&self.info.source_path, MIX_SAMPLE_RATE)?
                } else {
                    AudioPcm {
                        sample_rate: MIX_SAMPLE_RATE,
                        channels: MIX_CHANNELS,
                        interleaved_f32: Vec::new(),
                    }
                };
                Ok(slot.insert(pcm))
            }
        }
    }

    /// Take ownership of the cached audio track, if one was decoded.
    pub fn take_audio(&mut self) -> Option<AudioPcm> {
        self.audio.take()
    }
}

#[derive(Debug)]
struct Entry {
    path: PathBuf,
    released: bool,
}

/// Release list for every media resource the pipeline opens.
///
/// Each successful [`ClipRegistry::open`] appends exactly one entry; the
/// orchestrator's cleanup phase drains the list with [`release_all`] on every
/// exit path. Releasing an already-released handle is swallowed (and logged)
/// so one bad entry never prevents releasing the rest.
///
/// [`release_all`]: ClipRegistry::release_all
#[derive(Debug, Default)]
pub struct ClipRegistry {
    entries: Vec<Entry>,
}

impl ClipRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Probe and open a media source, tracking it for release.
    ///
    /// A failed probe acquires nothing and registers nothing.
    pub fn open(&mut self, path: &Path) -> VidstitchResult<MediaClip> {
        let info = probe_media(path)?;
        let handle = ClipHandle(self.entries.len());
        self.entries.push(Entry {
            path: path.to_path_buf(),
            released: false,
        });
        debug!(path = %path.display(), ?handle, "opened media resource");
        Ok(MediaClip {
            handle,
            info,
            audio: None,
        })
    }

    /// Release one clip. Returns `true` when this call performed the release,
    /// `false` when the handle was already released.
    pub fn release(&mut self, handle: ClipHandle) -> bool {
        match self.entries.get_mut(handle.0) {
            Some(entry) if !entry.released => {
                entry.released = true;
                debug!(path = %entry.path.display(), ?handle, "released media resource");
                true
            }
            Some(entry) => {
                warn!(path = %entry.path.display(), ?handle, "double release ignored");
                false
            }
            None => {
                warn!(?handle, "release of unknown handle ignored");
                false
            }
        }
    }

    /// Release every remaining entry, returning how many were newly released.
    pub fn release_all(&mut self) -> usize {
        let mut count = 0usize;
        for i in 0..self.entries.len() {
            if self.release(ClipHandle(i)) {
                count += 1;
            }
        }
        count
    }

    /// Total number of resources ever opened.
    pub fn opened(&self) -> usize {
        self.entries.len()
    }

    /// Number of resources released so far.
    pub fn released(&self) -> usize {
        self.entries.iter().filter(|e| e.released).count()
    }
}

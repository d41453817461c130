use crate::foundation::core::{Dimensions, Fps};
use crate::foundation::error::{VidstitchError, VidstitchResult};
use crate::media::probe::MediaInfo;

/// Harmonization target fixed by the first clip processed. Immutable for the
/// rest of the run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Baseline {
    /// Output frame dimensions.
    pub dims: Dimensions,
    /// Output frame rate, when the first clip declared one. Defaulted at
    /// validation time otherwise.
    pub fps: Option<Fps>,
}

impl Baseline {
    /// Derive the baseline from the first clip's probed metadata.
    ///
    /// Odd dimensions are rounded down to the nearest even value, since
    /// yuv420p mp4 output requires even geometry. A first clip with odd
    /// dimensions is then scaled like any other outlier.
    pub fn from_first(info: &MediaInfo) -> VidstitchResult<Self> {
        let video = info.video.as_ref().ok_or_else(|| {
            VidstitchError::media(format!(
                "'{}' has no video stream",
                info.display_name()
            ))
        })?;
        Ok(Self {
            dims: Dimensions {
                width: floor_to_even(video.dims.width),
                height: floor_to_even(video.dims.height),
            },
            fps: video.fps,
        })
    }
}

fn floor_to_even(value: u32) -> u32 {
    (value - value % 2).max(2)
}

/// Per-clip transform bringing an outlier to the baseline. Dimension fix is
/// applied before the frame-rate fix.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HarmonizePlan {
    /// Rescale (stretch, not crop) to these dimensions.
    pub scale: Option<Dimensions>,
    /// Resample to this frame rate.
    pub resample: Option<Fps>,
}

impl HarmonizePlan {
    /// Whether the clip already conforms to the baseline.
    pub fn is_noop(&self) -> bool {
        self.scale.is_none() && self.resample.is_none()
    }
}

/// Compute the transform plan for one clip against the baseline.
///
/// A clip whose rate is unknown is not resampled; the encoder consumes its
/// frames at the baseline rate.
pub fn plan_for(baseline: &Baseline, info: &MediaInfo) -> VidstitchResult<HarmonizePlan> {
    let video = info.video.as_ref().ok_or_else(|| {
        VidstitchError::media(format!(
            "'{}' has no video stream",
            info.display_name()
        ))
    })?;

    let scale = (video.dims != baseline.dims).then_some(baseline.dims);
    let resample = match (video.fps, baseline.fps) {
        (Some(clip_fps), Some(base_fps)) if clip_fps != base_fps => Some(base_fps),
        _ => None,
    };
    Ok(HarmonizePlan { scale, resample })
}

use crate::foundation::error::{VidstitchError, VidstitchResult};

/// Rational frames-per-second value (for example 30000/1001 for NTSC).
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    /// Numerator. Must be > 0.
    pub num: u32,
    /// Denominator. Must be > 0.
    pub den: u32,
}

impl Fps {
    /// Build a validated rational frame rate.
    pub fn new(num: u32, den: u32) -> VidstitchResult<Self> {
        if num == 0 {
            return Err(VidstitchError::media("Fps num must be > 0"));
        }
        if den == 0 {
            return Err(VidstitchError::media("Fps den must be > 0"));
        }
        Ok(Self { num, den })
    }

    /// The default frame rate applied when a timeline never learned one.
    pub fn default_output() -> Self {
        Self { num: 30, den: 1 }
    }

    /// Frame rate as a floating-point value.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    /// Duration of a single frame in seconds.
    pub fn frame_duration_secs(self) -> f64 {
        f64::from(self.den) / f64::from(self.num)
    }

    /// Number of whole frames covering `secs`, rounded to nearest.
    pub fn secs_to_frames_round(self, secs: f64) -> u64 {
        (secs * self.as_f64()).round().max(0.0) as u64
    }

    /// Render as an ffmpeg `num/den` rate argument.
    pub fn as_rate_arg(self) -> String {
        format!("{}/{}", self.num, self.den)
    }
}

/// Pixel dimensions of a video stream or output canvas.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Byte length of one raw RGBA8 frame at these dimensions.
    pub fn rgba_frame_len(self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

//! Audio pipeline: peak normalization, background-track preparation, and the
//! interleaved-PCM helpers both are built on.

pub mod background;
pub mod normalize;
pub mod pcm;

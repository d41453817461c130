/// Convenience result type used across vidstitch.
pub type VidstitchResult<T> = Result<T, VidstitchError>;

/// Top-level error taxonomy used by pipeline APIs.
///
/// The fatality rules live with the orchestrator, not here: every variant is
/// fatal when it reaches the pipeline boundary except errors raised inside
/// the background mixer, which the orchestrator downgrades to a warning.
#[derive(thiserror::Error, Debug)]
pub enum VidstitchError {
    /// Invalid directories, empty listings, or bad output paths. Raised
    /// before any media resource is opened.
    #[error("configuration error: {0}")]
    Config(String),

    /// Open/probe/decode failures for a specific media file, including
    /// zero-duration clips.
    #[error("media error: {0}")]
    Media(String),

    /// Failures assembling the composed timeline (harmonization and
    /// concatenation).
    #[error("composition error: {0}")]
    Compose(String),

    /// Failures while encoding or muxing the output file.
    #[error("encode error: {0}")]
    Encode(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl VidstitchError {
    /// Build a [`VidstitchError::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Build a [`VidstitchError::Media`] value.
    pub fn media(msg: impl Into<String>) -> Self {
        Self::Media(msg.into())
    }

    /// Build a [`VidstitchError::Compose`] value.
    pub fn compose(msg: impl Into<String>) -> Self {
        Self::Compose(msg.into())
    }

    /// Build a [`VidstitchError::Encode`] value.
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }
}

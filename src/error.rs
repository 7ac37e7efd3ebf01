/// Convenience result type used across polytrace.
pub type TraceResult<T> = Result<T, TraceError>;

/// Error taxonomy for the search engine and its collaborators.
#[derive(thiserror::Error, Debug)]
pub enum TraceError {
    /// A candidate shape covers no pixel of the canvas.
    #[error("invalid shape: no canvas pixel is covered")]
    InvalidShape,

    /// A scored improvement is larger than the error that currently exists.
    #[error("consistency violation: improvement {improvement} exceeds remaining error {available}")]
    ConsistencyViolation { improvement: f64, available: f64 },

    /// Rejected configuration, raised before any search starts.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Two buffers that must line up pixel for pixel do not.
    #[error("dimension mismatch: expected {expected:?}, got {actual:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    /// Malformed raw pixel data.
    #[error("invalid buffer: {0}")]
    InvalidBuffer(String),

    /// Errors when serializing or deserializing settings and primitives.
    #[error("serialization error: {0}")]
    Serde(String),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Wrapped lower-level error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TraceError {
    /// Build a [`TraceError::Configuration`] value.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Build a [`TraceError::InvalidBuffer`] value.
    pub fn invalid_buffer(msg: impl Into<String>) -> Self {
        Self::InvalidBuffer(msg.into())
    }

    /// Build a [`TraceError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

impl From<serde_json::Error> for TraceError {
    fn from(err: serde_json::Error) -> Self {
        Self::serde(err.to_string())
    }
}

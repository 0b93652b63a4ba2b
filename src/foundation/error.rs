/// Convenience result type used across reelsmith.
pub type ReelsmithResult<T> = Result<T, ReelsmithError>;

/// Top-level error taxonomy used by the export pipeline.
#[derive(thiserror::Error, Debug)]
pub enum ReelsmithError {
    /// Invalid user-provided project, settings or configuration data.
    #[error("validation error: {0}")]
    Validation(String),

    /// Failures while fetching or decoding a single media asset.
    #[error("asset error: {0}")]
    Asset(String),

    /// Failures while rasterizing or encoding a frame.
    #[error("render error: {0}")]
    Render(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// The export was stopped through its cancel token.
    #[error("export cancelled")]
    Cancelled,

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReelsmithError {
    /// Build a [`ReelsmithError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`ReelsmithError::Asset`] value.
    pub fn asset(msg: impl Into<String>) -> Self {
        Self::Asset(msg.into())
    }

    /// Build a [`ReelsmithError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build a [`ReelsmithError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Return `true` for [`ReelsmithError::Cancelled`].
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<serde_json::Error> for ReelsmithError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serde(e.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;

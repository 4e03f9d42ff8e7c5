/// Convenience result type used across Kinetype.
pub type KinetypeResult<T> = Result<T, KinetypeError>;

/// Opaque failure reported by a compositor or encoder backend.
///
/// The engine never inspects or retries these; they are handed back to the caller unchanged.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct RenderFailure {
    message: String,
}

impl RenderFailure {
    /// Build a failure from a backend message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Backend-provided description.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Top-level error taxonomy used by engine APIs.
#[derive(thiserror::Error, Debug)]
pub enum KinetypeError {
    /// The script contains no words after whitespace normalization.
    #[error("empty script: no words after normalization")]
    EmptyScript,

    /// Narration duration or reading pace is non-positive or inconsistent.
    #[error("invalid duration: {0}")]
    InvalidDuration(String),

    /// Invalid user-provided configuration or request data.
    #[error("validation error: {0}")]
    Validation(String),

    /// Compositor/encoder failure, propagated without retry.
    #[error("render failure: {0}")]
    Render(#[from] RenderFailure),

    /// A progress observer requested cancellation.
    #[error("cancelled")]
    Cancelled,

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl KinetypeError {
    /// Build a [`KinetypeError::InvalidDuration`] value.
    pub fn invalid_duration(msg: impl Into<String>) -> Self {
        Self::InvalidDuration(msg.into())
    }

    /// Build a [`KinetypeError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`KinetypeError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(RenderFailure::new(msg))
    }

    /// Build a [`KinetypeError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// `true` for errors the user can fix by changing the script, pacing or configuration.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::EmptyScript | Self::InvalidDuration(_) | Self::Validation(_)
        )
    }

    /// `true` when the rendering backend failed.
    pub fn is_render_failure(&self) -> bool {
        matches!(self, Self::Render(_))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;

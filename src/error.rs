//! Error types surfaced at the action boundary.
//!
//! Every failure a user action can hit ends up as a [`WellnessError`]. None of
//! them are fatal: the session stays usable and the view shows the message.

use thiserror::Error;

use crate::ambient::AmbientError;
use crate::export::ExportError;
use crate::generation::GenerationError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WellnessError {
    /// A required field was empty; nothing was changed.
    #[error("{0}")]
    Validation(String),

    /// The text-generation service failed; state is unchanged.
    #[error("An API error occurred: {0}")]
    Generation(#[from] GenerationError),

    /// The plan could not be serialized to a document.
    #[error("Export failed: {0}")]
    Export(#[from] ExportError),

    /// An ambient track could not be loaded; playback was forced off.
    #[error("Failed to load audio: {0}")]
    ResourceUnavailable(String),
}

impl WellnessError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Popup title used by the view.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Validation(_) => "[!] Validation Error",
            Self::Generation(_) => "[!] Generation Error",
            Self::Export(_) => "[!] Export Error",
            Self::ResourceUnavailable(_) => "[!] Audio Unavailable",
        }
    }
}

impl From<AmbientError> for WellnessError {
    fn from(err: AmbientError) -> Self {
        Self::ResourceUnavailable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_errors_carry_underlying_message() {
        let err = WellnessError::from(GenerationError::Transport("connection refused".into()));
        assert!(err.to_string().contains("connection refused"));
        assert_eq!(err.title(), "[!] Generation Error");
    }

    #[test]
    fn ambient_errors_become_resource_unavailable() {
        let err = WellnessError::from(AmbientError::MissingTrack("rain.mp3".into()));
        assert!(matches!(err, WellnessError::ResourceUnavailable(ref m) if m.contains("rain.mp3")));
    }
}

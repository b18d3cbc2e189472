use cz_audio::AudioError;
use cz_engine::RenderError;
use cz_formats::FormatError;

/// Errors surfaced by [`Controller`](crate::Controller) operations.
#[derive(Debug)]
pub enum ControllerError {
    /// Track index out of range
    NoSuchTrack(usize),
    /// Offline render refused
    Render(RenderError),
    /// File could not be decoded
    Format(FormatError),
    /// Output device failure
    Audio(AudioError),
}

impl std::fmt::Display for ControllerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControllerError::NoSuchTrack(index) => write!(f, "No track at index {}", index),
            ControllerError::Render(e) => write!(f, "Render failed: {}", e),
            ControllerError::Format(e) => write!(f, "Format error: {}", e),
            ControllerError::Audio(e) => write!(f, "Audio error: {}", e),
        }
    }
}

impl std::error::Error for ControllerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ControllerError::NoSuchTrack(_) => None,
            ControllerError::Render(e) => Some(e),
            ControllerError::Format(e) => Some(e),
            ControllerError::Audio(e) => Some(e),
        }
    }
}

impl From<RenderError> for ControllerError {
    fn from(e: RenderError) -> Self {
        ControllerError::Render(e)
    }
}

impl From<FormatError> for ControllerError {
    fn from(e: FormatError) -> Self {
        ControllerError::Format(e)
    }
}

impl From<AudioError> for ControllerError {
    fn from(e: AudioError) -> Self {
        ControllerError::Audio(e)
    }
}

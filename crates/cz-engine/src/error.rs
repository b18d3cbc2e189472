//! Render error type.

/// Failure of an offline render.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderError {
    /// Nothing to render: no clips, or only empty ones
    EmptyInput,
    /// Requested render exceeds the configured maximum length
    TooLong { seconds: f64, max_seconds: f64 },
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderError::EmptyInput => write!(f, "Nothing to render"),
            RenderError::TooLong { seconds, max_seconds } => write!(
                f,
                "Render of {:.1}s exceeds the {:.1}s limit",
                seconds, max_seconds
            ),
        }
    }
}

impl std::error::Error for RenderError {}

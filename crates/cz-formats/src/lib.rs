//! Export formats for the cadenza workstation.
//!
//! Writes standard multi-track note files and 16-bit PCM WAV files, and
//! reads WAV back into sample buffers.

mod midi_format;
mod wav_format;

pub use midi_format::{
    note_file_chunks, read_vlq, write_note_file, write_vlq, ChunkInfo, NOTE_FILE_FORMAT,
};
pub use wav_format::{audio_buffer_to_wav, load_wav, write_wav};

/// Error type for format parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// Invalid file header or magic bytes
    InvalidHeader,
    /// Unexpected end of file
    UnexpectedEof,
    /// Unsupported format version
    UnsupportedVersion,
    /// I/O error
    Io(String),
}

impl std::fmt::Display for FormatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormatError::InvalidHeader => write!(f, "Invalid header"),
            FormatError::UnexpectedEof => write!(f, "Unexpected end of file"),
            FormatError::UnsupportedVersion => write!(f, "Unsupported format version"),
            FormatError::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for FormatError {}

impl From<binrw::Error> for FormatError {
    fn from(err: binrw::Error) -> Self {
        match err {
            binrw::Error::BadMagic { .. } => FormatError::InvalidHeader,
            binrw::Error::Io(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                FormatError::UnexpectedEof
            }
            other => FormatError::Io(other.to_string()),
        }
    }
}

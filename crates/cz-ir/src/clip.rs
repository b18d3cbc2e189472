//! Clips: time-bounded containers placed on a track.

use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::audio_buffer::AudioBuffer;
use crate::note::Note;

/// A clip on a track's timeline.
#[derive(Clone, Debug)]
pub struct Clip {
    /// Absolute start on the project timeline
    pub start_tick: u64,
    /// Length of the clip region
    pub duration_ticks: u64,
    /// What the clip contains
    pub payload: ClipPayload,
}

/// Clip contents.
#[derive(Clone, Debug)]
pub enum ClipPayload {
    /// Pitched notes, ordered by start tick, relative to the clip start.
    Notes(Vec<Note>),
    /// A segment of a recorded or loaded buffer.
    Audio(AudioSegment),
}

/// Reference into a shared sample buffer.
#[derive(Clone, Debug)]
pub struct AudioSegment {
    pub buffer: Arc<AudioBuffer>,
    /// Where playback starts inside the buffer
    pub offset_seconds: f64,
}

impl Clip {
    /// Create a pitched clip. Notes are sorted by start tick.
    pub fn notes(start_tick: u64, duration_ticks: u64, mut notes: Vec<Note>) -> Self {
        notes.sort_by_key(|n| n.start_tick);
        Self {
            start_tick,
            duration_ticks,
            payload: ClipPayload::Notes(notes),
        }
    }

    /// Create an audio clip.
    pub fn audio(
        start_tick: u64,
        duration_ticks: u64,
        buffer: Arc<AudioBuffer>,
        offset_seconds: f64,
    ) -> Self {
        Self {
            start_tick,
            duration_ticks,
            payload: ClipPayload::Audio(AudioSegment {
                buffer,
                offset_seconds: offset_seconds.max(0.0),
            }),
        }
    }

    /// Notes of a pitched clip (empty for audio clips).
    pub fn note_slice(&self) -> &[Note] {
        match &self.payload {
            ClipPayload::Notes(notes) => notes,
            ClipPayload::Audio(_) => &[],
        }
    }

    /// Audio segment of an audio clip.
    pub fn audio_segment(&self) -> Option<&AudioSegment> {
        match &self.payload {
            ClipPayload::Audio(seg) => Some(seg),
            ClipPayload::Notes(_) => None,
        }
    }

    /// Copies of the clip's notes with start ticks on the project timeline.
    pub fn absolute_notes(&self) -> impl Iterator<Item = Note> + '_ {
        let offset = self.start_tick;
        self.note_slice().iter().map(move |n| n.shifted(offset))
    }

    /// Latest absolute tick this clip produces sound until.
    ///
    /// Pitched clips end with their last note; audio clips with their region.
    pub fn end_tick(&self) -> u64 {
        match &self.payload {
            ClipPayload::Notes(notes) => notes
                .iter()
                .map(|n| self.start_tick + n.end_tick())
                .max()
                .unwrap_or(self.start_tick),
            ClipPayload::Audio(_) => self.start_tick + self.duration_ticks,
        }
    }

    /// Returns true if the clip would produce no sound.
    pub fn is_empty(&self) -> bool {
        match &self.payload {
            ClipPayload::Notes(notes) => notes.is_empty(),
            ClipPayload::Audio(seg) => seg.buffer.is_empty() || self.duration_ticks == 0,
        }
    }
}

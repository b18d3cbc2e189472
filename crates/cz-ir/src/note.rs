//! Pitched note events.

/// A single pitched note inside a clip.
///
/// `start_tick` is relative to the owning clip's start.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Note {
    /// MIDI pitch (0-127)
    pub pitch: u8,
    /// Start, relative to the clip
    pub start_tick: u64,
    /// Length in ticks (> 0)
    pub duration_ticks: u64,
    /// Velocity in (0, 1]
    pub velocity: f32,
}

impl Note {
    /// Create a note.
    pub const fn new(pitch: u8, start_tick: u64, duration_ticks: u64, velocity: f32) -> Self {
        Self {
            pitch,
            start_tick,
            duration_ticks,
            velocity,
        }
    }

    /// Tick just past the end of the note.
    pub const fn end_tick(&self) -> u64 {
        self.start_tick + self.duration_ticks
    }

    /// Copy of this note moved by `offset` ticks.
    pub const fn shifted(&self, offset: u64) -> Self {
        Self {
            start_tick: self.start_tick + offset,
            ..*self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_tick_adds_duration() {
        assert_eq!(Note::new(60, 128, 256, 1.0).end_tick(), 384);
    }

    #[test]
    fn shifted_keeps_everything_else() {
        let n = Note::new(64, 10, 20, 0.5).shifted(100);
        assert_eq!(n, Note::new(64, 110, 20, 0.5));
    }
}

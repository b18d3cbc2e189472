//! Tracks: the unit of mixing.

use alloc::vec::Vec;
use arrayvec::ArrayString;

use crate::clip::Clip;
use crate::instrument::Instrument;

/// Loudest allowed track volume (+3.5 dB).
pub const MAX_VOLUME: f32 = 1.5;

/// Longest track name, in bytes.
pub const MAX_NAME_LEN: usize = 32;

/// A track in the project: an instrument, mixer settings and clips.
#[derive(Clone, Debug)]
pub struct Track {
    /// Name of the track
    pub name: ArrayString<MAX_NAME_LEN>,
    /// What the track's notes are played with
    pub instrument: Instrument,
    /// Linear gain, 0-1.5
    pub volume: f32,
    /// Stereo position, -1 (left) to 1 (right)
    pub pan: f32,
    pub muted: bool,
    pub soloed: bool,
    /// Clips ordered by start tick
    pub clips: Vec<Clip>,
}

/// Longest prefix of `name` that fits a track name, cut on a char boundary.
fn truncated_name(name: &str) -> ArrayString<MAX_NAME_LEN> {
    let mut end = name.len().min(MAX_NAME_LEN);
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    let mut out = ArrayString::new();
    out.push_str(&name[..end]);
    out
}

impl Track {
    /// Create an empty track at unity gain, centered.
    pub fn new(name: &str, instrument: Instrument) -> Self {
        Self {
            name: truncated_name(name),
            instrument,
            volume: 1.0,
            pan: 0.0,
            muted: false,
            soloed: false,
            clips: Vec::new(),
        }
    }

    /// Insert a clip, keeping clips ordered by start.
    pub fn add_clip(&mut self, clip: Clip) {
        let pos = self
            .clips
            .partition_point(|c| c.start_tick <= clip.start_tick);
        self.clips.insert(pos, clip);
    }

    /// Builder form of [`Track::add_clip`].
    pub fn with_clip(mut self, clip: Clip) -> Self {
        self.add_clip(clip);
        self
    }

    /// Set volume, clamped to 0..=MAX_VOLUME.
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = if volume.is_finite() { volume.clamp(0.0, MAX_VOLUME) } else { 0.0 };
    }

    /// Set pan, clamped to -1..=1.
    pub fn set_pan(&mut self, pan: f32) {
        self.pan = if pan.is_finite() { pan.clamp(-1.0, 1.0) } else { 0.0 };
    }

    /// Latest tick any clip sounds until, or `None` if the track has
    /// nothing to play.
    pub fn end_tick(&self) -> Option<u64> {
        self.clips
            .iter()
            .filter(|c| !c.is_empty())
            .map(Clip::end_tick)
            .max()
    }

    /// Returns true if no clip would produce sound.
    pub fn is_empty(&self) -> bool {
        self.clips.iter().all(Clip::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::note::Note;
    use alloc::vec;

    #[test]
    fn clips_stay_ordered() {
        let track = Track::new("lead", Instrument::None)
            .with_clip(Clip::notes(1024, 512, vec![Note::new(60, 0, 10, 1.0)]))
            .with_clip(Clip::notes(0, 512, vec![Note::new(62, 0, 10, 1.0)]));
        assert_eq!(track.clips[0].start_tick, 0);
        assert_eq!(track.clips[1].start_tick, 1024);
    }

    #[test]
    fn volume_and_pan_are_clamped() {
        let mut track = Track::new("t", Instrument::None);
        track.set_volume(3.0);
        track.set_pan(-7.0);
        assert_eq!(track.volume, MAX_VOLUME);
        assert_eq!(track.pan, -1.0);
        track.set_volume(f32::NAN);
        assert_eq!(track.volume, 0.0);
    }

    #[test]
    fn end_tick_ignores_empty_clips() {
        let track = Track::new("t", Instrument::None)
            .with_clip(Clip::notes(0, 256, vec![Note::new(60, 0, 256, 1.0)]))
            .with_clip(Clip::notes(4096, 256, Vec::new()));
        assert_eq!(track.end_tick(), Some(256));
        assert!(Track::new("e", Instrument::None).end_tick().is_none());
    }

    #[test]
    fn long_names_are_truncated_silently() {
        let track = Track::new("a name that is definitely longer than thirty-two bytes", Instrument::None);
        assert_eq!(track.name.as_str(), "a name that is definitely longer");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        // 31 ASCII bytes then a 2-byte char straddling the limit
        let name = alloc::format!("{}é", "x".repeat(31));
        let track = Track::new(&name, Instrument::None);
        assert_eq!(track.name.len(), 31);
        assert!(track.name.chars().all(|c| c == 'x'));
    }
}

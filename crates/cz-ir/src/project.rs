//! Project: tempo, tracks and the loop region.

use alloc::vec::Vec;

use crate::tick::TICKS_PER_BAR;
use crate::track::Track;

/// Shortest loop the transport will play (one sixteenth note).
pub const MIN_LOOP_TICKS: u64 = 64;

/// A complete project snapshot.
#[derive(Clone, Debug)]
pub struct Project {
    /// Tempo in beats per minute (> 0)
    pub bpm: f64,
    pub tracks: Vec<Track>,
    pub loop_region: LoopRegion,
}

impl Default for Project {
    fn default() -> Self {
        Self {
            bpm: 120.0,
            tracks: Vec::new(),
            loop_region: LoopRegion::default(),
        }
    }
}

impl Project {
    /// Create an empty project at the given tempo.
    pub fn new(bpm: f64) -> Self {
        Self {
            bpm,
            ..Self::default()
        }
    }

    /// Latest tick any track sounds until (0 for an empty project).
    pub fn content_end_tick(&self) -> u64 {
        self.tracks
            .iter()
            .filter_map(Track::end_tick)
            .max()
            .unwrap_or(0)
    }

    /// Project length: content end rounded up to a whole bar, at least one
    /// bar, and never shorter than an enabled loop region.
    pub fn length_ticks(&self) -> u64 {
        let content = self.content_end_tick().max(1);
        let bars = content.div_ceil(TICKS_PER_BAR);
        let len = bars * TICKS_PER_BAR;
        if self.loop_region.enabled {
            len.max(self.loop_region.end_tick)
        } else {
            len
        }
    }

    /// Loop region clamped to a valid span within this project.
    pub fn effective_loop(&self) -> LoopRegion {
        self.loop_region.normalized()
    }
}

/// The region the transport repeats while looping is enabled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoopRegion {
    pub start_tick: u64,
    pub end_tick: u64,
    pub enabled: bool,
}

impl Default for LoopRegion {
    fn default() -> Self {
        Self {
            start_tick: 0,
            end_tick: TICKS_PER_BAR * 4,
            enabled: false,
        }
    }
}

impl LoopRegion {
    pub fn new(start_tick: u64, end_tick: u64, enabled: bool) -> Self {
        Self {
            start_tick,
            end_tick,
            enabled,
        }
    }

    /// Repair an inverted or degenerate region by extending the end to the
    /// minimum loop length after the start.
    pub fn normalized(self) -> Self {
        let min_end = self.start_tick.saturating_add(MIN_LOOP_TICKS);
        Self {
            end_tick: self.end_tick.max(min_end),
            ..self
        }
    }

    /// Length of the region in ticks.
    pub fn length(&self) -> u64 {
        self.end_tick.saturating_sub(self.start_tick)
    }

    /// Fold a position that ran past the end back into the region.
    ///
    /// Positions before the end are returned unchanged.
    pub fn wrap(&self, tick: u64) -> u64 {
        let len = self.length();
        if tick < self.end_tick || len == 0 {
            return tick;
        }
        self.start_tick + (tick - self.end_tick) % len
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::Clip;
    use crate::instrument::Instrument;
    use crate::note::Note;
    use alloc::vec;

    fn project_with_note_until(end: u64) -> Project {
        let mut p = Project::new(120.0);
        p.tracks.push(
            Track::new("t", Instrument::None)
                .with_clip(Clip::notes(0, end, vec![Note::new(60, 0, end, 1.0)])),
        );
        p
    }

    #[test]
    fn empty_project_is_one_bar() {
        let p = Project::new(120.0);
        assert_eq!(p.content_end_tick(), 0);
        assert_eq!(p.length_ticks(), TICKS_PER_BAR);
    }

    #[test]
    fn length_rounds_up_to_bar() {
        assert_eq!(project_with_note_until(1025).length_ticks(), 2 * TICKS_PER_BAR);
        assert_eq!(project_with_note_until(1024).length_ticks(), TICKS_PER_BAR);
    }

    #[test]
    fn inverted_loop_is_repaired() {
        let region = LoopRegion::new(2048, 1024, true).normalized();
        assert_eq!(region.start_tick, 2048);
        assert_eq!(region.end_tick, 2048 + MIN_LOOP_TICKS);
    }

    #[test]
    fn valid_loop_is_untouched() {
        let region = LoopRegion::new(0, 1024, true);
        assert_eq!(region.normalized(), region);
    }

    #[test]
    fn wrap_folds_overshoot() {
        let region = LoopRegion::new(0, 1024, true);
        assert_eq!(region.wrap(1000), 1000);
        assert_eq!(region.wrap(1024), 0);
        assert_eq!(region.wrap(1024 + 37), 37);
        assert_eq!(region.wrap(1024 + 2048 + 5), 5);

        let offset = LoopRegion::new(512, 1024, true);
        assert_eq!(offset.wrap(1030), 518);
    }
}

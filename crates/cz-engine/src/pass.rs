//! One scheduling pass: notes and clip segments to emissions.
//!
//! Shared verbatim by live playback and offline rendering; only the
//! window (where tick zero lands on the graph clock, and which ticks
//! are already behind the playhead) differs.

use core::ops::AddAssign;

use cz_ir::{ticks_to_seconds, ClipPayload, DrumSound, Instrument, Note, Track};

use crate::drums::schedule_drum;
use crate::graph::{BusKey, EmissionKey, RenderGraph};
use crate::sampler::{schedule_sampler_note, schedule_segment};
use crate::synth::schedule_synth_note;

/// Maps project ticks to graph time for one pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScheduleWindow {
    /// Graph time at which `from_tick` sounds
    pub playback_start: f64,
    /// Playhead tick the pass starts from; earlier events are skipped
    pub from_tick: u64,
    /// Events at or after this tick are skipped (loop end)
    pub until_tick: u64,
    pub bpm: f64,
}

impl ScheduleWindow {
    pub fn new(playback_start: f64, from_tick: u64, bpm: f64) -> Self {
        Self {
            playback_start,
            from_tick,
            until_tick: u64::MAX,
            bpm,
        }
    }

    /// Stop scheduling at `tick`.
    pub fn until(mut self, tick: u64) -> Self {
        self.until_tick = tick;
        self
    }

    /// Whole project from tick zero, starting at graph time zero.
    pub fn offline(bpm: f64) -> Self {
        Self::new(0.0, 0, bpm)
    }

    /// Graph time of `tick`, or `None` if it lies outside the window.
    pub fn time_of(&self, tick: u64) -> Option<f64> {
        if tick >= self.until_tick {
            return None;
        }
        let offset = tick.checked_sub(self.from_tick)?;
        Some(self.playback_start + ticks_to_seconds(offset, self.bpm))
    }
}

/// What a pass did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PassStats {
    /// Emissions created
    pub scheduled: usize,
    /// Events outside the window
    pub skipped: usize,
    /// Events the instrument could not voice
    pub silent: usize,
}

impl AddAssign for PassStats {
    fn add_assign(&mut self, rhs: Self) {
        self.scheduled += rhs.scheduled;
        self.skipped += rhs.skipped;
        self.silent += rhs.silent;
    }
}

/// Voice a single note on whatever the instrument is.
pub fn schedule_note(
    graph: &mut RenderGraph,
    instrument: &Instrument,
    note: &Note,
    bpm: f64,
    bus: Option<BusKey>,
    start_time: f64,
) -> Option<EmissionKey> {
    match instrument {
        Instrument::Synth(_) => schedule_synth_note(graph, instrument, note, bpm, bus, start_time),
        Instrument::Sampler(_) => schedule_sampler_note(graph, instrument, bus, start_time),
        Instrument::Drums => Some(schedule_drum(
            graph,
            DrumSound::from_pitch(note.pitch),
            bus,
            start_time,
            note.velocity,
        )),
        Instrument::None => None,
    }
}

/// Schedule every note and audio segment of `track` that falls inside
/// `window`. `on_emission` sees each created emission.
pub fn schedule_track(
    graph: &mut RenderGraph,
    track: &Track,
    bus: Option<BusKey>,
    window: &ScheduleWindow,
    mut on_emission: impl FnMut(EmissionKey),
) -> PassStats {
    let mut stats = PassStats::default();
    let mut emitted = |key: Option<EmissionKey>, stats: &mut PassStats| match key {
        Some(key) => {
            stats.scheduled += 1;
            on_emission(key);
        }
        None => stats.silent += 1,
    };

    for clip in &track.clips {
        match &clip.payload {
            ClipPayload::Notes(_) => {
                for note in clip.absolute_notes() {
                    let Some(time) = window.time_of(note.start_tick) else {
                        stats.skipped += 1;
                        continue;
                    };
                    let key = schedule_note(graph, &track.instrument, &note, window.bpm, bus, time);
                    emitted(key, &mut stats);
                }
            }
            ClipPayload::Audio(segment) => {
                let Some(time) = window.time_of(clip.start_tick) else {
                    stats.skipped += 1;
                    continue;
                };
                let clip_seconds = ticks_to_seconds(clip.duration_ticks, window.bpm);
                let key = schedule_segment(graph, segment, clip_seconds, bus, time);
                emitted(key, &mut stats);
            }
        }
    }

    tracing::trace!(track = %track.name, ?stats, "track scheduled");
    stats
}

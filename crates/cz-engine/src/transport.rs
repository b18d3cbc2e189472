//! Live playback: scheduling passes against the running graph clock.
//!
//! State machine: `Stopped → Playing` on [`Transport::start_playback`],
//! `Playing → Stopped` on [`Transport::stop_playback`] or when the
//! playhead runs off the end of a non-looping project. While playing,
//! [`Transport::poll`] derives the playhead from the graph clock and,
//! when it crosses the end of an enabled loop region, folds the
//! overshoot back into the region and runs a fresh pass from there.

use std::sync::Arc;

use cz_ir::{seconds_to_ticks, LoopRegion, Project, Track};

use crate::graph::{self, RenderGraph, SharedGraph};
use crate::mixer::{audibility, MixingGraph};
use crate::pass::{schedule_note, schedule_track, PassStats, ScheduleWindow};
use crate::registry::{ScheduledVoice, VoiceRegistry};
use crate::synth::{trigger_synth_voice, LiveVoice};

/// Transport run state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportState {
    Stopped,
    Playing,
}

/// Result of one playhead poll.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollEvent {
    /// Not playing
    Idle,
    /// Playhead moved to the given tick
    Advanced(u64),
    /// Playhead passed the loop end and was folded back; a new pass ran
    Wrapped { from: u64, to: u64 },
    /// Playhead ran off the end of the project
    Finished,
}

/// A held live note.
#[derive(Clone, Copy, Debug)]
struct HeldNote {
    track: usize,
    pitch: u8,
    voice: LiveVoice,
}

/// Drives live playback of a project snapshot.
pub struct Transport {
    graph: SharedGraph,
    registry: Arc<VoiceRegistry>,
    project: Project,
    mixer: MixingGraph,
    state: TransportState,
    /// Graph time at which the current pass started
    playback_start_time: f64,
    /// Playhead tick the current pass started from
    start_tick: u64,
    position: u64,
    passes: u64,
    held: Vec<HeldNote>,
}

impl Transport {
    /// Create a stopped transport. A bus is created for every track.
    pub fn new(graph: SharedGraph, registry: Arc<VoiceRegistry>, project: Project) -> Self {
        let mixer = MixingGraph::build(&mut graph::lock(&graph), &project.tracks);
        Self {
            graph,
            registry,
            project,
            mixer,
            state: TransportState::Stopped,
            playback_start_time: 0.0,
            start_tick: 0,
            position: 0,
            passes: 0,
            held: Vec::new(),
        }
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == TransportState::Playing
    }

    /// Current playhead tick.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Number of scheduling passes run so far.
    pub fn passes(&self) -> u64 {
        self.passes
    }

    pub fn registry(&self) -> &Arc<VoiceRegistry> {
        &self.registry
    }

    pub fn graph(&self) -> &SharedGraph {
        &self.graph
    }

    /// Start (or restart) playback from `start_tick`.
    ///
    /// Everything a previous pass scheduled is killed first, then every
    /// audible track is scheduled against the graph clock as it reads now.
    /// Events before the playhead are skipped.
    pub fn start_playback(&mut self, start_tick: u64) -> PassStats {
        let shared = Arc::clone(&self.graph);
        let stats = self.run_pass(&mut graph::lock(&shared), start_tick);

        self.state = TransportState::Playing;
        tracing::info!(
            start_tick,
            scheduled = stats.scheduled,
            skipped = stats.skipped,
            "playback started"
        );
        stats
    }

    fn run_pass(&mut self, graph: &mut RenderGraph, start_tick: u64) -> PassStats {
        let killed = self.registry.stop_scheduled(graph);
        if killed > 0 {
            tracing::debug!(killed, "previous pass stopped");
        }

        self.playback_start_time = graph.current_time();
        self.start_tick = start_tick;
        self.position = start_tick;
        self.passes += 1;

        let mut window = ScheduleWindow::new(self.playback_start_time, start_tick, self.project.bpm);
        let region = self.project.effective_loop();
        if loops_from(&region, start_tick) {
            window = window.until(region.end_tick);
        }

        self.mixer.apply(graph, &self.project.tracks);
        let registry = &self.registry;
        let mut stats = PassStats::default();
        for (index, track) in self.project.tracks.iter().enumerate() {
            if !audibility(track, &self.project.tracks) {
                continue;
            }
            let bus = self.mixer.bus(index);
            stats += schedule_track(graph, track, bus, &window, |key| {
                registry.register(ScheduledVoice::scheduled(key, index));
            });
        }
        stats
    }

    /// Stop playback and silence everything at once, live notes included.
    /// Safe to call when already stopped.
    pub fn stop_playback(&mut self) {
        let killed = self.registry.stop_all(&mut graph::lock(&self.graph));
        self.held.clear();
        if self.state == TransportState::Playing {
            tracing::info!(position = self.position, killed, "playback stopped");
        }
        self.state = TransportState::Stopped;
    }

    /// Advance the playhead from the graph clock. Call at UI rate.
    pub fn poll(&mut self) -> PollEvent {
        if self.state != TransportState::Playing {
            return PollEvent::Idle;
        }

        let shared = Arc::clone(&self.graph);
        let mut graph = graph::lock(&shared);
        self.registry.reap_finished(&graph);

        let elapsed = (graph.current_time() - self.playback_start_time).max(0.0);
        let elapsed_ticks = seconds_to_ticks(elapsed, self.project.bpm) as u64;
        let tick = self.start_tick + elapsed_ticks;

        let region = self.project.effective_loop();
        if loops_from(&region, self.start_tick) && tick >= region.end_tick {
            let wrapped = region.wrap(tick);
            let stats = self.run_pass(&mut graph, wrapped);
            tracing::debug!(from = tick, to = wrapped, scheduled = stats.scheduled, "loop wrapped");
            return PollEvent::Wrapped {
                from: tick,
                to: wrapped,
            };
        }

        let end = self.project.length_ticks();
        if !loops_from(&region, self.start_tick) && tick >= end {
            self.position = end;
            self.state = TransportState::Stopped;
            tracing::info!(end, "playback finished");
            return PollEvent::Finished;
        }

        self.position = tick;
        PollEvent::Advanced(tick)
    }

    /// Replace the loop region. Takes effect at the next wrap check; an
    /// active pass is rescheduled so it respects the new end.
    pub fn set_loop_region(&mut self, region: LoopRegion) {
        self.project.loop_region = region;
        if self.is_playing() {
            self.start_playback(self.position);
        }
    }

    /// Swap in a new project snapshot. Playback continues from the same
    /// position with the new content.
    pub fn set_project(&mut self, project: Project) {
        self.project = project;
        self.mixer.sync(&mut graph::lock(&self.graph), &self.project.tracks);
        if self.is_playing() {
            self.start_playback(self.position);
        }
    }

    /// Edit one track's mix settings and reapply the mix to every track.
    /// Returns `false` if there is no such track.
    pub fn edit_track(&mut self, index: usize, edit: impl FnOnce(&mut Track)) -> bool {
        let Some(track) = self.project.tracks.get_mut(index) else {
            return false;
        };
        edit(track);
        self.mixer.apply(&mut graph::lock(&self.graph), &self.project.tracks);
        true
    }

    /// Play a note on a track's instrument right now, until [`note_off`].
    ///
    /// Synths hold until released; other instruments play their one-shot
    /// sound. Returns `false` if the track does not exist or is silent.
    ///
    /// [`note_off`]: Transport::note_off
    pub fn note_on(&mut self, index: usize, pitch: u8, velocity: f32) -> bool {
        let Some(track) = self.project.tracks.get(index) else {
            return false;
        };
        let bus = self.mixer.bus(index);
        let mut graph = graph::lock(&self.graph);
        let now = graph.current_time();

        if let Some(voice) = trigger_synth_voice(&mut graph, &track.instrument, pitch, velocity, bus, now) {
            self.registry.register(ScheduledVoice::live(voice.key(), index));
            self.held.push(HeldNote {
                track: index,
                pitch,
                voice,
            });
            return true;
        }

        let note = cz_ir::Note::new(pitch, 0, cz_ir::TICKS_PER_QUARTER as u64, velocity);
        match schedule_note(&mut graph, &track.instrument, &note, self.project.bpm, bus, now) {
            Some(key) => {
                self.registry.register(ScheduledVoice::live(key, index));
                true
            }
            None => false,
        }
    }

    /// Release every held note of `pitch` on the track.
    /// Returns `false` if nothing was held.
    pub fn note_off(&mut self, index: usize, pitch: u8) -> bool {
        let mut graph = graph::lock(&self.graph);
        let now = graph.current_time();
        let mut released = false;
        for held in self.held.iter_mut().filter(|h| h.track == index && h.pitch == pitch) {
            held.voice.release(&mut graph, now);
            released = true;
        }
        self.held.retain(|h| !h.voice.is_released());
        released
    }

    /// Number of live notes currently held.
    pub fn held_notes(&self) -> usize {
        self.held.len()
    }
}

/// Whether a pass started at `tick` is governed by the loop region.
fn loops_from(region: &LoopRegion, tick: u64) -> bool {
    region.enabled && tick < region.end_tick
}

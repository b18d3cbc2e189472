//! Offline rendering: the live scheduling code run against a private,
//! fixed-length graph and rendered to completion.

use cz_ir::{ticks_to_seconds, AudioBuffer, Project, Track};

use crate::config::EngineConfig;
use crate::error::RenderError;
use crate::graph::RenderGraph;
use crate::mixer::{audibility, MixingGraph};
use crate::pass::{schedule_track, PassStats, ScheduleWindow};

/// Output channel count of every offline render.
const RENDER_CHANNELS: u16 = 2;

/// A render graph with a fixed output length.
pub struct OfflineContext {
    graph: RenderGraph,
    frames: usize,
}

impl OfflineContext {
    /// Allocate a context `seconds` long, rounded up to whole frames.
    pub fn new(config: &EngineConfig, seconds: f64) -> Result<Self, RenderError> {
        if seconds.is_nan() || seconds > config.max_render_seconds {
            return Err(RenderError::TooLong {
                seconds,
                max_seconds: config.max_render_seconds,
            });
        }
        let frames = (seconds.max(0.0) * config.sample_rate as f64).ceil() as usize;
        Ok(Self {
            graph: RenderGraph::new(config.sample_rate, config.noise_seed),
            frames,
        })
    }

    pub fn graph_mut(&mut self) -> &mut RenderGraph {
        &mut self.graph
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Render every scheduled emission into a stereo buffer.
    pub fn start_rendering(mut self) -> AudioBuffer {
        let mut buffer = AudioBuffer::new(RENDER_CHANNELS, self.frames, self.graph.sample_rate());
        #[cfg(feature = "alloc_check")]
        assert_no_alloc::assert_no_alloc(|| self.graph.render_into(&mut buffer));
        #[cfg(not(feature = "alloc_check"))]
        self.graph.render_into(&mut buffer);
        buffer
    }
}

/// Decay time to leave after a track's last note.
fn tail_seconds(track: &Track, config: &EngineConfig) -> f64 {
    track
        .instrument
        .release_time()
        .unwrap_or(config.sampler_tail_seconds)
}

/// Bounce one track, dry, to a buffer ending one release tail after its
/// last note.
pub fn render_track_to_buffer(
    track: &Track,
    bpm: f64,
    config: &EngineConfig,
) -> Result<AudioBuffer, RenderError> {
    let end_tick = track.end_tick().ok_or(RenderError::EmptyInput)?;
    let seconds = ticks_to_seconds(end_tick, bpm) + tail_seconds(track, config);
    let mut ctx = OfflineContext::new(config, seconds)?;

    let stats = schedule_track(ctx.graph_mut(), track, None, &ScheduleWindow::offline(bpm), |_| {});
    tracing::debug!(track = %track.name, frames = ctx.frames(), scheduled = stats.scheduled, "bouncing track");
    Ok(ctx.start_rendering())
}

/// Tracks that would sound in a mixdown, with their indices.
fn audible_tracks(project: &Project) -> impl Iterator<Item = (usize, &Track)> {
    project
        .tracks
        .iter()
        .enumerate()
        .filter(|(_, t)| !t.is_empty() && audibility(t, &project.tracks))
}

/// Length of a mixdown of `project`: last audible note plus the longest tail.
fn project_seconds(project: &Project, config: &EngineConfig) -> Result<f64, RenderError> {
    let mut end_tick = None;
    let mut tail: f64 = 0.0;
    for (_, track) in audible_tracks(project) {
        end_tick = end_tick.max(track.end_tick());
        tail = tail.max(tail_seconds(track, config));
    }
    let end_tick = end_tick.ok_or(RenderError::EmptyInput)?;
    Ok(ticks_to_seconds(end_tick, project.bpm) + tail)
}

/// Mix every audible track through its channel strip into one buffer.
pub fn render_project_to_buffer(
    project: &Project,
    config: &EngineConfig,
) -> Result<AudioBuffer, RenderError> {
    let seconds = project_seconds(project, config)?;
    let mut ctx = OfflineContext::new(config, seconds)?;
    let graph = ctx.graph_mut();
    let mixer = MixingGraph::build(graph, &project.tracks);

    let window = ScheduleWindow::offline(project.bpm);
    let mut stats = PassStats::default();
    for (index, track) in audible_tracks(project) {
        stats += schedule_track(graph, track, mixer.bus(index), &window, |_| {});
    }
    tracing::info!(frames = ctx.frames(), scheduled = stats.scheduled, "rendering mixdown");
    Ok(ctx.start_rendering())
}

/// Render each audible track on its own, all to the mixdown's length.
/// Returns `(track index, buffer)` pairs in track order.
pub fn render_stems(
    project: &Project,
    config: &EngineConfig,
) -> Result<Vec<(usize, AudioBuffer)>, RenderError> {
    let seconds = project_seconds(project, config)?;
    let window = ScheduleWindow::offline(project.bpm);

    let mut stems = Vec::new();
    for (index, track) in audible_tracks(project) {
        let mut ctx = OfflineContext::new(config, seconds)?;
        let graph = ctx.graph_mut();
        let bus = graph.add_bus();
        graph.set_bus_gain(bus, track.volume);
        graph.set_bus_pan(bus, track.pan);
        schedule_track(graph, track, Some(bus), &window, |_| {});
        stems.push((index, ctx.start_rendering()));
    }
    tracing::info!(stems = stems.len(), "rendered stems");
    Ok(stems)
}

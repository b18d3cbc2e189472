//! Headless controller for the cadenza workstation.
//!
//! Owns the live render graph, the voice registry and the transport, and
//! exposes play/stop, mixer edits, live notes and the export operations
//! behind one API for the CLI (or any front end) to share.

mod error;
mod workers;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use cz_engine::graph::{self, RenderGraph, SharedGraph};
use cz_engine::{PassStats, PollEvent, Transport, VoiceRegistry};
use workers::{lock_transport, SharedTransport, Worker};

// Re-export common types so callers don't need cz-ir/cz-engine directly.
pub use cz_audio::AudioError;
pub use cz_engine::{EngineConfig, Frame, RenderError};
pub use cz_formats::FormatError;
pub use cz_ir::{AudioBuffer, Clip, Instrument, LoopRegion, Note, Project, Track};
pub use error::ControllerError;

/// Headless workstation controller: owns a project and manages playback.
pub struct Controller {
    config: EngineConfig,
    graph: SharedGraph,
    registry: Arc<VoiceRegistry>,
    transport: SharedTransport,
    position: Arc<AtomicU64>,
    output: Option<Worker>,
    poller: Option<Worker>,
}

impl Controller {
    pub fn new(project: Project, config: EngineConfig) -> Self {
        let graph = RenderGraph::new(config.sample_rate, config.noise_seed).shared();
        let registry = Arc::new(VoiceRegistry::new());
        let transport = Transport::new(graph.clone(), registry.clone(), project);
        Self {
            config,
            graph,
            registry,
            transport: Arc::new(Mutex::new(transport)),
            position: Arc::new(AtomicU64::new(0)),
            output: None,
            poller: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Snapshot of the current project, mix edits included.
    pub fn project(&self) -> Project {
        lock_transport(&self.transport).project().clone()
    }

    /// Replace the project. Playback, if running, continues from the same
    /// position with the new content.
    pub fn set_project(&mut self, project: Project) {
        lock_transport(&self.transport).set_project(project);
    }

    pub fn graph(&self) -> &SharedGraph {
        &self.graph
    }

    // --- Audio output ---

    /// Start feeding the default output device from the live graph.
    ///
    /// If the device runs at a different rate than the graph, the graph
    /// is rebuilt at the device rate and anything playing is stopped.
    pub fn open_output(&mut self) -> Result<u32, ControllerError> {
        if self.output.as_ref().is_some_and(Worker::is_running) {
            return Ok(self.sample_rate());
        }
        self.close_output();

        let (worker, rate) = workers::spawn_output(self.graph.clone(), self.config.block_size)?;
        if rate != self.sample_rate() {
            tracing::info!(from = self.sample_rate(), to = rate, "rebuilding graph at device rate");
            self.stop();
            let mut transport = lock_transport(&self.transport);
            let project = transport.project().clone();
            {
                let mut graph = graph::lock(&self.graph);
                self.registry.stop_all(&mut graph);
                *graph = RenderGraph::new(rate, self.config.noise_seed);
            }
            *transport = Transport::new(self.graph.clone(), self.registry.clone(), project);
        }
        self.output = Some(worker);
        Ok(rate)
    }

    /// Stop the device thread. Playback state is left alone; the graph
    /// clock simply stops advancing.
    pub fn close_output(&mut self) {
        if let Some(worker) = self.output.take() {
            worker.shutdown();
        }
    }

    /// Sample rate the live graph runs at.
    pub fn sample_rate(&self) -> u32 {
        graph::lock(&self.graph).sample_rate()
    }

    /// Render and discard `frames` frames of the live graph, moving its
    /// clock forward. For driving playback without an output device.
    pub fn advance(&self, frames: usize) {
        graph::lock(&self.graph).advance(frames);
    }

    // --- Transport ---

    /// Start (or restart) playback from `from_tick` and begin polling the
    /// playhead in the background.
    pub fn play(&mut self, from_tick: u64) -> PassStats {
        let stats = self.start_transport(from_tick);
        self.stop_poller();
        self.poller = Some(workers::spawn_poller(
            self.transport.clone(),
            self.position.clone(),
            self.config.poll_interval,
        ));
        stats
    }

    /// Start playback without a background poller; the caller drives the
    /// playhead with [`Controller::poll`].
    pub fn play_manual(&mut self, from_tick: u64) -> PassStats {
        self.stop_poller();
        self.start_transport(from_tick)
    }

    fn start_transport(&mut self, from_tick: u64) -> PassStats {
        let mut transport = lock_transport(&self.transport);
        let stats = transport.start_playback(from_tick);
        self.position.store(transport.position(), Ordering::Relaxed);
        stats
    }

    /// Poll the playhead once.
    pub fn poll(&self) -> PollEvent {
        let mut transport = lock_transport(&self.transport);
        let event = transport.poll();
        self.position.store(transport.position(), Ordering::Relaxed);
        event
    }

    /// Stop playback, silencing every voice. Safe to call when stopped.
    pub fn stop(&mut self) {
        self.stop_poller();
        lock_transport(&self.transport).stop_playback();
    }

    fn stop_poller(&mut self) {
        if let Some(worker) = self.poller.take() {
            worker.shutdown();
        }
    }

    pub fn is_playing(&self) -> bool {
        lock_transport(&self.transport).is_playing()
    }

    /// Last observed playhead tick.
    pub fn position(&self) -> u64 {
        self.position.load(Ordering::Relaxed)
    }

    /// Number of scheduling passes run since the controller was created.
    pub fn passes(&self) -> u64 {
        lock_transport(&self.transport).passes()
    }

    /// Number of voices currently tracked by the registry.
    pub fn active_voices(&self) -> usize {
        self.registry.len()
    }

    pub fn set_loop_region(&mut self, region: LoopRegion) {
        lock_transport(&self.transport).set_loop_region(region);
    }

    // --- Mixer ---

    fn edit_track(&self, index: usize, edit: impl FnOnce(&mut Track)) -> Result<(), ControllerError> {
        if lock_transport(&self.transport).edit_track(index, edit) {
            Ok(())
        } else {
            Err(ControllerError::NoSuchTrack(index))
        }
    }

    pub fn set_track_volume(&self, index: usize, volume: f32) -> Result<(), ControllerError> {
        self.edit_track(index, |t| t.set_volume(volume))
    }

    pub fn set_track_pan(&self, index: usize, pan: f32) -> Result<(), ControllerError> {
        self.edit_track(index, |t| t.set_pan(pan))
    }

    pub fn set_track_muted(&self, index: usize, muted: bool) -> Result<(), ControllerError> {
        self.edit_track(index, |t| t.muted = muted)
    }

    pub fn set_track_soloed(&self, index: usize, soloed: bool) -> Result<(), ControllerError> {
        self.edit_track(index, |t| t.soloed = soloed)
    }

    /// Decode a WAV file and make it the track's sampler instrument.
    /// Takes effect from the next scheduling pass.
    pub fn load_sample(&self, index: usize, wav: &[u8]) -> Result<(), ControllerError> {
        let buffer = cz_formats::load_wav(wav)?;
        tracing::debug!(track = index, frames = buffer.frames(), "sample loaded");
        let patch = cz_ir::SamplerPatch::with_sample(Arc::new(buffer));
        self.edit_track(index, |t| t.instrument = Instrument::Sampler(patch))
    }

    // --- Live input ---

    /// Sound a note on a track right now. Returns `false` if the track
    /// has nothing to play it with.
    pub fn note_on(&self, index: usize, pitch: u8, velocity: f32) -> Result<bool, ControllerError> {
        let mut transport = lock_transport(&self.transport);
        if index >= transport.project().tracks.len() {
            return Err(ControllerError::NoSuchTrack(index));
        }
        Ok(transport.note_on(index, pitch, velocity))
    }

    /// Release a held note. Returns `false` if it was not held.
    pub fn note_off(&self, index: usize, pitch: u8) -> bool {
        lock_transport(&self.transport).note_off(index, pitch)
    }

    // --- Offline rendering and export ---

    /// Bounce one track, dry, to a buffer.
    pub fn bounce_track(&self, index: usize) -> Result<AudioBuffer, ControllerError> {
        let project = self.project();
        let track = project
            .tracks
            .get(index)
            .ok_or(ControllerError::NoSuchTrack(index))?;
        Ok(cz_engine::render_track_to_buffer(track, project.bpm, &self.config)?)
    }

    /// Mix every audible track down to one buffer.
    pub fn mixdown(&self) -> Result<AudioBuffer, ControllerError> {
        Ok(cz_engine::render_project_to_buffer(&self.project(), &self.config)?)
    }

    /// Render each audible track separately, as `(track index, buffer)`.
    pub fn stems(&self) -> Result<Vec<(usize, AudioBuffer)>, ControllerError> {
        Ok(cz_engine::render_stems(&self.project(), &self.config)?)
    }

    /// The project's notes as a standard multi-track note file.
    pub fn write_note_file(&self) -> Vec<u8> {
        let project = self.project();
        cz_formats::write_note_file(&project.tracks, project.bpm)
    }

    /// Encode a rendered buffer as 16-bit PCM WAV.
    pub fn write_audio_file(&self, buffer: &AudioBuffer) -> Vec<u8> {
        cz_formats::audio_buffer_to_wav(buffer)
    }

    /// Mix down and encode as WAV in one step.
    pub fn render_to_wav(&self) -> Result<Vec<u8>, ControllerError> {
        let buffer = self.mixdown()?;
        Ok(self.write_audio_file(&buffer))
    }
}

impl Default for Controller {
    fn default() -> Self {
        Self::new(Project::new(120.0), EngineConfig::default())
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.stop();
        self.close_output();
    }
}

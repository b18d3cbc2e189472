//! Transport and rendering engine for the cadenza workstation.
//!
//! Turns the note/clip model into scheduled sound emissions on a render
//! graph, either live against a running clock (the [`Transport`]) or
//! offline into a fixed-length buffer ([`render_track_to_buffer`]).

mod config;
mod drums;
mod error;
mod frame;
mod frequency;
pub mod graph;
mod mixer;
mod offline;
mod param;
mod pass;
mod registry;
mod sampler;
mod synth;
pub mod transport;

pub use config::EngineConfig;
pub use drums::{schedule_drum, schedule_hat, schedule_kick, schedule_snare};
pub use error::RenderError;
pub use frame::Frame;
pub use frequency::{cents_to_ratio, pitch_to_frequency};
pub use graph::{BusKey, Emission, EmissionKey, RenderGraph, SharedGraph, Source};
pub use mixer::{audibility, MixingGraph};
pub use offline::{
    render_project_to_buffer, render_stems, render_track_to_buffer, OfflineContext,
};
pub use param::{Param, SILENCE_FLOOR};
pub use pass::{schedule_note, schedule_track, PassStats, ScheduleWindow};
pub use registry::{ScheduledVoice, VoiceId, VoiceRegistry};
pub use sampler::{schedule_sampler_note, schedule_segment};
pub use synth::{schedule_synth_note, trigger_synth_voice, LiveVoice, RELEASE_EPSILON};
pub use transport::{PollEvent, Transport, TransportState};

//! Core data model for the cadenza workstation.
//!
//! Notes, clips, tracks and projects as produced by the editing layer,
//! plus the tempo clock every other crate uses to move between musical
//! ticks and seconds. The engine treats all of these as read-only
//! snapshots.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod audio_buffer;
mod clip;
mod instrument;
mod note;
mod project;
mod tick;
mod track;

pub use audio_buffer::{AudioBuffer, BLOCK_SIZE, MAX_CHANNELS};
pub use clip::{AudioSegment, Clip, ClipPayload};
pub use instrument::{
    Adsr, DrumSound, FilterKind, FilterSpec, Instrument, OscillatorSpec, SamplerPatch, SynthPatch,
    Waveform,
};
pub use note::Note;
pub use project::{LoopRegion, Project, MIN_LOOP_TICKS};
pub use tick::{
    micros_per_quarter, seconds_to_ticks, ticks_to_samples, ticks_to_seconds, TICKS_PER_BAR,
    TICKS_PER_QUARTER,
};
pub use track::{Track, MAX_NAME_LEN, MAX_VOLUME};

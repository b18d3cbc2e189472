//! Tempo clock: conversion between musical ticks and seconds.
//!
//! Every tick/time conversion in the workspace goes through these
//! functions so that live playback, offline rendering and file export
//! agree on timing.

/// Ticks per quarter note. Fixed for the whole system, never negotiated
/// per file.
pub const TICKS_PER_QUARTER: u32 = 256;

/// Ticks in one 4/4 bar.
pub const TICKS_PER_BAR: u64 = TICKS_PER_QUARTER as u64 * 4;

/// Convert a tick count to seconds at `bpm`.
pub fn ticks_to_seconds(ticks: u64, bpm: f64) -> f64 {
    ticks as f64 * (60.0 / bpm) / TICKS_PER_QUARTER as f64
}

/// Convert seconds to (fractional) ticks at `bpm`. Exact inverse of
/// [`ticks_to_seconds`].
pub fn seconds_to_ticks(seconds: f64, bpm: f64) -> f64 {
    seconds * TICKS_PER_QUARTER as f64 / (60.0 / bpm)
}

/// Convert a tick count to a whole number of sample frames, rounding up.
pub fn ticks_to_samples(ticks: u64, bpm: f64, sample_rate: u32) -> u64 {
    libm::ceil(ticks_to_seconds(ticks, bpm) * sample_rate as f64) as u64
}

/// Tempo as microseconds per quarter note, as stored in note files.
pub fn micros_per_quarter(bpm: f64) -> u32 {
    libm::round(60_000_000.0 / bpm) as u32
}

//! Instrument definitions.

use alloc::sync::Arc;

use crate::audio_buffer::AudioBuffer;

/// What a track plays its notes with.
///
/// Each kind is scheduled differently by the engine, which matches on
/// this exhaustively.
#[derive(Clone, Debug, Default)]
pub enum Instrument {
    /// Two oscillators through a filter and an ADSR envelope
    Synth(SynthPatch),
    /// Plays a loaded buffer per note
    Sampler(SamplerPatch),
    /// Procedural percussion keyed by pitch
    Drums,
    /// Unconfigured track; produces no sound
    #[default]
    None,
}

impl Instrument {
    /// Release tail to add after the last note when rendering offline.
    /// `None` for instruments without an envelope.
    pub fn release_time(&self) -> Option<f64> {
        match self {
            Instrument::Synth(patch) => Some(patch.envelope.release),
            Instrument::Sampler(_) | Instrument::Drums | Instrument::None => None,
        }
    }
}

/// Oscillator waveform.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Waveform {
    #[default]
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

/// One oscillator of a synth patch.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct OscillatorSpec {
    pub waveform: Waveform,
    /// Detune in cents (100 = one semitone)
    pub detune_cents: f32,
}

/// Filter response type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FilterKind {
    #[default]
    LowPass,
    HighPass,
    BandPass,
    Notch,
}

/// The synth's filter stage.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FilterSpec {
    pub kind: FilterKind,
    pub cutoff_hz: f32,
    /// Filter Q
    pub resonance: f32,
}

impl Default for FilterSpec {
    fn default() -> Self {
        Self {
            kind: FilterKind::LowPass,
            cutoff_hz: 2_000.0,
            resonance: 1.0,
        }
    }
}

/// Attack/decay/sustain/release envelope. Times in seconds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Adsr {
    pub attack: f64,
    pub decay: f64,
    /// Sustain level, 0-1
    pub sustain: f64,
    pub release: f64,
}

impl Default for Adsr {
    fn default() -> Self {
        Self {
            attack: 0.01,
            decay: 0.1,
            sustain: 0.7,
            release: 0.3,
        }
    }
}

impl Adsr {
    /// Times finite and non-negative, sustain within 0-1.
    pub fn is_valid(&self) -> bool {
        let time_ok = |t: f64| t.is_finite() && t >= 0.0;
        time_ok(self.attack)
            && time_ok(self.decay)
            && time_ok(self.release)
            && self.sustain.is_finite()
            && (0.0..=1.0).contains(&self.sustain)
    }
}

/// A subtractive synth voice definition.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SynthPatch {
    pub osc1: OscillatorSpec,
    pub osc2: OscillatorSpec,
    pub filter: FilterSpec,
    pub envelope: Adsr,
}

impl SynthPatch {
    /// Whether the patch can be scheduled at all.
    pub fn is_valid(&self) -> bool {
        self.envelope.is_valid()
            && self.filter.cutoff_hz.is_finite()
            && self.filter.cutoff_hz > 0.0
            && self.filter.resonance.is_finite()
            && self.osc1.detune_cents.is_finite()
            && self.osc2.detune_cents.is_finite()
    }
}

/// Sampler settings.
#[derive(Clone, Debug, Default)]
pub struct SamplerPatch {
    /// Loaded sample; `None` until the user loads one
    pub sample: Option<Arc<AudioBuffer>>,
}

impl SamplerPatch {
    pub fn with_sample(sample: Arc<AudioBuffer>) -> Self {
        Self {
            sample: Some(sample),
        }
    }
}

/// Procedural drum voices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrumSound {
    Kick,
    Snare,
    ClosedHat,
    OpenHat,
}

impl DrumSound {
    /// Map a General MIDI percussion pitch. Unmapped pitches play the
    /// closed hat.
    pub fn from_pitch(pitch: u8) -> Self {
        match pitch {
            35 | 36 => DrumSound::Kick,
            38 | 40 => DrumSound::Snare,
            46 => DrumSound::OpenHat,
            _ => DrumSound::ClosedHat,
        }
    }

    /// Parse a drum identifier. Unknown identifiers play the closed hat.
    pub fn from_name(name: &str) -> Self {
        match name {
            "kick" => DrumSound::Kick,
            "snare" => DrumSound::Snare,
            "open-hat" | "openhat" => DrumSound::OpenHat,
            _ => DrumSound::ClosedHat,
        }
    }
}

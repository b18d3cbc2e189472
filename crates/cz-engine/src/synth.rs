//! Subtractive synth voices: two oscillators → filter → ADSR gain.

use cz_ir::{ticks_to_seconds, Adsr, Instrument, Note, SynthPatch};

use crate::frequency::pitch_to_frequency;
use crate::graph::{BusKey, Emission, EmissionKey, RenderGraph, Source};
use crate::param::{Param, SILENCE_FLOOR};

/// Extra time after a live release ramp before the oscillators stop.
pub const RELEASE_EPSILON: f64 = 0.01;

/// Each oscillator contributes half so the pair peaks at unity.
const OSCILLATOR_MIX: f32 = 0.5;

fn patch_of(instrument: &Instrument) -> Option<&SynthPatch> {
    match instrument {
        Instrument::Synth(patch) if patch.is_valid() => Some(patch),
        Instrument::Synth(_) => {
            tracing::debug!("malformed synth patch, not scheduling");
            None
        }
        Instrument::Sampler(_) | Instrument::Drums | Instrument::None => None,
    }
}

fn voice_emission(
    graph: &RenderGraph,
    patch: &SynthPatch,
    pitch: u8,
    bus: Option<BusKey>,
    start: f64,
    stop: f64,
) -> Emission {
    let frequency = pitch_to_frequency(pitch);
    Emission::new(bus, start, stop)
        .with_source(Source::oscillator(
            patch.osc1.waveform,
            frequency,
            patch.osc1.detune_cents,
        ))
        .with_source(Source::oscillator(
            patch.osc2.waveform,
            frequency,
            patch.osc2.detune_cents,
        ))
        .with_source_gain(OSCILLATOR_MIX)
        .with_filter(
            patch.filter.kind,
            patch.filter.cutoff_hz,
            patch.filter.resonance,
            graph.sample_rate(),
        )
}

/// Attack to `velocity`, then decay toward the sustain level.
/// Returns the sustain level.
fn attack_decay(gain: &mut Param, env: &Adsr, velocity: f32, start: f64) -> f32 {
    let sustain = (env.sustain as f32 * velocity).max(SILENCE_FLOOR);
    gain.set_value_at_time(0.0, start)
        .linear_ramp_to_value_at_time(velocity, start + env.attack)
        .exponential_ramp_to_value_at_time(sustain, start + env.attack + env.decay);
    sustain
}

/// Schedule one note of a synth instrument on `bus` at `start_time`.
///
/// Returns `None` (and schedules nothing) if the instrument is not a
/// well-formed synth. The emission stops hard at the end of the note
/// whatever the envelope says.
pub fn schedule_synth_note(
    graph: &mut RenderGraph,
    instrument: &Instrument,
    note: &Note,
    bpm: f64,
    bus: Option<BusKey>,
    start_time: f64,
) -> Option<EmissionKey> {
    let patch = patch_of(instrument)?;
    let env = patch.envelope;
    let velocity = note.velocity.clamp(0.0, 1.0);
    let duration = ticks_to_seconds(note.duration_ticks, bpm);
    let end = start_time + duration;

    let mut emission = voice_emission(graph, patch, note.pitch, bus, start_time, end);
    let gain = emission.gain_mut();
    let sustain = attack_decay(gain, &env, velocity, start_time);
    // Short notes compress the envelope: release starts no earlier than the note.
    let release_start = start_time.max(end - env.release);
    gain.set_value_at_time(sustain, release_start)
        .linear_ramp_to_value_at_time(0.0, end);

    Some(graph.add_emission(emission))
}

/// A held synth voice whose end is not known yet.
#[derive(Clone, Copy, Debug)]
pub struct LiveVoice {
    key: EmissionKey,
    release: f64,
    released: bool,
}

impl LiveVoice {
    pub fn key(&self) -> EmissionKey {
        self.key
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Start the release at `now`: ramp down from the current level over
    /// the patch's release time, then stop the oscillators.
    ///
    /// Returns the stop time, or `None` if already released or gone.
    pub fn release(&mut self, graph: &mut RenderGraph, now: f64) -> Option<f64> {
        if self.released {
            return None;
        }
        self.released = true;
        let emission = graph.emission_mut(self.key)?;
        let gain = emission.gain_mut();
        let current = gain.value_at(now);
        gain.cancel_scheduled_values(now)
            .set_value_at_time(current, now)
            .exponential_ramp_to_value_at_time(SILENCE_FLOOR, now + self.release);
        let stop = now + self.release + RELEASE_EPSILON;
        emission.reschedule_stop(stop);
        Some(stop)
    }
}

/// Start a synth voice that sustains until [`LiveVoice::release`].
pub fn trigger_synth_voice(
    graph: &mut RenderGraph,
    instrument: &Instrument,
    pitch: u8,
    velocity: f32,
    bus: Option<BusKey>,
    start_time: f64,
) -> Option<LiveVoice> {
    let patch = patch_of(instrument)?;
    let env = patch.envelope;
    let mut emission = voice_emission(graph, patch, pitch, bus, start_time, f64::INFINITY);
    attack_decay(emission.gain_mut(), &env, velocity.clamp(0.0, 1.0), start_time);

    Some(LiveVoice {
        key: graph.add_emission(emission),
        release: env.release,
        released: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cz_ir::{FilterKind, FilterSpec, SamplerPatch};

    const RATE: u32 = 8_000;

    fn patch() -> SynthPatch {
        SynthPatch {
            envelope: Adsr {
                attack: 0.01,
                decay: 0.1,
                sustain: 0.5,
                release: 0.3,
            },
            filter: FilterSpec {
                kind: FilterKind::LowPass,
                cutoff_hz: 2_000.0,
                resonance: 0.707,
            },
            ..SynthPatch::default()
        }
    }

    #[test]
    fn non_synth_instruments_schedule_nothing() {
        let mut graph = RenderGraph::new(RATE, 1);
        let note = Note::new(60, 0, 256, 1.0);
        for inst in [
            Instrument::None,
            Instrument::Drums,
            Instrument::Sampler(SamplerPatch::default()),
        ] {
            assert!(schedule_synth_note(&mut graph, &inst, &note, 120.0, None, 0.0).is_none());
        }
        assert_eq!(graph.emission_count(), 0);
    }

    #[test]
    fn malformed_envelope_is_rejected() {
        let mut bad = patch();
        bad.envelope.sustain = 2.0;
        let mut graph = RenderGraph::new(RATE, 1);
        let note = Note::new(60, 0, 256, 1.0);
        assert!(schedule_synth_note(&mut graph, &Instrument::Synth(bad), &note, 120.0, None, 0.0).is_none());
    }

    #[test]
    fn note_stops_hard_at_its_end() {
        let mut graph = RenderGraph::new(RATE, 1);
        // 256 ticks at 120 bpm = 0.5 s
        let note = Note::new(60, 0, 256, 1.0);
        let key = schedule_synth_note(&mut graph, &Instrument::Synth(patch()), &note, 120.0, None, 0.25)
            .unwrap();
        let emission = graph.emission(key).unwrap();
        assert_eq!(emission.start_time(), 0.25);
        assert!((emission.stop_time() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn envelope_follows_adsr() {
        let mut graph = RenderGraph::new(RATE, 1);
        let note = Note::new(69, 0, 512, 0.8); // 1 s at 120 bpm
        let key = schedule_synth_note(&mut graph, &Instrument::Synth(patch()), &note, 120.0, None, 0.0)
            .unwrap();
        let gain = graph.emission(key).unwrap().gain();
        assert_eq!(gain.value_at(0.0), 0.0);
        assert!((gain.value_at(0.01) - 0.8).abs() < 1e-5);
        assert!((gain.value_at(0.11) - 0.4).abs() < 1e-5);
        assert!((gain.value_at(0.5) - 0.4).abs() < 1e-5);
        assert!(gain.value_at(0.85) < 0.4);
        assert!(gain.value_at(1.0).abs() < 1e-6);
    }

    #[test]
    fn short_note_compresses_envelope_without_exceeding_velocity() {
        let mut graph = RenderGraph::new(RATE, 1);
        // 32 ticks at 150 bpm = 0.05 s, shorter than attack + decay + release
        let note = Note::new(60, 0, 32, 0.9);
        let key = schedule_synth_note(&mut graph, &Instrument::Synth(patch()), &note, 150.0, None, 0.0)
            .unwrap();
        let gain = graph.emission(key).unwrap().gain();
        for i in 0..=500 {
            let v = gain.value_at(i as f64 * 0.0001);
            assert!(v <= 0.9 + 1e-6, "gain {} at step {}", v, i);
            assert!(v >= 0.0);
        }
        assert!(gain.value_at(0.05).abs() < 1e-6);
    }

    #[test]
    fn live_voice_sustains_until_released() {
        let mut graph = RenderGraph::new(RATE, 1);
        let mut voice =
            trigger_synth_voice(&mut graph, &Instrument::Synth(patch()), 60, 1.0, None, 0.0).unwrap();
        assert!(graph.emission(voice.key()).unwrap().stop_time().is_infinite());
        assert!((graph.emission(voice.key()).unwrap().gain().value_at(5.0) - 0.5).abs() < 1e-5);

        let stop = voice.release(&mut graph, 2.0).unwrap();
        assert!((stop - (2.0 + 0.3 + RELEASE_EPSILON)).abs() < 1e-12);
        let gain = graph.emission(voice.key()).unwrap().gain();
        assert!((gain.value_at(2.0) - 0.5).abs() < 1e-5);
        assert!(gain.value_at(2.15) < 0.5);
        assert!(gain.value_at(2.3) <= SILENCE_FLOOR + 1e-6);

        assert!(voice.release(&mut graph, 2.1).is_none());
    }

    #[test]
    fn live_voice_is_reaped_after_release() {
        let mut graph = RenderGraph::new(RATE, 1);
        let mut voice =
            trigger_synth_voice(&mut graph, &Instrument::Synth(patch()), 60, 1.0, None, 0.0).unwrap();
        graph.advance(800);
        let now = graph.current_time();
        voice.release(&mut graph, now);
        graph.advance(RATE as usize);
        assert!(!graph.contains(voice.key()));
    }
}

//! Procedural drum voices. No sample data involved.

use cz_ir::{DrumSound, FilterKind, Waveform};

use crate::graph::{BusKey, Emission, EmissionKey, RenderGraph, Source};

const KICK_START_HZ: f32 = 150.0;
const KICK_END_HZ: f32 = 0.01;
const KICK_SWEEP: f64 = 0.15;
const KICK_DECAY: f64 = 0.2;

const SNARE_BAND_HZ: f32 = 1_500.0;
const SNARE_DECAY: f64 = 0.1;

const HAT_CUTOFF_HZ: f32 = 7_000.0;
const CLOSED_HAT_DECAY: f64 = 0.05;
const OPEN_HAT_DECAY: f64 = 0.2;

/// Level the amplitude decays toward before the hard stop.
const DECAY_TARGET: f32 = 0.01;

/// Set `velocity` at `start`, decaying exponentially until `start + length`.
fn decaying(emission: &mut Emission, velocity: f32, start: f64, length: f64) {
    emission
        .gain_mut()
        .set_value_at_time(velocity, start)
        .exponential_ramp_to_value_at_time(DECAY_TARGET * velocity, start + length);
}

/// Sine with a falling pitch sweep.
pub fn schedule_kick(
    graph: &mut RenderGraph,
    bus: Option<BusKey>,
    start_time: f64,
    velocity: f32,
) -> EmissionKey {
    let mut osc = Source::oscillator(Waveform::Sine, KICK_START_HZ as f64, 0.0);
    if let Some(freq) = osc.frequency_mut() {
        freq.set_value_at_time(KICK_START_HZ, start_time)
            .exponential_ramp_to_value_at_time(KICK_END_HZ, start_time + KICK_SWEEP);
    }
    let mut emission = Emission::new(bus, start_time, start_time + KICK_DECAY).with_source(osc);
    decaying(&mut emission, velocity, start_time, KICK_DECAY);
    graph.add_emission(emission)
}

/// Band-passed noise burst.
pub fn schedule_snare(
    graph: &mut RenderGraph,
    bus: Option<BusKey>,
    start_time: f64,
    velocity: f32,
) -> EmissionKey {
    let seed = graph.next_noise_seed();
    let mut emission = Emission::new(bus, start_time, start_time + SNARE_DECAY)
        .with_source(Source::noise(seed))
        .with_filter(FilterKind::BandPass, SNARE_BAND_HZ, 1.0, graph.sample_rate());
    decaying(&mut emission, velocity, start_time, SNARE_DECAY);
    graph.add_emission(emission)
}

/// High-passed noise decaying over `duration` seconds.
pub fn schedule_hat(
    graph: &mut RenderGraph,
    bus: Option<BusKey>,
    start_time: f64,
    duration: f64,
    velocity: f32,
) -> EmissionKey {
    let seed = graph.next_noise_seed();
    let duration = duration.max(0.0);
    let mut emission = Emission::new(bus, start_time, start_time + duration)
        .with_source(Source::noise(seed))
        .with_filter(FilterKind::HighPass, HAT_CUTOFF_HZ, 1.0, graph.sample_rate());
    decaying(&mut emission, velocity, start_time, duration);
    graph.add_emission(emission)
}

/// Schedule any drum sound with its default length.
pub fn schedule_drum(
    graph: &mut RenderGraph,
    sound: DrumSound,
    bus: Option<BusKey>,
    start_time: f64,
    velocity: f32,
) -> EmissionKey {
    let velocity = velocity.clamp(0.0, 1.0);
    match sound {
        DrumSound::Kick => schedule_kick(graph, bus, start_time, velocity),
        DrumSound::Snare => schedule_snare(graph, bus, start_time, velocity),
        DrumSound::ClosedHat => schedule_hat(graph, bus, start_time, CLOSED_HAT_DECAY, velocity),
        DrumSound::OpenHat => schedule_hat(graph, bus, start_time, OPEN_HAT_DECAY, velocity),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u32 = 44_100;

    #[test]
    fn drum_lengths() {
        let mut graph = RenderGraph::new(RATE, 3);
        let cases = [
            (DrumSound::Kick, KICK_DECAY),
            (DrumSound::Snare, SNARE_DECAY),
            (DrumSound::ClosedHat, CLOSED_HAT_DECAY),
            (DrumSound::OpenHat, OPEN_HAT_DECAY),
        ];
        for (sound, length) in cases {
            let key = schedule_drum(&mut graph, sound, None, 1.0, 1.0);
            let em = graph.emission(key).unwrap();
            assert!((em.stop_time() - (1.0 + length)).abs() < 1e-12, "{:?}", sound);
        }
    }

    #[test]
    fn unknown_identifier_plays_closed_hat() {
        let mut graph = RenderGraph::new(RATE, 3);
        let key = schedule_drum(&mut graph, DrumSound::from_name("cowbell"), None, 0.0, 1.0);
        assert!((graph.emission(key).unwrap().stop_time() - CLOSED_HAT_DECAY).abs() < 1e-12);
    }

    #[test]
    fn velocity_scales_amplitude() {
        let mut graph = RenderGraph::new(RATE, 3);
        let key = schedule_drum(&mut graph, DrumSound::Kick, None, 0.0, 0.5);
        let gain = graph.emission(key).unwrap().gain();
        assert!((gain.value_at(0.0) - 0.5).abs() < 1e-6);
        assert!(gain.value_at(0.1) < 0.5);
    }

    #[test]
    fn drums_are_audible_and_finish() {
        let mut graph = RenderGraph::new(RATE, 3);
        schedule_drum(&mut graph, DrumSound::Kick, None, 0.0, 1.0);
        schedule_drum(&mut graph, DrumSound::Snare, None, 0.0, 1.0);
        let mut peak = 0.0f32;
        for _ in 0..2_000 {
            peak = peak.max(graph.render_frame().left.abs());
        }
        assert!(peak > 0.05);
        graph.advance(RATE as usize);
        assert_eq!(graph.emission_count(), 0);
    }
}

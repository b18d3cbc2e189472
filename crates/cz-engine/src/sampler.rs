//! Sample playback voices.

use cz_ir::{AudioSegment, Instrument};

use crate::graph::{BusKey, Emission, EmissionKey, RenderGraph, Source};

/// Play the sampler's loaded buffer from `start_time`.
///
/// The whole buffer plays at its native rate and unity gain; the note's
/// length and velocity do not shape it. Returns `None` if the instrument
/// is not a sampler or has no sample loaded.
pub fn schedule_sampler_note(
    graph: &mut RenderGraph,
    instrument: &Instrument,
    bus: Option<BusKey>,
    start_time: f64,
) -> Option<EmissionKey> {
    let sample = match instrument {
        Instrument::Sampler(patch) => patch.sample.as_ref(),
        Instrument::Synth(_) | Instrument::Drums | Instrument::None => None,
    };
    let Some(sample) = sample else {
        tracing::debug!("sampler has no sample loaded");
        return None;
    };
    if sample.is_empty() {
        return None;
    }

    let stop = start_time + sample.duration_seconds();
    let emission =
        Emission::new(bus, start_time, stop).with_source(Source::buffer(sample.clone(), 0.0));
    Some(graph.add_emission(emission))
}

/// Play an audio clip's segment for at most `clip_seconds`.
pub fn schedule_segment(
    graph: &mut RenderGraph,
    segment: &AudioSegment,
    clip_seconds: f64,
    bus: Option<BusKey>,
    start_time: f64,
) -> Option<EmissionKey> {
    let remaining = segment.buffer.duration_seconds() - segment.offset_seconds;
    let length = remaining.min(clip_seconds);
    if length <= 0.0 {
        tracing::debug!(remaining, clip_seconds, "audio segment has nothing to play");
        return None;
    }

    let emission = Emission::new(bus, start_time, start_time + length).with_source(
        Source::buffer(segment.buffer.clone(), segment.offset_seconds),
    );
    Some(graph.add_emission(emission))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cz_ir::{AudioBuffer, SamplerPatch};
    use std::sync::Arc;

    const RATE: u32 = 1_000;

    fn sample(frames: usize) -> Arc<AudioBuffer> {
        Arc::new(AudioBuffer::from_mono(vec![0.25; frames], RATE))
    }

    #[test]
    fn empty_sampler_schedules_nothing() {
        let mut graph = RenderGraph::new(RATE, 1);
        let inst = Instrument::Sampler(SamplerPatch::default());
        assert!(schedule_sampler_note(&mut graph, &inst, None, 0.0).is_none());
        assert_eq!(graph.emission_count(), 0);
    }

    #[test]
    fn sampler_plays_the_whole_buffer() {
        let mut graph = RenderGraph::new(RATE, 1);
        let inst = Instrument::Sampler(SamplerPatch::with_sample(sample(500)));
        let key = schedule_sampler_note(&mut graph, &inst, None, 1.0).unwrap();
        let emission = graph.emission(key).unwrap();
        assert_eq!(emission.start_time(), 1.0);
        assert!((emission.stop_time() - 1.5).abs() < 1e-12);
        graph.advance(1_000);
        assert!((graph.render_frame().left - 0.25).abs() < 1e-6);
    }

    #[test]
    fn segment_is_bounded_by_clip_length() {
        let mut graph = RenderGraph::new(RATE, 1);
        let segment = AudioSegment {
            buffer: sample(1_000),
            offset_seconds: 0.5,
        };
        let key = schedule_segment(&mut graph, &segment, 0.2, None, 0.0).unwrap();
        assert!((graph.emission(key).unwrap().stop_time() - 0.2).abs() < 1e-12);

        let key = schedule_segment(&mut graph, &segment, 10.0, None, 0.0).unwrap();
        assert!((graph.emission(key).unwrap().stop_time() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn segment_offset_past_end_is_skipped() {
        let mut graph = RenderGraph::new(RATE, 1);
        let segment = AudioSegment {
            buffer: sample(100),
            offset_seconds: 1.0,
        };
        assert!(schedule_segment(&mut graph, &segment, 1.0, None, 0.0).is_none());
    }
}

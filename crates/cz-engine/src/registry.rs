//! Registry of in-flight emissions owned by the transport.
//!
//! Every emission the transport schedules is registered here so that a
//! stop can find and kill it, whichever pass created it. The registry is
//! a single critical section. Callers that also hold the render graph
//! lock must take the graph first.

use std::sync::{Mutex, MutexGuard, PoisonError};

use slotmap::SlotMap;

use crate::graph::{EmissionKey, RenderGraph};

slotmap::new_key_type! {
    /// Identifier of a registered voice.
    pub struct VoiceId;
}

/// An emission the transport is responsible for.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScheduledVoice {
    pub emission: EmissionKey,
    /// Track the voice belongs to
    pub track: usize,
    /// Whether it came from live input rather than a scheduling pass
    pub live: bool,
}

impl ScheduledVoice {
    pub fn scheduled(emission: EmissionKey, track: usize) -> Self {
        Self {
            emission,
            track,
            live: false,
        }
    }

    pub fn live(emission: EmissionKey, track: usize) -> Self {
        Self {
            emission,
            track,
            live: true,
        }
    }
}

/// Lock-guarded arena of scheduled voices.
#[derive(Debug, Default)]
pub struct VoiceRegistry {
    voices: Mutex<SlotMap<VoiceId, ScheduledVoice>>,
}

impl VoiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn voices(&self) -> MutexGuard<'_, SlotMap<VoiceId, ScheduledVoice>> {
        self.voices.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register(&self, voice: ScheduledVoice) -> VoiceId {
        self.voices().insert(voice)
    }

    pub fn get(&self, id: VoiceId) -> Option<ScheduledVoice> {
        self.voices().get(id).copied()
    }

    /// Kill every registered emission immediately and forget it.
    /// Scheduled releases are overridden. Returns how many were killed.
    pub fn stop_all(&self, graph: &mut RenderGraph) -> usize {
        let mut voices = self.voices();
        let mut killed = 0;
        for (_, voice) in voices.drain() {
            if graph.kill(voice.emission) {
                killed += 1;
            }
        }
        killed
    }

    /// Kill only the voices produced by scheduling passes, leaving live
    /// input sounding.
    pub fn stop_scheduled(&self, graph: &mut RenderGraph) -> usize {
        let mut voices = self.voices();
        let mut killed = 0;
        voices.retain(|_, voice| {
            if voice.live {
                return true;
            }
            if graph.kill(voice.emission) {
                killed += 1;
            }
            false
        });
        killed
    }

    /// Forget voices whose emission has finished in the graph.
    pub fn reap_finished(&self, graph: &RenderGraph) -> usize {
        let mut voices = self.voices();
        let before = voices.len();
        voices.retain(|_, voice| graph.contains(voice.emission));
        before - voices.len()
    }

    pub fn len(&self) -> usize {
        self.voices().len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Emission, Source};
    use cz_ir::Waveform;

    fn tone(graph: &mut RenderGraph, stop: f64) -> EmissionKey {
        graph.add_emission(
            Emission::new(None, 0.0, stop).with_source(Source::oscillator(Waveform::Sine, 440.0, 0.0)),
        )
    }

    #[test]
    fn stop_all_kills_everything() {
        let mut graph = RenderGraph::new(8_000, 1);
        let registry = VoiceRegistry::new();
        for _ in 0..4 {
            let key = tone(&mut graph, 10.0);
            registry.register(ScheduledVoice::scheduled(key, 0));
        }
        assert_eq!(registry.stop_all(&mut graph), 4);
        assert!(registry.is_empty());
        assert_eq!(graph.emission_count(), 0);
    }

    #[test]
    fn stop_all_twice_is_harmless() {
        let mut graph = RenderGraph::new(8_000, 1);
        let registry = VoiceRegistry::new();
        assert_eq!(registry.stop_all(&mut graph), 0);
        assert_eq!(registry.stop_all(&mut graph), 0);
    }

    #[test]
    fn stop_scheduled_spares_live_voices() {
        let mut graph = RenderGraph::new(8_000, 1);
        let registry = VoiceRegistry::new();
        let a = tone(&mut graph, 10.0);
        let b = tone(&mut graph, 10.0);
        registry.register(ScheduledVoice::scheduled(a, 0));
        let live = registry.register(ScheduledVoice::live(b, 0));
        assert_eq!(registry.stop_scheduled(&mut graph), 1);
        assert_eq!(registry.len(), 1);
        assert!(registry.get(live).is_some());
        assert!(graph.contains(b));
    }

    #[test]
    fn finished_voices_are_reaped() {
        let mut graph = RenderGraph::new(8_000, 1);
        let registry = VoiceRegistry::new();
        let short = tone(&mut graph, 0.01);
        let long = tone(&mut graph, 10.0);
        registry.register(ScheduledVoice::scheduled(short, 0));
        registry.register(ScheduledVoice::scheduled(long, 0));
        graph.advance(800);
        assert_eq!(registry.reap_finished(&graph), 1);
        assert_eq!(registry.len(), 1);
    }
}

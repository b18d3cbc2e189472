//! Per-track channel strips and the mute/solo rule.

use cz_ir::Track;

use crate::graph::{BusKey, RenderGraph};

/// Whether `track` should be heard given the solo state of `all`.
///
/// Muted tracks are never heard. If any track is soloed, only soloed
/// tracks are heard.
pub fn audibility(track: &Track, all: &[Track]) -> bool {
    let any_soloed = all.iter().any(|t| t.soloed);
    !track.muted && (!any_soloed || track.soloed)
}

/// Gain a track's bus should carry: its volume if audible, else zero.
fn effective_gain(track: &Track, all: &[Track]) -> f32 {
    if audibility(track, all) {
        track.volume
    } else {
        0.0
    }
}

/// One bus per track, in track order.
#[derive(Clone, Debug, Default)]
pub struct MixingGraph {
    buses: Vec<BusKey>,
}

impl MixingGraph {
    /// Create a bus for every track and apply the current mix.
    pub fn build(graph: &mut RenderGraph, tracks: &[Track]) -> Self {
        let mut mixer = Self::default();
        mixer.sync(graph, tracks);
        mixer
    }

    /// Recompute gain and pan for every track.
    ///
    /// Must run after any mute, solo, volume or pan change, since one
    /// track's solo affects all the others.
    pub fn apply(&self, graph: &mut RenderGraph, tracks: &[Track]) {
        for (track, &bus) in tracks.iter().zip(&self.buses) {
            graph.set_bus_gain(bus, effective_gain(track, tracks));
            graph.set_bus_pan(bus, track.pan);
        }
    }

    /// Match the bus count to `tracks`, then apply the mix.
    pub fn sync(&mut self, graph: &mut RenderGraph, tracks: &[Track]) {
        while self.buses.len() < tracks.len() {
            self.buses.push(graph.add_bus());
        }
        while self.buses.len() > tracks.len() {
            if let Some(bus) = self.buses.pop() {
                graph.remove_bus(bus);
            }
        }
        self.apply(graph, tracks);
    }

    /// Bus of the track at `index`.
    pub fn bus(&self, index: usize) -> Option<BusKey> {
        self.buses.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.buses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buses.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cz_ir::Instrument;

    fn track(muted: bool, soloed: bool) -> Track {
        let mut t = Track::new("t", Instrument::None);
        t.muted = muted;
        t.soloed = soloed;
        t
    }

    #[test]
    fn audibility_truth_table() {
        // plain track, nobody soloed
        let all = [track(false, false), track(false, false)];
        assert!(audibility(&all[0], &all));

        // muted is silent whatever the solo state
        for soloed in [false, true] {
            for other_soloed in [false, true] {
                let all = [track(true, soloed), track(false, other_soloed)];
                assert!(!audibility(&all[0], &all));
            }
        }

        // someone else soloed
        let all = [track(false, false), track(false, true)];
        assert!(!audibility(&all[0], &all));

        // soloed is heard regardless of others
        for other_soloed in [false, true] {
            let all = [track(false, true), track(false, other_soloed)];
            assert!(audibility(&all[0], &all));
        }
    }

    #[test]
    fn solo_change_recomputes_every_bus() {
        let mut graph = RenderGraph::new(8_000, 1);
        let mut tracks = vec![track(false, false), track(false, false)];
        tracks[0].set_volume(0.8);
        tracks[1].set_volume(0.6);
        let mixer = MixingGraph::build(&mut graph, &tracks);
        let (a, b) = (mixer.bus(0).unwrap(), mixer.bus(1).unwrap());
        assert_eq!(graph.bus_gain(a), Some(0.8));
        assert_eq!(graph.bus_gain(b), Some(0.6));

        tracks[1].soloed = true;
        mixer.apply(&mut graph, &tracks);
        assert_eq!(graph.bus_gain(a), Some(0.0));
        assert_eq!(graph.bus_gain(b), Some(0.6));
    }

    #[test]
    fn pan_is_applied_even_when_muted() {
        let mut graph = RenderGraph::new(8_000, 1);
        let mut tracks = vec![track(true, false)];
        tracks[0].set_pan(-0.5);
        let mixer = MixingGraph::build(&mut graph, &tracks);
        let bus = mixer.bus(0).unwrap();
        assert_eq!(graph.bus_gain(bus), Some(0.0));
        assert_eq!(graph.bus_pan(bus), Some(-0.5));
    }

    #[test]
    fn sync_follows_track_count() {
        let mut graph = RenderGraph::new(8_000, 1);
        let mut tracks = vec![track(false, false); 3];
        let mut mixer = MixingGraph::build(&mut graph, &tracks);
        assert_eq!(graph.bus_count(), 3);
        tracks.truncate(1);
        mixer.sync(&mut graph, &tracks);
        assert_eq!(mixer.len(), 1);
        assert_eq!(graph.bus_count(), 1);
    }
}

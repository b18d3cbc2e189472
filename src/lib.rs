//! Shared fixtures for the cadenza CLI and integration tests.

use cz_ir::{Clip, Instrument, Note, Project, SamplerPatch, SynthPatch, Track, TICKS_PER_BAR};

/// Two bars of chords, bass, beat and an (initially empty) sampler track.
pub fn demo_project(bpm: f64) -> Project {
    let bars = 2;
    let len = bars * TICKS_PER_BAR;

    let chords = [[60u8, 64, 67], [57, 60, 64]]
        .into_iter()
        .enumerate()
        .flat_map(|(bar, chord)| {
            chord.map(|pitch| Note::new(pitch, bar as u64 * TICKS_PER_BAR, TICKS_PER_BAR - 64, 0.5))
        })
        .collect();
    let bass = (0..bars * 4)
        .map(|beat| Note::new(if beat < 4 { 36 } else { 33 }, beat * 256, 192, 0.8))
        .collect();
    let beat = (0..bars * 8)
        .map(|i| {
            let pitch = match i % 4 {
                0 => 36,
                2 => 38,
                _ => 42,
            };
            Note::new(pitch, i * 128, 64, 0.9)
        })
        .collect();

    let mut project = Project::new(bpm);
    project
        .tracks
        .push(Track::new("pad", Instrument::Synth(SynthPatch::default())).with_clip(Clip::notes(0, len, chords)));
    project
        .tracks
        .push(Track::new("bass", Instrument::Synth(SynthPatch::default())).with_clip(Clip::notes(0, len, bass)));
    project
        .tracks
        .push(Track::new("drums", Instrument::Drums).with_clip(Clip::notes(0, len, beat)));
    project.tracks.push(
        Track::new("sampler", Instrument::Sampler(SamplerPatch::default()))
            .with_clip(Clip::notes(0, len, vec![Note::new(60, 0, 256, 1.0), Note::new(60, 1024, 256, 1.0)])),
    );
    project
}

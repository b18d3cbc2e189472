use criterion::{black_box, criterion_group, criterion_main, Criterion};
use cz_engine::{render_project_to_buffer, EngineConfig, Frame, RenderGraph, ScheduleWindow};
use cz_ir::{Clip, Instrument, Note, Project, SynthPatch, Track};

fn demo_project() -> Project {
    let chords: Vec<Note> = (0..16)
        .flat_map(|bar| {
            [60u8, 64, 67].map(|pitch| Note::new(pitch, bar * 256, 240, 0.7))
        })
        .collect();
    let beat: Vec<Note> = (0..32)
        .map(|i| {
            let pitch = match i % 4 {
                0 => 36,
                2 => 38,
                _ => 42,
            };
            Note::new(pitch, i * 128, 64, 0.9)
        })
        .collect();

    let mut project = Project::new(120.0);
    project.tracks.push(
        Track::new("pad", Instrument::Synth(SynthPatch::default()))
            .with_clip(Clip::notes(0, 4096, chords)),
    );
    project
        .tracks
        .push(Track::new("drums", Instrument::Drums).with_clip(Clip::notes(0, 4096, beat)));
    project
}

fn bench_mixdown(c: &mut Criterion) {
    let project = demo_project();
    let config = EngineConfig::default();
    c.bench_function("mixdown_8s", |b| {
        b.iter(|| render_project_to_buffer(black_box(&project), &config))
    });
}

fn bench_render_block(c: &mut Criterion) {
    let project = demo_project();
    let config = EngineConfig::default();
    let mut graph = RenderGraph::new(config.sample_rate, config.noise_seed);
    let window = ScheduleWindow::offline(project.bpm);
    for track in &project.tracks {
        cz_engine::schedule_track(&mut graph, track, None, &window, |_| {});
    }
    let mut block = vec![Frame::silence(); config.block_size];
    c.bench_function("render_block", |b| {
        b.iter(|| graph.render_block(black_box(&mut block)))
    });
}

criterion_group!(benches, bench_mixdown, bench_render_block);
criterion_main!(benches);

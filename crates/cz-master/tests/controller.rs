//! Controller behaviour without an audio device: the graph clock is
//! driven with `advance` and the playhead with `poll`.

use cz_engine::PollEvent;
use cz_ir::{SynthPatch, TICKS_PER_BAR};
use cz_master::{Clip, Controller, ControllerError, EngineConfig, Instrument, LoopRegion, Note, Project, Track};

const RATE: u32 = 8_000;

fn config() -> EngineConfig {
    EngineConfig {
        sample_rate: RATE,
        ..EngineConfig::default()
    }
}

fn demo_project() -> Project {
    let mut project = Project::new(120.0);
    project.tracks.push(
        Track::new("lead", Instrument::Synth(SynthPatch::default())).with_clip(Clip::notes(
            0,
            1024,
            (0..4).map(|i| Note::new(60 + i as u8, i * 256, 200, 0.8)).collect(),
        )),
    );
    project.tracks.push(
        Track::new("drums", Instrument::Drums).with_clip(Clip::notes(
            0,
            1024,
            vec![Note::new(36, 0, 64, 1.0), Note::new(38, 512, 64, 1.0)],
        )),
    );
    project
}

/// Seconds of graph time to frames.
fn frames(seconds: f64) -> usize {
    (seconds * RATE as f64) as usize
}

#[test]
fn loop_wraps_and_reschedules() {
    let mut project = demo_project();
    project.loop_region = LoopRegion::new(0, TICKS_PER_BAR, true);
    let mut ctl = Controller::new(project, config());

    let stats = ctl.play_manual(0);
    assert!(stats.scheduled > 0);
    assert!(ctl.is_playing());
    assert_eq!(ctl.passes(), 1);

    // 1 bar at 120 bpm is 2 s; 2.1 s is 51 ticks into the next lap
    ctl.advance(frames(2.1));
    assert_eq!(ctl.poll(), PollEvent::Wrapped { from: 1075, to: 51 });
    assert_eq!(ctl.passes(), 2);

    ctl.advance(frames(0.5));
    assert!(matches!(ctl.poll(), PollEvent::Advanced(t) if t > 51));
    assert_eq!(ctl.passes(), 2);
}

#[test]
fn playback_finishes_at_project_end() {
    let mut ctl = Controller::new(demo_project(), config());
    ctl.play_manual(0);
    ctl.advance(frames(2.5));
    assert_eq!(ctl.poll(), PollEvent::Finished);
    assert!(!ctl.is_playing());
    assert_eq!(ctl.position(), TICKS_PER_BAR);
    assert_eq!(ctl.poll(), PollEvent::Idle);
}

#[test]
fn stop_silences_every_voice() {
    let mut ctl = Controller::new(demo_project(), config());
    ctl.play_manual(0);
    assert!(ctl.note_on(0, 72, 1.0).unwrap());
    assert!(ctl.active_voices() > 0);

    ctl.stop();
    assert!(!ctl.is_playing());
    assert_eq!(ctl.active_voices(), 0);
    ctl.stop();
}

#[test]
fn mixer_edits_validate_track_index() {
    let ctl = Controller::new(demo_project(), config());
    ctl.set_track_volume(0, 0.5).unwrap();
    ctl.set_track_pan(1, -0.25).unwrap();
    ctl.set_track_muted(1, true).unwrap();
    ctl.set_track_soloed(0, true).unwrap();

    let project = ctl.project();
    assert_eq!(project.tracks[0].volume, 0.5);
    assert_eq!(project.tracks[1].pan, -0.25);
    assert!(project.tracks[1].muted);
    assert!(project.tracks[0].soloed);

    assert!(matches!(
        ctl.set_track_volume(7, 1.0),
        Err(ControllerError::NoSuchTrack(7))
    ));
    assert!(matches!(ctl.note_on(9, 60, 1.0), Err(ControllerError::NoSuchTrack(9))));
}

#[test]
fn live_note_releases() {
    let ctl = Controller::new(demo_project(), config());
    assert!(ctl.note_on(0, 64, 0.7).unwrap());
    ctl.advance(frames(0.1));
    assert!(ctl.note_off(0, 64));
    assert!(!ctl.note_off(0, 64));
}

#[test]
fn exports_render_the_current_mix() {
    let ctl = Controller::new(demo_project(), config());
    let wav = ctl.render_to_wav().unwrap();
    assert_eq!(&wav[0..4], b"RIFF");
    assert_eq!(&wav[8..12], b"WAVE");

    let midi = ctl.write_note_file();
    assert_eq!(&midi[0..4], b"MThd");

    let stems = ctl.stems().unwrap();
    assert_eq!(stems.len(), 2);

    ctl.set_track_muted(0, true).unwrap();
    ctl.set_track_muted(1, true).unwrap();
    assert!(matches!(ctl.mixdown(), Err(ControllerError::Render(_))));
    assert!(ctl.bounce_track(0).is_ok());
    assert!(matches!(ctl.bounce_track(5), Err(ControllerError::NoSuchTrack(5))));
}

#[test]
fn loaded_sample_becomes_the_instrument() {
    let ctl = Controller::new(demo_project(), config());
    let sample = cz_ir::AudioBuffer::from_mono(vec![0.5; 800], RATE);
    let wav = ctl.write_audio_file(&sample);
    ctl.load_sample(1, &wav).unwrap();
    assert!(matches!(ctl.project().tracks[1].instrument, Instrument::Sampler(_)));

    assert!(matches!(
        ctl.load_sample(1, b"garbage"),
        Err(ControllerError::Format(_))
    ));
}

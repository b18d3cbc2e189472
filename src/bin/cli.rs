//! cadenza CLI: live playback and offline export of a demo project.
//!
//! Usage:
//!   cz-cli play --loop-bars 2
//!   cz-cli mix out.wav
//!   cz-cli stems out/
//!   cz-cli midi out.mid

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use cadenza::demo_project;
use clap::{Parser, Subcommand};
use cz_ir::TICKS_PER_BAR;
use cz_master::{Controller, EngineConfig, LoopRegion};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cz-cli")]
#[command(about = "Play and export cadenza projects", long_about = None)]
struct Cli {
    /// Tempo of the demo project
    #[arg(long, default_value = "120.0", global = true)]
    bpm: f64,

    /// WAV file to load as the sampler track's sample
    #[arg(long, global = true)]
    sample: Option<PathBuf>,

    /// Sample rate for offline renders
    #[arg(short, long, default_value = "44100", global = true)]
    sample_rate: u32,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play through the default output device
    Play {
        /// Bar to start from
        #[arg(long, default_value = "0")]
        from_bar: u64,

        /// Loop the first N bars
        #[arg(long)]
        loop_bars: Option<u64>,

        /// Stop after this many seconds
        #[arg(short, long, default_value = "30.0")]
        duration: f64,
    },
    /// Render the mixdown to a WAV file
    Mix { output: PathBuf },
    /// Render one track, dry, to a WAV file
    Bounce {
        track: usize,
        output: PathBuf,
    },
    /// Render every audible track to its own WAV file
    Stems { dir: PathBuf },
    /// Write the project's notes as a standard note file
    Midi { output: PathBuf },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = EngineConfig {
        sample_rate: cli.sample_rate,
        ..EngineConfig::default()
    };
    let mut ctrl = Controller::new(demo_project(cli.bpm), config);
    if let Some(path) = &cli.sample {
        let sampler = ctrl
            .project()
            .tracks
            .iter()
            .position(|t| matches!(t.instrument, cz_ir::Instrument::Sampler(_)));
        if let Some(index) = sampler {
            ctrl.load_sample(index, &std::fs::read(path)?)?;
        }
    }

    match cli.command {
        Commands::Play {
            from_bar,
            loop_bars,
            duration,
        } => play(&mut ctrl, from_bar * TICKS_PER_BAR, loop_bars, duration)?,
        Commands::Mix { output } => write_export(&output, &ctrl.render_to_wav()?)?,
        Commands::Bounce { track, output } => {
            let buffer = ctrl.bounce_track(track)?;
            write_export(&output, &ctrl.write_audio_file(&buffer))?;
            println!("  {:.2} s", buffer.duration_seconds());
        }
        Commands::Stems { dir } => {
            std::fs::create_dir_all(&dir)?;
            let project = ctrl.project();
            for (index, buffer) in ctrl.stems()? {
                let path = dir.join(format!("{:02}-{}.wav", index, project.tracks[index].name));
                write_export(&path, &ctrl.write_audio_file(&buffer))?;
            }
        }
        Commands::Midi { output } => write_export(&output, &ctrl.write_note_file())?,
    }
    Ok(())
}

fn write_export(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    std::fs::write(path, bytes)?;
    tracing::info!(path = %path.display(), bytes = bytes.len(), "export written");
    println!("Wrote {}", path.display());
    Ok(())
}

fn play(
    ctrl: &mut Controller,
    from_tick: u64,
    loop_bars: Option<u64>,
    duration: f64,
) -> Result<(), Box<dyn std::error::Error>> {
    let rate = ctrl.open_output()?;
    if let Some(bars) = loop_bars {
        ctrl.set_loop_region(LoopRegion::new(0, bars * TICKS_PER_BAR, true));
    }
    let stats = ctrl.play(from_tick);
    println!("Playing at {} Hz ({} events scheduled)...", rate, stats.scheduled);

    let started = std::time::Instant::now();
    while ctrl.is_playing() && started.elapsed().as_secs_f64() < duration {
        let tick = ctrl.position();
        print!("\rBar {:3} | Tick {:6}", tick / TICKS_PER_BAR + 1, tick);
        let _ = std::io::stdout().flush();
        std::thread::sleep(Duration::from_millis(10));
    }
    ctrl.stop();

    println!("\rDone.                    ");
    Ok(())
}

use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::Sender;
use log::{debug, info, warn};

use moodsynth::config::SessionConfig;
use moodsynth::core::arrangement::{Arrangement, ScriptedPhrases};
use moodsynth::core::audio::{
    list_output_devices, AudioDriver, BlockRing, CpalOutput, DeviceConfig, PlaybackClock,
    WavRenderer,
};
use moodsynth::core::instrument::InstrumentBank;
use moodsynth::core::sequencer::Sequencer;
use moodsynth::core::synth::{AudioEngine, Mixer};
use moodsynth::messaging::{MessageBus, SynthMessage};

const MAX_MESSAGES_PER_FRAME: usize = 32;
const FRAME: Duration = Duration::from_millis(1);
const DEFAULT_RENDER_SECONDS: f64 = 30.0;

#[derive(Parser, Debug)]
#[command(name = "moodsynth")]
#[command(about = "Mood-driven software synthesizer", long_about = None)]
struct Cli {
    /// List output devices and exit
    #[arg(long)]
    list_devices: bool,

    /// Output device name
    #[arg(long, conflicts_with = "device_index")]
    device: Option<String>,

    /// Output device index, as printed by --list-devices
    #[arg(long)]
    device_index: Option<usize>,

    /// Render to a WAV file instead of playing live
    #[arg(long, value_name = "WAV")]
    render: Option<PathBuf>,

    /// Stop after this many seconds (render default: 30)
    #[arg(long)]
    seconds: Option<f64>,

    /// Starting mood value
    #[arg(long)]
    mood: Option<i32>,

    /// Tempo in beats per minute
    #[arg(long)]
    tempo: Option<f64>,

    /// Drum groove: backbeat, impeach, eights, four-on-the-floor, two-beat, boom-bap
    #[arg(long)]
    groove: Option<String>,

    /// Key of the lead line: a-minor, a-major
    #[arg(long)]
    key: Option<String>,

    /// Config file (default: <config dir>/moodsynth/config.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the effective config back to the config file
    #[arg(long)]
    save_config: bool,
}

impl Cli {
    fn apply(&self, config: &mut SessionConfig) {
        if let Some(name) = &self.device {
            config.device = Some(name.clone());
        }
        if let Some(index) = self.device_index {
            config.device = None;
            config.device_index = Some(index);
        }
        if let Some(mood) = self.mood {
            config.initial_mood = mood;
        }
        if let Some(tempo) = self.tempo {
            config.tempo = tempo;
        }
        if let Some(groove) = &self.groove {
            config.groove = groove.clone();
        }
        if let Some(key) = &self.key {
            config.key = key.clone();
        }
    }
}

/// Engine, sequencer and mixer wired together for one session.
struct Session {
    engine: Arc<AudioEngine>,
    sequencer: Sequencer,
    mixer: Mixer,
}

impl Session {
    fn new(config: &SessionConfig) -> Result<Self> {
        let engine = Arc::new(AudioEngine::new(InstrumentBank::standard(), config.initial_mood));

        let mut sequencer = config.sequencer().context("Invalid sequencer settings")?;
        config
            .drum_groove()?
            .apply(&mut sequencer, engine.instruments())
            .context("Failed to program drums")?;

        let mut arrangement =
            Arrangement::new(engine.instruments(), Box::new(ScriptedPhrases::blues()))
                .context("Failed to set up arrangement")?;
        arrangement.set_key(config.key()?);
        sequencer.set_measure_callback(arrangement.into_callback(Arc::clone(&engine)));

        let mixer = Mixer::new(Arc::clone(&engine), config.mixer);

        Ok(Self {
            engine,
            sequencer,
            mixer,
        })
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    if cli.list_devices {
        let devices = list_output_devices().context("Failed to enumerate output devices")?;
        for (index, name) in devices.iter().enumerate() {
            println!("{index}: {name}");
        }
        return Ok(());
    }

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => SessionConfig::default_path()?,
    };
    let mut config = if config_path.exists() {
        SessionConfig::load_from_file(&config_path)?
    } else {
        SessionConfig::default()
    };
    cli.apply(&mut config);

    if cli.save_config {
        config.save_to_file(&config_path)?;
        info!("saved config to {}", config_path.display());
    }

    let device = config.device_config().context("Invalid device settings")?;
    let session = Session::new(&config)?;

    match &cli.render {
        Some(path) => render(path, cli.seconds.unwrap_or(DEFAULT_RENDER_SECONDS), device, session),
        None => play_live(&config, device, session, cli.seconds),
    }
}

fn render(path: &Path, seconds: f64, device: DeviceConfig, session: Session) -> Result<()> {
    let Session {
        mut sequencer,
        mut mixer,
        ..
    } = session;

    let renderer = WavRenderer::new(device)?;
    let clock = PlaybackClock::new();
    let summary = renderer
        .render_to_file(path, seconds, &mut sequencer, &mut mixer, &clock)
        .with_context(|| format!("Failed to render {}", path.display()))?;

    println!(
        "wrote {:.2}s ({} frames, {} notes) to {}",
        summary.seconds,
        summary.frames,
        summary.notes,
        path.display()
    );
    Ok(())
}

fn play_live(
    config: &SessionConfig,
    device: DeviceConfig,
    session: Session,
    seconds: Option<f64>,
) -> Result<()> {
    let Session {
        engine,
        mut sequencer,
        mixer,
    } = session;

    let ring = Arc::new(BlockRing::<i16>::new(device.block_count, device.block_samples));
    let (output, sink) = CpalOutput::open(&config.device_selector(), &device, Arc::clone(&ring))
        .context("Failed to open audio output")?;

    let clock = PlaybackClock::new();
    let mut driver = AudioDriver::start(&device, Arc::clone(&ring), mixer, sink, clock.clone())
        .context("Failed to start audio driver")?;

    let bus = MessageBus::new(Arc::clone(&engine));
    spawn_stdin_reader(bus.sender())?;

    println!(
        "playing on {} - type a mood value and press enter, q to quit",
        output.device_name()
    );

    let started = Instant::now();
    let mut last_frame = started;

    loop {
        let frame_start = Instant::now();
        let delta = frame_start.duration_since(last_frame).as_secs_f64();
        last_frame = frame_start;

        let now = clock.time();
        if sequencer.update(delta, now) > 0 {
            engine.add_notes(sequencer.drain_notes());
        }

        if bus.process_messages(&mut sequencer, now, MAX_MESSAGES_PER_FRAME).quit {
            info!("quit requested");
            break;
        }
        if !driver.is_running() {
            warn!("audio driver stopped, ending session");
            break;
        }
        if seconds.is_some_and(|limit| started.elapsed().as_secs_f64() >= limit) {
            break;
        }

        thread::sleep(FRAME);
    }

    driver.stop();
    output.pause();
    info!(
        "session ended: {:.1}s of audio, {} notes still sounding",
        clock.time(),
        engine.note_count()
    );
    Ok(())
}

/// Read mood values from stdin, one per line. `q` quits.
fn spawn_stdin_reader(tx: Sender<SynthMessage>) -> Result<()> {
    thread::Builder::new()
        .name("moodsynth-stdin".into())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else {
                    break;
                };
                let input = line.trim();

                let msg = if input.eq_ignore_ascii_case("q") {
                    SynthMessage::Quit
                } else if let Ok(mood) = input.parse::<i32>() {
                    SynthMessage::SetMood(mood)
                } else {
                    if !input.is_empty() {
                        warn!("expected a mood value or q, got {input:?}");
                    }
                    continue;
                };

                if tx.send(msg).is_err() {
                    break;
                }
            }
            debug!("stdin reader finished");
        })
        .context("Failed to spawn stdin reader")?;

    Ok(())
}

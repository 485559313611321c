use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use elevate_core::{
    AudioEngine, BrainwaveState, InductionController, InductionError, InductionEvent,
    InductionHandle, SessionConfig, SettingsProvider, SoftwareSink, SpectrumProbe,
    DEFAULT_SAMPLE_RATE,
};
use tracing_subscriber::EnvFilter;

mod headless;
mod settings;

use headless::{HeadlessLoop, HeadlessSurface};
use settings::JsonFileSettings;

fn main() -> elevate_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => run_session(args),
        Commands::Probe {
            base,
            offset,
            state,
            seconds,
            sample_rate,
        } => run_probe(base, offset, state, seconds, sample_rate),
        Commands::Defaults { settings } => print_defaults(settings.as_deref()),
        Commands::SaveDefaults { settings, session } => save_defaults(&settings, &session),
    }
}

fn run_session(args: RunArgs) -> elevate_core::Result<()> {
    let config = args.session.resolve(args.settings.as_deref())?;
    tracing::info!(
        base_hz = config.audio.base_frequency,
        offset_hz = config.audio.channel_offset,
        stimuli_type = config.stimuli_type,
        seconds = args.seconds,
        "starting induction session"
    );

    let mut sink = SoftwareSink::new(args.sample_rate);
    let renderer = sink
        .take_renderer()
        .ok_or_else(|| InductionError::audio("tone renderer already claimed"))?;
    let controller = InductionController::new(
        Box::new(sink),
        Box::new(HeadlessSurface::new(args.diameter)),
    );
    let handle = InductionHandle::new(controller);
    handle.start_induction(config)?;

    let mut frame_loop = HeadlessLoop::new(args.fps, args.realtime);
    frame_loop.attach_audio(renderer);
    handle.bind(&mut frame_loop);

    let report = frame_loop.run(args.seconds, |_| {
        for event in handle.drain_events() {
            log_event(&event);
        }
    });

    handle.stop_induction();
    for event in handle.drain_events() {
        log_event(&event);
    }
    tracing::info!(
        frames = report.frames,
        rendered = report.rendered,
        seconds = report.seconds,
        audio_frames = report.audio_frames,
        "session finished"
    );
    Ok(())
}

fn run_probe(
    base: f64,
    offset: Option<f64>,
    state: Option<BrainwaveState>,
    seconds: f64,
    sample_rate: u32,
) -> elevate_core::Result<()> {
    let offset = match (offset, state) {
        (Some(offset), _) => offset,
        (None, Some(state)) => state.band().default,
        (None, None) => elevate_core::config::DEFAULT_CHANNEL_OFFSET,
    };

    let mut sink = SoftwareSink::new(sample_rate);
    let mut renderer = sink
        .take_renderer()
        .ok_or_else(|| InductionError::audio("tone renderer already claimed"))?;
    let mut audio = AudioEngine::new(Box::new(sink));
    let limits = *audio.limits();
    audio.configure(limits, base, offset)?;
    audio.set_volume(1.0);
    audio.start()?;

    let buffer = renderer.render_seconds(seconds);
    let reading = SpectrumProbe::new(renderer.sample_rate()).measure_binaural(&buffer)?;
    audio.stop();

    tracing::info!(
        left_hz = reading.left_hz,
        right_hz = reading.right_hz,
        beat_hz = reading.beat_hz,
        "binaural probe complete"
    );
    println!("{}", serde_json::to_string_pretty(&reading)?);
    Ok(())
}

fn print_defaults(settings: Option<&Path>) -> elevate_core::Result<()> {
    let config = match settings {
        Some(path) => JsonFileSettings::new(path).get_defaults()?,
        None => SessionConfig::default(),
    };
    println!("{}", config.to_json_string_pretty()?);
    Ok(())
}

fn save_defaults(path: &Path, session: &SessionArgs) -> elevate_core::Result<()> {
    let mut settings = JsonFileSettings::new(path);
    let config = session.resolve(Some(path))?;
    settings.set_defaults(&config)?;
    tracing::info!(path = ?settings.path(), "defaults written");
    Ok(())
}

fn log_event(event: &InductionEvent) {
    match event {
        InductionEvent::StatusChanged(status) => tracing::info!(?status, "session status"),
        InductionEvent::PhaseEntered(phase) => tracing::debug!(phase, "phase entered"),
        InductionEvent::CueSkipped { phase, reason } => {
            tracing::warn!(phase, %reason, "cue skipped")
        }
        InductionEvent::AudioDegraded(reason) => tracing::warn!(%reason, "audio degraded"),
        InductionEvent::FrameDropped(reason) => tracing::warn!(%reason, "frame dropped"),
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Binaural beat and breathing-rhythm induction engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a session against a headless surface and the software tone graph.
    Run(RunArgs),
    /// Render binaural tones offline and measure them.
    Probe {
        /// Left channel frequency in Hz.
        #[arg(long, default_value_t = elevate_core::config::DEFAULT_BASE_FREQUENCY)]
        base: f64,
        /// Right channel offset in Hz. Overrides `--state`.
        #[arg(long)]
        offset: Option<f64>,
        /// Brainwave state whose default beat frequency to use.
        #[arg(long)]
        state: Option<BrainwaveState>,
        #[arg(long, default_value_t = 1.0)]
        seconds: f64,
        #[arg(long, default_value_t = DEFAULT_SAMPLE_RATE)]
        sample_rate: u32,
    },
    /// Print the session defaults as JSON.
    Defaults {
        /// Settings file to read instead of the built-in defaults.
        #[arg(long)]
        settings: Option<PathBuf>,
    },
    /// Merge overrides into a settings file.
    SaveDefaults {
        /// Settings file to update.
        settings: PathBuf,
        #[command(flatten)]
        session: SessionArgs,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Session length in seconds.
    #[arg(long, default_value_t = 16.0)]
    seconds: f64,
    #[arg(long, default_value_t = 60)]
    fps: u32,
    /// Pace frames with the wall clock instead of a fixed step.
    #[arg(long)]
    realtime: bool,
    /// Largest ball diameter the headless surface reports.
    #[arg(long, default_value_t = 480.0)]
    diameter: f32,
    #[arg(long, default_value_t = DEFAULT_SAMPLE_RATE)]
    sample_rate: u32,
    /// Settings file providing the starting defaults.
    #[arg(long)]
    settings: Option<PathBuf>,
    #[command(flatten)]
    session: SessionArgs,
}

/// Overrides applied on top of the stored or built-in defaults.
#[derive(Args, Debug)]
struct SessionArgs {
    /// Full session description as JSON. Replaces the stored defaults.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    base: Option<f64>,
    #[arg(long)]
    offset: Option<f64>,
    /// 0 for the colour swap, 1 or 2 for the bouncy ball.
    #[arg(long)]
    stimuli_type: Option<i32>,
    /// Show the visual stimulus.
    #[arg(long)]
    visual: Option<bool>,
    /// Phase durations in seconds: inhale, hold, exhale, hold.
    #[arg(long, value_delimiter = ',')]
    durations: Option<Vec<f64>>,
    /// Tune the beat and palette to a brainwave state.
    #[arg(long)]
    state: Option<BrainwaveState>,
}

impl SessionArgs {
    fn resolve(&self, settings: Option<&Path>) -> elevate_core::Result<SessionConfig> {
        let mut config = match (&self.config, settings) {
            (Some(path), _) => SessionConfig::from_json_str(&std::fs::read_to_string(path)?)?,
            (None, Some(path)) => JsonFileSettings::new(path).get_defaults()?,
            (None, None) => SessionConfig::default(),
        };

        if let Some(stimuli_type) = self.stimuli_type {
            config = config.with_stimuli_type(stimuli_type);
        }
        if let Some(state) = self.state {
            config.apply_brainwave_state(state);
        }
        if let Some(base) = self.base {
            config.audio.base_frequency = base;
        }
        if let Some(offset) = self.offset {
            config.audio.channel_offset = offset;
        }
        if let Some(visual) = self.visual {
            config.enable_visual_stimuli = visual;
        }
        if let Some(durations) = &self.durations {
            let durations: [f64; 4] = durations.as_slice().try_into().map_err(|_| {
                InductionError::config("exactly four phase durations are required")
            })?;
            config.timeline = config.timeline.with_durations(durations)?;
        }

        config.validate()?;
        Ok(config)
    }
}

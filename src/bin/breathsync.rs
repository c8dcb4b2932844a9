use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use breathsync::audio::{AudioInput, SignalKind, SignalPlan, SyntheticInput, WavInput};
use breathsync::calibration::CalibrationReport;
use breathsync::display::{ChannelDisplay, DisplaySink, DisplayUpdate, NullDisplay};
use breathsync::engine::{BreathEngine, Scheduler, SystemScheduler, VirtualScheduler};
use breathsync::narration::{ConsoleNarrator, Narrator, SilentNarrator};
use breathsync::session::SessionSummary;
use breathsync::AppConfig;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::Level;

#[derive(Parser, Debug)]
#[command(
    name = "breathsync",
    about = "Breath detection, calibration and paced-breathing sessions"
)]
struct Cli {
    /// JSON configuration file (assets/breath_config.json or defaults when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log at debug level
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Calibrate and run a session on synthetic audio with a virtual clock
    Simulate {
        /// Override the number of rounds
        #[arg(long)]
        rounds: Option<u32>,
        #[arg(long, default_value_t = 0x5eed_b4ea)]
        seed: u64,
        /// Write the JSON result here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Run the four calibration stages and print the report
    Calibrate {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Calibrate, then run a guided session (Ctrl-C ends it early)
    Session {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Print live detector metrics
    Monitor {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long, default_value_t = 10)]
        seconds: u64,
    },
}

#[derive(Args, Debug)]
struct SourceArgs {
    #[arg(long, value_enum, default_value_t = Source::Synthetic)]
    source: Source,
    /// Recording to replay with `--source wav`
    #[arg(long)]
    wav: Option<PathBuf>,
    /// Seed for the synthetic source
    #[arg(long, default_value_t = 0x5eed_b4ea)]
    seed: u64,
    /// Run on a virtual clock instead of wall-clock time
    #[arg(long)]
    fast: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Source {
    Synthetic,
    Wav,
    Mic,
}

#[derive(Serialize)]
struct SimulationPayload {
    report: CalibrationReport,
    summary: SessionSummary,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

async fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let mut config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Simulate {
            rounds,
            seed,
            output,
        } => {
            if let Some(rounds) = rounds {
                config.session.total_rounds = rounds;
            }
            run_simulate(config, seed, output).await
        }
        Commands::Calibrate { source } => run_calibrate(config, source).await,
        Commands::Session { source } => run_session(config, source).await,
        Commands::Monitor { source, seconds } => run_monitor(config, source, seconds).await,
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_config(path: Option<&PathBuf>) -> Result<AppConfig> {
    let Some(path) = path else {
        return Ok(AppConfig::load());
    };
    let contents =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    AppConfig::from_json_str(&contents).with_context(|| format!("parsing {}", path.display()))
}

fn synthetic_plan(config: &AppConfig) -> SignalPlan {
    let session = &config.session;
    SignalPlan::calibration_script()
        .then(SignalKind::Silence, session.intro_pause_ms)
        .breathing(
            session.total_rounds,
            session.target_inhale_ms,
            session.target_exhale_ms,
            session.hold_ms,
        )
}

fn build_input(args: &SourceArgs, config: &AppConfig) -> Result<Box<dyn AudioInput>> {
    match args.source {
        Source::Synthetic => Ok(Box::new(SyntheticInput::with_seed(
            synthetic_plan(config),
            config.audio.fft_size,
            args.seed,
        ))),
        Source::Wav => {
            let path = args
                .wav
                .as_ref()
                .context("--wav <PATH> is required with --source wav")?;
            Ok(Box::new(WavInput::new(path, &config.audio)))
        }
        Source::Mic => microphone_input(config),
    }
}

#[cfg(feature = "microphone")]
fn microphone_input(config: &AppConfig) -> Result<Box<dyn AudioInput>> {
    Ok(Box::new(breathsync::audio::MicrophoneInput::new(
        &config.audio,
    )))
}

#[cfg(not(feature = "microphone"))]
fn microphone_input(_config: &AppConfig) -> Result<Box<dyn AudioInput>> {
    anyhow::bail!("this build has no microphone support (enable the `microphone` feature)")
}

fn scheduler(fast: bool) -> Box<dyn Scheduler> {
    if fast {
        Box::new(VirtualScheduler::new())
    } else {
        Box::new(SystemScheduler::new())
    }
}

fn narrator(fast: bool) -> Box<dyn Narrator> {
    if fast {
        Box::new(SilentNarrator)
    } else {
        Box::new(ConsoleNarrator)
    }
}

async fn run_simulate(config: AppConfig, seed: u64, output: Option<PathBuf>) -> Result<ExitCode> {
    let input = SyntheticInput::with_seed(synthetic_plan(&config), config.audio.fft_size, seed);
    let mut engine = BreathEngine::new(
        config,
        Box::new(input),
        Box::new(VirtualScheduler::new()),
        Box::new(SilentNarrator),
        Box::new(NullDisplay),
    );

    let payload = tokio::task::spawn_blocking(move || -> Result<SimulationPayload> {
        engine.start_audio().context("starting synthetic audio")?;
        let report = engine.calibrate().context("calibration")?;
        let summary = engine.run_session().context("session")?;
        Ok(SimulationPayload { report, summary })
    })
    .await
    .context("simulation task panicked")??;

    let json = serde_json::to_string_pretty(&payload)?;
    if let Some(path) = output {
        fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    } else {
        println!("{json}");
    }
    Ok(ExitCode::from(0))
}

async fn run_calibrate(config: AppConfig, source: SourceArgs) -> Result<ExitCode> {
    run_flow(config, source, false, |engine| {
        let report = engine.calibrate().context("calibration")?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        Ok(())
    })
    .await
}

async fn run_session(config: AppConfig, source: SourceArgs) -> Result<ExitCode> {
    run_flow(config, source, false, |engine| {
        engine.calibrate().context("calibration")?;
        let summary = engine.run_session().context("session")?;
        println!("{}", serde_json::to_string_pretty(&summary)?);
        Ok(())
    })
    .await
}

async fn run_monitor(config: AppConfig, source: SourceArgs, seconds: u64) -> Result<ExitCode> {
    run_flow(config, source, true, move |engine| {
        let frames = engine.monitor(Duration::from_secs(seconds));
        eprintln!("Analysed {frames} frames");
        Ok(())
    })
    .await
}

/// Build the engine, print display updates and run `flow` off the runtime
///
/// Ctrl-C raises the engine's stop signal; the flow then returns its
/// partial result.
async fn run_flow<F>(config: AppConfig, source: SourceArgs, show_debug: bool, flow: F) -> Result<ExitCode>
where
    F: FnOnce(&mut BreathEngine) -> Result<()> + Send + 'static,
{
    let input = build_input(&source, &config)?;
    let display = ChannelDisplay::new(256);
    let mut updates = display.subscribe();
    let mut engine = BreathEngine::new(
        config,
        input,
        scheduler(source.fast),
        narrator(source.fast),
        Box::new(display) as Box<dyn DisplaySink>,
    );

    let stop = engine.stop_signal();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("[CLI] Stop requested");
            stop.stop();
        }
    });

    let printer = tokio::spawn(async move {
        loop {
            match updates.recv().await {
                Ok(update) => print_update(&update, show_debug),
                Err(RecvError::Lagged(skipped)) => {
                    log::debug!("[CLI] Display printer skipped {} updates", skipped)
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    tokio::task::spawn_blocking(move || -> Result<()> {
        engine.start_audio().context("starting audio input")?;
        flow(&mut engine)
    })
    .await
    .context("engine task panicked")??;

    printer.await.context("display printer panicked")?;
    Ok(ExitCode::from(0))
}

fn print_update(update: &DisplayUpdate, show_debug: bool) {
    match update {
        DisplayUpdate::Instruction(text) => println!("» {text}"),
        DisplayUpdate::PhaseLabel(label) => println!("{label}"),
        DisplayUpdate::Round { current, total } => println!("Round {current} / {total}"),
        DisplayUpdate::TalkingWarning(Some(text)) => println!("⚠  {text}"),
        DisplayUpdate::Feedback { score, message } => println!("   sync {score:.0}% - {message}"),
        DisplayUpdate::Debug(metrics) if show_debug => {
            if let Ok(json) = serde_json::to_string(metrics) {
                println!("{json}");
            }
        }
        _ => {}
    }
}

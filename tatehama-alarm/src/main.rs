//! Approach Alarm Engine (tatehama-alarm) - Main entry point
//!
//! Opens the audio device, loads the station alarm sounds and runs the
//! reconciliation loop. Active alarms are driven from a line-oriented
//! command console on stdin.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tatehama_alarm::audio::{AudioDevice, CpalDevice, HeadlessDevice};
use tatehama_alarm::console::{self, Command};
use tatehama_alarm::{AlarmEngine, EngineConfig};
use tatehama_common::blink::spawn_blink_ticker;
use tatehama_common::config::{load_settings, resolve_sound_folder, SOUND_DIR_ENV};
use tatehama_common::ConsoleState;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for tatehama-alarm
#[derive(Parser, Debug)]
#[command(name = "tatehama-alarm")]
#[command(about = "Station approach alarm engine for the interlocking console")]
#[command(version)]
struct Args {
    /// Settings file (TOML)
    #[arg(short, long, env = "TATEHAMA_ALARM_CONFIG")]
    config: Option<PathBuf>,

    /// Folder containing the alarm .wav files (overrides TATEHAMA_SOUND_DIR)
    #[arg(short, long)]
    sound_dir: Option<PathBuf>,

    /// Master volume applied to every sound
    #[arg(short, long)]
    master_volume: Option<f32>,

    /// Run without an audio device
    #[arg(long)]
    headless: bool,

    /// Output device name (default device if omitted)
    #[arg(long, conflicts_with = "headless")]
    device: Option<String>,

    /// List output devices and exit
    #[arg(long)]
    list_devices: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tatehama_alarm=info,tatehama_common=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    if args.list_devices {
        for name in CpalDevice::list_devices().context("Failed to enumerate audio devices")? {
            println!("{}", name);
        }
        return Ok(());
    }

    let mut settings = load_settings(args.config.as_deref()).context("Failed to load settings")?;
    if let Some(volume) = args.master_volume {
        settings.master_volume = volume;
    }

    let sound_folder = resolve_sound_folder(args.sound_dir.as_deref(), SOUND_DIR_ENV, &settings);
    info!("Sound folder: {}", sound_folder.display());

    let state = Arc::new(ConsoleState::with_stations(settings.stations.clone()));
    info!("{} stations configured", state.stations().len());

    let device: Arc<dyn AudioDevice> = if args.headless {
        info!("Running headless (no audio output)");
        Arc::new(HeadlessDevice::default())
    } else {
        match CpalDevice::open(args.device.as_deref()) {
            Ok(device) => Arc::new(device),
            Err(e) => {
                error!("Audio device unavailable: {}", e);
                return Err(e).context("Failed to open audio output");
            }
        }
    };

    let engine = AlarmEngine::start(
        device,
        Arc::clone(&state),
        EngineConfig::from_settings(&settings, sound_folder),
    )
    .context("Failed to start alarm engine")?;

    let cancel = CancellationToken::new();
    let blink = spawn_blink_ticker(
        Arc::clone(&state),
        Duration::from_millis(settings.blink_interval_ms),
        cancel.child_token(),
    );

    info!("Ready. Type 'help' for commands");
    run_console(&engine).await;

    cancel.cancel();
    if let Err(e) = blink.await {
        warn!("Blink ticker ended abnormally: {}", e);
    }
    engine.shutdown().await;

    info!("Shutdown complete");
    Ok(())
}

/// Read commands from stdin until `quit`, end of input or Ctrl+C
async fn run_console(engine: &AlarmEngine) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            result = signal::ctrl_c() => {
                match result {
                    Ok(()) => info!("Received Ctrl+C, shutting down"),
                    Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
                }
                break;
            }
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        info!("End of input, shutting down");
                        break;
                    }
                    Err(e) => {
                        error!("Failed to read command: {}", e);
                        break;
                    }
                };

                if line.trim().is_empty() {
                    continue;
                }

                match line.parse::<Command>() {
                    Ok(Command::Quit) => break,
                    Ok(command) => match console::execute(engine, command).await {
                        Ok(reply) => println!("{}", reply),
                        Err(e) => println!("error: {}", e),
                    },
                    Err(e) => println!("{}", e),
                }
            }
        }
    }
}

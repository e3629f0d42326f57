// src/bin/emg_acquire.rs
//! Command-line front end for emg-acquire
//!
//! List serial ports, or acquire from a port (or the built-in simulator) for a
//! fixed duration, optionally recording the filtered stream.
//!
//! ```bash
//! emg-acquire ports
//! emg-acquire run --port /dev/ttyUSB0 --duration 30 --record ./data --filename trial_01
//! emg-acquire run --simulate --notch --bandpass
//! RUST_LOG=emg_acquire=debug emg-acquire run --simulate
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use emg_acquire::acquisition::{AcquisitionController, AcquisitionStatus, ChannelSink};
use emg_acquire::config::{AcquisitionConfig, ConfigLoader};
use emg_acquire::hal::serial_driver::available_ports;
use emg_acquire::hal::simulator::{Pacing, SimulatorConfig, SimulatorConnector};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "emg-acquire")]
#[command(about = "Serial EMG acquisition with zero-phase filtering", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List serial ports
    Ports,

    /// Acquire for a fixed duration
    Run {
        /// Configuration file (TOML)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Serial port, overriding the configuration
        #[arg(long)]
        port: Option<String>,

        /// Baud rate, overriding the configuration
        #[arg(long)]
        baud: Option<u32>,

        /// Read from the simulated amplifier instead of a serial port
        #[arg(long)]
        simulate: bool,

        /// Seconds to acquire
        #[arg(long, default_value = "10")]
        duration: u64,

        /// Record into this folder
        #[arg(long)]
        record: Option<PathBuf>,

        /// Recording file name (".csv" is appended)
        #[arg(long, default_value = "recording")]
        filename: String,

        /// Replace an existing recording file
        #[arg(long)]
        overwrite: bool,

        /// Subtract the window mean
        #[arg(long)]
        center: bool,

        /// Enable the mains notch
        #[arg(long)]
        notch: bool,

        /// Enable the band-pass
        #[arg(long)]
        bandpass: bool,
    },

    /// Write the effective configuration to a TOML file
    ExportConfig {
        /// Destination file
        path: PathBuf,

        /// Configuration file to start from
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Ports => list_ports(),
        Commands::Run {
            config,
            port,
            baud,
            simulate,
            duration,
            record,
            filename,
            overwrite,
            center,
            notch,
            bandpass,
        } => {
            let mut cfg = load_config(config)?;
            if let Some(port) = port {
                cfg.serial.port_name = port;
            }
            if let Some(baud) = baud {
                cfg.serial.baud_rate = baud;
            }
            cfg.filters.center |= center;
            cfg.filters.notch.enabled |= notch;
            cfg.filters.bandpass.enabled |= bandpass;
            if let Some(folder) = record.clone() {
                cfg.recording.output_folder = folder;
                cfg.recording.filename = filename;
                cfg.recording.overwrite = overwrite;
            }
            cfg.validate().context("invalid configuration")?;

            run(cfg, simulate, Duration::from_secs(duration), record.is_some())
        }
        Commands::ExportConfig { path, config } => {
            let cfg = load_config(config)?;
            ConfigLoader::export_config(&cfg, &path)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!("Configuration written to {}", path.display());
            Ok(())
        }
    }
}

fn load_config(path: Option<PathBuf>) -> Result<AcquisitionConfig> {
    let loader = match path {
        Some(path) => ConfigLoader::with_paths(vec![path]),
        None => ConfigLoader::new(),
    };
    loader.load().context("failed to load configuration")
}

fn list_ports() -> Result<()> {
    let ports = available_ports();
    if ports.is_empty() {
        println!("No serial ports found");
    }
    for port in ports {
        println!("{}", port);
    }
    Ok(())
}

fn run(config: AcquisitionConfig, simulate: bool, duration: Duration, record: bool) -> Result<()> {
    let (sink, receivers) = ChannelSink::bounded(256);
    let sink = Arc::new(sink);

    let controller = if simulate {
        let sim = SimulatorConfig {
            sample_rate_hz: config.stream.sample_rate_hz,
            pacing: Pacing::Realtime,
            ..SimulatorConfig::default()
        };
        AcquisitionController::new(config, SimulatorConnector::new(sim), sink.clone())?
    } else {
        AcquisitionController::with_serial(config, sink.clone())?
    };

    controller.start().context("failed to start acquisition")?;
    if record {
        controller
            .start_configured_recording()
            .context("failed to start recording")?;
    }

    let deadline = Instant::now() + duration;
    let mut chunks = 0u64;
    let mut peak = 0.0f64;

    while Instant::now() < deadline {
        if let Ok(AcquisitionStatus::Faulted(reason)) = receivers.status.try_recv() {
            warn!("Acquisition faulted: {}", reason);
            break;
        }
        match receivers.chunks.recv_timeout(Duration::from_millis(100)) {
            Ok(chunk) => {
                chunks += 1;
                peak = chunk.samples.iter().fold(peak, |m, v| m.max(v.abs()));
                if chunk.sequence % 100 == 0 {
                    info!(sequence = chunk.sequence, peak, "Chunk received");
                }
            }
            Err(_) => continue,
        }
    }

    controller.stop();

    let stats = controller.stats();
    let recorder = controller.recorder_stats();
    info!(
        chunks_received = chunks,
        chunks_dropped = sink.dropped(),
        bytes_read = stats.bytes_read,
        samples_decoded = stats.samples_decoded,
        bytes_discarded = stats.bytes_discarded,
        frames_rejected = stats.frames_rejected,
        filter_faults = stats.filter_faults,
        lines_written = recorder.lines_written,
        lines_dropped = recorder.lines_dropped,
        "Acquisition finished"
    );
    Ok(())
}

/*!
# IR Overlay Application

Receives the proprietary thermal sensor byte stream, renders each frame as
a false-color image and composites it over an annotated visual frame,
holding the last good thermal layer across sensor dropouts.

## Features

- Non-blocking sensor capture over UDP with per-tick frame synchronization
- Per-frame dynamic-range normalization through a 256-entry heat palette
- Bilinear upsampling and fixed-weight alpha compositing
- Replay of recorded sensor captures and a synthetic debug sensor
- Composite PNG snapshots into timestamped session directories

## Usage

### Live capture
```bash
iroverlay run --bind-addr 0.0.0.0 --port 9330 --backdrop scene.png
```

### Replay a recorded capture with detection annotations
```bash
iroverlay run --replay capture.bin --detections detections.json --snapshot-dir ./out
```

### Synthetic sensor (no hardware)
```bash
iroverlay run --debug --ticks 300 --snapshot-dir ./out
```
*/

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use tracing::{info, warn};

mod compositor;
mod config;
mod detection;
mod frame_sync;
mod pipeline;
mod transport;

use config::AppConfig;
use pipeline::Pipeline;
use shared::protocol::FRAME_LENGTH_BYTES;
use shared::PaletteTable;
use transport::{ByteSource, ReplaySource, SyntheticSensor, UdpByteSource};

/// Neutral backdrop used when no visual source stand-in is supplied
const NEUTRAL_GRAY: Rgb<u8> = Rgb([96, 96, 96]);

/// Synthetic sensor emits one frame per this many reads
const SYNTHETIC_CADENCE: u64 = 3;

#[derive(Parser)]
#[command(name = "iroverlay")]
#[command(about = "Thermal sensor capture and false-color overlay compositing")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path
    #[arg(short, long, default_value = "iroverlay.toml")]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the overlay pipeline
    Run(RunOpts),

    /// Generate configuration file
    Config {
        /// Output path for configuration file
        #[arg(short, long, default_value = "iroverlay.toml")]
        output: PathBuf,
    },
}

#[derive(Args)]
struct RunOpts {
    /// UDP bind address for the sensor byte stream (overrides config)
    #[arg(short, long)]
    bind_addr: Option<String>,

    /// UDP port to listen on (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Replay a recorded sensor capture instead of listening
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Generate synthetic sensor data (no hardware needed)
    #[arg(long)]
    debug: bool,

    /// Backdrop image standing in for the external visual source
    #[arg(long)]
    backdrop: Option<PathBuf>,

    /// JSON file of detection records to annotate the backdrop with
    #[arg(long)]
    detections: Option<PathBuf>,

    /// Save composite PNG snapshots under this directory
    #[arg(long)]
    snapshot_dir: Option<PathBuf>,

    /// Snapshot every N ticks
    #[arg(long, default_value = "30")]
    snapshot_every: u64,

    /// Stop after N ticks (0 = run until Ctrl+C)
    #[arg(long, default_value = "0")]
    ticks: u64,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logging goes to stderr so stdout stays clean for tooling
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Some(Commands::Run(opts)) => run_overlay(cli.config, opts),
        Some(Commands::Config { output }) => generate_config_file(output),
        None => run_overlay(cli.config, RunOpts::default_from_config()),
    }
}

impl RunOpts {
    /// Plain config-file run with no CLI overrides
    fn default_from_config() -> Self {
        Self {
            bind_addr: None,
            port: None,
            replay: None,
            debug: false,
            backdrop: None,
            detections: None,
            snapshot_dir: None,
            snapshot_every: 30,
            ticks: 0,
        }
    }
}

/// Run the tick loop until cancelled or the tick budget is spent
fn run_overlay(config_path: PathBuf, opts: RunOpts) -> Result<()> {
    let config = AppConfig::load_from_file(&config_path).unwrap_or_else(|_| {
        info!("no config at {}, using defaults", config_path.display());
        AppConfig::new()
    });

    // Startup resources; any failure here terminates before the tick loop
    let mut source = open_sensor_source(&config, &opts)?;
    let visual = build_visual_frame(&config, &opts)?;
    let palette = PaletteTable::builtin()?;
    let mut pipeline = Pipeline::new(palette, config.overlay.thermal_weight);

    let snapshot_dir = prepare_snapshot_dir(opts.snapshot_dir.as_deref())?;
    let snapshot_every = opts.snapshot_every.max(1);

    // Cooperative shutdown, checked once per tick boundary
    let running = Arc::new(AtomicBool::new(true));
    let running_handler = Arc::clone(&running);
    ctrlc::set_handler(move || {
        eprintln!("\nReceived Ctrl+C, shutting down gracefully...");
        running_handler.store(false, Ordering::SeqCst);
    })?;

    println!("Starting thermal overlay pipeline");
    println!(
        "Composite resolution: {}x{}, thermal weight {:.2}",
        visual.width(),
        visual.height(),
        config.overlay.thermal_weight
    );

    let tick_interval = Duration::from_millis(config.overlay.tick_interval_ms);
    let stats_interval = Duration::from_secs(config.overlay.stats_interval_seconds.max(1));
    let mut last_stats = Instant::now();
    let mut tick: u64 = 0;
    let mut thermal_seen = false;

    while running.load(Ordering::SeqCst) {
        tick += 1;
        let composite = pipeline.tick(source.as_mut(), &visual);

        if !thermal_seen && pipeline.has_thermal_layer() {
            info!("first thermal frame acquired at tick {}", tick);
            thermal_seen = true;
        }

        if let Some(dir) = &snapshot_dir {
            if tick % snapshot_every == 0 {
                let path = dir.join(format!("{:08}.png", tick));
                if let Err(e) = composite.save(&path) {
                    warn!("failed to save snapshot {}: {}", path.display(), e);
                }
            }
        }

        if last_stats.elapsed() >= stats_interval {
            let (frames, short_reads, signature_errors) = pipeline.stats();
            info!(
                "tick {}: {} frames decoded, {} short reads, {} signature errors",
                tick, frames, short_reads, signature_errors
            );
            last_stats = Instant::now();
        }

        if opts.ticks > 0 && tick >= opts.ticks {
            break;
        }

        thread::sleep(tick_interval);
    }

    let (frames, short_reads, signature_errors) = pipeline.stats();
    println!(
        "Stopped after {} ticks: {} frames decoded, {} short reads, {} signature errors",
        tick, frames, short_reads, signature_errors
    );
    Ok(())
}

/// Select and open the sensor byte source
fn open_sensor_source(config: &AppConfig, opts: &RunOpts) -> Result<Box<dyn ByteSource>> {
    if opts.debug {
        info!("generating synthetic sensor data");
        return Ok(Box::new(SyntheticSensor::new(SYNTHETIC_CADENCE)));
    }

    if let Some(path) = &opts.replay {
        let source = ReplaySource::open(path, FRAME_LENGTH_BYTES)
            .with_context(|| format!("failed to open capture file: {}", path.display()))?;
        return Ok(Box::new(source));
    }

    let bind_addr = opts
        .bind_addr
        .clone()
        .unwrap_or_else(|| config.transport.bind_addr.clone());
    let port = opts.port.unwrap_or(config.transport.port);

    let source = UdpByteSource::bind(&bind_addr, port)
        .with_context(|| format!("failed to open sensor transport on {}:{}", bind_addr, port))?;
    Ok(Box::new(source))
}

/// Build the annotated visual frame the compositor blends against.
///
/// The webcam and detection service are external collaborators; a backdrop
/// image plus a detection record file stand in for them here.
fn build_visual_frame(config: &AppConfig, opts: &RunOpts) -> Result<RgbImage> {
    let mut visual = match &opts.backdrop {
        Some(path) => {
            let img = image::open(path)
                .with_context(|| format!("failed to load backdrop: {}", path.display()))?
                .to_rgb8();
            imageops::resize(
                &img,
                config.display.width,
                config.display.height,
                FilterType::Triangle,
            )
        }
        None => RgbImage::from_pixel(config.display.width, config.display.height, NEUTRAL_GRAY),
    };

    if let Some(path) = &opts.detections {
        let records = detection::load_detections(path)?;
        info!("annotating backdrop with {} detection records", records.len());
        detection::draw_detections(&mut visual, &records);
    }

    Ok(visual)
}

/// Create a timestamped session subdirectory for snapshots
fn prepare_snapshot_dir(base: Option<&std::path::Path>) -> Result<Option<PathBuf>> {
    match base {
        Some(dir) => {
            let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
            let session = dir.join(timestamp);
            std::fs::create_dir_all(&session).with_context(|| {
                format!("failed to create snapshot directory: {}", session.display())
            })?;
            info!("snapshots will be saved to {}", session.display());
            Ok(Some(session))
        }
        None => Ok(None),
    }
}

/// Generate a default configuration file
fn generate_config_file(output_path: PathBuf) -> Result<()> {
    let config = AppConfig::new();
    config.save_to_file(&output_path)?;

    println!("Generated configuration file: {}", output_path.display());
    println!("Edit the file to customize settings, then run:");
    println!("   iroverlay --config {} run", output_path.display());

    Ok(())
}

mod audio_sink;
mod camera;
mod config;
mod window;

use anyhow::{Context, Result};
use audio_sink::SampleSink;
use camera::Camera;
use clap::Parser;
use config::RunnerConfig;
use shadow_keys::core_modules::frame_handoff::{FramePublisher, latest_frame_slot};
use shadow_keys::core_modules::serial_sink::SerialSink;
use shadow_keys::core_modules::utils::image_helper::SnapshotRenderer;
use shadow_keys::pipeline::{EventDispatcher, Renderer, ZoneTable};
use shadow_keys::{FrameSource, RunSummary, ShadowError, ShadowPipeline};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use window::{Display, OpenCvWindow};

const SERIAL_TIMEOUT: Duration = Duration::from_secs(1);

/// Play notes by casting shadows over a row of zones in front of a camera.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// YAML configuration file. Built-in defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Replay a video file instead of reading the live camera.
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Camera index, overriding the configuration.
    #[arg(long)]
    camera: Option<i32>,

    /// Serial device path, overriding the configuration.
    #[arg(long)]
    serial_port: Option<String>,

    #[arg(long)]
    no_serial: bool,

    #[arg(long)]
    no_audio: bool,

    /// Render into a PNG snapshot instead of opening a window.
    #[arg(long)]
    headless: bool,

    /// Where `--headless` writes the last annotated frame.
    #[arg(long, default_value = "shadow_snapshot.png")]
    snapshot: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("shadow_keys=info,shadow_tester=info")),
        )
        .init();

    // --- 1. Configuration ---
    let args = Args::parse();
    let mut config = RunnerConfig::load(args.config.as_deref())?;
    if let Some(index) = args.camera {
        config.camera_index = index;
    }
    if let Some(port) = &args.serial_port {
        config.serial.port = port.clone();
    }

    // --- 2. Video source ---
    let camera = match &args.input {
        Some(path) => Camera::open_file(path),
        None => Camera::open_index(config.camera_index),
    }
    .context("Failed to open the video source")?;
    let (width, height) = camera.frame_size();

    // --- 3. Output sinks ---
    let zones = ZoneTable::from_labels(&config.pipeline.zone_labels)
        .context("Invalid zone labels")?;
    let dispatcher = build_dispatcher(&args, &config, &zones)?;

    // --- 4. Pipeline ---
    let mut pipeline = ShadowPipeline::new(config.pipeline, width, height, dispatcher)
        .context("Invalid pipeline configuration")?;

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Ctrl-C received");
                stop.store(true, Ordering::SeqCst);
            }
        });
    }

    let mut display = if args.headless {
        Display::Snapshot(SnapshotRenderer::new(args.snapshot.clone()))
    } else {
        Display::Window(OpenCvWindow::new(stop.clone()))
    };

    // --- 5. Frame loop ---
    let outcome = match &args.input {
        Some(_) => {
            let mut camera = camera;
            pipeline.run(&mut camera, &mut display, || stop.load(Ordering::SeqCst))
        }
        None => run_live(&mut pipeline, camera, &mut display, stop.clone()).await,
    };
    display.finish();

    let summary = outcome.context("Frame loop aborted")?;
    info!(
        frames = summary.frames,
        presses = summary.presses,
        releases = summary.releases,
        degenerate_frames = summary.degenerate_frames,
        sink_failures = summary.sink_failures,
        "Session finished"
    );
    Ok(())
}

fn build_dispatcher(args: &Args, config: &RunnerConfig, zones: &ZoneTable) -> Result<EventDispatcher> {
    let mut dispatcher = EventDispatcher::new();

    if args.no_serial {
        info!("Serial output disabled");
    } else {
        let port = serialport::new(&config.serial.port, config.serial.baud_rate)
            .timeout(SERIAL_TIMEOUT)
            .open()
            .with_context(|| format!("Failed to open serial port {}", config.serial.port))?;
        info!(
            port = %config.serial.port,
            baud_rate = config.serial.baud_rate,
            "Serial output ready"
        );
        dispatcher.register(Box::new(SerialSink::new(port, zones, &config.serial.codes)));
    }

    if args.no_audio {
        info!("Audio output disabled");
    } else {
        let sink = SampleSink::new(zones, &config.audio.sample_dir, &config.audio.samples)?;
        dispatcher.register(Box::new(sink));
    }

    Ok(dispatcher)
}

/// Reads the camera on a blocking thread until stopped, publishing every frame
/// into the latest-wins slot.
fn capture_loop(
    mut camera: Camera,
    publisher: FramePublisher,
    stop: Arc<AtomicBool>,
) -> Result<(), ShadowError> {
    while !stop.load(Ordering::SeqCst) {
        match camera.next_frame()? {
            Some(frame) => {
                if !publisher.publish(frame) {
                    break;
                }
            }
            None => {
                info!("Camera stream ended");
                break;
            }
        }
    }
    Ok(())
}

/// Live camera mode: capture feeds the handoff on its own thread; detection,
/// dispatch and rendering stay on this one.
async fn run_live<R: Renderer>(
    pipeline: &mut ShadowPipeline,
    camera: Camera,
    renderer: &mut R,
    stop: Arc<AtomicBool>,
) -> Result<RunSummary, ShadowError> {
    let (publisher, mut latest) = latest_frame_slot();
    let capture = {
        let stop = stop.clone();
        tokio::task::spawn_blocking(move || capture_loop(camera, publisher, stop))
    };

    let mut summary = RunSummary::default();
    let mut outcome = Ok(());
    while let Some(frame) = latest.next().await {
        if stop.load(Ordering::SeqCst) {
            info!("Stop requested");
            break;
        }
        match pipeline.process_frame(&frame) {
            Ok(report) => {
                summary.record(&report);
                let overlay = pipeline.overlay(&report);
                renderer.draw_overlay(&frame, &overlay);
            }
            Err(err) => {
                outcome = Err(err);
                break;
            }
        }
    }

    // Wake the capture thread if this side stopped first.
    stop.store(true, Ordering::SeqCst);
    drop(latest);

    let released = pipeline.shutdown();
    summary.record_events(&released);

    match capture.await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => {
            error!(error = %err, "Capture failed");
            outcome = outcome.and(Err(err));
        }
        Err(err) => warn!(error = %err, "Capture thread did not finish cleanly"),
    }

    outcome.map(|()| summary)
}

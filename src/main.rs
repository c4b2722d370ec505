//! Live Camera View CLI
//!
//! Command-line driver that streams frames from a camera, renders each
//! delivered frame into a virtual viewport, and reports what was drawn.

use camera_view::{
    broadcast::Subscriber,
    capture::{Camera, CameraError, DeviceSystem, FileConfig},
    metrics::{MetricsRegistry, MetricsSnapshot},
    render::{DisplayRenderer, DrawCommand, RenderStyle, Viewport},
};
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "camera-view", version, about = "Stream and render a live camera view")]
struct Args {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Device id, overriding the configuration file.
    #[arg(short, long)]
    device: Option<String>,

    /// List available devices and exit.
    #[arg(long)]
    list_devices: bool,

    /// Take one synchronous capture and exit.
    #[arg(long)]
    snapshot: bool,

    /// Number of frames to render (overrides the configuration).
    #[arg(long)]
    frames: Option<u32>,

    /// Viewport width in pixels.
    #[arg(long, default_value_t = 800)]
    width: i32,

    /// Viewport height in pixels.
    #[arg(long, default_value_t = 600)]
    height: i32,

    /// Metrics server port, 0 to disable (overrides the configuration).
    #[arg(long)]
    metrics_port: Option<u16>,
}

#[cfg(feature = "camera")]
fn device_system() -> Arc<dyn DeviceSystem> {
    Arc::new(camera_view::capture::NokhwaSystem::new())
}

#[cfg(not(feature = "camera"))]
fn device_system() -> Arc<dyn DeviceSystem> {
    Arc::new(camera_view::capture::MockDeviceSystem::new().with_device("mock-0", 1280, 720))
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    info!("Camera View v{}", camera_view::VERSION);

    let system = device_system();

    if args.list_devices {
        for device in system.list_devices() {
            println!("\"{}\"", device);
        }
        return;
    }

    let mut config = match &args.config {
        Some(path) => match FileConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => FileConfig::default(),
    };
    if let Some(device) = args.device.clone() {
        config.camera.device_id = Some(device);
    }
    if let Some(frames) = args.frames {
        config.output.frame_count = frames;
        config.output.continuous = false;
    }
    if let Some(port) = args.metrics_port {
        config.output.metrics_port = port;
    }

    let camera = match Camera::new(config.camera.clone(), Arc::clone(&system)) {
        Ok(camera) => camera,
        Err(CameraError::NoDeviceId { camera, available }) => {
            eprintln!("No device id specified for camera {camera:?}. Available device ids are:");
            for id in available {
                eprintln!("  \"{}\"", id);
            }
            eprintln!("Pass one with --device or set camera.device_id in the configuration.");
            std::process::exit(2);
        }
        Err(e) => {
            error!("Failed to configure camera: {}", e);
            std::process::exit(1);
        }
    };

    if args.snapshot {
        match camera.capture() {
            Ok(frame) => println!(
                "Captured frame {} ({}x{}) at {}",
                frame.sequence(),
                frame.width(),
                frame.height(),
                frame.captured_at()
            ),
            Err(e) => {
                error!("Capture failed: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    let registry = match MetricsRegistry::new() {
        Ok(registry) => registry,
        Err(e) => {
            error!("Failed to create metrics registry: {}", e);
            std::process::exit(1);
        }
    };
    #[cfg(feature = "metrics")]
    let metrics_state = spawn_metrics_server(config.output.metrics_port);

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        if let Err(e) = ctrlc::set_handler(move || running.store(false, Ordering::SeqCst)) {
            warn!("Failed to install Ctrl-C handler: {}", e);
        }
    }

    let view = Subscriber::new();
    if let Err(e) = camera.start_continuous_capture(&view, config.view.maximum_fps) {
        error!("Failed to start capture: {}", e);
        std::process::exit(1);
    }

    let renderer = DisplayRenderer::new(RenderStyle::from(&config.view));
    let reticle = config.view.reticle.build();
    let viewport = Viewport::new(args.width, args.height);
    let units_per_pixel = camera.units_per_pixel();

    let mut rendered = 0u32;
    while running.load(Ordering::SeqCst)
        && (config.output.continuous || rendered < config.output.frame_count)
    {
        let frame = view.wait_frame(Duration::from_secs(1));
        if let Some(err) = view.take_error() {
            error!("Camera stopped: {}", err);
            break;
        }
        let Some(frame) = frame else {
            warn!("No frame within one second");
            continue;
        };

        let commands = renderer.render(&viewport, Some(&frame), &units_per_pixel, reticle.as_deref());
        rendered += 1;

        if let Some(DrawCommand::Image { dest, .. }) = commands
            .commands()
            .iter()
            .find(|c| matches!(c, DrawCommand::Image { .. }))
        {
            tracing::debug!(
                sequence = frame.sequence(),
                x = dest.x,
                y = dest.y,
                width = dest.width,
                height = dest.height,
                commands = commands.len(),
                "Rendered frame"
            );
        }

        let snapshot = MetricsSnapshot::from_camera(&camera);
        registry.update(&snapshot);
        #[cfg(feature = "metrics")]
        if let Some(state) = &metrics_state {
            state.blocking_write().update(&snapshot);
        }
    }

    camera.stop_continuous_capture(&view);

    let snapshot = MetricsSnapshot::from_camera(&camera);
    registry.update(&snapshot);
    if let Ok(text) = registry.encode() {
        tracing::debug!("Final metrics:\n{}", text);
    }
    info!(
        "Rendered {} frames: {} captured, {} delivered, {} rate-limited, {} replaced unseen",
        rendered,
        snapshot.frames_captured,
        snapshot.frames_delivered,
        snapshot.frames_rate_limited,
        view.replaced()
    );
}

#[cfg(feature = "metrics")]
fn spawn_metrics_server(
    port: u16,
) -> Option<Arc<tokio::sync::RwLock<camera_view::metrics::MetricsState>>> {
    use camera_view::metrics::{MetricsServer, MetricsServerConfig};

    if port == 0 {
        return None;
    }
    let registry = match MetricsRegistry::new() {
        Ok(registry) => registry,
        Err(e) => {
            warn!("Metrics server disabled: {}", e);
            return None;
        }
    };
    let server = MetricsServer::new(MetricsServerConfig::with_port(port), registry);
    let state = server.state();

    let spawned = std::thread::Builder::new()
        .name("metrics".into())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    error!("Failed to start metrics runtime: {}", e);
                    return;
                }
            };
            if let Err(e) = runtime.block_on(server.run()) {
                error!("Metrics server failed: {}", e);
            }
        });
    if let Err(e) = spawned {
        warn!("Metrics server disabled: {}", e);
        return None;
    }
    Some(state)
}

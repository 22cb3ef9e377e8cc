//! Posture monitor: watches a webcam and speaks up when posture turns bad.

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use opencv::core::Size;
use posture_guard::{
    alert::speaker_from_config,
    app::PostureApp,
    camera::OpenCvCamera,
    config::{AlertMode, Config, GuiMode, EXAMPLE_CONFIG},
    display::{HeadlessDisplay, HighGuiDisplay, PresentationSink},
    overlay::SkeletonOverlay,
    pose_detection::PoseDetector,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Camera index to use
    #[arg(long)]
    cam: Option<i32>,

    /// Path to the pose landmark ONNX model
    #[arg(short, long)]
    model: Option<String>,

    /// GUI display mode (window, none)
    #[arg(short, long)]
    gui: Option<String>,

    /// Open the camera and start checking posture immediately
    #[arg(long)]
    auto_start: bool,

    /// Speak alerts inside the capture loop instead of on a worker thread
    #[arg(long)]
    blocking_speech: bool,

    /// Disable spoken alerts
    #[arg(long)]
    mute: bool,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,

    /// Print an example configuration file and exit
    #[arg(long)]
    print_config: bool,

    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<String>,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    if args.print_config {
        print!("{EXAMPLE_CONFIG}");
        return Ok(());
    }

    // Initialize logger
    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    info!("Posture Guard");

    // Load configuration if provided
    let mut config = if let Some(config_path) = &args.config {
        info!("Loading configuration from: {}", config_path);
        match Config::from_file(config_path) {
            Ok(cfg) => cfg,
            Err(e) => {
                log::warn!("Failed to load config file: {}. Using defaults.", e);
                Config::default()
            }
        }
    } else {
        Config::default()
    };

    apply_overrides(&mut config, &args);
    config.validate().context("Invalid configuration")?;

    let detector = PoseDetector::new(
        &config.model.pose_landmarks,
        config.model.input_size,
        config.model.presence_threshold,
    )
    .context("Failed to load pose landmark model")?;

    let speaker = speaker_from_config(&config.alert)?;

    let sink: Box<dyn PresentationSink> = match config.display.gui_mode {
        GuiMode::Window => Box::new(HighGuiDisplay::new(
            &config.display.window_title,
            Size::new(config.camera.frame_width, config.camera.frame_height),
        )?),
        GuiMode::None => {
            let shutdown = Arc::new(AtomicBool::new(false));
            let flag = Arc::clone(&shutdown);
            ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
                .context("Failed to install Ctrl-C handler")?;
            Box::new(HeadlessDisplay::new(shutdown))
        }
    };

    let camera = OpenCvCamera::new(config.camera.backend);
    let mut app = PostureApp::new(
        config,
        camera,
        Box::new(detector),
        Box::new(SkeletonOverlay::default()),
        speaker,
        sink,
    );
    app.run()?;

    Ok(())
}

/// Command line values take precedence over the configuration file
fn apply_overrides(config: &mut Config, args: &Args) {
    if let Some(cam) = args.cam {
        config.camera.index = cam;
    }
    if let Some(model) = &args.model {
        config.model.pose_landmarks = model.into();
    }
    if let Some(gui) = &args.gui {
        config.display.gui_mode = match gui.as_str() {
            "none" => GuiMode::None,
            _ => GuiMode::Window,
        };
    }
    if args.auto_start {
        config.capture.auto_start = true;
    }
    if args.blocking_speech {
        config.alert.mode = AlertMode::Blocking;
    }
    if args.mute {
        config.alert.enabled = false;
    }
    // Headless runs have no keys to grant access with
    if config.display.gui_mode == GuiMode::None {
        config.capture.auto_start = true;
    }
}

//! `target-loc`: read mode commands on stdin, publish poses on stdout.

use std::io::{self, BufReader};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::LevelFilter;
use target_loc::circle::TargetColor;
use target_loc::{
    spawn_command_reader, CaptureManager, DetectionLoop, JsonLinesPublisher, LocatorConfig,
    LocatorError, ModeCell, Rate, SourceBackend, SourceConfig,
};

#[derive(Parser, Debug)]
#[command(name = "target-loc")]
#[command(about = "Localize a colored circle or a fiducial tag, selected by command bytes on stdin")]
#[command(version)]
struct Cli {
    /// JSON config; command-line flags override its fields.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Camera device index.
    #[arg(long, conflicts_with = "frames")]
    device: Option<i32>,

    /// Replay PNG/JPEG frames from this directory instead of a camera.
    #[arg(long)]
    frames: Option<PathBuf>,

    /// Write annotated frames to the snapshot path.
    #[arg(long)]
    show_image: bool,

    #[arg(long)]
    snapshot_path: Option<PathBuf>,

    #[arg(long)]
    fx: Option<f64>,
    #[arg(long)]
    fy: Option<f64>,
    #[arg(long)]
    px: Option<f64>,
    #[arg(long)]
    py: Option<f64>,

    /// Tag family, e.g. 16h5 or 36h11.
    #[arg(long)]
    tag_code: Option<String>,

    /// Codebook JSON replacing the embedded one.
    #[arg(long)]
    tag_codes_path: Option<PathBuf>,

    /// Tag side length in meters.
    #[arg(long)]
    tag_size: Option<f64>,

    #[arg(long)]
    circle_color: Option<TargetColor>,

    #[arg(long)]
    rate_hz: Option<f64>,

    /// Skip Gauss-Newton refinement of fiducial poses.
    #[arg(long)]
    no_refine: bool,

    /// Command byte applied before stdin is read.
    #[arg(long)]
    initial_command: Option<u8>,

    /// Stop after this many ticks.
    #[arg(long)]
    max_ticks: Option<u64>,

    #[arg(long, default_value = "info")]
    log_level: LevelFilter,

    /// Emit structured JSON logs.
    #[cfg(feature = "tracing")]
    #[arg(long)]
    json_logs: bool,
}

impl Cli {
    fn locator_config(&self) -> Result<LocatorConfig, LocatorError> {
        let mut cfg = match &self.config {
            Some(path) => LocatorConfig::load_json(path)?,
            None => LocatorConfig::default(),
        };
        if let Some(index) = self.device {
            cfg.source = SourceConfig::Device { index };
        }
        if let Some(dir) = &self.frames {
            cfg.source = SourceConfig::Frames { dir: dir.clone() };
        }
        cfg.show_image |= self.show_image;
        if let Some(path) = &self.snapshot_path {
            cfg.snapshot_path = Some(path.clone());
        }
        let k = &mut cfg.intrinsics;
        for (field, value) in [
            (&mut k.fx, self.fx),
            (&mut k.fy, self.fy),
            (&mut k.px, self.px),
            (&mut k.py, self.py),
        ] {
            if let Some(v) = value {
                *field = v;
            }
        }
        if let Some(code) = &self.tag_code {
            cfg.tag_code = code.clone();
        }
        if let Some(path) = &self.tag_codes_path {
            cfg.tag_codes_path = Some(path.clone());
        }
        if let Some(size) = self.tag_size {
            cfg.tag_size = size;
        }
        if let Some(color) = self.circle_color {
            cfg.circle_color = color;
        }
        if let Some(hz) = self.rate_hz {
            cfg.rate_hz = hz;
        }
        if self.no_refine {
            cfg.refine_pose = false;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

#[cfg(feature = "tracing")]
fn init_logging(cli: &Cli) {
    let filter = cli.log_level.to_string().to_ascii_lowercase();
    target_loc::core::init_tracing(cli.json_logs, &filter);
}

#[cfg(not(feature = "tracing"))]
fn init_logging(cli: &Cli) {
    let _ = target_loc::core::init_with_level(cli.log_level);
}

fn run(cli: &Cli) -> Result<(), LocatorError> {
    let cfg = cli.locator_config()?;
    let fiducial = cfg.build_fiducial_detector()?;
    let circle = cfg.build_circle_detector();

    let mut capture = CaptureManager::new(SourceBackend::from_config(&cfg.source)?);
    capture.probe()?;

    let (setter, reader) = ModeCell::new();
    if let Some(command) = cli.initial_command {
        setter.set_mode(command);
    }
    spawn_command_reader(BufReader::new(io::stdin()), setter).map_err(LocatorError::Commands)?;

    let mut looper = DetectionLoop::new(
        reader,
        capture,
        Box::new(circle),
        Box::new(fiducial),
        cfg.build_estimator(),
        JsonLinesPublisher::new(io::stdout().lock()),
    );
    if let Some(viewer) = cfg.build_viewer() {
        looper = looper.with_viewer(Box::new(viewer));
    }

    let mut rate = Rate::new(cfg.rate_hz)?;
    log::info!("running at {:.1} Hz", cfg.rate_hz);
    let ticks = looper.run(&mut rate, cli.max_ticks);
    log::info!("stopped after {ticks} ticks");
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

//! Mode-driven target localization.
//!
//! An inbound command byte selects a [`DetectionMode`]. Every tick the
//! [`DetectionLoop`] reads that mode, opens or releases the capture device to
//! match, runs either the colored-circle or the fiducial detector on one
//! frame, turns the result into a [`TargetPose`] and publishes it together
//! with a mode echo.
//!
//! ```no_run
//! use target_loc::{
//!     CaptureManager, DetectionLoop, JsonLinesPublisher, LocatorConfig, ModeCell, Rate,
//!     SourceBackend,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cfg = LocatorConfig::load_json("locator.json")?;
//! let (setter, reader) = ModeCell::new();
//! setter.set_mode(10);
//!
//! let mut capture = CaptureManager::new(SourceBackend::from_config(&cfg.source)?);
//! capture.probe()?;
//! let mut looper = DetectionLoop::new(
//!     reader,
//!     capture,
//!     Box::new(cfg.build_circle_detector()),
//!     Box::new(cfg.build_fiducial_detector()?),
//!     cfg.build_estimator(),
//!     JsonLinesPublisher::new(std::io::stdout()),
//! );
//! looper.run(&mut Rate::new(cfg.rate_hz)?, Some(100));
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `target_loc::core`: image views, homography, intrinsics, square pose solve.
//! - `target_loc::tags`: tag families, codebooks and the fiducial detector.
//! - `target_loc::circle`: the colored-circle detector.

pub use target_loc_circle as circle;
pub use target_loc_core as core;
pub use target_loc_tags as tags;

pub mod annotate;
pub mod capture;
pub mod command;
pub mod config;
pub mod detector;
mod error;
mod frame;
pub mod mode;
pub mod pose;
pub mod publish;
pub mod runner;
pub mod viewer;

pub use capture::{
    CaptureBackend, CaptureManager, FrameSource, ImageSequenceBackend, SourceBackend,
};
#[cfg(feature = "opencv")]
pub use capture::OpenCvCamera;
pub use command::spawn_command_reader;
pub use config::{LocatorConfig, SourceConfig};
pub use detector::{
    CircleTargetDetector, Detection, FiducialTargetDetector, TargetDetector, TargetKind,
};
pub use error::{CaptureError, ConfigError, LocatorError};
pub use frame::Frame;
pub use mode::{DetectionMode, ModeCell, ModeReader, ModeSetter};
pub use pose::{PoseEstimator, TargetPose, Units};
pub use publish::{JsonLinesPublisher, Publisher};
pub use runner::{DetectionLoop, Rate, TickReport};
pub use viewer::{FrameViewer, SnapshotViewer};

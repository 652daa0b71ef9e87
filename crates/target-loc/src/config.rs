//! Startup configuration, read once and immutable afterwards.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use target_loc_circle::{ColorCircleParams, TargetColor};
use target_loc_core::CameraIntrinsics;
use target_loc_tags::{Dictionary, DictionaryError, TagDetector, TagDetectorParams, TagFamily};

use crate::detector::{CircleTargetDetector, FiducialTargetDetector};
use crate::error::ConfigError;
use crate::pose::PoseEstimator;
use crate::runner::Rate;
use crate::viewer::SnapshotViewer;

/// Where frames come from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceConfig {
    /// Camera device index (needs the `opencv` feature).
    Device { index: i32 },
    /// Directory of PNG/JPEG frames replayed in name order.
    Frames { dir: PathBuf },
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig::Device { index: 0 }
    }
}

const DEFAULT_SNAPSHOT: &str = "target_loc_view.png";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    pub source: SourceConfig,
    pub show_image: bool,
    /// PNG written while `show_image` is set.
    pub snapshot_path: Option<PathBuf>,
    pub intrinsics: CameraIntrinsics,
    /// Marker family name; unknown names fall back to `16h5`.
    pub tag_code: String,
    /// Codebook JSON that replaces the embedded one for `tag_code`.
    pub tag_codes_path: Option<PathBuf>,
    /// Marker side length in meters.
    pub tag_size: f64,
    pub circle_color: TargetColor,
    pub rate_hz: f64,
    pub refine_pose: bool,
    pub tag_detector: TagDetectorParams,
    pub circle_detector: Option<ColorCircleParams>,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            show_image: false,
            snapshot_path: None,
            intrinsics: CameraIntrinsics::default(),
            tag_code: TagFamily::default().name().to_string(),
            tag_codes_path: None,
            tag_size: 0.163513,
            circle_color: TargetColor::default(),
            rate_hz: 30.0,
            refine_pose: true,
            tag_detector: TagDetectorParams::default(),
            circle_detector: None,
        }
    }
}

impl LocatorConfig {
    /// Load a JSON config from disk. Missing fields take their defaults.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if Rate::period_for(self.rate_hz).is_none() {
            return Err(ConfigError::Invalid(format!(
                "rate_hz must be positive with a usable tick period (got {})",
                self.rate_hz
            )));
        }
        if !(self.tag_size.is_finite() && self.tag_size > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "tag_size must be positive (got {})",
                self.tag_size
            )));
        }
        if !self.intrinsics.is_valid() {
            return Err(ConfigError::Invalid(format!(
                "camera intrinsics are not usable: {:?}",
                self.intrinsics
            )));
        }
        Ok(())
    }

    /// Resolve `tag_code`, warning once when it is not a known family.
    pub fn tag_family(&self) -> TagFamily {
        let choice = TagFamily::resolve(&self.tag_code);
        if let Some(rejected) = &choice.rejected {
            log::warn!(
                "unknown tag family {rejected:?}; falling back to {}",
                choice.family
            );
        }
        choice.family
    }

    pub fn build_fiducial_detector(&self) -> Result<FiducialTargetDetector, DictionaryError> {
        let family = self.tag_family();
        let dict = Dictionary::for_family(family, self.tag_codes_path.as_deref())?;
        log::info!("fiducial family {family}: {} codes", dict.len());
        let tags = TagDetector::new(dict, self.tag_detector.clone())?;
        Ok(FiducialTargetDetector::new(tags))
    }

    pub fn build_circle_detector(&self) -> CircleTargetDetector {
        let mut params = self.circle_detector.unwrap_or_default();
        params.color = self.circle_color;
        CircleTargetDetector::new(params)
    }

    pub fn build_estimator(&self) -> PoseEstimator {
        PoseEstimator::new(self.intrinsics, self.tag_size, self.refine_pose)
    }

    /// `Some` only when `show_image` is set.
    pub fn build_viewer(&self) -> Option<SnapshotViewer> {
        self.show_image.then(|| {
            SnapshotViewer::new(
                self.snapshot_path
                    .clone()
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_SNAPSHOT)),
            )
        })
    }
}

//! Colored circle detection.
//!
//! Pixels are classified in HSV space against one target color, the
//! resulting mask is split into connected components and the largest
//! sufficiently round blob is reported.

mod hsv;

use std::fmt;
use std::str::FromStr;

use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use target_loc_core::{label_components, Component, RgbImageView};

pub use hsv::{rgb_to_hsv, Hsv};

/// The one color class tracked by a detector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetColor {
    #[default]
    Red,
    Blue,
}

impl TargetColor {
    /// Hue the class is centered on, in degrees.
    pub fn hue_center(self) -> f32 {
        match self {
            TargetColor::Red => 0.0,
            TargetColor::Blue => 230.0,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TargetColor::Red => "red",
            TargetColor::Blue => "blue",
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown circle color `{0}` (expected red or blue)")]
pub struct UnknownColor(pub String);

impl FromStr for TargetColor {
    type Err = UnknownColor;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "red" => Ok(TargetColor::Red),
            "blue" => Ok(TargetColor::Blue),
            _ => Err(UnknownColor(s.to_string())),
        }
    }
}

impl fmt::Display for TargetColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorCircleParams {
    pub color: TargetColor,
    /// Maximum angular distance from the color's hue, in degrees.
    pub hue_tolerance_deg: f32,
    /// Minimum HSV saturation in `[0, 1]`.
    pub min_saturation: f32,
    /// Minimum HSV value in `[0, 1]`.
    pub min_value: f32,
    pub min_area_px: usize,
    /// Minimum `area / (pi * r_max^2)`; a disk scores close to 1, a square 0.64.
    pub min_fill_ratio: f32,
}

impl Default for ColorCircleParams {
    fn default() -> Self {
        Self {
            color: TargetColor::Red,
            hue_tolerance_deg: 20.0,
            min_saturation: 0.45,
            min_value: 0.25,
            min_area_px: 30,
            min_fill_ratio: 0.75,
        }
    }
}

/// A detected circle in pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CircleDetection {
    pub center: Point2<f64>,
    /// Equivalent-area radius, `sqrt(area / pi)`.
    pub radius: f64,
    pub area_px: usize,
    pub fill_ratio: f64,
}

#[derive(Clone, Debug)]
pub struct ColorCircleDetector {
    params: ColorCircleParams,
}

impl ColorCircleDetector {
    pub fn new(params: ColorCircleParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &ColorCircleParams {
        &self.params
    }

    /// `true` for pixels of the target color.
    pub fn color_mask(&self, img: &RgbImageView<'_>) -> Vec<bool> {
        let p = &self.params;
        let center = p.color.hue_center();
        let mut mask = Vec::with_capacity(img.width * img.height);
        for y in 0..img.height {
            for x in 0..img.width {
                let hsv = rgb_to_hsv(img.pixel(x, y));
                mask.push(
                    hsv.s >= p.min_saturation
                        && hsv.v >= p.min_value
                        && hsv::hue_distance(hsv.h, center) <= p.hue_tolerance_deg,
                );
            }
        }
        mask
    }

    /// Largest round blob of the target color, if any.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", skip(self, img), fields(color = %self.params.color))
    )]
    pub fn detect(&self, img: &RgbImageView<'_>) -> Option<CircleDetection> {
        if img.data.len() < img.width * img.height * 3 {
            return None;
        }
        let mask = self.color_mask(img);
        let comps = label_components(&mask, img.width, img.height, self.params.min_area_px.max(1));
        log::trace!("{} {} blobs", comps.len(), self.params.color);

        comps
            .iter()
            .filter_map(|c| self.score(c))
            .fold(None, |best: Option<CircleDetection>, d| match best {
                Some(b) if b.area_px >= d.area_px => Some(b),
                _ => Some(d),
            })
    }

    fn score(&self, comp: &Component) -> Option<CircleDetection> {
        let r_max = comp
            .boundary
            .iter()
            .map(|p| (p - comp.centroid).norm())
            .fold(0.0f64, f64::max)
            + 0.5;
        let area = comp.area as f64;
        let fill_ratio = area / (std::f64::consts::PI * r_max * r_max);
        (fill_ratio >= self.params.min_fill_ratio as f64).then(|| CircleDetection {
            center: comp.centroid,
            radius: (area / std::f64::consts::PI).sqrt(),
            area_px: comp.area,
            fill_ratio,
        })
    }
}

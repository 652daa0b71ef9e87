//! Pinhole camera intrinsics.

use nalgebra::{Matrix3, Point2, Point3};
use serde::{Deserialize, Serialize};

/// Pinhole camera intrinsics in pixels (no distortion).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CameraIntrinsics {
    /// Focal length in x.
    pub fx: f64,
    /// Focal length in y.
    pub fy: f64,
    /// Principal point x.
    pub px: f64,
    /// Principal point y.
    pub py: f64,
}

impl Default for CameraIntrinsics {
    fn default() -> Self {
        Self {
            fx: 600.0,
            fy: 600.0,
            px: 320.0,
            py: 240.0,
        }
    }
}

impl CameraIntrinsics {
    /// Returns `true` when all values are finite and focal lengths are non-zero.
    pub fn is_valid(&self) -> bool {
        self.fx.is_finite()
            && self.fy.is_finite()
            && self.px.is_finite()
            && self.py.is_finite()
            && self.fx.abs() > 1e-12
            && self.fy.abs() > 1e-12
    }

    /// The calibration matrix `K`.
    pub fn matrix(&self) -> Matrix3<f64> {
        Matrix3::new(
            self.fx, 0.0, self.px, //
            0.0, self.fy, self.py, //
            0.0, 0.0, 1.0,
        )
    }

    /// Project a camera-frame point; `None` behind or on the image plane.
    pub fn project(&self, p: &Point3<f64>) -> Option<Point2<f64>> {
        if p.z <= 1e-12 {
            return None;
        }
        Some(Point2::new(
            self.fx * p.x / p.z + self.px,
            self.fy * p.y / p.z + self.py,
        ))
    }
}

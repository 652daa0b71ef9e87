//! Detection → published pose, one branch per detector kind.

use serde::{Deserialize, Serialize};
use target_loc_core::{quaternion_xyzw, solve_square_pose, CameraIntrinsics};

use crate::detector::{Detection, TargetKind};

/// Units of [`TargetPose::position`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    /// `[x, y, radius]` in image pixels.
    Pixels,
    /// Marker translation in the camera frame.
    Meters,
}

impl TargetKind {
    pub fn units(self) -> Units {
        match self {
            TargetKind::Circle => Units::Pixels,
            TargetKind::Fiducial => Units::Meters,
        }
    }
}

/// The record published once per active tick.
///
/// A missed detection keeps the zero position and identity orientation,
/// with `detected` set to `false`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TargetPose {
    /// Seconds since the Unix epoch.
    pub stamp: f64,
    pub frame_id: String,
    pub detected: bool,
    pub units: Units,
    pub position: [f64; 3],
    /// `[x, y, z, w]`, `w >= 0`.
    pub orientation: [f64; 4],
}

impl TargetPose {
    pub const IDENTITY: [f64; 4] = [0.0, 0.0, 0.0, 1.0];

    pub fn not_detected(kind: TargetKind, stamp: f64) -> Self {
        Self {
            stamp,
            frame_id: kind.frame_id().to_string(),
            detected: false,
            units: kind.units(),
            position: [0.0; 3],
            orientation: Self::IDENTITY,
        }
    }
}

#[derive(Clone, Debug)]
pub struct PoseEstimator {
    pub intrinsics: CameraIntrinsics,
    /// Physical marker side length in meters.
    pub tag_size: f64,
    pub refine: bool,
}

impl PoseEstimator {
    pub fn new(intrinsics: CameraIntrinsics, tag_size: f64, refine: bool) -> Self {
        Self {
            intrinsics,
            tag_size,
            refine,
        }
    }

    /// Build the pose for `kind`. A detection of the other kind is ignored.
    pub fn estimate(
        &self,
        kind: TargetKind,
        detection: Option<&Detection>,
        stamp: f64,
    ) -> TargetPose {
        let mut pose = TargetPose::not_detected(kind, stamp);
        match (kind, detection) {
            (TargetKind::Circle, Some(Detection::Circle(c))) => {
                pose.detected = true;
                pose.position = [c.center.x, c.center.y, c.radius];
            }
            (TargetKind::Fiducial, Some(Detection::Fiducial(tag))) => {
                match solve_square_pose(&tag.corners, self.tag_size, &self.intrinsics, self.refine)
                {
                    Ok(iso) => {
                        let t = iso.translation.vector;
                        pose.detected = true;
                        pose.position = [t.x, t.y, t.z];
                        pose.orientation = quaternion_xyzw(&iso.rotation);
                    }
                    Err(err) => log::debug!("tag {} pose solve failed: {err}", tag.id),
                }
            }
            _ => {}
        }
        pose
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Isometry3, Point2};
    use target_loc_circle::CircleDetection;
    use target_loc_core::square_object_corners;
    use target_loc_tags::{TagDetection, TagFamily};

    fn tag_at(pose: &Isometry3<f64>, side: f64, k: &CameraIntrinsics) -> TagDetection {
        let corners = square_object_corners(side).map(|x| k.project(&(pose * x)).expect("front"));
        TagDetection {
            family: TagFamily::Tag16h5,
            id: 3,
            hamming: 0,
            rotation: 0,
            border_score: 1.0,
            corners,
            center: Point2::new(k.px, k.py),
        }
    }

    #[test]
    fn missing_circle_is_zero_pose() {
        let est = PoseEstimator::new(CameraIntrinsics::default(), 0.163513, true);
        let pose = est.estimate(TargetKind::Circle, None, 12.5);
        assert!(!pose.detected);
        assert_eq!(pose.position, [0.0; 3]);
        assert_eq!(pose.orientation, [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(pose.frame_id, "circle");
        assert_eq!(pose.units, Units::Pixels);
        assert_eq!(pose.stamp, 12.5);
    }

    #[test]
    fn circle_reports_pixel_center_and_radius() {
        let est = PoseEstimator::new(CameraIntrinsics::default(), 0.163513, true);
        let det = Detection::Circle(CircleDetection {
            center: Point2::new(101.5, 64.0),
            radius: 12.25,
            area_px: 471,
            fill_ratio: 0.97,
        });
        let pose = est.estimate(TargetKind::Circle, Some(&det), 0.0);
        assert!(pose.detected);
        assert_eq!(pose.position, [101.5, 64.0, 12.25]);
        assert_eq!(pose.orientation, TargetPose::IDENTITY);
    }

    #[test]
    fn frontal_tag_at_unit_distance() {
        let k = CameraIntrinsics::default();
        let est = PoseEstimator::new(k, 0.163513, true);
        let tag = tag_at(&Isometry3::translation(0.0, 0.0, 1.0), 0.163513, &k);
        let pose = est.estimate(TargetKind::Fiducial, Some(&Detection::Fiducial(tag)), 0.0);

        assert!(pose.detected);
        assert_eq!(pose.frame_id, "apriltag");
        assert_eq!(pose.units, Units::Meters);
        for (got, want) in pose.position.iter().zip([0.0, 0.0, 1.0]) {
            assert_relative_eq!(*got, want, epsilon = 1e-9);
        }
        for (got, want) in pose.orientation.iter().zip(TargetPose::IDENTITY) {
            assert_relative_eq!(*got, want, epsilon = 1e-9);
        }
    }

    #[test]
    fn degenerate_tag_is_not_detected() {
        let est = PoseEstimator::new(CameraIntrinsics::default(), 0.163513, false);
        let mut tag = tag_at(
            &Isometry3::translation(0.0, 0.0, 1.0),
            0.163513,
            &CameraIntrinsics::default(),
        );
        tag.corners = [Point2::new(10.0, 10.0); 4];
        let pose = est.estimate(TargetKind::Fiducial, Some(&Detection::Fiducial(tag)), 0.0);
        assert!(!pose.detected);
        assert_eq!(pose.position, [0.0; 3]);
    }

    #[test]
    fn serializes_with_lowercase_units() {
        let pose = TargetPose::not_detected(TargetKind::Fiducial, 1.0);
        let json = serde_json::to_value(&pose).expect("json");
        assert_eq!(json["units"], "meters");
        assert_eq!(json["frame_id"], "apriltag");
        assert_eq!(json["detected"], false);
    }
}

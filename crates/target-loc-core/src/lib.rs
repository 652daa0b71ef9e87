//! Geometry and image primitives shared by the target-localization crates.
//!
//! Nothing here depends on a concrete image library or camera backend:
//! images are borrowed as plain row-major byte views.

mod camera;
mod components;
mod homography;
mod image;
mod logger;
mod pose;

pub use camera::CameraIntrinsics;
pub use components::{label_components, Component};
pub use homography::{homography_from_4pt, Homography};
pub use image::{
    gray_from_rgb, sample_bilinear, sample_bilinear_u8, sample_mean_3x3, GrayImage,
    GrayImageView, RgbImageView,
};
pub use pose::{quaternion_xyzw, solve_square_pose, square_object_corners, PoseError};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;

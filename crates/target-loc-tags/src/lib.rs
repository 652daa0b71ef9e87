//! AprilTag-style fiducial detection.
//!
//! This crate covers:
//! - the fixed set of supported tag families and their codebooks,
//! - matching observed codes against a codebook in all four rotations,
//! - finding dark quadrilaterals in a grayscale image and decoding them.
//!
//! Pose estimation lives in `target-loc-core`; detections only carry
//! image-space corners.

pub mod builtins;
mod decode;
mod detector;
mod dictionary;
mod family;
mod matcher;
mod quad;
pub mod synthetic;
mod threshold;

pub use detector::{TagDetection, TagDetector, TagDetectorParams};
pub use dictionary::{Dictionary, DictionaryError};
pub use family::{FamilyChoice, TagFamily, UnknownFamily};
pub use matcher::{rotate_code_u64, Match, Matcher};
pub use threshold::binarize_dark;

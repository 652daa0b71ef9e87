//! The detector capability the loop dispatches to, with one adapter per branch.

use serde::Serialize;
use target_loc_circle::{CircleDetection, ColorCircleDetector, ColorCircleParams};
use target_loc_tags::{TagDetection, TagDetector};

use crate::annotate::{draw_circle, draw_cross, draw_line, draw_polygon, GREEN, MAGENTA};
use crate::Frame;

/// Which branch produced a pose; doubles as the published frame id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Circle,
    #[serde(rename = "apriltag")]
    Fiducial,
}

impl TargetKind {
    pub fn frame_id(self) -> &'static str {
        match self {
            TargetKind::Circle => "circle",
            TargetKind::Fiducial => "apriltag",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Detection {
    Circle(CircleDetection),
    Fiducial(TagDetection),
}

pub trait TargetDetector {
    fn kind(&self) -> TargetKind;

    /// Zero or one target in `frame`.
    fn detect(&mut self, frame: &Frame) -> Option<Detection>;

    /// Draw `detection` onto `frame` for display.
    fn annotate(&self, frame: &mut Frame, detection: &Detection);

    fn label(&self) -> &'static str {
        self.kind().frame_id()
    }
}

pub struct CircleTargetDetector {
    inner: ColorCircleDetector,
}

impl CircleTargetDetector {
    pub fn new(params: ColorCircleParams) -> Self {
        Self {
            inner: ColorCircleDetector::new(params),
        }
    }
}

impl TargetDetector for CircleTargetDetector {
    fn kind(&self) -> TargetKind {
        TargetKind::Circle
    }

    fn detect(&mut self, frame: &Frame) -> Option<Detection> {
        let found = self.inner.detect(&frame.rgb_view());
        log::debug!("circle: {}", if found.is_some() { 1 } else { 0 });
        found.map(Detection::Circle)
    }

    fn annotate(&self, frame: &mut Frame, detection: &Detection) {
        if let Detection::Circle(c) = detection {
            let img = frame.image_mut();
            draw_circle(img, c.center, c.radius, GREEN);
            draw_cross(img, c.center, 4.0, GREEN);
        }
    }
}

/// Runs the tag detector on a luma copy of the frame; the first tag wins.
pub struct FiducialTargetDetector {
    inner: TagDetector,
}

impl FiducialTargetDetector {
    pub fn new(inner: TagDetector) -> Self {
        Self { inner }
    }

    pub fn tag_detector(&self) -> &TagDetector {
        &self.inner
    }
}

impl TargetDetector for FiducialTargetDetector {
    fn kind(&self) -> TargetKind {
        TargetKind::Fiducial
    }

    fn detect(&mut self, frame: &Frame) -> Option<Detection> {
        let gray = frame.to_gray();
        let tags = self.inner.detect(&gray.view());
        log::debug!("apriltag: {}", tags.len());
        tags.into_iter().next().map(Detection::Fiducial)
    }

    fn annotate(&self, frame: &mut Frame, detection: &Detection) {
        if let Detection::Fiducial(t) = detection {
            let img = frame.image_mut();
            draw_polygon(img, &t.corners, GREEN);
            // Highlight the canonical top edge.
            draw_line(img, t.corners[0], t.corners[1], MAGENTA);
            draw_cross(img, t.center, 4.0, MAGENTA);
        }
    }
}

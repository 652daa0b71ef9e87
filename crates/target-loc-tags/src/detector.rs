//! End-to-end tag detection on a grayscale image.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use target_loc_core::GrayImageView;

use crate::decode::QuadDecoder;
use crate::quad::{find_quads, QuadParams};
use crate::threshold::binarize_dark;
use crate::{Dictionary, DictionaryError, Matcher, TagFamily};

/// Tuning knobs for [`TagDetector`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagDetectorParams {
    /// Tile side for the local threshold, in pixels.
    pub tile_size: usize,
    /// Minimum local intensity range for a tile to be thresholded locally.
    pub min_contrast: u8,
    /// Smallest dark component considered as a tag border.
    pub min_component_area: usize,
    pub min_side_px: f64,
    /// Required fraction of black border cells.
    pub min_border_score: f32,
    /// Bit errors accepted during lookup; `None` uses the family's
    /// correction capacity capped at 2.
    pub max_hamming: Option<u8>,
}

impl Default for TagDetectorParams {
    fn default() -> Self {
        Self {
            tile_size: 8,
            min_contrast: 20,
            min_component_area: 48,
            min_side_px: 10.0,
            min_border_score: 0.85,
            max_hamming: None,
        }
    }
}

/// One decoded tag.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TagDetection {
    pub family: TagFamily,
    pub id: u32,
    pub hamming: u8,
    /// Quarter turns between the tag's canonical orientation and the image.
    pub rotation: u8,
    pub border_score: f32,
    /// Outer border corners, canonical TL, TR, BR, BL of the tag.
    pub corners: [Point2<f64>; 4],
    pub center: Point2<f64>,
}

#[derive(Clone, Debug)]
pub struct TagDetector {
    matcher: Matcher,
    params: TagDetectorParams,
}

impl TagDetector {
    pub fn new(dict: Dictionary, params: TagDetectorParams) -> Result<Self, DictionaryError> {
        let max_hamming = params
            .max_hamming
            .unwrap_or_else(|| dict.max_correction_bits.min(2));
        Ok(Self {
            matcher: Matcher::new(dict, max_hamming)?,
            params,
        })
    }

    pub fn dictionary(&self) -> &Dictionary {
        self.matcher.dictionary()
    }

    pub fn params(&self) -> &TagDetectorParams {
        &self.params
    }

    /// Detect tags in `img`, in raster order of their outer border.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", skip(self, img), fields(family = %self.dictionary().family))
    )]
    pub fn detect(&self, img: &GrayImageView<'_>) -> Vec<TagDetection> {
        let p = &self.params;
        let mask = binarize_dark(img, p.tile_size, p.min_contrast);
        let quads = find_quads(
            &mask,
            img.width,
            img.height,
            QuadParams {
                min_area_px: p.min_component_area,
                min_side_px: p.min_side_px,
            },
        );

        let dict = self.matcher.dictionary();
        let mut decoder = QuadDecoder::new(dict.marker_size, p.min_border_score, p.min_contrast);
        let half = decoder.cells() as f64 * 0.5;

        let mut out = Vec::new();
        for quad in &quads {
            let Some(obs) = decoder.decode(img, quad) else {
                continue;
            };
            let Some(m) = self.matcher.match_code(obs.code) else {
                continue;
            };
            let r = m.rotation as usize;
            out.push(TagDetection {
                family: dict.family,
                id: m.id,
                hamming: m.hamming,
                rotation: m.rotation,
                border_score: obs.border_score,
                corners: std::array::from_fn(|k| quad[(k + r) % 4]),
                center: obs.grid_to_image.apply(Point2::new(half, half)),
            });
        }

        log::trace!(
            "{} quads, {} tags ({})",
            quads.len(),
            out.len(),
            dict.family
        );
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::{render_tags, tag_corners, TagPlacement};
    use nalgebra::{Isometry3, Translation3, UnitQuaternion};
    use target_loc_core::{CameraIntrinsics, GrayImage};

    const SIZE: f64 = 0.163513;

    fn detector(family: TagFamily) -> TagDetector {
        let dict = Dictionary::for_family(family, None).expect("embedded");
        TagDetector::new(dict, TagDetectorParams::default()).expect("detector")
    }

    fn assert_corners_close(got: &[Point2<f64>; 4], want: &[Point2<f64>; 4], tol: f64) {
        for (g, w) in got.iter().zip(want) {
            assert!((g - w).norm() < tol, "corner {g:?} vs {w:?}");
        }
    }

    #[test]
    fn detects_rotated_tilted_tag_with_canonical_corners() {
        let k = CameraIntrinsics::default();
        let det = detector(TagFamily::Tag16h5);
        let pose = Isometry3::from_parts(
            Translation3::new(0.03, -0.02, 0.9),
            UnitQuaternion::from_euler_angles(0.25, -0.15, 2.0),
        );
        let placement = TagPlacement { id: 11, pose };
        let img = render_tags(det.dictionary(), &[placement], SIZE, &k, 640, 480).expect("render");

        let found = det.detect(&img.view());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, 11);
        assert_eq!(found[0].hamming, 0);
        let want = tag_corners(SIZE, &k, &pose).expect("visible");
        assert_corners_close(&found[0].corners, &want, 0.75);
    }

    #[test]
    fn every_quarter_turn_reports_the_same_top_left() {
        let k = CameraIntrinsics::default();
        let det = detector(TagFamily::Tag25h9);
        for quarter in 0..4 {
            let pose = Isometry3::from_parts(
                Translation3::new(0.0, 0.0, 0.8),
                UnitQuaternion::from_euler_angles(0.0, 0.0, quarter as f64 * std::f64::consts::FRAC_PI_2 + 0.1),
            );
            let img = render_tags(det.dictionary(), &[TagPlacement { id: 4, pose }], SIZE, &k, 640, 480)
                .expect("render");
            let found = det.detect(&img.view());
            assert_eq!(found.len(), 1, "quarter {quarter}");
            assert_eq!(found[0].id, 4);
            let want = tag_corners(SIZE, &k, &pose).expect("visible");
            assert_corners_close(&found[0].corners, &want, 0.75);
        }
    }

    #[test]
    fn every_family_decodes_its_own_tags() {
        let k = CameraIntrinsics::default();
        let pose = Isometry3::from_parts(
            Translation3::new(0.01, 0.02, 0.8),
            UnitQuaternion::from_euler_angles(0.1, 0.05, 0.6),
        );
        for family in TagFamily::ALL {
            let det = detector(family);
            let id = (det.dictionary().len() - 1) as u32;
            let img = render_tags(det.dictionary(), &[TagPlacement { id, pose }], SIZE, &k, 640, 480)
                .expect("render");
            let found = det.detect(&img.view());
            assert_eq!(found.len(), 1, "{family}");
            assert_eq!((found[0].id, found[0].hamming), (id, 0), "{family}");
        }
    }

    #[test]
    fn multiple_tags_come_out_in_raster_order() {
        let k = CameraIntrinsics::default();
        let det = detector(TagFamily::Tag16h5);
        let at = |x: f64, y: f64| Isometry3::translation(x, y, 1.2);
        let placements = [
            TagPlacement { id: 2, pose: at(0.15, 0.12) },
            TagPlacement { id: 9, pose: at(-0.18, -0.1) },
        ];
        let img = render_tags(det.dictionary(), &placements, SIZE, &k, 640, 480).expect("render");

        let ids: Vec<u32> = det.detect(&img.view()).iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![9, 2]);
    }

    #[test]
    fn blank_frame_yields_nothing() {
        let det = detector(TagFamily::Tag16h5);
        let img = GrayImage {
            width: 320,
            height: 240,
            data: vec![200; 320 * 240],
        };
        assert!(det.detect(&img.view()).is_empty());
    }

    #[test]
    fn default_max_hamming_is_capped() {
        let dict = Dictionary::for_family(TagFamily::Tag25h9, None).expect("embedded");
        assert_eq!(dict.max_correction_bits, 4);
        let det = TagDetector::new(dict, TagDetectorParams::default()).expect("detector");
        assert_eq!(det.matcher.max_hamming(), 2);
    }
}

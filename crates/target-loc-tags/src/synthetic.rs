//! Synthetic camera views of tags with exact ground truth.
//!
//! Used by tests across the workspace; the renderer supersamples each
//! pixel so edges are anti-aliased like a real sensor.

use nalgebra::{Isometry3, Matrix3, Point2, Vector3};
use target_loc_core::{square_object_corners, CameraIntrinsics, GrayImage, Homography};

use crate::Dictionary;

const SUPERSAMPLE: usize = 4;
const BACKGROUND: u8 = 255;

/// A tag id placed in the camera frame (marker → camera).
#[derive(Clone, Copy, Debug)]
pub struct TagPlacement {
    pub id: u32,
    pub pose: Isometry3<f64>,
}

/// Projections of the outer border corners, TL, TR, BR, BL.
pub fn tag_corners(
    tag_size: f64,
    k: &CameraIntrinsics,
    pose: &Isometry3<f64>,
) -> Option<[Point2<f64>; 4]> {
    let obj = square_object_corners(tag_size);
    let mut out = [Point2::origin(); 4];
    for (o, p) in out.iter_mut().zip(obj) {
        *o = k.project(&(pose * p))?;
    }
    Some(out)
}

fn plane_to_image(k: &CameraIntrinsics, pose: &Isometry3<f64>) -> Homography {
    let r = pose.rotation.to_rotation_matrix();
    let m = Matrix3::from_columns(&[
        r.matrix().column(0).into_owned(),
        r.matrix().column(1).into_owned(),
        pose.translation.vector,
    ]);
    Homography::new(k.matrix() * m)
}

/// Cell value at marker-plane point `(x, y)`, or `None` off the tag.
fn tag_value(dict: &Dictionary, id: usize, tag_size: f64, x: f64, y: f64) -> Option<u8> {
    let half = 0.5 * tag_size;
    if x < -half || x >= half || y < -half || y >= half {
        return None;
    }
    let cells = dict.marker_size + 2;
    let cx = (((x + half) / tag_size) * cells as f64) as usize;
    let cy = (((y + half) / tag_size) * cells as f64) as usize;
    let (cx, cy) = (cx.min(cells - 1), cy.min(cells - 1));
    if cx == 0 || cy == 0 || cx + 1 == cells || cy + 1 == cells {
        return Some(0);
    }
    let white = dict.cell_is_white(id, cx - 1, cy - 1)?;
    Some(if white { 255 } else { 0 })
}

/// Render `tags` on a white background.
///
/// Returns `None` when an id is not in the dictionary or a tag corner is
/// behind the camera.
pub fn render_tags(
    dict: &Dictionary,
    tags: &[TagPlacement],
    tag_size: f64,
    k: &CameraIntrinsics,
    width: usize,
    height: usize,
) -> Option<GrayImage> {
    let mut img = GrayImage {
        width,
        height,
        data: vec![BACKGROUND; width * height],
    };
    let step = 1.0 / SUPERSAMPLE as f64;

    for tag in tags {
        let id = tag.id as usize;
        if id >= dict.len() {
            return None;
        }
        let corners = tag_corners(tag_size, k, &tag.pose)?;
        let to_plane = plane_to_image(k, &tag.pose).inverse()?;

        let (mut x0, mut y0, mut x1, mut y1) = (f64::MAX, f64::MAX, f64::MIN, f64::MIN);
        for c in &corners {
            x0 = x0.min(c.x);
            y0 = y0.min(c.y);
            x1 = x1.max(c.x);
            y1 = y1.max(c.y);
        }
        let xs = (x0.floor() - 1.0).max(0.0) as usize;
        let ys = (y0.floor() - 1.0).max(0.0) as usize;
        let xe = ((x1.ceil() + 1.0).max(0.0) as usize).min(width);
        let ye = ((y1.ceil() + 1.0).max(0.0) as usize).min(height);

        for py in ys..ye {
            for px in xs..xe {
                let mut sum = 0u32;
                let mut hits = 0u32;
                for sy in 0..SUPERSAMPLE {
                    for sx in 0..SUPERSAMPLE {
                        let u = px as f64 - 0.5 + (sx as f64 + 0.5) * step;
                        let v = py as f64 - 0.5 + (sy as f64 + 0.5) * step;
                        let q = to_plane.h * Vector3::new(u, v, 1.0);
                        if q.z.abs() < 1e-12 {
                            continue;
                        }
                        if let Some(val) = tag_value(dict, id, tag_size, q.x / q.z, q.y / q.z) {
                            sum += val as u32;
                            hits += 1;
                        }
                    }
                }
                if hits == 0 {
                    continue;
                }
                let n = (SUPERSAMPLE * SUPERSAMPLE) as u32;
                let idx = py * width + px;
                let bg = img.data[idx] as u32;
                img.data[idx] = ((sum + bg * (n - hits) + n / 2) / n) as u8;
            }
        }
    }

    Some(img)
}

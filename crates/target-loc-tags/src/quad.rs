//! Quadrilateral candidates from dark connected components.

use nalgebra::{Point2, Vector2};
use target_loc_core::{label_components, Component};

/// Geometric gates for quad candidates.
#[derive(Clone, Copy, Debug)]
pub(crate) struct QuadParams {
    pub min_area_px: usize,
    pub min_side_px: f64,
}

/// Quads (clockwise in image coordinates) in component discovery order.
pub(crate) fn find_quads(
    mask: &[bool],
    width: usize,
    height: usize,
    params: QuadParams,
) -> Vec<[Point2<f64>; 4]> {
    label_components(mask, width, height, params.min_area_px)
        .iter()
        .filter(|c| !c.touches_border(width, height))
        .filter_map(|c| quad_from_component(c, params))
        .collect()
}

fn cross(a: Vector2<f64>, b: Vector2<f64>) -> f64 {
    a.x * b.y - a.y * b.x
}

fn shoelace(q: &[Point2<f64>; 4]) -> f64 {
    (0..4)
        .map(|i| {
            let (a, b) = (q[i], q[(i + 1) % 4]);
            a.x * b.y - b.x * a.y
        })
        .sum()
}

fn rough_corners(comp: &Component) -> Option<[Point2<f64>; 4]> {
    let pts = &comp.boundary;
    let farthest = |from: Point2<f64>| {
        pts.iter().copied().max_by(|a, b| {
            (a - from)
                .norm_squared()
                .total_cmp(&(b - from).norm_squared())
        })
    };

    let p0 = farthest(comp.centroid)?;
    let p2 = farthest(p0)?;
    let diag = p2 - p0;
    let diag_len = diag.norm();
    if diag_len < 1.0 {
        return None;
    }

    let signed = |p: &Point2<f64>| cross(diag, p - p0) / diag_len;
    let p1 = *pts.iter().max_by(|a, b| signed(a).total_cmp(&signed(b)))?;
    let p3 = *pts.iter().min_by(|a, b| signed(a).total_cmp(&signed(b)))?;
    if signed(&p1) < 1.0 || signed(&p3) > -1.0 {
        return None;
    }

    let mut q = [p0, p1, p2, p3];
    if shoelace(&q) < 0.0 {
        q.swap(1, 3);
    }
    Some(q)
}

/// A line through `point` along unit `dir`.
#[derive(Clone, Copy, Debug)]
struct Line {
    point: Point2<f64>,
    dir: Vector2<f64>,
}

fn fit_side(
    boundary: &[Point2<f64>],
    a: Point2<f64>,
    b: Point2<f64>,
    center: Point2<f64>,
) -> Option<Line> {
    let ab = b - a;
    let len = ab.norm();
    if len < 1e-9 {
        return None;
    }
    let dir = ab / len;
    let normal = Vector2::new(-dir.y, dir.x);
    let max_dist = (0.05 * len).max(2.0);

    let support: Vec<Point2<f64>> = boundary
        .iter()
        .copied()
        .filter(|p| {
            let d = p - a;
            let t = d.dot(&dir) / len;
            (0.1..=0.9).contains(&t) && d.dot(&normal).abs() < max_dist
        })
        .collect();
    if support.len() < 3 {
        return None;
    }

    let n = support.len() as f64;
    let mean = support.iter().fold(Vector2::zeros(), |acc, p| acc + p.coords) / n;
    let (mut sxx, mut sxy, mut syy) = (0.0, 0.0, 0.0);
    for p in &support {
        let d = p.coords - mean;
        sxx += d.x * d.x;
        sxy += d.x * d.y;
        syy += d.y * d.y;
    }
    let theta = 0.5 * (2.0 * sxy).atan2(sxx - syy);
    let fit_dir = Vector2::new(theta.cos(), theta.sin());

    // Boundary pixel centers sit half a pixel inside the dark edge.
    let mut out = Vector2::new(-fit_dir.y, fit_dir.x);
    if out.dot(&(mean - center.coords)) < 0.0 {
        out = -out;
    }
    Some(Line {
        point: Point2::from(mean + 0.5 * out),
        dir: fit_dir,
    })
}

fn intersect(l1: &Line, l2: &Line) -> Option<Point2<f64>> {
    let denom = cross(l1.dir, l2.dir);
    if denom.abs() < 1e-6 {
        return None;
    }
    let s = cross(l2.point - l1.point, l2.dir) / denom;
    Some(l1.point + s * l1.dir)
}

fn is_convex(q: &[Point2<f64>; 4]) -> bool {
    (0..4).all(|i| {
        let e0 = q[(i + 1) % 4] - q[i];
        let e1 = q[(i + 2) % 4] - q[(i + 1) % 4];
        cross(e0, e1) > 0.0
    })
}

fn quad_from_component(comp: &Component, params: QuadParams) -> Option<[Point2<f64>; 4]> {
    let rough = rough_corners(comp)?;
    let center = Point2::from(rough.iter().fold(Vector2::zeros(), |acc, p| acc + p.coords) / 4.0);

    let mut lines = [None; 4];
    for (i, line) in lines.iter_mut().enumerate() {
        *line = fit_side(&comp.boundary, rough[i], rough[(i + 1) % 4], center);
    }

    let mut refined = rough;
    for i in 0..4 {
        let (prev, next) = (lines[(i + 3) % 4]?, lines[i]?);
        refined[i] = intersect(&prev, &next)?;
    }

    let max_shift = 0.25 * (0..4)
        .map(|i| (rough[(i + 1) % 4] - rough[i]).norm())
        .fold(f64::INFINITY, f64::min);
    let stable = refined
        .iter()
        .zip(&rough)
        .all(|(r, c)| (r - c).norm() <= max_shift.max(2.0));
    let long_enough = (0..4).all(|i| (refined[(i + 1) % 4] - refined[i]).norm() >= params.min_side_px);

    (stable && long_enough && is_convex(&refined)).then_some(refined)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> QuadParams {
        QuadParams {
            min_area_px: 16,
            min_side_px: 8.0,
        }
    }

    fn filled_rect(w: usize, h: usize, x0: usize, y0: usize, x1: usize, y1: usize) -> Vec<bool> {
        let mut mask = vec![false; w * h];
        for y in y0..y1 {
            for x in x0..x1 {
                mask[y * w + x] = true;
            }
        }
        mask
    }

    #[test]
    fn axis_aligned_square_has_pixel_edge_corners() {
        let (w, h) = (60, 50);
        let mask = filled_rect(w, h, 10, 12, 30, 32);
        let quads = find_quads(&mask, w, h, params());
        assert_eq!(quads.len(), 1);

        let q = quads[0];
        assert!(shoelace(&q) > 0.0);
        let mut expected = vec![
            Point2::new(9.5, 11.5),
            Point2::new(29.5, 11.5),
            Point2::new(29.5, 31.5),
            Point2::new(9.5, 31.5),
        ];
        for c in q {
            let (idx, dist) = expected
                .iter()
                .enumerate()
                .map(|(i, e)| (i, (c - e).norm()))
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .expect("remaining corner");
            assert!(dist < 1e-6, "corner {c:?} off by {dist}");
            expected.remove(idx);
        }
    }

    #[test]
    fn hollow_square_uses_outer_edge() {
        let (w, h) = (60, 60);
        let mut mask = filled_rect(w, h, 10, 10, 40, 40);
        for y in 15..35 {
            for x in 15..35 {
                mask[y * w + x] = false;
            }
        }
        let quads = find_quads(&mask, w, h, params());
        assert_eq!(quads.len(), 1);
        for c in quads[0] {
            assert!((c.x - 9.5).abs() < 1e-6 || (c.x - 39.5).abs() < 1e-6, "{c:?}");
            assert!((c.y - 9.5).abs() < 1e-6 || (c.y - 39.5).abs() < 1e-6, "{c:?}");
        }
    }

    #[test]
    fn border_touching_and_tiny_blobs_are_rejected() {
        let (w, h) = (40, 40);
        let mut mask = filled_rect(w, h, 0, 5, 12, 17);
        for y in 25..29 {
            for x in 25..29 {
                mask[y * w + x] = true;
            }
        }
        assert!(find_quads(&mask, w, h, params()).is_empty());
    }

    #[test]
    fn thin_line_is_not_a_quad() {
        let (w, h) = (60, 20);
        let mask = filled_rect(w, h, 5, 9, 55, 10);
        assert!(find_quads(&mask, w, h, params()).is_empty());
    }
}

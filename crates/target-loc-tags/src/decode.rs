//! Bit sampling inside a candidate quad.

use nalgebra::Point2;
use target_loc_core::{homography_from_4pt, sample_mean_3x3, GrayImageView, Homography};

use crate::threshold::otsu_threshold;

const THRESH_SUBDIV: usize = 3;

/// Raw bits read from one quad, before codebook lookup.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Observation {
    /// Data bits, MSB-first row-major, 1 = white.
    pub code: u64,
    /// Fraction of border cells read as black.
    pub border_score: f32,
    /// Maps cell-grid coordinates `[0, cells]²` onto the image.
    pub grid_to_image: Homography,
}

/// Samples a `(bits + 2)²` cell grid through the quad homography.
///
/// Patches whose intensity range is below `min_contrast` are rejected.
pub(crate) struct QuadDecoder {
    cells: usize,
    min_border_score: f32,
    min_contrast: u8,
    centers: Vec<Point2<f64>>,
    threshold_points: Vec<Point2<f64>>,
    scratch_cells: Vec<u8>,
    scratch_thr: Vec<u8>,
}

impl QuadDecoder {
    pub fn new(bits: usize, min_border_score: f32, min_contrast: u8) -> Self {
        let cells = bits + 2;

        let centers = (0..cells * cells)
            .map(|i| Point2::new((i % cells) as f64 + 0.5, (i / cells) as f64 + 0.5))
            .collect();

        let grid = cells * THRESH_SUBDIV;
        let step = 1.0 / THRESH_SUBDIV as f64;
        let threshold_points = (0..grid * grid)
            .map(|i| {
                Point2::new(
                    ((i % grid) as f64 + 0.5) * step,
                    ((i / grid) as f64 + 0.5) * step,
                )
            })
            .collect();

        Self {
            cells,
            min_border_score,
            min_contrast,
            centers,
            threshold_points,
            scratch_cells: Vec::with_capacity(cells * cells),
            scratch_thr: Vec::with_capacity(grid * grid),
        }
    }

    #[inline]
    pub fn cells(&self) -> usize {
        self.cells
    }

    pub fn decode(
        &mut self,
        img: &GrayImageView<'_>,
        quad: &[Point2<f64>; 4],
    ) -> Option<Observation> {
        let c = self.cells as f64;
        let grid = [
            Point2::new(0.0, 0.0),
            Point2::new(c, 0.0),
            Point2::new(c, c),
            Point2::new(0.0, c),
        ];
        let h = homography_from_4pt(&grid, quad)?;

        self.scratch_cells.clear();
        for p in &self.centers {
            let q = h.apply(*p);
            self.scratch_cells
                .push(sample_mean_3x3(img, q.x as f32, q.y as f32)?);
        }

        self.scratch_thr.clear();
        for p in &self.threshold_points {
            let q = h.apply(*p);
            if let Some(v) = sample_mean_3x3(img, q.x as f32, q.y as f32) {
                self.scratch_thr.push(v);
            }
        }

        let (code, border_score) = self.read_bits()?;
        Some(Observation {
            code,
            border_score,
            grid_to_image: h,
        })
    }

    fn read_bits(&self) -> Option<(u64, f32)> {
        let samples = if self.scratch_thr.is_empty() {
            &self.scratch_cells
        } else {
            &self.scratch_thr
        };
        let lo = samples.iter().copied().min()?;
        let hi = samples.iter().copied().max()?;
        if hi - lo < self.min_contrast {
            return None;
        }
        let thr = otsu_threshold(samples);

        let cells = self.cells;
        let mut border_black = 0u32;
        let mut border_total = 0u32;
        let mut code = 0u64;

        for (i, &v) in self.scratch_cells.iter().enumerate() {
            let (cx, cy) = (i % cells, i / cells);
            let white = v > thr;
            if cx == 0 || cy == 0 || cx + 1 == cells || cy + 1 == cells {
                border_total += 1;
                border_black += u32::from(!white);
            } else {
                code = (code << 1) | u64::from(white);
            }
        }

        let border_score = border_black as f32 / border_total.max(1) as f32;
        (border_score >= self.min_border_score).then_some((code, border_score))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use target_loc_core::GrayImage;

    /// Axis-aligned tag with `px` pixels per cell and a one-cell white margin.
    fn draw_tag(code: u64, bits: usize, px: usize) -> GrayImage {
        let cells = bits + 2;
        let side = (cells + 2) * px;
        let mut img = GrayImage {
            width: side,
            height: side,
            data: vec![255; side * side],
        };
        for cy in 0..cells {
            for cx in 0..cells {
                let border = cx == 0 || cy == 0 || cx + 1 == cells || cy + 1 == cells;
                let white = !border && {
                    let idx = (cy - 1) * bits + (cx - 1);
                    (code >> (bits * bits - 1 - idx)) & 1 == 1
                };
                let v = if white { 255 } else { 0 };
                for y in 0..px {
                    for x in 0..px {
                        let (ix, iy) = ((cx + 1) * px + x, (cy + 1) * px + y);
                        img.data[iy * side + ix] = v;
                    }
                }
            }
        }
        img
    }

    fn quad_for(bits: usize, px: usize) -> [Point2<f64>; 4] {
        let lo = px as f64 - 0.5;
        let hi = ((bits + 3) * px) as f64 - 0.5;
        [
            Point2::new(lo, lo),
            Point2::new(hi, lo),
            Point2::new(hi, hi),
            Point2::new(lo, hi),
        ]
    }

    #[test]
    fn reads_msb_first_white_bits() {
        let code = 0x231b;
        let img = draw_tag(code, 4, 8);
        let mut dec = QuadDecoder::new(4, 0.85, 20);
        assert_eq!(dec.cells(), 6);
        let obs = dec.decode(&img.view(), &quad_for(4, 8)).expect("decoded");
        assert_eq!(obs.code, code);
        assert!((obs.border_score - 1.0).abs() < 1e-6);
        let center = obs.grid_to_image.apply(Point2::new(3.0, 3.0));
        assert!((center.x - 31.5).abs() < 1e-6 && (center.y - 31.5).abs() < 1e-6);
    }

    #[test]
    fn flat_patch_is_rejected() {
        let img = GrayImage {
            width: 64,
            height: 64,
            data: vec![255; 64 * 64],
        };
        let mut dec = QuadDecoder::new(4, 0.85, 20);
        assert!(dec.decode(&img.view(), &quad_for(4, 8)).is_none());
    }
}

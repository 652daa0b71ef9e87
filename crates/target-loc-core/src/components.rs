//! 4-connected component labelling over binary masks.

use nalgebra::Point2;

/// One connected blob of `true` mask pixels.
#[derive(Clone, Debug)]
pub struct Component {
    /// Number of pixels.
    pub area: usize,
    /// Mean pixel position.
    pub centroid: Point2<f64>,
    /// Inclusive bounding box `[x0, y0, x1, y1]`.
    pub bbox: [usize; 4],
    /// Pixels with at least one 4-neighbour outside the component.
    pub boundary: Vec<Point2<f64>>,
}

impl Component {
    /// True when the bounding box reaches the outermost image row or column.
    pub fn touches_border(&self, width: usize, height: usize) -> bool {
        let [x0, y0, x1, y1] = self.bbox;
        x0 == 0 || y0 == 0 || x1 + 1 >= width || y1 + 1 >= height
    }
}

/// Label 4-connected components of `mask` and keep those with at least
/// `min_area` pixels.
///
/// Components are returned in raster order of their first pixel.
pub fn label_components(
    mask: &[bool],
    width: usize,
    height: usize,
    min_area: usize,
) -> Vec<Component> {
    let n = width * height;
    if mask.len() < n {
        return Vec::new();
    }

    let mut visited = vec![false; n];
    let mut stack = Vec::new();
    let mut members = Vec::new();
    let mut out = Vec::new();

    for start in 0..n {
        if !mask[start] || visited[start] {
            continue;
        }

        visited[start] = true;
        stack.push(start);
        members.clear();

        while let Some(idx) = stack.pop() {
            members.push(idx);
            let x = idx % width;
            let y = idx / width;
            for (nx, ny) in neighbours4(x, y, width, height) {
                let nidx = ny * width + nx;
                if mask[nidx] && !visited[nidx] {
                    visited[nidx] = true;
                    stack.push(nidx);
                }
            }
        }

        if members.len() < min_area {
            continue;
        }
        out.push(summarize(&members, mask, width, height));
    }

    out
}

fn summarize(members: &[usize], mask: &[bool], width: usize, height: usize) -> Component {
    let mut sx = 0.0f64;
    let mut sy = 0.0f64;
    let mut bbox = [usize::MAX, usize::MAX, 0, 0];
    let mut boundary = Vec::new();

    for &idx in members {
        let x = idx % width;
        let y = idx / width;
        sx += x as f64;
        sy += y as f64;
        bbox[0] = bbox[0].min(x);
        bbox[1] = bbox[1].min(y);
        bbox[2] = bbox[2].max(x);
        bbox[3] = bbox[3].max(y);

        let on_edge = x == 0 || y == 0 || x + 1 == width || y + 1 == height;
        let open_side =
            on_edge || neighbours4(x, y, width, height).any(|(nx, ny)| !mask[ny * width + nx]);
        if open_side {
            boundary.push(Point2::new(x as f64, y as f64));
        }
    }

    let area = members.len();
    Component {
        area,
        centroid: Point2::new(sx / area as f64, sy / area as f64),
        bbox,
        boundary,
    }
}

fn neighbours4(
    x: usize,
    y: usize,
    width: usize,
    height: usize,
) -> impl Iterator<Item = (usize, usize)> {
    let left = (x > 0).then(|| (x - 1, y));
    let right = (x + 1 < width).then(|| (x + 1, y));
    let up = (y > 0).then(|| (x, y - 1));
    let down = (y + 1 < height).then(|| (x, y + 1));
    [left, right, up, down].into_iter().flatten()
}

//! Global and tile-local thresholds.

use target_loc_core::GrayImageView;

/// Otsu threshold over `samples`.
///
/// Values `<= t` form the dark class. Two-level inputs return the midpoint.
pub(crate) fn otsu_threshold(samples: &[u8]) -> u8 {
    if samples.is_empty() {
        return 127;
    }

    let mut hist = [0u32; 256];
    let mut min_v = 255u8;
    let mut max_v = 0u8;
    for &v in samples {
        hist[v as usize] += 1;
        min_v = min_v.min(v);
        max_v = max_v.max(v);
    }
    if min_v == max_v {
        return min_v;
    }
    if hist.iter().filter(|&&h| h > 0).count() <= 2 {
        return ((min_v as u16 + max_v as u16) / 2) as u8;
    }

    let total = samples.len() as f64;
    let sum_total: f64 = hist
        .iter()
        .enumerate()
        .map(|(i, &h)| i as f64 * h as f64)
        .sum();

    let mut sum_b = 0f64;
    let mut w_b = 0f64;
    let mut best_var = -1f64;
    let mut best_t = 127u8;

    for (t, &h) in hist.iter().enumerate() {
        w_b += h as f64;
        if w_b < 1.0 {
            continue;
        }
        let w_f = total - w_b;
        if w_f < 1.0 {
            break;
        }

        sum_b += t as f64 * h as f64;
        let m_b = sum_b / w_b;
        let m_f = (sum_total - sum_b) / w_f;
        let var_between = w_b * w_f * (m_b - m_f) * (m_b - m_f);
        if var_between > best_var {
            best_var = var_between;
            best_t = t as u8;
        }
    }

    best_t
}

/// Mark dark pixels using tile-local extrema.
///
/// Each tile's threshold is the midpoint of the min/max over its 3x3 tile
/// neighbourhood. Where that range is below `min_contrast` the pixel is
/// classified against a global Otsu threshold instead, or left light when
/// the whole image lacks contrast.
#[cfg_attr(
    feature = "tracing",
    tracing::instrument(level = "debug", skip(img), fields(w = img.width, h = img.height))
)]
pub fn binarize_dark(img: &GrayImageView<'_>, tile: usize, min_contrast: u8) -> Vec<bool> {
    let (w, h) = (img.width, img.height);
    let mut mask = vec![false; w * h];
    if w == 0 || h == 0 || img.data.len() < w * h {
        return mask;
    }

    let tile = tile.max(2);
    let tw = w.div_ceil(tile);
    let th = h.div_ceil(tile);

    let mut tmin = vec![255u8; tw * th];
    let mut tmax = vec![0u8; tw * th];
    for y in 0..h {
        let row = &img.data[y * w..(y + 1) * w];
        for (x, &v) in row.iter().enumerate() {
            let t = (y / tile) * tw + x / tile;
            tmin[t] = tmin[t].min(v);
            tmax[t] = tmax[t].max(v);
        }
    }

    let mut dmin = vec![255u8; tw * th];
    let mut dmax = vec![0u8; tw * th];
    for ty in 0..th {
        for tx in 0..tw {
            let mut lo = 255u8;
            let mut hi = 0u8;
            for ny in ty.saturating_sub(1)..=(ty + 1).min(th - 1) {
                for nx in tx.saturating_sub(1)..=(tx + 1).min(tw - 1) {
                    lo = lo.min(tmin[ny * tw + nx]);
                    hi = hi.max(tmax[ny * tw + nx]);
                }
            }
            dmin[ty * tw + tx] = lo;
            dmax[ty * tw + tx] = hi;
        }
    }

    let data = &img.data[..w * h];
    let (gmin, gmax) = data
        .iter()
        .fold((255u8, 0u8), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let global = (gmax - gmin >= min_contrast).then(|| otsu_threshold(data));

    for y in 0..h {
        for x in 0..w {
            let t = (y / tile) * tw + x / tile;
            let v = data[y * w + x];
            let (lo, hi) = (dmin[t], dmax[t]);
            mask[y * w + x] = if hi - lo >= min_contrast {
                (v as u16) * 2 < lo as u16 + hi as u16
            } else {
                global.is_some_and(|g| v <= g)
            };
        }
    }

    mask
}

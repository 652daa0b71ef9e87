/// Hue in degrees `[0, 360)`, saturation and value in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hsv {
    pub h: f32,
    pub s: f32,
    pub v: f32,
}

pub fn rgb_to_hsv([r, g, b]: [u8; 3]) -> Hsv {
    let (r, g, b) = (r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let h = if delta <= f32::EPSILON {
        0.0
    } else if max == r {
        60.0 * ((g - b) / delta).rem_euclid(6.0)
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };
    let s = if max <= f32::EPSILON { 0.0 } else { delta / max };

    Hsv { h, s, v: max }
}

/// Angular distance between two hues, wrapping at 360.
pub(crate) fn hue_distance(a: f32, b: f32) -> f32 {
    let d = (a - b).rem_euclid(360.0);
    d.min(360.0 - d)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primaries() {
        assert_eq!(rgb_to_hsv([255, 0, 0]).h, 0.0);
        assert!((rgb_to_hsv([0, 255, 0]).h - 120.0).abs() < 1e-4);
        assert!((rgb_to_hsv([0, 0, 255]).h - 240.0).abs() < 1e-4);
        let gray = rgb_to_hsv([128, 128, 128]);
        assert_eq!(gray.s, 0.0);
    }

    #[test]
    fn hue_distance_wraps() {
        assert!((hue_distance(350.0, 0.0) - 10.0).abs() < 1e-4);
        assert!((hue_distance(10.0, 350.0) - 20.0).abs() < 1e-4);
        assert!((hue_distance(230.0, 240.0) - 10.0).abs() < 1e-4);
    }
}

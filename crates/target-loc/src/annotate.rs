//! Minimal overlay drawing for the viewer.

use image::{Rgb, RgbImage};
use nalgebra::Point2;

pub const GREEN: Rgb<u8> = Rgb([0, 220, 0]);
pub const MAGENTA: Rgb<u8> = Rgb([230, 0, 230]);

fn put(img: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < img.width() && (y as u32) < img.height() {
        img.put_pixel(x as u32, y as u32, color);
    }
}

/// Bresenham segment, clipped to the image.
pub fn draw_line(img: &mut RgbImage, a: Point2<f64>, b: Point2<f64>, color: Rgb<u8>) {
    let (mut x0, mut y0) = (a.x.round() as i64, a.y.round() as i64);
    let (x1, y1) = (b.x.round() as i64, b.y.round() as i64);
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    loop {
        put(img, x0, y0, color);
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

pub fn draw_polygon(img: &mut RgbImage, pts: &[Point2<f64>], color: Rgb<u8>) {
    for (i, &a) in pts.iter().enumerate() {
        draw_line(img, a, pts[(i + 1) % pts.len()], color);
    }
}

pub fn draw_circle(img: &mut RgbImage, center: Point2<f64>, radius: f64, color: Rgb<u8>) {
    let steps = ((radius * 8.0).ceil() as usize).clamp(16, 2048);
    let at = |i: usize| {
        let t = i as f64 / steps as f64 * std::f64::consts::TAU;
        Point2::new(center.x + radius * t.cos(), center.y + radius * t.sin())
    };
    for i in 0..steps {
        draw_line(img, at(i), at(i + 1), color);
    }
}

/// Small cross marking a point.
pub fn draw_cross(img: &mut RgbImage, p: Point2<f64>, half: f64, color: Rgb<u8>) {
    draw_line(img, Point2::new(p.x - half, p.y), Point2::new(p.x + half, p.y), color);
    draw_line(img, Point2::new(p.x, p.y - half), Point2::new(p.x, p.y + half), color);
}

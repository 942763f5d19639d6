//! Canny edge detection on an already-toned raster.
//!
//! Sobel gradient, non-maximum suppression, then two-threshold hysteresis.
//! Unlike `imageproc::edges::canny` there is no built-in Gaussian blur: the
//! filter stage owns tone handling and callers expect the thresholds to act
//! on the raster they passed in.
//!
//! A pixel is a strong edge when its suppressed magnitude is strictly above
//! `high`, and a weak edge when strictly above `low`. Weak edges survive
//! only when 8-connected to a strong edge. Strict comparisons keep
//! zero-gradient pixels out of the map even with a zero threshold.

use image::{GrayImage, Luma};

use crate::filter::sobel_gradients;

/// Binary edge map: 255 on edges, 0 elsewhere.
///
/// Rasters narrower or shorter than 3 pixels have no interior and produce
/// an all-black map.
#[must_use = "returns the binary edge map"]
pub fn canny(raster: &GrayImage, low: f32, high: f32) -> GrayImage {
    let (w, h) = raster.dimensions();
    if w < 3 || h < 3 {
        return GrayImage::new(w, h);
    }

    let (gx, gy) = sobel_gradients(raster);
    let (wu, hu) = (w as usize, h as usize);

    let magnitude: Vec<f32> = gx
        .pixels()
        .zip(gy.pixels())
        .map(|(a, b)| f32::from(a.0[0]).hypot(f32::from(b.0[0])))
        .collect();

    let thinned = non_maximum_suppression(&magnitude, &gx, &gy, wu, hu);
    hysteresis(&thinned, w, h, low, high)
}

/// Zero every pixel that is not a local maximum along its gradient
/// direction. Border pixels are always zero.
fn non_maximum_suppression(
    magnitude: &[f32],
    gx: &imageproc::definitions::Image<Luma<i16>>,
    gy: &imageproc::definitions::Image<Luma<i16>>,
    w: usize,
    h: usize,
) -> Vec<f32> {
    let mut out = vec![0.0f32; w * h];
    let at = |x: usize, y: usize| magnitude[y * w + x];

    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let m = at(x, y);
            if m == 0.0 {
                continue;
            }
            #[allow(clippy::cast_possible_truncation)]
            let (px, py) = (x as u32, y as u32);
            let dx = f32::from(gx.get_pixel(px, py).0[0]);
            let dy = f32::from(gy.get_pixel(px, py).0[0]);
            let mut angle = dy.atan2(dx).to_degrees();
            if angle < 0.0 {
                angle += 180.0;
            }

            // Neighbours across the edge, i.e. along the gradient.
            let (a, b) = if !(22.5..157.5).contains(&angle) {
                (at(x - 1, y), at(x + 1, y))
            } else if angle < 67.5 {
                (at(x + 1, y + 1), at(x - 1, y - 1))
            } else if angle < 112.5 {
                (at(x, y - 1), at(x, y + 1))
            } else {
                (at(x - 1, y + 1), at(x + 1, y - 1))
            };

            if m >= a && m >= b {
                out[y * w + x] = m;
            }
        }
    }
    out
}

/// Keep strong edges and the weak edges 8-connected to them.
fn hysteresis(thinned: &[f32], w: u32, h: u32, low: f32, high: f32) -> GrayImage {
    let mut out = GrayImage::new(w, h);
    let mut stack: Vec<(u32, u32)> = Vec::new();

    for y in 0..h {
        for x in 0..w {
            let i = (y * w + x) as usize;
            if thinned[i] <= high || out.get_pixel(x, y).0[0] != 0 {
                continue;
            }
            out.put_pixel(x, y, Luma([255]));
            stack.push((x, y));

            while let Some((cx, cy)) = stack.pop() {
                for (nx, ny) in neighbours(cx, cy, w, h) {
                    let j = (ny * w + nx) as usize;
                    if thinned[j] > low && out.get_pixel(nx, ny).0[0] == 0 {
                        out.put_pixel(nx, ny, Luma([255]));
                        stack.push((nx, ny));
                    }
                }
            }
        }
    }
    out
}

/// In-bounds 8-neighbourhood of `(x, y)`.
fn neighbours(x: u32, y: u32, w: u32, h: u32) -> impl Iterator<Item = (u32, u32)> {
    const OFFSETS: [(i64, i64); 8] = [
        (-1, -1),
        (0, -1),
        (1, -1),
        (-1, 0),
        (1, 0),
        (-1, 1),
        (0, 1),
        (1, 1),
    ];
    OFFSETS.into_iter().filter_map(move |(dx, dy)| {
        let nx = u32::try_from(i64::from(x) + dx).ok()?;
        let ny = u32::try_from(i64::from(y) + dy).ok()?;
        (nx < w && ny < h).then_some((nx, ny))
    })
}

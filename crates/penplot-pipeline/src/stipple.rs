//! Stipple fill: ordered-dither dots joined into one stroke.
//!
//! The raster is cut into `spacing`×`spacing` cells. A cell gets a dot when
//! its ink coverage (mean sample / 255) beats the 4×4 Bayer threshold for
//! its position, so dense regions get a dot in every cell and sparse ones
//! in a regular fraction of cells. The dot sits on the cell's
//! intensity-weighted centroid.

use image::GrayImage;

use crate::optimize::order_points;
use crate::types::{Point, Polyline};

/// 4×4 Bayer index matrix.
const BAYER: [[u8; 4]; 4] = [[0, 8, 2, 10], [12, 4, 14, 6], [3, 11, 1, 9], [15, 7, 13, 5]];

/// Stipple dots for `mask`, chained nearest-first into a single stroke.
///
/// Returns no strokes when no cell passes its threshold.
#[must_use = "returns the stipple stroke"]
pub fn stipple(mask: &GrayImage, spacing: u32) -> Vec<Polyline> {
    let dots = dots(mask, spacing);
    tracing::debug!(dots = dots.len(), "stippled");
    if dots.is_empty() {
        return Vec::new();
    }
    vec![Polyline::new(order_points(&dots))]
}

/// Dot positions in raster-scan order of their cells.
fn dots(mask: &GrayImage, spacing: u32) -> Vec<Point> {
    if spacing == 0 {
        return Vec::new();
    }
    let (w, h) = mask.dimensions();
    let mut dots = Vec::new();

    for (row, y0) in (0..h).step_by(spacing as usize).enumerate() {
        for (col, x0) in (0..w).step_by(spacing as usize).enumerate() {
            let cell = Cell::measure(mask, x0, y0, (x0 + spacing).min(w), (y0 + spacing).min(h));
            if cell.coverage() > threshold(col, row) {
                dots.extend(cell.centroid());
            }
        }
    }
    dots
}

/// Dither threshold in `(0, 1)` for the cell at `(col, row)`.
fn threshold(col: usize, row: usize) -> f64 {
    (f64::from(BAYER[row % 4][col % 4]) + 0.5) / 16.0
}

/// Accumulated intensity of one cell.
struct Cell {
    pixels: u64,
    total: u64,
    weighted_x: u64,
    weighted_y: u64,
}

impl Cell {
    fn measure(mask: &GrayImage, x0: u32, y0: u32, x1: u32, y1: u32) -> Self {
        let mut cell = Self {
            pixels: 0,
            total: 0,
            weighted_x: 0,
            weighted_y: 0,
        };
        for y in y0..y1 {
            for x in x0..x1 {
                let v = u64::from(mask.get_pixel(x, y).0[0]);
                cell.pixels += 1;
                cell.total += v;
                cell.weighted_x += v * u64::from(x);
                cell.weighted_y += v * u64::from(y);
            }
        }
        cell
    }

    #[allow(clippy::cast_precision_loss)]
    fn coverage(&self) -> f64 {
        if self.pixels == 0 {
            return 0.0;
        }
        self.total as f64 / (255.0 * self.pixels as f64)
    }

    #[allow(clippy::cast_precision_loss)]
    fn centroid(&self) -> Option<Point> {
        (self.total > 0).then(|| {
            let total = self.total as f64;
            Point::new(self.weighted_x as f64 / total, self.weighted_y as f64 / total)
        })
    }
}

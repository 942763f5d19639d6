//! Border tracing: every boundary of a foreground region as a closed path.
//!
//! Tracing itself is Suzuki-Abe border following via
//! `imageproc::contours::find_contours`, which reports both outer borders
//! and hole borders. Each traced border is then put into a canonical form
//! so a given raster always yields the same geometry:
//!
//! - orientation is clockwise on screen (positive shoelace area with Y
//!   pointing down); when the tracer could continue either way, the
//!   clockwise continuation is the one kept,
//! - the path starts at its top-most, then left-most pixel,
//! - the first point is repeated at the end to close it,
//! - borders are emitted in raster-scan order of their start pixel.

use image::GrayImage;

use crate::types::{Point, Polyline};

/// Trace every border in `mask` (non-zero samples are foreground).
#[must_use = "returns the traced borders"]
pub fn trace_borders(mask: &GrayImage) -> Vec<Polyline> {
    if mask.width() == 0 || mask.height() == 0 {
        return Vec::new();
    }

    let contours: Vec<imageproc::contours::Contour<u32>> =
        imageproc::contours::find_contours(mask);

    let mut borders: Vec<Vec<(u32, u32)>> = contours
        .into_iter()
        .map(|c| c.points.into_iter().map(|p| (p.x, p.y)).collect::<Vec<_>>())
        .filter(|pts| !pts.is_empty())
        .map(canonicalize)
        .collect();

    // Stable: borders sharing a start pixel keep tracer order.
    borders.sort_by_key(|pts| pts.first().map(|&(x, y)| (y, x)));

    borders
        .into_iter()
        .map(|pts| {
            let mut points: Vec<Point> = pts
                .into_iter()
                .map(|(x, y)| Point::new(f64::from(x), f64::from(y)))
                .collect();
            if let Some(&first) = points.first() {
                points.push(first);
            }
            Polyline::new(points)
        })
        .collect()
}

/// Orient clockwise and rotate to start at the top-most, left-most pixel.
fn canonicalize(mut pts: Vec<(u32, u32)>) -> Vec<(u32, u32)> {
    if signed_area2(&pts) < 0 {
        pts.reverse();
    }
    let start = pts
        .iter()
        .enumerate()
        .min_by_key(|&(i, &(x, y))| (y, x, i))
        .map_or(0, |(i, _)| i);
    pts.rotate_left(start);
    pts
}

/// Twice the shoelace area in image coordinates. Positive means clockwise
/// on screen.
fn signed_area2(pts: &[(u32, u32)]) -> i64 {
    let n = pts.len();
    (0..n)
        .map(|i| {
            let (x0, y0) = pts[i];
            let (x1, y1) = pts[(i + 1) % n];
            i64::from(x0) * i64::from(y1) - i64::from(x1) * i64::from(y0)
        })
        .sum()
}

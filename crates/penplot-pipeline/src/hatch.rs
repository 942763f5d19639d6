//! Hatch fill: parallel straight lines clipped to the foreground.

use image::GrayImage;

use crate::types::{Point, Polyline};
use crate::vectorize::clip_to_foreground;

/// Hatch `mask` with lines `spacing` pixels apart at `angle_deg` degrees
/// counter-clockwise from horizontal (as seen on screen).
///
/// Lines are emitted in order of their offset across the raster; each
/// foreground run along a line becomes one two-point stroke, cut exactly
/// where the line enters and leaves foreground pixels.
#[must_use = "returns the hatch strokes"]
pub fn hatch(mask: &GrayImage, spacing: u32, angle_deg: f64) -> Vec<Polyline> {
    if mask.width() == 0 || mask.height() == 0 || spacing == 0 {
        return Vec::new();
    }
    let (w, h) = (f64::from(mask.width()), f64::from(mask.height()));
    let spacing = f64::from(spacing);

    // Screen Y points down, so a positive angle rises to the right.
    let (sin, cos) = angle_deg.to_radians().sin_cos();
    let dir = (cos, -sin);
    let normal = (sin, cos);

    let corners = [(0.0, 0.0), (w, 0.0), (0.0, h), (w, h)];
    let (along_min, along_max) = extent(&corners, dir);
    let (across_min, across_max) = extent(&corners, normal);

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let line_count = ((across_max - across_min) / spacing).ceil() as u32;

    let mut strokes = Vec::new();
    for k in 0..line_count {
        let offset = f64::from(k).mul_add(spacing, across_min + spacing / 2.0);
        if offset > across_max {
            break;
        }
        let at = |t: f64| {
            Point::new(
                offset.mul_add(normal.0, t * dir.0),
                offset.mul_add(normal.1, t * dir.1),
            )
        };
        strokes.extend(clip_to_foreground(mask, [at(along_min), at(along_max)]));
    }

    tracing::debug!(lines = line_count, strokes = strokes.len(), "hatched");
    strokes
}

/// Min and max projection of `points` onto `axis`.
fn extent(points: &[(f64, f64)], axis: (f64, f64)) -> (f64, f64) {
    points
        .iter()
        .map(|&(x, y)| x.mul_add(axis.0, y * axis.1))
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        })
}

#[cfg(test)]
mod tests {
    use image::Luma;

    use super::*;

    fn full_with_margin(size: u32, margin: u32) -> GrayImage {
        GrayImage::from_fn(size, size, |x, y| {
            let inside = (margin..size - margin).contains(&x) && (margin..size - margin).contains(&y);
            Luma([if inside { 255 } else { 0 }])
        })
    }

    #[test]
    fn horizontal_hatch_gives_one_stroke_per_row_band() {
        let mask = full_with_margin(40, 10);
        let strokes = hatch(&mask, 5, 0.0);
        // Rows at y = 2.5, 7.5, ... ; those in 10..30 hit the square.
        assert_eq!(strokes.len(), 4);
        for s in &strokes {
            assert_eq!(s.len(), 2);
            let (a, b) = (s.points()[0], s.points()[1]);
            assert!((a.y - b.y).abs() < 1e-9, "horizontal stroke expected");
            assert!(a.x >= 10.0 && b.x < 30.0);
        }
    }

    #[test]
    fn strokes_stay_on_foreground() {
        let mask = full_with_margin(60, 15);
        for angle in [0.0, 30.0, 45.0, 90.0, 135.0, 180.0] {
            for s in hatch(&mask, 4, angle) {
                for p in s.points() {
                    assert!(
                        crate::vectorize::is_foreground_at(&mask, *p),
                        "angle {angle}: point ({}, {}) off the mask",
                        p.x,
                        p.y
                    );
                }
            }
        }
    }

    #[test]
    fn vertical_hatch_runs_top_to_bottom_band() {
        let mask = full_with_margin(40, 10);
        let strokes = hatch(&mask, 5, 90.0);
        assert_eq!(strokes.len(), 4);
        for s in &strokes {
            let (a, b) = (s.points()[0], s.points()[1]);
            assert!((a.x - b.x).abs() < 1e-9, "vertical stroke expected");
        }
    }

    #[test]
    fn tighter_spacing_gives_more_strokes() {
        let mask = full_with_margin(60, 10);
        assert!(hatch(&mask, 2, 45.0).len() > hatch(&mask, 10, 45.0).len());
    }

    #[test]
    fn gap_in_a_row_splits_the_stroke() {
        let mask = GrayImage::from_fn(40, 5, |x, _| Luma([if (18..22).contains(&x) { 0 } else { 255 }]));
        let strokes = hatch(&mask, 5, 0.0);
        assert_eq!(strokes.len(), 2);
    }
}

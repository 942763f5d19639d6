//! Spiral fill: one Archimedean spiral clipped to the foreground.

use std::f64::consts::TAU;

use image::GrayImage;

use crate::types::{Point, Polyline};
use crate::vectorize::clip_to_foreground;

/// Target arc length between samples, in pixels.
const ARC_STEP: f64 = 1.0;

/// Trace `r = spacing * theta / 2pi` from the raster centre out to the
/// half-diagonal, keeping the runs that lie on foreground.
///
/// The spiral is drawn as chords between samples; each chord is clipped
/// at the pixel edges it crosses.
#[must_use = "returns the spiral strokes"]
pub fn spiral(mask: &GrayImage, spacing: u32) -> Vec<Polyline> {
    if mask.width() == 0 || mask.height() == 0 || spacing == 0 {
        return Vec::new();
    }
    let (w, h) = (f64::from(mask.width()), f64::from(mask.height()));

    let strokes = clip_to_foreground(mask, samples(w, h, f64::from(spacing)));
    tracing::debug!(strokes = strokes.len(), "spiral traced");
    strokes
}

/// Spiral samples from the centre outwards, roughly `ARC_STEP` apart.
fn samples(w: f64, h: f64, spacing: f64) -> impl Iterator<Item = Point> {
    let (cx, cy) = (w / 2.0, h / 2.0);
    let max_r = w.hypot(h) / 2.0;
    let pitch = spacing / TAU;

    std::iter::successors(Some(0.0_f64), move |&theta| {
        let r = pitch * theta;
        Some(theta + ARC_STEP / r.max(ARC_STEP))
    })
    .map(move |theta| (theta, pitch * theta))
    .take_while(move |&(_, r)| r <= max_r)
    .map(move |(theta, r)| {
        let (sin, cos) = theta.sin_cos();
        Point::new(r.mul_add(cos, cx), r.mul_add(sin, cy))
    })
}

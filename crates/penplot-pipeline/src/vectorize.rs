//! Vectorization stage: binary raster to pixel-space strokes.
//!
//! Every strategy treats non-zero samples as foreground and is
//! deterministic. Rasters with nothing to trace (zero-sized, all
//! background, or all foreground) give an empty [`PathSet`], never an
//! error.

use std::fmt;
use std::str::FromStr;

use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::types::{PathSet, PipelineError, PixelSpace, Point, Polyline, VectorizeParams};

/// Strategy for turning a raster into strokes.
///
/// Implemented by [`VectorizeMethod`]; the trait exists so alternative
/// strategies can be slotted into [`extract_paths`]-style drivers.
pub trait Vectorizer {
    /// Produce strokes for `mask`. `mask` is known to be non-empty and
    /// `params` already validated.
    fn vectorize(&self, mask: &GrayImage, params: &VectorizeParams) -> PathSet<PixelSpace>;
}

/// Selectable vectorization strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorizeMethod {
    /// Closed border of every foreground region and hole.
    #[default]
    Contour,
    /// Parallel line fill clipped to the foreground.
    Hatch,
    /// Archimedean spiral from the centre, clipped to the foreground.
    Spiral,
    /// Nested rings from repeated erosion.
    Concentric,
    /// Ordered-dither dots chained into one stroke.
    Stipple,
}

impl VectorizeMethod {
    /// Every method, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Contour,
        Self::Hatch,
        Self::Spiral,
        Self::Concentric,
        Self::Stipple,
    ];

    /// The configuration name of this method.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Contour => "contour",
            Self::Hatch => "hatch",
            Self::Spiral => "spiral",
            Self::Concentric => "concentric",
            Self::Stipple => "stipple",
        }
    }
}

impl fmt::Display for VectorizeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for VectorizeMethod {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.name() == s)
            .ok_or_else(|| PipelineError::UnsupportedMethod {
                kind: "vectorize",
                name: s.to_owned(),
            })
    }
}

impl Vectorizer for VectorizeMethod {
    fn vectorize(&self, mask: &GrayImage, params: &VectorizeParams) -> PathSet<PixelSpace> {
        let spacing = params.hatch_spacing;
        match self {
            Self::Contour => PathSet::new(crate::contour::trace_borders(mask)),
            Self::Hatch => PathSet::new(crate::hatch::hatch(mask, spacing, params.hatch_angle)),
            Self::Spiral => PathSet::new(crate::spiral::spiral(mask, spacing)),
            Self::Concentric => PathSet::new(crate::concentric::concentric(mask, spacing)),
            Self::Stipple => PathSet::new(crate::stipple::stipple(mask, spacing)),
        }
    }
}

/// Run the vectorization stage.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidParameter`] if `params` is out of range.
pub fn extract_paths(
    mask: &GrayImage,
    params: &VectorizeParams,
) -> Result<PathSet<PixelSpace>, PipelineError> {
    params.validate()?;

    if is_uniform(mask) {
        tracing::debug!(method = %params.method, "nothing to vectorize");
        return Ok(PathSet::empty());
    }

    let paths = params.method.vectorize(mask, params);
    tracing::debug!(
        method = %params.method,
        paths = paths.len(),
        points = paths.point_count(),
        "vectorized"
    );
    Ok(paths)
}

/// Whether the pixel containing `p` exists and is foreground.
pub(crate) fn is_foreground_at(mask: &GrayImage, p: Point) -> bool {
    if !(p.x >= 0.0 && p.y >= 0.0) {
        return false;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let (x, y) = (p.x.floor() as u32, p.y.floor() as u32);
    mask.get_pixel_checked(x, y).is_some_and(|px| px.0[0] != 0)
}

/// Shortest run kept by [`clip_to_foreground`], in pixels.
const MIN_RUN: f64 = 0.5;

/// How far run ends are pulled back from the pixel edge they stop on.
const EDGE_INSET: f64 = 1e-6;

/// Clip the polyline through `points` to the foreground.
///
/// Every segment is cut at each pixel edge it crosses, so each piece
/// lies inside a single pixel and is kept only when that pixel is
/// foreground. Background pixels are never crossed, however briefly.
/// Run ends are pulled just inside the last foreground pixel and runs
/// shorter than [`MIN_RUN`] are dropped.
pub(crate) fn clip_to_foreground(
    mask: &GrayImage,
    points: impl IntoIterator<Item = Point>,
) -> Vec<Polyline> {
    let mut runs = Vec::new();
    let mut current: Vec<Point> = Vec::new();

    let mut points = points.into_iter();
    let Some(mut a) = points.next() else {
        return runs;
    };

    for b in points {
        if a == b {
            continue;
        }
        let cuts = pixel_edge_crossings(a, b);
        let last = cuts.len() - 1;
        let at = |i: usize| match i {
            0 => a,
            i if i == last => b,
            i => lerp(a, b, cuts[i]),
        };

        // Whether the run's last point was placed on this segment and
        // can slide forward instead of adding a collinear point.
        let mut slide = false;
        for i in 0..last {
            let (p0, p1) = (at(i), at(i + 1));
            // A corner shared only diagonally with the previous piece.
            if !current.is_empty() && !is_foreground_at(mask, p0) {
                finish_run(&mut runs, &mut current);
            }
            if !is_foreground_at(mask, lerp(a, b, f64::midpoint(cuts[i], cuts[i + 1]))) {
                finish_run(&mut runs, &mut current);
                continue;
            }
            if current.is_empty() {
                current.push(p0);
                slide = false;
            }
            if slide {
                if let Some(end) = current.last_mut() {
                    *end = p1;
                }
            } else {
                current.push(p1);
                slide = true;
            }
        }
        a = b;
    }
    finish_run(&mut runs, &mut current);
    runs
}

/// Parameters in `[0, 1]` where `a -> b` crosses a pixel edge, sorted,
/// always including both ends.
fn pixel_edge_crossings(a: Point, b: Point) -> Vec<f64> {
    let mut cuts = vec![0.0, 1.0];
    for (from, to) in [(a.x, b.x), (a.y, b.y)] {
        let delta = to - from;
        if delta == 0.0 {
            continue;
        }
        #[allow(clippy::cast_possible_truncation)]
        let (lo, hi) = (from.min(to).ceil() as i64, from.max(to).floor() as i64);
        for k in lo..=hi {
            #[allow(clippy::cast_precision_loss)]
            let t = (k as f64 - from) / delta;
            if t > 0.0 && t < 1.0 {
                cuts.push(t);
            }
        }
    }
    cuts.sort_by(f64::total_cmp);
    cuts.dedup();
    cuts
}

fn lerp(a: Point, b: Point, t: f64) -> Point {
    Point::new((b.x - a.x).mul_add(t, a.x), (b.y - a.y).mul_add(t, a.y))
}

/// Close the open run, keeping it if long enough.
fn finish_run(runs: &mut Vec<Polyline>, current: &mut Vec<Point>) {
    let mut run = std::mem::take(current);
    let length: f64 = run.windows(2).map(|w| w[0].distance(w[1])).sum();
    if run.len() < 2 || length < MIN_RUN {
        return;
    }
    let n = run.len();
    run[0] = pull_in(run[0], run[1]);
    run[n - 1] = pull_in(run[n - 1], run[n - 2]);
    runs.push(Polyline::new(run));
}

/// Move `p` a hair towards `toward`, off the pixel edge it sits on.
fn pull_in(p: Point, toward: Point) -> Point {
    let t = (EDGE_INSET / p.distance(toward)).min(0.5);
    lerp(p, toward, t)
}

/// Zero-sized, all background, or all foreground.
fn is_uniform(mask: &GrayImage) -> bool {
    let mut samples = mask.pixels().map(|p| p.0[0] != 0);
    let Some(first) = samples.next() else {
        return true;
    };
    samples.all(|s| s == first)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use image::Luma;

    use super::*;

    fn square() -> GrayImage {
        GrayImage::from_fn(50, 50, |x, y| {
            let inside = (20..30).contains(&x) && (20..30).contains(&y);
            Luma([if inside { 255 } else { 0 }])
        })
    }

    fn params(method: VectorizeMethod) -> VectorizeParams {
        VectorizeParams {
            method,
            ..VectorizeParams::default()
        }
    }

    #[test]
    fn method_names_round_trip_through_from_str() {
        for m in VectorizeMethod::ALL {
            assert_eq!(m.name().parse::<VectorizeMethod>().unwrap(), m);
        }
    }

    #[test]
    fn unknown_method_is_unsupported() {
        let err = "woodcut".parse::<VectorizeMethod>().unwrap_err();
        assert!(matches!(
            err,
            PipelineError::UnsupportedMethod { kind: "vectorize", .. }
        ));
    }

    #[test]
    fn method_serde_uses_snake_case() {
        let json = serde_json::to_string(&VectorizeMethod::Concentric).unwrap();
        assert_eq!(json, "\"concentric\"");
    }

    #[test]
    fn every_method_gives_empty_set_for_blank_raster() {
        let blank = GrayImage::new(40, 40);
        for m in VectorizeMethod::ALL {
            let out = extract_paths(&blank, &params(m)).unwrap();
            assert!(out.is_empty(), "{m} produced paths from a blank raster");
        }
    }

    #[test]
    fn every_method_gives_empty_set_for_full_raster() {
        let full = GrayImage::from_pixel(40, 40, Luma([255]));
        for m in VectorizeMethod::ALL {
            assert!(extract_paths(&full, &params(m)).unwrap().is_empty());
        }
    }

    #[test]
    fn zero_sized_raster_gives_empty_set() {
        let out = extract_paths(&GrayImage::new(0, 0), &params(VectorizeMethod::Hatch)).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn contour_square_is_one_closed_path() {
        let out = extract_paths(&square(), &params(VectorizeMethod::Contour)).unwrap();
        assert_eq!(out.len(), 1);
        assert!(out.paths()[0].is_closed());
        assert_eq!(out.paths()[0].first(), Some(&Point::new(20.0, 20.0)));
    }

    #[test]
    fn every_method_stays_inside_the_raster() {
        let mask = square();
        for m in VectorizeMethod::ALL {
            let out = extract_paths(&mask, &params(m)).unwrap();
            assert!(!out.is_empty(), "{m} produced nothing for a square");
            for p in out.iter().flat_map(|p| p.points()) {
                assert!((0.0..50.0).contains(&p.x) && (0.0..50.0).contains(&p.y));
            }
        }
    }

    #[test]
    fn every_method_is_deterministic() {
        let mask = GrayImage::from_fn(60, 40, |x, y| {
            Luma([if (x * 7 + y * 3) % 23 < 11 { 255 } else { 0 }])
        });
        for m in VectorizeMethod::ALL {
            let a = extract_paths(&mask, &params(m)).unwrap();
            let b = extract_paths(&mask, &params(m)).unwrap();
            assert_eq!(a, b, "{m} is not deterministic");
        }
    }

    #[test]
    fn invalid_spacing_rejected() {
        let p = VectorizeParams {
            hatch_spacing: 1,
            ..VectorizeParams::default()
        };
        let err = extract_paths(&square(), &p).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InvalidParameter { name: "hatch_spacing", .. }
        ));
    }

    /// Every point along every segment of `strokes`, `n` per segment.
    fn dense_samples(strokes: &[Polyline], n: u32) -> Vec<Point> {
        strokes
            .iter()
            .flat_map(|s| s.points().windows(2).map(|w| (w[0], w[1])).collect::<Vec<_>>())
            .flat_map(|(a, b)| (0..=n).map(move |i| lerp(a, b, f64::from(i) / f64::from(n))))
            .collect()
    }

    #[test]
    fn clip_splits_on_background() {
        let mask = GrayImage::from_fn(10, 1, |x, _| Luma([if x == 4 { 0 } else { 255 }]));
        let runs = clip_to_foreground(&mask, [Point::new(0.0, 0.5), Point::new(10.0, 0.5)]);
        assert_eq!(runs.len(), 2);
        let (a, b) = (runs[0].points(), runs[1].points());
        assert_eq!(a.len(), 2);
        assert!((a[0].x - 0.0).abs() < 1e-5 && (a[1].x - 4.0).abs() < 1e-5);
        assert!((b[0].x - 5.0).abs() < 1e-5 && (b[1].x - 10.0).abs() < 1e-5);
        assert!(a[1].x < 4.0 && b[0].x > 5.0);
    }

    #[test]
    fn clip_drops_runs_shorter_than_half_a_pixel() {
        let mask = GrayImage::from_fn(3, 3, |x, y| Luma([if x == 1 && y == 1 { 255 } else { 0 }]));
        // Clips the top-right corner of the only foreground pixel.
        let runs = clip_to_foreground(&mask, [Point::new(1.8, 0.9), Point::new(2.1, 1.2)]);
        assert!(runs.is_empty());
    }

    #[test]
    fn clip_splits_on_a_single_thin_background_crossing() {
        // A steep line clips the corner of one background pixel for about
        // a hundredth of a pixel.
        let mask = GrayImage::from_fn(10, 10, |x, y| Luma([if x == 5 && y == 4 { 0 } else { 255 }]));
        let runs = clip_to_foreground(&mask, [Point::new(5.9198, 0.0), Point::new(6.1198, 10.0)]);
        assert_eq!(runs.len(), 2);
        for p in dense_samples(&runs, 2000) {
            assert!(is_foreground_at(&mask, p), "({}, {}) on background", p.x, p.y);
        }
    }

    #[test]
    fn clip_joins_segments_across_vertices() {
        let mask = GrayImage::from_pixel(10, 10, Luma([255]));
        let runs = clip_to_foreground(
            &mask,
            [Point::new(1.5, 1.5), Point::new(8.5, 1.5), Point::new(8.5, 8.5)],
        );
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].len(), 3);
        assert_eq!(runs[0].points()[1], Point::new(8.5, 1.5));
    }

    #[test]
    fn clipped_hatch_and_spiral_never_cross_background() {
        let mask = GrayImage::from_fn(60, 60, |x, y| {
            Luma([if (7 * x + 13 * y) % 11 == 0 { 0 } else { 255 }])
        });
        for angle in [30.0, 45.0, 60.0, 135.0] {
            let strokes = crate::hatch::hatch(&mask, 3, angle);
            assert!(!strokes.is_empty());
            for p in dense_samples(&strokes, 2000) {
                assert!(is_foreground_at(&mask, p), "hatch {angle}: ({}, {})", p.x, p.y);
            }
        }
        let strokes = crate::spiral::spiral(&mask, 3);
        assert!(!strokes.is_empty());
        for p in dense_samples(&strokes, 50) {
            assert!(is_foreground_at(&mask, p), "spiral: ({}, {})", p.x, p.y);
        }
    }

    #[test]
    fn samples_outside_the_raster_are_background() {
        let mask = GrayImage::from_pixel(4, 4, Luma([255]));
        assert!(!is_foreground_at(&mask, Point::new(-0.1, 1.0)));
        assert!(!is_foreground_at(&mask, Point::new(1.0, 4.0)));
        assert!(!is_foreground_at(&mask, Point::new(f64::NAN, 1.0)));
        assert!(is_foreground_at(&mask, Point::new(3.99, 0.0)));
    }
}

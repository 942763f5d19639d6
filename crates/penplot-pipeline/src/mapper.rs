//! Coordinate mapping from raster pixels to bed millimetres.
//!
//! The drawing is scaled uniformly to the largest size that fits the bed,
//! centred, and (for a bottom-left origin) flipped vertically. Mapped
//! coordinates are rounded to 3 decimal places, i.e. one micrometre.

use crate::types::{
    Dimensions, PathSet, PipelineError, PixelSpace, PlotOrigin, PlotProfile, PlotSpace, Point,
    Polyline,
};

/// Uniform scale plus offset placing a raster on the bed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotTransform {
    /// Millimetres per pixel.
    pub scale: f64,
    /// Left margin in millimetres.
    pub offset_x: f64,
    /// Margin in millimetres on the side the raster's top row lands on.
    pub offset_y: f64,
    /// Bed height, needed to flip Y.
    pub bed_height: f64,
    /// Whether plot Y grows upwards.
    pub flip_y: bool,
}

impl PlotTransform {
    /// Fit `dimensions` onto the bed described by `profile`.
    ///
    /// Returns `None` for a zero-sized raster.
    #[must_use]
    pub fn fit(dimensions: Dimensions, profile: &PlotProfile) -> Option<Self> {
        if dimensions.is_empty() {
            return None;
        }
        let (w, h) = (f64::from(dimensions.width), f64::from(dimensions.height));
        let scale = (profile.bed_width / w).min(profile.bed_height / h);
        Some(Self {
            scale,
            offset_x: w.mul_add(-scale, profile.bed_width) / 2.0,
            offset_y: h.mul_add(-scale, profile.bed_height) / 2.0,
            bed_height: profile.bed_height,
            flip_y: profile.origin == PlotOrigin::BottomLeft,
        })
    }

    /// Map one pixel-space point.
    #[must_use]
    pub fn apply(&self, p: Point) -> Point {
        let x = p.x.mul_add(self.scale, self.offset_x);
        let y = p.y.mul_add(self.scale, self.offset_y);
        let y = if self.flip_y { self.bed_height - y } else { y };
        Point::new(round3(x), round3(y))
    }
}

/// Map pixel-space strokes onto the bed.
///
/// Consumes the pixel-space set so it cannot be fed to a codec by
/// accident. Stroke order and point order are preserved.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidParameter`] if `profile` is invalid.
pub fn map_to_plot(
    paths: PathSet<PixelSpace>,
    dimensions: Dimensions,
    profile: &PlotProfile,
) -> Result<PathSet<PlotSpace>, PipelineError> {
    profile.validate()?;

    let Some(transform) = PlotTransform::fit(dimensions, profile) else {
        return Ok(PathSet::empty());
    };

    let mapped: PathSet<PlotSpace> = paths
        .into_paths()
        .into_iter()
        .map(|path| {
            Polyline::new(
                path.into_points()
                    .into_iter()
                    .map(|p| transform.apply(p))
                    .collect(),
            )
        })
        .collect();

    tracing::debug!(scale = transform.scale, paths = mapped.len(), "mapped to plot space");
    Ok(mapped)
}

/// Round to 3 decimals, normalising `-0.0` to `0.0`.
fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0 + 0.0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn dims(width: u32, height: u32) -> Dimensions {
        Dimensions { width, height }
    }

    fn pixel_set(points: &[(f64, f64)]) -> PathSet<PixelSpace> {
        PathSet::new(vec![Polyline::new(
            points.iter().map(|&(x, y)| Point::new(x, y)).collect(),
        )])
    }

    #[test]
    fn square_raster_on_square_bed_scales_by_half() {
        let profile = PlotProfile::default();
        let t = PlotTransform::fit(dims(200, 200), &profile).unwrap();
        assert!((t.scale - 0.5).abs() < f64::EPSILON);

        let set = pixel_set(&[(0.0, 0.0), (200.0, 200.0), (100.0, 37.0), (199.0, 0.0)]);
        let mapped = map_to_plot(set, dims(200, 200), &profile).unwrap();
        for p in mapped.iter().flat_map(Polyline::points) {
            assert!((0.0..=100.0).contains(&p.x), "x {} off the bed", p.x);
            assert!((0.0..=100.0).contains(&p.y), "y {} off the bed", p.y);
        }
    }

    #[test]
    fn bottom_left_origin_flips_y() {
        let profile = PlotProfile::default();
        let mapped = map_to_plot(pixel_set(&[(0.0, 0.0), (200.0, 200.0)]), dims(200, 200), &profile).unwrap();
        assert_eq!(
            mapped.paths()[0].points(),
            &[Point::new(0.0, 100.0), Point::new(100.0, 0.0)]
        );
    }

    #[test]
    fn top_left_origin_keeps_y() {
        let profile = PlotProfile {
            origin: PlotOrigin::TopLeft,
            ..PlotProfile::default()
        };
        let mapped = map_to_plot(pixel_set(&[(0.0, 0.0), (200.0, 200.0)]), dims(200, 200), &profile).unwrap();
        assert_eq!(
            mapped.paths()[0].points(),
            &[Point::new(0.0, 0.0), Point::new(100.0, 100.0)]
        );
    }

    #[test]
    fn wide_raster_is_centred_vertically() {
        let profile = PlotProfile {
            origin: PlotOrigin::TopLeft,
            ..PlotProfile::default()
        };
        let t = PlotTransform::fit(dims(400, 100), &profile).unwrap();
        assert!((t.scale - 0.25).abs() < f64::EPSILON);
        assert!(t.offset_x.abs() < f64::EPSILON);
        assert!((t.offset_y - 37.5).abs() < f64::EPSILON);
    }

    #[test]
    fn aspect_ratio_preserved() {
        let profile = PlotProfile {
            bed_width: 300.0,
            bed_height: 200.0,
            ..PlotProfile::default()
        };
        let mapped = map_to_plot(
            pixel_set(&[(0.0, 0.0), (30.0, 0.0), (30.0, 10.0)]),
            dims(30, 10),
            &profile,
        )
        .unwrap();
        let pts = mapped.paths()[0].points();
        let dx = pts[1].x - pts[0].x;
        let dy = (pts[2].y - pts[1].y).abs();
        assert!((dx / dy - 3.0).abs() < 1e-9);
    }

    #[test]
    fn coordinates_rounded_to_three_decimals() {
        let profile = PlotProfile::default();
        let mapped = map_to_plot(pixel_set(&[(1.0, 1.0)]), dims(3, 3), &profile).unwrap();
        let p = mapped.paths()[0].points()[0];
        assert!((p.x - 33.333).abs() < 1e-12);
        assert!((p.y - 66.667).abs() < 1e-12);
    }

    #[test]
    fn zero_sized_raster_maps_to_empty_set() {
        let mapped = map_to_plot(pixel_set(&[(0.0, 0.0)]), dims(0, 0), &PlotProfile::default()).unwrap();
        assert!(mapped.is_empty());
    }

    #[test]
    fn invalid_profile_rejected() {
        let profile = PlotProfile {
            bed_width: 0.0,
            ..PlotProfile::default()
        };
        let err = map_to_plot(PathSet::empty(), dims(10, 10), &profile).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidParameter { name: "bed_width", .. }));
    }

    #[test]
    fn negative_zero_is_normalised() {
        assert!(round3(-0.0001).is_sign_positive());
    }
}

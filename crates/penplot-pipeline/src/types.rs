//! Shared types for the penplot pipeline.

use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

use crate::filter::EdgeMethod;
use crate::vectorize::VectorizeMethod;

/// Re-export `GrayImage` so downstream crates can hold rasters
/// without depending on `image` directly.
pub use image::GrayImage;

/// An 8-bit single-channel raster, row-major.
pub type Raster = GrayImage;

/// A 2D point. Which coordinate space it lives in is decided by the
/// [`PathSet`] that holds it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position.
    pub x: f64,
    /// Vertical position.
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    ///
    /// Avoids the square root for comparison purposes.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }
}

/// One continuous pen-down stroke.
///
/// Closed shapes repeat their first point as the last; a polyline is
/// never implicitly closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline(Vec<Point>);

impl Polyline {
    /// Create a new polyline from a vector of points.
    #[must_use]
    pub const fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    /// Returns `true` if the polyline has no points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of points in the polyline.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns the first point, if any.
    #[must_use]
    pub fn first(&self) -> Option<&Point> {
        self.0.first()
    }

    /// Returns the last point, if any.
    #[must_use]
    pub fn last(&self) -> Option<&Point> {
        self.0.last()
    }

    /// Returns a slice of all points.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.0
    }

    /// Consumes the polyline and returns the underlying vector of points.
    #[must_use]
    pub fn into_points(self) -> Vec<Point> {
        self.0
    }

    /// The same stroke drawn in the opposite direction.
    #[must_use]
    pub fn reversed(mut self) -> Self {
        self.0.reverse();
        self
    }

    /// Whether the last point repeats the first.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.0.len() >= 2 && self.0.first() == self.0.last()
    }

    /// Pen-down length of the stroke.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.0.windows(2).map(|w| w[0].distance(w[1])).sum()
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Dimensions of a raster.
    #[must_use]
    pub fn of(raster: &Raster) -> Self {
        Self {
            width: raster.width(),
            height: raster.height(),
        }
    }

    /// Whether either axis is zero.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

mod sealed {
    pub trait Sealed {}
}

/// Marker for the coordinate space a [`PathSet`] lives in.
pub trait CoordinateSpace: sealed::Sealed + Copy + Default + std::fmt::Debug {}

/// Pixel space: origin at the raster's top-left corner, units of pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PixelSpace;

/// Plot space: physical bed coordinates in millimetres, origin per
/// [`PlotOrigin`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlotSpace;

impl sealed::Sealed for PixelSpace {}
impl sealed::Sealed for PlotSpace {}
impl CoordinateSpace for PixelSpace {}
impl CoordinateSpace for PlotSpace {}

/// Ordered collection of strokes in a single coordinate space.
///
/// Order is draw order. Empty polylines are dropped on construction,
/// including deserialization, so every held path has at least one point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "", from = "RawPathSet")]
pub struct PathSet<S: CoordinateSpace> {
    paths: Vec<Polyline>,
    #[serde(skip)]
    space: PhantomData<S>,
}

/// Wire shape of a [`PathSet`], routed through [`PathSet::new`].
#[derive(Deserialize)]
struct RawPathSet {
    paths: Vec<Polyline>,
}

impl<S: CoordinateSpace> From<RawPathSet> for PathSet<S> {
    fn from(raw: RawPathSet) -> Self {
        Self::new(raw.paths)
    }
}

impl<S: CoordinateSpace> PathSet<S> {
    /// Build a path set, discarding empty polylines.
    #[must_use]
    pub fn new(paths: Vec<Polyline>) -> Self {
        let paths = paths.into_iter().filter(|p| !p.is_empty()).collect();
        Self {
            paths,
            space: PhantomData,
        }
    }

    /// A path set with no paths.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            paths: Vec::new(),
            space: PhantomData,
        }
    }

    /// Number of paths.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.paths.len()
    }

    /// Returns `true` if there are no paths.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// The paths in draw order.
    #[must_use]
    pub fn paths(&self) -> &[Polyline] {
        &self.paths
    }

    /// Iterate the paths in draw order.
    pub fn iter(&self) -> std::slice::Iter<'_, Polyline> {
        self.paths.iter()
    }

    /// Consumes the set and returns the paths.
    #[must_use]
    pub fn into_paths(self) -> Vec<Polyline> {
        self.paths
    }

    /// Total number of points across all paths.
    #[must_use]
    pub fn point_count(&self) -> usize {
        self.paths.iter().map(Polyline::len).sum()
    }
}

impl<S: CoordinateSpace> Default for PathSet<S> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<S: CoordinateSpace> FromIterator<Polyline> for PathSet<S> {
    fn from_iter<I: IntoIterator<Item = Polyline>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a, S: CoordinateSpace> IntoIterator for &'a PathSet<S> {
    type Item = &'a Polyline;
    type IntoIter = std::slice::Iter<'a, Polyline>;

    fn into_iter(self) -> Self::IntoIter {
        self.paths.iter()
    }
}

/// Checks `value` against an inclusive range, naming the field on failure.
pub(crate) fn check_range<T>(
    name: &'static str,
    value: T,
    range: std::ops::RangeInclusive<T>,
    expected: &'static str,
) -> Result<(), PipelineError>
where
    T: PartialOrd + std::fmt::Display,
{
    if range.contains(&value) {
        Ok(())
    } else {
        Err(PipelineError::InvalidParameter {
            name,
            value: value.to_string(),
            expected,
        })
    }
}

/// Checks that a float is finite and at least `min`.
pub(crate) fn check_at_least(
    name: &'static str,
    value: f64,
    min: f64,
    expected: &'static str,
) -> Result<(), PipelineError> {
    if value.is_finite() && value >= min {
        Ok(())
    } else {
        Err(PipelineError::InvalidParameter {
            name,
            value: value.to_string(),
            expected,
        })
    }
}

/// Checks that a float is finite and strictly positive.
pub(crate) fn check_positive(name: &'static str, value: f64) -> Result<(), PipelineError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(PipelineError::InvalidParameter {
            name,
            value: value.to_string(),
            expected: "a finite value > 0",
        })
    }
}

/// Tone, edge and threshold settings for the filter stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterParams {
    /// Additive brightness offset, `-100..=100`.
    pub brightness: i32,

    /// Contrast in percent, `-100..=100`. The sample gain is
    /// `1 + contrast / 100`.
    pub contrast: i32,

    /// Binarization threshold. Samples strictly above it become 255.
    ///
    /// For [`EdgeMethod::Canny`] this value also provides the hysteresis
    /// pair: low = `threshold`, high = `2 * threshold`, unless
    /// [`canny_low`](Self::canny_low) / [`canny_high`](Self::canny_high)
    /// override them.
    pub threshold: u8,

    /// Flip the binary output (`255 - v`), applied last.
    pub invert: bool,

    /// Edge detector run between tone adjustment and thresholding.
    pub edge: EdgeMethod,

    /// Independent Canny low threshold, replacing `threshold`.
    pub canny_low: Option<f32>,

    /// Independent Canny high threshold, replacing `2 * threshold`.
    pub canny_high: Option<f32>,
}

impl FilterParams {
    /// Default brightness offset.
    pub const DEFAULT_BRIGHTNESS: i32 = 0;
    /// Default contrast percentage.
    pub const DEFAULT_CONTRAST: i32 = 0;
    /// Default binarization threshold.
    pub const DEFAULT_THRESHOLD: u8 = 128;

    /// Canny hysteresis thresholds `(low, high)`.
    #[must_use]
    pub fn canny_thresholds(&self) -> (f32, f32) {
        let low = self.canny_low.unwrap_or_else(|| f32::from(self.threshold));
        let high = self
            .canny_high
            .unwrap_or_else(|| 2.0 * f32::from(self.threshold));
        (low, high)
    }

    /// Reject out-of-range values.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidParameter`] naming the first
    /// offending field.
    pub fn validate(&self) -> Result<(), PipelineError> {
        check_range("brightness", self.brightness, -100..=100, "-100..=100")?;
        check_range("contrast", self.contrast, -100..=100, "-100..=100")?;
        let (low, high) = self.canny_thresholds();
        check_range("canny_low", low, 0.0..=f32::MAX, "a finite value >= 0")?;
        check_range("canny_high", high, low..=f32::MAX, "a finite value >= canny_low")?;
        Ok(())
    }
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            brightness: Self::DEFAULT_BRIGHTNESS,
            contrast: Self::DEFAULT_CONTRAST,
            threshold: Self::DEFAULT_THRESHOLD,
            invert: false,
            edge: EdgeMethod::default(),
            canny_low: None,
            canny_high: None,
        }
    }
}

/// Settings for the vectorization stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorizeParams {
    /// Which vectorizer to run.
    pub method: VectorizeMethod,

    /// Line pitch in pixels for hatch, spiral, concentric and stipple,
    /// `2..=20`.
    pub hatch_spacing: u32,

    /// Hatch direction in degrees counter-clockwise from horizontal,
    /// `0..=180`.
    pub hatch_angle: f64,
}

impl VectorizeParams {
    /// Default line pitch in pixels.
    pub const DEFAULT_HATCH_SPACING: u32 = 5;
    /// Default hatch angle in degrees.
    pub const DEFAULT_HATCH_ANGLE: f64 = 45.0;

    /// Reject out-of-range values.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidParameter`] naming the first
    /// offending field.
    pub fn validate(&self) -> Result<(), PipelineError> {
        check_range("hatch_spacing", self.hatch_spacing, 2..=20, "2..=20")?;
        check_range("hatch_angle", self.hatch_angle, 0.0..=180.0, "0..=180")?;
        Ok(())
    }
}

impl Default for VectorizeParams {
    fn default() -> Self {
        Self {
            method: VectorizeMethod::default(),
            hatch_spacing: Self::DEFAULT_HATCH_SPACING,
            hatch_angle: Self::DEFAULT_HATCH_ANGLE,
        }
    }
}

/// Which bed corner plot-space coordinates are measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlotOrigin {
    /// Machine convention: origin bottom-left, Y grows away from the operator.
    #[default]
    BottomLeft,
    /// Screen convention: origin top-left, Y grows downward.
    TopLeft,
}

/// Physical machine profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotProfile {
    /// Drawable bed width in millimetres.
    pub bed_width: f64,
    /// Drawable bed height in millimetres.
    pub bed_height: f64,
    /// Pen-down feed rate in mm/min.
    pub feed_rate: f64,
    /// Pen-up rapid rate in mm/min, used for time estimates only.
    pub travel_rate: f64,
    /// Z height the pen is raised to for travel moves, in millimetres.
    pub pen_lift: f64,
    /// Corner plot coordinates are measured from.
    pub origin: PlotOrigin,
    /// Emit the `;` comment block at the top of the program.
    pub include_header_comments: bool,
    /// Home (`G28`) before any motion and again at the end.
    pub add_homing: bool,
    /// Raise and lower the pen with explicit Z moves. When off the
    /// servo pair `M3`/`M5` is used instead.
    pub z_safety: bool,
}

impl PlotProfile {
    /// Default bed width in millimetres.
    pub const DEFAULT_BED_WIDTH: f64 = 100.0;
    /// Default bed height in millimetres.
    pub const DEFAULT_BED_HEIGHT: f64 = 100.0;
    /// Default pen-down feed rate in mm/min.
    pub const DEFAULT_FEED_RATE: f64 = 1000.0;
    /// Default pen-up rapid rate in mm/min.
    pub const DEFAULT_TRAVEL_RATE: f64 = 3000.0;
    /// Default pen lift in millimetres.
    pub const DEFAULT_PEN_LIFT: f64 = 5.0;
    /// Smallest feed rate; G-code prints feeds without decimals.
    pub const MIN_FEED_RATE: f64 = 1.0;
    /// Smallest pen lift; G-code prints Z with three decimals.
    pub const MIN_PEN_LIFT: f64 = 0.001;

    /// Reject non-positive or non-finite dimensions and rates, and feed
    /// rates or pen lifts too small to survive G-code formatting.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidParameter`] naming the first
    /// offending field.
    pub fn validate(&self) -> Result<(), PipelineError> {
        check_positive("bed_width", self.bed_width)?;
        check_positive("bed_height", self.bed_height)?;
        check_at_least(
            "feed_rate",
            self.feed_rate,
            Self::MIN_FEED_RATE,
            "a finite value >= 1 mm/min",
        )?;
        check_positive("travel_rate", self.travel_rate)?;
        check_at_least(
            "pen_lift",
            self.pen_lift,
            Self::MIN_PEN_LIFT,
            "a finite value >= 0.001 mm",
        )?;
        Ok(())
    }
}

impl Default for PlotProfile {
    fn default() -> Self {
        Self {
            bed_width: Self::DEFAULT_BED_WIDTH,
            bed_height: Self::DEFAULT_BED_HEIGHT,
            feed_rate: Self::DEFAULT_FEED_RATE,
            travel_rate: Self::DEFAULT_TRAVEL_RATE,
            pen_lift: Self::DEFAULT_PEN_LIFT,
            origin: PlotOrigin::default(),
            include_header_comments: true,
            add_homing: true,
            z_safety: true,
        }
    }
}

/// Configuration for one pipeline run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Filter stage settings.
    pub filter: FilterParams,
    /// Vectorization stage settings.
    pub vectorize: VectorizeParams,
    /// Target machine.
    pub profile: PlotProfile,
}

impl PipelineConfig {
    /// Validate every section.
    ///
    /// # Errors
    ///
    /// Returns the first [`PipelineError::InvalidParameter`] found.
    pub fn validate(&self) -> Result<(), PipelineError> {
        self.filter.validate()?;
        self.vectorize.validate()?;
        self.profile.validate()
    }
}

/// Result of running the pipeline through coordinate mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotResult {
    /// Ordered strokes in bed millimetres.
    pub paths: PathSet<PlotSpace>,

    /// Dimensions of the source raster in pixels.
    pub dimensions: Dimensions,
}

/// Errors that can occur during pipeline processing.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The encoded image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// A configuration value is outside its declared range.
    #[error("invalid parameter `{name}`: {value} (expected {expected})")]
    InvalidParameter {
        /// Field name.
        name: &'static str,
        /// Offending value, formatted.
        value: String,
        /// Human-readable description of the legal range.
        expected: &'static str,
    },

    /// A method name that is not recognised at all.
    #[error("unsupported {kind} method: {name:?}")]
    UnsupportedMethod {
        /// Which family of methods was being parsed.
        kind: &'static str,
        /// The unrecognised name.
        name: String,
    },

    /// A method that is declared but has no implementation.
    #[error("{0} is declared but not implemented")]
    NotImplemented(String),
}

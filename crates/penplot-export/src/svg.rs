//! SVG export serializer.
//!
//! Converts plot-space strokes into an SVG string with `<path>` elements
//! using the [`svg`] crate for document construction, XML escaping, and
//! path data formatting.
//!
//! The document is sized to the plotter bed in physical units, so a
//! browser or vector editor shows the drawing at the size it will plot.
//! Each path becomes a separate `<path>` element using `M` (move to) and
//! `L` (line to) commands.
//!
//! This is a pure function with no I/O -- it returns a `String`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use svg::Document;
use svg::node::element::path::Data;
use svg::node::element::{Description, Path, Title};
use svg::node::{Text, Value};

use penplot_pipeline::{PathSet, PlotOrigin, PlotProfile, PlotSpace, Point, Polyline};

use crate::ExportError;

const MM_PER_INCH: f64 = 25.4;

/// Physical unit for the document's `width`, `height`, and `viewBox`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SvgUnits {
    /// Millimetres.
    #[default]
    Mm,
    /// Inches.
    In,
}

impl SvgUnits {
    /// Every unit, in declaration order.
    pub const ALL: [Self; 2] = [Self::Mm, Self::In];

    /// Unit suffix used in `width` / `height`.
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Mm => "mm",
            Self::In => "in",
        }
    }

    /// Convert a length in millimetres into this unit.
    #[must_use]
    pub fn from_mm(self, mm: f64) -> f64 {
        match self {
            Self::Mm => mm,
            Self::In => mm / MM_PER_INCH,
        }
    }
}

impl fmt::Display for SvgUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

impl FromStr for SvgUnits {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|u| u.suffix() == s)
            .ok_or_else(|| ExportError::UnsupportedUnits(s.to_owned()))
    }
}

/// Styling and metadata for the exported document.
///
/// `title` and `description`, when present, become `<title>` and
/// `<desc>` elements immediately after the opening `<svg>` tag. Text
/// values are XML-escaped automatically by the `svg` crate.
#[derive(Debug, Clone)]
pub struct SvgOptions<'a> {
    /// Stroke width in millimetres, in `(0, 5]`.
    pub stroke_width: f64,

    /// Unit for the document size and coordinates.
    pub units: SvgUnits,

    /// Document title, typically the source image name.
    pub title: Option<&'a str>,

    /// Document description, typically the settings used.
    pub description: Option<&'a str>,
}

impl SvgOptions<'_> {
    /// Default stroke width in millimetres.
    pub const DEFAULT_STROKE_WIDTH: f64 = 0.5;
    /// Largest accepted stroke width in millimetres.
    pub const MAX_STROKE_WIDTH: f64 = 5.0;

    /// Reject stroke widths outside `(0, 5]` mm.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::InvalidStrokeWidth`].
    pub fn validate(&self) -> Result<(), ExportError> {
        let w = self.stroke_width;
        if w.is_finite() && w > 0.0 && w <= Self::MAX_STROKE_WIDTH {
            Ok(())
        } else {
            Err(ExportError::InvalidStrokeWidth(w))
        }
    }
}

impl Default for SvgOptions<'_> {
    fn default() -> Self {
        Self {
            stroke_width: Self::DEFAULT_STROKE_WIDTH,
            units: SvgUnits::default(),
            title: None,
            description: None,
        }
    }
}

/// Build an SVG path `d` attribute string from a plot-space polyline.
///
/// `project` maps each bed coordinate into document coordinates. A
/// single point becomes a zero-length segment so a round line cap
/// renders it as a dot. Returns `None` for an empty polyline.
fn build_path_data(polyline: &Polyline, project: impl Fn(Point) -> (f64, f64)) -> Option<String> {
    let (first, rest) = polyline.points().split_first()?;
    let start = project(*first);
    let mut data = Data::new().move_to(start);
    if rest.is_empty() {
        data = data.line_to(start);
    }
    for p in rest {
        data = data.line_to(project(*p));
    }
    Some(String::from(Value::from(data)))
}

/// Serialize plot-space strokes into an SVG document sized to the bed.
///
/// `width`/`height` carry the unit suffix and the `viewBox` is
/// `0 0 W H` in the same unit, so the view box always equals the bed.
/// A bottom-left plot origin is flipped back to SVG's top-left. Path
/// and point order are preserved exactly.
///
/// # Examples
///
/// ```
/// use penplot_export::{SvgOptions, to_svg};
/// use penplot_pipeline::{PathSet, PlotProfile, Point, Polyline};
///
/// let paths = PathSet::new(vec![Polyline::new(vec![
///     Point::new(10.0, 90.0),
///     Point::new(30.0, 60.0),
/// ])]);
/// let svg = to_svg(&paths, &PlotProfile::default(), &SvgOptions::default()).unwrap();
/// assert!(svg.contains(r#"viewBox="0 0 100 100""#));
/// assert!(svg.contains("M10,10 L30,40"));
/// ```
///
/// # Errors
///
/// Returns [`ExportError::Pipeline`] if `profile` fails validation and
/// [`ExportError::InvalidStrokeWidth`] for a bad stroke width.
pub fn to_svg(
    paths: &PathSet<PlotSpace>,
    profile: &PlotProfile,
    options: &SvgOptions<'_>,
) -> Result<String, ExportError> {
    profile.validate()?;
    options.validate()?;

    let units = options.units;
    let width = round3(units.from_mm(profile.bed_width));
    let height = round3(units.from_mm(profile.bed_height));
    let suffix = units.suffix();

    let mut doc = Document::new()
        .set("width", format!("{width}{suffix}"))
        .set("height", format!("{height}{suffix}"))
        .set("viewBox", format!("0 0 {width} {height}"));

    if let Some(title) = options.title {
        doc = doc.add(Title::new(title));
    }
    if let Some(description) = options.description {
        doc = doc.add(Description::new().add(Text::new(description)));
    }

    let flip = profile.origin == PlotOrigin::BottomLeft;
    let bed_height = profile.bed_height;
    let project = |p: Point| {
        let y = if flip { bed_height - p.y } else { p.y };
        (round3(units.from_mm(p.x)), round3(units.from_mm(y)))
    };
    let stroke_width = round3(units.from_mm(options.stroke_width));

    for polyline in paths {
        let Some(d) = build_path_data(polyline, &project) else {
            continue;
        };
        let path = Path::new()
            .set("d", d)
            .set("fill", "none")
            .set("stroke", "black")
            .set("stroke-width", stroke_width)
            .set("stroke-linecap", "round")
            .set("stroke-linejoin", "round");
        doc = doc.add(path);
    }

    tracing::debug!(paths = paths.len(), %units, "wrote SVG");

    // The svg crate omits the XML declaration, so we prepend it.
    Ok(format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{doc}\n"))
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0 + 0.0
}

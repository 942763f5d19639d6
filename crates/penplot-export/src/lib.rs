//! penplot-export: Pure format serializers (sans-IO)
//!
//! Converts plot-space strokes into output formats: a G-code motion
//! program for the plotter and an SVG document for preview. Both accept
//! only [`PathSet<PlotSpace>`](penplot_pipeline::PathSet), so pixel-space
//! strokes cannot be exported by accident.

pub mod gcode;
pub mod svg;

pub use gcode::to_gcode;
pub use svg::{SvgOptions, SvgUnits, to_svg};

use penplot_pipeline::PipelineError;

/// Errors that can occur while serializing.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// The plot profile failed validation.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// SVG stroke width outside `(0, 5]` mm.
    #[error("invalid stroke width {0} mm (expected a value in (0, 5])")]
    InvalidStrokeWidth(f64),

    /// An SVG unit name that is not recognised.
    #[error("unsupported SVG units: {0:?} (expected \"mm\" or \"in\")")]
    UnsupportedUnits(String),
}

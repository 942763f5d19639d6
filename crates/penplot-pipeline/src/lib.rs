//! penplot-pipeline: raster to pen-plotter strokes (sans-IO).
//!
//! Converts a single-channel raster into ordered strokes in bed
//! millimetres through:
//! filter -> vectorize -> reorder -> map.
//!
//! This crate has **no I/O dependencies**. It takes rasters (or encoded
//! image bytes via [`EncodedImage`]) and returns structured data; reading
//! files and writing G-code or SVG live in other crates.
//!
//! Coordinate spaces are tracked in the type system: the vectorizer
//! produces [`PathSet<PixelSpace>`](PathSet), the mapper consumes it and
//! produces [`PathSet<PlotSpace>`](PathSet), and serializers only accept
//! the latter.

pub mod canny;
pub mod concentric;
pub mod contour;
pub mod diagnostics;
pub mod filter;
pub mod generate;
pub mod hatch;
pub mod mapper;
pub mod optimize;
pub mod pipeline;
pub mod source;
pub mod spiral;
pub mod stats;
pub mod stipple;
pub mod types;
pub mod vectorize;

pub use diagnostics::{Clock, PipelineDiagnostics};
pub use filter::{EdgeMethod, apply_filters};
pub use generate::{Generator, GeneratorAlgorithm};
pub use mapper::map_to_plot;
pub use optimize::{reorder, reorder_from};
pub use pipeline::Pipeline;
pub use source::{EncodedImage, RasterSource};
pub use stats::PathStats;
pub use types::{
    CoordinateSpace, Dimensions, FilterParams, PathSet, PipelineConfig, PipelineError, PixelSpace,
    PlotOrigin, PlotProfile, PlotResult, PlotSpace, Point, Polyline, Raster, VectorizeParams,
};
pub use vectorize::{VectorizeMethod, Vectorizer, extract_paths};

use diagnostics::{PipelineSummary, StageDiagnostics};

/// Run the full pipeline.
///
/// # Pipeline steps
///
/// 1. Tone adjustment, optional edge detection, threshold, optional invert
/// 2. Vectorization (strategy chosen by `config.vectorize.method`)
/// 3. Greedy nearest-neighbour reordering
/// 4. Mapping onto the bed
///
/// An empty or all-background raster is not an error: it produces an
/// empty path set.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidParameter`] if any part of `config` is
/// out of range.
pub fn process(raster: &Raster, config: &PipelineConfig) -> Result<PlotResult, PipelineError> {
    Ok(Pipeline::new(raster, config.clone())
        .filter()?
        .vectorize()?
        .reorder()
        .map()?
        .into_result())
}

/// Run the full pipeline, timing each stage with `clock`.
///
/// Produces the same [`PlotResult`] as [`process`] plus per-stage
/// [`PipelineDiagnostics`].
///
/// # Errors
///
/// Same as [`process`].
pub fn process_with_diagnostics<C: Clock>(
    raster: &Raster,
    config: &PipelineConfig,
    clock: &C,
) -> Result<(PlotResult, PipelineDiagnostics), PipelineError> {
    let total_start = clock.now();

    let start = clock.now();
    let filtered = Pipeline::new(raster, config.clone()).filter()?;
    let filter = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: filtered.metrics(),
    };

    let start = clock.now();
    let vectorized = filtered.vectorize()?;
    let vectorize = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: vectorized.metrics(),
    };

    let start = clock.now();
    let reordered = vectorized.reorder();
    let reorder = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: reordered.metrics(),
    };

    let start = clock.now();
    let mapped = reordered.map()?;
    let map = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: mapped.metrics(),
    };

    let total_duration = clock.elapsed(&total_start);
    let result = mapped.into_result();
    let stats = PathStats::of(&result.paths);

    let diagnostics = PipelineDiagnostics {
        filter,
        vectorize,
        reorder,
        map,
        total_duration,
        summary: PipelineSummary {
            image_width: result.dimensions.width,
            image_height: result.dimensions.height,
            estimated_plot_time: stats.estimated_duration(&config.profile),
            stats,
        },
    };
    Ok((result, diagnostics))
}

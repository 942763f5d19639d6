//! Incremental pipeline: advance stage-by-stage, inspecting each
//! intermediate result before continuing.
//!
//! [`crate::process`] runs every stage in one call. [`Pipeline`] lets the
//! caller drive execution one step at a time:
//!
//! ```rust
//! # use penplot_pipeline::{Pipeline, PipelineConfig, PipelineError, Raster};
//! # fn run(raster: &Raster) -> Result<(), PipelineError> {
//! let config = PipelineConfig::default();
//! let result = Pipeline::new(raster, config)
//!     .filter()?
//!     .vectorize()?
//!     .reorder()
//!     .map()?
//!     .into_result();
//! # Ok(())
//! # }
//! ```
//!
//! Each stage method consumes `self` and returns the next state, so stages
//! cannot be skipped or run out of order. The pixel-space strokes are
//! consumed by [`Reordered::map`]; only plot-space strokes come out the
//! end.

use crate::diagnostics::StageMetrics;
use crate::mapper::PlotTransform;
use crate::optimize::travel_distance;
use crate::types::{
    Dimensions, PathSet, PipelineConfig, PipelineError, PixelSpace, PlotResult, PlotSpace, Raster,
};

/// Entry point for the staged pipeline.
pub struct Pipeline;

impl Pipeline {
    /// Start a pipeline over `raster`. Nothing is computed yet.
    #[allow(clippy::new_ret_no_self)]
    pub const fn new(raster: &Raster, config: PipelineConfig) -> Pending<'_> {
        Pending { config, raster }
    }
}

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// Pipeline state before any processing has occurred.
#[must_use = "pipeline stages are consumed by advancing; call .filter() to continue"]
pub struct Pending<'a> {
    config: PipelineConfig,
    raster: &'a Raster,
}

impl Pending<'_> {
    /// The input raster.
    #[must_use]
    pub const fn raster(&self) -> &Raster {
        self.raster
    }

    /// Run the filter stage.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidParameter`] if any part of the
    /// configuration is out of range. The whole configuration is checked
    /// here so a bad profile fails before any raster work is done.
    pub fn filter(self) -> Result<Filtered, PipelineError> {
        self.config.validate()?;
        let filtered = crate::filter::apply_filters(self.raster, &self.config.filter)?;
        Ok(Filtered {
            dimensions: Dimensions::of(self.raster),
            config: self.config,
            filtered,
        })
    }
}

// ───────────────────────── Stage 1: Filtered ─────────────────────────

/// Pipeline state after the filter stage.
#[must_use = "pipeline stages are consumed by advancing; call .vectorize() to continue"]
pub struct Filtered {
    config: PipelineConfig,
    dimensions: Dimensions,
    filtered: Raster,
}

impl Filtered {
    /// The binary raster the vectorizer will see.
    #[must_use]
    pub const fn filtered(&self) -> &Raster {
        &self.filtered
    }

    /// Metrics for this stage.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        StageMetrics::Filter {
            edge: self.config.filter.edge.to_string(),
            threshold: self.config.filter.threshold,
            foreground_pixels: crate::filter::count_foreground(&self.filtered),
            total_pixels: u64::from(self.dimensions.width) * u64::from(self.dimensions.height),
        }
    }

    /// Run the vectorization stage.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidParameter`] for out-of-range
    /// vectorize settings.
    pub fn vectorize(self) -> Result<Vectorized, PipelineError> {
        let paths = crate::vectorize::extract_paths(&self.filtered, &self.config.vectorize)?;
        Ok(Vectorized {
            config: self.config,
            dimensions: self.dimensions,
            paths,
        })
    }
}

// ──────────────────────── Stage 2: Vectorized ────────────────────────

/// Pipeline state after vectorization, strokes in pixel space.
#[must_use = "pipeline stages are consumed by advancing; call .reorder() to continue"]
pub struct Vectorized {
    config: PipelineConfig,
    dimensions: Dimensions,
    paths: PathSet<PixelSpace>,
}

impl Vectorized {
    /// Strokes in vectorizer order.
    #[must_use]
    pub const fn paths(&self) -> &PathSet<PixelSpace> {
        &self.paths
    }

    /// Metrics for this stage.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        StageMetrics::Vectorize {
            method: self.config.vectorize.method.to_string(),
            path_count: self.paths.len(),
            point_count: self.paths.point_count(),
        }
    }

    /// Reorder strokes to cut pen-up travel.
    pub fn reorder(self) -> Reordered {
        let travel_before = travel_distance(self.paths.paths());
        let paths = crate::optimize::reorder(self.paths);
        let travel_after = travel_distance(paths.paths());
        tracing::debug!(travel_before, travel_after, "reordered");
        Reordered {
            config: self.config,
            dimensions: self.dimensions,
            paths,
            travel_before,
            travel_after,
        }
    }
}

// ───────────────────────── Stage 3: Reordered ────────────────────────

/// Pipeline state after reordering, strokes still in pixel space.
#[must_use = "pipeline stages are consumed by advancing; call .map() to continue"]
pub struct Reordered {
    config: PipelineConfig,
    dimensions: Dimensions,
    paths: PathSet<PixelSpace>,
    travel_before: f64,
    travel_after: f64,
}

impl Reordered {
    /// Strokes in draw order.
    #[must_use]
    pub const fn paths(&self) -> &PathSet<PixelSpace> {
        &self.paths
    }

    /// Metrics for this stage.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        StageMetrics::Reorder {
            path_count: self.paths.len(),
            travel_before: self.travel_before,
            travel_after: self.travel_after,
        }
    }

    /// Map strokes onto the bed.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidParameter`] for an invalid profile.
    pub fn map(self) -> Result<Mapped, PipelineError> {
        let transform = PlotTransform::fit(self.dimensions, &self.config.profile);
        let paths = crate::mapper::map_to_plot(self.paths, self.dimensions, &self.config.profile)?;
        Ok(Mapped {
            dimensions: self.dimensions,
            paths,
            scale: transform.map_or(0.0, |t| t.scale),
        })
    }
}

// ────────────────────────── Stage 4: Mapped ──────────────────────────

/// Final pipeline state: strokes in bed millimetres.
#[must_use = "call .into_result() to take the output"]
pub struct Mapped {
    dimensions: Dimensions,
    paths: PathSet<PlotSpace>,
    scale: f64,
}

impl Mapped {
    /// Strokes in bed millimetres.
    #[must_use]
    pub const fn paths(&self) -> &PathSet<PlotSpace> {
        &self.paths
    }

    /// Metrics for this stage.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        StageMetrics::Map {
            scale: self.scale,
            path_count: self.paths.len(),
        }
    }

    /// Take the output.
    #[must_use]
    pub fn into_result(self) -> PlotResult {
        PlotResult {
            paths: self.paths,
            dimensions: self.dimensions,
        }
    }
}

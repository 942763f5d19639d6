//! Pipeline diagnostics: timing, counts, and other metrics for each stage.
//!
//! Collected by [`process_with_diagnostics`](crate::process_with_diagnostics)
//! for parameter tuning and profiling. Timing goes through the [`Clock`]
//! trait so the core never reads a system clock itself; the CLI supplies
//! one backed by [`std::time::Instant`] and tests supply a fake.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::stats::PathStats;

/// Source of timestamps for stage timing.
pub trait Clock {
    /// Opaque timestamp.
    type Instant;

    /// Current timestamp.
    fn now(&self) -> Self::Instant;

    /// Time since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs)
            .map_err(|_| serde::de::Error::custom("duration seconds must be finite and non-negative"))
    }
}

/// Diagnostics collected from a single pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// Tone, edge and threshold filters.
    pub filter: StageDiagnostics,
    /// Raster to strokes.
    pub vectorize: StageDiagnostics,
    /// Travel-reducing reorder.
    pub reorder: StageDiagnostics,
    /// Pixel to bed coordinates.
    pub map: StageDiagnostics,
    /// Total wall-clock duration of the entire pipeline (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary counts for the final output.
    pub summary: PipelineSummary,
}

/// Diagnostics for a single pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Filter stage metrics.
    Filter {
        /// Edge detector name.
        edge: String,
        /// Binarization threshold.
        threshold: u8,
        /// Foreground pixels in the binary output.
        foreground_pixels: u64,
        /// Total pixels, for computing density.
        total_pixels: u64,
    },
    /// Vectorization metrics.
    Vectorize {
        /// Vectorizer name.
        method: String,
        /// Strokes produced.
        path_count: usize,
        /// Points across all strokes.
        point_count: usize,
    },
    /// Reorder metrics, in pixels.
    Reorder {
        /// Strokes reordered.
        path_count: usize,
        /// Pen-up travel in vectorizer order.
        travel_before: f64,
        /// Pen-up travel after reordering.
        travel_after: f64,
    },
    /// Coordinate mapping metrics.
    Map {
        /// Millimetres per pixel, or 0 for an empty raster.
        scale: f64,
        /// Strokes mapped.
        path_count: usize,
    },
}

/// High-level summary for the entire pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Source raster width in pixels.
    pub image_width: u32,
    /// Source raster height in pixels.
    pub image_height: u32,
    /// Statistics of the plot-space output, in millimetres.
    pub stats: PathStats,
    /// Estimated plotting time (seconds).
    #[serde(with = "duration_serde")]
    pub estimated_plot_time: Duration,
}

impl PipelineDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Pipeline Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Image: {}x{}",
            self.summary.image_width, self.summary.image_height,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<24} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        let stages = [
            ("Filter", &self.filter),
            ("Vectorize", &self.vectorize),
            ("Reorder", &self.reorder),
            ("Map", &self.map),
        ];
        for (name, diag) in stages {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<24} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        let stats = &self.summary.stats;
        lines.push(String::new());
        lines.push(format!(
            "Paths: {}  |  Points: {}  |  Draw: {:.1}mm  |  Travel: {:.1}mm  |  Est. time: {:.1}s",
            stats.path_count,
            stats.point_count,
            stats.draw_length,
            stats.travel_length,
            self.summary.estimated_plot_time.as_secs_f64(),
        ));

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Filter {
            edge,
            threshold,
            foreground_pixels,
            total_pixels,
        } => {
            #[allow(clippy::cast_precision_loss)]
            let density = if *total_pixels > 0 {
                *foreground_pixels as f64 / *total_pixels as f64 * 100.0
            } else {
                0.0
            };
            format!("edge={edge} threshold={threshold} fg={foreground_pixels} ({density:.1}%)")
        }
        StageMetrics::Vectorize {
            method,
            path_count,
            point_count,
        } => format!("{method} {path_count} paths, {point_count} pts"),
        StageMetrics::Reorder {
            path_count,
            travel_before,
            travel_after,
        } => {
            let saved = if *travel_before > 0.0 {
                (1.0 - travel_after / travel_before) * 100.0
            } else {
                0.0
            };
            format!(
                "{path_count} paths, travel {travel_before:.1}->{travel_after:.1}px ({saved:.1}% saved)"
            )
        }
        StageMetrics::Map { scale, path_count } => {
            format!("scale={scale:.4}mm/px {path_count} paths")
        }
    }
}

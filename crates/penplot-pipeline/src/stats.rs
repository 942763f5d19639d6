//! Summary statistics for a path set.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::optimize::travel_distance;
use crate::types::{CoordinateSpace, PathSet, PlotProfile, Polyline};

/// Counts and distances for a path set, in the set's own units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PathStats {
    /// Number of strokes.
    pub path_count: usize,
    /// Number of points across all strokes.
    pub point_count: usize,
    /// Total pen-down distance.
    pub draw_length: f64,
    /// Total pen-up distance between consecutive strokes.
    pub travel_length: f64,
}

impl PathStats {
    /// Measure `paths` in draw order.
    #[must_use]
    pub fn of<S: CoordinateSpace>(paths: &PathSet<S>) -> Self {
        Self {
            path_count: paths.len(),
            point_count: paths.point_count(),
            draw_length: paths.iter().map(Polyline::length).sum(),
            travel_length: travel_distance(paths.paths()),
        }
    }

    /// Plotting time at the profile's feed and travel rates, ignoring
    /// acceleration and pen lifts. Only meaningful for plot-space stats.
    #[must_use]
    pub fn estimated_duration(&self, profile: &PlotProfile) -> Duration {
        let minutes = self.draw_length / profile.feed_rate + self.travel_length / profile.travel_rate;
        Duration::try_from_secs_f64(minutes * 60.0).unwrap_or_default()
    }
}

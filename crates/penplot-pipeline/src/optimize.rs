//! Path ordering: reorder and orient strokes to cut pen-up travel.
//!
//! Greedy nearest-neighbour chaining. From the current pen position the
//! unvisited stroke whose start *or* end is nearest gets drawn next; if its
//! end is the nearer one the stroke is reversed so the pen lands on its
//! start. Endpoints live in an R\*-tree so each step is a nearest-neighbour
//! query instead of a scan.
//!
//! This is a heuristic, not an optimal tour. Ties are broken by lowest
//! original index, then start before end, so identical input always gives
//! identical output.

use rstar::primitives::GeomWithData;
use rstar::{PointDistance, RTree};

use crate::types::{CoordinateSpace, PathSet, Point, Polyline};

/// Which end of a stroke an index entry refers to. Ordering matters: on a
/// distance tie the start wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum End {
    Start,
    Finish,
}

type Entry = GeomWithData<[f64; 2], (usize, End)>;

/// One step of a greedy chain: which item to draw and in which direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visit {
    /// Index into the input.
    pub index: usize,
    /// Draw from the item's end to its start.
    pub reversed: bool,
}

/// Reorder strokes starting from the first stroke's start point.
#[must_use = "returns the reordered path set"]
pub fn reorder<S: CoordinateSpace>(paths: PathSet<S>) -> PathSet<S> {
    let start = paths
        .paths()
        .first()
        .and_then(Polyline::first)
        .copied()
        .unwrap_or(Point::new(0.0, 0.0));
    reorder_from(paths, start)
}

/// Reorder strokes for a pen that starts at `start`.
#[must_use = "returns the reordered path set"]
pub fn reorder_from<S: CoordinateSpace>(paths: PathSet<S>, start: Point) -> PathSet<S> {
    // Pair each stroke with its ends before chaining so indices into
    // `ends` and `polylines` always agree.
    let (polylines, ends): (Vec<Polyline>, Vec<(Point, Point)>) = paths
        .into_paths()
        .into_iter()
        .filter_map(|p| {
            let ends = (*p.first()?, *p.last()?);
            Some((p, ends))
        })
        .unzip();

    let order = greedy_chain(&ends, start);

    let mut slots: Vec<Option<Polyline>> = polylines.into_iter().map(Some).collect();
    order
        .into_iter()
        .filter_map(|visit| {
            let path = slots.get_mut(visit.index)?.take()?;
            Some(if visit.reversed { path.reversed() } else { path })
        })
        .collect()
}

/// Chain single points (e.g. stipple dots) nearest-first, starting with
/// the first point.
#[must_use = "returns the ordered points"]
pub fn order_points(points: &[Point]) -> Vec<Point> {
    let Some(&start) = points.first() else {
        return Vec::new();
    };
    let ends: Vec<(Point, Point)> = points.iter().map(|&p| (p, p)).collect();
    greedy_chain(&ends, start)
        .into_iter()
        .map(|visit| points[visit.index])
        .collect()
}

/// Greedy nearest-neighbour chain over items with a start and an end.
///
/// Returns every index exactly once.
#[must_use]
pub fn greedy_chain(ends: &[(Point, Point)], start: Point) -> Vec<Visit> {
    let entries: Vec<Entry> = ends
        .iter()
        .enumerate()
        .flat_map(|(i, &(s, e))| {
            [
                Entry::new([s.x, s.y], (i, End::Start)),
                Entry::new([e.x, e.y], (i, End::Finish)),
            ]
        })
        .collect();
    let mut tree = RTree::bulk_load(entries);

    let mut pen = start;
    let mut order = Vec::with_capacity(ends.len());

    while let Some((index, end)) = nearest(&tree, pen) {
        let (s, e) = ends[index];
        tree.remove(&Entry::new([s.x, s.y], (index, End::Start)));
        tree.remove(&Entry::new([e.x, e.y], (index, End::Finish)));

        let reversed = end == End::Finish;
        pen = if reversed { s } else { e };
        order.push(Visit { index, reversed });
    }

    order
}

/// Nearest entry to `pen`, ties broken by `(index, End)`.
fn nearest(tree: &RTree<Entry>, pen: Point) -> Option<(usize, End)> {
    let query = [pen.x, pen.y];
    let mut candidates = tree.nearest_neighbor_iter(&query);
    let first = candidates.next()?;
    let best = first.distance_2(&query);
    candidates
        .take_while(|e| e.distance_2(&query) <= best)
        .map(|e| e.data)
        .chain(std::iter::once(first.data))
        .min()
}

/// Sum of pen-up gaps between consecutive strokes.
#[must_use]
pub fn travel_distance(paths: &[Polyline]) -> f64 {
    paths
        .windows(2)
        .filter_map(|pair| Some(pair[0].last()?.distance(*pair[1].first()?)))
        .sum()
}

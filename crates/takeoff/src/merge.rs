//! Snapping and merging of fragmented strokes.
//!
//! Drawing exports often break one logical line into many short segments
//! (a rectangle as four 2-point strokes, a pipe run split at every label).
//! [`GeometryMerger`] snaps every vertex to a grid, nodes the resulting
//! segments at crossings and overlaps, and walks the segment graph into
//! maximal polylines.
//!
//! The segment graph is a [`petgraph::graphmap::UnGraphMap`] keyed by grid
//! coordinates; node iteration follows insertion order, which keeps the
//! output deterministic.

use std::collections::HashSet;

use indexmap::IndexMap;
use log::debug;
use petgraph::graphmap::UnGraphMap;

use takeoff_core::{
    feature::ClassifiedFeature,
    geometry::{Point, close_ring},
};

use crate::config::MergeConfig;

/// Grid coordinates of a snapped vertex.
type Key = (i64, i64);

/// An undirected segment between two grid vertices.
type Segment = (Key, Key);

const EPSILON: f64 = 1e-9;

/// Merges touching and overlapping line fragments into maximal polylines.
#[derive(Debug, Clone)]
pub struct GeometryMerger {
    tolerance: f64,
}

impl GeometryMerger {
    /// Creates a merger snapping to `config.snap_tolerance`.
    ///
    /// Non-positive tolerances fall back to a fine grid of `1e-6` units.
    pub fn new(config: &MergeConfig) -> Self {
        let tolerance = if config.snap_tolerance > 0.0 {
            config.snap_tolerance
        } else {
            1e-6
        };
        Self { tolerance }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Rounds a point to the nearest grid vertex.
    pub fn snap(&self, point: Point) -> Point {
        self.point(self.key(point))
    }

    fn key(&self, point: Point) -> Key {
        (
            (point.x() / self.tolerance).round() as i64,
            (point.y() / self.tolerance).round() as i64,
        )
    }

    fn point(&self, key: Key) -> Point {
        Point::new(key.0 as f64 * self.tolerance, key.1 as f64 * self.tolerance)
    }

    /// Snapped, non-degenerate segments of a polyline.
    fn segments(&self, points: &[Point]) -> impl Iterator<Item = Segment> {
        points
            .windows(2)
            .map(|w| (self.key(w[0]), self.key(w[1])))
            .filter(|(a, b)| a != b)
    }

    /// Merges polylines into maximal continuous polylines.
    ///
    /// Polylines that are already continuous and cross nothing come back
    /// unchanged (up to snapping).
    pub fn merge_lines(&self, lines: &[Vec<Point>]) -> Vec<Vec<Point>> {
        let segments: Vec<Segment> = lines.iter().flat_map(|l| self.segments(l)).collect();
        let noded = dedup_segments(node_segments(&segments));
        let merged = walk_segments(&noded);
        debug!(
            input = lines.len(),
            segments = noded.len(),
            output = merged.len();
            "Merged line fragments"
        );
        merged
            .into_iter()
            .map(|path| path.into_iter().map(|key| self.point(key)).collect())
            .collect()
    }

    /// Merges classified features bucket by bucket.
    ///
    /// Features are grouped by category, material and diameter so merged
    /// polylines keep their attributes. Each merged polyline carries the
    /// lowest confidence of its group.
    pub fn merge_features(&self, features: &[ClassifiedFeature]) -> Vec<ClassifiedFeature> {
        let mut groups: IndexMap<_, Vec<&ClassifiedFeature>> = IndexMap::new();
        for feature in features {
            groups.entry(feature.bucket()).or_default().push(feature);
        }

        let mut merged = Vec::new();
        for group in groups.values() {
            let lines: Vec<Vec<Point>> = group.iter().map(|f| f.points.clone()).collect();
            let confidence = group
                .iter()
                .map(|f| f.confidence)
                .fold(1.0_f64, f64::min);
            let template = group[0];
            for points in self.merge_lines(&lines) {
                let mut feature =
                    ClassifiedFeature::new(template.category.clone(), points, confidence);
                feature.diameter_in = template.diameter_in;
                feature.material = template.material.clone();
                merged.push(feature);
            }
        }
        merged
    }

    /// Outer boundary of a set of rings.
    ///
    /// Edges shared by two adjacent rings cancel out, so touching rings
    /// produce the outline of their union.
    pub fn outline(&self, rings: &[Vec<Point>]) -> Vec<Vec<Point>> {
        let segments: Vec<Segment> = rings
            .iter()
            .flat_map(|ring| self.segments(&close_ring(ring)).collect::<Vec<_>>())
            .collect();

        let mut counts: IndexMap<Segment, usize> = IndexMap::new();
        for segment in node_segments(&segments) {
            *counts.entry(normalized(segment)).or_default() += 1;
        }
        let boundary: Vec<Segment> = counts
            .into_iter()
            .filter(|(_, count)| *count == 1)
            .map(|(segment, _)| segment)
            .collect();

        walk_segments(&boundary)
            .into_iter()
            .map(|path| path.into_iter().map(|key| self.point(key)).collect())
            .collect()
    }
}

fn normalized((a, b): Segment) -> Segment {
    if a <= b { (a, b) } else { (b, a) }
}

/// Removes repeated segments regardless of direction, keeping first-seen order.
fn dedup_segments(segments: Vec<Segment>) -> Vec<Segment> {
    let mut seen = HashSet::new();
    segments
        .into_iter()
        .filter(|segment| seen.insert(normalized(*segment)))
        .collect()
}

fn cross(ax: f64, ay: f64, bx: f64, by: f64) -> f64 {
    ax * by - ay * bx
}

fn as_f64(key: Key) -> (f64, f64) {
    (key.0 as f64, key.1 as f64)
}

/// Parameter of `p` projected onto segment `(a, b)`.
fn project(a: Key, b: Key, p: Key) -> f64 {
    let (ax, ay) = as_f64(a);
    let (bx, by) = as_f64(b);
    let (px, py) = as_f64(p);
    let (dx, dy) = (bx - ax, by - ay);
    ((px - ax) * dx + (py - ay) * dy) / (dx * dx + dy * dy)
}

fn is_interior(t: f64) -> bool {
    t > EPSILON && t < 1.0 - EPSILON
}

/// Splits segments wherever another segment crosses, touches or overlaps
/// them, so that the result only meets at shared endpoints.
///
/// Quadratic in the number of segments, with a bounding-box rejection.
fn node_segments(segments: &[Segment]) -> Vec<Segment> {
    let mut splits: Vec<Vec<(f64, Key)>> = vec![Vec::new(); segments.len()];

    for i in 0..segments.len() {
        for j in (i + 1)..segments.len() {
            let (a, b) = segments[i];
            let (c, d) = segments[j];
            if !boxes_touch(segments[i], segments[j]) {
                continue;
            }

            let (ax, ay) = as_f64(a);
            let (bx, by) = as_f64(b);
            let (cx, cy) = as_f64(c);
            let (dx, dy) = as_f64(d);
            let (rx, ry) = (bx - ax, by - ay);
            let (sx, sy) = (dx - cx, dy - cy);
            let denom = cross(rx, ry, sx, sy);

            if denom.abs() > EPSILON {
                let t = cross(cx - ax, cy - ay, sx, sy) / denom;
                let u = cross(cx - ax, cy - ay, rx, ry) / denom;
                let on_segment = -EPSILON..=1.0 + EPSILON;
                if !on_segment.contains(&t) || !on_segment.contains(&u) {
                    continue;
                }
                let hit = ((ax + t * rx).round() as i64, (ay + t * ry).round() as i64);
                if is_interior(t) {
                    splits[i].push((project(a, b, hit), hit));
                }
                if is_interior(u) {
                    splits[j].push((project(c, d, hit), hit));
                }
            } else if cross(cx - ax, cy - ay, rx, ry).abs() <= EPSILON {
                for p in [c, d] {
                    let t = project(a, b, p);
                    if is_interior(t) {
                        splits[i].push((t, p));
                    }
                }
                for p in [a, b] {
                    let u = project(c, d, p);
                    if is_interior(u) {
                        splits[j].push((u, p));
                    }
                }
            }
        }
    }

    let mut noded = Vec::with_capacity(segments.len());
    for (segment, mut cuts) in segments.iter().zip(splits) {
        cuts.sort_by(|x, y| x.0.total_cmp(&y.0));
        let mut previous = segment.0;
        for (_, key) in cuts.into_iter().chain([(1.0, segment.1)]) {
            if key != previous {
                noded.push((previous, key));
                previous = key;
            }
        }
    }
    noded
}

fn boxes_touch((a, b): Segment, (c, d): Segment) -> bool {
    a.0.min(b.0) <= c.0.max(d.0)
        && c.0.min(d.0) <= a.0.max(b.0)
        && a.1.min(b.1) <= c.1.max(d.1)
        && c.1.min(d.1) <= a.1.max(b.1)
}

/// Walks a noded segment set into maximal paths.
///
/// Paths start at vertices whose degree is not two; what remains afterwards
/// are closed cycles, which are walked from their first-inserted vertex.
fn walk_segments(segments: &[Segment]) -> Vec<Vec<Key>> {
    let mut graph: UnGraphMap<Key, ()> = UnGraphMap::new();
    for (a, b) in segments {
        graph.add_edge(*a, *b, ());
    }

    let mut visited: HashSet<Segment> = HashSet::new();
    let mut paths = Vec::new();

    let starts: Vec<Key> = graph
        .nodes()
        .filter(|n| graph.neighbors(*n).count() != 2)
        .collect();
    for start in starts {
        let neighbors: Vec<Key> = graph.neighbors(start).collect();
        for next in neighbors {
            if visited.contains(&normalized((start, next))) {
                continue;
            }
            paths.push(walk_from(&graph, &mut visited, start, next));
        }
    }

    let nodes: Vec<Key> = graph.nodes().collect();
    for start in nodes {
        let neighbors: Vec<Key> = graph.neighbors(start).collect();
        for next in neighbors {
            if visited.contains(&normalized((start, next))) {
                continue;
            }
            paths.push(walk_from(&graph, &mut visited, start, next));
        }
    }
    paths
}

/// Follows degree-two vertices from `start` through `next` until a branch,
/// an end, or an already visited edge.
fn walk_from(
    graph: &UnGraphMap<Key, ()>,
    visited: &mut HashSet<Segment>,
    start: Key,
    next: Key,
) -> Vec<Key> {
    let mut path = vec![start, next];
    visited.insert(normalized((start, next)));
    let mut previous = start;
    let mut current = next;

    while graph.neighbors(current).count() == 2 {
        let Some(following) = graph.neighbors(current).find(|n| *n != previous) else {
            break;
        };
        if !visited.insert(normalized((current, following))) {
            break;
        }
        path.push(following);
        previous = current;
        current = following;
    }
    path
}

//! Service-area polygons built from a reachability footprint.

use geo::{BooleanOps, ConcaveHull, Coord, LineString, MultiPoint, MultiPolygon, Point, Polygon, SimplifyVwPreserve};
use serde::{Deserialize, Serialize};

/// Vertices used to approximate a round buffer around a point.
const DISC_VERTICES: usize = 8;

/// How reached nodes are turned into an area.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GeometryStrategy {
    /// Buffer every traversed road by the corridor half-width and take the union.
    #[default]
    Corridor,
    /// Wrap each connected group of buffered nodes in a concave hull.
    /// Higher concavity gives a smoother, more convex outline.
    ConcaveHull { concavity: f64 },
}

/// What a bounded search touched on the ground: points and the road segments
/// joining them. Segment ends index into `points`.
#[derive(Debug, Clone, Default)]
pub(crate) struct Footprint {
    pub points: Vec<Coord<f64>>,
    pub segments: Vec<(usize, usize)>,
}

impl Footprint {
    pub fn push_point(&mut self, coord: Coord<f64>) -> usize {
        self.points.push(coord);
        self.points.len() - 1
    }

    /// Point indices grouped by connectivity over segments, in first-seen order.
    fn components(&self) -> Vec<Vec<usize>> {
        let mut parent: Vec<usize> = (0..self.points.len()).collect();

        fn find(parent: &mut [usize], mut i: usize) -> usize {
            while parent[i] != i {
                parent[i] = parent[parent[i]];
                i = parent[i];
            }
            i
        }

        for &(a, b) in &self.segments {
            let ra = find(&mut parent, a);
            let rb = find(&mut parent, b);
            if ra != rb {
                parent[ra.max(rb)] = ra.min(rb);
            }
        }

        let mut slot: Vec<Option<usize>> = vec![None; self.points.len()];
        let mut groups: Vec<Vec<usize>> = Vec::new();
        for i in 0..self.points.len() {
            let root = find(&mut parent, i);
            let group = match slot[root] {
                Some(group) => group,
                None => {
                    groups.push(Vec::new());
                    slot[root] = Some(groups.len() - 1);
                    groups.len() - 1
                }
            };
            groups[group].push(i);
        }
        groups
    }
}

/// Polygon parts for `footprint`, simplified with `simplify_tolerance` (0 keeps every vertex).
pub(crate) fn build(
    footprint: &Footprint,
    strategy: GeometryStrategy,
    half_width: f64,
    simplify_tolerance: f64,
) -> MultiPolygon<f64> {
    let area = match strategy {
        GeometryStrategy::Corridor => corridor(footprint, half_width),
        GeometryStrategy::ConcaveHull { concavity } => concave_hulls(footprint, half_width, concavity),
    };
    simplify(area, simplify_tolerance)
}

/// Topology-preserving Visvalingam-Whyatt simplification. A vertex is dropped
/// when the triangle it forms with its neighbours is smaller than `tolerance²`,
/// i.e. it deviates by well under `tolerance` along any edge of that length.
fn simplify(area: MultiPolygon<f64>, tolerance: f64) -> MultiPolygon<f64> {
    if tolerance <= 0.0 || area.0.is_empty() {
        return area;
    }
    let simplified = area.simplify_vw_preserve(&(tolerance * tolerance));
    MultiPolygon::new(
        simplified
            .0
            .into_iter()
            .filter(|part| part.exterior().0.len() >= 4)
            .collect(),
    )
}

fn corridor(footprint: &Footprint, half_width: f64) -> MultiPolygon<f64> {
    let mut pieces: Vec<MultiPolygon<f64>> = footprint
        .points
        .iter()
        .map(|&center| MultiPolygon::new(vec![disc(center, half_width)]))
        .collect();

    pieces.extend(footprint.segments.iter().filter_map(|&(a, b)| {
        band(footprint.points[a], footprint.points[b], half_width).map(|poly| MultiPolygon::new(vec![poly]))
    }));

    union_all(pieces)
}

fn concave_hulls(footprint: &Footprint, half_width: f64, concavity: f64) -> MultiPolygon<f64> {
    let hulls = footprint
        .components()
        .into_iter()
        .map(|group| {
            let cloud: Vec<Point<f64>> = group
                .iter()
                .flat_map(|&i| disc_vertices(footprint.points[i], half_width))
                .map(Point::from)
                .collect();
            MultiPolygon::new(vec![MultiPoint::new(cloud).concave_hull(concavity)])
        })
        .collect();

    union_all(hulls)
}

/// Regular polygon of radius `radius` around `center`.
fn disc(center: Coord<f64>, radius: f64) -> Polygon<f64> {
    Polygon::new(LineString::from(disc_vertices(center, radius)), Vec::new())
}

fn disc_vertices(center: Coord<f64>, radius: f64) -> Vec<Coord<f64>> {
    (0..DISC_VERTICES)
        .map(|k| {
            let angle = std::f64::consts::TAU * k as f64 / DISC_VERTICES as f64;
            Coord {
                x: center.x + radius * angle.cos(),
                y: center.y + radius * angle.sin(),
            }
        })
        .collect()
}

/// Rectangle of half-width `half_width` around segment `a`-`b`, extended past
/// both ends so that consecutive bands overlap at shared nodes.
fn band(a: Coord<f64>, b: Coord<f64>, half_width: f64) -> Option<Polygon<f64>> {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len = dx.hypot(dy);
    if len <= f64::EPSILON {
        return None;
    }

    let (ux, uy) = (dx / len * half_width, dy / len * half_width);
    let (nx, ny) = (-uy, ux);
    let start = Coord { x: a.x - ux, y: a.y - uy };
    let end = Coord { x: b.x + ux, y: b.y + uy };

    Some(Polygon::new(
        LineString::from(vec![
            Coord { x: start.x + nx, y: start.y + ny },
            Coord { x: end.x + nx, y: end.y + ny },
            Coord { x: end.x - nx, y: end.y - ny },
            Coord { x: start.x - nx, y: start.y - ny },
        ]),
        Vec::new(),
    ))
}

/// Pairwise union in rounds; keeps each boolean operation small.
fn union_all(mut parts: Vec<MultiPolygon<f64>>) -> MultiPolygon<f64> {
    while parts.len() > 1 {
        let mut merged = Vec::with_capacity(parts.len().div_ceil(2));
        let mut iter = parts.into_iter();
        while let Some(left) = iter.next() {
            match iter.next() {
                Some(right) => merged.push(left.union(&right)),
                None => merged.push(left),
            }
        }
        parts = merged;
    }
    parts.pop().unwrap_or_else(|| MultiPolygon::new(Vec::new()))
}

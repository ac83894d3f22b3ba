//! Candidate site generation from coverage gaps.
//!
//! Candidates are proposed where the uncovered residents are: centres of
//! residential clusters, the population-weighted centre of each gap, and
//! major-road nodes near that centre. Every candidate is snapped to a graph
//! node so its isochrone can be computed.

use std::collections::HashSet;

use geo::Coord;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::accessibility::CoverageGap;
use crate::graph::{NodeId, RoutableGraph};
use crate::model::{CandidateId, CandidateOrigin, CandidateSite, DemandPoint, FacilityType};
use crate::traits::DistanceMetric;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateOptions {
    /// Radius of the neighbourhood that forms a residential cluster.
    pub cluster_radius: f64,
    /// Residences needed for a neighbourhood to count as a cluster.
    pub min_cluster_size: usize,
    pub zone_centroids: bool,
    pub major_roads: bool,
    /// Major-road nodes farther than this from a gap's centre are ignored.
    pub road_search_radius: f64,
}

impl Default for CandidateOptions {
    fn default() -> Self {
        Self {
            cluster_radius: 200.0,
            min_cluster_size: 3,
            zone_centroids: true,
            major_roads: true,
            road_search_radius: 20_000.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CandidateGenerator<M> {
    options: CandidateOptions,
    metric: M,
}

impl<M: DistanceMetric> CandidateGenerator<M> {
    pub fn new(options: CandidateOptions, metric: M) -> Self {
        Self { options, metric }
    }

    /// Candidate pool for all gaps. Ids are assigned in generation order and
    /// each (node, facility type) pair appears once.
    pub fn generate(&self, graph: &RoutableGraph, gaps: &[CoverageGap]) -> Vec<CandidateSite> {
        let mut pool: Vec<CandidateSite> = Vec::new();
        let mut seen: HashSet<(NodeId, FacilityType)> = HashSet::new();

        for gap in gaps {
            let mut propose = |node: NodeId, origin: CandidateOrigin| {
                if !seen.insert((node, gap.facility_type)) {
                    return;
                }
                let Ok(coord) = graph.coord(node) else { return };
                pool.push(CandidateSite {
                    id: CandidateId(pool.len() as u32),
                    node,
                    coord,
                    facility_type: gap.facility_type,
                    cost: None,
                    origin,
                });
            };

            for center in self.cluster_centers(&gap.uncovered) {
                if let Some(node) = graph.nearest_node(center, &self.metric) {
                    propose(node, CandidateOrigin::ResidentialCluster);
                }
            }

            let Some(centroid) = weighted_centroid(&gap.uncovered) else {
                continue;
            };
            if self.options.zone_centroids {
                if let Some(node) = graph.nearest_node(centroid, &self.metric) {
                    propose(node, CandidateOrigin::ZoneCentroid);
                }
            }
            if self.options.major_roads {
                for node in self.major_roads_near(graph, centroid) {
                    propose(node, CandidateOrigin::MajorRoad);
                }
            }
        }

        debug!(event = "candidates", gaps = gaps.len(), candidates = pool.len());
        pool
    }

    /// Centres of dense neighbourhoods: every unvisited residence with at least
    /// `min_cluster_size` residences within `cluster_radius` seeds a cluster whose
    /// members are then marked visited.
    pub fn cluster_centers(&self, points: &[DemandPoint]) -> Vec<Coord<f64>> {
        let mut visited = vec![false; points.len()];
        let mut centers = Vec::new();

        for (i, point) in points.iter().enumerate() {
            if visited[i] {
                continue;
            }
            let members: Vec<usize> = points
                .iter()
                .enumerate()
                .filter(|(_, other)| self.metric.distance(point.coord, other.coord) <= self.options.cluster_radius)
                .map(|(j, _)| j)
                .collect();
            if members.len() < self.options.min_cluster_size {
                continue;
            }

            let n = members.len() as f64;
            let (sx, sy) = members.iter().fold((0.0, 0.0), |(sx, sy), &j| {
                (sx + points[j].coord.x, sy + points[j].coord.y)
            });
            centers.push(Coord { x: sx / n, y: sy / n });
            for j in members {
                visited[j] = true;
            }
        }

        centers
    }

    fn major_roads_near(&self, graph: &RoutableGraph, center: Coord<f64>) -> Vec<NodeId> {
        let mut nodes: Vec<(f64, NodeId)> = graph
            .nodes()
            .iter()
            .filter(|node| node.is_major_road())
            .map(|node| (self.metric.distance(center, node.coord), node.id))
            .filter(|(distance, _)| *distance <= self.options.road_search_radius)
            .collect();
        nodes.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        nodes.into_iter().map(|(_, id)| id).collect()
    }
}

/// Population-weighted centre; `None` when the points carry no weight.
fn weighted_centroid(points: &[DemandPoint]) -> Option<Coord<f64>> {
    let total: f64 = points.iter().map(|point| point.weight).sum();
    if total <= 0.0 {
        return None;
    }
    let (x, y) = points.iter().fold((0.0, 0.0), |(x, y), point| {
        (x + point.coord.x * point.weight, y + point.coord.y * point.weight)
    });
    Some(Coord {
        x: x / total,
        y: y / total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::Planar;

    #[test]
    fn test_cluster_needs_min_size() {
        let generator = CandidateGenerator::new(CandidateOptions::default(), Planar);
        let points = vec![
            DemandPoint::new(1, 0.0, 0.0, 1.0, 1),
            DemandPoint::new(2, 50.0, 0.0, 1.0, 1),
            DemandPoint::new(3, 5000.0, 0.0, 1.0, 1),
        ];
        assert!(generator.cluster_centers(&points).is_empty());
    }

    #[test]
    fn test_cluster_center_is_member_mean() {
        let generator = CandidateGenerator::new(CandidateOptions::default(), Planar);
        let points = vec![
            DemandPoint::new(1, 0.0, 0.0, 1.0, 1),
            DemandPoint::new(2, 90.0, 0.0, 1.0, 1),
            DemandPoint::new(3, 0.0, 90.0, 1.0, 1),
            DemandPoint::new(4, 9000.0, 0.0, 1.0, 1),
        ];
        let centers = generator.cluster_centers(&points);
        assert_eq!(centers, vec![Coord { x: 30.0, y: 30.0 }]);
    }

    #[test]
    fn test_weighted_centroid() {
        let points = vec![
            DemandPoint::new(1, 0.0, 0.0, 3.0, 1),
            DemandPoint::new(2, 100.0, 0.0, 1.0, 1),
        ];
        assert_eq!(weighted_centroid(&points), Some(Coord { x: 25.0, y: 0.0 }));
        assert_eq!(weighted_centroid(&[]), None);
    }
}

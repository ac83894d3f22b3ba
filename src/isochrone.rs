//! Isochrone engine: bounded shortest-path search plus service-area geometry.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, HashSet};

use geo::{Coord, Intersects, MultiPolygon, Point};
use ordered_float::OrderedFloat;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::geometry::{self, Footprint, GeometryStrategy};
use crate::graph::{EdgeKind, NodeId, PerMode, RoutableGraph, TravelMode};
use crate::model::{Facility, FacilityId, FacilityType};
use crate::rules::{ComplianceRule, ComplianceRuleset};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IsochroneOptions {
    pub strategy: GeometryStrategy,
    /// Corridor half-width per mode, in coordinate units (metres).
    pub half_width: PerMode<f64>,
    /// Draw the reachable fraction of edges the budget runs out on.
    pub include_partial_edges: bool,
    /// Simplification tolerance for the area outline, in metres. 0 disables it.
    pub simplify_tolerance: f64,
}

impl Default for IsochroneOptions {
    fn default() -> Self {
        Self {
            strategy: GeometryStrategy::Corridor,
            half_width: PerMode {
                walk: 50.0,
                drive: 70.0,
                transit: 50.0,
            },
            include_partial_edges: true,
            simplify_tolerance: 10.0,
        }
    }
}

/// Minimal cost to a reached node and the edge count of the path that achieves it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reach {
    pub cost: f64,
    pub hops: u32,
}

/// Area reachable from a source within a cost budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Isochrone {
    pub source: NodeId,
    pub mode: TravelMode,
    pub budget: f64,
    pub reached: BTreeMap<NodeId, Reach>,
    /// Polygon parts; disconnected reachable areas stay separate.
    pub area: MultiPolygon<f64>,
}

impl Isochrone {
    pub fn reached_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.reached.keys().copied()
    }

    pub fn reaches(&self, node: NodeId) -> bool {
        self.reached.contains_key(&node)
    }

    pub fn cost_to(&self, node: NodeId) -> Option<f64> {
        self.reached.get(&node).map(|reach| reach.cost)
    }

    /// Whether `coord` lies inside or on the boundary of the area.
    pub fn covers(&self, coord: Coord<f64>) -> bool {
        self.area.intersects(&Point::from(coord))
    }

    pub fn part_count(&self) -> usize {
        self.area.0.len()
    }
}

/// Computes an isochrone with default geometry options.
pub fn compute(graph: &RoutableGraph, source: NodeId, budget: f64, mode: TravelMode) -> Result<Isochrone> {
    IsochroneEngine::new(graph, IsochroneOptions::default()).compute(source, budget, mode)
}

/// Isochrones of an existing facility, one per threshold of its rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceArea {
    pub facility_id: FacilityId,
    pub facility_type: FacilityType,
    pub node: NodeId,
    pub isochrones: Vec<Isochrone>,
}

impl ServiceArea {
    pub fn covers(&self, coord: Coord<f64>) -> bool {
        self.isochrones.iter().any(|iso| iso.covers(coord))
    }
}

/// Isochrone computation over one shared, read-only graph.
#[derive(Debug, Clone, Copy)]
pub struct IsochroneEngine<'g> {
    graph: &'g RoutableGraph,
    options: IsochroneOptions,
}

impl<'g> IsochroneEngine<'g> {
    pub fn new(graph: &'g RoutableGraph, options: IsochroneOptions) -> Self {
        Self { graph, options }
    }

    pub fn graph(&self) -> &'g RoutableGraph {
        self.graph
    }

    pub fn compute(&self, source: NodeId, budget: f64, mode: TravelMode) -> Result<Isochrone> {
        let graph = self.graph;
        if graph.is_empty() {
            return Err(Error::EmptyGraph);
        }
        if !budget.is_finite() || budget <= 0.0 {
            return Err(Error::InvalidBudget(budget));
        }
        let start = graph.index_of(source)?;
        if !graph.supports(mode) {
            return Err(Error::UnsupportedMode(mode));
        }

        let best = self.search(start, budget, mode);
        let footprint = self.footprint(&best, budget, mode);
        let area = geometry::build(
            &footprint,
            self.options.strategy,
            *self.options.half_width.get(mode),
            self.options.simplify_tolerance,
        );

        let reached: BTreeMap<NodeId, Reach> = best
            .iter()
            .enumerate()
            .filter_map(|(i, reach)| reach.map(|reach| (graph.node_at(i).id, reach)))
            .collect();

        debug!(
            event = "isochrone",
            source = %source,
            mode = %mode,
            budget,
            reached = reached.len(),
            parts = area.0.len(),
        );

        Ok(Isochrone {
            source,
            mode,
            budget,
            reached,
            area,
        })
    }

    /// Isochrones from `source` for every threshold of `rule`.
    pub fn compute_for_rule(&self, source: NodeId, rule: &ComplianceRule) -> Result<Vec<Isochrone>> {
        rule.thresholds
            .iter()
            .map(|threshold| self.compute(source, threshold.max_cost, threshold.mode))
            .collect()
    }

    /// Service areas of all facilities, computed in parallel.
    pub fn service_areas(&self, facilities: &[Facility], rules: &ComplianceRuleset) -> Result<Vec<ServiceArea>> {
        facilities
            .par_iter()
            .map(|facility| {
                let rule = rules.rule(facility.facility_type)?;
                Ok(ServiceArea {
                    facility_id: facility.id,
                    facility_type: facility.facility_type,
                    node: facility.node,
                    isochrones: self.compute_for_rule(facility.node, rule)?,
                })
            })
            .collect()
    }

    /// Dijkstra bounded by `budget`. Equal-cost paths resolve to fewer edges.
    fn search(&self, start: usize, budget: f64, mode: TravelMode) -> Vec<Option<Reach>> {
        let graph = self.graph;
        let mut best: Vec<Option<Reach>> = vec![None; graph.node_count()];
        let mut settled = vec![false; graph.node_count()];
        let mut heap = BinaryHeap::new();

        best[start] = Some(Reach { cost: 0.0, hops: 0 });
        heap.push(Reverse((OrderedFloat(0.0), 0u32, start)));

        while let Some(Reverse((OrderedFloat(cost), hops, u))) = heap.pop() {
            if settled[u] {
                continue;
            }
            settled[u] = true;

            for step in graph.steps(u) {
                if settled[step.target] {
                    continue;
                }
                let Some(weight) = graph.edge_at(step.edge).costs.cost(mode) else {
                    continue;
                };
                let next = cost + weight;
                if next > budget {
                    continue;
                }

                let improves = match best[step.target] {
                    None => true,
                    Some(current) => next < current.cost || (next == current.cost && hops + 1 < current.hops),
                };
                if improves {
                    best[step.target] = Some(Reach {
                        cost: next,
                        hops: hops + 1,
                    });
                    heap.push(Reverse((OrderedFloat(next), hops + 1, step.target)));
                }
            }
        }

        best
    }

    /// Reached nodes and the road segments traversed within budget.
    fn footprint(&self, best: &[Option<Reach>], budget: f64, mode: TravelMode) -> Footprint {
        let graph = self.graph;
        let mut footprint = Footprint::default();
        let mut point_of: Vec<Option<usize>> = vec![None; best.len()];
        for (i, reach) in best.iter().enumerate() {
            if reach.is_some() {
                point_of[i] = Some(footprint.push_point(graph.node_at(i).coord));
            }
        }

        let mut full: HashSet<usize> = HashSet::new();
        let mut partial: Vec<(usize, usize, usize, f64)> = Vec::new();

        for (u, reach) in best.iter().enumerate() {
            let Some(reach) = reach else { continue };
            for step in graph.steps(u) {
                let edge = graph.edge_at(step.edge);
                if edge.kind != EdgeKind::Road {
                    continue;
                }
                let Some(weight) = edge.costs.cost(mode) else {
                    continue;
                };
                if reach.cost + weight <= budget {
                    if full.insert(step.edge) {
                        if let (Some(a), Some(b)) = (point_of[u], point_of[step.target]) {
                            footprint.segments.push((a, b));
                        }
                    }
                } else if self.options.include_partial_edges && weight > 0.0 {
                    partial.push((step.edge, u, step.target, (budget - reach.cost) / weight));
                }
            }
        }

        // Edges cut off by the budget contribute the stretch that is still reachable
        for (edge, u, target, fraction) in partial {
            if fraction <= 0.0 || full.contains(&edge) {
                continue;
            }
            let Some(a) = point_of[u] else { continue };
            let from = graph.node_at(u).coord;
            let to = graph.node_at(target).coord;
            let tip = footprint.push_point(Coord {
                x: from.x + (to.x - from.x) * fraction,
                y: from.y + (to.y - from.y) * fraction,
            });
            footprint.segments.push((a, tip));
        }

        footprint
    }
}

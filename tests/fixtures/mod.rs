//! Test fixtures for access-planner.
//!
//! Synthetic networks in projected metres:
//! - straight lines of evenly spaced nodes
//! - square grids with walk and drive costs
//! - demand and ruleset builders
#![allow(dead_code)]

use access_planner::graph::{ModeCosts, NodeId, RoutableGraph, TravelMode};
use access_planner::model::{DemandPoint, Facility, FacilityId, FacilityType};
use access_planner::rules::{AccessThreshold, ComplianceRule, ComplianceRuleset};

/// Nodes `0..n` at `(i * spacing, 0)`, consecutive nodes joined by walk roads of `cost`.
pub fn line_graph(n: u32, spacing: f64, cost: f64) -> RoutableGraph {
    let mut builder = RoutableGraph::builder();
    for i in 0..n {
        builder = builder.node(i, i as f64 * spacing, 0.0);
    }
    for i in 1..n {
        builder = builder.road(i - 1, i, ModeCosts::walk(cost));
    }
    builder.build().unwrap()
}

/// `cols x rows` grid; node `r * cols + c` sits at `(c * spacing, r * spacing)`.
/// Every road costs `cost` on foot and a quarter of that by car.
pub fn grid_graph(cols: u32, rows: u32, spacing: f64, cost: f64) -> RoutableGraph {
    let id = |c: u32, r: u32| r * cols + c;
    let costs = ModeCosts::walk(cost).with(TravelMode::Drive, cost / 4.0);

    let mut builder = RoutableGraph::builder();
    for r in 0..rows {
        for c in 0..cols {
            builder = builder.node(id(c, r), c as f64 * spacing, r as f64 * spacing);
        }
    }
    for r in 0..rows {
        for c in 0..cols {
            if c + 1 < cols {
                builder = builder.road(id(c, r), id(c + 1, r), costs);
            }
            if r + 1 < rows {
                builder = builder.road(id(c, r), id(c, r + 1), costs);
            }
        }
    }
    builder.build().unwrap()
}

/// One demand point per node of a line graph, ids equal to node ids.
pub fn demand_along_line(weights: &[f64], spacing: f64, zone: u32) -> Vec<DemandPoint> {
    weights
        .iter()
        .enumerate()
        .map(|(i, &weight)| DemandPoint::new(i as u32, i as f64 * spacing, 0.0, weight, zone))
        .collect()
}

pub fn facility(id: u32, facility_type: FacilityType, node: u32) -> Facility {
    Facility {
        id: FacilityId(id),
        facility_type,
        node: NodeId(node),
        capacity: 100,
    }
}

pub fn single_rule(facility_type: FacilityType, mode: TravelMode, max_cost: f64, ratio: f64) -> ComplianceRule {
    ComplianceRule::new(facility_type, vec![AccessThreshold::new(mode, max_cost)], ratio)
}

pub fn walk_ruleset(facility_type: FacilityType, max_cost: f64) -> ComplianceRuleset {
    ComplianceRuleset::new([single_rule(facility_type, TravelMode::Walk, max_cost, 1.0)]).unwrap()
}

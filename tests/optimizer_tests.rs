//! Greedy optimizer tests
//!
//! Coverage monotonicity, the approximation bound, tie-breaking and caps.

mod fixtures;

use std::collections::HashSet;
use std::time::Duration;

use access_planner::accessibility::{evaluate, CoverageGap};
use access_planner::error::Error;
use access_planner::graph::{ModeCosts, NodeId, RoutableGraph};
use access_planner::isochrone::{IsochroneEngine, IsochroneOptions};
use access_planner::model::{CandidateId, CandidateSite, FacilityType};
use access_planner::optimizer::{optimize, OptimizeOptions, Termination};
use access_planner::rules::ComplianceRuleset;
use fixtures::{demand_along_line, line_graph, walk_ruleset};

const WEIGHTS: [f64; 10] = [5.0, 1.0, 1.0, 8.0, 1.0, 1.0, 6.0, 2.0, 9.0, 3.0];

/// A site at node k covers the residents at nodes k-1, k and k+1.
fn options() -> IsochroneOptions {
    IsochroneOptions {
        include_partial_edges: false,
        ..IsochroneOptions::default()
    }
}

fn rules() -> ComplianceRuleset {
    walk_ruleset(FacilityType::Clinic, 1.0)
}

fn gaps() -> Vec<CoverageGap> {
    evaluate(&[], &demand_along_line(&WEIGHTS, 100.0, 1), &rules()).unwrap()
}

fn site(graph: &RoutableGraph, id: u32, node: u32) -> CandidateSite {
    CandidateSite::new(id, NodeId(node), graph.coord(NodeId(node)).unwrap(), FacilityType::Clinic)
}

fn every_node(graph: &RoutableGraph) -> Vec<CandidateSite> {
    (0..10).map(|node| site(graph, node, node)).collect()
}

fn covered_by(node: usize) -> impl Iterator<Item = usize> {
    node.saturating_sub(1)..=(node + 1).min(WEIGHTS.len() - 1)
}

#[test]
fn test_nothing_to_select() {
    let graph = line_graph(10, 100.0, 1.0);
    let engine = IsochroneEngine::new(&graph, options());
    let defaults = OptimizeOptions::default();

    let empty_pool = optimize(&engine, &rules(), &gaps(), &[], 3, &defaults).unwrap();
    assert!(empty_pool.is_empty());
    assert_eq!(empty_pool.termination, Termination::NothingToSelect);

    let zero_budget = optimize(&engine, &rules(), &gaps(), &every_node(&graph), 0, &defaults).unwrap();
    assert!(zero_budget.is_empty());
    assert!(!zero_budget.partial);
}

#[test]
fn test_coverage_never_decreases() {
    let graph = line_graph(10, 100.0, 1.0);
    let engine = IsochroneEngine::new(&graph, options());
    let pool = every_node(&graph);

    let mut previous = 0.0;
    for k in 1..=5 {
        let recommendation = optimize(&engine, &rules(), &gaps(), &pool, k, &OptimizeOptions::default()).unwrap();
        assert!(recommendation.total_gain >= previous);
        previous = recommendation.total_gain;

        let mut seen = HashSet::new();
        for pair in recommendation.selections.windows(2) {
            assert!(pair[1].cumulative_gain >= pair[0].cumulative_gain);
            assert!(pair[1].marginal_gain <= pair[0].marginal_gain);
        }
        for selection in &recommendation.selections {
            for id in &selection.newly_covered {
                assert!(seen.insert(*id), "{id} counted twice");
            }
        }
    }
    assert_eq!(previous, WEIGHTS.iter().sum::<f64>());
}

#[test]
fn test_greedy_within_bound_of_optimum() {
    let graph = line_graph(10, 100.0, 1.0);
    let engine = IsochroneEngine::new(&graph, options());
    let k = 2;

    let greedy = optimize(&engine, &rules(), &gaps(), &every_node(&graph), k, &OptimizeOptions::default()).unwrap();
    assert_eq!(greedy.termination, Termination::BudgetReached);

    let mut optimum: f64 = 0.0;
    for a in 0..WEIGHTS.len() {
        for b in a + 1..WEIGHTS.len() {
            let covered: HashSet<usize> = covered_by(a).chain(covered_by(b)).collect();
            optimum = optimum.max(covered.iter().map(|&i| WEIGHTS[i]).sum());
        }
    }

    assert!(greedy.total_gain <= optimum);
    assert!(greedy.total_gain >= (1.0 - 1.0 / std::f64::consts::E) * optimum);
    // Nodes 6..=8 hold 17; nodes 1..=3 then tie with 2..=4 and 3..=5 at 10
    assert_eq!(greedy.selections[0].site.node, NodeId(7));
    assert_eq!(greedy.selections[0].marginal_gain, 17.0);
    assert_eq!(greedy.selections[1].site.node, NodeId(2));
    assert_eq!(greedy.total_gain, 27.0);
}

#[test]
fn test_equal_gain_prefers_cheaper_then_lower_id() {
    let graph = line_graph(10, 100.0, 1.0);
    let engine = IsochroneEngine::new(&graph, options());
    let defaults = OptimizeOptions::default();

    let by_cost = vec![site(&graph, 0, 8).with_cost(5.0), site(&graph, 1, 8).with_cost(1.0)];
    let recommendation = optimize(&engine, &rules(), &gaps(), &by_cost, 1, &defaults).unwrap();
    assert_eq!(recommendation.selections[0].site.id, CandidateId(1));

    let by_id = vec![site(&graph, 7, 8), site(&graph, 3, 8)];
    let recommendation = optimize(&engine, &rules(), &gaps(), &by_id, 2, &defaults).unwrap();
    assert_eq!(recommendation.selections.len(), 1);
    assert_eq!(recommendation.selections[0].site.id, CandidateId(3));
    assert_eq!(recommendation.termination, Termination::NoImprovement);
}

#[test]
fn test_iteration_cap_is_partial() {
    let graph = line_graph(10, 100.0, 1.0);
    let engine = IsochroneEngine::new(&graph, options());
    let capped = OptimizeOptions {
        max_iterations: Some(1),
        ..OptimizeOptions::default()
    };

    let recommendation = optimize(&engine, &rules(), &gaps(), &every_node(&graph), 3, &capped).unwrap();
    assert_eq!(recommendation.selections.len(), 1);
    assert_eq!(recommendation.termination, Termination::IterationCap);
    assert!(recommendation.partial);
}

#[test]
fn test_time_limit_is_partial() {
    let graph = line_graph(10, 100.0, 1.0);
    let engine = IsochroneEngine::new(&graph, options());
    let expired = OptimizeOptions {
        time_limit: Some(Duration::ZERO),
        ..OptimizeOptions::default()
    };

    let recommendation = optimize(&engine, &rules(), &gaps(), &every_node(&graph), 3, &expired).unwrap();
    assert_eq!(recommendation.termination, Termination::TimeLimit);
    assert!(recommendation.partial);
    assert!(recommendation.selections.len() < 3);

    let uncapped = optimize(&engine, &rules(), &gaps(), &every_node(&graph), 3, &OptimizeOptions::default()).unwrap();
    for (capped, full) in recommendation.selections.iter().zip(&uncapped.selections) {
        assert_eq!(capped.site.id, full.site.id);
    }
}

#[test]
fn test_site_covering_nothing_is_skipped() {
    let mut builder = RoutableGraph::builder();
    for i in 0..10 {
        builder = builder.node(i, i as f64 * 100.0, 0.0);
    }
    for i in 1..10 {
        builder = builder.road(i - 1, i, ModeCosts::walk(1.0));
    }
    let graph = builder.node(99, 10_000.0, 0.0).build().unwrap();
    let engine = IsochroneEngine::new(&graph, options());
    let pool = vec![site(&graph, 0, 99), site(&graph, 1, 3)];

    let recommendation = optimize(&engine, &rules(), &gaps(), &pool, 5, &OptimizeOptions::default()).unwrap();
    assert_eq!(recommendation.sites().map(|s| s.node).collect::<Vec<_>>(), vec![NodeId(3)]);
    assert_eq!(recommendation.termination, Termination::NoImprovement);
    assert!(!recommendation.partial);
}

#[test]
fn test_candidate_type_without_rule() {
    let graph = line_graph(10, 100.0, 1.0);
    let engine = IsochroneEngine::new(&graph, options());
    let school = CandidateSite::new(0, NodeId(1), graph.coord(NodeId(1)).unwrap(), FacilityType::School);

    let result = optimize(&engine, &rules(), &gaps(), &[school], 1, &OptimizeOptions::default());
    assert_eq!(result.unwrap_err(), Error::UnknownFacilityType(FacilityType::School));
}

//! Greedy maximum-coverage site selection.
//!
//! Each iteration rescores every remaining candidate against the population
//! already covered by earlier selections and commits the best one. This is
//! the classic greedy algorithm for maximum coverage and keeps its
//! (1 - 1/e) approximation guarantee.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::accessibility::CoverageGap;
use crate::error::Result;
use crate::isochrone::IsochroneEngine;
use crate::model::{CandidateSite, DemandId, DemandPoint, FacilityType};
use crate::rules::ComplianceRuleset;

#[derive(Debug, Clone, PartialEq)]
pub struct OptimizeOptions {
    /// A candidate is only selected when its marginal gain exceeds this.
    pub min_gain: f64,
    /// Cap on greedy iterations; hitting it yields a partial result.
    pub max_iterations: Option<usize>,
    /// Wall-clock cap; hitting it yields a partial result.
    pub time_limit: Option<Duration>,
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        Self {
            min_gain: 0.0,
            max_iterations: None,
            time_limit: None,
        }
    }
}

/// Why the greedy loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// `budget_count` sites were chosen.
    BudgetReached,
    /// No remaining candidate covered enough new population.
    NoImprovement,
    /// Nothing to select from: empty pool or zero budget.
    NothingToSelect,
    IterationCap,
    TimeLimit,
}

impl Termination {
    pub fn is_partial(&self) -> bool {
        matches!(self, Termination::IterationCap | Termination::TimeLimit)
    }
}

/// A chosen site and what it added on top of the sites chosen before it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub site: CandidateSite,
    /// Population newly covered by this site given all earlier selections.
    pub marginal_gain: f64,
    pub cumulative_gain: f64,
    pub newly_covered: Vec<DemandId>,
}

/// Ordered greedy selections. Order is meaningful: each gain was computed
/// after all earlier entries were committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub selections: Vec<Selection>,
    pub total_gain: f64,
    pub iterations: usize,
    pub termination: Termination,
    pub partial: bool,
}

impl Recommendation {
    fn empty(termination: Termination) -> Self {
        Self {
            selections: Vec::new(),
            total_gain: 0.0,
            iterations: 0,
            termination,
            partial: termination.is_partial(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.selections.is_empty()
    }

    pub fn sites(&self) -> impl Iterator<Item = &CandidateSite> {
        self.selections.iter().map(|selection| &selection.site)
    }
}

/// Candidate together with the universe entries its isochrones reach.
struct Scored<'a> {
    site: &'a CandidateSite,
    reach: Vec<usize>,
}

/// Selects up to `budget_count` candidates maximizing newly covered gap population.
pub fn optimize(
    engine: &IsochroneEngine<'_>,
    rules: &ComplianceRuleset,
    gaps: &[CoverageGap],
    candidate_pool: &[CandidateSite],
    budget_count: usize,
    options: &OptimizeOptions,
) -> Result<Recommendation> {
    let started = Instant::now();
    if candidate_pool.is_empty() || budget_count == 0 {
        return Ok(Recommendation::empty(Termination::NothingToSelect));
    }

    let universe = gap_universe(gaps);
    info!(
        event = "optimize_start",
        candidates = candidate_pool.len(),
        gap_zones = gaps.len(),
        demand_points = universe.len(),
        budget_count,
    );

    let mut remaining: Vec<Scored<'_>> = candidate_pool
        .par_iter()
        .map(|site| {
            let rule = rules.rule(site.facility_type)?;
            let isochrones = engine.compute_for_rule(site.node, rule)?;
            let reach = universe
                .iter()
                .enumerate()
                .filter(|(_, (facility_type, point))| {
                    *facility_type == site.facility_type && isochrones.iter().any(|iso| iso.covers(point.coord))
                })
                .map(|(i, _)| i)
                .collect();
            Ok(Scored { site, reach })
        })
        .collect::<Result<_>>()?;

    // Owned by the loop; scoring only reads it
    let mut covered = vec![false; universe.len()];
    let mut selections: Vec<Selection> = Vec::new();
    let mut total_gain = 0.0;
    let mut iterations = 0;

    let termination = loop {
        if selections.len() >= budget_count {
            break Termination::BudgetReached;
        }
        if options.max_iterations.is_some_and(|cap| iterations >= cap) {
            break Termination::IterationCap;
        }
        if options.time_limit.is_some_and(|limit| started.elapsed() >= limit) {
            break Termination::TimeLimit;
        }
        if remaining.is_empty() {
            break Termination::NoImprovement;
        }
        iterations += 1;

        let gains: Vec<f64> = remaining
            .par_iter()
            .map(|candidate| marginal_gain(candidate, &universe, &covered))
            .collect();

        let mut best: Option<usize> = None;
        for (i, gain) in gains.iter().enumerate() {
            let better = match best {
                None => true,
                Some(b) => prefers(&remaining[i], *gain, &remaining[b], gains[b]),
            };
            if better {
                best = Some(i);
            }
        }

        let Some(best) = best.filter(|&b| gains[b] > options.min_gain) else {
            break Termination::NoImprovement;
        };

        let gain = gains[best];
        let chosen = remaining.swap_remove(best);
        let mut newly_covered = Vec::new();
        for &i in &chosen.reach {
            if !covered[i] {
                covered[i] = true;
                newly_covered.push(universe[i].1.id);
            }
        }
        total_gain += gain;

        info!(
            event = "selection",
            iteration = iterations,
            candidate = chosen.site.id.0,
            node = %chosen.site.node,
            facility_type = %chosen.site.facility_type,
            marginal_gain = gain,
            cumulative_gain = total_gain,
        );

        selections.push(Selection {
            site: chosen.site.clone(),
            marginal_gain: gain,
            cumulative_gain: total_gain,
            newly_covered,
        });
    };

    if termination.is_partial() {
        warn!(
            event = "optimize_capped",
            termination = ?termination,
            selected = selections.len(),
        );
    }
    info!(
        event = "optimize_end",
        termination = ?termination,
        selected = selections.len(),
        total_gain,
        duration_ms = started.elapsed().as_millis() as u64,
    );

    Ok(Recommendation {
        selections,
        total_gain,
        iterations,
        termination,
        partial: termination.is_partial(),
    })
}

/// Uncovered gap population, one entry per (facility type, demand point), in key order.
fn gap_universe(gaps: &[CoverageGap]) -> Vec<(FacilityType, DemandPoint)> {
    let mut universe: BTreeMap<(FacilityType, DemandId), DemandPoint> = BTreeMap::new();
    for gap in gaps {
        for point in &gap.uncovered {
            universe.insert((gap.facility_type, point.id), *point);
        }
    }
    universe
        .into_iter()
        .map(|((facility_type, _), point)| (facility_type, point))
        .collect()
}

fn marginal_gain(candidate: &Scored<'_>, universe: &[(FacilityType, DemandPoint)], covered: &[bool]) -> f64 {
    candidate
        .reach
        .iter()
        .filter(|&&i| !covered[i])
        .map(|&i| universe[i].1.weight)
        .sum()
}

/// Higher gain wins; then lower placement cost; then lower candidate id.
fn prefers(a: &Scored<'_>, gain_a: f64, b: &Scored<'_>, gain_b: f64) -> bool {
    if gain_a != gain_b {
        return gain_a > gain_b;
    }
    let cost_a = a.site.cost.unwrap_or(0.0);
    let cost_b = b.site.cost.unwrap_or(0.0);
    if cost_a != cost_b {
        return cost_a < cost_b;
    }
    a.site.id < b.site.id
}

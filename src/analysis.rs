//! End-to-end accessibility analysis.
//!
//! Facilities become service areas, service areas and demand become coverage
//! gaps, gaps become candidate sites, and candidates become a ranked
//! recommendation that can optionally be scored against real sites.

use geo::Coord;
use serde::Serialize;
use tracing::info;

use crate::accessibility::{self, CoverageGap};
use crate::candidates::CandidateGenerator;
use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::graph::RoutableGraph;
use crate::isochrone::{IsochroneEngine, ServiceArea};
use crate::model::{CandidateSite, DemandPoint, Facility};
use crate::optimizer::{self, Recommendation};
use crate::rules::ComplianceRuleset;
use crate::traits::DistanceMetric;
use crate::validation::{self, ValidationReport};

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub service_areas: Vec<ServiceArea>,
    pub gaps: Vec<CoverageGap>,
    /// Pool the optimizer chose from: the caller's, or generated from the gaps.
    pub candidates: Vec<CandidateSite>,
    pub recommendation: Recommendation,
    pub validation: Option<ValidationReport>,
}

pub struct Analysis<'g, M> {
    graph: &'g RoutableGraph,
    config: AnalysisConfig,
    rules: ComplianceRuleset,
    metric: M,
}

impl<'g, M: DistanceMetric + Clone> Analysis<'g, M> {
    pub fn new(graph: &'g RoutableGraph, config: AnalysisConfig, rules: ComplianceRuleset, metric: M) -> Self {
        Self {
            graph,
            config,
            rules,
            metric,
        }
    }

    pub fn rules(&self) -> &ComplianceRuleset {
        &self.rules
    }

    pub fn engine(&self) -> IsochroneEngine<'g> {
        IsochroneEngine::new(self.graph, self.config.isochrone)
    }

    /// Runs the pipeline. Without a `candidate_pool` one is generated from the
    /// gaps; with `ground_truth` the recommendation is validated against it.
    pub fn run(
        &self,
        facilities: &[Facility],
        demand_points: &[DemandPoint],
        candidate_pool: Option<&[CandidateSite]>,
        ground_truth: Option<&[Coord<f64>]>,
    ) -> Result<AnalysisReport> {
        let engine = self.engine();
        let service_areas = engine.service_areas(facilities, &self.rules)?;
        let gaps = accessibility::evaluate(&service_areas, demand_points, &self.rules)?;

        let candidates = match candidate_pool {
            Some(pool) => pool.to_vec(),
            None => CandidateGenerator::new(self.config.candidates.clone(), self.metric.clone())
                .generate(self.graph, &gaps),
        };

        let recommendation = optimizer::optimize(
            &engine,
            &self.rules,
            &gaps,
            &candidates,
            self.config.optimizer.budget_count,
            &self.config.optimizer.options(),
        )?;

        let validation = ground_truth.map(|truth| {
            validation::score_recommendation(
                &recommendation,
                truth,
                self.config.validation.match_radius,
                &self.metric,
            )
        });

        info!(
            event = "analysis",
            facilities = facilities.len(),
            demand_points = demand_points.len(),
            gaps = gaps.len(),
            candidates = candidates.len(),
            selected = recommendation.selections.len(),
        );

        Ok(AnalysisReport {
            service_areas,
            gaps,
            candidates,
            recommendation,
            validation,
        })
    }
}

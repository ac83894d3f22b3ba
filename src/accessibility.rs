//! Accessibility evaluator: population coverage per zone against the ruleset.

use std::collections::{BTreeMap, HashSet};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};
use crate::graph::{NodeId, TravelMode};
use crate::isochrone::{Isochrone, IsochroneEngine, ServiceArea};
use crate::model::{DemandPoint, Facility, FacilityId, FacilityType, ZoneId};
use crate::rules::{ComplianceRule, ComplianceRuleset};

/// Coverage of one zone for one facility type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneCoverage {
    pub zone: ZoneId,
    pub facility_type: FacilityType,
    pub total_population: f64,
    pub covered_population: f64,
    pub coverage_ratio: f64,
    pub required_ratio: f64,
    pub compliant: bool,
    /// Facilities whose service area reaches at least one of the zone's residents.
    pub serving_facilities: u32,
    pub required_facilities: Option<u32>,
}

/// A zone whose coverage falls below its rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageGap {
    pub zone: ZoneId,
    pub facility_type: FacilityType,
    pub total_population: f64,
    pub covered_population: f64,
    /// `total_population - covered_population`.
    pub uncovered_population: f64,
    pub coverage_ratio: f64,
    pub required_ratio: f64,
    /// Facilities missing under the population-per-facility norm, if the rule has one.
    pub facility_shortfall: Option<u32>,
    /// Demand points outside every service area of this type, in id order.
    pub uncovered: Vec<DemandPoint>,
}

struct Assessment {
    coverage: ZoneCoverage,
    uncovered: Vec<DemandPoint>,
}

/// Per-zone coverage for every (zone, facility type) pair, compliant or not.
///
/// Zones with zero total population are left out.
pub fn zone_coverage(
    service_areas: &[ServiceArea],
    demand_points: &[DemandPoint],
    rules: &ComplianceRuleset,
) -> Result<Vec<ZoneCoverage>> {
    Ok(assess(service_areas, demand_points, rules)?
        .into_iter()
        .map(|assessment| assessment.coverage)
        .collect())
}

/// Zones that violate their rule, sorted by zone and facility type.
///
/// The result depends only on which points and areas are given, never on
/// their order.
pub fn evaluate(
    service_areas: &[ServiceArea],
    demand_points: &[DemandPoint],
    rules: &ComplianceRuleset,
) -> Result<Vec<CoverageGap>> {
    let assessments = assess(service_areas, demand_points, rules)?;
    let assessed = assessments.len();

    let gaps: Vec<CoverageGap> = assessments
        .into_iter()
        .filter(|assessment| !assessment.coverage.compliant)
        .map(|Assessment { coverage, uncovered }| CoverageGap {
            zone: coverage.zone,
            facility_type: coverage.facility_type,
            total_population: coverage.total_population,
            covered_population: coverage.covered_population,
            uncovered_population: (coverage.total_population - coverage.covered_population).max(0.0),
            coverage_ratio: coverage.coverage_ratio,
            required_ratio: coverage.required_ratio,
            facility_shortfall: coverage
                .required_facilities
                .map(|required| required.saturating_sub(coverage.serving_facilities)),
            uncovered,
        })
        .collect();

    info!(
        event = "evaluate",
        service_areas = service_areas.len(),
        demand_points = demand_points.len(),
        assessed,
        gaps = gaps.len(),
    );

    Ok(gaps)
}

fn assess(
    service_areas: &[ServiceArea],
    demand_points: &[DemandPoint],
    rules: &ComplianceRuleset,
) -> Result<Vec<Assessment>> {
    let mut areas_by_type: BTreeMap<FacilityType, Vec<&ServiceArea>> = BTreeMap::new();
    for area in service_areas {
        rules.rule(area.facility_type)?;
        areas_by_type.entry(area.facility_type).or_default().push(area);
    }

    let mut zones: BTreeMap<ZoneId, Vec<&DemandPoint>> = BTreeMap::new();
    let mut ids = HashSet::with_capacity(demand_points.len());
    for point in demand_points {
        if !point.weight.is_finite() || point.weight < 0.0 {
            return Err(Error::InvalidDemandWeight(point.id, point.weight));
        }
        if !ids.insert(point.id) {
            return Err(Error::DuplicateDemandId(point.id));
        }
        zones.entry(point.zone).or_default().push(point);
    }

    let mut work: Vec<(ZoneId, Vec<&DemandPoint>, f64)> = Vec::with_capacity(zones.len());
    for (zone, mut points) in zones {
        points.sort_by_key(|point| point.id);
        let total: f64 = points.iter().map(|point| point.weight).sum();
        if total > 0.0 {
            work.push((zone, points, total));
        }
    }

    let no_areas: Vec<&ServiceArea> = Vec::new();
    let (areas_by_type, no_areas) = (&areas_by_type, &no_areas);
    let assessments = work
        .par_iter()
        .flat_map_iter(|(zone, points, total)| {
            rules.iter().map(move |rule| {
                let areas = areas_by_type.get(&rule.facility_type).unwrap_or(no_areas);
                assess_zone(*zone, points, *total, areas, rule)
            })
        })
        .collect();

    Ok(assessments)
}

fn assess_zone(
    zone: ZoneId,
    points: &[&DemandPoint],
    total: f64,
    areas: &[&ServiceArea],
    rule: &ComplianceRule,
) -> Assessment {
    let mut covered = 0.0;
    let mut uncovered = Vec::new();
    let mut serving = vec![false; areas.len()];

    for point in points {
        let mut reached = false;
        for (i, area) in areas.iter().enumerate() {
            if area.covers(point.coord) {
                reached = true;
                serving[i] = true;
            }
        }
        if reached {
            covered += point.weight;
        } else {
            uncovered.push(**point);
        }
    }

    let coverage_ratio = covered / total;
    Assessment {
        coverage: ZoneCoverage {
            zone,
            facility_type: rule.facility_type,
            total_population: total,
            covered_population: covered,
            coverage_ratio,
            required_ratio: rule.min_coverage_ratio,
            compliant: coverage_ratio >= rule.min_coverage_ratio,
            serving_facilities: serving.iter().filter(|s| **s).count() as u32,
            required_facilities: rule.required_facilities(total),
        },
        uncovered,
    }
}

/// Closest facility of a type reached from a residence under one threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearestFacility {
    pub facility_id: FacilityId,
    pub mode: TravelMode,
    pub cost: f64,
}

/// Whether one residence meets the norm for one facility type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResidenceAccess {
    pub facility_type: FacilityType,
    pub satisfied: bool,
    /// Nearest reached facility per threshold, in threshold order. Costs of
    /// different modes are never ranked against each other.
    pub nearest: Vec<NearestFacility>,
    /// Isochrones from the residence, one per threshold of the rule.
    pub isochrones: Vec<Isochrone>,
}

impl ResidenceAccess {
    pub fn nearest_by(&self, mode: TravelMode) -> Option<&NearestFacility> {
        self.nearest.iter().find(|nearest| nearest.mode == mode)
    }
}

/// Checks a single residence against every rule: a facility is accessible when
/// its node is reached, or its location lies inside, an isochrone from the residence.
pub fn check_residence(
    engine: &IsochroneEngine<'_>,
    residence: NodeId,
    facilities: &[Facility],
    rules: &ComplianceRuleset,
) -> Result<Vec<ResidenceAccess>> {
    for facility in facilities {
        rules.rule(facility.facility_type)?;
    }

    rules
        .iter()
        .map(|rule| {
            let isochrones = engine.compute_for_rule(residence, rule)?;
            let mut satisfied = false;
            let mut nearest = Vec::new();

            for iso in &isochrones {
                let mut best: Option<NearestFacility> = None;
                for facility in facilities.iter().filter(|f| f.facility_type == rule.facility_type) {
                    if let Some(cost) = iso.cost_to(facility.node) {
                        satisfied = true;
                        let closer = best.as_ref().is_none_or(|current| {
                            cost < current.cost || (cost == current.cost && facility.id < current.facility_id)
                        });
                        if closer {
                            best = Some(NearestFacility {
                                facility_id: facility.id,
                                mode: iso.mode,
                                cost,
                            });
                        }
                    } else if iso.covers(engine.graph().coord(facility.node)?) {
                        satisfied = true;
                    }
                }
                nearest.extend(best);
            }

            Ok(ResidenceAccess {
                facility_type: rule.facility_type,
                satisfied,
                nearest,
                isochrones,
            })
        })
        .collect()
}

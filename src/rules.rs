//! Compliance ruleset: regulatory access norms per facility type.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::graph::TravelMode;
use crate::haversine::walking_minutes;
use crate::model::FacilityType;

/// A facility is accessible when it can be reached within `max_cost` by `mode`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccessThreshold {
    pub mode: TravelMode,
    /// Budget in the graph's cost unit for `mode` (minutes for the defaults).
    pub max_cost: f64,
}

impl AccessThreshold {
    pub fn new(mode: TravelMode, max_cost: f64) -> Self {
        Self { mode, max_cost }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceRule {
    pub facility_type: FacilityType,
    /// Alternative norms; meeting any one of them counts as access.
    pub thresholds: Vec<AccessThreshold>,
    /// Share of a zone's population that must be covered.
    pub min_coverage_ratio: f64,
    /// Residents one facility is expected to serve.
    #[serde(default)]
    pub population_per_facility: Option<f64>,
}

impl ComplianceRule {
    pub fn new(facility_type: FacilityType, thresholds: Vec<AccessThreshold>, min_coverage_ratio: f64) -> Self {
        Self {
            facility_type,
            thresholds,
            min_coverage_ratio,
            population_per_facility: None,
        }
    }

    pub fn with_population_per_facility(mut self, population: f64) -> Self {
        self.population_per_facility = Some(population);
        self
    }

    /// Facilities a zone of `population` residents should have, if the rule sets a ratio.
    pub fn required_facilities(&self, population: f64) -> Option<u32> {
        self.population_per_facility
            .filter(|ratio| *ratio > 0.0)
            .map(|ratio| (population / ratio).ceil() as u32)
    }
}

/// One rule per facility type. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComplianceRuleset {
    rules: BTreeMap<FacilityType, ComplianceRule>,
}

impl ComplianceRuleset {
    pub fn new(rules: impl IntoIterator<Item = ComplianceRule>) -> Result<Self> {
        let mut map = BTreeMap::new();
        for rule in rules {
            if !(0.0..=1.0).contains(&rule.min_coverage_ratio) {
                return Err(Error::InvalidCoverageRatio(rule.facility_type, rule.min_coverage_ratio));
            }
            for threshold in &rule.thresholds {
                if !threshold.max_cost.is_finite() || threshold.max_cost <= 0.0 {
                    return Err(Error::InvalidBudget(threshold.max_cost));
                }
            }
            let facility_type = rule.facility_type;
            if map.insert(facility_type, rule).is_some() {
                return Err(Error::DuplicateRule(facility_type));
            }
        }
        Ok(Self { rules: map })
    }

    /// Norms for low-density regions: 500 m walk to a kindergarten, 500 m walk
    /// or 15 min drive to a school, 2 km walk to a rural clinic.
    pub fn regional_defaults() -> Self {
        let rules = [
            ComplianceRule::new(
                FacilityType::Kindergarten,
                vec![AccessThreshold::new(TravelMode::Walk, walking_minutes(500.0))],
                1.0,
            ),
            ComplianceRule::new(
                FacilityType::School,
                vec![
                    AccessThreshold::new(TravelMode::Walk, walking_minutes(500.0)),
                    AccessThreshold::new(TravelMode::Drive, 15.0),
                ],
                1.0,
            ),
            ComplianceRule::new(
                FacilityType::Clinic,
                vec![AccessThreshold::new(TravelMode::Walk, walking_minutes(2000.0))],
                1.0,
            ),
        ];
        Self {
            rules: rules.into_iter().map(|rule| (rule.facility_type, rule)).collect(),
        }
    }

    pub fn rule(&self, facility_type: FacilityType) -> Result<&ComplianceRule> {
        self.rules
            .get(&facility_type)
            .ok_or(Error::UnknownFacilityType(facility_type))
    }

    pub fn contains(&self, facility_type: FacilityType) -> bool {
        self.rules.contains_key(&facility_type)
    }

    /// Rules in facility-type order.
    pub fn iter(&self) -> impl Iterator<Item = &ComplianceRule> {
        self.rules.values()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_unknown_type() {
        let rules = ComplianceRuleset::new([ComplianceRule::new(
            FacilityType::School,
            vec![AccessThreshold::new(TravelMode::Drive, 15.0)],
            0.9,
        )])
        .unwrap();

        assert!(rules.rule(FacilityType::School).is_ok());
        assert_eq!(
            rules.rule(FacilityType::Clinic),
            Err(Error::UnknownFacilityType(FacilityType::Clinic))
        );
    }

    #[test]
    fn test_duplicate_rule_rejected() {
        let rule = ComplianceRule::new(
            FacilityType::Clinic,
            vec![AccessThreshold::new(TravelMode::Walk, 20.0)],
            1.0,
        );
        let result = ComplianceRuleset::new([rule.clone(), rule]);
        assert_eq!(result.unwrap_err(), Error::DuplicateRule(FacilityType::Clinic));
    }

    #[test]
    fn test_non_positive_threshold_rejected() {
        let rule = ComplianceRule::new(
            FacilityType::Clinic,
            vec![AccessThreshold::new(TravelMode::Walk, 0.0)],
            1.0,
        );
        assert_eq!(ComplianceRuleset::new([rule]).unwrap_err(), Error::InvalidBudget(0.0));
    }

    #[test]
    fn test_coverage_ratio_out_of_range() {
        let rule = |ratio| ComplianceRule::new(FacilityType::School, vec![AccessThreshold::new(TravelMode::Walk, 6.0)], ratio);

        assert_eq!(
            ComplianceRuleset::new([rule(1.5)]).unwrap_err(),
            Error::InvalidCoverageRatio(FacilityType::School, 1.5)
        );
        assert!(matches!(
            ComplianceRuleset::new([rule(f64::NAN)]),
            Err(Error::InvalidCoverageRatio(FacilityType::School, ratio)) if ratio.is_nan()
        ));
        assert!(ComplianceRuleset::new([rule(0.0)]).is_ok());
        assert!(ComplianceRuleset::new([rule(1.0)]).is_ok());
    }

    #[test]
    fn test_regional_defaults_cover_every_type() {
        let rules = ComplianceRuleset::regional_defaults();
        assert_eq!(rules.len(), 3);
        let school = rules.rule(FacilityType::School).unwrap();
        assert_eq!(school.thresholds.len(), 2);
        assert_eq!(school.thresholds[1], AccessThreshold::new(TravelMode::Drive, 15.0));
    }

    #[test]
    fn test_required_facilities() {
        let rule = ComplianceRule::new(FacilityType::Kindergarten, Vec::new(), 1.0)
            .with_population_per_facility(1000.0);
        assert_eq!(rule.required_facilities(2500.0), Some(3));
        assert_eq!(rule.required_facilities(0.0), Some(0));

        let no_ratio = ComplianceRule::new(FacilityType::Kindergarten, Vec::new(), 1.0);
        assert_eq!(no_ratio.required_facilities(2500.0), None);
    }
}

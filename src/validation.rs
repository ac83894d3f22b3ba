//! Validation of recommended sites against historical ground truth.

use geo::Coord;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::optimizer::Recommendation;
use crate::traits::DistanceMetric;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationOptions {
    /// Greatest distance at which a recommendation matches a real site.
    pub match_radius: f64,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self { match_radius: 500.0 }
    }
}

/// Conditions under which a metric is undefined (reported as NaN).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationFlag {
    /// Precision is undefined.
    NoRecommendations,
    /// Recall is undefined.
    NoGroundTruth,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SiteMatch {
    pub recommended: usize,
    pub ground_truth: usize,
    pub distance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub match_radius: f64,
    pub recommended: usize,
    pub ground_truth: usize,
    pub true_positives: usize,
    pub precision: f64,
    pub recall: f64,
    pub matches: Vec<SiteMatch>,
    pub flags: Vec<ValidationFlag>,
}

impl ValidationReport {
    pub fn has_flag(&self, flag: ValidationFlag) -> bool {
        self.flags.contains(&flag)
    }
}

/// Scores recommended locations against ground-truth sites.
///
/// Pairs within `match_radius` are matched greedily by ascending distance so
/// that each recommendation and each real site is used at most once.
pub fn score<M: DistanceMetric + ?Sized>(
    recommended: &[Coord<f64>],
    ground_truth: &[Coord<f64>],
    match_radius: f64,
    metric: &M,
) -> ValidationReport {
    let mut pairs: Vec<SiteMatch> = Vec::new();
    for (r, &rec) in recommended.iter().enumerate() {
        for (g, &truth) in ground_truth.iter().enumerate() {
            let distance = metric.distance(rec, truth);
            if distance <= match_radius {
                pairs.push(SiteMatch {
                    recommended: r,
                    ground_truth: g,
                    distance,
                });
            }
        }
    }
    pairs.sort_by(|a, b| {
        a.distance
            .total_cmp(&b.distance)
            .then(a.recommended.cmp(&b.recommended))
            .then(a.ground_truth.cmp(&b.ground_truth))
    });

    let mut used_rec = vec![false; recommended.len()];
    let mut used_truth = vec![false; ground_truth.len()];
    let mut matches = Vec::new();
    for pair in pairs {
        if used_rec[pair.recommended] || used_truth[pair.ground_truth] {
            continue;
        }
        used_rec[pair.recommended] = true;
        used_truth[pair.ground_truth] = true;
        matches.push(pair);
    }

    let true_positives = matches.len();
    let mut flags = Vec::new();
    let precision = if recommended.is_empty() {
        flags.push(ValidationFlag::NoRecommendations);
        f64::NAN
    } else {
        true_positives as f64 / recommended.len() as f64
    };
    let recall = if ground_truth.is_empty() {
        flags.push(ValidationFlag::NoGroundTruth);
        f64::NAN
    } else {
        true_positives as f64 / ground_truth.len() as f64
    };

    info!(
        event = "validation",
        match_radius,
        recommended = recommended.len(),
        ground_truth = ground_truth.len(),
        true_positives,
        precision,
        recall,
    );

    ValidationReport {
        match_radius,
        recommended: recommended.len(),
        ground_truth: ground_truth.len(),
        true_positives,
        precision,
        recall,
        matches,
        flags,
    }
}

/// Scores the sites of an optimizer recommendation, in selection order.
pub fn score_recommendation<M: DistanceMetric + ?Sized>(
    recommendation: &Recommendation,
    ground_truth: &[Coord<f64>],
    match_radius: f64,
    metric: &M,
) -> ValidationReport {
    let sites: Vec<Coord<f64>> = recommendation.sites().map(|site| site.coord).collect();
    score(&sites, ground_truth, match_radius, metric)
}

/// Scores the same sites at several radii, for picking a radius on held-out data.
pub fn calibrate<M: DistanceMetric + ?Sized>(
    recommended: &[Coord<f64>],
    ground_truth: &[Coord<f64>],
    radii: &[f64],
    metric: &M,
) -> Vec<ValidationReport> {
    radii
        .iter()
        .map(|&radius| score(recommended, ground_truth, radius, metric))
        .collect()
}

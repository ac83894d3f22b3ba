//! Error taxonomy for the accessibility engine.
//!
//! Every variant is an input-validation failure raised at the point of misuse.
//! Data-quality states (empty zones, unreachable areas, empty candidate pools)
//! are carried in result values instead.

use thiserror::Error;

use crate::graph::{NodeId, TravelMode};
use crate::model::{DemandId, FacilityType};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("node {0} is not part of the graph")]
    UnknownNode(NodeId),

    #[error("graph has no nodes")]
    EmptyGraph,

    #[error("travel mode {0} is not present on every edge")]
    UnsupportedMode(TravelMode),

    #[error("no compliance rule registered for facility type {0}")]
    UnknownFacilityType(FacilityType),

    #[error("duplicate node id {0}")]
    DuplicateNode(NodeId),

    #[error("edge {from} -> {to} has an invalid {mode} cost {cost}")]
    InvalidEdgeCost {
        from: NodeId,
        to: NodeId,
        mode: TravelMode,
        cost: f64,
    },

    #[error("cost budget must be finite and greater than zero, got {0}")]
    InvalidBudget(f64),

    #[error("demand point {0} has an invalid population weight {1}")]
    InvalidDemandWeight(DemandId, f64),

    #[error("more than one compliance rule registered for facility type {0}")]
    DuplicateRule(FacilityType),

    #[error("coverage ratio for {0} must be within [0, 1], got {1}")]
    InvalidCoverageRatio(FacilityType, f64),

    #[error("demand point id {0} is used more than once")]
    DuplicateDemandId(DemandId),
}

pub type Result<T> = std::result::Result<T, Error>;

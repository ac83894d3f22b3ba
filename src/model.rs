//! Input records consumed by the engine: facilities, demand and candidates.

use std::fmt;

use geo::Coord;
use serde::{Deserialize, Serialize};

use crate::graph::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacilityType {
    Kindergarten,
    School,
    Clinic,
}

impl fmt::Display for FacilityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FacilityType::Kindergarten => "kindergarten",
            FacilityType::School => "school",
            FacilityType::Clinic => "clinic",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FacilityId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DemandId(pub u32);

impl fmt::Display for DemandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Administrative zone (settlement, municipality) a demand point belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ZoneId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CandidateId(pub u32);

/// An existing facility, located at a graph node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facility {
    pub id: FacilityId,
    pub facility_type: FacilityType,
    pub node: NodeId,
    /// Places (children, patients per shift) the facility can serve.
    pub capacity: u32,
}

/// Population-weighted residential location.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DemandPoint {
    pub id: DemandId,
    pub coord: Coord<f64>,
    pub weight: f64,
    pub zone: ZoneId,
}

impl DemandPoint {
    pub fn new(id: u32, x: f64, y: f64, weight: f64, zone: u32) -> Self {
        Self {
            id: DemandId(id),
            coord: Coord { x, y },
            weight,
            zone: ZoneId(zone),
        }
    }
}

/// Where a candidate site came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateOrigin {
    /// Supplied by the caller.
    Provided,
    ResidentialCluster,
    ZoneCentroid,
    MajorRoad,
}

/// A location where a new facility could be built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateSite {
    pub id: CandidateId,
    pub node: NodeId,
    pub coord: Coord<f64>,
    pub facility_type: FacilityType,
    /// Construction or placement cost; lower wins ties between equal gains.
    pub cost: Option<f64>,
    pub origin: CandidateOrigin,
}

impl CandidateSite {
    pub fn new(id: u32, node: NodeId, coord: Coord<f64>, facility_type: FacilityType) -> Self {
        Self {
            id: CandidateId(id),
            node,
            coord,
            facility_type,
            cost: None,
            origin: CandidateOrigin::Provided,
        }
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = Some(cost);
        self
    }
}

//! Great-circle distance and travel-speed profiles.
//!
//! Used when node coordinates are lon/lat degrees (`x` = longitude,
//! `y` = latitude), and to turn segment lengths into travel minutes when
//! edge costs are derived from geometry.

use geo::Coord;
use serde::{Deserialize, Serialize};

use crate::graph::TravelMode;
use crate::traits::DistanceMetric;

/// Earth radius in metres.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Average walking speed (1.3 m/s).
const WALK_SPEED_MPS: f64 = 1.3;

/// Average driving speed on rural roads.
const DRIVE_SPEED_KMH: f64 = 40.0;

/// Average transit speed including stops.
const TRANSIT_SPEED_KMH: f64 = 25.0;

/// Haversine metric over lon/lat degrees.
#[derive(Debug, Clone, Copy, Default)]
pub struct Haversine;

impl Haversine {
    fn haversine_m(from: Coord<f64>, to: Coord<f64>) -> f64 {
        let lat1_rad = from.y.to_radians();
        let lat2_rad = to.y.to_radians();
        let delta_lat = (to.y - from.y).to_radians();
        let delta_lng = (to.x - from.x).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().asin();

        EARTH_RADIUS_M * c
    }
}

impl DistanceMetric for Haversine {
    fn distance(&self, from: Coord<f64>, to: Coord<f64>) -> f64 {
        Self::haversine_m(from, to)
    }
}

/// Assumed travel speed for a mode, in metres per minute.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TravelSpeed {
    pub meters_per_minute: f64,
}

impl TravelSpeed {
    pub fn from_kmh(kmh: f64) -> Self {
        Self {
            meters_per_minute: kmh * 1000.0 / 60.0,
        }
    }

    pub fn from_mps(mps: f64) -> Self {
        Self {
            meters_per_minute: mps * 60.0,
        }
    }

    pub fn default_for(mode: TravelMode) -> Self {
        match mode {
            TravelMode::Walk => Self::from_mps(WALK_SPEED_MPS),
            TravelMode::Drive => Self::from_kmh(DRIVE_SPEED_KMH),
            TravelMode::Transit => Self::from_kmh(TRANSIT_SPEED_KMH),
        }
    }

    /// Minutes needed to cover `meters`.
    pub fn minutes(&self, meters: f64) -> f64 {
        meters / self.meters_per_minute
    }
}

/// Walking minutes for a distance norm, e.g. "500 m on foot".
pub fn walking_minutes(meters: f64) -> f64 {
    TravelSpeed::default_for(TravelMode::Walk).minutes(meters)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lonlat(lng: f64, lat: f64) -> Coord<f64> {
        Coord { x: lng, y: lat }
    }

    #[test]
    fn test_haversine_same_point() {
        let dist = Haversine.distance(lonlat(34.57, 61.63), lonlat(34.57, 61.63));
        assert!(dist < 0.001, "Same point should have ~0 distance");
    }

    #[test]
    fn test_haversine_known_distance() {
        // One degree of latitude is ~111.2 km anywhere on the sphere
        let dist = Haversine.distance(lonlat(31.32, 56.0), lonlat(31.32, 57.0));
        assert!(dist > 110_000.0 && dist < 112_500.0, "got {}", dist);
    }

    #[test]
    fn test_haversine_symmetric() {
        let a = lonlat(31.32, 56.27);
        let b = lonlat(34.56, 61.63);
        assert!((Haversine.distance(a, b) - Haversine.distance(b, a)).abs() < 1e-6);
    }

    #[test]
    fn test_drive_minutes() {
        // 10 km at 40 km/h = 15 minutes
        let minutes = TravelSpeed::default_for(TravelMode::Drive).minutes(10_000.0);
        assert!((minutes - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_walking_norm() {
        // 500 m at 1.3 m/s = 78 m/min
        assert!((walking_minutes(500.0) - 500.0 / 78.0).abs() < 1e-9);
    }
}

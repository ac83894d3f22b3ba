//! Seams between the engine and the coordinate system of the input data.
//!
//! The engine itself only ever measures distances through [`DistanceMetric`],
//! so the same graph code works on projected metres and on lon/lat degrees.

use geo::Coord;

/// Point-to-point distance in metres.
pub trait DistanceMetric: Send + Sync {
    fn distance(&self, from: Coord<f64>, to: Coord<f64>) -> f64;
}

/// Euclidean distance on projected coordinates.
#[derive(Debug, Clone, Copy, Default)]
pub struct Planar;

impl DistanceMetric for Planar {
    fn distance(&self, from: Coord<f64>, to: Coord<f64>) -> f64 {
        (to.x - from.x).hypot(to.y - from.y)
    }
}

//! access-planner core
//!
//! Facility accessibility analysis over a routable network: isochrones,
//! per-zone compliance against access norms, and greedy placement of new
//! facilities where coverage falls short.

pub mod accessibility;
pub mod analysis;
pub mod candidates;
pub mod config;
pub mod error;
pub mod geometry;
pub mod graph;
pub mod haversine;
pub mod isochrone;
pub mod model;
pub mod optimizer;
pub mod rules;
pub mod traits;
pub mod validation;

pub use error::{Error, Result};

//! Core domain traits for the facility engine.
//!
//! These are intentionally minimal. Callers with their own data models
//! implement them and hand slices straight to the selection heuristics;
//! `model::DemandPoint` and `model::FacilityCandidate` are the stock
//! implementations.

use std::fmt::Display;
use std::hash::Hash;

use rayon::prelude::*;

use crate::distance::Coord;

/// Unique identifier for engine entities.
///
/// `Display` is required so validation errors can name the offender.
pub trait Id: Clone + Eq + Hash + Display {}

impl<T> Id for T where T: Clone + Eq + Hash + Display {}

/// A demand point: a location that consumes volume.
pub trait Demand {
    type Id: Id;

    fn id(&self) -> &Self::Id;

    /// Location (lat, lng) or planar (y, x).
    fn location(&self) -> Coord;

    /// Demand volume, non-negative.
    fn weight(&self) -> f64;

    /// Per-unit-distance cost multiplier, if known.
    fn unit_cost(&self) -> Option<f64> {
        None
    }

    /// Risk score in `[0, 1]`, if known.
    fn risk(&self) -> Option<f64> {
        None
    }
}

/// A candidate facility site that may be opened.
pub trait Facility {
    type Id: Id;

    fn id(&self) -> &Self::Id;

    fn location(&self) -> Coord;

    /// Maximum throughput.
    fn capacity(&self) -> f64;

    /// Cost incurred only when the site is opened.
    fn fixed_cost(&self) -> f64;
}

/// Provides point-to-point distances in kilometers.
pub trait DistanceProvider: Sync {
    fn distance_km(&self, from: Coord, to: Coord) -> f64;

    /// Whether coordinates are latitude/longitude degrees.
    fn is_geographic(&self) -> bool {
        true
    }

    /// Distance matrix, `matrix[i][j]` = origin `i` to destination `j`.
    ///
    /// Rows are computed in parallel but collected in origin order.
    fn matrix_for(&self, origins: &[Coord], destinations: &[Coord]) -> Vec<Vec<f64>> {
        origins
            .par_iter()
            .map(|from| {
                destinations
                    .iter()
                    .map(|to| self.distance_km(*from, *to))
                    .collect()
            })
            .collect()
    }
}

/// Why a demand point was left without a facility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnassignedReason {
    /// No facility was opened at all.
    NoFacilitySelected,
    /// No opened facility lies within the service radius.
    OutOfRange,
    /// In range of an opened facility, but its capacity ran out.
    CapacityExhausted,
}

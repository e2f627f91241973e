//! Input checks run before any computation starts.
//!
//! Hard errors (negative volumes, out-of-range coordinates) fail fast.
//! Soft problems are returned as warnings and logged; they never stop a run.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::distance::Coord;
use crate::error::{EngineError, Result};
use crate::traits::{Demand, DistanceProvider, Facility};

/// Below this many demand points a location study says little.
const FEW_POINTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarningCode {
    FewPoints,
    DuplicateLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationWarning {
    pub code: WarningCode,
    pub message: String,
}

pub fn require_non_empty<T>(items: &[T], what: &'static str) -> Result<()> {
    if items.is_empty() {
        return Err(EngineError::EmptyInput { what });
    }
    Ok(())
}

/// Check weights, optional cost/risk attributes and coordinates.
pub fn validate_demand<D, M>(points: &[D], metric: &M) -> Result<()>
where
    D: Demand,
    M: DistanceProvider + ?Sized,
{
    for point in points {
        let id = point.id().to_string();
        check_coord(&id, point.location(), metric.is_geographic())?;
        check_attributes(&id, point)?;
    }
    Ok(())
}

/// Check capacities, fixed costs and coordinates of candidate sites.
pub fn validate_facilities<F, M>(candidates: &[F], metric: &M) -> Result<()>
where
    F: Facility,
    M: DistanceProvider + ?Sized,
{
    for candidate in candidates {
        let id = candidate.id().to_string();
        check_coord(&id, candidate.location(), metric.is_geographic())?;
        check_amount("capacity", &id, candidate.capacity())?;
        check_amount("fixed cost", &id, candidate.fixed_cost())?;
    }
    Ok(())
}

/// Soft checks on a demand set. Each warning is also logged.
pub fn demand_warnings<D: Demand>(points: &[D]) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if !points.is_empty() && points.len() < FEW_POINTS {
        warnings.push(ValidationWarning {
            code: WarningCode::FewPoints,
            message: format!(
                "only {} demand points; results may not be meaningful",
                points.len()
            ),
        });
    }

    let mut seen = HashSet::new();
    for point in points {
        let location = point.location();
        if !seen.insert((location.lat.to_bits(), location.lng.to_bits())) {
            warnings.push(ValidationWarning {
                code: WarningCode::DuplicateLocation,
                message: format!(
                    "demand point {} shares its location ({}, {}) with an earlier point",
                    point.id(),
                    location.lat,
                    location.lng
                ),
            });
        }
    }

    for warning in &warnings {
        warn!(code = ?warning.code, "{}", warning.message);
    }

    warnings
}

/// Weight, cost and risk of one demand point.
pub(crate) fn check_attributes<D: Demand>(id: &str, point: &D) -> Result<()> {
    check_amount("weight", id, point.weight())?;
    if let Some(cost) = point.unit_cost() {
        check_amount("cost", id, cost)?;
    }
    if let Some(risk) = point.risk() {
        if !(0.0..=1.0).contains(&risk) {
            return Err(EngineError::InvalidParameter {
                name: "risk",
                value: risk,
                reason: "risk must lie in [0, 1]",
            });
        }
    }
    Ok(())
}

pub(crate) fn check_amount(field: &'static str, id: &str, value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(EngineError::NonFiniteValue {
            field,
            id: id.to_string(),
        });
    }
    if value < 0.0 {
        return Err(EngineError::NegativeValue {
            field,
            id: id.to_string(),
            value,
        });
    }
    Ok(())
}

pub(crate) fn check_coord(id: &str, coord: Coord, geographic: bool) -> Result<()> {
    let finite = coord.lat.is_finite() && coord.lng.is_finite();
    let in_range = !geographic
        || ((-90.0..=90.0).contains(&coord.lat) && (-180.0..=180.0).contains(&coord.lng));
    if finite && in_range {
        Ok(())
    } else {
        Err(EngineError::InvalidCoordinate {
            id: id.to_string(),
            lat: coord.lat,
            lng: coord.lng,
        })
    }
}

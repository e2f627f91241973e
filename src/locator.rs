//! Single-site locators: center-of-gravity variants and the weighted
//! geometric median (Weiszfeld iteration).

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::distance::Coord;
use crate::error::{EngineError, Result};
use crate::numeric::safe_div;
use crate::traits::{Demand, DistanceProvider};
use crate::validation::{check_amount, check_attributes};

/// A coordinate carrying a non-negative weight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightedCoord {
    pub coord: Coord,
    pub weight: f64,
}

impl WeightedCoord {
    pub const fn new(coord: Coord, weight: f64) -> Self {
        Self { coord, weight }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeiszfeldOptions {
    /// Minimum point distance (km) counted in an iteration, and the
    /// per-axis step (degrees) below which iteration stops.
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for WeiszfeldOptions {
    fn default() -> Self {
        Self {
            tolerance: 1e-6,
            max_iterations: 100,
        }
    }
}

/// Where the iteration stopped and why.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeiszfeldOutcome {
    pub coord: Coord,
    pub iterations: usize,
    /// `false` when the iteration budget ran out or every point
    /// coincided with the estimate.
    pub converged: bool,
}

/// Weights of the composite score used by the multi-criteria center.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiCriteriaWeights {
    pub volume: f64,
    pub cost: f64,
    pub risk: f64,
}

impl Default for MultiCriteriaWeights {
    fn default() -> Self {
        Self {
            volume: 0.4,
            cost: 0.3,
            risk: 0.3,
        }
    }
}

/// Weighted arithmetic mean of `points`.
///
/// Fails on a negative or non-finite weight and on a non-finite coordinate.
pub fn weighted_mean(points: &[WeightedCoord]) -> Result<Coord> {
    if points.is_empty() {
        return Err(EngineError::EmptyInput {
            what: "demand points",
        });
    }
    check_weighted(points)?;

    let mut total_weight = 0.0;
    let mut lat = 0.0;
    let mut lng = 0.0;
    for point in points {
        total_weight += point.weight;
        lat += point.coord.lat * point.weight;
        lng += point.coord.lng * point.weight;
    }

    if total_weight == 0.0 {
        return Err(EngineError::ZeroTotalWeight);
    }

    Ok(Coord::new(
        safe_div(lat, total_weight),
        safe_div(lng, total_weight),
    ))
}

/// Weighted geometric median by Weiszfeld's fixed-point iteration.
///
/// Starts from the weighted mean. Points closer than `tolerance` to the
/// current estimate are skipped for that iteration; if the estimate sits
/// on a data point and the next step would not lower the total weighted
/// distance, that point is the median and iteration stops there.
/// Convergence is best effort: hitting `max_iterations` returns the last
/// estimate.
pub fn weiszfeld<M>(
    points: &[WeightedCoord],
    metric: &M,
    options: WeiszfeldOptions,
) -> Result<WeiszfeldOutcome>
where
    M: DistanceProvider + ?Sized,
{
    let mut estimate = weighted_mean(points)?;

    for iteration in 1..=options.max_iterations {
        let mut numerator_lat = 0.0;
        let mut numerator_lng = 0.0;
        let mut denominator = 0.0;
        let mut on_data_point = false;

        for point in points {
            let distance = metric.distance_km(estimate, point.coord);
            if distance < options.tolerance {
                on_data_point = true;
                continue;
            }
            let weight_over_distance = safe_div(point.weight, distance);
            numerator_lat += point.coord.lat * weight_over_distance;
            numerator_lng += point.coord.lng * weight_over_distance;
            denominator += weight_over_distance;
        }

        if denominator == 0.0 {
            debug!(iteration, "weiszfeld stopped: every point coincides with the estimate");
            return Ok(WeiszfeldOutcome {
                coord: estimate,
                iterations: iteration,
                converged: false,
            });
        }

        let next = Coord::new(
            safe_div(numerator_lat, denominator),
            safe_div(numerator_lng, denominator),
        );
        if on_data_point && objective(points, next, metric) >= objective(points, estimate, metric) {
            debug!(iteration, "weiszfeld stopped on a data point");
            return Ok(WeiszfeldOutcome {
                coord: estimate,
                iterations: iteration,
                converged: true,
            });
        }

        let settled = (next.lat - estimate.lat).abs() < options.tolerance
            && (next.lng - estimate.lng).abs() < options.tolerance;
        estimate = next;

        if settled {
            debug!(iteration, lat = estimate.lat, lng = estimate.lng, "weiszfeld converged");
            return Ok(WeiszfeldOutcome {
                coord: estimate,
                iterations: iteration,
                converged: true,
            });
        }
    }

    debug!(
        iterations = options.max_iterations,
        "weiszfeld hit the iteration limit"
    );
    Ok(WeiszfeldOutcome {
        coord: estimate,
        iterations: options.max_iterations,
        converged: false,
    })
}

/// Points are named by position, since a `WeightedCoord` carries no id.
fn check_weighted(points: &[WeightedCoord]) -> Result<()> {
    for (index, point) in points.iter().enumerate() {
        let id = format!("#{index}");
        if !(point.coord.lat.is_finite() && point.coord.lng.is_finite()) {
            return Err(EngineError::NonFiniteValue {
                field: "coordinate",
                id,
            });
        }
        check_amount("weight", &id, point.weight)?;
    }
    Ok(())
}

fn check_demand<D: Demand>(points: &[D]) -> Result<()> {
    for point in points {
        check_attributes(&point.id().to_string(), point)?;
    }
    Ok(())
}

fn objective<M>(points: &[WeightedCoord], at: Coord, metric: &M) -> f64
where
    M: DistanceProvider + ?Sized,
{
    points
        .iter()
        .map(|point| point.weight * metric.distance_km(at, point.coord))
        .sum()
}

/// Geometric median coordinate; see [`weiszfeld`].
pub fn locate_geometric_median<M>(
    points: &[WeightedCoord],
    metric: &M,
    options: WeiszfeldOptions,
) -> Result<Coord>
where
    M: DistanceProvider + ?Sized,
{
    weiszfeld(points, metric, options).map(|outcome| outcome.coord)
}

/// Demand points weighted by `weight_of`.
pub fn weighted_coords<D, F>(points: &[D], weight_of: F) -> Vec<WeightedCoord>
where
    D: Demand,
    F: Fn(&D) -> f64,
{
    points
        .iter()
        .map(|point| WeightedCoord::new(point.location(), weight_of(point)))
        .collect()
}

/// Classic center of gravity: volume-weighted mean.
pub fn weighted_cog<D: Demand>(points: &[D]) -> Result<Coord> {
    check_demand(points)?;
    weighted_mean(&weighted_coords(points, |p| p.weight()))
}

/// Center weighted by `unit_cost × weight`. Points without a cost count
/// as zero.
pub fn economic_cog<D: Demand>(points: &[D]) -> Result<Coord> {
    check_demand(points)?;
    weighted_mean(&weighted_coords(points, |p| {
        p.unit_cost().unwrap_or(0.0) * p.weight()
    }))
}

/// Center weighted by `weight × (1 − risk)`. Missing risk counts as zero.
pub fn risk_adjusted_cog<D: Demand>(points: &[D]) -> Result<Coord> {
    check_demand(points)?;
    weighted_mean(&weighted_coords(points, |p| {
        p.weight() * (1.0 - p.risk().unwrap_or(0.0))
    }))
}

/// Center weighted by a composite of volume, cheapness and safety.
///
/// Score = `volume·weight + cost·(1 / unit_cost) + risk·(1 − risk)`; a
/// missing cost counts as 1, a zero cost contributes nothing.
pub fn multi_criteria_cog<D: Demand>(points: &[D], weights: MultiCriteriaWeights) -> Result<Coord> {
    check_demand(points)?;
    weighted_mean(&weighted_coords(points, |p| {
        weights.volume * p.weight()
            + weights.cost * safe_div(1.0, p.unit_cost().unwrap_or(1.0))
            + weights.risk * (1.0 - p.risk().unwrap_or(0.0))
    }))
}

/// Per-axis weighted median; minimizes weighted rectilinear distance.
pub fn manhattan_cog<D: Demand>(points: &[D]) -> Result<Coord> {
    let weighted = weighted_coords(points, |p| p.weight());
    if weighted.is_empty() {
        return Err(EngineError::EmptyInput {
            what: "demand points",
        });
    }
    check_demand(points)?;
    check_weighted(&weighted)?;
    let total: f64 = weighted.iter().map(|p| p.weight).sum();
    if total == 0.0 {
        return Err(EngineError::ZeroTotalWeight);
    }

    let lat = weighted_median(&weighted, total, |c| c.lat);
    let lng = weighted_median(&weighted, total, |c| c.lng);
    Ok(Coord::new(lat, lng))
}

/// First axis value at which cumulative weight reaches half the total.
fn weighted_median(points: &[WeightedCoord], total: f64, axis: fn(&Coord) -> f64) -> f64 {
    let mut sorted: Vec<(f64, f64)> = points.iter().map(|p| (axis(&p.coord), p.weight)).collect();
    sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

    let half = total / 2.0;
    let mut cumulative = 0.0;
    for (value, weight) in &sorted {
        cumulative += weight;
        if cumulative >= half {
            return *value;
        }
    }
    // Only reachable through rounding in the running sum.
    sorted.last().map(|(value, _)| *value).unwrap_or_default()
}

/// `Σ weight × distance(at, point)`.
pub fn weighted_distance_sum<M>(points: &[WeightedCoord], at: Coord, metric: &M) -> f64
where
    M: DistanceProvider + ?Sized,
{
    points
        .iter()
        .map(|point| point.weight * metric.distance_km(point.coord, at))
        .sum()
}

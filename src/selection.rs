//! Greedy facility selection heuristics.
//!
//! All three strategies pick sites greedily by a marginal score and then
//! assign each demand point to at most one opened site. Candidate scores
//! are computed in parallel and collected in input order; the winner is
//! always chosen by a sequential scan so ties resolve to the earliest
//! candidate and repeated runs are bit-identical.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::distance::Coord;
use crate::error::{EngineError, Result};
use crate::model::Assignment;
use crate::numeric::{percent, safe_div};
use crate::traits::{Demand, DistanceProvider, Facility, UnassignedReason};
use crate::validation::{validate_demand, validate_facilities};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PMedianOptions {
    /// Number of sites to open.
    pub p: usize,
    /// Transport cost per km per unit of demand.
    pub rate_per_km: f64,
    /// Add the fixed cost of opened sites to the total.
    pub include_fixed_costs: bool,
    /// Open the 1-median first instead of the first candidate.
    pub one_median_seed: bool,
}

impl Default for PMedianOptions {
    fn default() -> Self {
        Self {
            p: 3,
            rate_per_km: 10.0,
            include_fixed_costs: false,
            one_median_seed: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapacitatedOptions {
    /// A site only serves demand within this radius.
    pub service_radius_km: f64,
    /// Transport cost per km per unit of demand. Higher than the
    /// uncapacitated rate to reflect stricter capacity accounting.
    pub rate_per_km: f64,
}

impl Default for CapacitatedOptions {
    fn default() -> Self {
        Self {
            service_radius_km: 50.0,
            rate_per_km: 12.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubOptions {
    pub hub_count: usize,
    /// Radius used to score coverage; assignment ignores it.
    pub hub_radius_km: f64,
    /// Multiplier in `(0, 1]` applied to hub transport cost.
    pub discount_factor: f64,
    pub rate_per_km: f64,
}

impl Default for HubOptions {
    fn default() -> Self {
        Self {
            hub_count: 2,
            hub_radius_km: 100.0,
            discount_factor: 0.8,
            rate_per_km: 8.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnassignedDemand<DemandId> {
    pub demand_id: DemandId,
    pub demand: f64,
    pub reason: UnassignedReason,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacilityUtilization<FacilityId> {
    pub facility_id: FacilityId,
    pub assigned_demand: f64,
    pub capacity: f64,
    /// Assigned demand as a percentage of capacity.
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionResult<FacilityId, DemandId> {
    /// Opened sites in the order they were chosen.
    pub selected: Vec<FacilityId>,
    pub assignments: Vec<Assignment<DemandId, FacilityId>>,
    pub unassigned: Vec<UnassignedDemand<DemandId>>,
    pub utilization: Vec<FacilityUtilization<FacilityId>>,
    pub transport_cost: f64,
    /// Sum of fixed costs of opened sites, whether or not it is in the total.
    pub fixed_cost: f64,
    pub total_cost: f64,
    /// Sum of assignment distances.
    pub total_distance_km: f64,
    /// Sum of `demand × distance` over assignments.
    pub weighted_distance: f64,
    /// Percentage of demand points that received a site.
    pub service_level: f64,
}

impl<FacilityId, DemandId> SelectionResult<FacilityId, DemandId> {
    pub fn is_fully_assigned(&self) -> bool {
        self.unassigned.is_empty()
    }
}

/// Greedy P-Median: open `p` sites, each time the one that most reduces
/// total weighted distance, then assign demand to the nearest open site.
///
/// With nothing open every demand point is infinitely far away, so every
/// candidate saves the same unbounded amount and the first one in input
/// order is opened. `one_median_seed` opens the site with the lowest total
/// weighted distance instead. Later picks stop early once no site gives a
/// positive reduction. `p` is clamped to the candidate count.
pub fn select_p_median<F, D, M>(
    candidates: &[F],
    demand: &[D],
    metric: &M,
    options: &PMedianOptions,
) -> Result<SelectionResult<F::Id, D::Id>>
where
    F: Facility,
    D: Demand,
    M: DistanceProvider + ?Sized,
{
    validate_demand(demand, metric)?;
    validate_facilities(candidates, metric)?;
    check_rate(options.rate_per_km)?;

    let p = options.p.min(candidates.len());
    if demand.is_empty() || p == 0 {
        return Ok(nothing_opened(demand));
    }

    let problem = Problem::new(candidates, demand, metric);
    let unbounded_savings = if problem.weights.iter().any(|w| *w > 0.0) {
        f64::INFINITY
    } else {
        0.0
    };
    let mut nearest: Vec<Option<f64>> = vec![None; demand.len()];
    let mut opened = vec![false; candidates.len()];
    let mut order: Vec<usize> = Vec::with_capacity(p);

    for step in 0..p {
        let scores: Vec<Option<f64>> = (0..candidates.len())
            .into_par_iter()
            .map(|f| {
                if opened[f] {
                    return None;
                }
                let row = &problem.distances[f];
                let score = if order.is_empty() && !options.one_median_seed {
                    unbounded_savings
                } else if order.is_empty() {
                    // Maximizing the negated cost picks the 1-median.
                    -problem
                        .weights
                        .iter()
                        .zip(row)
                        .map(|(w, d)| w * d)
                        .sum::<f64>()
                } else {
                    problem
                        .weights
                        .iter()
                        .zip(row)
                        .zip(&nearest)
                        .map(|((w, d), best)| {
                            let best = best.unwrap_or(f64::INFINITY);
                            w * (best - d).max(0.0)
                        })
                        .sum::<f64>()
                };
                Some(score)
            })
            .collect();

        let Some((best, score)) = arg_best(&scores, |a, b| a > b) else {
            break;
        };
        if !order.is_empty() && score <= 0.0 {
            debug!(step, "p-median stopped early: no candidate reduces distance");
            break;
        }

        debug!(step, candidate = best, score, "p-median opened site");
        opened[best] = true;
        order.push(best);
        for (i, slot) in nearest.iter_mut().enumerate() {
            let d = problem.distances[best][i];
            if slot.is_none_or(|current| d < current) {
                *slot = Some(d);
            }
        }
    }

    let mut links = Vec::with_capacity(demand.len());
    for i in 0..demand.len() {
        if let Some(f) = problem.nearest_of(&order, i) {
            let distance = problem.distances[f][i];
            links.push(Link {
                demand: i,
                facility: f,
                distance,
                cost: distance * problem.weights[i] * options.rate_per_km,
            });
        }
    }

    let result = assemble(
        candidates,
        demand,
        &order,
        links,
        Vec::new(),
        options.include_fixed_costs,
        false,
    );
    info!(
        opened = result.selected.len(),
        total_cost = result.total_cost,
        "p-median selection complete"
    );
    Ok(result)
}

/// Greedy capacitated facility location.
///
/// Repeatedly opens the site with the lowest `fixed_cost / coverable`
/// ratio, where `coverable` is the unassigned demand within the service
/// radius capped by the site's capacity. The new site then takes demand
/// points in input order while each whole point still fits. Points no site
/// can take are reported as unassigned, not as an error.
pub fn select_capacitated<F, D, M>(
    candidates: &[F],
    demand: &[D],
    metric: &M,
    options: &CapacitatedOptions,
) -> Result<SelectionResult<F::Id, D::Id>>
where
    F: Facility,
    D: Demand,
    M: DistanceProvider + ?Sized,
{
    validate_demand(demand, metric)?;
    validate_facilities(candidates, metric)?;
    check_rate(options.rate_per_km)?;
    check_radius("service_radius_km", options.service_radius_km)?;

    if demand.is_empty() || candidates.is_empty() {
        return Ok(nothing_opened(demand));
    }

    let radius = options.service_radius_km;
    let problem = Problem::new(candidates, demand, metric);
    let capacities: Vec<f64> = candidates.iter().map(|c| c.capacity()).collect();
    let fixed_costs: Vec<f64> = candidates.iter().map(|c| c.fixed_cost()).collect();

    let mut remaining: Vec<usize> = (0..demand.len()).collect();
    let mut opened = vec![false; candidates.len()];
    let mut order = Vec::new();
    let mut links = Vec::new();

    while !remaining.is_empty() {
        let ratios: Vec<Option<f64>> = (0..candidates.len())
            .into_par_iter()
            .map(|f| {
                if opened[f] {
                    return None;
                }
                let in_range: f64 = remaining
                    .iter()
                    .filter(|&&i| problem.distances[f][i] <= radius)
                    .map(|&i| problem.weights[i])
                    .sum();
                let coverable = in_range.min(capacities[f]);
                if coverable <= 0.0 {
                    return None;
                }
                Some(safe_div(fixed_costs[f], coverable))
            })
            .collect();

        let Some((best, ratio)) = arg_best(&ratios, |a, b| a < b) else {
            break;
        };

        opened[best] = true;
        order.push(best);

        let mut capacity_left = capacities[best];
        let mut taken = 0usize;
        remaining.retain(|&i| {
            let distance = problem.distances[best][i];
            let volume = problem.weights[i];
            if distance <= radius && volume <= capacity_left {
                capacity_left -= volume;
                taken += 1;
                links.push(Link {
                    demand: i,
                    facility: best,
                    distance,
                    cost: distance * volume * options.rate_per_km,
                });
                false
            } else {
                true
            }
        });

        debug!(candidate = best, ratio, taken, capacity_left, "capacitated opened site");
    }

    let unassigned = remaining
        .iter()
        .map(|&i| {
            let reason = if order.is_empty() {
                UnassignedReason::NoFacilitySelected
            } else if order.iter().any(|&f| problem.distances[f][i] <= radius) {
                UnassignedReason::CapacityExhausted
            } else {
                UnassignedReason::OutOfRange
            };
            (i, reason)
        })
        .collect::<Vec<_>>();

    if !unassigned.is_empty() {
        info!(
            unassigned = unassigned.len(),
            "capacitated selection could not cover all demand"
        );
    }

    links.sort_by_key(|link| link.demand);
    let result = assemble(candidates, demand, &order, links, unassigned, true, false);
    info!(
        opened = result.selected.len(),
        total_cost = result.total_cost,
        service_level = result.service_level,
        "capacitated selection complete"
    );
    Ok(result)
}

/// Hub location by coverage ranking.
///
/// Ranks sites by demand within `hub_radius_km` (stable, so ties keep input
/// order), opens the top `hub_count`, and sends every demand point to its
/// nearest hub at a discounted transport rate.
pub fn select_hubs<F, D, M>(
    candidates: &[F],
    demand: &[D],
    metric: &M,
    options: &HubOptions,
) -> Result<SelectionResult<F::Id, D::Id>>
where
    F: Facility,
    D: Demand,
    M: DistanceProvider + ?Sized,
{
    validate_demand(demand, metric)?;
    validate_facilities(candidates, metric)?;
    check_rate(options.rate_per_km)?;
    check_radius("hub_radius_km", options.hub_radius_km)?;
    let discount = options.discount_factor;
    if !(discount > 0.0 && discount <= 1.0) {
        return Err(EngineError::InvalidParameter {
            name: "discount_factor",
            value: discount,
            reason: "must lie in (0, 1]",
        });
    }

    let hub_count = options.hub_count.min(candidates.len());
    if demand.is_empty() || hub_count == 0 {
        return Ok(nothing_opened(demand));
    }

    let problem = Problem::new(candidates, demand, metric);
    let coverage: Vec<f64> = problem
        .distances
        .par_iter()
        .map(|row| {
            row.iter()
                .zip(&problem.weights)
                .filter(|(d, _)| **d <= options.hub_radius_km)
                .map(|(_, w)| w)
                .sum::<f64>()
        })
        .collect();

    let mut ranking: Vec<usize> = (0..candidates.len()).collect();
    ranking.sort_by(|&a, &b| coverage[b].total_cmp(&coverage[a]));
    let order: Vec<usize> = ranking.into_iter().take(hub_count).collect();
    debug!(hubs = ?order, "hub ranking complete");

    let rate = options.rate_per_km * discount;
    let links = (0..demand.len())
        .filter_map(|i| {
            problem.nearest_of(&order, i).map(|f| {
                let distance = problem.distances[f][i];
                Link {
                    demand: i,
                    facility: f,
                    distance,
                    cost: distance * problem.weights[i] * rate,
                }
            })
        })
        .collect();

    let result = assemble(candidates, demand, &order, links, Vec::new(), true, true);
    info!(
        hubs = result.selected.len(),
        total_cost = result.total_cost,
        "hub selection complete"
    );
    Ok(result)
}

// ============================================================================
// Shared machinery
// ============================================================================

/// Candidate-by-demand distances and demand volumes, by input index.
struct Problem {
    distances: Vec<Vec<f64>>,
    weights: Vec<f64>,
}

impl Problem {
    fn new<F, D, M>(candidates: &[F], demand: &[D], metric: &M) -> Self
    where
        F: Facility,
        D: Demand,
        M: DistanceProvider + ?Sized,
    {
        let sites: Vec<Coord> = candidates.iter().map(|c| c.location()).collect();
        let points: Vec<Coord> = demand.iter().map(|d| d.location()).collect();
        Self {
            distances: metric.matrix_for(&sites, &points),
            weights: demand.iter().map(|d| d.weight()).collect(),
        }
    }

    /// Closest opened site to demand `i`; ties go to the earlier-opened one.
    fn nearest_of(&self, opened: &[usize], i: usize) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for &f in opened {
            let d = self.distances[f][i];
            if best.is_none_or(|(_, current)| d < current) {
                best = Some((f, d));
            }
        }
        best.map(|(f, _)| f)
    }
}

struct Link {
    demand: usize,
    facility: usize,
    distance: f64,
    cost: f64,
}

/// First index whose score beats all others under `better`.
fn arg_best(scores: &[Option<f64>], better: impl Fn(f64, f64) -> bool) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (index, score) in scores.iter().enumerate() {
        let Some(score) = *score else { continue };
        if best.is_none_or(|(_, current)| better(score, current)) {
            best = Some((index, score));
        }
    }
    best
}

fn nothing_opened<FacilityId, D>(demand: &[D]) -> SelectionResult<FacilityId, D::Id>
where
    D: Demand,
{
    SelectionResult {
        selected: Vec::new(),
        assignments: Vec::new(),
        unassigned: demand
            .iter()
            .map(|d| UnassignedDemand {
                demand_id: d.id().clone(),
                demand: d.weight(),
                reason: UnassignedReason::NoFacilitySelected,
            })
            .collect(),
        utilization: Vec::new(),
        transport_cost: 0.0,
        fixed_cost: 0.0,
        total_cost: 0.0,
        total_distance_km: 0.0,
        weighted_distance: 0.0,
        service_level: 0.0,
    }
}

fn assemble<F, D>(
    candidates: &[F],
    demand: &[D],
    order: &[usize],
    links: Vec<Link>,
    unassigned: Vec<(usize, UnassignedReason)>,
    include_fixed_costs: bool,
    cap_utilization: bool,
) -> SelectionResult<F::Id, D::Id>
where
    F: Facility,
    D: Demand,
{
    let mut load = vec![0.0; candidates.len()];
    let mut transport_cost = 0.0;
    let mut total_distance_km = 0.0;
    let mut weighted_distance = 0.0;
    let mut assignments = Vec::with_capacity(links.len());

    for link in &links {
        let volume = demand[link.demand].weight();
        load[link.facility] += volume;
        transport_cost += link.cost;
        total_distance_km += link.distance;
        weighted_distance += link.distance * volume;
        assignments.push(Assignment {
            demand_id: demand[link.demand].id().clone(),
            facility_id: candidates[link.facility].id().clone(),
            distance_km: link.distance,
            cost: link.cost,
        });
    }

    let fixed_cost: f64 = order.iter().map(|&f| candidates[f].fixed_cost()).sum();
    let total_cost = if include_fixed_costs {
        transport_cost + fixed_cost
    } else {
        transport_cost
    };

    let utilization = order
        .iter()
        .map(|&f| {
            let capacity = candidates[f].capacity();
            let mut pct = percent(load[f], capacity);
            if cap_utilization {
                pct = pct.min(100.0);
            }
            FacilityUtilization {
                facility_id: candidates[f].id().clone(),
                assigned_demand: load[f],
                capacity,
                percent: pct,
            }
        })
        .collect();

    let unassigned = unassigned
        .into_iter()
        .map(|(i, reason)| UnassignedDemand {
            demand_id: demand[i].id().clone(),
            demand: demand[i].weight(),
            reason,
        })
        .collect();

    SelectionResult {
        selected: order.iter().map(|&f| candidates[f].id().clone()).collect(),
        service_level: percent(links.len() as f64, demand.len() as f64),
        assignments,
        unassigned,
        utilization,
        transport_cost,
        fixed_cost,
        total_cost,
        total_distance_km,
        weighted_distance,
    }
}

fn check_rate(rate: f64) -> Result<()> {
    if rate.is_finite() && rate >= 0.0 {
        Ok(())
    } else {
        Err(EngineError::InvalidParameter {
            name: "rate_per_km",
            value: rate,
            reason: "must be a finite, non-negative number",
        })
    }
}

fn check_radius(name: &'static str, radius: f64) -> Result<()> {
    if radius >= 0.0 && !radius.is_nan() {
        Ok(())
    } else {
        Err(EngineError::InvalidParameter {
            name,
            value: radius,
            reason: "must be non-negative",
        })
    }
}

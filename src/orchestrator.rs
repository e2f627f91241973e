//! Named optimization runs and their normalized result record.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::distance::{Coord, Metric};
use crate::error::{EngineError, Result};
use crate::locator::{
    economic_cog, manhattan_cog, multi_criteria_cog, risk_adjusted_cog, weighted_coords,
    weighted_cog, weiszfeld, MultiCriteriaWeights, WeiszfeldOptions,
};
use crate::model::{Assignment, DemandPoint, FacilityCandidate, Season};
use crate::numeric::percent;
use crate::selection::{
    select_capacitated, select_hubs, select_p_median, CapacitatedOptions, FacilityUtilization,
    HubOptions, PMedianOptions, SelectionResult, UnassignedDemand,
};
use crate::traits::DistanceProvider;
use crate::validation::{
    demand_warnings, require_non_empty, validate_demand, ValidationWarning,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlgorithmKind {
    Weighted,
    Geometric,
    Economic,
    Manhattan,
    RiskAdjusted,
    MultiCriteria,
    PMedian,
    Capacitated,
    HubLocation,
}

impl AlgorithmKind {
    pub const ALL: [AlgorithmKind; 9] = [
        AlgorithmKind::Weighted,
        AlgorithmKind::Geometric,
        AlgorithmKind::Economic,
        AlgorithmKind::Manhattan,
        AlgorithmKind::RiskAdjusted,
        AlgorithmKind::MultiCriteria,
        AlgorithmKind::PMedian,
        AlgorithmKind::Capacitated,
        AlgorithmKind::HubLocation,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AlgorithmKind::Weighted => "weighted",
            AlgorithmKind::Geometric => "geometric",
            AlgorithmKind::Economic => "economic",
            AlgorithmKind::Manhattan => "manhattan",
            AlgorithmKind::RiskAdjusted => "risk-adjusted",
            AlgorithmKind::MultiCriteria => "multi-criteria",
            AlgorithmKind::PMedian => "p-median",
            AlgorithmKind::Capacitated => "capacitated",
            AlgorithmKind::HubLocation => "hub-location",
        }
    }

    /// Whether the run opens candidate sites rather than placing one point.
    pub fn selects_facilities(self) -> bool {
        matches!(
            self,
            AlgorithmKind::PMedian | AlgorithmKind::Capacitated | AlgorithmKind::HubLocation
        )
    }
}

impl fmt::Display for AlgorithmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AlgorithmKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        let kind = match normalized.as_str() {
            "weighted" | "cog" => AlgorithmKind::Weighted,
            "geometric" | "geometric-median" | "weiszfeld" => AlgorithmKind::Geometric,
            "economic" => AlgorithmKind::Economic,
            "manhattan" => AlgorithmKind::Manhattan,
            "risk-adjusted" | "risk" => AlgorithmKind::RiskAdjusted,
            "multi-criteria" => AlgorithmKind::MultiCriteria,
            "p-median" | "pmedian" => AlgorithmKind::PMedian,
            "capacitated" | "cflp" => AlgorithmKind::Capacitated,
            "hub-location" | "hub" => AlgorithmKind::HubLocation,
            _ => return Err(EngineError::UnknownAlgorithm(s.to_string())),
        };
        Ok(kind)
    }
}

/// Every tunable of a run. Deserializes from partial JSON; missing fields
/// take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub metric: Metric,
    pub weiszfeld: WeiszfeldOptions,
    pub multi_criteria: MultiCriteriaWeights,
    /// Transport rate used to cost single-site placements.
    pub cog_rate_per_km: f64,
    pub p_median: PMedianOptions,
    pub capacitated: CapacitatedOptions,
    pub hub: HubOptions,
    /// Assumed worst-case cost per unit of demand when scoring efficiency.
    pub efficiency_bound_per_unit: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            metric: Metric::Haversine,
            weiszfeld: WeiszfeldOptions::default(),
            multi_criteria: MultiCriteriaWeights::default(),
            cog_rate_per_km: 10.0,
            p_median: PMedianOptions::default(),
            capacitated: CapacitatedOptions::default(),
            hub: HubOptions::default(),
            efficiency_bound_per_unit: 1000.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum Placement {
    Coordinate(Coord),
    Facilities(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub algorithm_used: AlgorithmKind,
    pub placement: Placement,
    pub assignments: Vec<Assignment<String, String>>,
    pub unassigned: Vec<UnassignedDemand<String>>,
    pub utilization: Vec<FacilityUtilization<String>>,
    pub total_cost: f64,
    pub total_distance: f64,
    /// `max(0, 100 − total_cost / (total_weight × bound) × 100)`.
    ///
    /// A relative indicator for comparing runs over the same demand; the
    /// bound is a heuristic, so this is not a calibrated percentage.
    pub efficiency_score: f64,
    /// Percent of demand points that were assigned.
    pub service_level: f64,
    pub warnings: Vec<ValidationWarning>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalResult {
    pub season: String,
    pub result: OptimizationResult,
}

/// Run one algorithm over `demand` (and `candidates` for the selection
/// algorithms) and normalize the outcome.
pub fn optimize(
    kind: AlgorithmKind,
    demand: &[DemandPoint],
    candidates: &[FacilityCandidate],
    config: &EngineConfig,
) -> Result<OptimizationResult> {
    check_config(config)?;
    require_non_empty(demand, "demand points")?;
    validate_demand(demand, &config.metric)?;
    if kind.selects_facilities() {
        require_non_empty(candidates, "facility candidates")?;
    }
    let warnings = demand_warnings(demand);

    let mut result = match kind {
        AlgorithmKind::PMedian => from_selection(
            kind,
            select_p_median(candidates, demand, &config.metric, &config.p_median)?,
        ),
        AlgorithmKind::Capacitated => from_selection(
            kind,
            select_capacitated(candidates, demand, &config.metric, &config.capacitated)?,
        ),
        AlgorithmKind::HubLocation => from_selection(
            kind,
            select_hubs(candidates, demand, &config.metric, &config.hub)?,
        ),
        _ => {
            let site = locate(kind, demand, config)?;
            single_site(kind, site, demand, &config.metric, config.cog_rate_per_km)
        }
    };

    let total_weight: f64 = demand.iter().map(|p| p.weight).sum();
    result.efficiency_score = efficiency_score(
        result.total_cost,
        total_weight,
        config.efficiency_bound_per_unit,
    );
    result.warnings = warnings;

    info!(
        algorithm = %kind,
        total_cost = result.total_cost,
        efficiency = result.efficiency_score,
        "optimization run finished"
    );
    Ok(result)
}

/// `max(0, 100 − percent(total_cost, total_weight × bound_per_unit))`.
pub fn efficiency_score(total_cost: f64, total_weight: f64, bound_per_unit: f64) -> f64 {
    (100.0 - percent(total_cost, total_weight * bound_per_unit)).max(0.0)
}

fn locate(kind: AlgorithmKind, demand: &[DemandPoint], config: &EngineConfig) -> Result<Coord> {
    match kind {
        AlgorithmKind::Weighted => weighted_cog(demand),
        AlgorithmKind::Geometric => {
            let points = weighted_coords(demand, |p| p.weight);
            let outcome = weiszfeld(&points, &config.metric, config.weiszfeld)?;
            if !outcome.converged {
                warn!(
                    iterations = outcome.iterations,
                    "geometric median did not converge; using last estimate"
                );
            }
            Ok(outcome.coord)
        }
        AlgorithmKind::Economic => economic_cog(demand),
        AlgorithmKind::Manhattan => manhattan_cog(demand),
        AlgorithmKind::RiskAdjusted => risk_adjusted_cog(demand),
        AlgorithmKind::MultiCriteria => multi_criteria_cog(demand, config.multi_criteria),
        AlgorithmKind::PMedian | AlgorithmKind::Capacitated | AlgorithmKind::HubLocation => {
            Err(EngineError::UnknownAlgorithm(kind.to_string()))
        }
    }
}

/// Cost a single site serving every demand point directly.
fn single_site<M>(
    kind: AlgorithmKind,
    site: Coord,
    demand: &[DemandPoint],
    metric: &M,
    rate_per_km: f64,
) -> OptimizationResult
where
    M: DistanceProvider + ?Sized,
{
    let mut total_distance = 0.0;
    let mut total_cost = 0.0;
    for point in demand {
        let distance = metric.distance_km(point.location, site);
        total_distance += distance;
        total_cost += distance * point.weight * rate_per_km;
    }

    OptimizationResult {
        algorithm_used: kind,
        placement: Placement::Coordinate(site),
        assignments: Vec::new(),
        unassigned: Vec::new(),
        utilization: Vec::new(),
        total_cost,
        total_distance,
        efficiency_score: 0.0,
        service_level: 100.0,
        warnings: Vec::new(),
    }
}

fn from_selection(kind: AlgorithmKind, selection: SelectionResult<String, String>) -> OptimizationResult {
    OptimizationResult {
        algorithm_used: kind,
        placement: Placement::Facilities(selection.selected),
        assignments: selection.assignments,
        unassigned: selection.unassigned,
        utilization: selection.utilization,
        total_cost: selection.total_cost,
        total_distance: selection.total_distance_km,
        efficiency_score: 0.0,
        service_level: selection.service_level,
        warnings: Vec::new(),
    }
}

fn check_config(config: &EngineConfig) -> Result<()> {
    for (name, value) in [
        ("cog_rate_per_km", config.cog_rate_per_km),
        ("efficiency_bound_per_unit", config.efficiency_bound_per_unit),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(EngineError::InvalidParameter {
                name,
                value,
                reason: "must be a non-negative finite number",
            });
        }
    }
    Ok(())
}

/// Caller-owned run state: the configuration plus every result produced so
/// far, most recent last.
#[derive(Debug, Clone, Default)]
pub struct Optimizer {
    config: EngineConfig,
    history: Vec<OptimizationResult>,
}

impl Optimizer {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            history: Vec::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut EngineConfig {
        &mut self.config
    }

    pub fn run(
        &mut self,
        kind: AlgorithmKind,
        demand: &[DemandPoint],
        candidates: &[FacilityCandidate],
    ) -> Result<&OptimizationResult> {
        let result = optimize(kind, demand, candidates, &self.config)?;
        self.history.push(result);
        self.last().ok_or(EngineError::EmptyInput { what: "results" })
    }

    /// Same as [`Optimizer::run`] with the algorithm given by name, e.g.
    /// `"p-median"`.
    pub fn run_named(
        &mut self,
        name: &str,
        demand: &[DemandPoint],
        candidates: &[FacilityCandidate],
    ) -> Result<&OptimizationResult> {
        let kind = name.parse()?;
        self.run(kind, demand, candidates)
    }

    /// One run per season over the season-adjusted demand. The base demand
    /// is left untouched, and history only grows once every season succeeds.
    pub fn run_seasonal(
        &mut self,
        kind: AlgorithmKind,
        demand: &[DemandPoint],
        candidates: &[FacilityCandidate],
        seasons: &[Season],
    ) -> Result<Vec<SeasonalResult>> {
        require_non_empty(seasons, "seasons")?;
        let mut results = Vec::with_capacity(seasons.len());
        for season in seasons {
            let adjusted = season.adjustment.apply(demand);
            let result = optimize(kind, &adjusted, candidates, &self.config)?;
            results.push(SeasonalResult {
                season: season.name.clone(),
                result,
            });
        }
        self.history
            .extend(results.iter().map(|seasonal| seasonal.result.clone()));
        Ok(results)
    }

    /// The most recent result; each run replaces the previous one here.
    pub fn last(&self) -> Option<&OptimizationResult> {
        self.history.last()
    }

    pub fn history(&self) -> &[OptimizationResult] {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}

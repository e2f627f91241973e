//! Concrete data model: demand points, candidate sites, assignments.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::distance::Coord;
use crate::traits::{Demand, Facility};

/// A demand location with volume and optional cost/risk attributes.
///
/// Never mutated after creation; adjustments produce a new point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandPoint {
    pub id: String,
    pub name: String,
    pub location: Coord,
    pub weight: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk: Option<f64>,
}

impl DemandPoint {
    pub fn new(id: impl Into<String>, name: impl Into<String>, location: Coord, weight: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            location,
            weight,
            cost: None,
            risk: None,
        }
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = Some(cost);
        self
    }

    pub fn with_risk(mut self, risk: f64) -> Self {
        self.risk = Some(risk);
        self
    }

    /// A derived point with its weight scaled by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            weight: self.weight * factor,
            ..self.clone()
        }
    }
}

impl Demand for DemandPoint {
    type Id = String;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn location(&self) -> Coord {
        self.location
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn unit_cost(&self) -> Option<f64> {
        self.cost
    }

    fn risk(&self) -> Option<f64> {
        self.risk
    }
}

/// A site that may be opened. Whether it was opened is part of a result,
/// never of the candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacilityCandidate {
    pub id: String,
    pub name: String,
    pub location: Coord,
    pub capacity: f64,
    pub fixed_cost: f64,
}

impl FacilityCandidate {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        location: Coord,
        capacity: f64,
        fixed_cost: f64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            location,
            capacity,
            fixed_cost,
        }
    }
}

impl Facility for FacilityCandidate {
    type Id = String;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn location(&self) -> Coord {
        self.location
    }

    fn capacity(&self) -> f64 {
        self.capacity
    }

    fn fixed_cost(&self) -> f64 {
        self.fixed_cost
    }
}

/// Weight multiplier applied to demand before a run.
///
/// Any randomness (seasonality, risk draws) is sampled by the caller and
/// arrives here as plain numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Adjustment {
    /// Same factor for every point.
    Uniform(f64),
    /// Factor per demand point id; points not listed keep their weight.
    PerPoint(HashMap<String, f64>),
}

impl Adjustment {
    pub fn factor_for(&self, id: &str) -> f64 {
        match self {
            Adjustment::Uniform(factor) => *factor,
            Adjustment::PerPoint(factors) => factors.get(id).copied().unwrap_or(1.0),
        }
    }

    /// Derived copies of `points` with adjusted weights.
    pub fn apply(&self, points: &[DemandPoint]) -> Vec<DemandPoint> {
        points
            .iter()
            .map(|point| point.scaled(self.factor_for(&point.id)))
            .collect()
    }
}

/// A named demand scenario, e.g. dry or wet season.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Season {
    pub name: String,
    pub adjustment: Adjustment,
}

impl Season {
    pub fn new(name: impl Into<String>, adjustment: Adjustment) -> Self {
        Self {
            name: name.into(),
            adjustment,
        }
    }
}

/// One demand point served by one facility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment<DemandId, FacilityId> {
    pub demand_id: DemandId,
    pub facility_id: FacilityId,
    pub distance_km: f64,
    pub cost: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nairobi() -> DemandPoint {
        DemandPoint::new("d1", "Nairobi", Coord::new(-1.2921, 36.8219), 500.0)
            .with_cost(1000.0)
            .with_risk(0.1)
    }

    #[test]
    fn test_scaled_leaves_original_untouched() {
        let point = nairobi();
        let scaled = point.scaled(1.2);

        assert_eq!(point.weight, 500.0);
        assert_eq!(scaled.weight, 600.0);
        assert_eq!(scaled.id, point.id);
        assert_eq!(scaled.cost, point.cost);
    }

    #[test]
    fn test_per_point_adjustment_defaults_to_one() {
        let points = vec![
            nairobi(),
            DemandPoint::new("d2", "Mombasa", Coord::new(-4.0435, 39.6682), 300.0),
        ];
        let adjustment = Adjustment::PerPoint(HashMap::from([("d2".to_string(), 0.5)]));

        let adjusted = adjustment.apply(&points);
        assert_eq!(adjusted[0].weight, 500.0);
        assert_eq!(adjusted[1].weight, 150.0);
        assert_eq!(points[1].weight, 300.0);
    }

    #[test]
    fn test_uniform_adjustment() {
        let adjusted = Adjustment::Uniform(2.0).apply(&[nairobi()]);
        assert_eq!(adjusted[0].weight, 1000.0);
    }

    #[test]
    fn test_demand_trait_exposes_optional_fields() {
        let point = nairobi();
        assert_eq!(Demand::unit_cost(&point), Some(1000.0));
        assert_eq!(Demand::risk(&point), Some(0.1));

        let bare = DemandPoint::new("d9", "Bare", Coord::default(), 1.0);
        assert_eq!(Demand::unit_cost(&bare), None);
    }
}

//! Kenyan towns used as demand points and candidate sites.
//!
//! Coordinates are town centres; volumes and costs are illustrative.

use facility_network::distance::Coord;
use facility_network::model::{DemandPoint, FacilityCandidate};

/// A named location with coordinates.
#[derive(Debug, Clone)]
pub struct Location {
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    pub const fn new(name: &'static str, lat: f64, lng: f64) -> Self {
        Self { name, lat, lng }
    }

    pub fn coord(&self) -> Coord {
        Coord::new(self.lat, self.lng)
    }
}

// ============================================================================
// Towns
// ============================================================================

pub const TOWNS: &[Location] = &[
    Location::new("Nairobi", -1.2921, 36.8219),
    Location::new("Mombasa", -4.0435, 39.6682),
    Location::new("Kisumu", -0.0917, 34.7680),
    Location::new("Nakuru", -0.3031, 36.0800),
    Location::new("Eldoret", 0.5143, 35.2698),
    Location::new("Thika", -1.0332, 37.0694),
    Location::new("Machakos", -1.5177, 37.2634),
    Location::new("Nyeri", -0.4201, 36.9476),
];

/// Monthly volume per town, same order as [`TOWNS`].
const VOLUMES: &[f64] = &[1200.0, 800.0, 450.0, 400.0, 350.0, 300.0, 250.0, 200.0];

/// Delivery cost per unit and risk score per town.
const COSTS: &[f64] = &[1.0, 1.4, 1.2, 0.9, 1.1, 0.8, 0.9, 1.0];
const RISKS: &[f64] = &[0.1, 0.3, 0.2, 0.1, 0.15, 0.05, 0.1, 0.1];

pub fn demand_points() -> Vec<DemandPoint> {
    TOWNS
        .iter()
        .enumerate()
        .map(|(i, town)| {
            DemandPoint::new(format!("d{}", i + 1), town.name, town.coord(), VOLUMES[i])
                .with_cost(COSTS[i])
                .with_risk(RISKS[i])
        })
        .collect()
}

// ============================================================================
// Candidate sites
// ============================================================================

pub fn candidates() -> Vec<FacilityCandidate> {
    vec![
        FacilityCandidate::new("f1", "Nairobi Central", Coord::new(-1.2921, 36.8219), 5000.0, 1_000_000.0),
        FacilityCandidate::new("f2", "Mombasa Port", Coord::new(-4.0435, 39.6682), 3000.0, 800_000.0),
        FacilityCandidate::new("f3", "Kisumu West", Coord::new(-0.0917, 34.7680), 2000.0, 600_000.0),
        FacilityCandidate::new("f4", "Nakuru Hub", Coord::new(-0.3031, 36.0800), 2500.0, 700_000.0),
        FacilityCandidate::new("f5", "Eldoret North", Coord::new(0.5143, 35.2698), 1500.0, 500_000.0),
        FacilityCandidate::new("f6", "Thika Industrial", Coord::new(-1.0332, 37.0694), 1800.0, 550_000.0),
    ]
}

pub fn total_volume() -> f64 {
    VOLUMES.iter().sum()
}

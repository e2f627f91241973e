//! Point-to-point distance metrics.
//!
//! Every metric returns kilometers for geographic input. The planar
//! variants treat coordinates as plain `x, y` and return the same unit
//! the caller used.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::traits::DistanceProvider;

/// Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Kilometers per degree used by the flat grid approximations.
pub const KM_PER_DEGREE: f64 = 111.0;

/// A coordinate pair. For planar data `lat` holds `y` and `lng` holds `x`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coord {
    pub lat: f64,
    pub lng: f64,
}

impl Coord {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Planar point; stored as `lat = y`, `lng = x`.
    pub const fn planar(x: f64, y: f64) -> Self {
        Self { lat: y, lng: x }
    }
}

impl From<(f64, f64)> for Coord {
    fn from((lat, lng): (f64, f64)) -> Self {
        Self { lat, lng }
    }
}

/// Distance metric selected per call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Metric {
    /// Flat Euclidean on a km grid, longitude scaled by `cos(mean latitude)`.
    Euclidean,
    /// Rectilinear on the same km grid.
    Manhattan,
    /// Great-circle distance.
    #[default]
    Haversine,
    /// Curvature-adjusted Pythagoras with `cos` taken at the second
    /// point's latitude. Not symmetric; kept for parity with the network
    /// cost sheets that use it.
    Curvature,
    /// Curvature-adjusted Pythagoras with `cos` at the mean latitude.
    CurvatureMean,
    /// `sqrt(dx² + dy²)` on raw coordinates.
    PlanarEuclidean,
    /// `|dx| + |dy|` on raw coordinates.
    PlanarManhattan,
}

impl Metric {
    pub const ALL: [Metric; 7] = [
        Metric::Euclidean,
        Metric::Manhattan,
        Metric::Haversine,
        Metric::Curvature,
        Metric::CurvatureMean,
        Metric::PlanarEuclidean,
        Metric::PlanarManhattan,
    ];

    /// Whether inputs are latitude/longitude degrees.
    pub fn is_geographic(self) -> bool {
        !matches!(self, Metric::PlanarEuclidean | Metric::PlanarManhattan)
    }

    /// Whether `d(a, b) == d(b, a)` holds for every pair.
    pub fn is_symmetric(self) -> bool {
        self != Metric::Curvature
    }

    pub fn name(self) -> &'static str {
        match self {
            Metric::Euclidean => "euclidean",
            Metric::Manhattan => "manhattan",
            Metric::Haversine => "haversine",
            Metric::Curvature => "curvature",
            Metric::CurvatureMean => "curvature-mean",
            Metric::PlanarEuclidean => "planar-euclidean",
            Metric::PlanarManhattan => "planar-manhattan",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Metric {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "great-circle" => Ok(Metric::Haversine),
            "pythagoras" => Ok(Metric::Curvature),
            _ => Metric::ALL
                .into_iter()
                .find(|metric| metric.name() == s)
                .ok_or_else(|| EngineError::UnknownMetric(s.to_string())),
        }
    }
}

impl DistanceProvider for Metric {
    fn distance_km(&self, from: Coord, to: Coord) -> f64 {
        distance(*self, from, to)
    }

    fn is_geographic(&self) -> bool {
        Metric::is_geographic(*self)
    }
}

/// Distance between `a` and `b` under `metric`.
pub fn distance(metric: Metric, a: Coord, b: Coord) -> f64 {
    match metric {
        Metric::Euclidean => {
            let (lat_km, lng_km) = grid_components(a, b);
            (lat_km * lat_km + lng_km * lng_km).sqrt()
        }
        Metric::Manhattan => {
            let (lat_km, lng_km) = grid_components(a, b);
            lat_km.abs() + lng_km.abs()
        }
        Metric::Haversine => haversine_km(a, b),
        Metric::Curvature => curvature_km(a, b, b.lat),
        Metric::CurvatureMean => curvature_km(a, b, (a.lat + b.lat) / 2.0),
        Metric::PlanarEuclidean => {
            let dx = a.lng - b.lng;
            let dy = a.lat - b.lat;
            (dx * dx + dy * dy).sqrt()
        }
        Metric::PlanarManhattan => (a.lng - b.lng).abs() + (a.lat - b.lat).abs(),
    }
}

/// Per-axis offsets in km on a flat grid centred at the mean latitude.
fn grid_components(a: Coord, b: Coord) -> (f64, f64) {
    let mean_lat = ((a.lat + b.lat) / 2.0).to_radians();
    let lat_km = (a.lat - b.lat) * KM_PER_DEGREE;
    let lng_km = (a.lng - b.lng) * KM_PER_DEGREE * mean_lat.cos();
    (lat_km, lng_km)
}

/// Calculate haversine distance between two points in kilometers.
fn haversine_km(from: Coord, to: Coord) -> f64 {
    let lat1_rad = from.lat.to_radians();
    let lat2_rad = to.lat.to_radians();
    let delta_lat = (to.lat - from.lat).to_radians();
    let delta_lng = (to.lng - from.lng).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    // Rounding can push `a` a hair past 1 for antipodal points.
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// `H = Δlng·cos(φ)`, `V = Δlat`, `D = √(H² + V²)` degrees, then to km.
fn curvature_km(a: Coord, b: Coord, cos_lat_deg: f64) -> f64 {
    let h = (a.lng - b.lng) * cos_lat_deg.to_radians().cos();
    let v = a.lat - b.lat;
    let degrees = (h * h + v * v).sqrt();
    degrees * (2.0 * std::f64::consts::PI * EARTH_RADIUS_KM / 360.0)
}

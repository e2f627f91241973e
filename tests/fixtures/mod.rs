//! Test fixtures for facility-network.
//!
//! Provides realistic test data:
//! - Kenyan towns as demand points with volume, cost and risk
//! - Candidate warehouse sites with capacities and fixed costs

#![allow(dead_code)]

pub mod kenya_locations;

pub use kenya_locations::*;

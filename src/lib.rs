//! facility-network core
//!
//! Distance metrics, center-of-gravity locators, greedy facility selection
//! and logistics cost evaluation for small supply chain networks.

pub mod traits;
pub mod error;
pub mod numeric;
pub mod distance;
pub mod model;
pub mod validation;
pub mod locator;
pub mod selection;
pub mod network;
pub mod orchestrator;

pub use error::{EngineError, Result};

//! Factory → depot → customer network and its logistics cost.
//!
//! Depot throughput is never stored: it is derived from the customers that
//! point at the depot every time costs are computed, so editing the
//! customer/depot relations can never leave a stale figure behind.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::distance::{Coord, Metric};
use crate::error::{EngineError, Result};
use crate::numeric::percent;
use crate::traits::DistanceProvider;
use crate::validation::{check_amount, check_coord};

/// Days per month used when converting stock cover to months.
const DAYS_PER_MONTH: f64 = 30.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Factory {
    pub id: String,
    pub name: String,
    pub location: Coord,
    /// Cost per unit produced.
    pub production_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Depot {
    pub id: String,
    pub name: String,
    pub location: Coord,
    pub fixed_cost: f64,
    /// Used only to report utilization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<f64>,
    /// Supplying factory; a depot without one carries no trunking or
    /// stock holding cost.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factory_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub location: Coord,
    pub demand: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depot_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    pub stock_level_days: f64,
    pub transit_time_days: f64,
    /// Fraction of product value charged per month held, e.g. `0.02`.
    pub monthly_holding_rate: f64,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            stock_level_days: 14.0,
            transit_time_days: 2.0,
            monthly_holding_rate: 0.02,
        }
    }
}

/// Rate constants of the cost sheet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostRates {
    pub trunking_base: f64,
    pub trunking_per_km: f64,
    pub delivery_base: f64,
    pub delivery_per_km: f64,
    pub depot_variable: f64,
}

impl Default for CostRates {
    fn default() -> Self {
        Self {
            trunking_base: 4.70,
            trunking_per_km: 0.06,
            delivery_base: 7.5,
            delivery_per_km: 0.2,
            depot_variable: 4.9,
        }
    }
}

impl CostRates {
    /// Factory → depot leg.
    pub fn trunking(&self, throughput: f64, distance_km: f64) -> f64 {
        self.trunking_base * throughput + self.trunking_per_km * throughput * distance_km
    }

    /// Depot → customer leg.
    pub fn local_delivery(&self, throughput: f64, distance_km: f64) -> f64 {
        self.delivery_base * throughput + self.delivery_per_km * throughput * distance_km
    }

    pub fn depot(&self, fixed_cost: f64, throughput: f64) -> f64 {
        fixed_cost + self.depot_variable * throughput
    }
}

/// Holding cost per unit of throughput:
/// `production_cost × ((stock days + transit days) / 30) × monthly rate`.
pub fn stock_holding_cost(production_cost: f64, settings: &NetworkSettings) -> f64 {
    let months = (settings.stock_level_days + settings.transit_time_days) / DAYS_PER_MONTH;
    production_cost * months * settings.monthly_holding_rate
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkCostOptions {
    pub rates: CostRates,
    pub metric: Metric,
}

impl Default for NetworkCostOptions {
    fn default() -> Self {
        Self {
            rates: CostRates::default(),
            metric: Metric::Curvature,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepotCost {
    pub depot_id: String,
    pub throughput: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utilization: Option<f64>,
    pub trunking_cost: f64,
    pub delivery_cost: f64,
    pub depot_cost: f64,
    pub stock_holding_cost: f64,
    pub total_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostAnalysis {
    pub total_cost: f64,
    pub trunking_cost: f64,
    pub delivery_cost: f64,
    pub depot_cost: f64,
    pub stock_holding_cost: f64,
    pub by_depot: Vec<DepotCost>,
    /// Customers with no depot; their demand flows through nothing.
    pub unserved_customers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NetworkModel {
    pub factories: Vec<Factory>,
    pub depots: Vec<Depot>,
    pub customers: Vec<Customer>,
    #[serde(default)]
    pub settings: NetworkSettings,
}

impl NetworkModel {
    /// Point a customer at a depot, or detach it with `None`.
    pub fn assign_customer(&mut self, customer_id: &str, depot_id: Option<&str>) -> Result<()> {
        if let Some(depot_id) = depot_id {
            self.depot(depot_id)?;
        }
        let customer = self
            .customers
            .iter_mut()
            .find(|c| c.id == customer_id)
            .ok_or_else(|| unknown("customer", customer_id))?;
        customer.depot_id = depot_id.map(str::to_string);
        Ok(())
    }

    /// Set or clear the factory supplying a depot.
    pub fn supply_depot(&mut self, depot_id: &str, factory_id: Option<&str>) -> Result<()> {
        if let Some(factory_id) = factory_id {
            self.factory(factory_id)?;
        }
        let depot = self
            .depots
            .iter_mut()
            .find(|d| d.id == depot_id)
            .ok_or_else(|| unknown("depot", depot_id))?;
        depot.factory_id = factory_id.map(str::to_string);
        Ok(())
    }

    /// Sum of demand of the customers served by `depot_id`.
    pub fn depot_throughput(&self, depot_id: &str) -> f64 {
        self.customers
            .iter()
            .filter(|c| c.depot_id.as_deref() == Some(depot_id))
            .map(|c| c.demand)
            .sum()
    }

    fn depot(&self, id: &str) -> Result<&Depot> {
        self.depots
            .iter()
            .find(|d| d.id == id)
            .ok_or_else(|| unknown("depot", id))
    }

    fn factory(&self, id: &str) -> Result<&Factory> {
        self.factories
            .iter()
            .find(|f| f.id == id)
            .ok_or_else(|| unknown("factory", id))
    }

    fn validate(&self, geographic: bool) -> Result<()> {
        for factory in &self.factories {
            check_coord(&factory.id, factory.location, geographic)?;
            check_amount("production cost", &factory.id, factory.production_cost)?;
        }
        for depot in &self.depots {
            check_coord(&depot.id, depot.location, geographic)?;
            check_amount("fixed cost", &depot.id, depot.fixed_cost)?;
            if let Some(capacity) = depot.capacity {
                check_amount("capacity", &depot.id, capacity)?;
            }
            if let Some(factory_id) = &depot.factory_id {
                self.factory(factory_id)?;
            }
        }
        for customer in &self.customers {
            check_coord(&customer.id, customer.location, geographic)?;
            check_amount("demand", &customer.id, customer.demand)?;
            if let Some(depot_id) = &customer.depot_id {
                self.depot(depot_id)?;
            }
        }
        check_amount("stock level days", "settings", self.settings.stock_level_days)?;
        check_amount("transit time days", "settings", self.settings.transit_time_days)?;
        check_amount("monthly holding rate", "settings", self.settings.monthly_holding_rate)?;
        Ok(())
    }
}

/// Full cost breakdown of `model`, recomputed from scratch.
///
/// `total_cost` is exactly `trunking + delivery + depot + stock holding`,
/// both per depot and overall.
pub fn compute_network_cost(model: &NetworkModel, options: &NetworkCostOptions) -> Result<CostAnalysis> {
    let metric = options.metric;
    let rates = &options.rates;
    model.validate(metric.is_geographic())?;

    let depot_index: HashMap<&str, usize> = model
        .depots
        .iter()
        .enumerate()
        .map(|(i, d)| (d.id.as_str(), i))
        .collect();

    let mut throughput = vec![0.0; model.depots.len()];
    let mut delivery = vec![0.0; model.depots.len()];
    let mut unserved_customers = Vec::new();

    for customer in &model.customers {
        let Some(depot_id) = customer.depot_id.as_deref() else {
            unserved_customers.push(customer.id.clone());
            continue;
        };
        let i = depot_index[depot_id];
        let depot = &model.depots[i];
        let distance = metric.distance_km(depot.location, customer.location);
        throughput[i] += customer.demand;
        delivery[i] += rates.local_delivery(customer.demand, distance);
    }

    let mut by_depot = Vec::with_capacity(model.depots.len());
    for (i, depot) in model.depots.iter().enumerate() {
        let factory = depot
            .factory_id
            .as_deref()
            .map(|id| model.factory(id))
            .transpose()?;

        let (trunking_cost, stock_holding) = match factory {
            Some(factory) => {
                let distance = metric.distance_km(factory.location, depot.location);
                (
                    rates.trunking(throughput[i], distance),
                    stock_holding_cost(factory.production_cost, &model.settings) * throughput[i],
                )
            }
            None => (0.0, 0.0),
        };
        let depot_cost = rates.depot(depot.fixed_cost, throughput[i]);
        let total_cost = trunking_cost + delivery[i] + depot_cost + stock_holding;

        debug!(depot = %depot.id, throughput = throughput[i], total_cost, "depot costed");
        by_depot.push(DepotCost {
            depot_id: depot.id.clone(),
            throughput: throughput[i],
            utilization: depot.capacity.map(|capacity| percent(throughput[i], capacity)),
            trunking_cost,
            delivery_cost: delivery[i],
            depot_cost,
            stock_holding_cost: stock_holding,
            total_cost,
        });
    }

    let trunking_cost: f64 = by_depot.iter().map(|d| d.trunking_cost).sum();
    let delivery_cost: f64 = by_depot.iter().map(|d| d.delivery_cost).sum();
    let depot_cost: f64 = by_depot.iter().map(|d| d.depot_cost).sum();
    let stock_holding_cost: f64 = by_depot.iter().map(|d| d.stock_holding_cost).sum();
    let total_cost = trunking_cost + delivery_cost + depot_cost + stock_holding_cost;

    info!(
        depots = by_depot.len(),
        unserved = unserved_customers.len(),
        total_cost,
        "network cost computed"
    );

    Ok(CostAnalysis {
        total_cost,
        trunking_cost,
        delivery_cost,
        depot_cost,
        stock_holding_cost,
        by_depot,
        unserved_customers,
    })
}

fn unknown(kind: &'static str, id: &str) -> EngineError {
    EngineError::UnknownReference {
        kind,
        id: id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factory(id: &str, lat: f64, lng: f64, production_cost: f64) -> Factory {
        Factory {
            id: id.to_string(),
            name: id.to_string(),
            location: Coord::new(lat, lng),
            production_cost,
        }
    }

    fn depot(id: &str, lat: f64, lng: f64, fixed_cost: f64, factory_id: Option<&str>) -> Depot {
        Depot {
            id: id.to_string(),
            name: id.to_string(),
            location: Coord::new(lat, lng),
            fixed_cost,
            capacity: None,
            factory_id: factory_id.map(str::to_string),
        }
    }

    fn customer(id: &str, lat: f64, lng: f64, demand: f64, depot_id: Option<&str>) -> Customer {
        Customer {
            id: id.to_string(),
            name: id.to_string(),
            location: Coord::new(lat, lng),
            demand,
            depot_id: depot_id.map(str::to_string),
        }
    }

    fn settings() -> NetworkSettings {
        NetworkSettings {
            stock_level_days: 20.0,
            transit_time_days: 10.0,
            monthly_holding_rate: 0.02,
        }
    }

    #[test]
    fn test_cost_formulas() {
        let rates = CostRates::default();
        assert!((rates.trunking(100.0, 10.0) - (470.0 + 60.0)).abs() < 1e-9);
        assert!((rates.local_delivery(100.0, 10.0) - (750.0 + 200.0)).abs() < 1e-9);
        assert!((rates.depot(1000.0, 100.0) - 1490.0).abs() < 1e-9);
        // 30 days = 1 month at 2%
        assert!((stock_holding_cost(50.0, &settings()) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_co_located_network() {
        let model = NetworkModel {
            factories: vec![factory("f1", -1.29, 36.82, 50.0)],
            depots: vec![depot("d1", -1.29, 36.82, 1000.0, Some("f1"))],
            customers: vec![
                customer("c1", -1.29, 36.82, 60.0, Some("d1")),
                customer("c2", -1.29, 36.82, 40.0, Some("d1")),
            ],
            settings: settings(),
        };

        let analysis = compute_network_cost(&model, &NetworkCostOptions::default()).unwrap();
        assert!((analysis.trunking_cost - 470.0).abs() < 1e-9);
        assert!((analysis.delivery_cost - 750.0).abs() < 1e-9);
        assert!((analysis.depot_cost - 1490.0).abs() < 1e-9);
        assert!((analysis.stock_holding_cost - 100.0).abs() < 1e-9);
        assert_eq!(analysis.by_depot[0].throughput, 100.0);
    }

    #[test]
    fn test_total_is_sum_of_terms() {
        let model = NetworkModel {
            factories: vec![factory("f1", -1.29, 36.82, 12.0)],
            depots: vec![
                depot("d1", -0.30, 36.08, 700.0, Some("f1")),
                depot("d2", -4.04, 39.67, 800.0, None),
            ],
            customers: vec![
                customer("c1", -0.10, 34.77, 400.0, Some("d1")),
                customer("c2", 0.52, 35.27, 300.0, Some("d1")),
                customer("c3", -3.22, 40.12, 150.0, Some("d2")),
            ],
            settings: settings(),
        };

        let analysis = compute_network_cost(&model, &NetworkCostOptions::default()).unwrap();
        assert_eq!(
            analysis.total_cost,
            analysis.trunking_cost
                + analysis.delivery_cost
                + analysis.depot_cost
                + analysis.stock_holding_cost
        );
        for depot in &analysis.by_depot {
            assert_eq!(
                depot.total_cost,
                depot.trunking_cost + depot.delivery_cost + depot.depot_cost + depot.stock_holding_cost
            );
        }
        // d2 has no factory
        assert_eq!(analysis.by_depot[1].trunking_cost, 0.0);
        assert_eq!(analysis.by_depot[1].stock_holding_cost, 0.0);
    }

    #[test]
    fn test_reassignment_moves_throughput() {
        let mut model = NetworkModel {
            factories: vec![factory("f1", 0.0, 0.0, 10.0)],
            depots: vec![
                depot("d1", 0.0, 0.0, 0.0, Some("f1")),
                depot("d2", 1.0, 1.0, 0.0, Some("f1")),
            ],
            customers: vec![customer("c1", 0.5, 0.5, 80.0, Some("d1"))],
            settings: settings(),
        };
        assert_eq!(model.depot_throughput("d1"), 80.0);

        model.assign_customer("c1", Some("d2")).unwrap();
        assert_eq!(model.depot_throughput("d1"), 0.0);
        assert_eq!(model.depot_throughput("d2"), 80.0);

        let analysis = compute_network_cost(&model, &NetworkCostOptions::default()).unwrap();
        assert_eq!(analysis.by_depot[0].throughput, 0.0);
        assert_eq!(analysis.by_depot[1].throughput, 80.0);
    }

    #[test]
    fn test_unserved_customers_reported() {
        let model = NetworkModel {
            factories: Vec::new(),
            depots: vec![depot("d1", 0.0, 0.0, 10.0, None)],
            customers: vec![customer("c1", 0.0, 0.0, 5.0, None)],
            settings: settings(),
        };
        let analysis = compute_network_cost(&model, &NetworkCostOptions::default()).unwrap();
        assert_eq!(analysis.unserved_customers, vec!["c1".to_string()]);
        assert_eq!(analysis.total_cost, 10.0);
    }

    #[test]
    fn test_dangling_references_rejected() {
        let mut model = NetworkModel {
            factories: Vec::new(),
            depots: vec![depot("d1", 0.0, 0.0, 10.0, Some("ghost"))],
            customers: Vec::new(),
            settings: settings(),
        };
        assert_eq!(
            compute_network_cost(&model, &NetworkCostOptions::default()),
            Err(EngineError::UnknownReference {
                kind: "factory",
                id: "ghost".to_string()
            })
        );

        model.depots[0].factory_id = None;
        model.customers.push(customer("c1", 0.0, 0.0, 1.0, None));
        assert!(model.assign_customer("c1", Some("nowhere")).is_err());
        assert!(model.assign_customer("nobody", Some("d1")).is_err());
        assert!(model.supply_depot("d1", Some("ghost")).is_err());
    }

    #[test]
    fn test_utilization_when_capacity_known() {
        let mut d1 = depot("d1", 0.0, 0.0, 0.0, None);
        d1.capacity = Some(200.0);
        let model = NetworkModel {
            factories: Vec::new(),
            depots: vec![d1],
            customers: vec![customer("c1", 0.0, 0.0, 50.0, Some("d1"))],
            settings: settings(),
        };
        let analysis = compute_network_cost(&model, &NetworkCostOptions::default()).unwrap();
        assert_eq!(analysis.by_depot[0].utilization, Some(25.0));
    }

    #[test]
    fn test_negative_demand_rejected() {
        let model = NetworkModel {
            factories: Vec::new(),
            depots: vec![depot("d1", 0.0, 0.0, 0.0, None)],
            customers: vec![customer("c1", 0.0, 0.0, -5.0, Some("d1"))],
            settings: settings(),
        };
        assert!(matches!(
            compute_network_cost(&model, &NetworkCostOptions::default()),
            Err(EngineError::NegativeValue { field: "demand", .. })
        ));
    }
}

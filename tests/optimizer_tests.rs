//! End-to-end optimization runs through the orchestrator.

mod fixtures;

use facility_network::distance::{Coord, Metric};
use facility_network::model::{Adjustment, DemandPoint, Season};
use facility_network::orchestrator::{
    optimize, AlgorithmKind, EngineConfig, Optimizer, Placement,
};
use facility_network::EngineError;
use fixtures::*;

#[test]
fn test_every_algorithm_runs_on_kenya() {
    let demand = demand_points();
    let candidates = candidates();
    let config = EngineConfig::default();

    for kind in AlgorithmKind::ALL {
        let result = optimize(kind, &demand, &candidates, &config)
            .unwrap_or_else(|e| panic!("{kind} failed: {e}"));

        assert_eq!(result.algorithm_used, kind);
        assert!(result.total_cost >= 0.0, "{kind}");
        assert!((0.0..=100.0).contains(&result.efficiency_score), "{kind}");
        match (&result.placement, kind.selects_facilities()) {
            (Placement::Facilities(ids), true) => assert!(!ids.is_empty(), "{kind}"),
            (Placement::Coordinate(site), false) => {
                assert!((-5.0..=1.0).contains(&site.lat), "{kind}: {site:?}");
                assert!((34.0..=40.0).contains(&site.lng), "{kind}: {site:?}");
            }
            _ => panic!("{kind} produced the wrong placement kind"),
        }
    }
}

#[test]
fn test_geometric_median_not_worse_than_weighted_mean() {
    let demand = demand_points();
    let config = EngineConfig {
        metric: Metric::Haversine,
        ..EngineConfig::default()
    };
    let mean = optimize(AlgorithmKind::Weighted, &demand, &[], &config).unwrap();
    let median = optimize(AlgorithmKind::Geometric, &demand, &[], &config).unwrap();
    assert!(median.total_cost <= mean.total_cost + 1e-6);
}

#[test]
fn test_geometric_median_of_four_corners_is_the_center() {
    let demand: Vec<DemandPoint> = [(1.0, 1.0), (1.0, -1.0), (-1.0, 1.0), (-1.0, -1.0)]
        .into_iter()
        .enumerate()
        .map(|(i, (lat, lng))| DemandPoint::new(format!("c{i}"), "corner", Coord::new(lat, lng), 1.0))
        .collect();

    let result = optimize(AlgorithmKind::Geometric, &demand, &[], &EngineConfig::default()).unwrap();
    let Placement::Coordinate(site) = result.placement else {
        panic!("expected a coordinate");
    };
    assert!(site.lat.abs() < 1e-6, "{site:?}");
    assert!(site.lng.abs() < 1e-6, "{site:?}");
    assert_eq!(result.service_level, 100.0);
}

#[test]
fn test_config_loaded_from_json_drives_the_run() {
    let config: EngineConfig = serde_json::from_str(
        r#"{
            "metric": "curvature",
            "p_median": { "p": 1, "rate_per_km": 5.0 },
            "efficiency_bound_per_unit": 500.0
        }"#,
    )
    .unwrap();

    let result = optimize(AlgorithmKind::PMedian, &demand_points(), &candidates(), &config).unwrap();
    assert_eq!(result.placement, Placement::Facilities(vec!["f1".to_string()]));
    assert_eq!(result.assignments.len(), demand_points().len());
}

#[test]
fn test_optimizer_keeps_history_and_last() {
    let demand = demand_points();
    let candidates = candidates();
    let mut optimizer = Optimizer::new(EngineConfig::default());

    let cost = optimizer.run_named("p-median", &demand, &candidates).unwrap().total_cost;
    optimizer.run(AlgorithmKind::HubLocation, &demand, &candidates).unwrap();

    assert_eq!(optimizer.history().len(), 2);
    assert_eq!(optimizer.history()[0].total_cost, cost);
    assert_eq!(
        optimizer.last().map(|r| r.algorithm_used),
        Some(AlgorithmKind::HubLocation)
    );

    optimizer.clear_history();
    assert!(optimizer.last().is_none());
}

#[test]
fn test_seasonal_demand_shifts_the_center() {
    let demand = demand_points();
    let coastal_peak = Adjustment::PerPoint([("d2".to_string(), 3.0)].into_iter().collect());
    let seasons = vec![
        Season::new("baseline", Adjustment::Uniform(1.0)),
        Season::new("coastal peak", coastal_peak),
    ];

    let mut optimizer = Optimizer::default();
    let results = optimizer
        .run_seasonal(AlgorithmKind::Weighted, &demand, &[], &seasons)
        .unwrap();

    let lng = |i: usize| match results[i].result.placement {
        Placement::Coordinate(site) => site.lng,
        Placement::Facilities(_) => panic!("expected a coordinate"),
    };
    // Tripling Mombasa's volume pulls the center east.
    assert!(lng(1) > lng(0));
    assert_eq!(demand[1].weight, 800.0);
}

#[test]
fn test_invalid_demand_is_rejected_before_running() {
    let mut demand = demand_points();
    demand[0].weight = -1.0;
    let err = optimize(AlgorithmKind::Geometric, &demand, &[], &EngineConfig::default()).unwrap_err();
    assert!(matches!(err, EngineError::NegativeValue { field: "weight", .. }));
}

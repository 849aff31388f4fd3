//! Integration tests for the grid host
//!
//! Tests the full step loop:
//! - neighbor discovery on plain and wrapped grids
//! - infection spreading one ring per step
//! - order independence and reproducibility
//! - configuration errors

use sird_cell_core_rs::orchestrator::{CellOverride, Neighborhood};
use sird_cell_core_rs::rates::RateDistribution;
use sird_cell_core_rs::{CellConfig, CellState, Orchestrator, ScenarioConfig, SimulationError, Vicinity};

fn healthy() -> CellState {
    CellState::new(100, vec![1.0], vec![0.0], vec![0.0], vec![0.0])
}

fn outbreak() -> CellState {
    CellState::new(100, vec![0.7], vec![0.3], vec![0.0], vec![0.0])
}

fn scenario(shape: [usize; 2], center: [usize; 2]) -> ScenarioConfig {
    ScenarioConfig {
        shape,
        wrapped: false,
        neighborhood: Neighborhood::VonNeumann,
        default_vicinity: Vicinity::uniform(1, 1.0, 0.5),
        default_state: healthy(),
        default_config: CellConfig::default(),
        cells: vec![CellOverride {
            position: center,
            state: Some(outbreak()),
            config: None,
        }],
        rng_seed: 12345,
    }
}

fn infected(orchestrator: &Orchestrator, id: &str) -> f64 {
    orchestrator.state_of(id).unwrap().infected_ratio()
}

#[test]
fn test_grid_builds_every_cell() {
    let orchestrator = Orchestrator::new(scenario([3, 4], [1, 1])).unwrap();
    assert_eq!(orchestrator.num_cells(), 12);
    assert_eq!(orchestrator.current_time(), 0);

    let ids: Vec<&String> = orchestrator.cell_ids().collect();
    assert_eq!(ids.first().map(|s| s.as_str()), Some("(0,0)"));
    assert_eq!(ids.last().map(|s| s.as_str()), Some("(2,3)"));
    assert_eq!(infected(&orchestrator, "(1,1)"), 0.3);
}

#[test]
fn test_infection_spreads_one_ring_per_step() {
    let mut orchestrator = Orchestrator::new(scenario([5, 5], [2, 2])).unwrap();

    orchestrator.tick().unwrap();
    for id in ["(1,2)", "(3,2)", "(2,1)", "(2,3)"] {
        assert!(infected(&orchestrator, id) > 0.0, "{} should be infected", id);
    }
    for id in ["(1,1)", "(0,2)", "(0,0)", "(4,4)"] {
        assert_eq!(infected(&orchestrator, id), 0.0, "{} should still be healthy", id);
    }

    orchestrator.tick().unwrap();
    assert!(infected(&orchestrator, "(1,1)") > 0.0);
    assert!(infected(&orchestrator, "(0,2)") > 0.0);
    assert_eq!(infected(&orchestrator, "(0,0)"), 0.0);
}

#[test]
fn test_wrapped_grid_reaches_across_edges() {
    let mut config = scenario([4, 4], [0, 0]);
    config.wrapped = true;
    let mut orchestrator = Orchestrator::new(config).unwrap();

    assert!(orchestrator.neighbors_of_cell("(0,0)").unwrap().contains_key("(3,0)"));
    orchestrator.tick().unwrap();
    assert!(infected(&orchestrator, "(3,0)") > 0.0);
    assert!(infected(&orchestrator, "(0,3)") > 0.0);
}

#[test]
fn test_clock_advances_by_output_delay() {
    let mut orchestrator = Orchestrator::new(scenario([2, 2], [0, 0])).unwrap();
    let results = orchestrator.run(5).unwrap();

    let times: Vec<usize> = results.iter().map(|r| r.time).collect();
    assert_eq!(times, vec![0, 1, 2, 3, 4]);
    assert_eq!(orchestrator.current_time(), 5);
}

#[test]
fn test_population_is_constant() {
    let mut orchestrator = Orchestrator::new(scenario([4, 4], [1, 2])).unwrap();
    let before = orchestrator.totals();
    let results = orchestrator.run(10).unwrap();

    for result in &results {
        assert_eq!(result.totals.population, before.population);
        let sum = result.totals.susceptible
            + result.totals.infected
            + result.totals.recovered
            + result.totals.deceased;
        assert!((sum - 1.0).abs() < 1e-9, "ratios sum to {}", sum);
    }
    assert!(orchestrator.totals().deceased >= before.deceased);
}

#[test]
fn test_runs_are_reproducible() {
    let mut config = scenario([4, 4], [2, 1]);
    config.default_config.rate_distribution = RateDistribution::Uniform {
        lower: 0.5,
        upper: 1.5,
    };

    let mut a = Orchestrator::new(config.clone()).unwrap();
    let mut b = Orchestrator::new(config).unwrap();
    assert_eq!(a.run(8).unwrap(), b.run(8).unwrap());
    for id in a.cell_ids() {
        assert_eq!(a.state_of(id).unwrap(), b.state_of(id).unwrap());
    }
}

#[test]
fn test_cell_overrides_apply() {
    let mut config = scenario([2, 2], [0, 0]);
    config.cells.push(CellOverride {
        position: [1, 1],
        state: Some(CellState::new(500, vec![0.9], vec![0.1], vec![0.0], vec![0.0])),
        config: Some(CellConfig {
            recovery: vec![1.0],
            ..CellConfig::default()
        }),
    });
    let mut orchestrator = Orchestrator::new(config).unwrap();
    assert_eq!(orchestrator.state_of("(1,1)").unwrap().population, 500);

    orchestrator.tick().unwrap();
    // Everyone infected before the step recovers during it
    assert!(orchestrator.state_of("(1,1)").unwrap().recovered[0] > 0.05);
}

#[test]
fn test_tick_reports_changes() {
    let mut orchestrator = Orchestrator::new(scenario([5, 5], [2, 2])).unwrap();
    let result = orchestrator.tick().unwrap();
    // The outbreak cell and its four neighbors
    assert_eq!(result.changed_cells, 5);
    assert_eq!(result.phase_changes, 0);
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_empty_grid_rejected() {
    let err = Orchestrator::new(scenario([0, 3], [0, 0])).unwrap_err();
    assert!(matches!(err, SimulationError::InvalidConfig(_)));
}

#[test]
fn test_override_outside_grid_rejected() {
    let err = Orchestrator::new(scenario([2, 2], [5, 5])).unwrap_err();
    assert!(matches!(err, SimulationError::InvalidConfig(_)));
}

#[test]
fn test_segment_count_mismatch_rejected() {
    let mut config = scenario([2, 2], [0, 0]);
    config.cells.push(CellOverride {
        position: [1, 0],
        state: None,
        config: Some(CellConfig {
            susceptibility: vec![1.0, 1.0],
            virulence: vec![0.6, 0.6],
            recovery: vec![0.4, 0.4],
            mortality: vec![0.03, 0.03],
            mask_use: vec![1.0, 1.0],
            ..CellConfig::default()
        }),
    });
    let err = Orchestrator::new(config).unwrap_err();
    assert!(matches!(err, SimulationError::InvalidConfig(_)));
}

#[test]
fn test_invalid_initial_state_reports_cell() {
    let mut config = scenario([2, 2], [0, 0]);
    config.cells.push(CellOverride {
        position: [0, 1],
        state: Some(CellState::new(100, vec![1.0], vec![], vec![0.0], vec![0.0])),
        config: None,
    });
    match Orchestrator::new(config).unwrap_err() {
        SimulationError::CellConfig { cell, .. } => assert_eq!(cell, "(0,1)"),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_unknown_cell_lookup() {
    let orchestrator = Orchestrator::new(scenario([2, 2], [0, 0])).unwrap();
    assert_eq!(
        orchestrator.state_of("(9,9)"),
        Err(SimulationError::CellNotFound("(9,9)".to_string()))
    );
}

#[test]
fn test_scenario_from_json() {
    let json = r#"{
        "shape": [2, 3],
        "wrapped": true,
        "neighborhood": "moore",
        "default_vicinity": {"connection": [1.0], "movement": [0.5]},
        "default_state": {
            "population": 100,
            "susceptible": [1.0], "infected": [0.0],
            "recovered": [0.0], "deceased": [0.0]
        },
        "default_config": {
            "susceptibility": [1.0], "virulence": [0.6],
            "recovery": [0.4], "mortality": [0.03],
            "infected_capacity": 0.1, "over_capacity_modifier": 1.5,
            "mask_use": [1.0], "mask_susceptibility_reduction": 0.5,
            "mask_virulence_reduction": 0.5, "mask_adoption": 0.5,
            "precision": 100,
            "lockdown_type": 1,
            "lockdown_rates": [[1.0], [0.4]],
            "phase_durations": [2, 2],
            "disobedience": [0.1]
        },
        "rng_seed": 3
    }"#;

    let scenario = ScenarioConfig::from_json(json).unwrap();
    assert_eq!(scenario.neighborhood, Neighborhood::Moore);

    let mut orchestrator = Orchestrator::new(scenario).unwrap();
    orchestrator.run(3).unwrap();
    // Clock 2 falls in the second scheduled phase
    assert_eq!(orchestrator.state_of("(0,0)").unwrap().phase, 1);
}

#[test]
fn test_scenario_with_bad_cell_config_rejected() {
    let json = r#"{
        "shape": [1, 1],
        "default_vicinity": {"connection": [1.0], "movement": [1.0]},
        "default_state": {
            "population": 1,
            "susceptible": [1.0], "infected": [0.0],
            "recovered": [0.0], "deceased": [0.0]
        },
        "default_config": {
            "susceptibility": [1.0], "virulence": [0.6],
            "recovery": [0.4], "mortality": [0.03],
            "infected_capacity": 0.1, "over_capacity_modifier": 1.5,
            "mask_use": [1.0], "mask_susceptibility_reduction": 0.5,
            "mask_virulence_reduction": 0.5, "mask_adoption": 0.5,
            "precision": 100,
            "rand_type": 1,
            "rand_mean": 1.0
        }
    }"#;

    let err = ScenarioConfig::from_json(json).unwrap_err();
    assert!(err.to_string().contains("rand_stddev"), "unexpected error: {}", err);
}

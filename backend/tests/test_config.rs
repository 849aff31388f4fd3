//! Tests for cell configuration loading
//!
//! Selector codes gate which fields are required. Unknown codes fall back to
//! the "no effect" variant; missing required fields are load errors.

use sird_cell_core_rs::{CellConfig, ConfigError, LockdownConfig, RateDistribution};

fn base_fields() -> serde_json::Value {
    serde_json::json!({
        "susceptibility": [1.0, 0.8],
        "virulence": [0.6, 0.5],
        "recovery": [0.4, 0.3],
        "mortality": [0.01, 0.05],
        "infected_capacity": 0.1,
        "over_capacity_modifier": 1.5,
        "mask_use": [1.0, 0.9],
        "mask_susceptibility_reduction": 0.5,
        "mask_virulence_reduction": 0.4,
        "mask_adoption": 0.5,
        "precision": 100
    })
}

fn with(extra: serde_json::Value) -> serde_json::Value {
    let mut value = base_fields();
    let object = value.as_object_mut().unwrap();
    for (key, field) in extra.as_object().unwrap() {
        object.insert(key.clone(), field.clone());
    }
    value
}

fn parse(value: serde_json::Value) -> Result<CellConfig, serde_json::Error> {
    serde_json::from_value(value)
}

#[test]
fn test_absent_codes_default_to_no_effect() {
    let config = parse(base_fields()).unwrap();
    assert_eq!(config.lockdown, LockdownConfig::None);
    assert_eq!(config.rate_distribution, RateDistribution::Static);
    assert_eq!(config.n_segments(), 2);
    assert_eq!(config.precision, 100.0);
}

#[test]
fn test_unknown_codes_fall_back() {
    let config = parse(with(serde_json::json!({
        "lockdown_type": 9,
        "rand_type": 42
    })))
    .unwrap();
    assert_eq!(config.lockdown, LockdownConfig::None);
    assert_eq!(config.rate_distribution, RateDistribution::Static);
}

#[test]
fn test_scheduled_lockdown_parsed() {
    let config = parse(with(serde_json::json!({
        "lockdown_type": 1,
        "lockdown_rates": [[1.0, 1.0], [0.3, 0.5]],
        "phase_durations": [2, 3],
        "disobedience": [0.1, 0.2]
    })))
    .unwrap();
    assert_eq!(
        config.lockdown,
        LockdownConfig::ScheduledPhase {
            lockdown_rates: vec![vec![1.0, 1.0], vec![0.3, 0.5]],
            phase_durations: vec![2, 3],
            disobedience: vec![0.1, 0.2],
        }
    );
}

#[test]
fn test_reaction_continuous_requires_adoption() {
    let err = parse(with(serde_json::json!({
        "lockdown_type": 2,
        "lockdown_rates": [[1.0, 1.0]],
        "disobedience": [0.0, 0.0]
    })))
    .unwrap_err();
    assert!(
        err.to_string().contains("lockdown_adoption"),
        "unexpected error: {}",
        err
    );
}

#[test]
fn test_reaction_phase_parsed() {
    let config = parse(with(serde_json::json!({
        "lockdown_type": 3,
        "lockdown_rates": [[1.0, 1.0], [0.6, 0.6], [0.2, 0.2]],
        "phase_thresholds": [0.0, 0.1, 0.3],
        "threshold_buffers": [0.0, 0.02, 0.02],
        "disobedience": [0.0, 0.0]
    })))
    .unwrap();
    assert_eq!(config.lockdown.code(), 3);
}

#[test]
fn test_reactive_lockdown_without_rates_is_fatal() {
    let err = parse(with(serde_json::json!({
        "lockdown_type": 3,
        "phase_thresholds": [0.0, 0.1],
        "threshold_buffers": [0.0, 0.02],
        "disobedience": [0.0, 0.0]
    })))
    .unwrap_err();
    assert!(err.to_string().contains("lockdown_rates"), "unexpected error: {}", err);
}

#[test]
fn test_distribution_fields_required_per_code() {
    let normal = parse(with(serde_json::json!({
        "rand_type": 1,
        "rand_mean": 1.0,
        "rand_stddev": 0.5
    })))
    .unwrap();
    assert_eq!(
        normal.rate_distribution,
        RateDistribution::Normal {
            mean: 1.0,
            std_dev: 0.5
        }
    );

    let uniform_missing = parse(with(serde_json::json!({
        "rand_type": 2,
        "rand_lower": 0.5
    })));
    assert!(uniform_missing.unwrap_err().to_string().contains("rand_upper"));

    let exponential = parse(with(serde_json::json!({
        "rand_type": 3,
        "rand_avg_occurence_rate": 5.0
    })))
    .unwrap();
    assert_eq!(exponential.rate_distribution, RateDistribution::Exponential { rate: 5.0 });
}

#[test]
fn test_fields_of_unselected_variants_are_ignored() {
    // rand_type 0 ignores the normal parameters entirely
    let config = parse(with(serde_json::json!({
        "rand_type": 0,
        "rand_mean": 1.0,
        "rand_stddev": 0.5,
        "lockdown_type": 0,
        "phase_durations": [1]
    })))
    .unwrap();
    assert_eq!(config.rate_distribution, RateDistribution::Static);
    assert_eq!(config.lockdown, LockdownConfig::None);
}

#[test]
fn test_missing_base_field_is_error() {
    let mut value = base_fields();
    value.as_object_mut().unwrap().remove("virulence");
    assert!(parse(value).is_err());
}

#[test]
fn test_segment_mismatch_is_error() {
    let err = parse(with(serde_json::json!({ "mask_use": [1.0] }))).unwrap_err();
    assert!(err.to_string().contains("mask_use"), "unexpected error: {}", err);
}

#[test]
fn test_serialization_roundtrip_keeps_variant() {
    let config = CellConfig {
        lockdown: LockdownConfig::ReactionContinuous {
            lockdown_rates: vec![vec![0.8]],
            lockdown_adoption: 2.0,
            disobedience: vec![0.1],
        },
        rate_distribution: RateDistribution::Uniform {
            lower: 0.5,
            upper: 1.5,
        },
        ..CellConfig::default()
    };

    let json = serde_json::to_value(&config).unwrap();
    assert_eq!(json["lockdown_type"], 2);
    assert_eq!(json["rand_type"], 2);
    assert!(json.get("phase_durations").is_none());

    let restored: CellConfig = serde_json::from_value(json).unwrap();
    assert_eq!(restored, config);
}

#[test]
fn test_validate_reports_typed_error() {
    let config = CellConfig {
        lockdown: LockdownConfig::ReactionPhase {
            lockdown_rates: vec![vec![1.0]],
            phase_thresholds: vec![0.0, 0.1],
            threshold_buffers: vec![0.0, 0.0],
            disobedience: vec![0.0],
        },
        ..CellConfig::default()
    };
    assert_eq!(
        config.validate(),
        Err(ConfigError::MissingPhaseRates { phases: 2, rows: 1 })
    );
}

// Copyright 2025 AgentReplay (https://github.com/agentreplay)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Strategy configuration loaded from TOML documents

use ragtriage_core::{ConfigError, KeyedRecord, MetricRecord, ValidationConfig};
use ragtriage_evals::{
    evaluate_batch, Adjustment, AttributionStrategy, Attributor, BatchPolicy, StrategyConfig,
    WeightedConfig,
};

#[test]
fn test_legacy_pipeline_from_toml() {
    let config: StrategyConfig = toml::from_str(
        r#"
        strategy = "weighted"

        [[weighted.adjustments]]
        kind = "boost_context_on_low_entity_recall"
        below = 0.5
        factor = 1.5

        [[weighted.adjustments]]
        kind = "boost_generation_on_severe_failure"
        below = 0.4
        factor = 1.2
        "#,
    )
    .unwrap();

    assert_eq!(config.weighted, WeightedConfig::legacy());
    assert_eq!(config.validation, ValidationConfig::default());
    assert!(config.validate().is_ok());

    let attributor = config.build().unwrap();
    let dist = attributor
        .classify(&MetricRecord::new(0.9, 0.8, 0.8, 0.2, 0.2))
        .unwrap();
    assert!((dist.generation_prob - 0.96 / 1.93).abs() < 1e-9);
}

#[test]
fn test_threshold_rules_and_bounds_from_toml() {
    let config: StrategyConfig = toml::from_str(
        r#"
        strategy = "threshold"

        [threshold.retrieval]
        cutoff = 0.4
        triggered = 0.7
        otherwise = 0.1

        [validation]
        min_score = 0.0
        max_score = 100.0
        "#,
    )
    .unwrap();

    assert_eq!(config.strategy, AttributionStrategy::Threshold);
    assert_eq!(config.threshold.retrieval.cutoff, 0.4);
    // untouched rules keep their defaults
    assert_eq!(config.threshold.context.cutoff, 0.6);
    assert!(config.validation.enforce_range);

    let attributor = config.build().unwrap();
    let record = MetricRecord::new(0.9, 0.9, 0.9, 0.9, 0.9).with_noise_sensitivity(0.45);
    let result = attributor.attribute(&record).unwrap();
    assert_eq!(result.adjusted_weights.retrieval, 0.7);
}

#[test]
fn test_invalid_pipeline_rejected_at_build() {
    let config = StrategyConfig {
        weighted: WeightedConfig {
            adjustments: vec![Adjustment::BoostGenerationOnSevereFailure {
                below: 0.4,
                factor: -2.0,
            }],
        },
        ..Default::default()
    };

    match config.build() {
        Err(ConfigError::InvalidParameter { name, .. }) => {
            assert_eq!(name, "adjustments[0].factor");
        }
        Err(other) => panic!("unexpected error: {:?}", other),
        Ok(_) => panic!("expected invalid configuration"),
    }
}

#[test]
fn test_unknown_strategy_rejected() {
    let result: Result<StrategyConfig, _> = toml::from_str(r#"strategy = "bayesian""#);
    assert!(result.is_err());
}

#[test]
fn test_relaxed_bounds_flow_into_batch() {
    let mut config = StrategyConfig::default();
    config.validation = ValidationConfig::unrestricted();
    let attributor = config.build().unwrap();

    let records = vec![
        KeyedRecord::new("in-range", MetricRecord::new(0.5, 0.6, 0.8, 0.5, 0.6)),
        KeyedRecord::new("drifted", MetricRecord::new(1.2, 0.6, 0.8, 0.5, 0.6)),
    ];
    let report = evaluate_batch(attributor.as_ref(), &records, &BatchPolicy::default()).unwrap();
    assert_eq!(report.summary.failed, 0);

    let strict = StrategyConfig::default().build().unwrap();
    let report = evaluate_batch(strict.as_ref(), &records, &BatchPolicy::default()).unwrap();
    assert_eq!(report.summary.failed, 1);
    assert_eq!(report.failures().next().unwrap().key, "drifted");
}

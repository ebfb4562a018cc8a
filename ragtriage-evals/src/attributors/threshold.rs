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

//! Discrete threshold attribution
//!
//! Coarse alternative to the weighted policy. Each stage gets one of two
//! constant weights depending on a single cutoff rule:
//!
//! - retrieval: high weight when `noise_sensitivity >= cutoff`
//! - generation: high weight when `answer_relevancy < cutoff` or `faithfulness < cutoff`
//! - context: high weight when `context_entities_recall < cutoff`
//!
//! All weights are strictly positive, so normalization cannot divide by zero.

use super::AdjustmentKind;
use crate::{Attribution, Attributor, AttributorMetadata};
use ragtriage_core::{
    AttributionError, ConfigError, MetricField, MetricRecord, ValidationConfig, WeightTriple,
};
use serde::{Deserialize, Serialize};

/// Cutoff plus the weight assigned when the rule fires or not
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdRule {
    pub cutoff: f64,
    pub triggered: f64,
    pub otherwise: f64,
}

impl ThresholdRule {
    pub fn new(cutoff: f64, triggered: f64, otherwise: f64) -> Self {
        Self {
            cutoff,
            triggered,
            otherwise,
        }
    }

    fn weight(&self, fired: bool) -> f64 {
        if fired {
            self.triggered
        } else {
            self.otherwise
        }
    }

    fn validate(&self, stage: &str) -> Result<(), ConfigError> {
        if !self.cutoff.is_finite() {
            return Err(ConfigError::invalid(
                format!("{}.cutoff", stage),
                "must be finite",
            ));
        }
        for (name, weight) in [("triggered", self.triggered), ("otherwise", self.otherwise)] {
            if !weight.is_finite() || weight <= 0.0 {
                return Err(ConfigError::invalid(
                    format!("{}.{}", stage, name),
                    "must be a finite positive weight",
                ));
            }
        }
        Ok(())
    }
}

/// Rules for [`ThresholdAttribution`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    pub retrieval: ThresholdRule,
    pub generation: ThresholdRule,
    pub context: ThresholdRule,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            retrieval: ThresholdRule::new(0.5, 0.6, 0.2),
            generation: ThresholdRule::new(0.6, 0.5, 0.3),
            context: ThresholdRule::new(0.6, 0.5, 0.4),
        }
    }
}

impl ThresholdConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.retrieval.validate("retrieval")?;
        self.generation.validate("generation")?;
        self.context.validate("context")?;
        Ok(())
    }

    /// Weights used when no rule fires
    pub fn baseline(&self) -> WeightTriple {
        WeightTriple::new(
            self.retrieval.otherwise,
            self.context.otherwise,
            self.generation.otherwise,
        )
    }
}

/// Discrete threshold attribution
pub struct ThresholdAttribution {
    config: ThresholdConfig,
    validation: ValidationConfig,
}

impl ThresholdAttribution {
    pub fn new() -> Self {
        Self {
            config: ThresholdConfig::default(),
            validation: ValidationConfig::default(),
        }
    }

    pub fn with_config(config: ThresholdConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            validation: ValidationConfig::default(),
        })
    }

    pub fn with_validation(mut self, validation: ValidationConfig) -> Self {
        self.validation = validation;
        self
    }

    pub fn config(&self) -> &ThresholdConfig {
        &self.config
    }
}

impl Default for ThresholdAttribution {
    fn default() -> Self {
        Self::new()
    }
}

impl Attributor for ThresholdAttribution {
    fn id(&self) -> &str {
        "threshold_v1"
    }

    fn metadata(&self) -> AttributorMetadata {
        AttributorMetadata {
            name: "Threshold Attribution".to_string(),
            version: "1.0.0".to_string(),
            description: "Discrete per-stage weights chosen by cutoff rules on noise sensitivity, answer quality and entity recall, normalized to a distribution.".to_string(),
            required_fields: vec![
                MetricField::NoiseSensitivity,
                MetricField::AnswerRelevancy,
                MetricField::Faithfulness,
                MetricField::ContextEntitiesRecall,
            ],
            tags: vec![
                "threshold".to_string(),
                "discrete".to_string(),
                "rag".to_string(),
            ],
        }
    }

    fn attribute(&self, record: &MetricRecord) -> Result<Attribution, AttributionError> {
        record.validate(&self.validation)?;
        let noise = record.require(MetricField::NoiseSensitivity)?;

        let rules = &self.config;
        let noisy = noise >= rules.retrieval.cutoff;
        let weak_answer = record.answer_relevancy < rules.generation.cutoff
            || record.faithfulness < rules.generation.cutoff;
        let low_entities = record.context_entities_recall < rules.context.cutoff;

        let mut applied = Vec::new();
        if noisy {
            applied.push(AdjustmentKind::HighNoiseSensitivity);
        }
        if weak_answer {
            applied.push(AdjustmentKind::LowAnswerQuality);
        }
        if low_entities {
            applied.push(AdjustmentKind::LowEntityRecall);
        }

        let weights = WeightTriple::new(
            rules.retrieval.weight(noisy),
            rules.context.weight(low_entities),
            rules.generation.weight(weak_answer),
        );
        let distribution = weights.normalize()?;

        Ok(Attribution {
            strategy: self.id().to_string(),
            base_weights: rules.baseline(),
            adjusted_weights: weights,
            applied,
            distribution,
        })
    }
}

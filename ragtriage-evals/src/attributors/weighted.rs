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

//! Continuous weighted attribution
//!
//! Three base weights are derived from the metric record:
//!
//! - retrieval: `context_entities_recall`
//! - context: `(1 - context_entities_recall) * (context_recall + context_precision) / 2`
//! - generation: `1 - (answer_relevancy + faithfulness) / 2`
//!
//! An ordered pipeline of adjustment steps then rewrites the weights in
//! place. Order is part of the contract: later steps compare weights that
//! earlier steps have already scaled, so reordering the pipeline changes
//! results. Finally the weights are normalized to a distribution.

use super::AdjustmentKind;
use crate::{Attribution, Attributor, AttributorMetadata};
use ragtriage_core::{
    AttributionError, ConfigError, MetricField, MetricRecord, ValidationConfig, ValidationError,
    WeightTriple,
};
use serde::{Deserialize, Serialize};

/// One step of the weighted adjustment pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Adjustment {
    /// Entity recall failing badly means retrieval surfaced the wrong context:
    /// `context *= factor` when `context_entities_recall < below`
    BoostContextOnLowEntityRecall { below: f64, factor: f64 },

    /// Severe answer-quality failure dominates:
    /// `generation *= factor` when `min(answer_relevancy, faithfulness) < below`
    BoostGenerationOnSevereFailure { below: f64, factor: f64 },

    /// `retrieval *= factor` when `generation > retrieval * ratio`
    SuppressRetrievalWhenGenerationDominates { ratio: f64, factor: f64 },

    /// Both other stages look healthy, so the fault concentrates on context:
    /// `context *= factor` when `retrieval < below` and `generation < below`
    BoostContextWhenOthersHealthy { below: f64, factor: f64 },
}

impl Adjustment {
    pub fn kind(&self) -> AdjustmentKind {
        match self {
            Adjustment::BoostContextOnLowEntityRecall { .. } => {
                AdjustmentKind::BoostContextOnLowEntityRecall
            }
            Adjustment::BoostGenerationOnSevereFailure { .. } => {
                AdjustmentKind::BoostGenerationOnSevereFailure
            }
            Adjustment::SuppressRetrievalWhenGenerationDominates { .. } => {
                AdjustmentKind::SuppressRetrievalWhenGenerationDominates
            }
            Adjustment::BoostContextWhenOthersHealthy { .. } => {
                AdjustmentKind::BoostContextWhenOthersHealthy
            }
        }
    }

    /// Apply the step to `weights`; returns whether it fired
    pub fn apply(&self, record: &MetricRecord, weights: &mut WeightTriple) -> bool {
        match *self {
            Adjustment::BoostContextOnLowEntityRecall { below, factor } => {
                if record.context_entities_recall < below {
                    weights.context *= factor;
                    return true;
                }
            }
            Adjustment::BoostGenerationOnSevereFailure { below, factor } => {
                if record.answer_relevancy.min(record.faithfulness) < below {
                    weights.generation *= factor;
                    return true;
                }
            }
            Adjustment::SuppressRetrievalWhenGenerationDominates { ratio, factor } => {
                if weights.generation > weights.retrieval * ratio {
                    weights.retrieval *= factor;
                    return true;
                }
            }
            Adjustment::BoostContextWhenOthersHealthy { below, factor } => {
                if weights.retrieval < below && weights.generation < below {
                    weights.context *= factor;
                    return true;
                }
            }
        }
        false
    }

    fn validate(&self, index: usize) -> Result<(), ConfigError> {
        let name = |param: &str| format!("adjustments[{}].{}", index, param);
        let (threshold_name, threshold, factor) = match *self {
            Adjustment::BoostContextOnLowEntityRecall { below, factor }
            | Adjustment::BoostGenerationOnSevereFailure { below, factor }
            | Adjustment::BoostContextWhenOthersHealthy { below, factor } => {
                ("below", below, factor)
            }
            Adjustment::SuppressRetrievalWhenGenerationDominates { ratio, factor } => {
                if ratio <= 0.0 {
                    return Err(ConfigError::invalid(name("ratio"), "must be positive"));
                }
                ("ratio", ratio, factor)
            }
        };

        if !threshold.is_finite() {
            return Err(ConfigError::invalid(name(threshold_name), "must be finite"));
        }
        if !factor.is_finite() || factor <= 0.0 {
            return Err(ConfigError::invalid(
                name("factor"),
                "must be a finite positive multiplier",
            ));
        }
        Ok(())
    }
}

/// Ordered adjustment pipeline for [`WeightedAttribution`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightedConfig {
    pub adjustments: Vec<Adjustment>,
}

impl Default for WeightedConfig {
    fn default() -> Self {
        Self::canonical()
    }
}

impl WeightedConfig {
    /// The four-step pipeline: context boost, generation boost, retrieval
    /// suppression, healthy-others context boost
    pub fn canonical() -> Self {
        Self {
            adjustments: vec![
                Adjustment::BoostContextOnLowEntityRecall {
                    below: 0.5,
                    factor: 1.5,
                },
                Adjustment::BoostGenerationOnSevereFailure {
                    below: 0.4,
                    factor: 2.0,
                },
                Adjustment::SuppressRetrievalWhenGenerationDominates {
                    ratio: 1.5,
                    factor: 0.6,
                },
                Adjustment::BoostContextWhenOthersHealthy {
                    below: 0.1,
                    factor: 2.0,
                },
            ],
        }
    }

    /// Earlier prototype: milder generation boost, no suppression and no
    /// healthy-others boost
    pub fn legacy() -> Self {
        Self {
            adjustments: vec![
                Adjustment::BoostContextOnLowEntityRecall {
                    below: 0.5,
                    factor: 1.5,
                },
                Adjustment::BoostGenerationOnSevereFailure {
                    below: 0.4,
                    factor: 1.2,
                },
            ],
        }
    }

    /// No adjustments: plain normalized base weights
    pub fn unadjusted() -> Self {
        Self {
            adjustments: Vec::new(),
        }
    }

    /// Copy of this pipeline with every step of `kind` removed
    pub fn without(&self, kind: AdjustmentKind) -> Self {
        Self {
            adjustments: self
                .adjustments
                .iter()
                .filter(|a| a.kind() != kind)
                .cloned()
                .collect(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (i, adjustment) in self.adjustments.iter().enumerate() {
            adjustment.validate(i)?;
        }
        Ok(())
    }
}

/// Base weights before any adjustment; context recall and precision must be present
pub fn base_weights(record: &MetricRecord) -> Result<WeightTriple, ValidationError> {
    let recall = record.require(MetricField::ContextRecall)?;
    let precision = record.require(MetricField::ContextPrecision)?;
    let entities = record.context_entities_recall;
    Ok(WeightTriple {
        retrieval: entities,
        context: (1.0 - entities) * (recall + precision) / 2.0,
        generation: 1.0 - (record.answer_relevancy + record.faithfulness) / 2.0,
    })
}

/// Continuous weighted attribution
pub struct WeightedAttribution {
    config: WeightedConfig,
    validation: ValidationConfig,
}

impl WeightedAttribution {
    pub fn new() -> Self {
        Self {
            config: WeightedConfig::canonical(),
            validation: ValidationConfig::default(),
        }
    }

    pub fn with_config(config: WeightedConfig) -> Result<Self, ConfigError> {
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

    pub fn config(&self) -> &WeightedConfig {
        &self.config
    }
}

impl Default for WeightedAttribution {
    fn default() -> Self {
        Self::new()
    }
}

impl Attributor for WeightedAttribution {
    fn id(&self) -> &str {
        "weighted_v1"
    }

    fn metadata(&self) -> AttributorMetadata {
        AttributorMetadata {
            name: "Weighted Attribution".to_string(),
            version: "1.0.0".to_string(),
            description: "Continuous weights from entity recall, context recall/precision and answer quality, refined by an ordered pipeline of boosts and normalized to a distribution.".to_string(),
            required_fields: vec![
                MetricField::ContextRecall,
                MetricField::ContextPrecision,
                MetricField::ContextEntitiesRecall,
                MetricField::AnswerRelevancy,
                MetricField::Faithfulness,
            ],
            tags: vec![
                "weighted".to_string(),
                "continuous".to_string(),
                "rag".to_string(),
            ],
        }
    }

    fn attribute(&self, record: &MetricRecord) -> Result<Attribution, AttributionError> {
        record.validate(&self.validation)?;

        let base = base_weights(record)?;
        let mut weights = base;
        let mut applied = Vec::new();

        for adjustment in &self.config.adjustments {
            if adjustment.apply(record, &mut weights) {
                applied.push(adjustment.kind());
            }
        }

        let distribution = weights.normalize()?;

        Ok(Attribution {
            strategy: self.id().to_string(),
            base_weights: base,
            adjusted_weights: weights,
            applied,
            distribution,
        })
    }
}

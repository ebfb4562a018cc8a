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

//! Failure stages and the probability distribution over them

use crate::error::AttributionError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pipeline stage a poor evaluation outcome can be attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureStage {
    Retrieval,
    Context,
    Generation,
}

impl FailureStage {
    /// Canonical stage order; also the tie-break order for `dominant()`
    pub const ALL: [FailureStage; 3] = [
        FailureStage::Retrieval,
        FailureStage::Context,
        FailureStage::Generation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FailureStage::Retrieval => "retrieval",
            FailureStage::Context => "context",
            FailureStage::Generation => "generation",
        }
    }

    /// Capitalized name used in human-readable reports
    pub fn label(&self) -> &'static str {
        match self {
            FailureStage::Retrieval => "Retrieval",
            FailureStage::Context => "Context",
            FailureStage::Generation => "Generation",
        }
    }

    /// Suggested remediation when this stage dominates the distribution
    pub fn default_action(&self) -> &'static str {
        match self {
            FailureStage::Retrieval => {
                "Tune the retriever: embeddings, chunking or top-k so the right entities are surfaced"
            }
            FailureStage::Context => {
                "Rerank or filter retrieved passages before they reach the prompt"
            }
            FailureStage::Generation => {
                "Tighten the prompt or model so answers stay grounded in the supplied context"
            }
        }
    }
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unnormalized per-stage weights
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightTriple {
    pub retrieval: f64,
    pub context: f64,
    pub generation: f64,
}

impl WeightTriple {
    pub fn new(retrieval: f64, context: f64, generation: f64) -> Self {
        Self {
            retrieval,
            context,
            generation,
        }
    }

    pub fn get(&self, stage: FailureStage) -> f64 {
        match stage {
            FailureStage::Retrieval => self.retrieval,
            FailureStage::Context => self.context,
            FailureStage::Generation => self.generation,
        }
    }

    pub fn total(&self) -> f64 {
        self.retrieval + self.context + self.generation
    }

    /// Divide each weight by the total.
    ///
    /// Fails with `DegenerateInput` when any weight is negative or not finite,
    /// or when the total is not strictly positive.
    pub fn normalize(&self) -> Result<FailureDistribution, AttributionError> {
        let total = self.total();
        let weights_ok = FailureStage::ALL.iter().all(|&s| {
            let w = self.get(s);
            w.is_finite() && w >= 0.0
        });

        if !weights_ok || !total.is_finite() || total <= 0.0 {
            return Err(AttributionError::DegenerateInput {
                retrieval: self.retrieval,
                context: self.context,
                generation: self.generation,
            });
        }

        Ok(FailureDistribution {
            retrieval_prob: self.retrieval / total,
            context_prob: self.context / total,
            generation_prob: self.generation / total,
        })
    }
}

/// Share of responsibility for a poor outcome per stage; sums to 1
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FailureDistribution {
    pub retrieval_prob: f64,
    pub context_prob: f64,
    pub generation_prob: f64,
}

impl FailureDistribution {
    pub fn get(&self, stage: FailureStage) -> f64 {
        match stage {
            FailureStage::Retrieval => self.retrieval_prob,
            FailureStage::Context => self.context_prob,
            FailureStage::Generation => self.generation_prob,
        }
    }

    pub fn sum(&self) -> f64 {
        self.retrieval_prob + self.context_prob + self.generation_prob
    }

    /// Stage carrying the largest share (earlier stage wins ties)
    pub fn dominant(&self) -> FailureStage {
        let mut best = FailureStage::Retrieval;
        for stage in FailureStage::ALL {
            if self.get(stage) > self.get(best) {
                best = stage;
            }
        }
        best
    }
}

impl fmt::Display for FailureDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Retrieval: {:.2}%, Context: {:.2}%, Generation: {:.2}%",
            self.retrieval_prob * 100.0,
            self.context_prob * 100.0,
            self.generation_prob * 100.0
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_sums_to_one() {
        let dist = WeightTriple::new(0.8, 0.11, 0.45).normalize().unwrap();
        assert!((dist.sum() - 1.0).abs() < 1e-9);
        assert!((dist.retrieval_prob - 0.8 / 1.36).abs() < 1e-12);
        assert_eq!(dist.dominant(), FailureStage::Retrieval);
    }

    #[test]
    fn test_zero_total_is_degenerate() {
        let err = WeightTriple::new(0.0, 0.0, 0.0).normalize().unwrap_err();
        assert!(matches!(err, AttributionError::DegenerateInput { .. }));
    }

    #[test]
    fn test_nan_weight_is_degenerate() {
        let err = WeightTriple::new(f64::NAN, 0.5, 0.5).normalize().unwrap_err();
        assert!(matches!(err, AttributionError::DegenerateInput { .. }));
    }

    #[test]
    fn test_negative_weight_is_degenerate() {
        assert!(WeightTriple::new(-0.1, 0.5, 0.5).normalize().is_err());
    }

    #[test]
    fn test_dominant_tie_prefers_earlier_stage() {
        let dist = WeightTriple::new(1.0, 2.0, 2.0).normalize().unwrap();
        assert_eq!(dist.dominant(), FailureStage::Context);
    }

    #[test]
    fn test_display_percentages() {
        let dist = FailureDistribution {
            retrieval_prob: 0.4,
            context_prob: 0.25,
            generation_prob: 0.35,
        };
        assert_eq!(
            dist.to_string(),
            "Retrieval: 40.00%, Context: 25.00%, Generation: 35.00%"
        );
    }

    #[test]
    fn test_stage_serialization() {
        let json = serde_json::to_string(&FailureStage::Generation).unwrap();
        assert_eq!(json, "\"generation\"");
    }
}

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

//! Built-in attribution policies

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod threshold;
pub mod weighted;

pub use threshold::{ThresholdAttribution, ThresholdConfig, ThresholdRule};
pub use weighted::{Adjustment, WeightedAttribution, WeightedConfig};

/// A rule that fired while computing an attribution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentKind {
    // Weighted pipeline steps
    BoostContextOnLowEntityRecall,
    BoostGenerationOnSevereFailure,
    SuppressRetrievalWhenGenerationDominates,
    BoostContextWhenOthersHealthy,

    // Threshold rules
    HighNoiseSensitivity,
    LowAnswerQuality,
    LowEntityRecall,
}

impl AdjustmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdjustmentKind::BoostContextOnLowEntityRecall => "boost_context_on_low_entity_recall",
            AdjustmentKind::BoostGenerationOnSevereFailure => "boost_generation_on_severe_failure",
            AdjustmentKind::SuppressRetrievalWhenGenerationDominates => {
                "suppress_retrieval_when_generation_dominates"
            }
            AdjustmentKind::BoostContextWhenOthersHealthy => "boost_context_when_others_healthy",
            AdjustmentKind::HighNoiseSensitivity => "high_noise_sensitivity",
            AdjustmentKind::LowAnswerQuality => "low_answer_quality",
            AdjustmentKind::LowEntityRecall => "low_entity_recall",
        }
    }
}

impl fmt::Display for AdjustmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

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

//! Strategy selection
//!
//! Callers pick an attribution policy explicitly, by name or from
//! configuration, and get back a boxed [`Attributor`].

use crate::{
    Attributor, AttributorMetadata, ThresholdAttribution, ThresholdConfig, WeightedAttribution,
    WeightedConfig,
};
use ragtriage_core::{ConfigError, ValidationConfig};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Built-in attribution policies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributionStrategy {
    #[default]
    Weighted,
    Threshold,
}

impl AttributionStrategy {
    pub const ALL: [AttributionStrategy; 2] =
        [AttributionStrategy::Weighted, AttributionStrategy::Threshold];

    pub fn as_str(&self) -> &'static str {
        match self {
            AttributionStrategy::Weighted => "weighted",
            AttributionStrategy::Threshold => "threshold",
        }
    }
}

impl fmt::Display for AttributionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttributionStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weighted" | "weighted_v1" => Ok(AttributionStrategy::Weighted),
            "threshold" | "threshold_v1" => Ok(AttributionStrategy::Threshold),
            other => Err(ConfigError::UnknownStrategy(other.to_string())),
        }
    }
}

/// Everything needed to build an attributor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub strategy: AttributionStrategy,
    pub weighted: WeightedConfig,
    pub threshold: ThresholdConfig,
    pub validation: ValidationConfig,
}

impl StrategyConfig {
    pub fn new(strategy: AttributionStrategy) -> Self {
        Self {
            strategy,
            ..Default::default()
        }
    }

    /// Validate every section, including the one not selected
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validation.validate_bounds()?;
        self.weighted.validate()?;
        self.threshold.validate()?;
        Ok(())
    }

    pub fn build(&self) -> Result<Box<dyn Attributor>, ConfigError> {
        self.validation.validate_bounds()?;
        let attributor: Box<dyn Attributor> = match self.strategy {
            AttributionStrategy::Weighted => Box::new(
                WeightedAttribution::with_config(self.weighted.clone())?
                    .with_validation(self.validation.clone()),
            ),
            AttributionStrategy::Threshold => Box::new(
                ThresholdAttribution::with_config(self.threshold.clone())?
                    .with_validation(self.validation.clone()),
            ),
        };
        Ok(attributor)
    }
}

/// Metadata of every built-in attributor, in `AttributionStrategy::ALL` order
pub fn list_strategies() -> Vec<(AttributionStrategy, AttributorMetadata)> {
    vec![
        (
            AttributionStrategy::Weighted,
            WeightedAttribution::new().metadata(),
        ),
        (
            AttributionStrategy::Threshold,
            ThresholdAttribution::new().metadata(),
        ),
    ]
}

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

//! Configuration for metric validation
//!
//! Evaluation libraries normally report scores in `[0, 1]`, but some
//! custom metrics drift outside that range. The bounds are configurable so
//! callers can relax them without giving up the finiteness check.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Default lower bound for a metric score
pub const DEFAULT_MIN_SCORE: f64 = 0.0;

/// Default upper bound for a metric score
pub const DEFAULT_MAX_SCORE: f64 = 1.0;

/// Bounds applied to every metric before attribution
///
/// - Strict (default): scores must lie in `[0, 1]`
/// - Unrestricted: any finite score is accepted
/// - Custom: caller-chosen bounds
///
/// NaN and infinite values are rejected in every mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Minimum accepted score. None = no lower bound
    pub min_score: Option<f64>,

    /// Maximum accepted score. None = no upper bound
    pub max_score: Option<f64>,

    /// Whether to enforce the bounds at all
    pub enforce_range: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_score: Some(DEFAULT_MIN_SCORE),
            max_score: Some(DEFAULT_MAX_SCORE),
            enforce_range: true,
        }
    }
}

impl ValidationConfig {
    /// Scores must lie in `[0, 1]`
    pub fn strict() -> Self {
        Self::default()
    }

    /// Accept any finite score
    pub fn unrestricted() -> Self {
        Self {
            min_score: None,
            max_score: None,
            enforce_range: false,
        }
    }

    /// Create a config with custom bounds
    pub fn custom(min: Option<f64>, max: Option<f64>) -> Self {
        Self {
            min_score: min,
            max_score: max,
            enforce_range: true,
        }
    }

    /// Effective lower bound used in error messages
    pub fn lower(&self) -> f64 {
        self.min_score.unwrap_or(f64::NEG_INFINITY)
    }

    /// Effective upper bound used in error messages
    pub fn upper(&self) -> f64 {
        self.max_score.unwrap_or(f64::INFINITY)
    }

    /// Whether `value` satisfies the configured bounds
    pub fn accepts(&self, value: f64) -> bool {
        if !self.enforce_range {
            return true;
        }
        self.min_score.map_or(true, |min| value >= min)
            && self.max_score.map_or(true, |max| value <= max)
    }

    /// Reject non-finite or inverted bounds
    pub fn validate_bounds(&self) -> Result<(), ConfigError> {
        for (name, bound) in [("min_score", self.min_score), ("max_score", self.max_score)] {
            if let Some(v) = bound {
                if !v.is_finite() {
                    return Err(ConfigError::invalid(name, "must be finite"));
                }
            }
        }
        if let (Some(min), Some(max)) = (self.min_score, self.max_score) {
            if min > max {
                return Err(ConfigError::InvertedBounds { min, max });
            }
        }
        Ok(())
    }
}

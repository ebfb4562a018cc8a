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

//! CLI configuration
//!
//! Loaded from an optional TOML file, then overridden by environment
//! variables. Command-line flags are applied last by `main`.

use anyhow::{Context, Result};
use ragtriage_evals::{AttributionStrategy, BatchPolicy, GradingStandard, StrategyConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

const ENV_STRATEGY: &str = "RAGTRIAGE_STRATEGY";
const ENV_FAIL_FAST: &str = "RAGTRIAGE_FAIL_FAST";
const ENV_MIN_SCORE: &str = "RAGTRIAGE_MIN_SCORE";
const ENV_MAX_SCORE: &str = "RAGTRIAGE_MAX_SCORE";
const ENV_ENFORCE_RANGE: &str = "RAGTRIAGE_ENFORCE_RANGE";

/// Full configuration of the `ragtriage` binary
///
/// ```toml
/// [attribution]
/// strategy = "weighted"
///
/// [attribution.validation]
/// min_score = 0.0
/// max_score = 1.0
///
/// [batch]
/// fail_fast = false
///
/// [grading.thresholds]
/// faithfulness = 0.8
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriageConfig {
    pub attribution: StrategyConfig,
    pub batch: BatchPolicy,
    pub grading: GradingStandard,
}

impl TriageConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Load configuration with priority: env > file > defaults
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let mut config = match config_file {
            Some(path) => {
                tracing::info!("Loading configuration from file: {:?}", path);
                Self::from_file(path)?
            }
            None => Self::default(),
        };

        config.merge_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Override fields whose environment variable is set
    ///
    /// Supported environment variables:
    /// - RAGTRIAGE_STRATEGY: `weighted` or `threshold`
    /// - RAGTRIAGE_FAIL_FAST: abort a batch on the first failing record
    /// - RAGTRIAGE_MIN_SCORE / RAGTRIAGE_MAX_SCORE: accepted score bounds
    /// - RAGTRIAGE_ENFORCE_RANGE: whether the bounds are checked at all
    pub fn merge_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_STRATEGY) {
            self.attribution.strategy = value
                .parse::<AttributionStrategy>()
                .with_context(|| format!("Invalid {}", ENV_STRATEGY))?;
        }

        if let Some(value) = lookup(ENV_FAIL_FAST) {
            self.batch.fail_fast = parse_env(ENV_FAIL_FAST, &value)?;
        }

        let validation = &mut self.attribution.validation;
        if let Some(value) = lookup(ENV_MIN_SCORE) {
            validation.min_score = Some(parse_env(ENV_MIN_SCORE, &value)?);
        }
        if let Some(value) = lookup(ENV_MAX_SCORE) {
            validation.max_score = Some(parse_env(ENV_MAX_SCORE, &value)?);
        }
        if let Some(value) = lookup(ENV_ENFORCE_RANGE) {
            validation.enforce_range = parse_env(ENV_ENFORCE_RANGE, &value)?;
        }

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.attribution
            .validate()
            .context("Invalid attribution configuration")?;
        self.grading
            .validate()
            .context("Invalid grading configuration")?;
        Ok(())
    }
}

fn parse_env<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("Invalid value for {}: {:?}", key, value))
}

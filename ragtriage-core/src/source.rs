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

//! Metric source capability
//!
//! Scores are computed by an external evaluation library. Whatever runs it
//! hands rows to the triage pipeline through this trait; the classifiers
//! only ever see `MetricRecord`.

use crate::error::SourceError;
use crate::record::MetricRow;

/// Supplies raw metric rows in input order
pub trait MetricSource {
    /// Human-readable name used in logs and parse errors
    fn name(&self) -> &str;

    /// Load every row. Row order is preserved into the batch report.
    fn load(&self) -> Result<Vec<MetricRow>, SourceError>;
}

/// In-memory source, mostly for tests and embedding
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    name: String,
    rows: Vec<MetricRow>,
}

impl StaticSource {
    pub fn new(name: impl Into<String>, rows: Vec<MetricRow>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }
}

impl MetricSource for StaticSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> Result<Vec<MetricRow>, SourceError> {
        Ok(self.rows.clone())
    }
}

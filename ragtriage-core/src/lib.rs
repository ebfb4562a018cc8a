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

//! Ragtriage Core
//!
//! Data model for attributing poor RAG evaluation outcomes to a pipeline
//! stage: metric records, failure distributions and the shared error types.

pub mod config;
pub mod distribution;
pub mod error;
pub mod record;
pub mod source;

pub use config::{ValidationConfig, DEFAULT_MAX_SCORE, DEFAULT_MIN_SCORE};
pub use distribution::{FailureDistribution, FailureStage, WeightTriple};
pub use error::{AttributionError, ConfigError, Result, SourceError, ValidationError};
pub use record::{KeyedRecord, MetricField, MetricRecord, MetricRow, RejectedCell};
pub use source::{MetricSource, StaticSource};

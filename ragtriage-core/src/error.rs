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

//! Error taxonomy shared by the triage crates

use crate::record::MetricField;
use thiserror::Error;

/// A metric value rejected before any weight computation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Missing required field: {field}")]
    MissingField { field: MetricField },

    #[error("Field {field} is not a number: {value:?}")]
    NotNumeric { field: MetricField, value: String },

    #[error("Field {field} is not a finite number: {value}")]
    NotFinite { field: MetricField, value: f64 },

    #[error("Field {field} = {value} is outside the accepted range [{min}, {max}]")]
    OutOfRange {
        field: MetricField,
        value: f64,
        min: f64,
        max: f64,
    },
}

impl ValidationError {
    /// The metric that caused the rejection
    pub fn field(&self) -> MetricField {
        match self {
            ValidationError::MissingField { field }
            | ValidationError::NotNumeric { field, .. }
            | ValidationError::NotFinite { field, .. }
            | ValidationError::OutOfRange { field, .. } => *field,
        }
    }
}

/// Errors raised while attributing a failure to a pipeline stage
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AttributionError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// All weights collapsed to zero (or a non-finite value) before normalization
    #[error(
        "Degenerate input: weights cannot be normalized (retrieval={retrieval}, context={context}, generation={generation})"
    )]
    DegenerateInput {
        retrieval: f64,
        context: f64,
        generation: f64,
    },
}

/// Invalid classifier or validation parameters
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("Invalid score bounds: min {min} is greater than max {max}")]
    InvertedBounds { min: f64, max: f64 },

    #[error("Unknown strategy: {0}")]
    UnknownStrategy(String),
}

impl ConfigError {
    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised while loading metric rows from an external source
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parse error in {source_name} at row {row}: {message}")]
    Parse {
        source_name: String,
        row: usize,
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, AttributionError>;

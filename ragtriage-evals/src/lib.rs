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

//! # Ragtriage Attribution Framework
//!
//! Rule-based classifiers that turn the evaluation metrics of one RAG answer
//! into a probability distribution over the pipeline stage most likely to
//! blame: retrieval, context or generation.
//!
//! ## Features
//!
//! - **Trait-based attributor system**: every policy implements [`Attributor`]
//! - **Built-in attributors**: continuous weighted attribution and discrete
//!   threshold attribution
//! - **Explainable**: each result records which adjustment steps fired
//! - **Batch evaluation**: order-preserving batches with per-record failure
//!   reporting
//! - **Grading**: pass/fail comparison of raw scores against a standard
//!
//! The attributors are pure: no I/O, no logging, no state between calls.
//! They can be shared across threads freely.
//!
//! ## Example
//!
//! ```rust
//! use ragtriage_core::{FailureStage, MetricRecord};
//! use ragtriage_evals::{Attributor, WeightedAttribution};
//!
//! let attributor = WeightedAttribution::new();
//! let record = MetricRecord::new(0.5, 0.6, 0.8, 0.5, 0.6);
//!
//! let dist = attributor.classify(&record).unwrap();
//! assert_eq!(dist.dominant(), FailureStage::Retrieval);
//! assert!((dist.sum() - 1.0).abs() < 1e-9);
//! ```

use ragtriage_core::{
    AttributionError, FailureDistribution, MetricField, MetricRecord, WeightTriple,
};
use serde::{Deserialize, Serialize};

pub mod attributors;
pub mod batch;
pub mod grading;
pub mod strategy;

pub use attributors::threshold::{ThresholdAttribution, ThresholdConfig, ThresholdRule};
pub use attributors::weighted::{Adjustment, WeightedAttribution, WeightedConfig};
pub use attributors::AdjustmentKind;
pub use batch::{
    classify_batch, evaluate_batch, evaluate_rows, BatchAbort, BatchPolicy, BatchReport,
    BatchSummary, Outcome, RecordOutcome,
};
pub use grading::{Grade, GradingStandard, MetricGrade, GRADED_FIELDS};
pub use strategy::{list_strategies, AttributionStrategy, StrategyConfig};

/// Core trait that all attribution policies implement
pub trait Attributor: Send + Sync {
    /// Unique identifier for this attributor (e.g., "weighted_v1")
    fn id(&self) -> &str;

    /// Metadata about this attributor (name, version, required inputs)
    fn metadata(&self) -> AttributorMetadata;

    /// Attribute one record, keeping the intermediate weights
    fn attribute(&self, record: &MetricRecord) -> Result<Attribution, AttributionError>;

    /// Attribute one record and return only the distribution
    fn classify(&self, record: &MetricRecord) -> Result<FailureDistribution, AttributionError> {
        self.attribute(record).map(|a| a.distribution)
    }
}

/// Full result of one attribution, including how the weights evolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribution {
    /// ID of the attributor that produced this result
    pub strategy: String,

    /// Weights before any adjustment step
    pub base_weights: WeightTriple,

    /// Weights after every adjustment step, prior to normalization
    pub adjusted_weights: WeightTriple,

    /// Adjustment steps that fired, in execution order
    #[serde(default)]
    pub applied: Vec<AdjustmentKind>,

    /// Normalized distribution
    pub distribution: FailureDistribution,
}

/// Metadata about an attributor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributorMetadata {
    /// Human-readable name
    pub name: String,

    /// Version string (e.g., "1.0.0")
    pub version: String,

    /// Description of what this attributor does
    pub description: String,

    /// Metrics that must be present in the record
    pub required_fields: Vec<MetricField>,

    /// Tags for categorization
    pub tags: Vec<String>,
}

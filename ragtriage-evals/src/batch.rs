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

//! Batch attribution
//!
//! Records are independent, so a batch is a plain ordered map over them.
//! Output order always matches input order and nothing is deduplicated.
//! Whether one bad record aborts the batch is the caller's choice via
//! [`BatchPolicy`]; otherwise every failure is kept in the report with its
//! key and reason.

use crate::{Attribution, Attributor};
use ragtriage_core::{
    AttributionError, FailureDistribution, FailureStage, KeyedRecord, MetricField, MetricRecord,
    MetricRow, ValidationError,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Classify each record, same length and order as the input
pub fn classify_batch(
    attributor: &dyn Attributor,
    records: &[MetricRecord],
) -> Vec<Result<FailureDistribution, AttributionError>> {
    records.iter().map(|r| attributor.classify(r)).collect()
}

/// How a batch reacts to a failing record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchPolicy {
    /// Abort on the first failing record instead of reporting it
    pub fail_fast: bool,
}

/// Result for one record of a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Attributed(Attribution),
    Failed {
        reason: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        field: Option<MetricField>,
    },
}

impl Outcome {
    fn failed(error: &AttributionError) -> Self {
        let field = match error {
            AttributionError::Validation(v) => Some(v.field()),
            AttributionError::DegenerateInput { .. } => None,
        };
        Outcome::Failed {
            reason: error.to_string(),
            field,
        }
    }

    pub fn distribution(&self) -> Option<&FailureDistribution> {
        match self {
            Outcome::Attributed(a) => Some(&a.distribution),
            Outcome::Failed { .. } => None,
        }
    }
}

/// One entry of a batch report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordOutcome {
    pub key: String,
    pub outcome: Outcome,
}

/// Aggregate view over a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub attributed: usize,
    pub failed: usize,
    /// Number of successful records whose dominant stage is each stage
    pub dominant_counts: BTreeMap<FailureStage, usize>,
    /// Mean distribution over successful records; None when none succeeded
    pub mean_distribution: Option<FailureDistribution>,
}

impl BatchSummary {
    pub fn from_outcomes(outcomes: &[RecordOutcome]) -> Self {
        let mut dominant_counts: BTreeMap<FailureStage, usize> =
            FailureStage::ALL.iter().map(|&s| (s, 0)).collect();
        let mut sums = [0.0f64; 3];
        let mut attributed = 0usize;

        for dist in outcomes.iter().filter_map(|o| o.outcome.distribution()) {
            attributed += 1;
            *dominant_counts.entry(dist.dominant()).or_insert(0) += 1;
            for (i, stage) in FailureStage::ALL.iter().enumerate() {
                sums[i] += dist.get(*stage);
            }
        }

        let mean_distribution = (attributed > 0).then(|| {
            let n = attributed as f64;
            FailureDistribution {
                retrieval_prob: sums[0] / n,
                context_prob: sums[1] / n,
                generation_prob: sums[2] / n,
            }
        });

        Self {
            total: outcomes.len(),
            attributed,
            failed: outcomes.len() - attributed,
            dominant_counts,
            mean_distribution,
        }
    }
}

/// Per-record outcomes in input order plus a summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub strategy: String,
    pub outcomes: Vec<RecordOutcome>,
    pub summary: BatchSummary,
}

impl BatchReport {
    pub fn failures(&self) -> impl Iterator<Item = &RecordOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.outcome, Outcome::Failed { .. }))
    }
}

/// A fail-fast batch stopped at this record
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Batch aborted at record {key}: {error}")]
pub struct BatchAbort {
    pub key: String,
    pub error: AttributionError,
}

/// Attribute keyed records
pub fn evaluate_batch(
    attributor: &dyn Attributor,
    records: &[KeyedRecord],
    policy: &BatchPolicy,
) -> Result<BatchReport, BatchAbort> {
    run(
        attributor,
        records.iter().map(|r| (r.key.clone(), Ok(r.record))),
        policy,
    )
}

/// Attribute raw rows. Rows missing a metric the attributor requires, or
/// carrying a non-numeric cell, are reported as failures.
/// Keys come from the row id or, failing that, the 1-based row number.
pub fn evaluate_rows(
    attributor: &dyn Attributor,
    rows: Vec<MetricRow>,
    policy: &BatchPolicy,
) -> Result<BatchReport, BatchAbort> {
    let required = attributor.metadata().required_fields;
    run(
        attributor,
        rows.into_iter().enumerate().map(|(i, row)| {
            let key = row.key(i + 1);
            (key, row.into_record(&required))
        }),
        policy,
    )
}

fn run<I>(
    attributor: &dyn Attributor,
    inputs: I,
    policy: &BatchPolicy,
) -> Result<BatchReport, BatchAbort>
where
    I: IntoIterator<Item = (String, Result<MetricRecord, ValidationError>)>,
{
    let mut outcomes = Vec::new();

    for (key, record) in inputs {
        let result = record
            .map_err(AttributionError::from)
            .and_then(|r| attributor.attribute(&r));

        let outcome = match result {
            Ok(attribution) => {
                debug!(
                    key = %key,
                    dominant = %attribution.distribution.dominant(),
                    "Attributed record: {}",
                    attribution.distribution
                );
                Outcome::Attributed(attribution)
            }
            Err(error) => {
                if policy.fail_fast {
                    warn!(key = %key, "Aborting batch: {}", error);
                    return Err(BatchAbort { key, error });
                }
                warn!(key = %key, "Record failed attribution: {}", error);
                Outcome::failed(&error)
            }
        };
        outcomes.push(RecordOutcome { key, outcome });
    }

    let summary = BatchSummary::from_outcomes(&outcomes);
    info!(
        strategy = attributor.id(),
        total = summary.total,
        failed = summary.failed,
        "Batch attribution complete"
    );

    Ok(BatchReport {
        strategy: attributor.id().to_string(),
        outcomes,
        summary,
    })
}

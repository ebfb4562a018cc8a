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

//! Pass/fail grading of raw metric scores
//!
//! Independent of attribution: each score is compared against a per-metric
//! threshold from a [`GradingStandard`], and reported next to the
//! distribution so operators see both views of a record.
//!
//! Only metrics where a higher score is better are graded. Noise sensitivity
//! is excluded.

use ragtriage_core::{ConfigError, MetricField, MetricRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Threshold used when a metric has no explicit entry
pub const DEFAULT_GRADE_THRESHOLD: f64 = 0.8;

/// Metrics that receive a grade, in column order
pub const GRADED_FIELDS: [MetricField; 5] = [
    MetricField::ContextRecall,
    MetricField::ContextPrecision,
    MetricField::ContextEntitiesRecall,
    MetricField::AnswerRelevancy,
    MetricField::Faithfulness,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    Good,
    #[serde(rename = "Not Good")]
    NotGood,
}

impl Grade {
    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::Good => "Good",
            Grade::NotGood => "Not Good",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Grade of one metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricGrade {
    pub field: MetricField,
    pub score: f64,
    pub threshold: f64,
    pub grade: Grade,
}

/// Per-metric pass thresholds, keyed by metric column name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradingStandard {
    pub thresholds: BTreeMap<String, f64>,
    pub default_threshold: f64,
}

impl Default for GradingStandard {
    fn default() -> Self {
        let thresholds = [
            (MetricField::Faithfulness, 0.8),
            (MetricField::ContextPrecision, 0.75),
            (MetricField::ContextRecall, 0.75),
        ]
        .into_iter()
        .map(|(field, threshold)| (field.as_str().to_string(), threshold))
        .collect();
        Self {
            thresholds,
            default_threshold: DEFAULT_GRADE_THRESHOLD,
        }
    }
}

impl GradingStandard {
    pub fn with_threshold(mut self, field: MetricField, threshold: f64) -> Self {
        self.thresholds.insert(field.as_str().to_string(), threshold);
        self
    }

    pub fn threshold(&self, field: MetricField) -> f64 {
        self.thresholds
            .get(field.as_str())
            .copied()
            .unwrap_or(self.default_threshold)
    }

    /// Reject unknown or ungraded metric names and non-finite thresholds
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.default_threshold.is_finite() {
            return Err(ConfigError::invalid("default_threshold", "must be finite"));
        }
        for (name, threshold) in &self.thresholds {
            match MetricField::from_name(name) {
                None => {
                    return Err(ConfigError::invalid(
                        format!("thresholds.{}", name),
                        "unknown metric",
                    ))
                }
                Some(field) if !GRADED_FIELDS.contains(&field) => {
                    return Err(ConfigError::invalid(
                        format!("thresholds.{}", name),
                        "metric is not graded",
                    ))
                }
                Some(_) => {}
            }
            if !threshold.is_finite() {
                return Err(ConfigError::invalid(
                    format!("thresholds.{}", name),
                    "must be finite",
                ));
            }
        }
        Ok(())
    }

    /// Grade every graded metric present in the record, in column order.
    /// A score equal to the threshold is Good.
    pub fn grade(&self, record: &MetricRecord) -> Vec<MetricGrade> {
        GRADED_FIELDS
            .into_iter()
            .filter_map(|field| {
                let score = record.get(field)?;
                let threshold = self.threshold(field);
                let grade = if score >= threshold {
                    Grade::Good
                } else {
                    Grade::NotGood
                };
                Some(MetricGrade {
                    field,
                    score,
                    threshold,
                    grade,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_standard() {
        let standard = GradingStandard::default();
        assert_eq!(standard.threshold(MetricField::Faithfulness), 0.8);
        assert_eq!(standard.threshold(MetricField::ContextRecall), 0.75);
        assert_eq!(
            standard.threshold(MetricField::AnswerRelevancy),
            DEFAULT_GRADE_THRESHOLD
        );
    }

    #[test]
    fn test_grade_record() {
        let record = MetricRecord::new(0.75, 0.7, 0.9, 0.81, 0.79);
        let grades = GradingStandard::default().grade(&record);

        assert_eq!(grades.len(), 5);
        let by_field: BTreeMap<MetricField, Grade> =
            grades.iter().map(|g| (g.field, g.grade)).collect();
        assert_eq!(by_field[&MetricField::ContextRecall], Grade::Good);
        assert_eq!(by_field[&MetricField::ContextPrecision], Grade::NotGood);
        assert_eq!(by_field[&MetricField::ContextEntitiesRecall], Grade::Good);
        assert_eq!(by_field[&MetricField::AnswerRelevancy], Grade::Good);
        assert_eq!(by_field[&MetricField::Faithfulness], Grade::NotGood);
    }

    #[test]
    fn test_noise_sensitivity_is_not_graded() {
        let standard = GradingStandard::default();
        for noise in [0.05, 0.95] {
            let record = MetricRecord::new(0.9, 0.9, 0.9, 0.9, 0.9).with_noise_sensitivity(noise);
            let grades = standard.grade(&record);
            assert_eq!(grades.len(), 5);
            assert!(grades
                .iter()
                .all(|g| g.field != MetricField::NoiseSensitivity));
        }
    }

    #[test]
    fn test_absent_context_scores_are_skipped() {
        let record = MetricRecord::from_threshold_inputs(0.7, 0.5, 0.9, 0.8);
        let fields: Vec<MetricField> = GradingStandard::default()
            .grade(&record)
            .iter()
            .map(|g| g.field)
            .collect();
        assert_eq!(
            fields,
            vec![
                MetricField::ContextEntitiesRecall,
                MetricField::AnswerRelevancy,
                MetricField::Faithfulness
            ]
        );
    }

    #[test]
    fn test_unknown_metric_rejected() {
        let mut standard = GradingStandard::default();
        assert!(standard.validate().is_ok());

        standard
            .thresholds
            .insert("answer_correctness".to_string(), 0.8);
        assert!(matches!(
            standard.validate(),
            Err(ConfigError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_noise_threshold_rejected() {
        let standard =
            GradingStandard::default().with_threshold(MetricField::NoiseSensitivity, 0.5);
        match standard.validate() {
            Err(ConfigError::InvalidParameter { name, .. }) => {
                assert_eq!(name, "thresholds.noise_sensitivity");
            }
            other => panic!("expected invalid parameter, got {:?}", other),
        }
    }

    #[test]
    fn test_grade_labels() {
        assert_eq!(serde_json::to_string(&Grade::NotGood).unwrap(), "\"Not Good\"");
        assert_eq!(Grade::Good.to_string(), "Good");
    }
}

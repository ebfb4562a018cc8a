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

//! Metric records for a single evaluated question/answer pair
//!
//! Scores are produced upstream by an evaluation library (RAGAS or similar)
//! and arrive here already computed. `MetricRow` is the raw, possibly
//! incomplete shape read from a file; `MetricRecord` is the checked shape the
//! classifiers consume.

use crate::config::ValidationConfig;
use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Names of the metric columns understood by the classifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricField {
    ContextRecall,
    ContextPrecision,
    ContextEntitiesRecall,
    AnswerRelevancy,
    Faithfulness,
    NoiseSensitivity,
}

impl MetricField {
    /// Every field, in column order
    pub const ALL: [MetricField; 6] = [
        MetricField::ContextRecall,
        MetricField::ContextPrecision,
        MetricField::ContextEntitiesRecall,
        MetricField::AnswerRelevancy,
        MetricField::Faithfulness,
        MetricField::NoiseSensitivity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricField::ContextRecall => "context_recall",
            MetricField::ContextPrecision => "context_precision",
            MetricField::ContextEntitiesRecall => "context_entities_recall",
            MetricField::AnswerRelevancy => "answer_relevancy",
            MetricField::Faithfulness => "faithfulness",
            MetricField::NoiseSensitivity => "noise_sensitivity",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == name)
    }
}

impl fmt::Display for MetricField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scores for one evaluated instance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    /// Only consumed by the weighted attributor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_recall: Option<f64>,
    /// Only consumed by the weighted attributor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_precision: Option<f64>,
    pub context_entities_recall: f64,
    pub answer_relevancy: f64,
    pub faithfulness: f64,
    /// Only consumed by the threshold attributor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub noise_sensitivity: Option<f64>,
}

impl MetricRecord {
    pub fn new(
        context_recall: f64,
        context_precision: f64,
        context_entities_recall: f64,
        answer_relevancy: f64,
        faithfulness: f64,
    ) -> Self {
        Self {
            context_recall: Some(context_recall),
            context_precision: Some(context_precision),
            context_entities_recall,
            answer_relevancy,
            faithfulness,
            noise_sensitivity: None,
        }
    }

    /// Record carrying only the inputs of the threshold attributor
    pub fn from_threshold_inputs(
        noise_sensitivity: f64,
        answer_relevancy: f64,
        faithfulness: f64,
        context_entities_recall: f64,
    ) -> Self {
        Self {
            context_recall: None,
            context_precision: None,
            context_entities_recall,
            answer_relevancy,
            faithfulness,
            noise_sensitivity: Some(noise_sensitivity),
        }
    }

    pub fn with_noise_sensitivity(mut self, value: f64) -> Self {
        self.noise_sensitivity = Some(value);
        self
    }

    /// Value of a field, None when an optional field is absent
    pub fn get(&self, field: MetricField) -> Option<f64> {
        match field {
            MetricField::ContextRecall => self.context_recall,
            MetricField::ContextPrecision => self.context_precision,
            MetricField::ContextEntitiesRecall => Some(self.context_entities_recall),
            MetricField::AnswerRelevancy => Some(self.answer_relevancy),
            MetricField::Faithfulness => Some(self.faithfulness),
            MetricField::NoiseSensitivity => self.noise_sensitivity,
        }
    }

    /// Value of a field that must be present
    pub fn require(&self, field: MetricField) -> Result<f64, ValidationError> {
        self.get(field).ok_or(ValidationError::MissingField { field })
    }

    /// Check every present field; the first offender in column order is reported
    pub fn validate(&self, config: &ValidationConfig) -> Result<(), ValidationError> {
        for field in MetricField::ALL {
            let Some(value) = self.get(field) else {
                continue;
            };
            if !value.is_finite() {
                return Err(ValidationError::NotFinite { field, value });
            }
            if !config.accepts(value) {
                return Err(ValidationError::OutOfRange {
                    field,
                    value,
                    min: config.lower(),
                    max: config.upper(),
                });
            }
        }
        Ok(())
    }
}

/// A cell that was present in the input but could not be read as a number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedCell {
    pub field: MetricField,
    pub value: String,
}

/// Raw metric row as read from a CSV or JSON file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricRow {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub context_recall: Option<f64>,
    #[serde(default)]
    pub context_precision: Option<f64>,
    #[serde(default)]
    pub context_entities_recall: Option<f64>,
    #[serde(default)]
    pub answer_relevancy: Option<f64>,
    #[serde(default)]
    pub faithfulness: Option<f64>,
    #[serde(default)]
    pub noise_sensitivity: Option<f64>,
    /// Non-numeric cells; the row fails when converted into a record
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rejected: Vec<RejectedCell>,
}

impl MetricRow {
    pub fn get(&self, field: MetricField) -> Option<f64> {
        match field {
            MetricField::ContextRecall => self.context_recall,
            MetricField::ContextPrecision => self.context_precision,
            MetricField::ContextEntitiesRecall => self.context_entities_recall,
            MetricField::AnswerRelevancy => self.answer_relevancy,
            MetricField::Faithfulness => self.faithfulness,
            MetricField::NoiseSensitivity => self.noise_sensitivity,
        }
    }

    pub fn set(&mut self, field: MetricField, value: Option<f64>) {
        let slot = match field {
            MetricField::ContextRecall => &mut self.context_recall,
            MetricField::ContextPrecision => &mut self.context_precision,
            MetricField::ContextEntitiesRecall => &mut self.context_entities_recall,
            MetricField::AnswerRelevancy => &mut self.answer_relevancy,
            MetricField::Faithfulness => &mut self.faithfulness,
            MetricField::NoiseSensitivity => &mut self.noise_sensitivity,
        };
        *slot = value;
    }

    /// Set a field from a text cell. Blank text is a missing value; text that
    /// does not parse as a number is kept as a rejected cell.
    pub fn set_text(&mut self, field: MetricField, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            self.set(field, None);
            return;
        }
        match text.parse::<f64>() {
            Ok(value) => self.set(field, Some(value)),
            Err(_) => {
                self.set(field, None);
                self.rejected.push(RejectedCell {
                    field,
                    value: text.to_string(),
                });
            }
        }
    }

    /// Convert into a record.
    ///
    /// Fields listed in `required` must be present. Entity recall, answer
    /// relevancy and faithfulness are read by every attributor and are always
    /// required. The first offender in column order is reported, whether it is
    /// a rejected cell or a missing value.
    pub fn into_record(self, required: &[MetricField]) -> Result<MetricRecord, ValidationError> {
        const ALWAYS: [MetricField; 3] = [
            MetricField::ContextEntitiesRecall,
            MetricField::AnswerRelevancy,
            MetricField::Faithfulness,
        ];

        for field in MetricField::ALL {
            if let Some(cell) = self.rejected.iter().find(|c| c.field == field) {
                return Err(ValidationError::NotNumeric {
                    field,
                    value: cell.value.clone(),
                });
            }
            let needed = required.contains(&field) || ALWAYS.contains(&field);
            if needed && self.get(field).is_none() {
                return Err(ValidationError::MissingField { field });
            }
        }

        let present =
            |value: Option<f64>, field| value.ok_or(ValidationError::MissingField { field });
        Ok(MetricRecord {
            context_recall: self.context_recall,
            context_precision: self.context_precision,
            context_entities_recall: present(
                self.context_entities_recall,
                MetricField::ContextEntitiesRecall,
            )?,
            answer_relevancy: present(self.answer_relevancy, MetricField::AnswerRelevancy)?,
            faithfulness: present(self.faithfulness, MetricField::Faithfulness)?,
            noise_sensitivity: self.noise_sensitivity,
        })
    }

    /// Key used in reports: the id column, or the 1-based row number
    pub fn key(&self, row_number: usize) -> String {
        match &self.id {
            Some(id) if !id.trim().is_empty() => id.trim().to_string(),
            _ => row_number.to_string(),
        }
    }
}

/// A record paired with the key that identifies it in a batch report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyedRecord {
    pub key: String,
    pub record: MetricRecord,
}

impl KeyedRecord {
    pub fn new(key: impl Into<String>, record: MetricRecord) -> Self {
        Self {
            key: key.into(),
            record,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MetricRecord {
        MetricRecord::new(0.5, 0.6, 0.8, 0.5, 0.6)
    }

    #[test]
    fn test_field_names_round_trip() {
        for field in MetricField::ALL {
            assert_eq!(MetricField::from_name(field.as_str()), Some(field));
        }
        assert_eq!(MetricField::from_name("answer_correctness"), None);
    }

    #[test]
    fn test_valid_record_passes() {
        assert!(sample().validate(&ValidationConfig::default()).is_ok());
    }

    #[test]
    fn test_nan_is_rejected_with_field() {
        let mut record = sample();
        record.faithfulness = f64::NAN;

        let err = record.validate(&ValidationConfig::default()).unwrap_err();
        assert_eq!(err.field(), MetricField::Faithfulness);
        assert!(matches!(err, ValidationError::NotFinite { .. }));
    }

    #[test]
    fn test_infinity_rejected_even_when_unrestricted() {
        let record = sample().with_noise_sensitivity(f64::INFINITY);
        let err = record.validate(&ValidationConfig::unrestricted()).unwrap_err();
        assert_eq!(err.field(), MetricField::NoiseSensitivity);
    }

    #[test]
    fn test_out_of_range_reports_bounds() {
        let mut record = sample();
        record.context_precision = Some(1.2);

        let err = record.validate(&ValidationConfig::default()).unwrap_err();
        assert_eq!(
            err,
            ValidationError::OutOfRange {
                field: MetricField::ContextPrecision,
                value: 1.2,
                min: 0.0,
                max: 1.0,
            }
        );
        assert!(err.to_string().contains("context_precision"));
    }

    #[test]
    fn test_first_offender_in_column_order() {
        let mut record = sample();
        record.context_recall = Some(-0.5);
        record.faithfulness = f64::NAN;

        let err = record.validate(&ValidationConfig::default()).unwrap_err();
        assert_eq!(err.field(), MetricField::ContextRecall);
    }

    const WEIGHTED_INPUTS: [MetricField; 5] = [
        MetricField::ContextRecall,
        MetricField::ContextPrecision,
        MetricField::ContextEntitiesRecall,
        MetricField::AnswerRelevancy,
        MetricField::Faithfulness,
    ];

    #[test]
    fn test_row_missing_field() {
        let row = MetricRow {
            context_recall: Some(0.5),
            context_precision: Some(0.6),
            context_entities_recall: Some(0.8),
            answer_relevancy: None,
            faithfulness: Some(0.6),
            ..Default::default()
        };

        assert_eq!(
            row.into_record(&WEIGHTED_INPUTS),
            Err(ValidationError::MissingField {
                field: MetricField::AnswerRelevancy
            })
        );
    }

    #[test]
    fn test_row_without_noise_sensitivity_converts() {
        let row = MetricRow {
            id: Some("q-1".to_string()),
            context_recall: Some(0.5),
            context_precision: Some(0.6),
            context_entities_recall: Some(0.8),
            answer_relevancy: Some(0.5),
            faithfulness: Some(0.6),
            ..Default::default()
        };

        assert_eq!(row.key(7), "q-1");
        let record = row.into_record(&WEIGHTED_INPUTS).unwrap();
        assert_eq!(record, sample());
        let missing = record.require(MetricField::NoiseSensitivity).unwrap_err();
        assert_eq!(missing.field(), MetricField::NoiseSensitivity);
    }

    #[test]
    fn test_unrequested_context_scores_may_be_absent() {
        let row = MetricRow {
            context_entities_recall: Some(0.8),
            answer_relevancy: Some(0.5),
            faithfulness: Some(0.6),
            noise_sensitivity: Some(0.7),
            ..Default::default()
        };

        assert_eq!(
            row.clone().into_record(&WEIGHTED_INPUTS).unwrap_err().field(),
            MetricField::ContextRecall
        );

        let record = row.into_record(&[MetricField::NoiseSensitivity]).unwrap();
        assert_eq!(record, MetricRecord::from_threshold_inputs(0.7, 0.5, 0.6, 0.8));
        assert_eq!(record.get(MetricField::ContextRecall), None);
    }

    #[test]
    fn test_set_text_parses_numbers_and_keeps_rejects() {
        let mut row = MetricRow::default();
        row.set_text(MetricField::ContextRecall, " 0.25 ");
        row.set_text(MetricField::ContextPrecision, "");
        row.set_text(MetricField::Faithfulness, "high");

        assert_eq!(row.context_recall, Some(0.25));
        assert_eq!(row.context_precision, None);
        assert_eq!(row.faithfulness, None);
        assert_eq!(
            row.rejected,
            vec![RejectedCell {
                field: MetricField::Faithfulness,
                value: "high".to_string(),
            }]
        );
    }

    #[test]
    fn test_rejected_cell_reported_before_later_missing_field() {
        let mut row = MetricRow {
            context_recall: Some(0.5),
            context_entities_recall: Some(0.8),
            ..Default::default()
        };
        row.set_text(MetricField::ContextPrecision, "n/a");

        let err = row.into_record(&WEIGHTED_INPUTS).unwrap_err();
        assert_eq!(
            err,
            ValidationError::NotNumeric {
                field: MetricField::ContextPrecision,
                value: "n/a".to_string(),
            }
        );
        assert!(err.to_string().contains("context_precision"));
    }

    #[test]
    fn test_row_key_falls_back_to_row_number() {
        let row = MetricRow {
            id: Some("  ".to_string()),
            ..Default::default()
        };
        assert_eq!(row.key(3), "3");
        assert_eq!(MetricRow::default().key(12), "12");
    }

    #[test]
    fn test_record_json_omits_absent_noise() {
        let json = serde_json::to_value(sample()).unwrap();
        assert!(json.get("noise_sensitivity").is_none());

        let parsed: MetricRecord = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, sample());
    }
}

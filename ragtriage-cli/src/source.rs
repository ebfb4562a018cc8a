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

//! File-backed metric sources
//!
//! CSV files need a header row whose column names match the metric names
//! (`context_recall`, `faithfulness`, ...). An `id` column is optional and
//! unknown columns such as the question or answer text are ignored. JSON
//! input is either an array of row objects or one object per line.
//!
//! Cells are read as text. A cell that is not a number does not fail the
//! load; it stays on the row and the batch reports that row as failed.
//! Only structural problems (I/O, malformed CSV or JSON, a header without
//! metric columns) are load errors.

use clap::ValueEnum;
use ragtriage_core::{MetricField, MetricRow, MetricSource, SourceError};
use serde_json::Value;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Input file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InputFormat {
    Csv,
    Json,
}

impl InputFormat {
    /// Guess the format from the file extension
    pub fn detect(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(InputFormat::Csv),
            "json" | "jsonl" | "ndjson" => Some(InputFormat::Json),
            _ => None,
        }
    }
}

/// Open `path` as a metric source, detecting the format when not given
pub fn open_source(
    path: &Path,
    format: Option<InputFormat>,
) -> Result<Box<dyn MetricSource>, SourceError> {
    let format = match format.or_else(|| InputFormat::detect(path)) {
        Some(format) => format,
        None => {
            return Err(parse_error(
                &path.display().to_string(),
                0,
                "cannot detect input format, pass --input-format",
            ))
        }
    };

    let source: Box<dyn MetricSource> = match format {
        InputFormat::Csv => Box::new(CsvSource::new(path)),
        InputFormat::Json => Box::new(JsonSource::new(path)),
    };
    Ok(source)
}

fn parse_error(source_name: &str, row: usize, message: impl fmt::Display) -> SourceError {
    SourceError::Parse {
        source_name: source_name.to_string(),
        row,
        message: message.to_string(),
    }
}

/// Meaning of one CSV column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Id,
    Metric(MetricField),
    Ignored,
}

impl Column {
    fn from_header(name: &str) -> Self {
        if name == "id" {
            return Column::Id;
        }
        MetricField::from_name(name)
            .map(Column::Metric)
            .unwrap_or(Column::Ignored)
    }
}

/// Metric rows from a CSV file with a header row
pub struct CsvSource {
    path: PathBuf,
    name: String,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path.display().to_string();
        Self { path, name }
    }
}

impl MetricSource for CsvSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> Result<Vec<MetricRow>, SourceError> {
        let file = File::open(&self.path)?;
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(file);

        let headers = reader
            .headers()
            .map_err(|e| parse_error(&self.name, 0, e))?;
        let columns: Vec<Column> = headers.iter().map(Column::from_header).collect();
        if !columns.is_empty() && !columns.iter().any(|c| matches!(c, Column::Metric(_))) {
            return Err(parse_error(&self.name, 0, "header names no metric column"));
        }

        reader
            .records()
            .enumerate()
            .map(|(i, record)| {
                let record = record.map_err(|e| parse_error(&self.name, i + 1, e))?;
                let mut row = MetricRow::default();
                for (column, cell) in columns.iter().zip(record.iter()) {
                    match column {
                        Column::Id if !cell.is_empty() => row.id = Some(cell.to_string()),
                        Column::Metric(field) => row.set_text(*field, cell),
                        Column::Id | Column::Ignored => {}
                    }
                }
                Ok(row)
            })
            .collect()
    }
}

/// Metric rows from a JSON array or JSON lines file
pub struct JsonSource {
    path: PathBuf,
    name: String,
}

impl JsonSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path.display().to_string();
        Self { path, name }
    }

    fn to_row(&self, row: usize, value: Value) -> Result<MetricRow, SourceError> {
        let Value::Object(object) = value else {
            return Err(parse_error(&self.name, row, "expected a JSON object"));
        };

        let mut metrics = MetricRow::default();
        for (name, value) in object {
            if name == "id" {
                // numeric ids are common in exported datasets
                metrics.id = match value {
                    Value::Null => None,
                    Value::String(id) => Some(id),
                    other => Some(other.to_string()),
                };
                continue;
            }
            let Some(field) = MetricField::from_name(&name) else {
                continue;
            };
            match value {
                Value::Null => metrics.set(field, None),
                Value::Number(n) => metrics.set(field, n.as_f64()),
                Value::String(text) => metrics.set_text(field, &text),
                other => metrics.set_text(field, &other.to_string()),
            }
        }
        Ok(metrics)
    }
}

impl MetricSource for JsonSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> Result<Vec<MetricRow>, SourceError> {
        let content = std::fs::read_to_string(&self.path)?;

        if content.trim_start().starts_with('[') {
            let values: Vec<Value> = serde_json::from_str(&content)?;
            return values
                .into_iter()
                .enumerate()
                .map(|(i, value)| self.to_row(i + 1, value))
                .collect();
        }

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .enumerate()
            .map(|(i, line)| {
                let value =
                    serde_json::from_str(line).map_err(|e| parse_error(&self.name, i + 1, e))?;
                self.to_row(i + 1, value)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragtriage_core::RejectedCell;
    use std::io::Write;

    fn write_file(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(
            InputFormat::detect(Path::new("scores.CSV")),
            Some(InputFormat::Csv)
        );
        assert_eq!(
            InputFormat::detect(Path::new("scores.jsonl")),
            Some(InputFormat::Json)
        );
        assert_eq!(InputFormat::detect(Path::new("scores")), None);
    }

    #[test]
    fn test_csv_rows_with_extra_and_missing_columns() {
        let file = write_file(
            ".csv",
            "user_input,context_recall,context_precision,context_entities_recall,answer_relevancy,faithfulness\n\
             What is RAG?,0.5,0.6,0.8,0.5,0.6\n\
             Who wrote it?,0.9,0.8,0.2,,0.0\n",
        );

        let rows = open_source(file.path(), None).unwrap().load().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, None);
        assert_eq!(rows[0].context_entities_recall, Some(0.8));
        assert_eq!(rows[0].noise_sensitivity, None);
        assert_eq!(rows[1].answer_relevancy, None);
        assert_eq!(rows[1].faithfulness, Some(0.0));
    }

    #[test]
    fn test_csv_non_numeric_cell_stays_on_its_row() {
        let file = write_file(
            ".csv",
            "id,context_recall,context_precision,context_entities_recall,answer_relevancy,faithfulness\n\
             a,0.5,0.6,0.8,0.5,0.6\n\
             b,0.5,high,0.8,0.5,0.6\n\
             c,0.9,0.8,0.2,0.0,0.0\n",
        );

        let rows = CsvSource::new(file.path()).load().unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows[0].rejected.is_empty());
        assert_eq!(rows[1].context_precision, None);
        assert_eq!(
            rows[1].rejected,
            vec![RejectedCell {
                field: MetricField::ContextPrecision,
                value: "high".to_string(),
            }]
        );
        assert_eq!(rows[2].key(3), "c");
    }

    #[test]
    fn test_csv_structural_error_names_row() {
        let file = write_file(
            ".csv",
            "id,context_recall,faithfulness\n\
             a,0.5,0.6\n\
             b,0.5\n",
        );

        match CsvSource::new(file.path()).load() {
            Err(SourceError::Parse { row, .. }) => assert_eq!(row, 2),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_csv_header_without_metrics_rejected() {
        let file = write_file(".csv", "question,answer\nWhat is RAG?,A pipeline\n");
        match CsvSource::new(file.path()).load() {
            Err(SourceError::Parse { row, message, .. }) => {
                assert_eq!(row, 0);
                assert!(message.contains("metric column"));
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_json_array_with_numeric_ids() {
        let file = write_file(
            ".json",
            r#"[
                {"id": 7, "context_recall": 0.5, "context_precision": 0.6,
                 "context_entities_recall": 0.8, "answer_relevancy": 0.5,
                 "faithfulness": 0.6, "noise_sensitivity": 0.7},
                {"id": "q-2", "context_recall": 0.9}
            ]"#,
        );

        let rows = JsonSource::new(file.path()).load().unwrap();
        assert_eq!(rows[0].id.as_deref(), Some("7"));
        assert_eq!(rows[0].noise_sensitivity, Some(0.7));
        assert_eq!(rows[1].key(2), "q-2");
        assert_eq!(rows[1].faithfulness, None);
    }

    #[test]
    fn test_json_text_scores() {
        let file = write_file(
            ".jsonl",
            "{\"id\": \"a\", \"faithfulness\": \"0.6\", \"context_recall\": null}\n\
             {\"id\": \"b\", \"faithfulness\": \"high\", \"answer_relevancy\": true}\n",
        );

        let rows = JsonSource::new(file.path()).load().unwrap();
        assert_eq!(rows[0].faithfulness, Some(0.6));
        assert_eq!(rows[0].context_recall, None);
        assert!(rows[0].rejected.is_empty());

        let fields: Vec<MetricField> = rows[1].rejected.iter().map(|c| c.field).collect();
        assert_eq!(fields.len(), 2);
        assert!(fields.contains(&MetricField::Faithfulness));
        assert!(fields.contains(&MetricField::AnswerRelevancy));
    }

    #[test]
    fn test_json_row_must_be_object() {
        let file = write_file(".json", "[{\"context_recall\": 0.1}, 0.5]");
        match JsonSource::new(file.path()).load() {
            Err(SourceError::Parse { row, .. }) => assert_eq!(row, 2),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_json_lines_skip_blank_lines() {
        let file = write_file(
            ".jsonl",
            "{\"context_recall\": 0.1}\n\n{\"context_recall\": 0.2}\n",
        );

        let rows = open_source(file.path(), None).unwrap().load().unwrap();
        let recalls: Vec<Option<f64>> = rows.iter().map(|r| r.context_recall).collect();
        assert_eq!(recalls, vec![Some(0.1), Some(0.2)]);
    }

    #[test]
    fn test_json_lines_error_names_row() {
        let file = write_file(".jsonl", "{\"context_recall\": 0.1}\nnot json\n");
        match JsonSource::new(file.path()).load() {
            Err(SourceError::Parse { row, .. }) => assert_eq!(row, 2),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_extension_requires_format() {
        let file = write_file(".txt", "");
        assert!(open_source(file.path(), None).is_err());
        assert!(open_source(file.path(), Some(InputFormat::Csv)).is_ok());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let source = CsvSource::new("/nonexistent/scores.csv");
        assert!(matches!(source.load(), Err(SourceError::Io(_))));
    }
}

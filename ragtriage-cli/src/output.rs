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

//! Report rendering

use anyhow::Result;
use clap::ValueEnum;
use ragtriage_core::{FailureStage, WeightTriple};
use ragtriage_evals::{
    Attribution, BatchReport, Grade, MetricGrade, Outcome, RecordOutcome, GRADED_FIELDS,
};
use serde::Serialize;

/// Report output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Csv,
    Json,
}

/// Render a batch report. `grades`, when given, runs parallel to `report.outcomes`.
pub fn render_report(
    report: &BatchReport,
    grades: Option<&[Vec<MetricGrade>]>,
    format: OutputFormat,
) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(render_table(report, grades)),
        OutputFormat::Csv => render_csv(report, grades),
        OutputFormat::Json => render_json(report, grades),
    }
}

fn grades_for<'a>(grades: Option<&'a [Vec<MetricGrade>]>, index: usize) -> &'a [MetricGrade] {
    grades
        .and_then(|g| g.get(index))
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn applied_list(attribution: &Attribution) -> String {
    attribution
        .applied
        .iter()
        .map(|a| a.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn render_table(report: &BatchReport, grades: Option<&[Vec<MetricGrade>]>) -> String {
    let key_width = report
        .outcomes
        .iter()
        .map(|o| o.key.len())
        .max()
        .unwrap_or(0)
        .max(3);

    let mut out = String::new();
    out.push_str(&format!(
        "{:<kw$}  {:>9}  {:>9}  {:>10}  {:<10}  {}\n",
        "KEY",
        "RETRIEVAL",
        "CONTEXT",
        "GENERATION",
        "DOMINANT",
        "NOTES",
        kw = key_width
    ));

    for (i, RecordOutcome { key, outcome }) in report.outcomes.iter().enumerate() {
        match outcome {
            Outcome::Attributed(attribution) => {
                let dist = &attribution.distribution;
                let mut notes = applied_list(attribution);
                let failing: Vec<&str> = grades_for(grades, i)
                    .iter()
                    .filter(|g| g.grade == Grade::NotGood)
                    .map(|g| g.field.as_str())
                    .collect();
                if !failing.is_empty() {
                    if !notes.is_empty() {
                        notes.push_str("; ");
                    }
                    notes.push_str(&format!("not good: {}", failing.join(", ")));
                }
                out.push_str(&format!(
                    "{:<kw$}  {:>8.2}%  {:>8.2}%  {:>9.2}%  {:<10}  {}\n",
                    key,
                    dist.retrieval_prob * 100.0,
                    dist.context_prob * 100.0,
                    dist.generation_prob * 100.0,
                    dist.dominant().as_str(),
                    notes,
                    kw = key_width
                ));
            }
            Outcome::Failed { reason, .. } => {
                out.push_str(&format!(
                    "{:<kw$}  FAILED: {}\n",
                    key,
                    reason,
                    kw = key_width
                ));
            }
        }
    }

    let summary = &report.summary;
    out.push_str(&format!(
        "\nSummary ({}): {} records, {} attributed, {} failed\n",
        report.strategy, summary.total, summary.attributed, summary.failed
    ));
    let counts: Vec<String> = FailureStage::ALL
        .iter()
        .map(|s| {
            format!(
                "{} {}",
                s.as_str(),
                summary.dominant_counts.get(s).copied().unwrap_or(0)
            )
        })
        .collect();
    out.push_str(&format!("  Dominant stage: {}\n", counts.join(", ")));
    if let Some(mean) = &summary.mean_distribution {
        out.push_str(&format!("  Mean: {}\n", mean));
    }
    out
}

fn render_csv(report: &BatchReport, grades: Option<&[Vec<MetricGrade>]>) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header: Vec<String> = [
        "key",
        "status",
        "retrieval_prob",
        "context_prob",
        "generation_prob",
        "dominant",
        "applied",
        "reason",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    if grades.is_some() {
        header.extend(GRADED_FIELDS.iter().map(|f| format!("{}_grade", f)));
    }
    writer.write_record(&header)?;

    for (i, RecordOutcome { key, outcome }) in report.outcomes.iter().enumerate() {
        let mut record: Vec<String> = match outcome {
            Outcome::Attributed(attribution) => {
                let dist = &attribution.distribution;
                vec![
                    key.clone(),
                    "attributed".to_string(),
                    format!("{:.4}", dist.retrieval_prob),
                    format!("{:.4}", dist.context_prob),
                    format!("{:.4}", dist.generation_prob),
                    dist.dominant().as_str().to_string(),
                    applied_list(attribution),
                    String::new(),
                ]
            }
            Outcome::Failed { reason, .. } => {
                let mut record = vec![key.clone(), "failed".to_string()];
                record.extend(std::iter::repeat(String::new()).take(5));
                record.push(reason.clone());
                record
            }
        };

        if grades.is_some() {
            let graded = grades_for(grades, i);
            record.extend(GRADED_FIELDS.iter().map(|field| {
                graded
                    .iter()
                    .find(|g| g.field == *field)
                    .map(|g| g.grade.as_str().to_string())
                    .unwrap_or_default()
            }));
        }
        writer.write_record(&record)?;
    }

    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

#[derive(Serialize)]
struct KeyedGrades<'a> {
    key: &'a str,
    grades: &'a [MetricGrade],
}

#[derive(Serialize)]
struct JsonReport<'a> {
    #[serde(flatten)]
    report: &'a BatchReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    grades: Option<Vec<KeyedGrades<'a>>>,
}

fn render_json(report: &BatchReport, grades: Option<&[Vec<MetricGrade>]>) -> Result<String> {
    let grades = grades.map(|_| {
        report
            .outcomes
            .iter()
            .enumerate()
            .map(|(i, o)| KeyedGrades {
                key: &o.key,
                grades: grades_for(grades, i),
            })
            .collect()
    });
    Ok(serde_json::to_string_pretty(&JsonReport { report, grades })?)
}

fn weights_line(weights: &WeightTriple) -> String {
    format!(
        "retrieval {:.4}  context {:.4}  generation {:.4}",
        weights.retrieval, weights.context, weights.generation
    )
}

/// Human-readable trace of one attribution
pub fn render_attribution(attribution: &Attribution) -> String {
    let dominant = attribution.distribution.dominant();
    let mut out = String::new();

    out.push_str(&format!("Strategy:         {}\n", attribution.strategy));
    out.push_str(&format!(
        "Base weights:     {}\n",
        weights_line(&attribution.base_weights)
    ));
    if attribution.applied.is_empty() {
        out.push_str("Applied steps:    none\n");
    } else {
        out.push_str("Applied steps:\n");
        for (i, step) in attribution.applied.iter().enumerate() {
            out.push_str(&format!("  {}. {}\n", i + 1, step));
        }
    }
    out.push_str(&format!(
        "Adjusted weights: {}\n",
        weights_line(&attribution.adjusted_weights)
    ));
    out.push_str(&format!(
        "Distribution:     {}\n",
        attribution.distribution
    ));
    out.push_str(&format!("Dominant stage:   {}\n", dominant.label()));
    out.push_str(&format!("Suggested action: {}\n", dominant.default_action()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragtriage_core::{KeyedRecord, MetricRecord};
    use ragtriage_evals::{
        evaluate_batch, Attributor, BatchPolicy, GradingStandard, WeightedAttribution,
    };

    fn sample_report() -> (BatchReport, Vec<Vec<MetricGrade>>) {
        let records = vec![
            KeyedRecord::new("q1", MetricRecord::new(0.5, 0.6, 0.8, 0.5, 0.6)),
            KeyedRecord::new("q2", MetricRecord::new(0.5, 0.6, 0.8, 0.5, 1.5)),
            KeyedRecord::new("q3", MetricRecord::new(0.9, 0.8, 0.2, 0.0, 0.0)),
        ];
        let report =
            evaluate_batch(&WeightedAttribution::new(), &records, &BatchPolicy::default())
                .unwrap();
        let standard = GradingStandard::default();
        let grades = records.iter().map(|r| standard.grade(&r.record)).collect();
        (report, grades)
    }

    #[test]
    fn test_table_lists_every_record_in_order() {
        let (report, _) = sample_report();
        let table = render_report(&report, None, OutputFormat::Table).unwrap();
        let lines: Vec<&str> = table.lines().collect();

        assert!(lines[0].starts_with("KEY"));
        assert!(lines[1].starts_with("q1"));
        assert!(lines[1].contains("58.82%"));
        assert!(lines[2].starts_with("q2"));
        assert!(lines[2].contains("FAILED"));
        assert!(lines[2].contains("faithfulness"));
        assert!(lines[3].contains("boost_generation_on_severe_failure"));
        assert!(table.contains("3 records, 2 attributed, 1 failed"));
    }

    #[test]
    fn test_table_notes_failing_grades() {
        let (report, grades) = sample_report();
        let table = render_report(&report, Some(grades.as_slice()), OutputFormat::Table).unwrap();
        let q1 = table.lines().nth(1).unwrap();
        assert!(q1.contains("not good: context_recall, context_precision"));
    }

    #[test]
    fn test_csv_output() {
        let (report, grades) = sample_report();
        let csv = render_report(&report, Some(grades.as_slice()), OutputFormat::Csv).unwrap();
        let mut reader = csv::Reader::from_reader(csv.as_bytes());

        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.len(), 8 + GRADED_FIELDS.len());
        assert!(!headers.iter().any(|h| h == "noise_sensitivity_grade"));
        assert_eq!(&headers[8], "context_recall_grade");

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(&rows[0][0], "q1");
        assert_eq!(&rows[0][2], "0.5882");
        assert_eq!(&rows[1][1], "failed");
        assert!(rows[1][7].contains("faithfulness"));
        assert_eq!(&rows[2][5], "generation");
        assert_eq!(&rows[0][8], "Not Good");
        assert_eq!(&rows[0][12], "Not Good");
    }

    #[test]
    fn test_json_output() {
        let (report, grades) = sample_report();

        let plain = render_report(&report, None, OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&plain).unwrap();
        assert_eq!(value["strategy"], "weighted_v1");
        assert_eq!(value["outcomes"][1]["outcome"]["status"], "failed");
        assert!(value.get("grades").is_none());

        let graded = render_report(&report, Some(grades.as_slice()), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&graded).unwrap();
        assert_eq!(value["grades"][0]["key"], "q1");
        assert_eq!(value["grades"][0]["grades"][0]["grade"], "Not Good");
    }

    #[test]
    fn test_attribution_trace() {
        let attribution = WeightedAttribution::new()
            .attribute(&MetricRecord::new(0.9, 0.8, 0.2, 0.0, 0.0))
            .unwrap();
        let trace = render_attribution(&attribution);

        assert!(trace.contains("Strategy:         weighted_v1"));
        assert!(trace.contains("1. boost_context_on_low_entity_recall"));
        assert!(trace.contains("3. suppress_retrieval_when_generation_dominates"));
        assert!(trace.contains("Adjusted weights: retrieval 0.1200  context 1.0200  generation 2.0000"));
        assert!(trace.contains("Dominant stage:   Generation"));
    }
}

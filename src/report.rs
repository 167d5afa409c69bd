use std::fmt::Write;

use chrono::NaiveDate;

use crate::db::{ResultTable, Value};
use crate::eligibility::EligibilityOutcome;
use crate::insights::Insight;
use crate::models::EligibilityCriteria;

/// One-line description of the active criteria, e.g. for report headers.
pub fn describe_criteria(criteria: &EligibilityCriteria) -> String {
    let mut parts = vec![
        format!("problems solved >= {}", criteria.min_problems),
        format!("soft skills average >= {}", criteria.min_soft_avg),
        format!("mock interview >= {}", criteria.min_mock),
    ];

    if !criteria.batches.is_empty() {
        parts.push(format!("batch in [{}]", criteria.batches.join(", ")));
    }
    if let Some(language) = &criteria.language {
        parts.push(format!("language = {language}"));
    }
    if let Some(status) = criteria.status {
        parts.push(format!("status = {status}"));
    }

    parts.join("; ")
}

/// Renders a result table as a Markdown table. Pipes in cell text are escaped.
pub fn markdown_table(table: &ResultTable) -> String {
    let mut output = String::new();

    if table.columns.is_empty() {
        let _ = writeln!(output, "_No columns returned._");
        return output;
    }

    let header: Vec<&str> = table.column_names();
    let _ = writeln!(output, "| {} |", header.join(" | "));
    let _ = writeln!(
        output,
        "|{}|",
        vec!["---"; header.len()].join("|")
    );

    for row in &table.rows {
        let cells: Vec<String> = row
            .iter()
            .map(|value| match value {
                Value::Float(f) => format!("{f:.2}"),
                other => other.to_display_string().replace('|', "\\|"),
            })
            .collect();
        let _ = writeln!(output, "| {} |", cells.join(" | "));
    }

    output
}

pub fn build_report(
    generated_on: NaiveDate,
    criteria: &EligibilityCriteria,
    outcome: &EligibilityOutcome,
    insights: &[(Insight, ResultTable)],
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Placement Eligibility Report");
    let _ = writeln!(output, "Generated on {generated_on}");
    let _ = writeln!(output);
    let _ = writeln!(output, "## Eligible Students");
    let _ = writeln!(output, "Criteria: {}", describe_criteria(criteria));
    let _ = writeln!(output);
    let _ = writeln!(output, "{}.", outcome.summary_line());

    if !outcome.by_batch.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "### Eligible count by batch");
        for batch in &outcome.by_batch {
            let _ = writeln!(
                output,
                "- {}: {}",
                batch.course_batch, batch.eligible_count
            );
        }
        let _ = writeln!(output);
        output.push_str(&markdown_table(&outcome.table));
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Insights");

    for (insight, table) in insights {
        let _ = writeln!(output);
        let _ = writeln!(output, "### {insight}");
        if table.is_empty() {
            let _ = writeln!(output, "No rows.");
        } else {
            output.push_str(&markdown_table(table));
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ColumnInfo;
    use crate::models::PlacementStatus;

    fn report_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, 1).unwrap()
    }

    #[test]
    fn criteria_description_lists_only_active_filters() {
        let text = describe_criteria(&EligibilityCriteria::default());
        assert_eq!(
            text,
            "problems solved >= 50; soft skills average >= 75; mock interview >= 60"
        );

        let text = describe_criteria(
            &EligibilityCriteria::default()
                .with_batches(["2023A", "2023B"])
                .with_status(PlacementStatus::NotReady),
        );
        assert!(text.ends_with("batch in [2023A, 2023B]; status = Not Ready"));
    }

    #[test]
    fn markdown_table_escapes_pipes_and_formats_floats() {
        let table = ResultTable::with_data(
            vec![ColumnInfo::new("company_name", "TEXT"), ColumnInfo::new("avg_package", "FLOAT8")],
            vec![vec![Value::from("A|B Labs"), Value::Float(6.5)]],
        );
        let md = markdown_table(&table);
        assert_eq!(
            md,
            "| company_name | avg_package |\n|---|---|\n| A\\|B Labs | 6.50 |\n"
        );
    }

    #[test]
    fn empty_outcome_reports_zero_students() {
        let outcome = EligibilityOutcome::from_table(ResultTable::new());
        let report = build_report(report_date(), &EligibilityCriteria::default(), &outcome, &[]);

        assert!(report.starts_with("# Placement Eligibility Report\nGenerated on 2024-07-01\n"));
        assert!(report.contains("Found 0 eligible students."));
        assert!(!report.contains("Eligible count by batch"));
    }

    #[test]
    fn insights_are_listed_with_titles() {
        let outcome = EligibilityOutcome::from_table(ResultTable::new());
        let total = ResultTable::with_data(
            vec![ColumnInfo::new("total_students", "INT8")],
            vec![vec![Value::Int(7)]],
        );
        let insights = vec![
            (Insight::TotalStudents, total),
            (Insight::NoInternships, ResultTable::new()),
        ];
        let report = build_report(
            report_date(),
            &EligibilityCriteria::default(),
            &outcome,
            &insights,
        );

        assert!(report.contains("### 1) Total number of students\n| total_students |"));
        assert!(report.contains("| 7 |"));
        assert!(report.contains("### 8) Students with no internships completed\nNo rows."));
    }
}

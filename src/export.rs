//! Result table serialization: CSV, JSON and plain-text terminal tables.

use std::io::Write;

use serde_json::{Map, Value as JsonValue};

use crate::db::{ResultTable, Value};
use crate::error::Result;

/// Output formats accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Csv,
    Json,
}

/// Writes the table as UTF-8 CSV with a header row of column names. NULL
/// cells are written as empty fields.
pub fn write_csv<W: Write>(table: &ResultTable, writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(table.columns.iter().map(|c| c.name.as_str()))?;

    for row in &table.rows {
        csv_writer.write_record(row.iter().map(Value::to_display_string))?;
    }

    csv_writer.flush()?;
    Ok(())
}

pub fn to_csv_string(table: &ResultTable) -> Result<String> {
    let mut buffer = Vec::new();
    write_csv(table, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| crate::error::ReportError::export(e.to_string()))
}

/// One JSON object per row, keyed by column name.
pub fn to_json_rows(table: &ResultTable) -> JsonValue {
    let rows = table
        .rows
        .iter()
        .map(|row| {
            let object: Map<String, JsonValue> = table
                .columns
                .iter()
                .zip(row)
                .map(|(column, value)| (column.name.clone(), json_value(value)))
                .collect();
            JsonValue::Object(object)
        })
        .collect();
    JsonValue::Array(rows)
}

pub fn write_json<W: Write>(table: &ResultTable, writer: W) -> Result<()> {
    serde_json::to_writer_pretty(writer, &to_json_rows(table))?;
    Ok(())
}

fn json_value(value: &Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::Int(i) => JsonValue::from(*i),
        Value::Float(f) => JsonValue::from(*f),
        Value::Text(s) => JsonValue::String(s.clone()),
    }
}

/// Renders an aligned text table. Numeric columns are right-aligned.
pub fn render_text(table: &ResultTable) -> String {
    if table.columns.is_empty() {
        return "(no columns)\n".to_string();
    }

    let cells: Vec<Vec<String>> = table
        .rows
        .iter()
        .map(|row| row.iter().map(Value::to_display_string).collect())
        .collect();

    let widths: Vec<usize> = table
        .columns
        .iter()
        .enumerate()
        .map(|(i, column)| {
            cells
                .iter()
                .filter_map(|row| row.get(i))
                .map(|cell| cell.chars().count())
                .chain(std::iter::once(column.name.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let numeric: Vec<bool> = (0..table.columns.len())
        .map(|i| {
            table
                .rows
                .iter()
                .filter_map(|row| row.get(i))
                .all(|v| matches!(v, Value::Int(_) | Value::Float(_) | Value::Null))
        })
        .collect();

    let mut output = String::new();
    let header: Vec<String> = table
        .columns
        .iter()
        .zip(&widths)
        .map(|(column, width)| format!("{:<width$}", column.name, width = *width))
        .collect();
    output.push_str(header.join(" | ").trim_end());
    output.push('\n');

    let separator: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    output.push_str(&separator.join("-+-"));
    output.push('\n');

    for row in &cells {
        let line: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let width = widths.get(i).copied().unwrap_or(0);
                if numeric.get(i).copied().unwrap_or(false) {
                    format!("{cell:>width$}")
                } else {
                    format!("{cell:<width$}")
                }
            })
            .collect();
        output.push_str(line.join(" | ").trim_end());
        output.push('\n');
    }

    let rows = table.row_count();
    output.push_str(&format!(
        "({rows} {})\n",
        if rows == 1 { "row" } else { "rows" }
    ));
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ColumnInfo;
    use std::fs;

    fn sample_table() -> ResultTable {
        ResultTable::with_data(
            vec![
                ColumnInfo::new("name", "TEXT"),
                ColumnInfo::new("soft_avg", "FLOAT8"),
                ColumnInfo::new("company_name", "TEXT"),
            ],
            vec![
                vec![Value::from("Asha Rao"), Value::Float(73.33), Value::from("Infosys")],
                vec![Value::from("Rao, Rahul"), Value::Float(81.5), Value::Null],
            ],
        )
    }

    #[test]
    fn csv_has_header_and_quotes_commas() {
        let csv = to_csv_string(&sample_table()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "name,soft_avg,company_name");
        assert_eq!(lines[1], "Asha Rao,73.33,Infosys");
        assert_eq!(lines[2], "\"Rao, Rahul\",81.5,");
    }

    #[test]
    fn csv_of_empty_table_keeps_header() {
        let table = ResultTable::with_data(vec![ColumnInfo::new("student_id", "INT4")], vec![]);
        assert_eq!(to_csv_string(&table).unwrap(), "student_id\n");
    }

    #[test]
    fn csv_file_round_trips_through_reader() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eligible_students.csv");
        write_csv(&sample_table(), fs::File::create(&path).unwrap()).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.len(), 3);
        assert_eq!(reader.records().count(), 2);
    }

    #[test]
    fn json_rows_are_keyed_by_column() {
        let json = to_json_rows(&sample_table());
        assert_eq!(json[0]["name"], "Asha Rao");
        assert_eq!(json[0]["soft_avg"], 73.33);
        assert!(json[1]["company_name"].is_null());
    }

    #[test]
    fn text_table_aligns_columns() {
        let text = render_text(&sample_table());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "name       | soft_avg | company_name");
        assert_eq!(lines[1], "-----------+----------+-------------");
        assert_eq!(lines[2], "Asha Rao   |    73.33 | Infosys");
        assert_eq!(lines.last().copied(), Some("(2 rows)"));
    }
}

//! Text rendering of query results for tool responses.

use crate::warehouse::{QueryResult, SchemaRow, Value};

/// Longest cell text shown in a result table.
const MAX_CELL_CHARS: usize = 50;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

fn render_cell(value: &Value) -> String {
    let text: String = value
        .to_display_string()
        .chars()
        .take(MAX_CELL_CHARS)
        .collect();
    text.replace(['\n', '\r'], " ").replace('|', "\\|")
}

/// Formats a query result as a summary followed by a markdown table.
///
/// At most `max_rows` rows are rendered; the remainder is counted.
pub fn format_query_result(result: &QueryResult, max_rows: usize) -> String {
    let mut lines = vec![
        format!("Query ID: {}", result.execution_id()),
        format!("Columns: {}", result.columns().join(", ")),
        format!("Total rows: {}", result.row_count()),
    ];

    if let Some(stats) = result.statistics() {
        let scanned = stats.data_scanned_bytes().unwrap_or(0) as f64;
        let exec_ms = stats.total_execution_millis().unwrap_or(0) as f64;
        lines.push(format!("Data scanned: {:.2} MB", scanned / BYTES_PER_MB));
        lines.push(format!("Execution time: {:.2}s", exec_ms / 1000.0));
    }

    lines.push(String::new());

    if !result.is_empty() {
        lines.push(format!("| {} |", result.columns().join(" | ")));
        lines.push(format!(
            "| {} |",
            vec!["---"; result.columns().len()].join(" | ")
        ));

        for row in result.rows().iter().take(max_rows) {
            let cells: Vec<String> = row.iter().map(render_cell).collect();
            lines.push(format!("| {} |", cells.join(" | ")));
        }

        if result.row_count() > max_rows {
            lines.push(format!(
                "\n... and {} more rows",
                result.row_count() - max_rows
            ));
        }
    }

    lines.join("\n")
}

/// Formats described columns as a two-column markdown table.
///
/// Section headers and blank rows are skipped.
pub fn format_schema(title: &str, rows: &[SchemaRow]) -> String {
    let mut lines = vec![
        format!("Schema for {title}:"),
        String::new(),
        "| Column | Type |".to_string(),
        "| --- | --- |".to_string(),
    ];
    lines.extend(
        rows.iter()
            .filter(|row| row.is_column())
            .map(|row| format!("| {} | {} |", row.col_name, row.data_type)),
    );
    lines.join("\n")
}

/// Formats a table listing.
pub fn format_table_list(database: &str, tables: &[String]) -> String {
    let mut out = format!("Tables in {database}:\n");
    out.push_str(
        &tables
            .iter()
            .map(|t| format!("  - {t}"))
            .collect::<Vec<_>>()
            .join("\n"),
    );
    out
}

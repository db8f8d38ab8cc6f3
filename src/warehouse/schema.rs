//! Table description normalization.
//!
//! `DESCRIBE` output sometimes arrives with all three fields collapsed into
//! one tab-separated `col_name` cell while the metadata still declares
//! several columns. This module detects that shape and splits it back out.

use serde::{Deserialize, Serialize};

use super::{QueryResult, Row, Value};

/// Names starting with this character are section headers, not columns.
pub const SECTION_MARKER: char = '#';

const NAME_COLUMN: &str = "col_name";
const TYPE_COLUMN: &str = "data_type";
const COMMENT_COLUMN: &str = "comment";

/// One column description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaRow {
    pub col_name: String,
    pub data_type: String,
    pub comment: String,
}

impl SchemaRow {
    pub fn new(
        col_name: impl Into<String>,
        data_type: impl Into<String>,
        comment: impl Into<String>,
    ) -> Self {
        Self {
            col_name: col_name.into(),
            data_type: data_type.into(),
            comment: comment.into(),
        }
    }

    /// True for rows like `# Partition Information`.
    pub fn is_section_header(&self) -> bool {
        self.col_name.trim_start().starts_with(SECTION_MARKER)
    }

    /// True for rows that describe an actual column.
    pub fn is_column(&self) -> bool {
        !self.col_name.trim().is_empty() && !self.is_section_header()
    }

    fn from_tab_separated(raw: &str) -> Self {
        let mut parts = raw.trim_end_matches(['\r', '\n']).splitn(3, '\t');
        let mut next = || parts.next().unwrap_or_default().trim().to_string();
        Self {
            col_name: next(),
            data_type: next(),
            comment: next(),
        }
    }
}

/// Normalizes the result of a `DESCRIBE` statement.
///
/// Rows are split on tabs only when some name contains a tab and no row
/// has any other field populated; otherwise they pass through as-is.
/// Never fails: unrecognized shapes are passed through.
pub fn normalize_describe_rows(result: &QueryResult) -> Vec<SchemaRow> {
    if result.is_empty() {
        return Vec::new();
    }

    let Some(name_idx) = result.column_index(NAME_COLUMN) else {
        return positional_rows(result);
    };

    let has_tab = result
        .rows()
        .iter()
        .any(|row| cell(row, name_idx).contains('\t'));
    let has_other_fields = result.rows().iter().any(|row| {
        row.iter()
            .enumerate()
            .any(|(i, v)| i != name_idx && v.as_str().is_some_and(|s| !s.is_empty()))
    });

    if has_tab && !has_other_fields {
        return result
            .rows()
            .iter()
            .map(|row| SchemaRow::from_tab_separated(cell(row, name_idx)))
            .collect();
    }

    result
        .records()
        .map(|record| {
            SchemaRow::new(
                record.text(NAME_COLUMN).unwrap_or_default(),
                record.text(TYPE_COLUMN).unwrap_or_default(),
                record.text(COMMENT_COLUMN).unwrap_or_default(),
            )
        })
        .collect()
}

fn cell(row: &Row, idx: usize) -> &str {
    row.get(idx).and_then(Value::as_str).unwrap_or_default()
}

/// Maps rows by position when the result has no `col_name` column.
fn positional_rows(result: &QueryResult) -> Vec<SchemaRow> {
    result
        .rows()
        .iter()
        .map(|row| SchemaRow::new(cell(row, 0), cell(row, 1), cell(row, 2)))
        .collect()
}

/// A table's columns split into regular and partition columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableSchema {
    pub columns: Vec<SchemaRow>,
    pub partition_columns: Vec<SchemaRow>,
}

impl TableSchema {
    /// Groups normalized rows, using `# Partition ...` headers to switch sections.
    pub fn from_rows(rows: &[SchemaRow]) -> Self {
        let mut schema = Self::default();
        let mut in_partition = false;

        for row in rows {
            let name = row.col_name.trim();
            if name.is_empty() {
                continue;
            }
            if row.is_section_header() {
                // `# col_name` repeats the column header inside a section.
                let header = name.to_lowercase();
                if header.starts_with("# partition") {
                    in_partition = true;
                } else if !header.starts_with("# col_name") {
                    in_partition = false;
                }
                continue;
            }

            let row = SchemaRow::new(name, row.data_type.trim(), row.comment.trim());
            if in_partition {
                // Partition columns are listed a second time under the header.
                if !schema.partition_columns.contains(&row) {
                    schema.partition_columns.push(row);
                }
            } else if !schema.columns.contains(&row) {
                schema.columns.push(row);
            }
        }

        schema
    }

    /// Renders both sections as markdown tables.
    pub fn to_markdown(&self) -> String {
        fn render(rows: &[SchemaRow]) -> String {
            if rows.is_empty() {
                return "_(none)_".to_string();
            }
            let mut lines = vec![
                "| Column | Type | Comment |".to_string(),
                "| --- | --- | --- |".to_string(),
            ];
            lines.extend(
                rows.iter()
                    .map(|r| format!("| {} | {} | {} |", r.col_name, r.data_type, r.comment)),
            );
            lines.join("\n")
        }

        format!(
            "**Columns**\n\n{}\n\n**Partition columns**\n\n{}",
            render(&self.columns),
            render(&self.partition_columns)
        )
    }
}

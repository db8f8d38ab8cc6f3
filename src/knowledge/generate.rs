//! Generates catalog and example documents from the query templates.
//!
//! Every table a template reads from is described (and optionally its DDL
//! fetched), and every template is run with a row cap. Failures are written
//! into the documents instead of aborting the run.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use tracing::{info, warn};

use super::QueryFile;
use crate::error::{InsightsError, Result};
use crate::tools::format_query_result;
use crate::warehouse::{QueryOptions, QueryResult, SchemaRow, TableSchema, WarehouseClient};

pub const CATALOG_FILE: &str = "catalog.txt";
pub const EXAMPLES_FILE: &str = "examples.txt";

/// Settings for one generation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerateOptions {
    /// Row cap for each template run (also injected as a server-side `LIMIT`).
    pub row_limit: usize,

    /// Rows shown per template in examples.txt.
    pub preview_rows: usize,

    /// Include `SHOW CREATE TABLE` output in the catalog.
    pub include_ddl: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            row_limit: 100,
            preview_rows: 20,
            include_ddl: false,
        }
    }
}

fn table_ref_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)\b(?:from|join)\s+([A-Za-z0-9_]+)\.([A-Za-z0-9_]+)\b")
            .expect("valid regex")
    })
}

/// Returns the sorted, distinct `database.table` names read by `sql`.
///
/// Only qualified names after `FROM` or `JOIN` count; `alias.column`
/// references are ignored.
pub fn extract_table_refs(sql: &str) -> Vec<String> {
    table_ref_pattern()
        .captures_iter(sql)
        .map(|caps| format!("{}.{}", &caps[1], &caps[2]))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

struct TableDocs {
    schema: std::result::Result<Vec<SchemaRow>, String>,
    ddl: Option<String>,
}

async fn describe(client: &WarehouseClient, name: &str, include_ddl: bool) -> TableDocs {
    let table = match client.table_ref(name) {
        Ok(table) => table,
        Err(e) => {
            return TableDocs {
                schema: Err(e.to_string()),
                ddl: None,
            }
        }
    };

    let schema = client
        .describe_table(&table)
        .await
        .map_err(|e| e.to_string());
    if let Err(e) = &schema {
        warn!(table = %table, error = %e, "Could not describe table");
    }

    let ddl = if include_ddl {
        match client.show_create_table(&table).await {
            Ok(ddl) if !ddl.is_empty() => Some(ddl),
            Ok(_) => None,
            Err(e) => {
                warn!(table = %table, error = %e, "Could not fetch DDL");
                None
            }
        }
    } else {
        None
    };

    TableDocs { schema, ddl }
}

fn render_catalog(tables: &BTreeMap<String, TableDocs>) -> String {
    let mut lines = vec![
        "# Data catalog (generated)".to_string(),
        String::new(),
        "Generated from the SQL templates in `queries/` by describing every referenced table."
            .to_string(),
        String::new(),
        "## Tables referenced by sample queries".to_string(),
        String::new(),
    ];

    for (name, docs) in tables {
        lines.push(format!("### `{name}`"));
        lines.push(String::new());
        if let Some(ddl) = &docs.ddl {
            lines.push("**DDL (SHOW CREATE TABLE)**".to_string());
            lines.push(String::new());
            lines.push("```sql".to_string());
            lines.push(ddl.trim_end().to_string());
            lines.push("```".to_string());
            lines.push(String::new());
        }
        match &docs.schema {
            Ok(rows) => lines.push(TableSchema::from_rows(rows).to_markdown()),
            Err(e) => lines.push(format!("**Describe failed**: `{e}`")),
        }
        lines.push(String::new());
    }

    finish(lines)
}

fn render_examples(
    queries: &[QueryFile],
    runs: &[std::result::Result<QueryResult, String>],
    options: &GenerateOptions,
) -> String {
    let mut lines = vec![
        "# Example queries (generated)".to_string(),
        String::new(),
        format!(
            "Query previews are capped at {} rows ({} shown here).",
            options.row_limit, options.preview_rows
        ),
        String::new(),
    ];

    for (query, run) in queries.iter().zip(runs) {
        lines.push(format!("## {}", query.name));
        lines.push(String::new());
        lines.push("**SQL**".to_string());
        lines.push(String::new());
        lines.push("```sql".to_string());
        lines.push(query.sql.trim_end().to_string());
        lines.push("```".to_string());
        lines.push(String::new());

        let refs = extract_table_refs(&query.sql);
        if !refs.is_empty() {
            lines.push("**Tables referenced**".to_string());
            lines.push(String::new());
            lines.extend(refs.iter().map(|t| format!("- `{t}`")));
            lines.push(String::new());
        }

        match run {
            Ok(result) => {
                lines.push("**Result preview**".to_string());
                lines.push(String::new());
                lines.push(format_query_result(result, options.preview_rows));
            }
            Err(e) => {
                lines.push("**Execution error**".to_string());
                lines.push(String::new());
                lines.push(format!("`{e}`"));
            }
        }
        lines.push(String::new());
    }

    finish(lines)
}

fn finish(lines: Vec<String>) -> String {
    let mut text = lines.join("\n").trim_end().to_string();
    text.push('\n');
    text
}

/// Builds catalog.txt and examples.txt from `queries`.
///
/// Returns file name to content. Describe, DDL and execution failures are
/// recorded in the documents.
pub async fn generate_docs(
    client: &WarehouseClient,
    queries: &[QueryFile],
    options: &GenerateOptions,
) -> BTreeMap<String, String> {
    let table_names: BTreeSet<String> = queries
        .iter()
        .flat_map(|q| extract_table_refs(&q.sql))
        .collect();

    let mut tables = BTreeMap::new();
    for name in table_names {
        let docs = describe(client, &name, options.include_ddl).await;
        tables.insert(name, docs);
    }

    let mut runs = Vec::with_capacity(queries.len());
    for query in queries {
        info!(template = %query.name, "Running query template");
        let run = client
            .execute_query(&query.sql, QueryOptions::limited(options.row_limit))
            .await
            .map_err(|e| e.to_string());
        runs.push(run);
    }

    BTreeMap::from([
        (CATALOG_FILE.to_string(), render_catalog(&tables)),
        (
            EXAMPLES_FILE.to_string(),
            render_examples(queries, &runs, options),
        ),
    ])
}

/// Writes generated documents into `dir`, creating it if needed.
pub fn write_docs(dir: &Path, docs: &BTreeMap<String, String>) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .map_err(|e| InsightsError::io(format!("Failed to create {}: {e}", dir.display())))?;

    docs.iter()
        .map(|(name, content)| {
            let path = dir.join(name);
            std::fs::write(&path, content)
                .map_err(|e| InsightsError::io(format!("Failed to write {}: {e}", path.display())))?;
            Ok(path)
        })
        .collect()
}

//! Assistant-facing tool layer.
//!
//! Declares the callable tools with their JSON parameter schemas and maps
//! each call onto exactly one warehouse operation. Every outcome, including
//! failures, comes back as text.

mod format;

pub use format::{format_query_result, format_schema, format_table_list};

use std::time::Instant;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::ToolsConfig;
use crate::error::InsightsError;
use crate::knowledge::{KnowledgeBase, Resource};
use crate::warehouse::{QueryOptions, TableRef, TableSchema, WarehouseClient};

/// Description shared by every `table` parameter.
const TABLE_ARGUMENT: &str = "Table name, either `table` or `database.table`. Database and table \
     names may contain only ASCII letters, digits, `_` and `-`; quoted, backticked or \
     non-ASCII names are rejected.";

/// Default rows for `get_sample_data`.
const DEFAULT_SAMPLE_ROWS: i64 = 5;

/// Tool definition for assistant function calling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Input parameters for the run_query tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunQueryInput {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_rows: Option<i64>,
}

/// Input parameters for the list_tables tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListTablesInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}

/// Input parameters for the describe_table tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DescribeTableInput {
    pub table: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}

/// Input parameters for the get_sample_data tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleDataInput {
    pub table: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}

/// Input parameters for the show_create_table tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShowCreateTableInput {
    pub table: String,
}

/// Returns the tool definitions exposed to the assistant.
pub fn get_tool_definitions(limits: &ToolsConfig, default_database: &str) -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "run_query".to_string(),
            description: format!(
                "Execute a SQL query (Presto/Trino syntax) against the {default_database} \
                 database. Returns columns, rows as a markdown table, and execution statistics."
            ),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "SQL query to execute"
                    },
                    "max_rows": {
                        "type": "integer",
                        "description": format!(
                            "Maximum number of rows to return (default and max: {})",
                            limits.max_query_rows
                        )
                    }
                },
                "required": ["query"]
            }),
        },
        ToolDefinition {
            name: "list_tables".to_string(),
            description: "List all tables available in a database.".to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "database": {
                        "type": "string",
                        "description": format!(
                            "Database name (default: {default_database}). ASCII letters, \
                             digits, `_` and `-` only."
                        )
                    }
                },
                "required": []
            }),
        },
        ToolDefinition {
            name: "describe_table".to_string(),
            description: "Get the schema (column names and types) of a table.".to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "table": {
                        "type": "string",
                        "description": TABLE_ARGUMENT
                    },
                    "database": {
                        "type": "string",
                        "description": format!(
                            "Database for an unqualified table (default: {default_database})"
                        )
                    }
                },
                "required": ["table"]
            }),
        },
        ToolDefinition {
            name: "get_sample_data".to_string(),
            description: "Get a sample of rows from a table to understand its contents."
                .to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "table": {
                        "type": "string",
                        "description": TABLE_ARGUMENT
                    },
                    "limit": {
                        "type": "integer",
                        "description": format!(
                            "Number of rows to return (default: {DEFAULT_SAMPLE_ROWS}, max: {})",
                            limits.max_sample_rows
                        )
                    },
                    "database": {
                        "type": "string",
                        "description": format!(
                            "Database for an unqualified table (default: {default_database})"
                        )
                    }
                },
                "required": ["table"]
            }),
        },
        ToolDefinition {
            name: "show_create_table".to_string(),
            description: "Get the CREATE TABLE statement (DDL) for a table.".to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "table": {
                        "type": "string",
                        "description": TABLE_ARGUMENT
                    }
                },
                "required": ["table"]
            }),
        },
    ]
}

/// Clamps a requested row count into `1..=max`.
fn clamp_rows(requested: Option<i64>, default: i64, max: usize) -> usize {
    let requested = requested.unwrap_or(default).max(1);
    usize::try_from(requested).map_or(max, |n| n.min(max)).max(1)
}

/// Text for a failed operation.
///
/// Remote failures already read "Query failed: ..."; only their reason is kept.
fn error_text(prefix: &str, error: &InsightsError) -> String {
    match error {
        InsightsError::QueryFailed { reason, .. } => format!("{prefix}: {reason}"),
        other => format!("{prefix}: {other}"),
    }
}

fn parse_arguments<T: DeserializeOwned>(tool: &str, arguments: &str) -> Result<T, String> {
    let arguments = if arguments.trim().is_empty() {
        "{}"
    } else {
        arguments
    };
    serde_json::from_str(arguments).map_err(|e| format!("Invalid arguments for {tool}: {e}"))
}

/// Dispatches tool calls and resource reads.
#[derive(Debug, Clone)]
pub struct ToolRouter {
    client: WarehouseClient,
    knowledge: KnowledgeBase,
    limits: ToolsConfig,
}

impl ToolRouter {
    pub fn new(client: WarehouseClient, knowledge: KnowledgeBase, limits: ToolsConfig) -> Self {
        Self {
            client,
            knowledge,
            limits,
        }
    }

    pub fn client(&self) -> &WarehouseClient {
        &self.client
    }

    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        get_tool_definitions(&self.limits, self.client.default_database())
    }

    pub fn resources(&self) -> Vec<Resource> {
        self.knowledge.resources()
    }

    pub fn read_resource(&self, uri: &str) -> String {
        self.knowledge.read(uri)
    }

    /// Executes a tool and returns its text result.
    ///
    /// `arguments` is the JSON object of tool parameters.
    pub async fn execute(&self, name: &str, arguments: &str) -> String {
        let start = Instant::now();
        tracing::debug!(tool_name = name, "Executing tool");

        let result = match name {
            "run_query" => match parse_arguments(name, arguments) {
                Ok(input) => self.run_query(input).await,
                Err(e) => e,
            },
            "list_tables" => match parse_arguments(name, arguments) {
                Ok(input) => self.list_tables(input).await,
                Err(e) => e,
            },
            "describe_table" => match parse_arguments(name, arguments) {
                Ok(input) => self.describe_table(input).await,
                Err(e) => e,
            },
            "get_sample_data" => match parse_arguments(name, arguments) {
                Ok(input) => self.get_sample_data(input).await,
                Err(e) => e,
            },
            "show_create_table" => match parse_arguments(name, arguments) {
                Ok(input) => self.show_create_table(input).await,
                Err(e) => e,
            },
            _ => {
                tracing::warn!(tool_name = name, "Unknown tool requested");
                format!("Unknown tool: {name}")
            }
        };

        tracing::debug!(
            tool_name = name,
            duration_ms = start.elapsed().as_millis(),
            result_len = result.len(),
            "Tool execution complete"
        );

        result
    }

    async fn run_query(&self, input: RunQueryInput) -> String {
        let max_rows = clamp_rows(
            input.max_rows,
            self.limits.max_query_rows as i64,
            self.limits.max_query_rows,
        );
        match self
            .client
            .execute_query(&input.query, QueryOptions::limited(max_rows))
            .await
        {
            Ok(result) => format_query_result(&result, max_rows),
            Err(e) => error_text("Query failed", &e),
        }
    }

    async fn list_tables(&self, input: ListTablesInput) -> String {
        let database = input
            .database
            .unwrap_or_else(|| self.client.default_database().to_string());
        match self.client.list_tables(Some(&database)).await {
            Ok(tables) => format_table_list(&database, &tables),
            Err(e) => error_text("Failed to list tables", &e),
        }
    }

    /// Resolves a table argument, qualifying bare names with `database` when given.
    fn resolve_table(&self, table: &str, database: Option<&str>) -> Result<TableRef, InsightsError> {
        match database {
            Some(database) if !table.contains('.') => TableRef::parse(table, database),
            _ => self.client.table_ref(table),
        }
    }

    async fn describe_table(&self, input: DescribeTableInput) -> String {
        let table = match self.resolve_table(&input.table, input.database.as_deref()) {
            Ok(table) => table,
            Err(e) => return error_text("Failed to describe table", &e),
        };
        match self.client.describe_table(&table).await {
            Ok(rows) => format_schema(&table.to_string(), &rows),
            Err(e) => error_text("Failed to describe table", &e),
        }
    }

    async fn get_sample_data(&self, input: SampleDataInput) -> String {
        let limit = clamp_rows(input.limit, DEFAULT_SAMPLE_ROWS, self.limits.max_sample_rows);
        let table = match self.resolve_table(&input.table, input.database.as_deref()) {
            Ok(table) => table,
            Err(e) => return error_text("Failed to get sample data", &e),
        };
        match self.client.sample_rows(&table, limit).await {
            Ok(result) => format_query_result(&result, limit),
            Err(e) => error_text("Failed to get sample data", &e),
        }
    }

    /// Renders a table's columns and partition columns with comments.
    pub async fn table_schema(&self, table: &str) -> String {
        let table = match self.client.table_ref(table) {
            Ok(table) => table,
            Err(e) => return error_text("Failed to describe table", &e),
        };
        match self.client.describe_table(&table).await {
            Ok(rows) => format!(
                "Schema for {table}:\n\n{}",
                TableSchema::from_rows(&rows).to_markdown()
            ),
            Err(e) => error_text("Failed to describe table", &e),
        }
    }

    async fn show_create_table(&self, input: ShowCreateTableInput) -> String {
        let table = match self.client.table_ref(&input.table) {
            Ok(table) => table,
            Err(e) => return error_text("Failed to get DDL", &e),
        };
        match self.client.show_create_table(&table).await {
            Ok(ddl) if ddl.is_empty() => format!("No DDL returned for {table}"),
            Ok(ddl) => format!("DDL for {table}:\n\n```sql\n{ddl}\n```"),
            Err(e) => error_text("Failed to get DDL", &e),
        }
    }
}

//! Warehouse client facade.
//!
//! Composes submission, polling and pagination into the operations the tool
//! layer exposes. Table name qualification happens here and nowhere below.

use std::fmt;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use tracing::{info, warn};

use super::{
    await_completion, fetch_results, normalize_describe_rows, prepare_statement, AthenaService,
    GatewayService, QueryResult, QueryService, QueryState, SchemaRow, Value,
};
use crate::config::WarehouseConfig;
use crate::error::{InsightsError, Result};

/// Row cap used when describing a table.
const DESCRIBE_ROW_CAP: usize = 500;

/// Row cap used when fetching DDL text.
const DDL_ROW_CAP: usize = 1000;

/// Column `SHOW TABLES` reports table names in.
const TABLE_NAME_COLUMN: &str = "tab_name";

/// How a single query should be bounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// Client-side cap on returned rows.
    pub max_rows: Option<usize>,

    /// Also inject a server-side `LIMIT` when the statement allows it.
    pub enforce_limit: bool,
}

impl QueryOptions {
    /// Caps returned rows without touching the statement.
    pub fn capped(max_rows: usize) -> Self {
        Self {
            max_rows: Some(max_rows),
            enforce_limit: false,
        }
    }

    /// Caps returned rows and wraps the statement in a `LIMIT`.
    pub fn limited(max_rows: usize) -> Self {
        Self {
            max_rows: Some(max_rows),
            enforce_limit: true,
        }
    }
}

fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_\-]*$").expect("valid regex"))
}

fn check_identifier(kind: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(InsightsError::invalid_input(format!("{kind} name is empty")));
    }
    if !identifier_pattern().is_match(name) {
        return Err(InsightsError::invalid_input(format!(
            "Invalid {kind} name '{name}'"
        )));
    }
    Ok(())
}

/// A table qualified with its database.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableRef {
    pub database: String,
    pub table: String,
}

impl TableRef {
    /// Parses `database.table` or a bare `table` qualified with `default_database`.
    ///
    /// Splits on the first `.` only.
    pub fn parse(name: &str, default_database: &str) -> Result<Self> {
        let name = name.trim();
        let (database, table) = match name.split_once('.') {
            Some((database, table)) => (database.trim(), table.trim()),
            None => (default_database.trim(), name),
        };

        check_identifier("database", database)?;
        check_identifier("table", table)?;

        Ok(Self {
            database: database.to_string(),
            table: table.to_string(),
        })
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.table)
    }
}

/// Client for running queries against the warehouse.
///
/// Holds no per-query state; concurrent calls each drive their own
/// execution.
#[derive(Clone)]
pub struct WarehouseClient {
    config: WarehouseConfig,
    service: Arc<dyn QueryService>,
}

impl fmt::Debug for WarehouseClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WarehouseClient")
            .field("warehouse", &self.config.display_string())
            .finish_non_exhaustive()
    }
}

impl WarehouseClient {
    /// Creates a client over an existing query service.
    pub fn new(config: WarehouseConfig, service: Arc<dyn QueryService>) -> Self {
        Self { config, service }
    }

    /// Creates a client for the remote service described by `config`.
    ///
    /// Uses the bearer-token gateway when a token is configured, and the
    /// AWS SDK with the default credential chain otherwise.
    pub async fn connect(config: WarehouseConfig) -> Result<Self> {
        config.validate()?;
        let service: Arc<dyn QueryService> = if config.uses_gateway() {
            info!("Warehouse via gateway: {}", config.display_string());
            Arc::new(GatewayService::new(&config)?)
        } else {
            info!("Warehouse: {}", config.display_string());
            Arc::new(AthenaService::from_config(&config).await?)
        };
        Ok(Self::new(config, service))
    }

    pub fn config(&self) -> &WarehouseConfig {
        &self.config
    }

    pub fn default_database(&self) -> &str {
        &self.config.database
    }

    /// Resolves a possibly unqualified table name.
    pub fn table_ref(&self, name: &str) -> Result<TableRef> {
        TableRef::parse(name, &self.config.database)
    }

    /// Runs `sql` to completion and returns its results.
    ///
    /// FAILED and CANCELLED executions become [`InsightsError::QueryFailed`]
    /// carrying the service's reason.
    pub async fn execute_query(&self, sql: &str, options: QueryOptions) -> Result<QueryResult> {
        let statement = if options.enforce_limit {
            prepare_statement(sql, options.max_rows)
        } else {
            sql.to_string()
        };

        let execution_id = self
            .service
            .submit(&statement, &self.config.execution_context())
            .await?;

        let state = await_completion(
            self.service.as_ref(),
            &execution_id,
            self.config.poll_interval(),
            self.config.timeout(),
        )
        .await?;

        if state != QueryState::Succeeded {
            let status = self.service.status(&execution_id).await?;
            let reason = status
                .reason
                .unwrap_or_else(|| "Unknown error".to_string());
            warn!(%execution_id, %state, %reason, "Query did not succeed");
            return Err(InsightsError::QueryFailed {
                execution_id,
                state,
                reason,
            });
        }

        let result = fetch_results(
            self.service.as_ref(),
            &execution_id,
            options.max_rows,
            self.config.page_size,
        )
        .await?;

        info!(
            %execution_id,
            rows = result.row_count(),
            "Query succeeded"
        );
        Ok(result)
    }

    /// Lists tables in `database`, or the default database.
    pub async fn list_tables(&self, database: Option<&str>) -> Result<Vec<String>> {
        let database = database.unwrap_or(&self.config.database).trim();
        check_identifier("database", database)?;

        let result = self
            .execute_query(&format!("SHOW TABLES IN {database}"), QueryOptions::default())
            .await?;

        let column = result.column_index(TABLE_NAME_COLUMN).unwrap_or(0);
        Ok(result
            .rows()
            .iter()
            .filter_map(|row| row.get(column).and_then(Value::as_str))
            .map(str::to_string)
            .collect())
    }

    /// Describes a table's columns.
    ///
    /// Section headers such as `# Partition Information` are kept; callers
    /// wanting only columns should filter with [`SchemaRow::is_column`].
    pub async fn describe_table(&self, table: &TableRef) -> Result<Vec<SchemaRow>> {
        let result = self
            .execute_query(
                &format!("DESCRIBE {table}"),
                QueryOptions::capped(DESCRIBE_ROW_CAP),
            )
            .await?;
        Ok(normalize_describe_rows(&result))
    }

    /// Returns the `CREATE TABLE` statement for a table.
    pub async fn show_create_table(&self, table: &TableRef) -> Result<String> {
        let result = self
            .execute_query(
                &format!("SHOW CREATE TABLE {table}"),
                QueryOptions::capped(DDL_ROW_CAP),
            )
            .await?;

        // One line of DDL per row in the first column.
        let lines: Vec<&str> = result
            .rows()
            .iter()
            .filter_map(|row| row.first().and_then(Value::as_str))
            .collect();
        Ok(lines.join("\n").trim_end().to_string())
    }

    /// Returns up to `limit` rows from a table.
    pub async fn sample_rows(&self, table: &TableRef, limit: usize) -> Result<QueryResult> {
        self.execute_query(
            &format!("SELECT * FROM {table} LIMIT {limit}"),
            QueryOptions::default(),
        )
        .await
    }
}

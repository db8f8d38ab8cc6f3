//! Query execution and result types.
//!
//! Defines the structures exchanged with the remote query service and the
//! materialized result handed back to callers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Lifecycle state of a remote query execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QueryState {
    /// Accepted by the service and not yet finished (includes queued).
    Running,
    /// Finished successfully; results are available.
    Succeeded,
    /// Finished with an error.
    Failed,
    /// Cancelled before finishing.
    Cancelled,
}

impl QueryState {
    /// Returns true if no further transitions can occur from this state.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }

    /// Returns the state as the service spells it.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "RUNNING",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Parses a state reported by the service.
    ///
    /// `QUEUED` is folded into `Running` since both are non-terminal.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "QUEUED" | "RUNNING" => Some(Self::Running),
            "SUCCEEDED" => Some(Self::Succeeded),
            "FAILED" => Some(Self::Failed),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for QueryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status snapshot of an execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryStatus {
    pub state: QueryState,
    /// Service-supplied reason for the last state change, when any.
    pub reason: Option<String>,
}

impl QueryStatus {
    pub fn new(state: QueryState) -> Self {
        Self {
            state,
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// Where a statement runs: default database and workgroup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionContext {
    pub database: String,
    pub workgroup: String,
}

/// Column metadata as declared by the service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMeta {
    /// Raw field name.
    pub name: String,

    /// Display label; preferred over the name when present and non-empty.
    pub label: Option<String>,

    /// Declared engine type (e.g. `varchar`, `bigint`).
    pub data_type: String,
}

impl ColumnMeta {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: None,
            data_type: data_type.into(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Name callers see for this column.
    pub fn display_name(&self) -> &str {
        match self.label.as_deref() {
            Some(label) if !label.is_empty() => label,
            _ => &self.name,
        }
    }
}

/// One page request against a finished execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub max_results: u32,
    pub next_token: Option<String>,
}

/// One page of raw results as the service returns it.
///
/// On the first page of an execution the first row holds the column headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultPage {
    pub columns: Vec<ColumnMeta>,
    pub rows: Vec<Vec<Option<String>>>,
    pub next_token: Option<String>,
}

/// Execution statistics reported by the service.
///
/// Kept as an opaque key/value bag; only a couple of keys get typed accessors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionStatistics {
    values: BTreeMap<String, serde_json::Value>,
}

impl ExecutionStatistics {
    pub const DATA_SCANNED_BYTES: &'static str = "DataScannedInBytes";
    pub const TOTAL_EXECUTION_MILLIS: &'static str = "TotalExecutionTimeInMillis";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.values.get(key)
    }

    pub fn data_scanned_bytes(&self) -> Option<u64> {
        self.get(Self::DATA_SCANNED_BYTES).and_then(|v| v.as_u64())
    }

    pub fn total_execution_millis(&self) -> Option<u64> {
        self.get(Self::TOTAL_EXECUTION_MILLIS).and_then(|v| v.as_u64())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &serde_json::Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl From<BTreeMap<String, serde_json::Value>> for ExecutionStatistics {
    fn from(values: BTreeMap<String, serde_json::Value>) -> Self {
        Self { values }
    }
}

/// A single decoded cell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// The service returned no value for this cell.
    #[default]
    Null,

    /// Text-decoded value.
    String(String),
}

impl Value {
    /// Returns true if this value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Null => None,
            Value::String(s) => Some(s),
        }
    }

    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::String(s) => s.clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_display_string())
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Option<String>> for Value {
    fn from(v: Option<String>) -> Self {
        v.map_or(Value::Null, Value::String)
    }
}

/// A row of values, positionally aligned with the result's columns.
pub type Row = Vec<Value>;

/// Materialized output of a finished execution.
///
/// Every row holds exactly one value per declared column; rows are padded or
/// cut on construction so this holds for the lifetime of the result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    execution_id: String,
    state: QueryState,
    columns: Vec<String>,
    rows: Vec<Row>,
    statistics: Option<ExecutionStatistics>,
}

impl QueryResult {
    /// Creates a succeeded result with the given columns and rows.
    pub fn new(execution_id: impl Into<String>, columns: Vec<String>, rows: Vec<Row>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Value::Null);
                row
            })
            .collect();

        Self {
            execution_id: execution_id.into(),
            state: QueryState::Succeeded,
            columns,
            rows,
            statistics: None,
        }
    }

    pub fn with_statistics(mut self, statistics: Option<ExecutionStatistics>) -> Self {
        self.statistics = statistics;
        self
    }

    pub fn execution_id(&self) -> &str {
        &self.execution_id
    }

    pub fn state(&self) -> QueryState {
        self.state
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn statistics(&self) -> Option<&ExecutionStatistics> {
        self.statistics.as_ref()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Returns the row at `index` as a name-addressable record.
    pub fn record(&self, index: usize) -> Option<Record<'_>> {
        self.rows.get(index).map(|values| Record {
            columns: &self.columns,
            values,
        })
    }

    /// Iterates over all rows as records.
    pub fn records(&self) -> impl Iterator<Item = Record<'_>> {
        self.rows.iter().map(|values| Record {
            columns: &self.columns,
            values,
        })
    }
}

/// Borrowed view of one row keyed by column name.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    columns: &'a [String],
    values: &'a [Value],
}

impl<'a> Record<'a> {
    pub fn get(&self, column: &str) -> Option<&'a Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.values.get(i))
    }

    /// Text of a column, `None` when the column is absent or NULL.
    pub fn text(&self, column: &str) -> Option<&'a str> {
        self.get(column).and_then(Value::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Column/value pairs in declared column order.
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a Value)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }
}

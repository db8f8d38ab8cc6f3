//! Mock query service for testing.
//!
//! Provides a scripted, in-memory stand-in for the remote engine. Results are
//! served the way the real service serves them: the first page starts with a
//! header row and pages are linked by continuation tokens.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::{
    ColumnMeta, ExecutionContext, ExecutionStatistics, PageRequest, QueryService, QueryState,
    QueryStatus, ResultPage,
};
use crate::error::{InsightsError, Result};

/// Scripted behaviour of one execution.
#[derive(Debug, Clone)]
pub struct MockExecution {
    columns: Vec<ColumnMeta>,
    rows: Vec<Vec<Option<String>>>,
    final_state: QueryState,
    reason: Option<String>,
    running_polls: Option<u32>,
    statistics: Option<ExecutionStatistics>,
    fail_statistics: bool,
    fail_results: Option<String>,
}

impl MockExecution {
    fn with_state(final_state: QueryState) -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            final_state,
            reason: None,
            running_polls: Some(0),
            statistics: None,
            fail_statistics: false,
            fail_results: None,
        }
    }

    /// An execution that succeeds with the given columns and data rows.
    ///
    /// `rows` excludes the header; the mock adds it to the first page.
    pub fn succeeded(columns: Vec<ColumnMeta>, rows: Vec<Vec<Option<String>>>) -> Self {
        Self {
            columns,
            rows,
            ..Self::with_state(QueryState::Succeeded)
        }
    }

    /// Shorthand for a succeeded execution of varchar columns with text cells.
    pub fn table(columns: &[&str], rows: &[&[&str]]) -> Self {
        Self::succeeded(
            columns
                .iter()
                .map(|c| ColumnMeta::new(*c, "varchar"))
                .collect(),
            rows.iter()
                .map(|r| r.iter().map(|v| Some(v.to_string())).collect())
                .collect(),
        )
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
            ..Self::with_state(QueryState::Failed)
        }
    }

    pub fn cancelled() -> Self {
        Self::with_state(QueryState::Cancelled)
    }

    pub fn running_forever() -> Self {
        Self {
            running_polls: None,
            ..Self::with_state(QueryState::Running)
        }
    }

    /// Reports RUNNING for the first `polls` status calls.
    pub fn running_for(mut self, polls: u32) -> Self {
        self.running_polls = Some(polls);
        self
    }

    pub fn with_statistics(mut self, statistics: ExecutionStatistics) -> Self {
        self.statistics = Some(statistics);
        self
    }

    /// Makes the statistics call fail.
    pub fn failing_statistics(mut self) -> Self {
        self.fail_statistics = true;
        self
    }

    /// Makes every results call fail with `message`.
    pub fn failing_results(mut self, message: impl Into<String>) -> Self {
        self.fail_results = Some(message.into());
        self
    }

    /// All rows served by the results call: header first, then data.
    fn served_rows(&self) -> Vec<Vec<Option<String>>> {
        let header = self
            .columns
            .iter()
            .map(|c| Some(c.display_name().to_string()))
            .collect();
        std::iter::once(header).chain(self.rows.iter().cloned()).collect()
    }
}

#[derive(Debug)]
struct ExecutionEntry {
    script: MockExecution,
    sql: String,
    status_calls: u32,
    page_requests: Vec<PageRequest>,
}

#[derive(Debug, Default)]
struct MockState {
    next_id: u64,
    executions: HashMap<String, ExecutionEntry>,
    queued: Vec<MockExecution>,
    responses: Vec<(String, MockExecution)>,
    submitted: Vec<String>,
    submit_error: Option<String>,
}

/// A mock query service that returns scripted executions.
///
/// Submitted statements are matched, in order, against: the queue filled by
/// [`enqueue`](Self::enqueue), then substring rules added with
/// [`with_response`](Self::with_response), then a default that echoes
/// `SELECT` statements and returns nothing for anything else.
#[derive(Debug, Default)]
pub struct MockQueryService {
    state: Mutex<MockState>,
}

impl MockQueryService {
    /// Creates a new mock service with no scripted executions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mock with a small sales catalog, used by `--mock`.
    pub fn with_demo_catalog() -> Self {
        Self::new()
            .with_response(
                "SHOW TABLES",
                MockExecution::table(&["tab_name"], &[&["orders"], &["customers"]]),
            )
            .with_response(
                "DESCRIBE",
                MockExecution::table(
                    &["col_name", "data_type", "comment"],
                    &[
                        &["order_id", "bigint", "primary key"],
                        &["customer_id", "bigint", ""],
                        &["amount", "decimal(10,2)", "order total"],
                        &["", "", ""],
                        &["# Partition Information", "", ""],
                        &["# col_name", "data_type", "comment"],
                        &["dt", "string", ""],
                    ],
                ),
            )
            .with_response(
                "SHOW CREATE TABLE",
                MockExecution::table(
                    &["createtab_stmt"],
                    &[
                        &["CREATE EXTERNAL TABLE `orders`("],
                        &["  `order_id` bigint, "],
                        &["  `amount` decimal(10,2))"],
                        &["PARTITIONED BY (`dt` string)"],
                    ],
                ),
            )
    }

    /// Adds a rule: statements containing `pattern` (case-insensitive) get `execution`.
    pub fn with_response(self, pattern: impl Into<String>, execution: MockExecution) -> Self {
        self.lock()
            .responses
            .push((pattern.into().to_lowercase(), execution));
        self
    }

    /// Makes the next submitted statement run `execution`.
    pub fn enqueue(&self, execution: MockExecution) {
        self.lock().queued.push(execution);
    }

    /// Makes the next submit call fail with `message`.
    pub fn fail_next_submit(&self, message: impl Into<String>) {
        self.lock().submit_error = Some(message.into());
    }

    /// Registers an execution directly, as if it had been submitted.
    pub fn add_execution(&self, execution: MockExecution) -> String {
        let mut state = self.lock();
        Self::register(&mut state, execution, String::new())
    }

    /// Statements received by `submit`, in order.
    pub fn submitted_sql(&self) -> Vec<String> {
        self.lock().submitted.clone()
    }

    /// Number of status calls made for `execution_id`.
    pub fn status_calls(&self, execution_id: &str) -> u32 {
        self.lock()
            .executions
            .get(execution_id)
            .map_or(0, |e| e.status_calls)
    }

    /// Page requests made for `execution_id`, in order.
    pub fn page_requests(&self, execution_id: &str) -> Vec<PageRequest> {
        self.lock()
            .executions
            .get(execution_id)
            .map(|e| e.page_requests.clone())
            .unwrap_or_default()
    }

    /// SQL text an execution was submitted with.
    pub fn execution_sql(&self, execution_id: &str) -> Option<String> {
        self.lock()
            .executions
            .get(execution_id)
            .map(|e| e.sql.clone())
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn register(state: &mut MockState, script: MockExecution, sql: String) -> String {
        state.next_id += 1;
        let id = format!("mock-{:04}", state.next_id);
        state.executions.insert(
            id.clone(),
            ExecutionEntry {
                script,
                sql,
                status_calls: 0,
                page_requests: Vec::new(),
            },
        );
        id
    }

    fn default_response(sql: &str) -> MockExecution {
        if sql.trim_start().to_uppercase().starts_with("SELECT") {
            let echoed = format!("Mock result for: {}", sql);
            MockExecution::table(&["result"], &[&[echoed.as_str()]])
        } else {
            MockExecution::succeeded(vec![], vec![])
        }
    }

    fn entry<'a>(state: &'a mut MockState, execution_id: &str) -> Result<&'a mut ExecutionEntry> {
        state.executions.get_mut(execution_id).ok_or_else(|| {
            InsightsError::fetch(format!(
                "InvalidRequestException: QueryExecution {execution_id} was not found"
            ))
        })
    }
}

#[async_trait]
impl QueryService for MockQueryService {
    async fn submit(&self, sql: &str, _context: &ExecutionContext) -> Result<String> {
        let mut state = self.lock();
        if let Some(message) = state.submit_error.take() {
            return Err(InsightsError::submission(message));
        }

        state.submitted.push(sql.to_string());

        let script = if state.queued.is_empty() {
            let lowered = sql.to_lowercase();
            state
                .responses
                .iter()
                .find(|(pattern, _)| lowered.contains(pattern.as_str()))
                .map(|(_, execution)| execution.clone())
                .unwrap_or_else(|| Self::default_response(sql))
        } else {
            state.queued.remove(0)
        };

        Ok(Self::register(&mut state, script, sql.to_string()))
    }

    async fn status(&self, execution_id: &str) -> Result<QueryStatus> {
        let mut state = self.lock();
        let entry = Self::entry(&mut state, execution_id)?;
        entry.status_calls += 1;

        let still_running = match entry.script.running_polls {
            Some(polls) => entry.status_calls <= polls,
            None => true,
        };
        if still_running {
            return Ok(QueryStatus::new(QueryState::Running));
        }

        let mut status = QueryStatus::new(entry.script.final_state);
        status.reason = entry.script.reason.clone();
        Ok(status)
    }

    async fn results(&self, execution_id: &str, page: &PageRequest) -> Result<ResultPage> {
        let mut state = self.lock();
        let entry = Self::entry(&mut state, execution_id)?;
        entry.page_requests.push(page.clone());

        if let Some(message) = &entry.script.fail_results {
            return Err(InsightsError::fetch(message.clone()));
        }
        if entry.script.final_state != QueryState::Succeeded {
            return Err(InsightsError::fetch(format!(
                "InvalidRequestException: Query has not yet finished. Current state: {}",
                entry.script.final_state
            )));
        }

        let offset = match &page.next_token {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| InsightsError::fetch(format!("Invalid NextToken: {token}")))?,
            None => 0,
        };

        let served = entry.script.served_rows();
        let end = (offset + page.max_results as usize).min(served.len());
        let rows = served.get(offset..end).unwrap_or_default().to_vec();
        let next_token = (end < served.len()).then(|| end.to_string());

        Ok(ResultPage {
            columns: entry.script.columns.clone(),
            rows,
            next_token,
        })
    }

    async fn statistics(&self, execution_id: &str) -> Result<Option<ExecutionStatistics>> {
        let mut state = self.lock();
        let entry = Self::entry(&mut state, execution_id)?;
        if entry.script.fail_statistics {
            return Err(InsightsError::fetch("statistics unavailable"));
        }
        Ok(entry.script.statistics.clone())
    }
}

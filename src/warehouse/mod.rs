//! Asynchronous warehouse query client.
//!
//! Statements are submitted to a remote engine, polled until they reach a
//! terminal state, and their results paged back into a [`QueryResult`].
//! The remote engine sits behind the [`QueryService`] trait so the client
//! can run against the real service or an in-memory mock.

mod athena;
mod client;
mod gateway;
mod mock;
mod paginator;
mod poller;
mod schema;
mod statement;
mod types;

pub use athena::AthenaService;
pub use client::{QueryOptions, TableRef, WarehouseClient};
pub use gateway::GatewayService;
pub use mock::{MockExecution, MockQueryService};
pub use paginator::fetch_results;
pub use poller::await_completion;
pub use schema::{normalize_describe_rows, SchemaRow, TableSchema, SECTION_MARKER};
pub use statement::{leading_keyword, prepare_statement, wrap_with_limit};
pub use types::{
    ColumnMeta, ExecutionContext, ExecutionStatistics, PageRequest, QueryResult, QueryState,
    QueryStatus, Record, ResultPage, Row, Value,
};

use crate::error::Result;
use async_trait::async_trait;

/// Largest page the service hands out per results call.
pub const SERVICE_MAX_PAGE_SIZE: u32 = 1000;

/// Operations consumed from the remote query engine.
///
/// Implementations do not retry; every error is returned as-is.
#[async_trait]
pub trait QueryService: Send + Sync {
    /// Starts an execution of `sql` and returns its opaque id.
    async fn submit(&self, sql: &str, context: &ExecutionContext) -> Result<String>;

    /// Returns the current status of an execution.
    async fn status(&self, execution_id: &str) -> Result<QueryStatus>;

    /// Returns one page of results for a finished execution.
    async fn results(&self, execution_id: &str, page: &PageRequest) -> Result<ResultPage>;

    /// Returns execution statistics, if the service reports any.
    async fn statistics(&self, execution_id: &str) -> Result<Option<ExecutionStatistics>>;
}

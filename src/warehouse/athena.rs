//! Query service backed by the AWS SDK for Athena.
//!
//! Credentials come from the default AWS provider chain (environment,
//! profile, SSO, instance metadata) and every request is SigV4-signed by
//! the SDK. The SDK's own retries are disabled; failures are returned as-is.

use std::time::Duration;

use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_config::BehaviorVersion;
use aws_sdk_athena::config::Region;
use aws_sdk_athena::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_athena::types::QueryExecutionContext;
use aws_sdk_athena::Client;
use tracing::{debug, info};

use super::{
    ColumnMeta, ExecutionContext, ExecutionStatistics, PageRequest, QueryService, QueryState,
    QueryStatus, ResultPage,
};
use crate::config::WarehouseConfig;
use crate::error::{InsightsError, Result};

/// Query service talking to Athena through the AWS SDK.
#[derive(Debug, Clone)]
pub struct AthenaService {
    client: Client,
}

impl AthenaService {
    /// Wraps an already configured SDK client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds an SDK client from `config` and the default credential chain.
    pub async fn from_config(config: &WarehouseConfig) -> Result<Self> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .retry_config(RetryConfig::disabled())
            .timeout_config(
                TimeoutConfig::builder()
                    .operation_attempt_timeout(Duration::from_secs(config.request_timeout_secs))
                    .build(),
            );
        if let Some(endpoint) = config.endpoint_url()? {
            loader = loader.endpoint_url(endpoint.as_str());
        }

        let sdk_config = loader.load().await;
        Ok(Self::new(Client::new(&sdk_config)))
    }
}

/// Builds a readable message from an SDK failure.
///
/// Service errors read `<Code>: <message>`; transport failures keep the
/// whole error chain.
fn error_message<E, R>(operation: &str, error: &SdkError<E, R>) -> String
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug + 'static,
{
    match (error.code(), error.message()) {
        (Some(code), Some(message)) => format!("{code}: {message}"),
        (Some(code), None) => code.to_string(),
        _ => format!("{operation} request failed: {}", DisplayErrorContext(error)),
    }
}

#[async_trait]
impl QueryService for AthenaService {
    async fn submit(&self, sql: &str, context: &ExecutionContext) -> Result<String> {
        let output = self
            .client
            .start_query_execution()
            .query_string(sql)
            .query_execution_context(
                QueryExecutionContext::builder()
                    .database(&context.database)
                    .build(),
            )
            .work_group(&context.workgroup)
            .send()
            .await
            .map_err(|e| {
                InsightsError::submission(error_message("StartQueryExecution", &e))
            })?;

        let execution_id = output
            .query_execution_id()
            .ok_or_else(|| InsightsError::submission("StartQueryExecution returned no id"))?
            .to_string();

        info!(
            %execution_id,
            workgroup = %context.workgroup,
            "Submitted query"
        );
        Ok(execution_id)
    }

    async fn status(&self, execution_id: &str) -> Result<QueryStatus> {
        let output = self
            .client
            .get_query_execution()
            .query_execution_id(execution_id)
            .send()
            .await
            .map_err(|e| InsightsError::fetch(error_message("GetQueryExecution", &e)))?;

        let status = output.query_execution().and_then(|e| e.status());
        let raw_state = status
            .and_then(|s| s.state())
            .map(|s| s.as_str())
            .unwrap_or_default();
        let state = QueryState::parse(raw_state).ok_or_else(|| {
            InsightsError::fetch(format!(
                "Unknown query state '{raw_state}' for {execution_id}"
            ))
        })?;

        Ok(QueryStatus {
            state,
            reason: status
                .and_then(|s| s.state_change_reason())
                .map(str::to_string),
        })
    }

    async fn results(&self, execution_id: &str, page: &PageRequest) -> Result<ResultPage> {
        let output = self
            .client
            .get_query_results()
            .query_execution_id(execution_id)
            .max_results(i32::try_from(page.max_results).unwrap_or(i32::MAX))
            .set_next_token(page.next_token.clone())
            .send()
            .await
            .map_err(|e| InsightsError::fetch(error_message("GetQueryResults", &e)))?;

        let result_set = output.result_set();
        let columns = result_set
            .and_then(|r| r.result_set_metadata())
            .map(|metadata| {
                metadata
                    .column_info()
                    .iter()
                    .map(|c| ColumnMeta {
                        name: c.name().to_string(),
                        label: c.label().map(str::to_string),
                        data_type: c.r#type().to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        let rows: Vec<Vec<Option<String>>> = result_set
            .map(|r| {
                r.rows()
                    .iter()
                    .map(|row| {
                        row.data()
                            .iter()
                            .map(|d| d.var_char_value().map(str::to_string))
                            .collect()
                    })
                    .collect()
            })
            .unwrap_or_default();

        debug!(
            execution_id,
            rows = rows.len(),
            has_more = output.next_token().is_some(),
            "Received result page"
        );

        Ok(ResultPage {
            columns,
            rows,
            next_token: output.next_token().map(str::to_string),
        })
    }

    async fn statistics(&self, execution_id: &str) -> Result<Option<ExecutionStatistics>> {
        let output = self
            .client
            .get_query_execution()
            .query_execution_id(execution_id)
            .send()
            .await
            .map_err(|e| InsightsError::fetch(error_message("GetQueryExecution", &e)))?;

        Ok(output
            .query_execution()
            .and_then(|e| e.statistics())
            .map(|s| {
                let mut statistics = ExecutionStatistics::new();
                if let Some(bytes) = s.data_scanned_in_bytes() {
                    statistics = statistics.with(ExecutionStatistics::DATA_SCANNED_BYTES, bytes);
                }
                if let Some(millis) = s.total_execution_time_in_millis() {
                    statistics =
                        statistics.with(ExecutionStatistics::TOTAL_EXECUTION_MILLIS, millis);
                }
                statistics
            }))
    }
}

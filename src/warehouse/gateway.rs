//! Query service for a signing gateway in front of the Athena API.
//!
//! Speaks the JSON 1.1 protocol: every operation is a `POST /` with an
//! `X-Amz-Target` header naming it. The gateway at the configured endpoint
//! authenticates the bearer token and signs the request onwards to AWS.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use super::{
    ColumnMeta, ExecutionContext, ExecutionStatistics, PageRequest, QueryService, QueryState,
    QueryStatus, ResultPage,
};
use crate::config::WarehouseConfig;
use crate::error::{InsightsError, Result};

const TARGET_PREFIX: &str = "AmazonAthena";
const CONTENT_TYPE: &str = "application/x-amz-json-1.1";

/// Query service talking to a bearer-token gateway.
#[derive(Debug, Clone)]
pub struct GatewayService {
    client: Client,
    endpoint: Url,
    bearer_token: Option<String>,
}

impl GatewayService {
    /// Creates a service for the endpoint and token in `config`.
    ///
    /// The endpoint is required; there is no default gateway.
    pub fn new(config: &WarehouseConfig) -> Result<Self> {
        let endpoint = config
            .endpoint_url()?
            .ok_or_else(|| InsightsError::config("warehouse.endpoint is required for a gateway"))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| InsightsError::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint,
            bearer_token: config.bearer_token.clone(),
        })
    }

    /// Sends one operation and decodes its response.
    ///
    /// `wrap` decides which error variant failures of this operation become.
    async fn call<Req, Resp>(
        &self,
        operation: &str,
        request: &Req,
        wrap: fn(String) -> InsightsError,
    ) -> Result<Resp>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let mut builder = self
            .client
            .post(self.endpoint.clone())
            .header("X-Amz-Target", format!("{TARGET_PREFIX}.{operation}"))
            .header("Content-Type", CONTENT_TYPE)
            .json(request);
        if let Some(token) = &self.bearer_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                wrap(format!("{operation} request timed out"))
            } else if e.is_connect() {
                wrap(format!("Failed to connect to {}", self.endpoint))
            } else {
                wrap(format!("{operation} request failed: {e}"))
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| wrap(format!("Failed to read {operation} response: {e}")))?;

        if !status.is_success() {
            return Err(wrap(parse_error(status, &body)));
        }

        serde_json::from_str(&body)
            .map_err(|e| wrap(format!("Failed to parse {operation} response: {e}")))
    }

    async fn get_query_execution(&self, execution_id: &str) -> Result<QueryExecution> {
        let response: GetQueryExecutionResponse = self
            .call(
                "GetQueryExecution",
                &ExecutionIdRequest {
                    query_execution_id: execution_id,
                },
                InsightsError::Fetch,
            )
            .await?;
        Ok(response.query_execution)
    }
}

/// Builds a readable message from an error response body.
fn parse_error(status: reqwest::StatusCode, body: &str) -> String {
    if let Ok(error) = serde_json::from_str::<ErrorResponse>(body) {
        let kind = error
            .kind
            .as_deref()
            .map(|k| k.rsplit('#').next().unwrap_or(k))
            .unwrap_or("Error");
        if let Some(message) = error.message.or(error.message_upper) {
            return format!("{kind}: {message}");
        }
        return format!("{kind} ({status})");
    }
    format!("Service error ({status}): {body}")
}

#[async_trait]
impl QueryService for GatewayService {
    async fn submit(&self, sql: &str, context: &ExecutionContext) -> Result<String> {
        let request = StartQueryExecutionRequest {
            query_string: sql,
            query_execution_context: ExecutionContextBody {
                database: &context.database,
            },
            work_group: &context.workgroup,
        };

        let response: StartQueryExecutionResponse = self
            .call("StartQueryExecution", &request, InsightsError::Submission)
            .await?;

        info!(
            execution_id = %response.query_execution_id,
            workgroup = %context.workgroup,
            "Submitted query"
        );
        Ok(response.query_execution_id)
    }

    async fn status(&self, execution_id: &str) -> Result<QueryStatus> {
        let execution = self.get_query_execution(execution_id).await?;
        let state = QueryState::parse(&execution.status.state).ok_or_else(|| {
            InsightsError::fetch(format!(
                "Unknown query state '{}' for {execution_id}",
                execution.status.state
            ))
        })?;

        Ok(QueryStatus {
            state,
            reason: execution.status.state_change_reason,
        })
    }

    async fn results(&self, execution_id: &str, page: &PageRequest) -> Result<ResultPage> {
        let request = GetQueryResultsRequest {
            query_execution_id: execution_id,
            max_results: page.max_results,
            next_token: page.next_token.as_deref(),
        };
        let response: GetQueryResultsResponse = self
            .call("GetQueryResults", &request, InsightsError::Fetch)
            .await?;

        debug!(
            execution_id,
            rows = response.result_set.rows.len(),
            has_more = response.next_token.is_some(),
            "Received result page"
        );

        Ok(ResultPage {
            columns: response
                .result_set
                .result_set_metadata
                .column_info
                .into_iter()
                .map(|c| ColumnMeta {
                    name: c.name,
                    label: c.label,
                    data_type: c.kind,
                })
                .collect(),
            rows: response
                .result_set
                .rows
                .into_iter()
                .map(|row| row.data.into_iter().map(|d| d.var_char_value).collect())
                .collect(),
            next_token: response.next_token,
        })
    }

    async fn statistics(&self, execution_id: &str) -> Result<Option<ExecutionStatistics>> {
        let execution = self.get_query_execution(execution_id).await?;
        Ok(execution.statistics.map(ExecutionStatistics::from))
    }
}

// Wire types.

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct StartQueryExecutionRequest<'a> {
    query_string: &'a str,
    query_execution_context: ExecutionContextBody<'a>,
    work_group: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ExecutionContextBody<'a> {
    database: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StartQueryExecutionResponse {
    query_execution_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ExecutionIdRequest<'a> {
    query_execution_id: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetQueryExecutionResponse {
    query_execution: QueryExecution,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct QueryExecution {
    status: ExecutionStatus,
    #[serde(default)]
    statistics: Option<BTreeMap<String, serde_json::Value>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ExecutionStatus {
    state: String,
    #[serde(default)]
    state_change_reason: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct GetQueryResultsRequest<'a> {
    query_execution_id: &'a str,
    max_results: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_token: Option<&'a str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetQueryResultsResponse {
    result_set: ResultSet,
    #[serde(default)]
    next_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ResultSet {
    #[serde(default)]
    rows: Vec<ResultRow>,
    #[serde(default)]
    result_set_metadata: ResultSetMetadata,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
struct ResultSetMetadata {
    #[serde(default)]
    column_info: Vec<ColumnInfo>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ColumnInfo {
    name: String,
    #[serde(default)]
    label: Option<String>,
    #[serde(rename = "Type", default)]
    kind: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ResultRow {
    #[serde(default)]
    data: Vec<Datum>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Datum {
    #[serde(default)]
    var_char_value: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    #[serde(rename = "__type")]
    kind: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(rename = "Message", default)]
    message_upper: Option<String>,
}

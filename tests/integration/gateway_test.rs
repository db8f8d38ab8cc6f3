//! Bearer-token gateway tests against a local HTTP server.

use pretty_assertions::assert_eq;
use serde_json::json;
use warehouse_insights::config::WarehouseConfig;
use warehouse_insights::error::InsightsError;
use warehouse_insights::warehouse::{
    fetch_results, ExecutionContext, GatewayService, QueryService, QueryState, Value,
};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn service_for(server: &MockServer) -> GatewayService {
    let config = WarehouseConfig {
        endpoint: Some(server.uri()),
        bearer_token: Some("t0k".to_string()),
        ..Default::default()
    };
    GatewayService::new(&config).unwrap()
}

fn context() -> ExecutionContext {
    ExecutionContext {
        database: "sales".to_string(),
        workgroup: "primary".to_string(),
    }
}

#[tokio::test]
async fn test_submit_sends_bearer_token_and_target() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/"))
        .and(header("authorization", "Bearer t0k"))
        .and(header("x-amz-target", "AmazonAthena.StartQueryExecution"))
        .and(header("content-type", "application/x-amz-json-1.1"))
        .and(body_partial_json(json!({
            "QueryString": "SHOW TABLES IN sales",
            "WorkGroup": "primary"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "QueryExecutionId": "gw-1" })))
        .expect(1)
        .mount(&server)
        .await;

    let id = service_for(&server)
        .submit("SHOW TABLES IN sales", &context())
        .await
        .unwrap();

    assert_eq!(id, "gw-1");
}

#[tokio::test]
async fn test_submit_rejection_is_submission_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "__type": "com.amazonaws.athena#InvalidRequestException",
            "Message": "Queries of this type are not supported"
        })))
        .mount(&server)
        .await;

    let err = service_for(&server)
        .submit("VACUUM t", &context())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        InsightsError::Submission(ref m)
            if m == "InvalidRequestException: Queries of this type are not supported"
    ));
}

#[tokio::test]
async fn test_two_pages_decode_missing_values_as_null() {
    let server = MockServer::start().await;
    let metadata = json!({
        "ColumnInfo": [
            { "Name": "id", "Type": "bigint" },
            { "Name": "note", "Type": "varchar" }
        ]
    });
    Mock::given(method("POST"))
        .and(header("x-amz-target", "AmazonAthena.GetQueryResults"))
        .and(body_partial_json(json!({ "NextToken": "t-2" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ResultSet": {
                "Rows": [{ "Data": [{ "VarCharValue": "2" }, {}] }],
                "ResultSetMetadata": metadata.clone()
            }
        })))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(header("x-amz-target", "AmazonAthena.GetQueryResults"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ResultSet": {
                "Rows": [
                    { "Data": [{ "VarCharValue": "id" }, { "VarCharValue": "note" }] },
                    { "Data": [{ "VarCharValue": "1" }, { "VarCharValue": "" }] }
                ],
                "ResultSetMetadata": metadata
            },
            "NextToken": "t-2"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(header("x-amz-target", "AmazonAthena.GetQueryExecution"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .expect(1)
        .mount(&server)
        .await;

    let service = service_for(&server);
    let result = fetch_results(&service, "gw-1", None, 2).await.unwrap();

    assert_eq!(result.columns(), &["id".to_string(), "note".to_string()]);
    assert_eq!(
        result.rows(),
        &[
            vec![Value::from("1"), Value::from("")],
            vec![Value::from("2"), Value::Null],
        ]
    );
    assert!(result.statistics().is_none());
}

#[tokio::test]
async fn test_status_reads_state_and_reason() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("x-amz-target", "AmazonAthena.GetQueryExecution"))
        .and(body_partial_json(json!({ "QueryExecutionId": "gw-1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "QueryExecution": {
                "Status": { "State": "FAILED", "StateChangeReason": "SYNTAX_ERROR: line 1:1" }
            }
        })))
        .mount(&server)
        .await;

    let status = service_for(&server).status("gw-1").await.unwrap();

    assert_eq!(status.state, QueryState::Failed);
    assert_eq!(status.reason.as_deref(), Some("SYNTAX_ERROR: line 1:1"));
}

#[tokio::test]
async fn test_unknown_state_is_fetch_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("x-amz-target", "AmazonAthena.GetQueryExecution"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "QueryExecution": { "Status": { "State": "PAUSED" } }
        })))
        .mount(&server)
        .await;

    let err = service_for(&server).status("gw-1").await.unwrap_err();

    assert!(matches!(err, InsightsError::Fetch(ref m) if m.contains("PAUSED")));
}

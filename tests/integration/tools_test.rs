//! Tool layer integration tests.

use std::fs;
use std::sync::Arc;

use pretty_assertions::assert_eq;
use tempfile::tempdir;
use warehouse_insights::config::ToolsConfig;
use warehouse_insights::knowledge::KnowledgeBase;
use warehouse_insights::tools::ToolRouter;
use warehouse_insights::warehouse::{MockExecution, MockQueryService};

use super::client_with;

fn router(service: Arc<MockQueryService>) -> ToolRouter {
    ToolRouter::new(
        client_with(service, 100),
        KnowledgeBase::new("/nonexistent/knowledge"),
        ToolsConfig::default(),
    )
}

#[tokio::test]
async fn test_run_query_clamps_max_rows() {
    let service = Arc::new(MockQueryService::new());
    let router = router(service.clone());

    let text = router
        .execute("run_query", r#"{"query": "SELECT 1", "max_rows": 5000}"#)
        .await;

    assert!(text.starts_with("Query ID: mock-0001\nColumns: result\nTotal rows: 1"));
    assert_eq!(
        service.submitted_sql(),
        vec!["SELECT * FROM (\nSELECT 1\n) AS _q\nLIMIT 100".to_string()]
    );
}

#[tokio::test]
async fn test_run_query_failure_is_text() {
    let service = Arc::new(MockQueryService::new());
    service.enqueue(MockExecution::failed("TABLE_NOT_FOUND: missing"));
    let router = router(service);

    let text = router
        .execute("run_query", r#"{"query": "SELECT * FROM missing"}"#)
        .await;

    assert_eq!(text, "Query failed: TABLE_NOT_FOUND: missing");
}

#[tokio::test]
async fn test_list_tables_uses_default_database() {
    let service = Arc::new(MockQueryService::with_demo_catalog());
    let router = router(service.clone());

    let text = router.execute("list_tables", "{}").await;

    assert_eq!(text, "Tables in sales:\n  - orders\n  - customers");
    assert_eq!(service.submitted_sql(), vec!["SHOW TABLES IN sales".to_string()]);
}

#[tokio::test]
async fn test_describe_table_with_database_argument() {
    let service = Arc::new(MockQueryService::with_demo_catalog());
    let router = router(service.clone());

    let text = router
        .execute("describe_table", r#"{"table": "orders", "database": "archive"}"#)
        .await;

    assert_eq!(
        text,
        "Schema for archive.orders:\n\n| Column | Type |\n| --- | --- |\n\
         | order_id | bigint |\n| customer_id | bigint |\n| amount | decimal(10,2) |\n\
         | dt | string |"
    );
    assert_eq!(service.submitted_sql(), vec!["DESCRIBE archive.orders".to_string()]);
}

#[tokio::test]
async fn test_describe_table_rejects_injection() {
    let service = Arc::new(MockQueryService::with_demo_catalog());
    let router = router(service.clone());

    let text = router
        .execute("describe_table", r#"{"table": "orders; DROP TABLE x"}"#)
        .await;

    assert!(text.starts_with("Failed to describe table: Invalid input:"), "got: {text}");
    assert!(service.submitted_sql().is_empty());
}

#[tokio::test]
async fn test_table_schema_splits_partitions() {
    let router = router(Arc::new(MockQueryService::with_demo_catalog()));

    let text = router.table_schema("orders").await;

    assert!(text.starts_with("Schema for sales.orders:\n\n**Columns**"));
    assert!(text.contains("| amount | decimal(10,2) | order total |"));
    assert!(text.ends_with("**Partition columns**\n\n| Column | Type | Comment |\n| --- | --- | --- |\n| dt | string |  |"));
}

#[tokio::test]
async fn test_get_sample_data_limits() {
    let service = Arc::new(MockQueryService::new());
    let router = router(service.clone());

    router.execute("get_sample_data", r#"{"table": "orders"}"#).await;
    router
        .execute("get_sample_data", r#"{"table": "analytics.events", "limit": 500}"#)
        .await;

    assert_eq!(
        service.submitted_sql(),
        vec![
            "SELECT * FROM sales.orders LIMIT 5".to_string(),
            "SELECT * FROM analytics.events LIMIT 20".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_show_create_table() {
    let router = router(Arc::new(MockQueryService::with_demo_catalog()));

    let text = router
        .execute("show_create_table", r#"{"table": "orders"}"#)
        .await;

    assert_eq!(
        text,
        "DDL for sales.orders:\n\n```sql\nCREATE EXTERNAL TABLE `orders`(\n  `order_id` bigint, \n\
         \x20 `amount` decimal(10,2))\nPARTITIONED BY (`dt` string)\n```"
    );
}

#[tokio::test]
async fn test_unknown_tool_and_bad_arguments() {
    let router = router(Arc::new(MockQueryService::new()));

    assert_eq!(router.execute("drop_everything", "{}").await, "Unknown tool: drop_everything");
    assert!(router
        .execute("run_query", "not json")
        .await
        .starts_with("Invalid arguments for run_query:"));
}

#[test]
fn test_read_resource() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("domain.txt"), "Orders are placed by customers.").unwrap();

    let router = ToolRouter::new(
        client_with(Arc::new(MockQueryService::new()), 100),
        KnowledgeBase::new(dir.path()),
        ToolsConfig::default(),
    );

    assert_eq!(
        router.read_resource("insights://knowledge/domain"),
        "Orders are placed by customers."
    );
    assert_eq!(router.resources().len(), 4);
}

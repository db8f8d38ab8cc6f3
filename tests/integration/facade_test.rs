//! Query facade integration tests.
//!
//! Tests submission, polling and pagination end to end.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use tokio_test::assert_ok;
use warehouse_insights::error::InsightsError;
use warehouse_insights::warehouse::{
    ColumnMeta, MockExecution, MockQueryService, QueryOptions, QueryState, SchemaRow, Value,
};

use super::client_with;

/// An execution with `rows` rows of (n, label).
fn numbered(rows: usize) -> MockExecution {
    MockExecution::succeeded(
        vec![ColumnMeta::new("n", "integer"), ColumnMeta::new("label", "varchar")],
        (0..rows)
            .map(|i| vec![Some(i.to_string()), Some(format!("row {i}"))])
            .collect(),
    )
}

#[tokio::test]
async fn test_cap_returns_exact_row_count_without_header() {
    for cap in [1, 3, 4, 5, 9, 25] {
        let service = Arc::new(MockQueryService::new());
        service.enqueue(numbered(25));
        let client = client_with(service.clone(), 4);

        let result = client
            .execute_query("SELECT n, label FROM t", QueryOptions::capped(cap))
            .await
            .unwrap();

        assert_eq!(result.row_count(), cap, "cap {cap}");
        assert_eq!(result.columns(), &["n".to_string(), "label".to_string()]);
        assert_eq!(result.rows()[0][0], Value::from("0"));
        assert!(result
            .rows()
            .iter()
            .all(|row| row[0] != Value::from("n")));
    }
}

#[tokio::test]
async fn test_uncapped_fetch_returns_all_rows() {
    let service = Arc::new(MockQueryService::new());
    service.enqueue(numbered(23));
    let client = client_with(service.clone(), 5);

    let result = client
        .execute_query("SELECT n, label FROM t", QueryOptions::default())
        .await
        .unwrap();

    assert_eq!(result.row_count(), 23);
    assert!(result.rows().iter().all(|row| row.len() == 2));
    assert_eq!(
        result.rows().last().map(|row| row[1].clone()),
        Some(Value::from("row 22"))
    );

    // 24 served rows including the header, 5 per page.
    let id = result.execution_id().to_string();
    assert_eq!(service.page_requests(&id).len(), 5);
}

#[tokio::test]
async fn test_short_rows_are_padded_with_null() {
    let service = Arc::new(MockQueryService::new());
    service.enqueue(MockExecution::succeeded(
        vec![ColumnMeta::new("a", "varchar"), ColumnMeta::new("b", "varchar")],
        vec![vec![Some("only".to_string())], vec![Some("x".to_string()), None]],
    ));
    let client = client_with(service, 100);

    let result = client
        .execute_query("SELECT a, b FROM t", QueryOptions::default())
        .await
        .unwrap();

    assert_eq!(
        result.rows(),
        &[
            vec![Value::from("only"), Value::Null],
            vec![Value::from("x"), Value::Null],
        ]
    );
}

#[tokio::test]
async fn test_non_wrappable_statements_are_sent_unchanged() {
    let service = Arc::new(MockQueryService::new());
    let client = client_with(service.clone(), 100);

    let statements = [
        "SHOW TABLES IN sales",
        "  describe sales.orders",
        "EXPLAIN SELECT 1",
        "\n\tInsert INTO t VALUES (1);",
        "CREATE TABLE t (id int)",
    ];
    for sql in statements {
        assert_ok!(client.execute_query(sql, QueryOptions::limited(10)).await);
    }

    assert_eq!(service.submitted_sql(), statements.to_vec());
}

#[tokio::test]
async fn test_wrapped_statement_carries_requested_cap() {
    let service = Arc::new(MockQueryService::new());
    let client = client_with(service.clone(), 100);

    client
        .execute_query("SELECT 1", QueryOptions::limited(1))
        .await
        .unwrap();
    client
        .execute_query("select * from orders;", QueryOptions::limited(42))
        .await
        .unwrap();

    assert_eq!(
        service.submitted_sql(),
        vec![
            "SELECT * FROM (\nSELECT 1\n) AS _q\nLIMIT 1".to_string(),
            "SELECT * FROM (\nselect * from orders\n) AS _q\nLIMIT 42".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_failed_query_reports_reason() {
    let service = Arc::new(MockQueryService::new());
    service.enqueue(MockExecution::failed("SYNTAX_ERROR: line 1:8").running_for(2));
    let client = client_with(service.clone(), 100);

    let err = client
        .execute_query("SELECT nope", QueryOptions::default())
        .await
        .unwrap_err();

    match err {
        InsightsError::QueryFailed {
            execution_id,
            state,
            reason,
        } => {
            assert_eq!(state, QueryState::Failed);
            assert_eq!(reason, "SYNTAX_ERROR: line 1:8");
            assert!(service.page_requests(&execution_id).is_empty());
        }
        other => panic!("expected QueryFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_describe_is_stable_across_calls() {
    let service = Arc::new(MockQueryService::new().with_response(
        "DESCRIBE",
        MockExecution::table(
            &["col_name"],
            &[&["id\tbigint\tprimary key"], &["name\tvarchar\t"]],
        ),
    ));
    let client = client_with(service, 100);
    let table = client.table_ref("users").unwrap();

    let first = client.describe_table(&table).await.unwrap();
    let second = client.describe_table(&table).await.unwrap();

    assert_eq!(
        first,
        vec![
            SchemaRow::new("id", "bigint", "primary key"),
            SchemaRow::new("name", "varchar", ""),
        ]
    );
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_well_formed_describe_passes_through() {
    let service = Arc::new(MockQueryService::with_demo_catalog());
    let client = client_with(service, 100);
    let table = client.table_ref("orders").unwrap();

    let rows = client.describe_table(&table).await.unwrap();

    assert_eq!(rows.len(), 7);
    assert_eq!(rows[0], SchemaRow::new("order_id", "bigint", "primary key"));
    assert_eq!(rows[4], SchemaRow::new("# Partition Information", "", ""));
}

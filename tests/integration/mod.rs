//! Library-level integration tests.

pub mod facade_test;
pub mod gateway_test;
pub mod tools_test;

use std::sync::Arc;

use warehouse_insights::config::WarehouseConfig;
use warehouse_insights::warehouse::{MockQueryService, WarehouseClient};

/// Builds a client over `service` with a fast poll interval.
pub fn client_with(service: Arc<MockQueryService>, page_size: u32) -> WarehouseClient {
    let config = WarehouseConfig {
        database: "sales".to_string(),
        page_size,
        poll_interval_ms: 5,
        ..Default::default()
    };
    WarehouseClient::new(config, service)
}

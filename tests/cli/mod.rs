//! Tests that drive the `insights` binary against the mock warehouse.

pub mod common;
pub mod commands_test;

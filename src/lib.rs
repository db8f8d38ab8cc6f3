//! warehouse-insights: an assistant-facing tool interface over an
//! asynchronous SQL warehouse.
//!
//! This library exposes the core modules for the binary and integration tests.

pub mod cli;
pub mod config;
pub mod error;
pub mod knowledge;
pub mod logging;
pub mod tools;
pub mod warehouse;

//! Error types for warehouse insights.
//!
//! Defines the main error enum used throughout the crate. Every failure of
//! the query client surfaces as one of these variants; nothing is retried.

use std::time::Duration;

use thiserror::Error;

use crate::warehouse::QueryState;

/// Main error type for warehouse operations.
#[derive(Error, Debug)]
pub enum InsightsError {
    /// The service rejected the statement at submit time (transport, auth, validation).
    #[error("Submission error: {0}")]
    Submission(String),

    /// The local polling deadline passed before the execution finished.
    ///
    /// The remote execution may still be running.
    #[error("Query {execution_id} timed out after {}s", timeout.as_secs_f64())]
    Timeout {
        execution_id: String,
        timeout: Duration,
    },

    /// The execution reached FAILED or CANCELLED on the service.
    #[error("Query failed: {reason}")]
    QueryFailed {
        execution_id: String,
        state: QueryState,
        reason: String,
    },

    /// Status or result retrieval failed after a successful submission.
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Configuration errors (invalid config file, out-of-range values, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid caller input (malformed tool arguments, empty table names, etc.)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Reading or writing local files failed.
    #[error("I/O error: {0}")]
    Io(String),

    /// Internal errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl InsightsError {
    /// Creates a submission error with the given message.
    pub fn submission(msg: impl Into<String>) -> Self {
        Self::Submission(msg.into())
    }

    /// Creates a fetch error with the given message.
    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::Fetch(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an invalid input error with the given message.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Creates an I/O error with the given message.
    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Submission(_) => "Submission Error",
            Self::Timeout { .. } => "Timeout Error",
            Self::QueryFailed { .. } => "Remote Query Failure",
            Self::Fetch(_) => "Fetch Error",
            Self::Config(_) => "Configuration Error",
            Self::InvalidInput(_) => "Invalid Input",
            Self::Io(_) => "I/O Error",
            Self::Internal(_) => "Internal Error",
        }
    }

    /// Returns the execution id this error is about, if any.
    pub fn execution_id(&self) -> Option<&str> {
        match self {
            Self::Timeout { execution_id, .. } | Self::QueryFailed { execution_id, .. } => {
                Some(execution_id)
            }
            _ => None,
        }
    }
}

/// Result type alias using InsightsError.
pub type Result<T> = std::result::Result<T, InsightsError>;

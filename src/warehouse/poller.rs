//! Completion polling.

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use super::{QueryService, QueryState};
use crate::error::{InsightsError, Result};

/// Polls `execution_id` every `poll_interval` until it reaches a terminal
/// state or `timeout` elapses.
///
/// FAILED and CANCELLED are returned as values; only the local deadline is
/// an error. The deadline is checked before each poll, so the first poll
/// always happens.
pub async fn await_completion(
    service: &dyn QueryService,
    execution_id: &str,
    poll_interval: Duration,
    timeout: Duration,
) -> Result<QueryState> {
    let start = Instant::now();
    let mut polls = 0u32;

    loop {
        if start.elapsed() > timeout {
            return Err(InsightsError::Timeout {
                execution_id: execution_id.to_string(),
                timeout,
            });
        }

        let status = service.status(execution_id).await?;
        polls += 1;

        if status.state.is_terminal() {
            debug!(
                execution_id,
                state = %status.state,
                polls,
                elapsed_ms = start.elapsed().as_millis(),
                "Execution reached terminal state"
            );
            return Ok(status.state);
        }

        debug!(execution_id, polls, "Execution still running");
        tokio::time::sleep(poll_interval).await;
    }
}

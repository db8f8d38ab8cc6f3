//! Result pagination.
//!
//! The service returns the column headers as the first row of the first
//! page. That row is consumed here and never reaches callers.

use tracing::{debug, warn};

use super::{PageRequest, QueryResult, QueryService, Row, Value};
use crate::error::Result;

/// Size of the next page request.
///
/// Without a cap every page is as large as the service allows. With one, the
/// request is trimmed to what is still needed, plus one slot on the first
/// page for the header row.
fn page_size(page_limit: u32, row_cap: Option<usize>, collected: usize, first_page: bool) -> u32 {
    match row_cap {
        None => page_limit,
        Some(cap) => {
            let remaining = cap.saturating_sub(collected);
            let wanted = remaining + usize::from(first_page);
            let wanted = u32::try_from(wanted).unwrap_or(u32::MAX);
            wanted.min(page_limit).max(1)
        }
    }
}

fn decode_row(cells: Vec<Option<String>>, width: usize) -> Row {
    let mut row: Row = cells.into_iter().take(width).map(Value::from).collect();
    row.resize(width, Value::Null);
    row
}

/// Pages through the results of a finished execution.
///
/// Stops when the service has no more pages or `row_cap` rows have been
/// collected. Statistics are attached on a best-effort basis.
pub async fn fetch_results(
    service: &dyn QueryService,
    execution_id: &str,
    row_cap: Option<usize>,
    page_limit: u32,
) -> Result<QueryResult> {
    let mut columns: Vec<String> = Vec::new();
    let mut rows: Vec<Row> = Vec::new();
    let mut next_token: Option<String> = None;
    let mut first_page = true;
    let cap_reached = |rows: &Vec<Row>| row_cap.is_some_and(|cap| rows.len() >= cap);

    // The first page is always read so the column metadata is known,
    // even when the cap is zero.
    while first_page || !cap_reached(&rows) {
        let request = PageRequest {
            max_results: page_size(page_limit, row_cap, rows.len(), first_page),
            next_token: next_token.take(),
        };
        debug!(
            execution_id,
            max_results = request.max_results,
            collected = rows.len(),
            "Fetching result page"
        );

        let page = service.results(execution_id, &request).await?;
        let mut data = page.rows.into_iter();

        if first_page {
            columns = page
                .columns
                .iter()
                .map(|c| c.display_name().to_string())
                .collect();
            // Header row.
            data.next();
            first_page = false;
        }

        for cells in data {
            if cap_reached(&rows) {
                break;
            }
            rows.push(decode_row(cells, columns.len()));
        }

        match page.next_token {
            Some(token) => next_token = Some(token),
            None => break,
        }
    }

    let statistics = match service.statistics(execution_id).await {
        Ok(statistics) => statistics,
        Err(e) => {
            warn!(execution_id, error = %e, "Could not fetch execution statistics");
            None
        }
    };

    debug!(execution_id, rows = rows.len(), "Fetched results");
    Ok(QueryResult::new(execution_id, columns, rows).with_statistics(statistics))
}

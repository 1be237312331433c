//! Offset/limit pagination over annotated result sets.
//!
//! List queries are expected to project the total matching count into every
//! row (`count(*) OVER () AS total_count`, see
//! [`QueryBuilder::with_total_count`](crate::query::QueryBuilder::with_total_count)).
//! [`assemble`] reads that annotation and computes the link to the next page
//! by rewriting the request URL.
//!
//! The URL rewrite is deliberately literal string surgery, not structured
//! query-string parsing: the next link is the request URL with `offset=`
//! bumped in place, so callers get back exactly the layout they sent. If the
//! exact `offset={offset}` substring is not present (unusual formatting,
//! encoded params) the URL is returned unchanged rather than erroring.

use crate::error::DataError;
use crate::page::ListView;
use serde_json::{Map, Value};

/// Column name the paginator reads the pre-window count from.
pub const TOTAL_COUNT_COLUMN: &str = "total_count";

/// Access to the `total_count` annotation a list query attaches to each row.
///
/// Implemented here for `serde_json` object maps; backend crates add impls
/// for their row types.
pub trait HasTotalCount {
    fn total_count(&self) -> Option<u64>;
}

impl HasTotalCount for Map<String, Value> {
    fn total_count(&self) -> Option<u64> {
        self.get(TOTAL_COUNT_COLUMN).and_then(Value::as_u64)
    }
}

impl HasTotalCount for Value {
    fn total_count(&self) -> Option<u64> {
        self.get(TOTAL_COUNT_COLUMN).and_then(Value::as_u64)
    }
}

/// Compute the URL of the next page, or `None` when the current page already
/// reaches the end of the result set.
///
/// `anchor` optionally marks where the meaningful part of `request_url`
/// begins (e.g. `"/v1"`); the returned string starts there, stripping
/// scheme and host. An anchor that does not occur in the URL falls back to
/// the full string.
///
/// Pure and infallible; absence of a next page is `None`, not an error.
pub fn compute_next_url(
    request_url: &str,
    offset: u64,
    limit: u64,
    current_len: u64,
    total_count: u64,
    anchor: Option<&str>,
) -> Option<String> {
    if total_count < 1 {
        return None;
    }

    let remainder = total_count as i128 - current_len as i128 - offset as i128;
    if remainder <= 0 {
        return None;
    }

    let start = anchor.and_then(|a| request_url.find(a)).unwrap_or(0);
    let tail = &request_url[start..];

    if !request_url.contains("offset=") {
        let sep = if request_url.contains('?') { '&' } else { '?' };
        Some(format!("{tail}{sep}offset={}&limit={limit}", offset + limit))
    } else {
        // Literal in-place bump. A non-matching substring leaves the URL
        // untouched by contract.
        Some(tail.replace(
            &format!("offset={offset}"),
            &format!("offset={}", offset + limit),
        ))
    }
}

/// Assemble the `{total_count, next_url, results}` triple for a list
/// response.
///
/// Empty input produces an empty view with a zero count. Non-empty input
/// must be annotated: a first record without `total_count` fails with
/// [`DataError::MissingTotalCount`].
pub fn assemble<T: HasTotalCount>(
    records: Vec<T>,
    request_url: &str,
    offset: u64,
    limit: u64,
    anchor: Option<&str>,
) -> Result<ListView<T>, DataError> {
    let first = match records.first() {
        None => {
            return Ok(ListView {
                total_count: 0,
                next_url: None,
                results: records,
            })
        }
        Some(first) => first,
    };

    let total_count = first.total_count().ok_or(DataError::MissingTotalCount)?;
    let next_url = compute_next_url(
        request_url,
        offset,
        limit,
        records.len() as u64,
        total_count,
        anchor,
    );

    Ok(ListView {
        total_count,
        next_url,
        results: records,
    })
}

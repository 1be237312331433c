use crate::error::ApiError;
use dalkit_data::{assemble, HasTotalCount, ListView, PageParams};

/// Assemble the outward `{total_count, next_url, results}` triple for a
/// list endpoint.
///
/// `request_url` is the full URL of the current request; `anchor`
/// optionally marks where the returned next link should start (e.g.
/// `"/v1"` to strip scheme and host). Records must carry the
/// `total_count` annotation; a non-annotated, non-empty result set is a
/// server bug and surfaces as 500.
pub fn list_response<T: HasTotalCount>(
    records: Vec<T>,
    request_url: &str,
    page: &PageParams,
    anchor: Option<&str>,
) -> Result<ListView<T>, ApiError> {
    assemble(records, request_url, page.offset, page.limit, anchor).map_err(ApiError::from)
}

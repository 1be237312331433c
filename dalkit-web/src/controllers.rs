//! Thin CRUD glue between axum handlers and the storage traits.
//!
//! Each function owns one request flow and its status mapping; handlers
//! stay a few lines: extract, call, serialize. All of them expect to run
//! against a store bound to the request's transaction.

use crate::error::ApiError;
use crate::etag::if_match;
use crate::listview::list_response;
use axum::http::HeaderMap;
use dalkit_data::{
    delete_guarded, update_guarded, ConditionalStore, DetailStore, InsertStore, ListStore,
    ListView, PageParams, VersionTag, Versioned,
};

/// Fetch one resource for a read: missing rows are 404, soft-deleted rows
/// are 410.
pub async fn detail<S, K>(store: &mut S, key: &K) -> Result<S::Row, ApiError>
where
    S: DetailStore<K>,
    K: Sync + ?Sized,
{
    let row = store.fetch(key).await?;
    let row = row.ok_or(ApiError::NotFound)?;
    if row.soft_deleted() {
        return Err(ApiError::Gone);
    }
    Ok(row)
}

/// Run a list query and assemble the paginated view.
pub async fn list_view<S, P>(
    store: &mut S,
    params: &P,
    page: &PageParams,
    request_url: &str,
    anchor: Option<&str>,
) -> Result<ListView<S::Record>, ApiError>
where
    S: ListStore<P>,
    P: Sync + ?Sized,
{
    let records = store.list(params, page).await?;
    list_response(records, request_url, page, anchor)
}

/// Insert a new resource with a fresh version tag.
///
/// Returns the stored row and its tag; surface the tag via
/// [`set_etag`](crate::etag::set_etag) so the client can mutate next.
/// Constraint violations come back as 409 Conflict.
pub async fn create<S>(store: &mut S, change: S::Change) -> Result<(S::Row, VersionTag), ApiError>
where
    S: InsertStore,
{
    let tag = VersionTag::generate();
    let row = store.insert(change, &tag).await?;
    Ok((row, tag))
}

/// Guarded update: the full fetch/precondition/conditional-mutation flow,
/// reading `If-Match` from the request headers.
pub async fn update<S, K>(
    store: &mut S,
    key: &K,
    headers: &HeaderMap,
    change: S::Change,
) -> Result<(S::Row, VersionTag), ApiError>
where
    S: ConditionalStore<K>,
    K: Sync + ?Sized,
{
    let result = update_guarded(store, key, if_match(headers), change).await?;
    Ok(result)
}

/// Guarded delete, same protocol as [`update`].
pub async fn delete<S, K>(store: &mut S, key: &K, headers: &HeaderMap) -> Result<(), ApiError>
where
    S: ConditionalStore<K>,
    K: Sync + ?Sized,
{
    delete_guarded(store, key, if_match(headers)).await?;
    Ok(())
}

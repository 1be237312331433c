//! Boundary contracts to the storage collaborator, and the composed
//! two-phase mutation flows.
//!
//! A store is typically a thin handle over one open transaction; the
//! guarded flows below run their fetch and their conditional mutation on
//! the same store, so the fetch happens-before the mutation inside one
//! transaction scope. Race detection relies entirely on the storage
//! layer's atomic conditional write (affected-row count), never on
//! in-process locks.

use crate::error::DataError;
use crate::page::PageParams;
use crate::paginator::HasTotalCount;
use crate::version::{check_precondition, ConcurrencyCheck, Rejection, VersionTag, Versioned};
use std::future::Future;

/// Fetch a single versioned row by key.
pub trait DetailStore<K: ?Sized>: Send {
    type Row: Versioned + Send;

    fn fetch(
        &mut self,
        key: &K,
    ) -> impl Future<Output = Result<Option<Self::Row>, DataError>> + Send;
}

/// Conditional mutations guarded by a version tag.
///
/// Implementations must issue a single atomic statement of the form
/// `UPDATE/DELETE ... WHERE key = .. AND version = {observed}` writing
/// `{new_tag}` on update, and report the affected row count truthfully —
/// the whole protocol hangs on that number.
pub trait ConditionalStore<K: ?Sized>: DetailStore<K> {
    /// The mutation payload for updates (new field values).
    type Change: Send;

    fn apply_update(
        &mut self,
        key: &K,
        change: Self::Change,
        check: &ConcurrencyCheck,
    ) -> impl Future<Output = Result<u64, DataError>> + Send;

    fn apply_delete(
        &mut self,
        key: &K,
        check: &ConcurrencyCheck,
    ) -> impl Future<Output = Result<u64, DataError>> + Send;
}

/// Insertion of new rows, stamped with a server-generated version tag.
pub trait InsertStore: Send {
    type Row: Send;
    /// The payload of one insert (new field values).
    type Change: Send;

    fn insert(
        &mut self,
        change: Self::Change,
        tag: &VersionTag,
    ) -> impl Future<Output = Result<Self::Row, DataError>> + Send;
}

/// Windowed list queries returning annotated records.
pub trait ListStore<P: ?Sized>: Send {
    type Record: HasTotalCount + Send;

    fn list(
        &mut self,
        params: &P,
        page: &PageParams,
    ) -> impl Future<Output = Result<Vec<Self::Record>, DataError>> + Send;
}

/// Failure of a guarded flow: either a protocol rejection with a fixed
/// outward status, or a storage error.
#[derive(Debug)]
pub enum GuardError {
    Rejected(Rejection),
    Data(DataError),
}

impl From<Rejection> for GuardError {
    fn from(r: Rejection) -> Self {
        GuardError::Rejected(r)
    }
}

impl From<DataError> for GuardError {
    fn from(e: DataError) -> Self {
        GuardError::Data(e)
    }
}

impl std::fmt::Display for GuardError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GuardError::Rejected(r) => write!(f, "Rejected: {r}"),
            GuardError::Data(e) => write!(f, "Data error: {e}"),
        }
    }
}

impl std::error::Error for GuardError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GuardError::Rejected(r) => Some(r),
            GuardError::Data(e) => Some(e),
        }
    }
}

/// Run the full guarded update flow: fetch, precondition check,
/// conditional mutation, confirmation.
///
/// On success returns the row as fetched in phase 1 together with the new
/// tag the mutation wrote.
pub async fn update_guarded<S, K>(
    store: &mut S,
    key: &K,
    if_match: Option<&str>,
    change: S::Change,
) -> Result<(S::Row, VersionTag), GuardError>
where
    S: ConditionalStore<K>,
    K: Sync + ?Sized,
{
    let row = match store.fetch(key).await? {
        Some(row) => row,
        None => return Err(Rejection::NotFound.into()),
    };

    let check = check_precondition(if_match, Some(&row))?;
    let affected = store.apply_update(key, change, &check).await?;
    let new_tag = check.confirm(affected)?;

    Ok((row, new_tag))
}

/// Run the full guarded delete flow. Returns the replacement tag the
/// conditional statement wrote (meaningful for soft-deleting stores,
/// which rotate the tag instead of removing the row).
pub async fn delete_guarded<S, K>(
    store: &mut S,
    key: &K,
    if_match: Option<&str>,
) -> Result<VersionTag, GuardError>
where
    S: ConditionalStore<K>,
    K: Sync + ?Sized,
{
    let row = match store.fetch(key).await? {
        Some(row) => row,
        None => return Err(Rejection::NotFound.into()),
    };

    let check = check_precondition(if_match, Some(&row))?;
    let affected = store.apply_delete(key, &check).await?;
    let new_tag = check.confirm(affected)?;

    Ok(new_tag)
}

//! Optimistic concurrency over opaque version tags.
//!
//! Every versioned row carries a tag that is replaced with a fresh random
//! token on each successful mutation. A mutating request runs in two
//! phases inside one transaction:
//!
//! 1. fetch the row, compare its tag against the client's `If-Match`
//!    precondition ([`check_precondition`]);
//! 2. issue the mutation conditioned on that tag
//!    (`... WHERE id = $1 AND version = $2`) and confirm the affected row
//!    count ([`ConcurrencyCheck::confirm`]). Zero rows means another writer
//!    won the race between the two phases.
//!
//! Tags are version markers, not content fingerprints: two writes producing
//! identical content still get distinct tags.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque token identifying one revision of a stored resource.
///
/// Compared, never parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionTag(String);

impl VersionTag {
    /// Generate a fresh, collision-resistant tag.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<&str> for VersionTag {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for VersionTag {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for VersionTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Accessors a versioned row must expose.
///
/// Row types state where their tag and soft-delete flag live by
/// implementing this trait; nothing probes rows by field name at runtime.
pub trait Versioned {
    fn version_tag(&self) -> &str;

    /// Logically-deleted rows answer `true` and are reported as gone
    /// before any tag comparison happens.
    fn soft_deleted(&self) -> bool {
        false
    }
}

/// Terminal non-success outcomes of the concurrency protocol.
///
/// Each maps to one fixed status/message pair at the HTTP boundary; none
/// are retried server-side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// No `If-Match` precondition on a mutating request (428).
    PreconditionRequired,
    /// The resource does not exist (404).
    NotFound,
    /// The resource is soft-deleted (410).
    Gone,
    /// The client's tag does not match the stored tag (412).
    PreconditionFailed,
    /// The conditional mutation affected zero rows: another writer changed
    /// the tag between check and mutation (409). The client must re-fetch
    /// and deliberately retry.
    Stale,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Rejection::PreconditionRequired => "precondition required",
            Rejection::NotFound => "not found",
            Rejection::Gone => "gone",
            Rejection::PreconditionFailed => "precondition failed",
            Rejection::Stale => "stale data",
        };
        f.write_str(s)
    }
}

impl std::error::Error for Rejection {}

/// The ephemeral state of one authorized mutation attempt.
///
/// Constructed only by [`check_precondition`]; holds copies of the
/// exchanged tags for the conditional statement and the replacement tag to
/// be written. Lives for the duration of one request.
#[derive(Debug, Clone)]
pub struct ConcurrencyCheck {
    expected: VersionTag,
    observed: VersionTag,
    new_tag: VersionTag,
}

impl ConcurrencyCheck {
    /// The tag the client claimed to be updating.
    pub fn expected(&self) -> &VersionTag {
        &self.expected
    }

    /// The tag read from storage in phase 1. The conditional mutation must
    /// guard on this value.
    pub fn observed(&self) -> &VersionTag {
        &self.observed
    }

    /// The replacement tag the mutation writes on success.
    pub fn new_tag(&self) -> &VersionTag {
        &self.new_tag
    }

    /// Phase 2: judge the conditional mutation by its affected row count.
    ///
    /// Zero rows means the guard clause did not match any row anymore and
    /// the request lost the race ([`Rejection::Stale`]). One row yields the
    /// new tag, to be surfaced to the client (e.g. as an `Etag` response
    /// header) for its next precondition.
    pub fn confirm(self, rows_affected: u64) -> Result<VersionTag, Rejection> {
        if rows_affected == 0 {
            Err(Rejection::Stale)
        } else {
            Ok(self.new_tag)
        }
    }
}

/// Phase 1 of the protocol: validate the client precondition against the
/// fetched row.
///
/// Checks run in a fixed order: missing header, missing row, soft-delete,
/// tag comparison. The soft-delete check deliberately precedes the tag
/// comparison, so a correct tag against a deleted resource is still gone.
pub fn check_precondition<R: Versioned>(
    if_match: Option<&str>,
    row: Option<&R>,
) -> Result<ConcurrencyCheck, Rejection> {
    let expected = if_match.ok_or(Rejection::PreconditionRequired)?;
    let row = row.ok_or(Rejection::NotFound)?;

    if row.soft_deleted() {
        return Err(Rejection::Gone);
    }

    let observed = row.version_tag();
    if observed != expected {
        return Err(Rejection::PreconditionFailed);
    }

    Ok(ConcurrencyCheck {
        expected: VersionTag::from(expected),
        observed: VersionTag::from(observed),
        new_tag: VersionTag::generate(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Row {
        tag: String,
        deleted: bool,
    }

    impl Versioned for Row {
        fn version_tag(&self) -> &str {
            &self.tag
        }

        fn soft_deleted(&self) -> bool {
            self.deleted
        }
    }

    fn row(tag: &str, deleted: bool) -> Row {
        Row {
            tag: tag.to_string(),
            deleted,
        }
    }

    #[test]
    fn generated_tags_are_unique() {
        let a = VersionTag::generate();
        let b = VersionTag::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 32);
    }

    #[test]
    fn missing_header_is_428() {
        let r = row("tagA", false);
        let err = check_precondition(None, Some(&r)).unwrap_err();
        assert_eq!(err, Rejection::PreconditionRequired);
    }

    #[test]
    fn missing_row_is_404() {
        let err = check_precondition::<Row>(Some("tagA"), None).unwrap_err();
        assert_eq!(err, Rejection::NotFound);
    }

    #[test]
    fn soft_delete_precedes_tag_comparison() {
        // A correct tag against a deleted resource still yields gone.
        let r = row("tagA", true);
        let err = check_precondition(Some("tagA"), Some(&r)).unwrap_err();
        assert_eq!(err, Rejection::Gone);
    }

    #[test]
    fn missing_header_precedes_not_found() {
        let err = check_precondition::<Row>(None, None).unwrap_err();
        assert_eq!(err, Rejection::PreconditionRequired);
    }

    #[test]
    fn mismatched_tag_is_412() {
        let r = row("tagB", false);
        let err = check_precondition(Some("tagA"), Some(&r)).unwrap_err();
        assert_eq!(err, Rejection::PreconditionFailed);
    }

    #[test]
    fn matching_tag_authorizes_with_fresh_tag() {
        let r = row("tagA", false);
        let check = check_precondition(Some("tagA"), Some(&r)).unwrap();
        assert_eq!(check.expected().as_str(), "tagA");
        assert_eq!(check.observed().as_str(), "tagA");
        assert_ne!(check.new_tag().as_str(), "tagA");
    }

    #[test]
    fn zero_rows_affected_is_stale() {
        let r = row("tagA", false);
        let check = check_precondition(Some("tagA"), Some(&r)).unwrap();
        assert_eq!(check.confirm(0), Err(Rejection::Stale));
    }

    #[test]
    fn one_row_affected_commits_the_new_tag() {
        let r = row("tagA", false);
        let check = check_precondition(Some("tagA"), Some(&r)).unwrap();
        let new_tag = check.new_tag().clone();
        assert_eq!(check.confirm(1), Ok(new_tag));
    }
}

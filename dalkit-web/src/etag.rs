//! The `If-Match` / `Etag` header exchange of the concurrency protocol.

use crate::error::ApiError;
use axum::http::header::{ETAG, IF_MATCH};
use axum::http::{HeaderMap, HeaderValue};
use dalkit_data::{check_precondition, ConcurrencyCheck, VersionTag, Versioned};

/// Read the client's `If-Match` precondition, if any.
pub fn if_match(headers: &HeaderMap) -> Option<&str> {
    headers.get(IF_MATCH).and_then(|v| v.to_str().ok())
}

/// Set the `Etag` response header to the resource's current tag.
///
/// Clients echo it back as `If-Match` on their next mutation.
pub fn set_etag(headers: &mut HeaderMap, tag: &VersionTag) {
    if let Ok(value) = HeaderValue::from_str(tag.as_str()) {
        headers.insert(ETAG, value);
    }
}

/// Request-scoped holder for the concurrency check.
///
/// Make a fresh one per request. Handlers that split the two protocol
/// phases across their own SQL run [`check`](EtagHandler::check) right
/// after their fetch, then read the retained [`ConcurrencyCheck`] when
/// building the conditional mutation.
#[derive(Default)]
pub struct EtagHandler {
    check: Option<ConcurrencyCheck>,
}

impl EtagHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the precondition state machine against the request headers and
    /// the fetched row; retains the authorized check on success.
    pub fn check<R: Versioned>(
        &mut self,
        headers: &HeaderMap,
        row: Option<&R>,
    ) -> Result<&ConcurrencyCheck, ApiError> {
        let check = check_precondition(if_match(headers), row)?;
        Ok(self.check.insert(check))
    }

    /// The check retained by a successful [`check`](EtagHandler::check).
    pub fn current(&self) -> Option<&ConcurrencyCheck> {
        self.check.as_ref()
    }

    pub fn take(&mut self) -> Option<ConcurrencyCheck> {
        self.check.take()
    }
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

    fn headers_with_if_match(tag: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(IF_MATCH, HeaderValue::from_str(tag).unwrap());
        headers
    }

    #[test]
    fn missing_header_is_precondition_required() {
        let mut etag = EtagHandler::new();
        let row = Row {
            tag: "tagA".into(),
            deleted: false,
        };
        let err = etag.check(&HeaderMap::new(), Some(&row)).unwrap_err();
        assert!(matches!(err, ApiError::PreconditionRequired));
        assert!(etag.current().is_none());
    }

    #[test]
    fn matching_tag_retains_the_check() {
        let mut etag = EtagHandler::new();
        let row = Row {
            tag: "tagA".into(),
            deleted: false,
        };
        etag.check(&headers_with_if_match("tagA"), Some(&row))
            .unwrap();

        let check = etag.current().unwrap();
        assert_eq!(check.observed().as_str(), "tagA");
        assert_ne!(check.new_tag().as_str(), "tagA");
    }

    #[test]
    fn soft_deleted_row_is_gone_even_with_matching_tag() {
        let mut etag = EtagHandler::new();
        let row = Row {
            tag: "tagA".into(),
            deleted: true,
        };
        let err = etag
            .check(&headers_with_if_match("tagA"), Some(&row))
            .unwrap_err();
        assert!(matches!(err, ApiError::Gone));
    }

    #[test]
    fn etag_header_roundtrip() {
        let mut headers = HeaderMap::new();
        let tag = VersionTag::generate();
        set_etag(&mut headers, &tag);
        assert_eq!(
            headers.get(ETAG).and_then(|v| v.to_str().ok()),
            Some(tag.as_str())
        );
    }
}

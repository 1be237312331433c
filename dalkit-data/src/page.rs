use crate::error::DataError;
use crate::paginator::HasTotalCount;
use serde::{Deserialize, Serialize};

/// Hard ceiling on the page size a client may request.
pub const MAX_LIMIT: u64 = 1000;

fn default_limit() -> u64 {
    MAX_LIMIT
}

/// The offset/limit window of one list request, extractable from query params.
#[derive(Debug, Clone, Deserialize)]
pub struct PageParams {
    #[serde(default)]
    pub offset: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: MAX_LIMIT,
        }
    }
}

impl PageParams {
    pub fn new(offset: u64, limit: u64) -> Self {
        Self { offset, limit }.clamped()
    }

    /// Cap `limit` at [`MAX_LIMIT`]. Deserialized params should pass through
    /// here before being used in a query.
    pub fn clamped(mut self) -> Self {
        if self.limit > MAX_LIMIT {
            self.limit = MAX_LIMIT;
        }
        self
    }
}

/// One page of results, annotated with the window that produced it and the
/// total matching count before the window was applied.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: u64,
    pub offset: u64,
    pub limit: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total_count: u64, params: &PageParams) -> Self {
        Self {
            items,
            total_count,
            offset: params.offset,
            limit: params.limit,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

impl<T: HasTotalCount> Page<T> {
    /// Build a page from annotated records, reading `total_count` from the
    /// records themselves. Every record must carry the same count; a missing
    /// annotation on a non-empty set fails with
    /// [`DataError::MissingTotalCount`].
    pub fn from_records(items: Vec<T>, params: &PageParams) -> Result<Self, DataError> {
        let total_count = match items.first() {
            None => 0,
            Some(first) => {
                let count = first.total_count().ok_or(DataError::MissingTotalCount)?;
                if items.iter().any(|r| r.total_count() != Some(count)) {
                    return Err(DataError::Other(
                        "total_count differs across records of one page".into(),
                    ));
                }
                count
            }
        };
        Ok(Self::new(items, total_count, params))
    }
}

/// The outward shape of a list response.
#[derive(Debug, Clone, Serialize)]
pub struct ListView<T> {
    pub total_count: u64,
    pub next_url: Option<String>,
    pub results: Vec<T>,
}

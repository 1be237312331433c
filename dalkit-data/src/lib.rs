pub mod error;
pub mod filter;
pub mod page;
pub mod paginator;
pub mod query;
pub mod storage;
pub mod version;

pub use error::{ConstraintKind, DataError};
pub use filter::{Filter, FilterOp, FilterSet};
pub use page::{ListView, Page, PageParams, MAX_LIMIT};
pub use paginator::{assemble, compute_next_url, HasTotalCount, TOTAL_COUNT_COLUMN};
pub use query::QueryBuilder;
pub use storage::{
    delete_guarded, update_guarded, ConditionalStore, DetailStore, GuardError, InsertStore,
    ListStore,
};
pub use version::{check_precondition, ConcurrencyCheck, Rejection, VersionTag, Versioned};

pub mod prelude {
    //! Re-exports of the most commonly used data types.
    pub use crate::{
        assemble, check_precondition, compute_next_url, ConcurrencyCheck, ConditionalStore,
        DataError, DetailStore, Filter, FilterSet, GuardError, HasTotalCount, InsertStore,
        ListStore, ListView, Page, PageParams, QueryBuilder, Rejection, VersionTag, Versioned,
    };
}

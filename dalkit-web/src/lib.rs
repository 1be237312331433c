//! axum-facing glue for dalkit.
//!
//! Maps the data layer's outcomes onto the fixed HTTP contract
//! (428/404/410/412/409 with their standard messages), handles the
//! `If-Match`/`Etag` header exchange of the optimistic concurrency
//! protocol, and provides thin CRUD controllers over the storage traits.

pub mod controllers;
pub mod error;
pub mod etag;
pub mod listview;

pub use dalkit_data::{ListView, PageParams};
pub use error::{error_response, ApiError};
pub use etag::{if_match, set_etag, EtagHandler};
pub use listview::list_response;

pub mod prelude {
    pub use crate::{controllers, if_match, list_response, set_etag, ApiError, EtagHandler};
    pub use dalkit_data::prelude::*;
}

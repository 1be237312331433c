//! # dalkit-data-sqlx — SQLx/Postgres backend for dalkit
//!
//! This crate provides the [SQLx](https://github.com/launchbadge/sqlx)-specific
//! implementations for dalkit's data access layer. It depends on
//! [`dalkit_data`] for the abstract traits and types, and adds the
//! transaction wrapper, versioned table store, bulk COPY pipeline, and
//! error bridging needed to talk to a real Postgres database.
//!
//! # What's in this crate
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Tx`] | Transaction wrapper — the guarded fetch/mutate flows run inside one of these |
//! | [`HasPool`] | Trait for application states that contain a `PgPool` |
//! | [`TableMeta`] | Immutable snapshot of the table facts a store needs |
//! | [`PgTableStore`] | Implements the core storage traits for one table over a `Tx` |
//! | [`BulkLoadScript`] | Staging-table-then-merge COPY loader, one transaction per script |
//! | [`ExportOp`] | `COPY (query) TO STDOUT` streamed into an async sink |
//! | [`SqlxErrorExt`] | Extension trait to convert `sqlx::Error` → `DataError` (`.into_data_error()`) |
//! | [`SqlxResult<T>`] | Type alias for `Result<T, DataError>` |
//!
//! # Quick start
//!
//! ```ignore
//! use dalkit_data::update_guarded;
//! use dalkit_data_sqlx::{connect, PgTableStore, TableMeta, Tx};
//!
//! let pool = connect("postgres://localhost/app", 5).await?;
//! let meta = TableMeta::new("book").soft_delete_column("deleted");
//!
//! let tx = Tx::begin(&pool).await?;
//! let mut store = PgTableStore::new(tx, meta);
//! let (row, new_tag) = update_guarded(
//!     &mut store,
//!     &book_id,
//!     if_match.as_deref(),
//!     vec![("name".into(), serde_json::json!("Dune"))],
//! )
//! .await?;
//! store.into_tx().commit().await?;
//! ```
//!
//! # Error bridging
//!
//! Due to Rust's orphan rules, `From<sqlx::Error> for DataError` can't be
//! implemented here. Use the [`SqlxErrorExt`] trait instead:
//!
//! ```ignore
//! use dalkit_data_sqlx::SqlxErrorExt;
//!
//! let row = sqlx::query("SELECT ...")
//!     .fetch_one(&pool)
//!     .await
//!     .map_err(|e| e.into_data_error())?;
//! ```

pub mod bulk;
pub mod connect;
pub mod error;
pub mod meta;
pub mod store;
pub mod tx;

pub use bulk::{BulkLoadScript, CopyFormat, ExportOp, LoadOp, LoadReport, StagingTable, TableColumn, TableColumns};
pub use connect::{connect, connect_or_fail};
pub use error::{SqlxErrorExt, SqlxResult};
pub use meta::TableMeta;
pub use store::{row_to_json, ChangeSet, JsonRow, PgTableStore};
pub use tx::{HasPool, Tx};

/// Re-exports of the most commonly used types from both `dalkit-data` and
/// this crate.
pub mod prelude {
    pub use crate::{
        connect, BulkLoadScript, ExportOp, HasPool, JsonRow, PgTableStore, SqlxErrorExt,
        TableMeta, Tx,
    };
    pub use dalkit_data::prelude::*;
}

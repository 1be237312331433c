//! Transaction wrapper for the one-transaction-per-request discipline.

use crate::error::SqlxErrorExt;
use dalkit_data::DataError;
use sqlx::postgres::PgConnection;
use sqlx::{PgPool, Postgres, Transaction};
use std::ops::{Deref, DerefMut};

/// Trait for application states that contain a database pool.
pub trait HasPool {
    fn pool(&self) -> &PgPool;
}

/// A wrapper around an open Postgres [`Transaction`].
///
/// The guarded fetch/mutate flows are meant to run entirely inside one
/// `Tx`, so the phase-1 fetch and the phase-2 conditional mutation share a
/// transaction scope. Dropping an uncommitted `Tx` rolls it back.
pub struct Tx<'a>(pub Transaction<'a, Postgres>);

impl Tx<'_> {
    /// Begin a new transaction from the pool.
    pub async fn begin(pool: &PgPool) -> Result<Tx<'static>, DataError> {
        let tx = pool.begin().await.map_err(|e| e.into_data_error())?;
        Ok(Tx(tx))
    }

    pub async fn commit(self) -> Result<(), DataError> {
        self.0.commit().await.map_err(|e| e.into_data_error())
    }

    pub async fn rollback(self) -> Result<(), DataError> {
        self.0.rollback().await.map_err(|e| e.into_data_error())
    }

    /// Returns a mutable reference to the underlying connection.
    pub fn as_mut(&mut self) -> &mut PgConnection {
        &mut *self.0
    }
}

impl<'a> Tx<'a> {
    /// Unwraps the `Tx` into the inner `Transaction`.
    pub fn into_inner(self) -> Transaction<'a, Postgres> {
        self.0
    }
}

impl<'a> Deref for Tx<'a> {
    type Target = Transaction<'a, Postgres>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<'a> DerefMut for Tx<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

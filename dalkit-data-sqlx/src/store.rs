//! A generic versioned table store over one open transaction.
//!
//! [`PgTableStore`] implements the core storage traits for a single table
//! described by a [`TableMeta`]. Rows are decoded into `serde_json` object
//! maps by Postgres type name, so the store works against reflected or
//! ad-hoc schemas without per-table row structs. Conditional mutations are
//! single statements guarded by the version column; the affected row count
//! is reported back untouched, which is what the concurrency protocol
//! judges.

use crate::error::SqlxErrorExt;
use crate::meta::TableMeta;
use crate::tx::Tx;
use dalkit_data::{
    ConcurrencyCheck, ConditionalStore, DataError, DetailStore, HasTotalCount, InsertStore,
    ListStore, PageParams, QueryBuilder, VersionTag, Versioned, TOTAL_COUNT_COLUMN,
};
use serde_json::{Map, Value};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{Column, Postgres, Row, TypeInfo};

/// Column/value pairs of one insert or update, in statement order.
pub type ChangeSet = Vec<(String, Value)>;

/// A row decoded to JSON values, carrying the column names needed to
/// answer the version/soft-delete accessors.
#[derive(Debug, Clone)]
pub struct JsonRow {
    values: Map<String, Value>,
    version_column: String,
    soft_delete_column: Option<String>,
}

impl JsonRow {
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn into_values(self) -> Map<String, Value> {
        self.values
    }
}

impl Versioned for JsonRow {
    fn version_tag(&self) -> &str {
        // A row without a tag value never matches a client precondition.
        self.values
            .get(&self.version_column)
            .and_then(Value::as_str)
            .unwrap_or("")
    }

    fn soft_deleted(&self) -> bool {
        self.soft_delete_column
            .as_deref()
            .and_then(|c| self.values.get(c))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

impl HasTotalCount for JsonRow {
    fn total_count(&self) -> Option<u64> {
        self.values.get(TOTAL_COUNT_COLUMN).and_then(Value::as_u64)
    }
}

impl serde::Serialize for JsonRow {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.values.serialize(serializer)
    }
}

/// The storage collaborator for one table, bound to one transaction.
///
/// Keys are `i64` primary keys. Owns its [`Tx`]; call [`into_tx`] to
/// commit once the request's work is done.
///
/// [`into_tx`]: PgTableStore::into_tx
pub struct PgTableStore {
    tx: Tx<'static>,
    meta: TableMeta,
}

impl PgTableStore {
    pub fn new(tx: Tx<'static>, meta: TableMeta) -> Self {
        Self { tx, meta }
    }

    pub fn meta(&self) -> &TableMeta {
        &self.meta
    }

    pub fn tx_mut(&mut self) -> &mut Tx<'static> {
        &mut self.tx
    }

    pub fn into_tx(self) -> Tx<'static> {
        self.tx
    }

    fn wrap(&self, values: Map<String, Value>) -> JsonRow {
        JsonRow {
            values,
            version_column: self.meta.version_column_name().to_string(),
            soft_delete_column: self.meta.soft_delete_column_name().map(str::to_string),
        }
    }
}

impl InsertStore for PgTableStore {
    type Row = JsonRow;
    type Change = ChangeSet;

    /// Insert a row stamped with the given version tag and return it as
    /// stored.
    async fn insert(&mut self, change: ChangeSet, tag: &VersionTag) -> Result<JsonRow, DataError> {
        let columns: Vec<String> = change.iter().map(|(c, _)| c.clone()).collect();
        let sql = insert_stmt(&self.meta, &columns);

        let mut query = sqlx::query(&sql);
        for (_, value) in &change {
            query = bind_json(query, value);
        }
        query = query.bind(tag.as_str());

        let row = query
            .fetch_one(self.tx.as_mut())
            .await
            .map_err(|e| e.into_data_error())?;
        Ok(self.wrap(row_to_json(&row)?))
    }
}

impl DetailStore<i64> for PgTableStore {
    type Row = JsonRow;

    async fn fetch(&mut self, key: &i64) -> Result<Option<JsonRow>, DataError> {
        let sql = fetch_stmt(&self.meta);
        let row = sqlx::query(&sql)
            .bind(key)
            .fetch_optional(self.tx.as_mut())
            .await
            .map_err(|e| e.into_data_error())?;
        match row {
            Some(row) => Ok(Some(self.wrap(row_to_json(&row)?))),
            None => Ok(None),
        }
    }
}

impl ConditionalStore<i64> for PgTableStore {
    type Change = ChangeSet;

    async fn apply_update(
        &mut self,
        key: &i64,
        change: ChangeSet,
        check: &ConcurrencyCheck,
    ) -> Result<u64, DataError> {
        let columns: Vec<String> = change.iter().map(|(c, _)| c.clone()).collect();
        let sql = update_stmt(&self.meta, &columns);

        let mut query = sqlx::query(&sql);
        for (_, value) in &change {
            query = bind_json(query, value);
        }
        let result = query
            .bind(check.new_tag().as_str())
            .bind(key)
            .bind(check.observed().as_str())
            .execute(self.tx.as_mut())
            .await
            .map_err(|e| e.into_data_error())?;
        Ok(result.rows_affected())
    }

    async fn apply_delete(&mut self, key: &i64, check: &ConcurrencyCheck) -> Result<u64, DataError> {
        let sql = delete_stmt(&self.meta);
        let query = if self.meta.soft_delete_column_name().is_some() {
            sqlx::query(&sql)
                .bind(check.new_tag().as_str())
                .bind(key)
                .bind(check.observed().as_str())
        } else {
            sqlx::query(&sql).bind(key).bind(check.observed().as_str())
        };
        let result = query
            .execute(self.tx.as_mut())
            .await
            .map_err(|e| e.into_data_error())?;
        Ok(result.rows_affected())
    }
}

impl ListStore<QueryBuilder> for PgTableStore {
    type Record = JsonRow;

    async fn list(
        &mut self,
        params: &QueryBuilder,
        page: &PageParams,
    ) -> Result<Vec<JsonRow>, DataError> {
        let (sql, binds) = params
            .clone()
            .with_total_count()
            .page(page)
            .build_select();

        let mut query = sqlx::query(&sql);
        for bind in &binds {
            query = query.bind(bind.as_str());
        }
        let rows = query
            .fetch_all(self.tx.as_mut())
            .await
            .map_err(|e| e.into_data_error())?;

        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            out.push(self.wrap(row_to_json(row)?));
        }
        Ok(out)
    }
}

fn fetch_stmt(meta: &TableMeta) -> String {
    format!(
        "SELECT * FROM {} WHERE {} = $1",
        meta.table_name(),
        meta.id_column_name()
    )
}

fn insert_stmt(meta: &TableMeta, columns: &[String]) -> String {
    let mut all_columns: Vec<&str> = columns.iter().map(String::as_str).collect();
    all_columns.push(meta.version_column_name());
    let placeholders: Vec<String> = (1..=all_columns.len()).map(|n| format!("${n}")).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING *",
        meta.table_name(),
        all_columns.join(", "),
        placeholders.join(", ")
    )
}

fn update_stmt(meta: &TableMeta, columns: &[String]) -> String {
    let mut assignments = Vec::with_capacity(columns.len() + 1);
    let mut n = 0;
    for column in columns {
        n += 1;
        assignments.push(format!("{column} = ${n}"));
    }
    n += 1;
    assignments.push(format!("{} = ${n}", meta.version_column_name()));
    format!(
        "UPDATE {} SET {} WHERE {} = ${} AND {} = ${}",
        meta.table_name(),
        assignments.join(", "),
        meta.id_column_name(),
        n + 1,
        meta.version_column_name(),
        n + 2
    )
}

fn delete_stmt(meta: &TableMeta) -> String {
    match meta.soft_delete_column_name() {
        Some(soft_delete) => format!(
            "UPDATE {} SET {soft_delete} = TRUE, {} = $1 WHERE {} = $2 AND {} = $3",
            meta.table_name(),
            meta.version_column_name(),
            meta.id_column_name(),
            meta.version_column_name()
        ),
        None => format!(
            "DELETE FROM {} WHERE {} = $1 AND {} = $2",
            meta.table_name(),
            meta.id_column_name(),
            meta.version_column_name()
        ),
    }
}

fn bind_json<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: &'q Value,
) -> Query<'q, Postgres, PgArguments> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                query.bind(i)
            } else {
                query.bind(n.as_f64())
            }
        }
        Value::String(s) => query.bind(s.as_str()),
        // Arrays and nested objects go to the driver as JSONB.
        other => query.bind(other),
    }
}

/// Decode a row into a JSON object map by Postgres type name.
///
/// Types outside the supported set fall back to a text read and decode to
/// `null` when the driver refuses.
pub fn row_to_json(row: &PgRow) -> Result<Map<String, Value>, DataError> {
    let mut out = Map::with_capacity(row.columns().len());
    for (idx, column) in row.columns().iter().enumerate() {
        let value = decode_column(row, idx, column.type_info().name())?;
        out.insert(column.name().to_string(), value);
    }
    Ok(out)
}

fn decode_column(row: &PgRow, idx: usize, type_name: &str) -> Result<Value, DataError> {
    let err = |e: sqlx::Error| e.into_data_error();
    let value = match type_name {
        "BOOL" => row.try_get::<Option<bool>, _>(idx).map_err(err)?.map(Value::from),
        "INT2" => row.try_get::<Option<i16>, _>(idx).map_err(err)?.map(Value::from),
        "INT4" => row.try_get::<Option<i32>, _>(idx).map_err(err)?.map(Value::from),
        "INT8" => row.try_get::<Option<i64>, _>(idx).map_err(err)?.map(Value::from),
        "FLOAT4" => row.try_get::<Option<f32>, _>(idx).map_err(err)?.map(Value::from),
        "FLOAT8" => row.try_get::<Option<f64>, _>(idx).map_err(err)?.map(Value::from),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => row
            .try_get::<Option<String>, _>(idx)
            .map_err(err)?
            .map(Value::String),
        "UUID" => row
            .try_get::<Option<uuid::Uuid>, _>(idx)
            .map_err(err)?
            .map(|u| Value::String(u.to_string())),
        "JSON" | "JSONB" => row.try_get::<Option<Value>, _>(idx).map_err(err)?,
        "TIMESTAMPTZ" => row
            .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(idx)
            .map_err(err)?
            .map(|t| Value::String(t.to_rfc3339())),
        "TIMESTAMP" => row
            .try_get::<Option<chrono::NaiveDateTime>, _>(idx)
            .map_err(err)?
            .map(|t| Value::String(t.to_string())),
        "DATE" => row
            .try_get::<Option<chrono::NaiveDate>, _>(idx)
            .map_err(err)?
            .map(|d| Value::String(d.to_string())),
        _ => row
            .try_get::<Option<String>, _>(idx)
            .unwrap_or(None)
            .map(Value::String),
    };
    Ok(value.unwrap_or(Value::Null))
}

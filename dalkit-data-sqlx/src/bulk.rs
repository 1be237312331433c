//! Bulk insert/upsert/export via Postgres `COPY`.
//!
//! Loading uses a staging-table-then-merge pattern:
//!
//! 1. create a temp staging table (`ON COMMIT DROP`);
//! 2. bulk COPY raw bytes (csv/text) into it;
//! 3. optionally run a post-copy statement (e.g. an index to speed up the
//!    merge);
//! 4. merge from staging into the destination table.
//!
//! A [`BulkLoadScript`] runs a sequence of [`LoadOp`]s inside a single
//! transaction; the first failing step aborts the script and rolls back
//! everything already done. Exporting is the mirror: [`ExportOp`] runs
//! `COPY (query) TO STDOUT` and streams the result into an async sink.

use crate::error::SqlxErrorExt;
use dalkit_data::DataError;
use futures_util::TryStreamExt;
use sqlx::postgres::PgConnection;
use sqlx::PgPool;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// One column of a staging table definition.
#[derive(Debug, Clone)]
pub struct TableColumn {
    pub name: String,
    pub col_type: String,
    pub postfix: String,
}

impl TableColumn {
    pub fn new(name: &str, col_type: &str) -> Self {
        Self {
            name: name.to_string(),
            col_type: col_type.to_string(),
            postfix: String::new(),
        }
    }

    /// Add a trailing DDL fragment, e.g. `NOT NULL` or a default.
    pub fn postfix(mut self, postfix: &str) -> Self {
        self.postfix = postfix.to_string();
        self
    }
}

impl std::fmt::Display for TableColumn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.name, self.col_type)?;
        if !self.postfix.is_empty() {
            write!(f, " {}", self.postfix)?;
        }
        Ok(())
    }
}

/// A comma-joined column list for a staging table.
#[derive(Debug, Clone)]
pub struct TableColumns(pub Vec<TableColumn>);

impl std::fmt::Display for TableColumns {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, col) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{col}")?;
        }
        Ok(())
    }
}

/// Wire format of the copied data.
#[derive(Debug, Clone, Copy)]
pub enum CopyFormat {
    /// Postgres default text format.
    Text,
    Csv {
        header: bool,
    },
}

impl CopyFormat {
    fn options(&self) -> &'static str {
        match self {
            CopyFormat::Text => "",
            CopyFormat::Csv { header: true } => " (FORMAT csv, HEADER true)",
            CopyFormat::Csv { header: false } => " (FORMAT csv)",
        }
    }
}

/// A transaction-scoped staging table.
#[derive(Debug, Clone)]
pub struct StagingTable {
    pub name: String,
    pub columns: TableColumns,
}

impl StagingTable {
    pub fn new(name: &str, columns: Vec<TableColumn>) -> Self {
        Self {
            name: name.to_string(),
            columns: TableColumns(columns),
        }
    }

    fn create_stmt(&self) -> String {
        format!(
            "CREATE TEMP TABLE {} ({}) ON COMMIT DROP",
            self.name, self.columns
        )
    }

    fn copy_in_stmt(&self, format: CopyFormat) -> String {
        format!("COPY {} FROM STDIN{}", self.name, format.options())
    }
}

/// What one load step did.
#[derive(Debug, Clone, Copy)]
pub struct LoadReport {
    /// Rows copied into the staging table.
    pub staged: u64,
    /// Rows affected by the merge statement.
    pub merged: u64,
}

/// One staging-copy-merge step of a bulk load.
pub struct LoadOp<R> {
    staging: StagingTable,
    source: R,
    format: CopyFormat,
    post_copy: Option<String>,
    merge: String,
}

impl<R: AsyncRead + Unpin + Send> LoadOp<R> {
    /// `merge` moves rows from the staging table into the destination,
    /// e.g. an `INSERT INTO .. SELECT .. FROM staging ON CONFLICT ..`.
    pub fn new(staging: StagingTable, source: R, format: CopyFormat, merge: &str) -> Self {
        Self {
            staging,
            source,
            format,
            post_copy: None,
            merge: merge.to_string(),
        }
    }

    /// Statement run between the copy and the merge (e.g. index creation
    /// on the staging table).
    pub fn post_copy(mut self, stmt: &str) -> Self {
        self.post_copy = Some(stmt.to_string());
        self
    }

    async fn execute(mut self, conn: &mut PgConnection) -> Result<LoadReport, DataError> {
        sqlx::query(&self.staging.create_stmt())
            .execute(&mut *conn)
            .await
            .map_err(|e| e.into_data_error())?;

        let mut copy = conn
            .copy_in_raw(&self.staging.copy_in_stmt(self.format))
            .await
            .map_err(|e| e.into_data_error())?;

        let mut buf = [0u8; 8192];
        loop {
            let n = self
                .source
                .read(&mut buf)
                .await
                .map_err(DataError::database)?;
            if n == 0 {
                break;
            }
            copy.send(&buf[..n]).await.map_err(|e| e.into_data_error())?;
        }
        let staged = copy.finish().await.map_err(|e| e.into_data_error())?;
        tracing::debug!(table = %self.staging.name, staged, "copied into staging table");

        if let Some(post_copy) = &self.post_copy {
            sqlx::query(post_copy)
                .execute(&mut *conn)
                .await
                .map_err(|e| e.into_data_error())?;
        }

        let merged = sqlx::query(&self.merge)
            .execute(&mut *conn)
            .await
            .map_err(|e| e.into_data_error())?
            .rows_affected();

        Ok(LoadReport { staged, merged })
    }
}

/// A sequence of load steps run inside a single transaction.
///
/// Any failing step aborts the script; nothing from earlier steps is kept.
pub struct BulkLoadScript<R> {
    ops: Vec<LoadOp<R>>,
}

impl<R: AsyncRead + Unpin + Send> BulkLoadScript<R> {
    pub fn new(ops: Vec<LoadOp<R>>) -> Self {
        Self { ops }
    }

    pub async fn run(self, pool: &PgPool) -> Result<Vec<LoadReport>, DataError> {
        let mut tx = pool.begin().await.map_err(|e| e.into_data_error())?;

        let mut reports = Vec::with_capacity(self.ops.len());
        for op in self.ops {
            let table = op.staging.name.clone();
            let report = op.execute(&mut *tx).await?;
            tracing::info!(
                table = %table,
                staged = report.staged,
                merged = report.merged,
                "bulk load step complete"
            );
            reports.push(report);
        }

        tx.commit().await.map_err(|e| e.into_data_error())?;
        Ok(reports)
    }
}

/// Stream the result of a query into an async sink via `COPY .. TO STDOUT`.
pub struct ExportOp {
    query: String,
    format: CopyFormat,
}

impl ExportOp {
    /// `query` is a plain SELECT; it is wrapped in the COPY statement.
    pub fn new(query: &str, format: CopyFormat) -> Self {
        Self {
            query: query.to_string(),
            format,
        }
    }

    fn copy_out_stmt(&self) -> String {
        format!("COPY ({}) TO STDOUT{}", self.query, self.format.options())
    }

    /// Returns the number of bytes written to the sink.
    pub async fn execute<W: AsyncWrite + Unpin>(
        self,
        conn: &mut PgConnection,
        sink: &mut W,
    ) -> Result<u64, DataError> {
        let mut stream = conn
            .copy_out_raw(&self.copy_out_stmt())
            .await
            .map_err(|e| e.into_data_error())?;

        let mut written = 0u64;
        while let Some(chunk) = stream.try_next().await.map_err(|e| e.into_data_error())? {
            sink.write_all(&chunk).await.map_err(DataError::database)?;
            written += chunk.len() as u64;
        }
        sink.flush().await.map_err(DataError::database)?;

        tracing::debug!(bytes = written, "export complete");
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn staging() -> StagingTable {
        StagingTable::new(
            "tmp_book",
            vec![
                TableColumn::new("name", "text").postfix("NOT NULL"),
                TableColumn::new("author_id", "bigint"),
                TableColumn::new("pages", "int"),
            ],
        )
    }

    #[test]
    fn staging_ddl() {
        assert_eq!(
            staging().create_stmt(),
            "CREATE TEMP TABLE tmp_book \
             (name text NOT NULL,author_id bigint,pages int) ON COMMIT DROP"
        );
    }

    #[test]
    fn copy_in_statements() {
        let t = staging();
        assert_eq!(
            t.copy_in_stmt(CopyFormat::Csv { header: true }),
            "COPY tmp_book FROM STDIN (FORMAT csv, HEADER true)"
        );
        assert_eq!(t.copy_in_stmt(CopyFormat::Text), "COPY tmp_book FROM STDIN");
    }

    #[test]
    fn copy_out_statement() {
        let op = ExportOp::new("SELECT name FROM book", CopyFormat::Csv { header: false });
        assert_eq!(
            op.copy_out_stmt(),
            "COPY (SELECT name FROM book) TO STDOUT (FORMAT csv)"
        );
    }
}

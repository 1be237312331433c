/// An immutable snapshot of the per-table facts a store needs: the table
/// name, its key and version columns, the optional soft-delete flag, and
/// the unique columns a merge may target with `ON CONFLICT`.
///
/// Constructed explicitly by the application (or generated code) and
/// threaded through stores and merge builders by value; there is no
/// process-wide registry.
#[derive(Debug, Clone)]
pub struct TableMeta {
    table: String,
    id_column: String,
    version_column: String,
    soft_delete_column: Option<String>,
    unique_columns: Vec<String>,
}

impl TableMeta {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            id_column: "id".to_string(),
            version_column: "etag_version".to_string(),
            soft_delete_column: None,
            unique_columns: Vec::new(),
        }
    }

    pub fn id_column(mut self, column: &str) -> Self {
        self.id_column = column.to_string();
        self
    }

    pub fn version_column(mut self, column: &str) -> Self {
        self.version_column = column.to_string();
        self
    }

    pub fn soft_delete_column(mut self, column: &str) -> Self {
        self.soft_delete_column = Some(column.to_string());
        self
    }

    pub fn unique_columns(mut self, columns: &[&str]) -> Self {
        self.unique_columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    pub fn id_column_name(&self) -> &str {
        &self.id_column
    }

    pub fn version_column_name(&self) -> &str {
        &self.version_column
    }

    pub fn soft_delete_column_name(&self) -> Option<&str> {
        self.soft_delete_column.as_deref()
    }

    pub fn unique_column_names(&self) -> &[String] {
        &self.unique_columns
    }

    /// The `ON CONFLICT (..)` target list for upsert-style merges, if any
    /// unique columns were declared.
    pub fn conflict_target(&self) -> Option<String> {
        if self.unique_columns.is_empty() {
            None
        } else {
            Some(format!("({})", self.unique_columns.join(", ")))
        }
    }
}

use crate::filter::{Filter, FilterOp};
use crate::page::PageParams;
use crate::paginator::TOTAL_COUNT_COLUMN;

/// A fluent builder for parameterized SELECT/COUNT statements with
/// Postgres `$n` placeholders.
///
/// List queries meant for the paginator call [`with_total_count`], which
/// projects the pre-window match count into every row via a window
/// function.
///
/// # Example
///
/// ```ignore
/// let (sql, binds) = QueryBuilder::new("book")
///     .columns(&["id", "name", "author_id"])
///     .with_total_count()
///     .where_eq("author_id", "42")
///     .order_by("id", true)
///     .page(&PageParams::new(0, 100))
///     .build_select();
/// ```
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    table: String,
    columns: Vec<String>,
    total_count: bool,
    conditions: Vec<Condition>,
    order: Vec<(String, bool)>,
    limit_val: Option<u64>,
    offset_val: Option<u64>,
}

#[derive(Debug, Clone)]
enum Condition {
    Eq(String, String),
    NotEq(String, String),
    Like(String, String),
    Gt(String, String),
    Lt(String, String),
    In(String, Vec<String>),
    IsNull(String),
    IsNotNull(String),
}

impl QueryBuilder {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            columns: vec!["*".to_string()],
            total_count: false,
            conditions: Vec::new(),
            order: Vec::new(),
            limit_val: None,
            offset_val: None,
        }
    }

    /// Set the projected columns (defaults to `*`).
    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Project `count(*) OVER () AS total_count` into every row: the total
    /// matching count before LIMIT/OFFSET, which the paginator reads back.
    pub fn with_total_count(mut self) -> Self {
        self.total_count = true;
        self
    }

    pub fn where_eq(mut self, column: &str, value: &str) -> Self {
        self.conditions
            .push(Condition::Eq(column.to_string(), value.to_string()));
        self
    }

    pub fn where_not_eq(mut self, column: &str, value: &str) -> Self {
        self.conditions
            .push(Condition::NotEq(column.to_string(), value.to_string()));
        self
    }

    pub fn where_like(mut self, column: &str, pattern: &str) -> Self {
        self.conditions
            .push(Condition::Like(column.to_string(), pattern.to_string()));
        self
    }

    pub fn where_gt(mut self, column: &str, value: &str) -> Self {
        self.conditions
            .push(Condition::Gt(column.to_string(), value.to_string()));
        self
    }

    pub fn where_lt(mut self, column: &str, value: &str) -> Self {
        self.conditions
            .push(Condition::Lt(column.to_string(), value.to_string()));
        self
    }

    pub fn where_in(mut self, column: &str, values: &[&str]) -> Self {
        self.conditions.push(Condition::In(
            column.to_string(),
            values.iter().map(|s| s.to_string()).collect(),
        ));
        self
    }

    pub fn where_null(mut self, column: &str) -> Self {
        self.conditions.push(Condition::IsNull(column.to_string()));
        self
    }

    pub fn where_not_null(mut self, column: &str) -> Self {
        self.conditions
            .push(Condition::IsNotNull(column.to_string()));
        self
    }

    /// Add a condition produced by a [`FilterSet`](crate::filter::FilterSet)
    /// accessor.
    pub fn filter(self, filter: Filter) -> Self {
        let Filter { column, op, value } = filter;
        match op {
            FilterOp::Eq => self.where_eq(column, &value),
            FilterOp::NotEq => self.where_not_eq(column, &value),
            FilterOp::Like => self.where_like(column, &value),
            FilterOp::Gt => self.where_gt(column, &value),
            FilterOp::Lt => self.where_lt(column, &value),
        }
    }

    pub fn order_by(mut self, column: &str, ascending: bool) -> Self {
        self.order.push((column.to_string(), ascending));
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit_val = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset_val = Some(offset);
        self
    }

    /// Apply an offset/limit window from request params.
    pub fn page(self, params: &PageParams) -> Self {
        self.limit(params.limit).offset(params.offset)
    }

    /// Build a SELECT statement returning `(sql, bind_values)`.
    pub fn build_select(&self) -> (String, Vec<String>) {
        let mut projection = self.columns.join(", ");
        if self.total_count {
            projection.push_str(&format!(", count(*) OVER () AS {TOTAL_COUNT_COLUMN}"));
        }

        let mut sql = format!("SELECT {projection} FROM {}", self.table);
        let mut params = Vec::new();
        self.append_where(&mut sql, &mut params);
        self.append_order(&mut sql);
        self.append_limit_offset(&mut sql);
        (sql, params)
    }

    /// Build a COUNT statement returning `(sql, bind_values)`.
    pub fn build_count(&self) -> (String, Vec<String>) {
        let mut sql = format!("SELECT COUNT(*) FROM {}", self.table);
        let mut params = Vec::new();
        self.append_where(&mut sql, &mut params);
        (sql, params)
    }

    fn append_where(&self, sql: &mut String, params: &mut Vec<String>) {
        if self.conditions.is_empty() {
            return;
        }
        sql.push_str(" WHERE ");
        let mut first = true;
        for cond in &self.conditions {
            if !first {
                sql.push_str(" AND ");
            }
            first = false;
            match cond {
                Condition::Eq(col, val) => {
                    sql.push_str(&format!("{col} = ${}", params.len() + 1));
                    params.push(val.clone());
                }
                Condition::NotEq(col, val) => {
                    sql.push_str(&format!("{col} != ${}", params.len() + 1));
                    params.push(val.clone());
                }
                Condition::Like(col, pat) => {
                    sql.push_str(&format!("{col} LIKE ${}", params.len() + 1));
                    params.push(pat.clone());
                }
                Condition::Gt(col, val) => {
                    sql.push_str(&format!("{col} > ${}", params.len() + 1));
                    params.push(val.clone());
                }
                Condition::Lt(col, val) => {
                    sql.push_str(&format!("{col} < ${}", params.len() + 1));
                    params.push(val.clone());
                }
                Condition::In(col, vals) => {
                    let placeholders: Vec<_> = vals
                        .iter()
                        .map(|v| {
                            params.push(v.clone());
                            format!("${}", params.len())
                        })
                        .collect();
                    sql.push_str(&format!("{col} IN ({})", placeholders.join(", ")));
                }
                Condition::IsNull(col) => {
                    sql.push_str(&format!("{col} IS NULL"));
                }
                Condition::IsNotNull(col) => {
                    sql.push_str(&format!("{col} IS NOT NULL"));
                }
            }
        }
    }

    fn append_order(&self, sql: &mut String) {
        if self.order.is_empty() {
            return;
        }
        sql.push_str(" ORDER BY ");
        let clauses: Vec<_> = self
            .order
            .iter()
            .map(|(col, asc)| {
                if *asc {
                    format!("{col} ASC")
                } else {
                    format!("{col} DESC")
                }
            })
            .collect();
        sql.push_str(&clauses.join(", "));
    }

    fn append_limit_offset(&self, sql: &mut String) {
        if let Some(limit) = self.limit_val {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = self.offset_val {
            sql.push_str(&format!(" OFFSET {offset}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_select() {
        let (sql, params) = QueryBuilder::new("book").build_select();
        assert_eq!(sql, "SELECT * FROM book");
        assert!(params.is_empty());
    }

    #[test]
    fn test_where_eq() {
        let (sql, params) = QueryBuilder::new("book")
            .where_eq("name", "dune")
            .build_select();
        assert_eq!(sql, "SELECT * FROM book WHERE name = $1");
        assert_eq!(params, vec!["dune"]);
    }

    #[test]
    fn test_total_count_projection() {
        let (sql, params) = QueryBuilder::new("book")
            .columns(&["id", "name"])
            .with_total_count()
            .build_select();
        assert_eq!(
            sql,
            "SELECT id, name, count(*) OVER () AS total_count FROM book"
        );
        assert!(params.is_empty());
    }

    #[test]
    fn test_paged_list_query() {
        let (sql, params) = QueryBuilder::new("book")
            .with_total_count()
            .where_eq("author_id", "42")
            .order_by("id", true)
            .page(&PageParams::new(100, 50))
            .build_select();
        assert_eq!(
            sql,
            "SELECT *, count(*) OVER () AS total_count FROM book \
             WHERE author_id = $1 ORDER BY id ASC LIMIT 50 OFFSET 100"
        );
        assert_eq!(params, vec!["42"]);
    }

    #[test]
    fn test_complex_conditions() {
        let (sql, params) = QueryBuilder::new("book")
            .where_eq("status", "published")
            .where_like("name", "%dune%")
            .where_in("author_id", &["1", "2"])
            .where_not_null("released_at")
            .order_by("released_at", false)
            .build_select();
        assert_eq!(
            sql,
            "SELECT * FROM book WHERE status = $1 AND name LIKE $2 \
             AND author_id IN ($3, $4) AND released_at IS NOT NULL \
             ORDER BY released_at DESC"
        );
        assert_eq!(params, vec!["published", "%dune%", "1", "2"]);
    }

    #[test]
    fn test_count_query() {
        let (sql, params) = QueryBuilder::new("book")
            .where_gt("pages", "100")
            .build_count();
        assert_eq!(sql, "SELECT COUNT(*) FROM book WHERE pages > $1");
        assert_eq!(params, vec!["100"]);
    }
}

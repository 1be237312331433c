//! Declarative filter sets for list queries.
//!
//! A [`FilterSet`] is an explicit, construction-time mapping from filter
//! name to a typed accessor on the request's query-param struct. Applying
//! the set walks the accessors in declaration order and adds a condition
//! for each filter the request actually carries. Whether a filter applies
//! is a compile-time-checked field access, not a runtime probe.
//!
//! ```ignore
//! struct BookParams {
//!     author_id: Option<i64>,
//!     name: Option<String>,
//! }
//!
//! let filters = FilterSet::new()
//!     .with("author_id", |p: &BookParams| {
//!         p.author_id.map(|id| Filter::eq("author_id", id))
//!     })
//!     .with("name", |p: &BookParams| {
//!         p.name.as_ref().map(|n| Filter::like("name", format!("%{n}%")))
//!     });
//!
//! let builder = filters.apply(&params, QueryBuilder::new("book"));
//! ```

use crate::query::QueryBuilder;

/// Comparison operator of a single filter condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    NotEq,
    Like,
    Gt,
    Lt,
}

/// One concrete condition extracted from request params.
#[derive(Debug, Clone)]
pub struct Filter {
    pub column: &'static str,
    pub op: FilterOp,
    pub value: String,
}

impl Filter {
    pub fn new(column: &'static str, op: FilterOp, value: impl ToString) -> Self {
        Self {
            column,
            op,
            value: value.to_string(),
        }
    }

    pub fn eq(column: &'static str, value: impl ToString) -> Self {
        Self::new(column, FilterOp::Eq, value)
    }

    pub fn not_eq(column: &'static str, value: impl ToString) -> Self {
        Self::new(column, FilterOp::NotEq, value)
    }

    pub fn like(column: &'static str, value: impl ToString) -> Self {
        Self::new(column, FilterOp::Like, value)
    }

    pub fn gt(column: &'static str, value: impl ToString) -> Self {
        Self::new(column, FilterOp::Gt, value)
    }

    pub fn lt(column: &'static str, value: impl ToString) -> Self {
        Self::new(column, FilterOp::Lt, value)
    }
}

type Accessor<P> = Box<dyn Fn(&P) -> Option<Filter> + Send + Sync>;

/// An ordered set of named filter accessors over a params type `P`.
pub struct FilterSet<P> {
    filters: Vec<(&'static str, Accessor<P>)>,
}

impl<P> Default for FilterSet<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> FilterSet<P> {
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
        }
    }

    /// Register a filter under `name`. The accessor returns `None` when the
    /// request does not carry the filter.
    pub fn with(
        mut self,
        name: &'static str,
        accessor: impl Fn(&P) -> Option<Filter> + Send + Sync + 'static,
    ) -> Self {
        self.filters.push((name, Box::new(accessor)));
        self
    }

    /// Names of the registered filters, in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.filters.iter().map(|(name, _)| *name)
    }

    /// Fold every present filter into the builder, in declaration order.
    pub fn apply(&self, params: &P, mut builder: QueryBuilder) -> QueryBuilder {
        for (_, accessor) in &self.filters {
            if let Some(filter) = accessor(params) {
                builder = builder.filter(filter);
            }
        }
        builder
    }
}

impl<P> std::fmt::Debug for FilterSet<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterSet")
            .field("names", &self.names().collect::<Vec<_>>())
            .finish()
    }
}

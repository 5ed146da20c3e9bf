//! Query types for document lookups
//!
//! A [`Query`] names a collection and narrows it with [`Filter`]s. Filters
//! cover the two shapes the platform actually needs: field equality and
//! membership in an array field.

use serde_json::Value;

/// Field filter applied to documents in a collection
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Field equals value
    Eq {
        /// Field name (top-level)
        field: String,
        /// Expected value
        value: Value,
    },
    /// Array field contains value
    Contains {
        /// Field name (top-level, must hold an array)
        field: String,
        /// Value that must be a member
        value: Value,
    },
}

impl Filter {
    /// Equality filter
    pub fn eq(field: impl Into<String>, value: Value) -> Self {
        Self::Eq {
            field: field.into(),
            value,
        }
    }

    /// Array-membership filter
    pub fn contains(field: impl Into<String>, value: Value) -> Self {
        Self::Contains {
            field: field.into(),
            value,
        }
    }

    /// Check whether a document matches this filter
    pub fn matches(&self, doc: &Value) -> bool {
        match self {
            Self::Eq { field, value } => doc.get(field) == Some(value),
            Self::Contains { field, value } => doc
                .get(field)
                .and_then(Value::as_array)
                .is_some_and(|items| items.contains(value)),
        }
    }
}

/// Sort direction for ordered queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Ascending order
    #[default]
    Ascending,
    /// Descending order
    Descending,
}

/// A query over one collection
#[derive(Debug, Clone)]
pub struct Query {
    /// Collection to search
    pub collection: String,
    /// Filters, all of which must match
    pub filters: Vec<Filter>,
    /// Optional ordering field
    pub order_by: Option<(String, Direction)>,
    /// Number of matching documents to skip
    pub offset: usize,
    /// Maximum number of documents to return
    pub limit: Option<usize>,
}

impl Query {
    /// Start a query over a collection
    pub fn collection(name: impl Into<String>) -> Self {
        Self {
            collection: name.into(),
            filters: Vec::new(),
            order_by: None,
            offset: 0,
            limit: None,
        }
    }

    /// Add a filter
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Order results by a field
    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some((field.into(), direction));
        self
    }

    /// Skip the first `offset` matches
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Return at most `limit` matches
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

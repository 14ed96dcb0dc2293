//! Equality query construction for document stores.
//!
//! Callers describe the records they want with [`Criteria`], a flat map of field names to scalar
//! values. [`QueryBuilder::matching`] folds those pairs into a [`Query`] whose filter is a
//! conjunction of equality predicates, and backends execute it through a [`QueryVisitor`].
//!
//! # Query Building
//!
//! ```ignore
//! use ltistore::query::{Criteria, Query};
//!
//! let criteria = Criteria::new()
//!     .eq("platformId", "platform-1")
//!     .eq("location", "Vancouver");
//!
//! let query = Query::builder().matching(&criteria).build();
//! ```
//!
//! No implicit limit is applied: an empty [`Criteria`] produces a query over the whole collection.

use std::{collections::BTreeMap, fmt};

use bson::Bson;
use serde::{Deserialize, Serialize};

use crate::error::DocumentStoreError;

/// A scalar value an equality predicate can compare against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Boolean value.
    Bool(bool),
    /// Integral number.
    Int(i64),
    /// Floating point number.
    Double(f64),
    /// String value.
    String(String),
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Int(value.into())
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Double(value)
    }
}

impl From<FieldValue> for Bson {
    fn from(value: FieldValue) -> Self {
        match value {
            FieldValue::Bool(value) => Bson::Boolean(value),
            FieldValue::Int(value) => Bson::Int64(value),
            FieldValue::Double(value) => Bson::Double(value),
            FieldValue::String(value) => Bson::String(value),
        }
    }
}

/// A flat field-to-value equality map identifying a set of documents.
///
/// Fields are kept sorted, so two criteria holding the same pairs build the same query no matter
/// in which order the pairs were added.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Criteria(BTreeMap<String, FieldValue>);

impl Criteria {
    /// Creates empty criteria, which match every document.
    pub fn new() -> Self {
        Criteria(BTreeMap::new())
    }

    /// Adds an equality constraint, replacing any earlier constraint on the same field.
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(field, value);
        self
    }

    /// Adds an equality constraint in place.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<FieldValue>) {
        self.0.insert(field.into(), value.into());
    }

    /// Returns the value constrained for `field`, if any.
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.0.get(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Criteria
where
    K: Into<String>,
    V: Into<FieldValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Criteria(
            iter.into_iter()
                .map(|(field, value)| (field.into(), value.into()))
                .collect(),
        )
    }
}

impl fmt::Display for Criteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => f.write_str(&json),
            Err(_) => write!(f, "{:?}", self.0),
        }
    }
}

/// A filter expression for querying documents.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Logical AND of multiple expressions (all must match).
    And(Vec<Expr>),
    /// The field is present and equal to the value.
    Eq {
        /// The field name to compare.
        field: String,
        /// The value to compare against.
        value: Bson,
    },
}

impl Expr {
    /// Combines this expression with another using logical AND.
    ///
    /// If this expression is already an AND, the other expression is appended
    /// to the list. Otherwise, a new AND expression is created.
    pub fn and(self, other: Expr) -> Self {
        match self {
            Expr::And(mut list) => {
                list.push(other);
                Expr::And(list)
            }
            _ => Expr::And(vec![self, other]),
        }
    }
}

/// Helper for constructing filter expressions.
pub struct Filter;

impl Filter {
    /// Creates an equality filter expression.
    pub fn eq(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::Eq { field: field.into(), value: value.into() }
    }

    /// Creates a logical AND filter expression.
    pub fn and(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::And(exprs.into_iter().collect())
    }
}

/// A query over one collection. `filter == None` selects every document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    /// Optional filter expression to match documents.
    pub filter: Option<Expr>,
}

impl Query {
    /// Creates a new unfiltered query.
    pub fn new() -> Self {
        Query { filter: None }
    }

    /// Creates a new query builder for fluent construction.
    pub fn builder() -> QueryBuilder {
        QueryBuilder::new()
    }

    /// Shorthand for `Query::builder().matching(criteria).build()`.
    pub fn matching(criteria: &Criteria) -> Self {
        QueryBuilder::new().matching(criteria).build()
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    query: Query,
}

impl QueryBuilder {
    /// Creates a new query builder.
    pub fn new() -> Self {
        QueryBuilder { query: Query::default() }
    }

    /// Adds a filter expression, AND-ed with whatever the query already filters on.
    pub fn filter(mut self, filter: Expr) -> Self {
        self.query.filter = Some(match self.query.filter.take() {
            Some(existing) => existing.and(filter),
            None => filter,
        });
        self
    }

    /// Adds a single `field == value` constraint.
    pub fn where_eq(self, field: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.filter(Filter::eq(field, value))
    }

    /// Adds one equality constraint per entry of `criteria`.
    pub fn matching(self, criteria: &Criteria) -> Self {
        criteria
            .iter()
            .fold(self, |builder, (field, value)| builder.where_eq(field.as_str(), value.clone()))
    }

    /// Builds and returns the final query.
    pub fn build(self) -> Query {
        self.query
    }
}

pub trait QueryVisitor {
    type Output;
    type Error: Into<DocumentStoreError>;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_eq(&mut self, field: &str, value: &Bson) -> Result<Self::Output, Self::Error>;

    fn visit_expr(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        match expr {
            Expr::And(exprs) => self.visit_and(exprs),
            Expr::Eq { field, value } => self.visit_eq(field, value),
        }
    }
}

//! Query expression evaluation for in-memory document filtering.

use bson::{Bson, Document};

use ltistore_core::{
    query::{QueryVisitor, Expr},
    error::DocumentStoreError,
};


/// Returns the value of an integral BSON number.
fn as_integer(value: &Bson) -> Option<i64> {
    match value {
        Bson::Int32(value) => Some(i64::from(*value)),
        Bson::Int64(value) => Some(*value),
        _ => None,
    }
}

/// Exact comparison of a double against an integer, without rounding the integer.
fn double_equals_integer(double: f64, integer: i64) -> bool {
    double.fract() == 0.0 && double as i128 == i128::from(integer)
}

/// BSON equality as `$eq` evaluates it.
///
/// Numbers compare by value across `Int32`, `Int64` and `Double`; integers never pass through
/// floating point. Arrays and embedded documents compare element by element, in order.
pub(crate) fn values_equal(left: &Bson, right: &Bson) -> bool {
    match (left, right) {
        (Bson::Double(a), Bson::Double(b)) => a == b,
        (Bson::Double(double), other) | (other, Bson::Double(double)) => {
            as_integer(other).is_some_and(|integer| double_equals_integer(*double, integer))
        }
        (Bson::Array(a), Bson::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y))
        }
        (Bson::Document(a), Bson::Document(b)) => {
            a.len() == b.len()
                && a.iter()
                    .zip(b)
                    .all(|((key_a, value_a), (key_b, value_b))| key_a == key_b && values_equal(value_a, value_b))
        }
        _ => match (as_integer(left), as_integer(right)) {
            (Some(a), Some(b)) => a == b,
            _ => left == right,
        },
    }
}


pub(crate) struct DocumentEvaluator<'a> {
    document: &'a Document,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self { document }
    }

    /// Returns true when `document` satisfies `filter`. `None` matches everything.
    pub fn matches(document: &'a Document, filter: Option<&Expr>) -> bool {
        match filter {
            Some(expr) => DocumentEvaluator::new(document)
                .visit_expr(expr)
                .unwrap_or(false),
            None => true,
        }
    }
}

impl<'a> QueryVisitor for DocumentEvaluator<'a> {
    type Output = bool;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if !self.visit_expr(expr)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn visit_eq(&mut self, field: &str, value: &Bson) -> Result<Self::Output, Self::Error> {
        Ok(
            self.document
                .get(field)
                .is_some_and(|field_value| values_equal(field_value, value))
        )
    }
}

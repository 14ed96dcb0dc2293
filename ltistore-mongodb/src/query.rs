//! Query translation from ltistore filter expressions to MongoDB query syntax.

use bson::{Bson, Document, doc};

use ltistore_core::{
    query::{QueryVisitor, Expr, Query},
    error::{DocumentStoreError, DocumentStoreResult},
};

use crate::sanitizer::KeySanitizer;


/// Translates filter expressions into MongoDB query documents.
///
/// Field names are escaped the same way stored keys are, so a filter keeps matching documents
/// whose keys needed escaping.
pub(crate) struct MongoQueryTranslator;

impl MongoQueryTranslator {
    /// Builds the filter document for `query`. An absent filter matches every document.
    pub(crate) fn translate(query: &Query) -> DocumentStoreResult<Document> {
        match &query.filter {
            Some(expr) => MongoQueryTranslator.visit_expr(expr),
            None => Ok(doc! {}),
        }
    }
}

impl QueryVisitor for MongoQueryTranslator {
    type Output = Document;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            "$and": exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    fn visit_eq(&mut self, field: &str, value: &Bson) -> Result<Self::Output, Self::Error> {
        let field = KeySanitizer::escape_key(field);

        Ok(doc! {
            field: { "$eq": value.clone() },
        })
    }
}

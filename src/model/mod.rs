//! Typed records for the three portfolio collections and their normalizers.
//!
//! Normalization is total: every recognized field that is absent or falsy
//! is replaced by its documented default, unknown fields are dropped, and no
//! document is ever rejected.

mod post;
mod project;
mod tip;

pub use post::{format_spanish_date, Post};
pub use project::{BadgeTone, Project, ProjectStatus};
pub use tip::Tip;

use crate::filter::Filterable;
use crate::store::{CollectionQuery, FieldValue, RawDocument};

/// Raw document → typed record. Never fails.
pub trait FromDocument: Sized {
    fn from_document(doc: &RawDocument) -> Self;
}

/// A record type backed by one store collection and shown on one page.
pub trait Entity: FromDocument + Filterable + Clone + Send + Sync + 'static {
    /// Collection name in the store.
    const COLLECTION: &'static str;
    /// Shown when the page's subscription fails.
    const LOAD_ERROR: &'static str;
    /// Shown when the derived view is empty.
    const EMPTY_MESSAGE: &'static str;

    fn id(&self) -> &str;

    /// The query the page subscribes with. Unordered unless overridden.
    fn query() -> CollectionQuery {
        CollectionQuery::new(Self::COLLECTION)
    }
}

/// Normalizes a whole snapshot, keeping the store's order.
pub fn normalize_all<T: FromDocument>(docs: &[RawDocument]) -> Vec<T> {
    docs.iter().map(T::from_document).collect()
}

/// Text of `field`, or `default` when the field is absent or falsy.
pub(crate) fn text_or(doc: &RawDocument, field: &str, default: &str) -> String {
    doc.get(field)
        .and_then(FieldValue::as_text)
        .unwrap_or_else(|| default.to_string())
}

/// String entries of an array field; anything else yields an empty list.
pub(crate) fn string_list(doc: &RawDocument, field: &str) -> Vec<String> {
    doc.get(field)
        .and_then(FieldValue::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| match item {
                    FieldValue::String(s) if !s.is_empty() => Some(s.clone()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_or_defaults_falsy_values() {
        let doc = RawDocument::new("x")
            .with("empty", "")
            .with("zero", 0i64)
            .with("num", 7i64)
            .with("text", "hola");
        assert_eq!(text_or(&doc, "missing", "d"), "d");
        assert_eq!(text_or(&doc, "empty", "d"), "d");
        assert_eq!(text_or(&doc, "zero", "d"), "d");
        assert_eq!(text_or(&doc, "num", "d"), "7");
        assert_eq!(text_or(&doc, "text", "d"), "hola");
    }

    #[test]
    fn test_string_list_drops_non_strings() {
        let doc = RawDocument::new("x").with(
            "tags",
            FieldValue::Array(vec![
                FieldValue::from("Go"),
                FieldValue::Integer(3),
                FieldValue::from(""),
                FieldValue::from("CLI"),
            ]),
        );
        assert_eq!(string_list(&doc, "tags"), ["Go", "CLI"]);
        assert!(string_list(&doc, "missing").is_empty());

        let scalar = RawDocument::new("y").with("tags", "Go");
        assert!(string_list(&scalar, "tags").is_empty());
    }
}

use chrono::{DateTime, Datelike, Utc};

use super::{text_or, Entity, FromDocument};
use crate::filter::{Facet, Filterable};
use crate::store::{CollectionQuery, Direction, RawDocument};

const MONTHS: [&str; 12] = [
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "septiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

/// Long-form Spanish date in UTC, e.g. `5 de marzo de 2024`.
pub fn format_spanish_date(ts: DateTime<Utc>) -> String {
    let month = MONTHS[ts.month0() as usize];
    format!("{} de {} de {}", ts.day(), month, ts.year())
}

/// A blog post.
#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub content: String,
    pub author: String,
    pub image_url: String,
    pub read_time: String,
    /// Display rendering of `created_at`; empty when there is no timestamp.
    pub date: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl Post {
    /// Body split into paragraphs on blank lines.
    pub fn paragraphs(&self) -> impl Iterator<Item = &str> {
        self.content
            .split("\n\n")
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }

    pub fn read_time_label(&self) -> String {
        format!("{} min de lectura", self.read_time)
    }
}

impl FromDocument for Post {
    fn from_document(doc: &RawDocument) -> Self {
        let created_at = doc.get("createdAt").and_then(|v| v.as_timestamp());
        Self {
            id: doc.id.clone(),
            title: text_or(doc, "title", "Sin título"),
            description: text_or(doc, "description", "Sin descripción"),
            category: text_or(doc, "category", "Sin categoría"),
            content: text_or(doc, "content", ""),
            author: text_or(doc, "author", ""),
            image_url: text_or(doc, "imageUrl", ""),
            read_time: text_or(doc, "readTime", "0"),
            date: created_at.map(format_spanish_date).unwrap_or_default(),
            created_at,
        }
    }
}

impl Filterable for Post {
    const FACETS: &'static [Facet] = &[Facet::Category];

    fn title(&self) -> &str {
        &self.title
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn facet_matches(&self, facet: Facet, selected: &str) -> bool {
        matches!(facet, Facet::Category) && self.category == selected
    }

    fn facet_values(&self, facet: Facet) -> Vec<&str> {
        match facet {
            Facet::Category => vec![self.category.as_str()],
            _ => Vec::new(),
        }
    }
}

impl Entity for Post {
    const COLLECTION: &'static str = "posts";
    const LOAD_ERROR: &'static str =
        "Error al cargar los posts. Por favor, intenta de nuevo más tarde.";
    const EMPTY_MESSAGE: &'static str = "No se encontraron artículos que coincidan con tu búsqueda.";

    fn id(&self) -> &str {
        &self.id
    }

    /// Newest first. The store does the sorting.
    fn query() -> CollectionQuery {
        CollectionQuery::new(Self::COLLECTION).ordered_by("createdAt", Direction::Descending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn ts(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_spanish_date() {
        assert_eq!(format_spanish_date(ts(2024, 3, 5)), "5 de marzo de 2024");
        assert_eq!(format_spanish_date(ts(2023, 12, 31)), "31 de diciembre de 2023");
    }

    #[test]
    fn test_spanish_date_uses_utc() {
        let late = Utc.with_ymd_and_hms(2024, 1, 31, 23, 30, 0).unwrap();
        assert_eq!(format_spanish_date(late), "31 de enero de 2024");
    }

    #[test]
    fn test_empty_document_gets_defaults() {
        let post = Post::from_document(&RawDocument::new("p1"));
        assert_eq!(
            post,
            Post {
                id: "p1".into(),
                title: "Sin título".into(),
                description: "Sin descripción".into(),
                category: "Sin categoría".into(),
                content: String::new(),
                author: String::new(),
                image_url: String::new(),
                read_time: "0".into(),
                date: String::new(),
                created_at: None,
            }
        );
    }

    #[test]
    fn test_full_document() {
        let doc = RawDocument::new("p2")
            .with("title", "Hola")
            .with("description", "Intro")
            .with("category", "Rust")
            .with("content", "uno\n\ndos\n\n\n\ntres")
            .with("author", "Ana")
            .with("imageUrl", "https://img")
            .with("readTime", 5i64)
            .with("createdAt", ts(2024, 3, 5))
            .with("views", 10i64);
        let post = Post::from_document(&doc);

        assert_eq!(post.title, "Hola");
        assert_eq!(post.read_time, "5");
        assert_eq!(post.read_time_label(), "5 min de lectura");
        assert_eq!(post.date, "5 de marzo de 2024");
        assert_eq!(post.created_at, Some(ts(2024, 3, 5)));
        assert_eq!(post.paragraphs().collect::<Vec<_>>(), ["uno", "dos", "tres"]);
    }

    #[test]
    fn test_falsy_fields_are_defaulted() {
        let doc = RawDocument::new("p3")
            .with("title", "")
            .with("readTime", 0i64)
            .with("category", crate::store::FieldValue::Null);
        let post = Post::from_document(&doc);
        assert_eq!(post.title, "Sin título");
        assert_eq!(post.read_time, "0");
        assert_eq!(post.category, "Sin categoría");
    }

    #[test]
    fn test_query_orders_newest_first() {
        let query = Post::query();
        assert_eq!(query.collection, "posts");
        assert_eq!(query.order_by.map(|o| o.to_string()).as_deref(), Some("createdAt desc"));
    }
}

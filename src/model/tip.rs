use std::borrow::Cow;

use super::{text_or, Entity, FromDocument};
use crate::filter::{Facet, Filterable};
use crate::store::RawDocument;

/// A short coding tip with an optional snippet.
///
/// `date` is whatever string the store holds; unlike posts it is not derived
/// from a timestamp and is compared verbatim by the date facet.
#[derive(Debug, Clone, PartialEq)]
pub struct Tip {
    pub id: String,
    pub title: String,
    pub description: String,
    pub code: String,
    pub language: String,
    pub date: String,
}

impl Tip {
    /// The snippet with literal `\n` sequences turned into line breaks.
    pub fn formatted_code(&self) -> Cow<'_, str> {
        if self.code.contains("\\n") {
            Cow::Owned(self.code.replace("\\n", "\n"))
        } else {
            Cow::Borrowed(&self.code)
        }
    }

    pub fn highlight_language(&self) -> &str {
        if self.language.is_empty() {
            "javascript"
        } else {
            &self.language
        }
    }
}

impl FromDocument for Tip {
    fn from_document(doc: &RawDocument) -> Self {
        Self {
            id: doc.id.clone(),
            title: text_or(doc, "title", ""),
            description: text_or(doc, "description", ""),
            code: text_or(doc, "code", ""),
            language: text_or(doc, "language", ""),
            date: text_or(doc, "date", ""),
        }
    }
}

impl Filterable for Tip {
    const FACETS: &'static [Facet] = &[Facet::Language, Facet::Date];

    fn title(&self) -> &str {
        &self.title
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn facet_matches(&self, facet: Facet, selected: &str) -> bool {
        match facet {
            Facet::Language => self.language == selected,
            Facet::Date => self.date == selected,
            _ => false,
        }
    }

    fn facet_values(&self, facet: Facet) -> Vec<&str> {
        match facet {
            Facet::Language => vec![self.language.as_str()],
            Facet::Date => vec![self.date.as_str()],
            _ => Vec::new(),
        }
    }
}

impl Entity for Tip {
    const COLLECTION: &'static str = "tips";
    const LOAD_ERROR: &'static str =
        "Error al cargar los consejos. Por favor, intenta de nuevo más tarde.";
    const EMPTY_MESSAGE: &'static str = "No se encontraron consejos que coincidan con tu búsqueda.";

    fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{apply, facet_options, FilterContext};
    use pretty_assertions::assert_eq;

    fn tip(id: &str, language: &str, date: &str) -> Tip {
        Tip::from_document(
            &RawDocument::new(id)
                .with("title", id)
                .with("language", language)
                .with("date", date),
        )
    }

    #[test]
    fn test_defaults_are_empty() {
        let tip = Tip::from_document(&RawDocument::new("t0"));
        assert_eq!(tip.title, "");
        assert_eq!(tip.code, "");
        assert_eq!(tip.highlight_language(), "javascript");
    }

    #[test]
    fn test_formatted_code_unescapes_newlines() {
        let tip = Tip::from_document(&RawDocument::new("t1").with("code", "let a = 1;\\nlet b = 2;"));
        assert_eq!(tip.formatted_code(), "let a = 1;\nlet b = 2;");

        let plain = Tip::from_document(&RawDocument::new("t2").with("code", "x"));
        assert!(matches!(plain.formatted_code(), Cow::Borrowed("x")));
    }

    #[test]
    fn test_language_and_date_facets() {
        let tips = vec![
            tip("a", "rust", "2024-01"),
            tip("b", "go", "2024-01"),
            tip("c", "rust", "2024-02"),
        ];

        let ctx = FilterContext::new()
            .with_facet(Facet::Language, "rust")
            .with_facet(Facet::Date, "2024-01");
        let ids: Vec<_> = apply(&tips, &ctx).iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["a"]);

        assert_eq!(facet_options(&tips, Facet::Language), ["rust", "go"]);
        assert_eq!(facet_options(&tips, Facet::Date), ["2024-01", "2024-02"]);
    }

    #[test]
    fn test_date_is_kept_verbatim() {
        let tip = Tip::from_document(&RawDocument::new("t").with("date", "Marzo 2024"));
        assert_eq!(tip.date, "Marzo 2024");
    }
}

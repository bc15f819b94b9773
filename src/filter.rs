//! Filter predicate composition for page views.
//!
//! A [`FilterContext`] holds one page's criteria: a free-text query plus at
//! most one selected value per [`Facet`]. An item is in the derived view when
//! it satisfies every criterion. Empty criteria filter nothing, so an empty
//! context yields the full list in its original order.

use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// A single-valued filter dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Facet {
    Category,
    Tag,
    Status,
    Language,
    Date,
}

impl Facet {
    pub fn as_str(self) -> &'static str {
        match self {
            Facet::Category => "category",
            Facet::Tag => "tag",
            Facet::Status => "status",
            Facet::Language => "language",
            Facet::Date => "date",
        }
    }
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("{facet} is not a filter for {collection}")]
    UnsupportedFacet {
        facet: Facet,
        collection: &'static str,
    },
}

/// Anything a page can filter.
pub trait Filterable {
    /// Facets this item type can be filtered by.
    const FACETS: &'static [Facet];

    fn title(&self) -> &str;
    fn description(&self) -> &str;

    /// Whether the item satisfies `facet == selected`. Membership for
    /// multi-valued fields. Unsupported facets never match.
    fn facet_matches(&self, facet: Facet, selected: &str) -> bool;

    /// The item's values along `facet`, used to derive option lists.
    fn facet_values(&self, facet: Facet) -> Vec<&str>;

    /// Facets with a closed set of legal values return them here instead of
    /// deriving options from the data.
    fn fixed_options(_facet: Facet) -> Option<&'static [&'static str]> {
        None
    }
}

/// Per-page filter criteria.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterContext {
    search: String,
    selections: BTreeMap<Facet, String>,
}

impl FilterContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn set_search(&mut self, query: impl Into<String>) {
        self.search = query.into();
    }

    pub fn with_search(mut self, query: impl Into<String>) -> Self {
        self.set_search(query);
        self
    }

    /// Selects `value` on `facet`; an empty value clears the facet.
    pub fn select(&mut self, facet: Facet, value: impl Into<String>) {
        let value = value.into();
        if value.is_empty() {
            self.selections.remove(&facet);
        } else {
            self.selections.insert(facet, value);
        }
    }

    pub fn with_facet(mut self, facet: Facet, value: impl Into<String>) -> Self {
        self.select(facet, value);
        self
    }

    pub fn selection(&self, facet: Facet) -> Option<&str> {
        self.selections.get(&facet).map(String::as_str)
    }

    pub fn selections(&self) -> impl Iterator<Item = (Facet, &str)> {
        self.selections.iter().map(|(f, v)| (*f, v.as_str()))
    }

    pub fn clear(&mut self) {
        self.search.clear();
        self.selections.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.search.is_empty() && self.selections.is_empty()
    }

    /// Builds the composed predicate. The query is lowercased once here,
    /// not per item.
    pub fn predicate<T: Filterable>(&self) -> impl Fn(&T) -> bool + '_ {
        let needle = self.search.to_lowercase();
        move |item| {
            matches_search(item, &needle)
                && self
                    .selections
                    .iter()
                    .all(|(facet, value)| value.is_empty() || item.facet_matches(*facet, value))
        }
    }
}

/// Case-insensitive substring match on title or description.
/// `needle` must already be lowercase; the empty needle matches everything.
fn matches_search<T: Filterable>(item: &T, needle: &str) -> bool {
    needle.is_empty()
        || item.title().to_lowercase().contains(needle)
        || item.description().to_lowercase().contains(needle)
}

/// Derives the view: every item satisfying all criteria, in source order.
pub fn apply<'a, T: Filterable>(items: &'a [T], ctx: &FilterContext) -> Vec<&'a T> {
    let predicate = ctx.predicate::<T>();
    items.iter().filter(|item| predicate(item)).collect()
}

/// Options for a facet selector: the fixed legal values when the facet has
/// them, otherwise the distinct non-empty values present in `items`, in
/// first-seen order.
pub fn facet_options<T: Filterable>(items: &[T], facet: Facet) -> Vec<String> {
    if let Some(fixed) = T::fixed_options(facet) {
        return fixed.iter().map(|s| s.to_string()).collect();
    }

    let mut seen = std::collections::HashSet::new();
    let mut options = Vec::new();
    for value in items.iter().flat_map(|item| item.facet_values(facet)) {
        if !value.is_empty() && seen.insert(value) {
            options.push(value.to_string());
        }
    }
    options
}

/// Rejects facets the item type cannot be filtered by.
pub fn check_facet<T: Filterable>(facet: Facet, collection: &'static str) -> Result<(), FilterError> {
    if T::FACETS.contains(&facet) {
        Ok(())
    } else {
        Err(FilterError::UnsupportedFacet { facet, collection })
    }
}

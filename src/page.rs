//! Per-page list state.
//!
//! A [`Page`] ties together one live subscription, one filter context and
//! the list state those feed:
//!
//! ```text
//! Loading ──snapshot──▶ Ready(list) ──snapshot──▶ Ready(list')
//!    │
//!    └──────error─────▶ Error(message)   (terminal for this mount)
//! ```
//!
//! The filtered view is never stored. [`Page::view`] derives it from the
//! current list and criteria on every call.

use std::sync::Arc;

use crate::filter::{self, check_facet, Facet, FilterContext, FilterError};
use crate::live::{SnapshotResult, Subscription};
use crate::model::{normalize_all, Entity, FromDocument, Post};
use crate::store::DocumentSource;

#[derive(Debug, Clone, PartialEq)]
pub enum PageState<T> {
    Loading,
    Ready(Vec<T>),
    /// User-facing message. The cause is only logged.
    Error(String),
}

impl<T> PageState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, PageState::Loading)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, PageState::Error(_))
    }
}

/// One mounted list page (blog, projects or tips).
#[derive(Debug)]
pub struct Page<T: Entity> {
    state: PageState<T>,
    filters: FilterContext,
    subscription: Option<Subscription>,
}

impl<T: Entity> Page<T> {
    /// Mounts the page: state starts as `Loading` and the subscription is
    /// opened immediately.
    pub fn mount<S: DocumentSource>(source: Arc<S>) -> Self {
        Self {
            state: PageState::Loading,
            filters: FilterContext::new(),
            subscription: Some(Subscription::open(source, T::query())),
        }
    }

    /// Releases the current subscription and opens a fresh one. The page goes
    /// back to `Loading`; filters are kept.
    pub fn resubscribe<S: DocumentSource>(&mut self, source: Arc<S>) {
        if let Some(old) = self.subscription.take() {
            old.unsubscribe();
        }
        self.state = PageState::Loading;
        self.subscription = Some(Subscription::open(source, T::query()));
    }

    /// Waits for the next snapshot and applies it.
    ///
    /// Returns `false` when no further update can arrive: the page was
    /// unmounted, has failed, or the subscription ended.
    pub async fn next_update(&mut self) -> bool {
        let Some(subscription) = self.subscription.as_mut() else {
            return false;
        };
        match subscription.next().await {
            Some(result) => {
                self.apply(result);
                true
            }
            None => {
                self.subscription = None;
                false
            }
        }
    }

    /// The state transition for one subscription event.
    pub fn apply(&mut self, result: SnapshotResult) {
        if self.state.is_error() {
            tracing::debug!(collection = T::COLLECTION, "Ignoring event on failed page");
            return;
        }

        match result {
            Ok(snapshot) => {
                let items: Vec<T> = normalize_all(&snapshot.documents);
                tracing::debug!(collection = T::COLLECTION, count = items.len(), "Page list replaced");
                self.state = PageState::Ready(items);
            }
            Err(e) => {
                tracing::error!(collection = T::COLLECTION, error = %e, "Failed to load page");
                self.state = PageState::Error(T::LOAD_ERROR.to_string());
                self.subscription = None;
            }
        }
    }

    pub fn state(&self) -> &PageState<T> {
        &self.state
    }

    /// The full, unfiltered list; empty unless `Ready`.
    pub fn items(&self) -> &[T] {
        match &self.state {
            PageState::Ready(items) => items,
            _ => &[],
        }
    }

    /// The derived view: items matching every criterion, in store order.
    pub fn view(&self) -> Vec<&T> {
        filter::apply(self.items(), &self.filters)
    }

    /// The message to show instead of a list, if any.
    pub fn notice(&self) -> Option<&str> {
        match &self.state {
            PageState::Loading => None,
            PageState::Error(message) => Some(message.as_str()),
            PageState::Ready(_) if self.view().is_empty() => Some(T::EMPTY_MESSAGE),
            PageState::Ready(_) => None,
        }
    }

    pub fn facet_options(&self, facet: Facet) -> Result<Vec<String>, FilterError> {
        check_facet::<T>(facet, T::COLLECTION)?;
        Ok(filter::facet_options(self.items(), facet))
    }

    pub fn filters(&self) -> &FilterContext {
        &self.filters
    }

    pub fn set_search(&mut self, query: impl Into<String>) {
        self.filters.set_search(query);
    }

    /// Selects a facet value. An empty value clears the facet.
    pub fn select(&mut self, facet: Facet, value: impl Into<String>) -> Result<(), FilterError> {
        check_facet::<T>(facet, T::COLLECTION)?;
        self.filters.select(facet, value);
        Ok(())
    }

    pub fn clear_filters(&mut self) {
        self.filters.clear();
    }

    pub fn is_mounted(&self) -> bool {
        self.subscription.is_some()
    }

    /// Releases the subscription. The last state stays readable but no
    /// snapshot can change it anymore.
    pub fn unmount(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }
}

pub const POST_NOT_FOUND: &str = "Post no encontrado";
pub const POST_LOAD_ERROR: &str = "Error al cargar el post";

/// Outcome of opening a single post.
#[derive(Debug, Clone, PartialEq)]
pub enum PostDetail {
    Found(Post),
    NotFound,
    Failed,
}

impl PostDetail {
    pub fn message(&self) -> Option<&'static str> {
        match self {
            PostDetail::Found(_) => None,
            PostDetail::NotFound => Some(POST_NOT_FOUND),
            PostDetail::Failed => Some(POST_LOAD_ERROR),
        }
    }
}

/// One-shot read of `posts/{id}`.
pub async fn load_post<S: DocumentSource>(source: &S, id: &str) -> PostDetail {
    match source.fetch_one(Post::COLLECTION, id).await {
        Ok(Some(doc)) => PostDetail::Found(Post::from_document(&doc)),
        Ok(None) => {
            tracing::debug!(id = %id, "Post not found");
            PostDetail::NotFound
        }
        Err(e) => {
            tracing::error!(id = %id, error = %e, "Failed to load post");
            PostDetail::Failed
        }
    }
}

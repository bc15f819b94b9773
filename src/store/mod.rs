//! Document sources: where page snapshots come from.
//!
//! - [`FirestoreStore`] reads the portfolio's collections over the Firestore
//!   REST API and detects changes by polling.
//! - [`MemoryStore`] keeps collections in process and notifies watchers on
//!   every write. It backs offline fixtures and the test suite.
//!
//! Both hand out raw, loosely-typed [`RawDocument`]s; turning them into
//! posts, projects and tips is the job of [`crate::model`].

mod document;
mod firestore;
mod memory;
mod types;

use std::future::Future;

pub use document::{FieldValue, RawDocument};
pub use firestore::FirestoreStore;
pub use memory::{MemoryStore, MemoryWatcher};
pub use types::{CollectionQuery, Direction, OrderBy, StoreError};

/// A readable document store.
///
/// `fetch` always returns the complete current contents of the collection,
/// already ordered when the query asks for it. Callers must not re-sort.
pub trait DocumentSource: Send + Sync + 'static {
    type Watcher: ChangeWatcher;

    /// Reads the whole collection.
    fn fetch(
        &self,
        query: &CollectionQuery,
    ) -> impl Future<Output = Result<Vec<RawDocument>, StoreError>> + Send;

    /// Reads a single document, `Ok(None)` when it does not exist.
    fn fetch_one(
        &self,
        collection: &str,
        id: &str,
    ) -> impl Future<Output = Result<Option<RawDocument>, StoreError>> + Send;

    /// Returns a watcher that resolves whenever the collection may have changed.
    fn watch(&self, collection: &str) -> Self::Watcher;
}

/// Change notifications for one collection.
///
/// A wake-up is a hint, not a guarantee of change: subscribers re-read the
/// collection and compare digests.
pub trait ChangeWatcher: Send + 'static {
    fn changed(&mut self) -> impl Future<Output = ()> + Send;
}

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;

use super::document::RawDocument;
use super::types::{CollectionQuery, Direction, StoreError};
use super::{ChangeWatcher, DocumentSource};

/// Maximum fixture file size (16 MB).
const MAX_FIXTURE_SIZE: u64 = 16 * 1024 * 1024;

#[derive(Default)]
struct Collection {
    documents: Vec<RawDocument>,
    failure: Option<String>,
}

struct Inner {
    collections: Mutex<HashMap<String, Collection>>,
    notifiers: Mutex<HashMap<String, watch::Sender<u64>>>,
    latency: Mutex<Duration>,
}

/// In-process document store.
///
/// Documents keep insertion order; ordered queries are sorted here, playing
/// the part the server plays for [`super::FirestoreStore`]. Every write bumps
/// a per-collection version that wakes the collection's watchers.
///
/// Clones share the same data.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<String> = self.collections().keys().cloned().collect();
        names.sort();
        f.debug_struct("MemoryStore")
            .field("collections", &names)
            .finish_non_exhaustive()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                collections: Mutex::new(HashMap::new()),
                notifiers: Mutex::new(HashMap::new()),
                latency: Mutex::new(Duration::ZERO),
            }),
        }
    }

    /// Builds a store from a JSON fixture of the shape
    /// `{"posts": [{"id": "...", ...}], "projects": [...], "tips": [...]}`.
    ///
    /// Entries without a string `id` are skipped with a warning.
    pub fn from_fixture_json(content: &str) -> Result<Self, StoreError> {
        let root: serde_json::Value = serde_json::from_str(content)?;
        let obj = root
            .as_object()
            .ok_or_else(|| StoreError::Decode("fixture root must be an object".into()))?;

        let store = Self::new();
        for (collection, entries) in obj {
            let entries = entries.as_array().ok_or_else(|| {
                StoreError::Decode(format!("fixture collection '{collection}' must be an array"))
            })?;
            let mut documents = Vec::with_capacity(entries.len());
            for (index, entry) in entries.iter().enumerate() {
                match RawDocument::from_json(entry) {
                    Some(doc) => documents.push(doc),
                    None => tracing::warn!(
                        collection = %collection,
                        index = index,
                        "Skipping fixture entry without a string id"
                    ),
                }
            }
            store.set_collection(collection, documents);
        }
        Ok(store)
    }

    /// Reads a fixture file from disk (see [`MemoryStore::from_fixture_json`]).
    pub fn load_fixture(path: &Path) -> Result<Self, StoreError> {
        let unavailable = |e: std::io::Error| {
            StoreError::Unavailable(format!("cannot read fixture '{}': {e}", path.display()))
        };
        let meta = std::fs::metadata(path).map_err(unavailable)?;
        if meta.len() > MAX_FIXTURE_SIZE {
            return Err(StoreError::ResponseTooLarge(MAX_FIXTURE_SIZE as usize));
        }
        let content = std::fs::read_to_string(path).map_err(unavailable)?;
        let store = Self::from_fixture_json(&content)?;
        tracing::info!(path = %path.display(), "Loaded document fixture");
        Ok(store)
    }

    /// Inserts or replaces a document. Replacements keep their position.
    pub fn put(&self, collection: &str, document: RawDocument) {
        {
            let mut collections = self.collections();
            let docs = &mut collections.entry(collection.to_string()).or_default().documents;
            match docs.iter_mut().find(|d| d.id == document.id) {
                Some(existing) => *existing = document,
                None => docs.push(document),
            }
        }
        self.notify(collection);
    }

    /// Removes a document, returning whether it existed.
    pub fn remove(&self, collection: &str, id: &str) -> bool {
        let removed = {
            let mut collections = self.collections();
            match collections.get_mut(collection) {
                Some(state) => {
                    let before = state.documents.len();
                    state.documents.retain(|d| d.id != id);
                    state.documents.len() != before
                }
                None => false,
            }
        };
        if removed {
            self.notify(collection);
        }
        removed
    }

    /// Replaces the entire contents of a collection.
    pub fn set_collection(&self, collection: &str, documents: Vec<RawDocument>) {
        self.collections()
            .entry(collection.to_string())
            .or_default()
            .documents = documents;
        self.notify(collection);
    }

    /// Makes every subsequent read of `collection` fail, as a revoked rule would.
    pub fn fail(&self, collection: &str, message: impl Into<String>) {
        self.collections()
            .entry(collection.to_string())
            .or_default()
            .failure = Some(message.into());
        self.notify(collection);
    }

    /// Delays every read by `latency`, standing in for a network round-trip.
    pub fn set_latency(&self, latency: Duration) {
        *lock(&self.inner.latency) = latency;
    }

    fn collections(&self) -> MutexGuard<'_, HashMap<String, Collection>> {
        lock(&self.inner.collections)
    }

    fn notifier(&self, collection: &str) -> watch::Sender<u64> {
        lock(&self.inner.notifiers)
            .entry(collection.to_string())
            .or_insert_with(|| watch::channel(0).0)
            .clone()
    }

    fn notify(&self, collection: &str) {
        self.notifier(collection).send_modify(|version| *version += 1);
    }

    async fn simulate_latency(&self) {
        let latency = *lock(&self.inner.latency);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }
}

/// Poisoning only means a writer panicked mid-update; the data is still usable.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl DocumentSource for MemoryStore {
    type Watcher = MemoryWatcher;

    async fn fetch(&self, query: &CollectionQuery) -> Result<Vec<RawDocument>, StoreError> {
        self.simulate_latency().await;

        let mut documents = {
            let collections = self.collections();
            match collections.get(&query.collection) {
                Some(Collection {
                    failure: Some(message),
                    ..
                }) => return Err(StoreError::Unavailable(message.clone())),
                Some(state) => state.documents.clone(),
                None => Vec::new(),
            }
        };

        if let Some(order) = &query.order_by {
            // Ordered queries only return documents that carry the order field
            documents.retain(|d| d.get(&order.field).is_some());
            documents.sort_by(|a, b| {
                let (Some(x), Some(y)) = (a.get(&order.field), b.get(&order.field)) else {
                    return std::cmp::Ordering::Equal;
                };
                match order.direction {
                    Direction::Ascending => x.store_cmp(y),
                    Direction::Descending => y.store_cmp(x),
                }
            });
        }

        Ok(documents)
    }

    async fn fetch_one(&self, collection: &str, id: &str) -> Result<Option<RawDocument>, StoreError> {
        self.simulate_latency().await;

        let collections = self.collections();
        match collections.get(collection) {
            Some(Collection {
                failure: Some(message),
                ..
            }) => Err(StoreError::Unavailable(message.clone())),
            Some(state) => Ok(state.documents.iter().find(|d| d.id == id).cloned()),
            None => Ok(None),
        }
    }

    fn watch(&self, collection: &str) -> MemoryWatcher {
        MemoryWatcher {
            rx: self.notifier(collection).subscribe(),
        }
    }
}

/// Wakes when a [`MemoryStore`] collection is written.
pub struct MemoryWatcher {
    rx: watch::Receiver<u64>,
}

impl ChangeWatcher for MemoryWatcher {
    async fn changed(&mut self) {
        if self.rx.changed().await.is_err() {
            // Store dropped: nothing will ever change again
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FieldValue;
    use chrono::{TimeZone, Utc};

    fn post(id: &str, day: u32) -> RawDocument {
        RawDocument::new(id)
            .with("title", format!("Post {id}"))
            .with("createdAt", Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap())
    }

    #[tokio::test]
    async fn test_fetch_unknown_collection_is_empty() {
        let store = MemoryStore::new();
        let docs = store.fetch(&CollectionQuery::new("tips")).await.unwrap();
        assert!(docs.is_empty());
    }

    #[tokio::test]
    async fn test_put_replaces_in_place() {
        let store = MemoryStore::new();
        store.put("tips", RawDocument::new("a").with("title", "uno"));
        store.put("tips", RawDocument::new("b").with("title", "dos"));
        store.put("tips", RawDocument::new("a").with("title", "uno bis"));

        let docs = store.fetch(&CollectionQuery::new("tips")).await.unwrap();
        let ids: Vec<_> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
        assert_eq!(docs[0].get("title"), Some(&FieldValue::from("uno bis")));
    }

    #[tokio::test]
    async fn test_ordered_fetch_sorts_descending_and_drops_unordered() {
        let store = MemoryStore::new();
        store.put("posts", post("old", 1));
        store.put("posts", RawDocument::new("undated").with("title", "x"));
        store.put("posts", post("new", 20));

        let query = CollectionQuery::new("posts").ordered_by("createdAt", Direction::Descending);
        let docs = store.fetch(&query).await.unwrap();
        let ids: Vec<_> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, ["new", "old"]);
    }

    #[tokio::test]
    async fn test_remove_reports_existence() {
        let store = MemoryStore::new();
        store.put("tips", RawDocument::new("a"));
        assert!(store.remove("tips", "a"));
        assert!(!store.remove("tips", "a"));
        assert!(!store.remove("missing", "a"));
    }

    #[tokio::test]
    async fn test_failure_surfaces_on_reads() {
        let store = MemoryStore::new();
        store.put("projects", RawDocument::new("p1"));
        store.fail("projects", "permission denied");

        let err = store.fetch(&CollectionQuery::new("projects")).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(ref m) if m == "permission denied"));
        assert!(store.fetch_one("projects", "p1").await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_one() {
        let store = MemoryStore::new();
        store.put("posts", post("a", 2));
        assert_eq!(store.fetch_one("posts", "a").await.unwrap().unwrap().id, "a");
        assert!(store.fetch_one("posts", "zzz").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_watcher_wakes_on_write() {
        let store = MemoryStore::new();
        let mut watcher = store.watch("tips");
        store.put("tips", RawDocument::new("a"));
        tokio::time::timeout(Duration::from_secs(1), watcher.changed())
            .await
            .expect("watcher should wake after a write");
    }

    #[tokio::test]
    async fn test_watcher_ignores_other_collections() {
        let store = MemoryStore::new();
        let mut watcher = store.watch("tips");
        store.put("posts", RawDocument::new("a"));
        let woke = tokio::time::timeout(Duration::from_millis(50), watcher.changed()).await;
        assert!(woke.is_err());
    }

    #[tokio::test]
    async fn test_fixture_json() {
        let store = MemoryStore::from_fixture_json(
            r#"{
                "projects": [
                    {"id": "p1", "title": "Tracker", "tags": ["Go", "CLI"]},
                    {"title": "no id"}
                ],
                "tips": []
            }"#,
        )
        .unwrap();

        let docs = store.fetch(&CollectionQuery::new("projects")).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "p1");
    }

    #[test]
    fn test_fixture_rejects_bad_shapes() {
        assert!(MemoryStore::from_fixture_json("[]").is_err());
        assert!(MemoryStore::from_fixture_json(r#"{"posts": {}}"#).is_err());
        assert!(MemoryStore::from_fixture_json("{not json").is_err());
    }

    #[test]
    fn test_debug_lists_collections() {
        let store = MemoryStore::from_fixture_json(r#"{"tips": [], "posts": [{"id": "a"}]}"#).unwrap();
        let debug = format!("{store:?}");
        assert!(debug.starts_with("MemoryStore"));
        assert!(debug.contains(r#"["posts", "tips"]"#));
    }

    #[test]
    fn test_load_fixture_missing_file() {
        let err = MemoryStore::load_fixture(Path::new("/tmp/folio_missing_fixture.json")).unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }
}

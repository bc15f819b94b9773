//! Live collection subscriptions.
//!
//! A [`Subscription`] owns one background task that reads a collection,
//! forwards the full snapshot, then waits for the source's change watcher and
//! reads again. Snapshots whose digest matches the previous one are dropped,
//! so a quiet poll emits nothing.
//!
//! The first error ends the subscription: it is delivered once and the
//! stream closes. There is no retry.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use folio::live::Subscription;
//! use folio::store::{CollectionQuery, MemoryStore};
//!
//! # async fn demo() {
//! let store = Arc::new(MemoryStore::new());
//! let mut sub = Subscription::open(store, CollectionQuery::new("tips"));
//! while let Some(Ok(snapshot)) = sub.next().await {
//!     println!("{} tips", snapshot.documents.len());
//! }
//! # }
//! ```

use futures::Stream;
use sha2::{Digest, Sha256};
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::store::{ChangeWatcher, CollectionQuery, DocumentSource, RawDocument, StoreError};

/// Snapshots buffered between the task and a slow consumer. The task blocks
/// on a full channel, so the consumer always sees every distinct snapshot.
const CHANNEL_CAPACITY: usize = 4;

/// The complete, store-ordered contents of a collection at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub collection: String,
    pub documents: Vec<RawDocument>,
}

pub type SnapshotResult = Result<Snapshot, StoreError>;

/// A standing read of one collection.
///
/// Dropping the subscription aborts its task. No snapshot can be observed
/// after [`Subscription::unsubscribe`] returns or the value is dropped.
pub struct Subscription {
    collection: String,
    rx: mpsc::Receiver<SnapshotResult>,
    task: JoinHandle<()>,
}

impl Subscription {
    /// Starts reading `query` from `source`. Must be called inside a Tokio
    /// runtime.
    pub fn open<S: DocumentSource>(source: Arc<S>, query: CollectionQuery) -> Self {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let collection = query.collection.clone();
        tracing::debug!(collection = %collection, "Opening subscription");
        let task = tokio::spawn(run(source, query, tx));
        Self {
            collection,
            rx,
            task,
        }
    }

    /// Callback-style variant of [`Subscription::open`].
    ///
    /// `callback` runs on a background task for every snapshot, then once
    /// more with the terminal error if one occurs.
    pub fn listen<S, F>(source: Arc<S>, query: CollectionQuery, callback: F) -> ListenerHandle
    where
        S: DocumentSource,
        F: FnMut(SnapshotResult) + Send + 'static,
    {
        let boxed: Callback = Box::new(callback);
        let callback = Arc::new(Mutex::new(Some(boxed)));
        let mut subscription = Self::open(source, query);
        let slot = Arc::clone(&callback);

        let task = tokio::spawn(async move {
            while let Some(result) = subscription.next().await {
                let mut guard = lock(&slot);
                match guard.as_mut() {
                    Some(callback) => callback(result),
                    None => break,
                }
            }
        });

        ListenerHandle { callback, task }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Waits for the next snapshot. `None` once the subscription has ended.
    pub async fn next(&mut self) -> Option<SnapshotResult> {
        self.rx.recv().await
    }

    /// Releases the subscription. Equivalent to dropping it.
    pub fn unsubscribe(self) {
        tracing::debug!(collection = %self.collection, "Unsubscribing");
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
        self.rx.close();
    }
}

impl Stream for Subscription {
    type Item = SnapshotResult;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("collection", &self.collection)
            .field("finished", &self.task.is_finished())
            .finish()
    }
}

type Callback = Box<dyn FnMut(SnapshotResult) + Send>;

/// Returned by [`Subscription::listen`].
///
/// [`ListenerHandle::unsubscribe`] is synchronous: if the callback is running
/// it waits for that call to return, and once it returns the callback is
/// never invoked again. Do not call it from inside the callback.
pub struct ListenerHandle {
    callback: Arc<Mutex<Option<Callback>>>,
    task: JoinHandle<()>,
}

impl ListenerHandle {
    pub fn unsubscribe(self) {}

    /// Whether snapshots can still arrive.
    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.task.abort();
        lock(&self.callback).take();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Content digest of a snapshot, `None` if the documents cannot be encoded.
fn digest(documents: &[RawDocument]) -> Option<[u8; 32]> {
    let bytes = serde_json::to_vec(documents).ok()?;
    Some(Sha256::digest(&bytes).into())
}

async fn run<S: DocumentSource>(
    source: Arc<S>,
    query: CollectionQuery,
    tx: mpsc::Sender<SnapshotResult>,
) {
    // Watch before the first read so a write racing it still wakes us
    let mut watcher = source.watch(&query.collection);
    let mut last_digest: Option<[u8; 32]> = None;

    loop {
        match source.fetch(&query).await {
            Ok(documents) => {
                let current = digest(&documents);
                if current.is_some() && current == last_digest {
                    tracing::debug!(collection = %query.collection, "Snapshot unchanged");
                } else {
                    last_digest = current;
                    tracing::debug!(
                        collection = %query.collection,
                        count = documents.len(),
                        "Delivering snapshot"
                    );
                    let snapshot = Snapshot {
                        collection: query.collection.clone(),
                        documents,
                    };
                    if tx.send(Ok(snapshot)).await.is_err() {
                        return;
                    }
                }
            }
            Err(e) => {
                tracing::warn!(collection = %query.collection, error = %e, "Subscription failed");
                let _ = tx.send(Err(e)).await;
                return;
            }
        }

        tokio::select! {
            _ = watcher.changed() => {}
            _ = tx.closed() => {
                tracing::debug!(collection = %query.collection, "Subscriber gone, stopping");
                return;
            }
        }
    }
}

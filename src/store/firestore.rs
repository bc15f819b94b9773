use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::header::DATE;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use tokio::time::{Interval, MissedTickBehavior};
use url::Url;

use super::document::RawDocument;
use super::types::{CollectionQuery, StoreError};
use super::{ChangeWatcher, DocumentSource};
use crate::util::{read_limited_text, validate_base_url};

const MAX_RESPONSE_SIZE: usize = 10 * 1024 * 1024; // 10MB per page
const PAGE_SIZE: &str = "300";
/// Upper bound on requests per snapshot. Reaching it fails the read.
const MAX_PAGES: usize = 50;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// One page of a `documents.list` call. Empty collections come back as `{}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDocumentsResponse {
    #[serde(default)]
    documents: Vec<serde_json::Value>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// Reads collections through the Firestore REST API.
///
/// Firestore's streaming listen channel is not available over plain REST, so
/// live updates are approximated by re-reading the collection every
/// `poll_interval`; the subscriber only forwards snapshots whose digest
/// changed.
#[derive(Clone)]
pub struct FirestoreStore {
    client: reqwest::Client,
    documents_url: Url,
    api_key: Option<SecretString>,
    poll_interval: Duration,
    timeout: Duration,
}

impl std::fmt::Debug for FirestoreStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirestoreStore")
            .field("documents_url", &self.documents_url.as_str())
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("poll_interval", &self.poll_interval)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl FirestoreStore {
    /// Creates a store rooted at
    /// `{base_url}/v1/projects/{project_id}/databases/{database}/documents`.
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        project_id: &str,
        database: &str,
    ) -> Result<Self, StoreError> {
        let mut documents_url = validate_base_url(base_url)?;
        documents_url
            .path_segments_mut()
            .map_err(|_| StoreError::Decode(format!("base URL cannot hold a path: {base_url}")))?
            .pop_if_empty()
            .extend(["v1", "projects", project_id, "databases", database, "documents"]);

        Ok(Self {
            client,
            documents_url,
            api_key: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn with_api_key(mut self, api_key: Option<SecretString>) -> Self {
        self.api_key = api_key;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        // A zero period would make tokio's interval panic
        self.poll_interval = interval.max(Duration::from_millis(100));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn collection_url(&self, segments: &[&str]) -> Url {
        let mut url = self.documents_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.extend(segments);
        }
        if let Some(key) = &self.api_key {
            url.query_pairs_mut().append_pair("key", key.expose_secret());
        }
        url
    }

    /// GET with one timeout budget covering both headers and body.
    async fn get(&self, url: Url) -> Result<Fetched, StoreError> {
        tokio::time::timeout(self.timeout, self.get_untimed(url))
            .await
            .map_err(|_| StoreError::Timeout)?
    }

    async fn get_untimed(&self, url: Url) -> Result<Fetched, StoreError> {
        let response = self.client.get(url).send().await?;

        let status = response.status().as_u16();
        let date = response
            .headers()
            .get(DATE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| DateTime::parse_from_rfc2822(v).ok())
            .map(|d| d.with_timezone(&Utc));
        if !response.status().is_success() {
            return Ok(Fetched {
                status,
                date,
                body: String::new(),
            });
        }
        let body = read_limited_text(response, MAX_RESPONSE_SIZE).await?;
        Ok(Fetched { status, date, body })
    }
}

struct Fetched {
    status: u16,
    date: Option<DateTime<Utc>>,
    body: String,
}

impl DocumentSource for FirestoreStore {
    type Watcher = PollWatcher;

    /// Reads every page of the collection.
    ///
    /// A collection that fits in one page is read as is. When a second page
    /// exists, the read restarts pinned to the server time of the first
    /// response so that all pages describe the same instant.
    async fn fetch(&self, query: &CollectionQuery) -> Result<Vec<RawDocument>, StoreError> {
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;
        let mut read_time: Option<String> = None;

        for request in 0..MAX_PAGES {
            let mut url = self.collection_url(&[&query.collection]);
            {
                let mut pairs = url.query_pairs_mut();
                pairs.append_pair("pageSize", PAGE_SIZE);
                if let Some(order) = &query.order_by {
                    pairs.append_pair("orderBy", &order.to_string());
                }
                if let Some(token) = &page_token {
                    pairs.append_pair("pageToken", token);
                }
                if let Some(time) = &read_time {
                    pairs.append_pair("readTime", time);
                }
            }

            let fetched = self.get(url).await?;
            if !(200..300).contains(&fetched.status) {
                tracing::debug!(
                    collection = %query.collection,
                    status = fetched.status,
                    "Collection read rejected"
                );
                return Err(StoreError::HttpStatus(fetched.status));
            }

            let parsed: ListDocumentsResponse = serde_json::from_str(&fetched.body)?;
            let next_token = parsed.next_page_token.filter(|t| !t.is_empty());

            if read_time.is_none() && next_token.is_some() {
                let pinned = fetched.date.unwrap_or_else(Utc::now);
                tracing::debug!(
                    collection = %query.collection,
                    read_time = %pinned,
                    "Collection spans several pages, pinning read time"
                );
                read_time = Some(pinned.to_rfc3339_opts(SecondsFormat::Secs, true));
                continue;
            }

            let before = documents.len();
            documents.extend(parsed.documents.iter().filter_map(|resource| {
                let doc = RawDocument::from_firestore(resource);
                if doc.is_none() {
                    tracing::warn!(collection = %query.collection, "Skipping document without a name");
                }
                doc
            }));
            tracing::trace!(
                collection = %query.collection,
                request = request,
                count = documents.len() - before,
                "Fetched document page"
            );

            match next_token {
                None => return Ok(documents),
                Some(token) if page_token.as_deref() == Some(token.as_str()) => {
                    return Err(StoreError::Decode(format!("page token repeated: {token}")));
                }
                Some(token) => page_token = Some(token),
            }
        }

        tracing::warn!(
            collection = %query.collection,
            pages = MAX_PAGES,
            "Page limit reached"
        );
        Err(StoreError::TooManyPages(MAX_PAGES))
    }

    async fn fetch_one(&self, collection: &str, id: &str) -> Result<Option<RawDocument>, StoreError> {
        let url = self.collection_url(&[collection, id]);
        let fetched = self.get(url).await?;
        match fetched.status {
            404 => Ok(None),
            200..=299 => {
                let resource: serde_json::Value = serde_json::from_str(&fetched.body)?;
                RawDocument::from_firestore(&resource)
                    .map(Some)
                    .ok_or_else(|| StoreError::Decode("document has no name".into()))
            }
            other => Err(StoreError::HttpStatus(other)),
        }
    }

    fn watch(&self, _collection: &str) -> PollWatcher {
        let mut interval = tokio::time::interval_at(
            tokio::time::Instant::now() + self.poll_interval,
            self.poll_interval,
        );
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        PollWatcher { interval }
    }
}

/// Wakes every poll interval.
pub struct PollWatcher {
    interval: Interval,
}

impl ChangeWatcher for PollWatcher {
    async fn changed(&mut self) {
        self.interval.tick().await;
    }
}

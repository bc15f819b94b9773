use std::fmt;
use thiserror::Error;

use crate::util::{BodyError, UrlValidationError};

// ============================================================================
// Error Types
// ============================================================================

/// Errors raised while reading from a document source.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code (403 for rules denials)
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// The request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,
    /// Response body exceeded the size limit
    #[error("Response too large (exceeds {0} bytes)")]
    ResponseTooLarge(usize),
    /// The body was not the JSON shape the store promises
    #[error("Malformed store response: {0}")]
    Decode(String),
    /// The configured base URL was rejected
    #[error("Invalid store base URL: {0}")]
    BaseUrl(#[from] UrlValidationError),
    /// The collection spans more pages than one snapshot may read
    #[error("Collection exceeds {0} pages")]
    TooManyPages(usize),
    /// The source refused to serve the collection (in-memory failures, fixtures)
    #[error("Collection unavailable: {0}")]
    Unavailable(String),
}

impl From<BodyError> for StoreError {
    fn from(err: BodyError) -> Self {
        match err {
            BodyError::Network(e) => StoreError::Network(e),
            BodyError::TooLarge(limit) => StoreError::ResponseTooLarge(limit),
            BodyError::InvalidUtf8 => StoreError::Decode("invalid UTF-8 in response".into()),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Decode(err.to_string())
    }
}

// ============================================================================
// Queries
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Server-side ordering for a collection query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

impl fmt::Display for OrderBy {
    /// Formats as the REST `orderBy` parameter (`createdAt desc`).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            Direction::Ascending => write!(f, "{}", self.field),
            Direction::Descending => write!(f, "{} desc", self.field),
        }
    }
}

/// Which collection to read and, optionally, how the server should order it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionQuery {
    pub collection: String,
    pub order_by: Option<OrderBy>,
}

impl CollectionQuery {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            order_by: None,
        }
    }

    pub fn ordered_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }
}

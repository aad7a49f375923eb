//! Store interfaces and backend implementations.
//!
//! The store layer is the only part of the pipeline that performs I/O. The
//! executor talks to it through [`DocumentStore`] so the MongoDB driver can be
//! swapped for the in-memory collection in development mode and tests.

use std::{error::Error, fmt, future::Future};

use bson::Document;

mod matcher;
pub mod memory;
pub mod mongo;

pub use memory::MemoryCollection;
pub use mongo::MongoCollection;

#[derive(Debug)]
pub enum StoreError {
    Mongo(Box<mongodb::error::Error>),
    InvalidFilter(String),
    InvalidInput(String),
    Unavailable(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mongo(err) => write!(f, "MongoDB error: {err}"),
            Self::InvalidFilter(message) => write!(f, "Invalid filter: {message}"),
            Self::InvalidInput(message) => write!(f, "Invalid input: {message}"),
            Self::Unavailable(message) => write!(f, "Store unavailable: {message}"),
        }
    }
}

impl Error for StoreError {}

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::Mongo(Box::new(err))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Read options for a single `find`, already sanitized by the caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindSpec {
    pub projection: Option<Document>,
    pub sort: Option<Document>,
    pub skip: u64,
    pub limit: i64,
}

/// Read-only view of one backing collection.
///
/// Implementations must be safe to share across concurrent requests.
pub trait DocumentStore: Send + Sync + 'static {
    /// Human-readable backend name for logs.
    const BACKEND: &'static str;

    /// Round-trips to the server to confirm it is reachable.
    fn ping(&self) -> impl Future<Output = StoreResult<()>> + Send;

    /// Counts documents matching `filter`, ignoring pagination.
    fn count(&self, filter: Document) -> impl Future<Output = StoreResult<u64>> + Send;

    /// Materializes one bounded page of documents matching `filter`.
    fn find(
        &self,
        filter: Document,
        spec: FindSpec,
    ) -> impl Future<Output = StoreResult<Vec<Document>>> + Send;

    /// Releases any pooled connections.
    fn close(&self) -> impl Future<Output = ()> + Send;
}

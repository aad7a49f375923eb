//! Query pipeline: option sanitizing and bounded execution.

use std::{error::Error, fmt};

use bson::{Bson, Document};
use serde_json::{Map, Value};

use crate::store::StoreError;

pub mod executor;
pub mod options;

pub use executor::QueryExecutor;
pub use options::{MAX_LIMIT, MIN_LIMIT, QueryOptions};

#[derive(Debug)]
pub enum QueryError {
    NotConnected,
    InvalidQuery(String),
    Store(StoreError),
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected => write!(f, "MongoDB connection not initialized"),
            Self::InvalidQuery(message) => write!(f, "invalid query: {message}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for QueryError {}

impl From<StoreError> for QueryError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

/// One bounded page of query results.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPage {
    pub documents: Vec<Document>,
    /// Documents matching the filter, ignoring skip and limit.
    pub total_count: u64,
    pub skip: u64,
}

impl QueryPage {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Converts a caller filter into a BSON document.
///
/// `None` means match everything. Extended JSON (`$oid`, `$date`, ...) is
/// interpreted so callers can address identifiers and timestamps.
///
/// # Errors
/// Returns `QueryError::InvalidQuery` if the value is not an object or holds
/// malformed extended JSON.
pub fn parse_filter(value: Option<&Value>) -> Result<Document, QueryError> {
    match value {
        None | Some(Value::Null) => Ok(Document::new()),
        Some(Value::Object(map)) => json_object_to_document("query", map),
        Some(_) => Err(QueryError::InvalidQuery(
            "query must be an object".to_string(),
        )),
    }
}

pub(crate) fn json_object_to_document(
    field: &str,
    map: &Map<String, Value>,
) -> Result<Document, QueryError> {
    match Bson::try_from(Value::Object(map.clone())) {
        Ok(Bson::Document(document)) => Ok(document),
        Ok(_) => Err(QueryError::InvalidQuery(format!(
            "{field} must be an object"
        ))),
        Err(err) => Err(QueryError::InvalidQuery(format!("{field}: {err}"))),
    }
}

use bson::Document;
use tracing::debug;

use super::{QueryError, QueryOptions, QueryPage};
use crate::services::CollectionHandle;
use crate::store::{DocumentStore, FindSpec};

/// Runs sanitized queries against the handle's collection.
///
/// Each call performs a count and one bounded find. Nothing is retried and
/// nothing is written.
pub struct QueryExecutor<'a, S: DocumentStore> {
    handle: &'a CollectionHandle<S>,
}

impl<'a, S: DocumentStore> QueryExecutor<'a, S> {
    #[must_use]
    pub const fn new(handle: &'a CollectionHandle<S>) -> Self {
        Self { handle }
    }

    /// Counts all matches for `filter`, then fetches one page applying
    /// projection, sort, skip and limit in that order.
    ///
    /// # Errors
    /// Returns `QueryError::NotConnected` when the handle has no live store,
    /// `QueryError::InvalidQuery` when projection or sort cannot be encoded,
    /// and `QueryError::Store` when the store rejects the read.
    pub async fn execute(
        &self,
        filter: Document,
        options: &QueryOptions,
    ) -> Result<QueryPage, QueryError> {
        let store = self.handle.store().ok_or(QueryError::NotConnected)?;

        let spec = FindSpec {
            projection: options.projection_document()?,
            sort: options.sort_document()?,
            skip: options.effective_skip(),
            limit: options.effective_limit(),
        };

        let total_count = store.count(filter.clone()).await?;
        debug!(
            collection = %self.handle.target().collection,
            total_count,
            skip = spec.skip,
            limit = spec.limit,
            "executing query"
        );
        let skip = spec.skip;
        let documents = store.find(filter, spec).await?;

        Ok(QueryPage {
            documents,
            total_count,
            skip,
        })
    }

    /// Fetches the first `limit` documents of the collection with no filter.
    ///
    /// # Errors
    /// Same as [`QueryExecutor::execute`].
    pub async fn sample(&self, limit: i64) -> Result<QueryPage, QueryError> {
        let options = QueryOptions {
            limit: Some(limit),
            ..QueryOptions::default()
        };
        self.execute(Document::new(), &options).await
    }
}

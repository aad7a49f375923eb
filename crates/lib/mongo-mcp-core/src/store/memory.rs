use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use bson::{Bson, Document, oid::ObjectId};
use tokio::sync::RwLock;

use super::matcher;
use super::{DocumentStore, FindSpec, StoreError, StoreResult};

/// In-process collection used for development mode and tests.
///
/// Documents without an `_id` receive a fresh `ObjectId` on insert, mirroring
/// what the server does.
#[derive(Clone, Default)]
pub struct MemoryCollection {
    documents: Arc<RwLock<Vec<Document>>>,
    unreachable: Arc<AtomicBool>,
}

impl MemoryCollection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a collection pre-populated with `documents`.
    #[must_use]
    pub fn with_documents(documents: impl IntoIterator<Item = Document>) -> Self {
        let documents = documents.into_iter().map(with_object_id).collect();
        Self {
            documents: Arc::new(RwLock::new(documents)),
            unreachable: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Builds a collection from a JSON array of objects (extended JSON allowed).
    ///
    /// # Errors
    /// Returns `StoreError::InvalidInput` if the value is not an array of objects.
    pub fn from_json(value: serde_json::Value) -> StoreResult<Self> {
        let serde_json::Value::Array(items) = value else {
            return Err(StoreError::InvalidInput(
                "seed data must be a JSON array".to_string(),
            ));
        };
        let mut documents = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            match Bson::try_from(item) {
                Ok(Bson::Document(document)) => documents.push(document),
                Ok(_) => {
                    return Err(StoreError::InvalidInput(format!(
                        "seed entry {index} is not an object"
                    )));
                }
                Err(err) => {
                    return Err(StoreError::InvalidInput(format!(
                        "seed entry {index}: {err}"
                    )));
                }
            }
        }
        Ok(Self::with_documents(documents))
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    /// Makes every subsequent call fail as if the server went away.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    fn check_reachable(&self) -> StoreResult<()> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "in-memory collection marked unreachable".to_string(),
            ));
        }
        Ok(())
    }
}

fn with_object_id(document: Document) -> Document {
    if document.contains_key("_id") {
        return document;
    }
    let mut ordered = Document::new();
    ordered.insert("_id", ObjectId::new());
    for (key, value) in document {
        ordered.insert(key, value);
    }
    ordered
}

impl DocumentStore for MemoryCollection {
    const BACKEND: &'static str = "in-memory collection";

    async fn ping(&self) -> StoreResult<()> {
        self.check_reachable()
    }

    async fn count(&self, filter: Document) -> StoreResult<u64> {
        self.check_reachable()?;
        let documents = self.documents.read().await;
        let mut count = 0_u64;
        for document in documents.iter() {
            if matcher::matches(document, &filter)? {
                count += 1;
            }
        }
        Ok(count)
    }

    async fn find(&self, filter: Document, spec: FindSpec) -> StoreResult<Vec<Document>> {
        self.check_reachable()?;
        let mut matched = Vec::new();
        {
            let documents = self.documents.read().await;
            for document in documents.iter() {
                if matcher::matches(document, &filter)? {
                    matched.push(document.clone());
                }
            }
        }

        if let Some(sort) = &spec.sort {
            matcher::sort_documents(&mut matched, sort)?;
        }

        let skip = usize::try_from(spec.skip).unwrap_or(usize::MAX);
        let limit = match usize::try_from(spec.limit.unsigned_abs()) {
            Ok(0) | Err(_) => usize::MAX,
            Ok(limit) => limit,
        };

        matched
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|document| match &spec.projection {
                Some(projection) => matcher::project(document, projection),
                None => Ok(document),
            })
            .collect()
    }

    async fn close(&self) {}
}

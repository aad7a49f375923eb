use std::error::Error;
use std::fmt;

use bson::doc;
use tracing::{error, info};

use crate::store::{DocumentStore, StoreError};

/// Identifies the single database/collection pair this service exposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionTarget {
    pub database: String,
    pub collection: String,
}

impl CollectionTarget {
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collection: collection.into(),
        }
    }
}

#[derive(Debug)]
pub enum ConnectError {
    InvalidUri(StoreError),
    Unreachable(StoreError),
}

impl fmt::Display for ConnectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidUri(err) => write!(f, "invalid connection settings: {err}"),
            Self::Unreachable(err) => write!(f, "failed to connect to MongoDB: {err}"),
        }
    }
}

impl Error for ConnectError {}

enum ConnectionState<S> {
    Connected(S),
    Disconnected { reason: String },
}

/// Shared handle to the backing collection and its connection state.
///
/// The daemon establishes the handle once at startup and closes it at
/// shutdown; there is no reconnect. A disconnected handle keeps the reason so
/// health probes can report it.
pub struct CollectionHandle<S: DocumentStore> {
    target: CollectionTarget,
    state: ConnectionState<S>,
}

impl<S: DocumentStore> CollectionHandle<S> {
    pub fn connected(target: CollectionTarget, store: S) -> Self {
        Self {
            target,
            state: ConnectionState::Connected(store),
        }
    }

    pub fn disconnected(target: CollectionTarget, reason: impl Into<String>) -> Self {
        Self {
            target,
            state: ConnectionState::Disconnected {
                reason: reason.into(),
            },
        }
    }

    /// Pings the store and reports the collection size, falling back to a
    /// disconnected handle when the store cannot be reached.
    pub async fn establish(target: CollectionTarget, store: S) -> Self {
        if let Err(err) = store.ping().await {
            let err = ConnectError::Unreachable(err);
            error!("{err}");
            return Self::disconnected(target, err.to_string());
        }

        match store.count(doc! {}).await {
            Ok(count) => {
                info!("{}", connection_summary::<S>(&target, count));
                Self::connected(target, store)
            }
            Err(err) => {
                let err = ConnectError::Unreachable(err);
                error!("{err}");
                Self::disconnected(target, err.to_string())
            }
        }
    }

    #[must_use]
    pub const fn target(&self) -> &CollectionTarget {
        &self.target
    }

    #[must_use]
    pub fn store(&self) -> Option<&S> {
        match &self.state {
            ConnectionState::Connected(store) => Some(store),
            ConnectionState::Disconnected { .. } => None,
        }
    }

    #[must_use]
    pub const fn is_connected(&self) -> bool {
        matches!(self.state, ConnectionState::Connected(_))
    }

    /// Why the handle is disconnected, if it is.
    #[must_use]
    pub fn disconnect_reason(&self) -> Option<&str> {
        match &self.state {
            ConnectionState::Connected(_) => None,
            ConnectionState::Disconnected { reason } => Some(reason),
        }
    }

    pub async fn close(&self) {
        if let ConnectionState::Connected(store) = &self.state {
            info!("closing MongoDB connection");
            store.close().await;
        }
    }
}

fn connection_summary<S: DocumentStore>(target: &CollectionTarget, count: u64) -> String {
    format!(
        "connected to {}; collection '{}.{}' has {count} documents",
        S::BACKEND,
        target.database,
        target.collection
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryCollection;

    fn target() -> CollectionTarget {
        CollectionTarget::new("stock_data", "detailed_financials")
    }

    #[tokio::test]
    async fn establish_connects_reachable_store() {
        let handle = CollectionHandle::establish(target(), MemoryCollection::new()).await;
        assert!(handle.is_connected());
        assert!(handle.disconnect_reason().is_none());
    }

    #[tokio::test]
    async fn establish_degrades_when_store_unreachable() {
        let store = MemoryCollection::new();
        store.set_unreachable(true);
        let handle = CollectionHandle::establish(target(), store).await;
        assert!(!handle.is_connected());
        assert!(handle.store().is_none());
        let reason = handle.disconnect_reason().unwrap();
        assert!(reason.contains("failed to connect"), "{reason}");
    }

    #[test]
    fn connection_summary_names_the_backend() {
        let summary = connection_summary::<MemoryCollection>(&target(), 3);
        assert_eq!(
            summary,
            "connected to in-memory collection; collection 'stock_data.detailed_financials' has 3 documents"
        );
        assert!(!summary.contains("MongoDB"));
    }
}

//! HTTP health surface for mongo-mcp.
//!
//! `GET /` and `GET /health` ping the backing store and count the collection;
//! a store that is disconnected or unreachable is reported as `503`.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use bson::doc;
use mongo_mcp_core::query::QueryError;
use mongo_mcp_core::services::CollectionHandle;
use mongo_mcp_core::store::{DocumentStore, StoreError};
use serde::Serialize;
use tracing::{error, info};

pub const DEFAULT_HEALTH_ADDR: &str = "0.0.0.0:8000";

/// Configuration for the health HTTP server.
#[derive(Debug, Clone)]
pub struct HealthServerConfig {
    pub addr: SocketAddr,
    pub probe_timeout: Duration,
}

impl HealthServerConfig {
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            probe_timeout: Duration::from_secs(5),
        }
    }

    #[must_use]
    pub const fn with_probe_timeout(mut self, probe_timeout: Duration) -> Self {
        self.probe_timeout = probe_timeout;
        self
    }
}

impl Default for HealthServerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_HEALTH_ADDR.parse().expect("valid default address"))
    }
}

/// HTTP health server wrapper.
pub struct HealthServer<S: DocumentStore> {
    config: HealthServerConfig,
    state: AppState<S>,
}

impl<S: DocumentStore> HealthServer<S> {
    #[must_use]
    pub const fn new(handle: Arc<CollectionHandle<S>>, config: HealthServerConfig) -> Self {
        let state = AppState {
            handle,
            probe_timeout: config.probe_timeout,
        };
        Self { config, state }
    }

    /// Runs the HTTP server until shutdown.
    ///
    /// # Errors
    /// Returns any listener or server error.
    pub async fn serve(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr = self.config.addr;
        let listener = tokio::net::TcpListener::bind(addr).await?;
        let app = build_router(self.state);

        info!("mongo-mcp-health listening on {addr}");
        axum::serve(listener, app).await?;
        Ok(())
    }
}

struct AppState<S: DocumentStore> {
    handle: Arc<CollectionHandle<S>>,
    probe_timeout: Duration,
}

impl<S: DocumentStore> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            handle: self.handle.clone(),
            probe_timeout: self.probe_timeout,
        }
    }
}

#[derive(Debug, Serialize)]
struct HealthReport {
    status: &'static str,
    db_connected: bool,
    db_name: String,
    collection: String,
    document_count: u64,
    server_version: &'static str,
    pid: u32,
}

#[derive(Debug, Serialize)]
struct RootReport {
    message: &'static str,
    status: &'static str,
    db_connected: bool,
    database: String,
    collection: String,
    pid: u32,
}

#[derive(Debug, Serialize)]
struct UnhealthyResponse {
    status: &'static str,
    db_connected: bool,
    error: String,
}

#[derive(Debug)]
struct ApiError {
    message: String,
}

impl ApiError {
    fn unavailable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::unavailable(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!("health check failed: {}", self.message);
        let payload = Json(UnhealthyResponse {
            status: "unhealthy",
            db_connected: false,
            error: self.message,
        });
        (StatusCode::SERVICE_UNAVAILABLE, payload).into_response()
    }
}

fn build_router<S: DocumentStore>(state: AppState<S>) -> Router {
    Router::new()
        .route("/", get(root::<S>))
        .route("/health", get(health::<S>))
        .with_state(state)
}

async fn root<S: DocumentStore>(
    State(state): State<AppState<S>>,
) -> Result<Json<RootReport>, ApiError> {
    probe(&state).await?;
    let target = state.handle.target();
    Ok(Json(RootReport {
        message: "Stock Data MCP Server is running",
        status: "healthy",
        db_connected: true,
        database: target.database.clone(),
        collection: target.collection.clone(),
        pid: std::process::id(),
    }))
}

async fn health<S: DocumentStore>(
    State(state): State<AppState<S>>,
) -> Result<Json<HealthReport>, ApiError> {
    let document_count = probe(&state).await?;
    let target = state.handle.target();
    Ok(Json(HealthReport {
        status: "healthy",
        db_connected: true,
        db_name: target.database.clone(),
        collection: target.collection.clone(),
        document_count,
        server_version: env!("CARGO_PKG_VERSION"),
        pid: std::process::id(),
    }))
}

/// Pings the store and counts the collection within the probe timeout.
async fn probe<S: DocumentStore>(state: &AppState<S>) -> Result<u64, ApiError> {
    let Some(store) = state.handle.store() else {
        let message = match state.handle.disconnect_reason() {
            Some(reason) => format!("{}: {reason}", QueryError::NotConnected),
            None => QueryError::NotConnected.to_string(),
        };
        return Err(ApiError::unavailable(message));
    };

    let check = async {
        store.ping().await?;
        store.count(doc! {}).await
    };
    let count = tokio::time::timeout(state.probe_timeout, check)
        .await
        .map_err(|_| ApiError::unavailable("health check timed out"))??;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use mongo_mcp_core::services::CollectionTarget;
    use mongo_mcp_core::store::MemoryCollection;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;

    fn target() -> CollectionTarget {
        CollectionTarget::new("stock_data", "detailed_financials")
    }

    fn router(handle: CollectionHandle<MemoryCollection>) -> Router {
        build_router(AppState {
            handle: Arc::new(handle),
            probe_timeout: Duration::from_secs(5),
        })
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn health_reports_document_count() {
        let store = MemoryCollection::with_documents(vec![
            doc! { "ticker": "ABC" },
            doc! { "ticker": "XYZ" },
        ]);
        let app = router(CollectionHandle::connected(target(), store));

        let (status, body) = get_json(app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["db_connected"], true);
        assert_eq!(body["db_name"], "stock_data");
        assert_eq!(body["collection"], "detailed_financials");
        assert_eq!(body["document_count"], 2);
        assert_eq!(body["server_version"], env!("CARGO_PKG_VERSION"));
        assert_eq!(body["pid"], std::process::id());
    }

    #[tokio::test]
    async fn root_reports_running_message() {
        let app = router(CollectionHandle::connected(target(), MemoryCollection::new()));

        let (status, body) = get_json(app, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Stock Data MCP Server is running");
        assert_eq!(body["database"], "stock_data");
        assert_eq!(body["collection"], "detailed_financials");
    }

    #[tokio::test]
    async fn disconnected_handle_is_unavailable() {
        for uri in ["/", "/health"] {
            let reason = "failed to connect to MongoDB: Server selection timeout: Connection refused";
            let app = router(CollectionHandle::disconnected(target(), reason));
            let (status, body) = get_json(app, uri).await;
            assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
            assert_eq!(body["status"], "unhealthy");
            assert_eq!(body["db_connected"], false);
            assert_eq!(
                body["error"],
                format!("MongoDB connection not initialized: {reason}")
            );
        }
    }

    #[tokio::test]
    async fn unreachable_store_is_unavailable() {
        let store = MemoryCollection::new();
        store.set_unreachable(true);
        let app = router(CollectionHandle::connected(target(), store));

        let (status, body) = get_json(app, "/health").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["db_connected"], false);
        assert!(body.get("document_count").is_none());
    }
}

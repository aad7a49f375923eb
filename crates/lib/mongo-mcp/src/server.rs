//! Transport runners for the MCP server.
//!
//! Health reporting lives in `mongo-mcp-health`; the MCP HTTP listener only
//! carries the protocol endpoint.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use mongo_mcp_core::services::CollectionHandle;
use mongo_mcp_core::store::DocumentStore;
use rmcp::serve_server;
use rmcp::transport::io::stdio;
use rmcp::transport::streamable_http_server::{
    StreamableHttpServerConfig,
    StreamableHttpService,
    session::local::LocalSessionManager,
};
use tracing::info;

use crate::MongoMcp;

pub const DEFAULT_MCP_HTTP_ADDR: &str = "127.0.0.1:4020";

/// Mount point of the streamable HTTP endpoint.
pub const MCP_HTTP_PATH: &str = "/mcp";

type ServeResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Listener settings for MCP over streamable HTTP.
#[derive(Debug, Clone)]
pub struct McpHttpServerConfig {
    pub addr: SocketAddr,
    pub sse_keep_alive: Option<Duration>,
    pub sse_retry: Option<Duration>,
}

impl McpHttpServerConfig {
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            sse_keep_alive: Some(Duration::from_secs(15)),
            sse_retry: Some(Duration::from_secs(3)),
        }
    }
}

/// Runs one MCP session on stdin/stdout and returns when the peer hangs up.
///
/// # Errors
/// Returns the transport error that ended the session.
pub async fn serve_stdio<S: DocumentStore>(handle: Arc<CollectionHandle<S>>) -> ServeResult {
    let running = serve_server(MongoMcp::with_handle(handle), stdio()).await?;
    running.waiting().await?;
    Ok(())
}

/// Router exposing the protocol endpoint at [`MCP_HTTP_PATH`] and nothing else.
///
/// Each session gets its own `MongoMcp` over the shared handle.
pub fn mcp_router<S: DocumentStore>(
    handle: Arc<CollectionHandle<S>>,
    config: &McpHttpServerConfig,
) -> Router {
    let sessions = Arc::new(LocalSessionManager::default());
    let service: StreamableHttpService<MongoMcp<S>, LocalSessionManager> =
        StreamableHttpService::new(
            move || Ok(MongoMcp::with_handle(handle.clone())),
            sessions,
            StreamableHttpServerConfig {
                sse_keep_alive: config.sse_keep_alive,
                sse_retry: config.sse_retry,
                stateful_mode: true,
                ..Default::default()
            },
        );
    Router::new().nest_service(MCP_HTTP_PATH, service)
}

/// Binds `config.addr` and serves [`mcp_router`] until the listener fails.
///
/// # Errors
/// Returns any bind or server error.
pub async fn serve_streamable_http<S: DocumentStore>(
    handle: Arc<CollectionHandle<S>>,
    config: McpHttpServerConfig,
) -> ServeResult {
    let app = mcp_router(handle, &config);
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    info!(addr = %config.addr, path = MCP_HTTP_PATH, "MCP streamable HTTP listening");
    axum::serve(listener, app).await?;
    Ok(())
}

//! Daemon entry point for the MongoDB MCP server.
//!
//! Loads configuration from the environment, connects to the collection once,
//! and serves MCP over stdio and/or streamable HTTP alongside the health server.

mod config;
mod connect;

use std::sync::Arc;

use mongo_mcp::server::{McpHttpServerConfig, serve_stdio, serve_streamable_http};
use mongo_mcp_core::services::CollectionHandle;
use mongo_mcp_core::store::DocumentStore;
use mongo_mcp_health::{HealthServer, HealthServerConfig};
use tokio::task::JoinSet;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::DaemonConfig;
use crate::connect::{connect_memory, connect_mongo};

type ServeResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = DaemonConfig::from_args()?;
    init_tracing(&config);

    if config.db_in_memory {
        let handle = connect_memory(&config).await?;
        run(&config, Arc::new(handle)).await;
    } else {
        let handle = connect_mongo(&config).await;
        run(&config, Arc::new(handle)).await;
    }
    Ok(())
}

// stdout belongs to the stdio transport.
fn init_tracing(config: &DaemonConfig) {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.log_level))
        .with_writer(std::io::stderr)
        .init();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transport {
    Health,
    McpHttp,
    Stdio,
}

impl Transport {
    const fn name(self) -> &'static str {
        match self {
            Self::Health => "health",
            Self::McpHttp => "mcp-http",
            Self::Stdio => "mcp-stdio",
        }
    }
}

/// Whether the daemon stops once `finished` has ended.
///
/// A stdio session ends whenever its peer closes stdin, so it only takes the
/// daemon down when no listener is left to serve.
const fn ends_daemon(finished: Transport, config: &DaemonConfig) -> bool {
    match finished {
        Transport::Stdio => !(config.health_serve || config.mcp_http_serve),
        Transport::Health | Transport::McpHttp => true,
    }
}

/// Serves every enabled transport until ctrl-c or until a transport whose
/// exit ends the daemon finishes, then closes the store.
async fn run<S: DocumentStore>(config: &DaemonConfig, handle: Arc<CollectionHandle<S>>) {
    let mut tasks: JoinSet<(Transport, ServeResult)> = JoinSet::new();

    if config.health_serve {
        let server = HealthServer::new(
            handle.clone(),
            HealthServerConfig::new(config.health_addr)
                .with_probe_timeout(config.connect_timeout),
        );
        tasks.spawn(async move { (Transport::Health, server.serve().await) });
    }
    if config.mcp_http_serve {
        let http_config = McpHttpServerConfig::new(config.mcp_http_addr);
        let handle = handle.clone();
        tasks.spawn(async move {
            let result = serve_streamable_http(handle, http_config).await;
            (Transport::McpHttp, result)
        });
    }
    if config.enable_stdio {
        let handle = handle.clone();
        tasks.spawn(async move { (Transport::Stdio, serve_stdio(handle).await) });
    }

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            joined = tasks.join_next() => {
                let Some(joined) = joined else { break };
                let (transport, result) = match joined {
                    Ok(finished) => finished,
                    Err(err) => {
                        error!("transport task aborted: {err}");
                        break;
                    }
                };
                match result {
                    Ok(()) => info!("{} transport finished", transport.name()),
                    Err(err) => error!("{} transport failed: {err}", transport.name()),
                }
                if ends_daemon(transport, config) {
                    break;
                }
                info!("other transports keep serving until ctrl-c");
            }
            _ = &mut shutdown => {
                info!("shutting down servers");
                break;
            }
        }
    }

    tasks.abort_all();
    handle.close().await;
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn config(health_serve: bool, mcp_http_serve: bool) -> DaemonConfig {
        DaemonConfig {
            mongo_uri: "mongodb://localhost:27017/".to_string(),
            db_name: "stock_data".to_string(),
            collection_name: "detailed_financials".to_string(),
            connect_timeout: Duration::from_secs(5),
            health_addr: "127.0.0.1:8000".parse().unwrap(),
            health_serve,
            enable_stdio: true,
            mcp_http_serve,
            mcp_http_addr: "127.0.0.1:4020".parse().unwrap(),
            db_in_memory: false,
            db_seed_file: None,
            log_level: "info".to_string(),
        }
    }

    #[test]
    fn closed_stdin_keeps_listeners_running() {
        assert!(!ends_daemon(Transport::Stdio, &config(true, false)));
        assert!(!ends_daemon(Transport::Stdio, &config(false, true)));
        assert!(!ends_daemon(Transport::Stdio, &config(true, true)));
    }

    #[test]
    fn closed_stdin_ends_stdio_only_daemon() {
        assert!(ends_daemon(Transport::Stdio, &config(false, false)));
    }

    #[test]
    fn listener_exit_ends_daemon() {
        assert!(ends_daemon(Transport::Health, &config(true, false)));
        assert!(ends_daemon(Transport::McpHttp, &config(true, true)));
    }
}

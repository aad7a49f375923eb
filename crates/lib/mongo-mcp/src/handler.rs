//! Transport-independent request handling.
//!
//! [`CollectionProtocol`] is the full surface a session can reach. The rmcp
//! `ServerHandler` implementation in the crate root forwards to it, and tests
//! drive it directly without a transport.

use std::error::Error;
use std::fmt;
use std::future::Future;

use mongo_mcp_core::query::{QueryError, QueryExecutor, QueryOptions, parse_filter};
use mongo_mcp_core::render::render_page;
use mongo_mcp_core::store::DocumentStore;
use serde_json::{Map, Value};
use tracing::{debug, error};

use crate::MongoMcp;
use crate::catalog::{ResourceDescriptor, ToolDescriptor};

/// Number of documents returned when reading the collection resource.
pub const RESOURCE_SAMPLE_LIMIT: i64 = 10;

#[derive(Debug)]
pub enum CallError {
    UnknownTool(String),
    UnknownResource(String),
    Query { collection: String, source: QueryError },
    Read { collection: String, source: QueryError },
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownTool(name) => write!(f, "Unknown tool: {name}"),
            Self::UnknownResource(uri) => write!(f, "Unknown resource: {uri}"),
            Self::Query { collection, source } => {
                write!(f, "Error executing query on {collection}: {source}")
            }
            Self::Read { collection, source } => {
                write!(f, "Error retrieving documents from {collection}: {source}")
            }
        }
    }
}

impl Error for CallError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Query { source, .. } | Self::Read { source, .. } => Some(source),
            Self::UnknownTool(_) | Self::UnknownResource(_) => None,
        }
    }
}

/// The four operations a caller can invoke.
///
/// Every outcome is either rendered text or a [`CallError`] whose `Display`
/// is the text shown to the caller; nothing here is a transport failure.
pub trait CollectionProtocol {
    fn list_resources(&self) -> Vec<ResourceDescriptor>;

    fn read_resource(&self, uri: &str) -> impl Future<Output = Result<String, CallError>> + Send;

    fn list_tools(&self) -> Vec<ToolDescriptor>;

    fn call_tool(
        &self,
        name: &str,
        arguments: Option<Map<String, Value>>,
    ) -> impl Future<Output = Result<String, CallError>> + Send;
}

impl<S: DocumentStore> CollectionProtocol for MongoMcp<S> {
    fn list_resources(&self) -> Vec<ResourceDescriptor> {
        self.catalog.list_catalog()
    }

    async fn read_resource(&self, uri: &str) -> Result<String, CallError> {
        if uri != self.catalog.resource_uri() {
            return Err(CallError::UnknownResource(uri.to_string()));
        }

        let page = QueryExecutor::new(self.handle.as_ref())
            .sample(RESOURCE_SAMPLE_LIMIT)
            .await
            .map_err(|source| {
                let err = CallError::Read {
                    collection: self.catalog.collection().to_string(),
                    source,
                };
                error!("{err}");
                err
            })?;
        Ok(render_page(&page))
    }

    fn list_tools(&self) -> Vec<ToolDescriptor> {
        vec![self.catalog.tool()]
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Option<Map<String, Value>>,
    ) -> Result<String, CallError> {
        if name != self.catalog.tool_name() {
            debug!(tool = name, "rejecting unknown tool");
            return Err(CallError::UnknownTool(name.to_string()));
        }

        let arguments = arguments.unwrap_or_default();
        let query_failed = |source| {
            let err = CallError::Query {
                collection: self.catalog.collection().to_string(),
                source,
            };
            error!("{err}");
            err
        };

        let filter = parse_filter(arguments.get("query")).map_err(query_failed)?;
        let options = QueryOptions::sanitize(arguments.get("options").and_then(Value::as_object));
        let page = QueryExecutor::new(self.handle.as_ref())
            .execute(filter, &options)
            .await
            .map_err(query_failed)?;
        Ok(render_page(&page))
    }
}

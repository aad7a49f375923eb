//! MCP server implementation for mongo-mcp.
//!
//! This crate wires the query pipeline into an rmcp `ServerHandler` and
//! exposes the MCP-facing surface: one collection resource and one query tool.

pub mod catalog;
pub mod handler;
pub mod server;

use std::sync::Arc;

use mongo_mcp_core::services::CollectionHandle;
use mongo_mcp_core::store::DocumentStore;
use rmcp::model::{
    AnnotateAble,
    CallToolRequestParams,
    CallToolResult,
    Content,
    ListResourcesResult,
    ListToolsResult,
    PaginatedRequestParams,
    RawResource,
    ReadResourceRequestParams,
    ReadResourceResult,
    Resource,
    ResourceContents,
    ServerCapabilities,
    ServerInfo,
    Tool,
};
use rmcp::service::RequestContext;
use rmcp::{ErrorData, RoleServer, ServerHandler};

use crate::catalog::{Catalog, ResourceDescriptor, ToolDescriptor};
use crate::handler::CollectionProtocol;

const SERVER_INSTRUCTIONS: &str = r#"mongo-mcp exposes one MongoDB collection for read-only queries.

Workflow:
1. Call `resources/list` to find the collection resource (`mongodb://<collection>`). Reading it
   returns the first 10 documents so you can see the document shape.
2. Call `tools/list` to find the query tool (`query_<collection>`).
3. Call the tool with:
   - `query`: a MongoDB filter object, e.g. {"ticker": "ABC"}. Use {} to match everything.
   - `options` (optional): `projection`, `sort`, `limit` (1-100, default 100), `skip` (>= 0).

Notes:
- Results report the total number of matches and the range shown; page with `skip`.
- `_id` values are returned as strings; dates are ISO-8601 strings.
- Out-of-range `limit`/`skip` values are clamped, unknown option keys are ignored."#;

/// MCP server wrapper around the shared collection handle.
pub struct MongoMcp<S: DocumentStore> {
    handle: Arc<CollectionHandle<S>>,
    catalog: Catalog,
}

impl<S: DocumentStore> Clone for MongoMcp<S> {
    fn clone(&self) -> Self {
        Self {
            handle: self.handle.clone(),
            catalog: self.catalog.clone(),
        }
    }
}

impl<S: DocumentStore> MongoMcp<S> {
    /// Creates a new server using a handle by value.
    #[must_use]
    pub fn new(handle: CollectionHandle<S>) -> Self {
        Self::with_handle(Arc::new(handle))
    }

    /// Creates a new server using a shared handle.
    #[must_use]
    pub fn with_handle(handle: Arc<CollectionHandle<S>>) -> Self {
        let catalog = Catalog::new(handle.target().collection.clone());
        Self { handle, catalog }
    }

    #[must_use]
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }
}

fn to_resource(descriptor: ResourceDescriptor) -> Resource {
    let mut raw = RawResource::new(descriptor.uri, descriptor.name);
    raw.title = Some(descriptor.display_name);
    raw.description = Some(descriptor.description);
    raw.mime_type = Some(descriptor.mime_type);
    raw.no_annotation()
}

fn to_tool(descriptor: ToolDescriptor) -> Tool {
    let mut tool = Tool::new(
        descriptor.name,
        descriptor.description,
        Arc::new(descriptor.input_schema),
    );
    tool.title = Some(descriptor.display_name);
    tool
}

impl<S: DocumentStore> ServerHandler for MongoMcp<S> {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(SERVER_INSTRUCTIONS.to_string()),
            capabilities: ServerCapabilities::builder()
                .enable_resources()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, ErrorData> {
        let resources = CollectionProtocol::list_resources(self)
            .into_iter()
            .map(to_resource)
            .collect();
        Ok(ListResourcesResult::with_all_items(resources))
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, ErrorData> {
        let text = CollectionProtocol::read_resource(self, &request.uri)
            .await
            .unwrap_or_else(|err| err.to_string());
        Ok(ReadResourceResult {
            contents: vec![ResourceContents::text(text, request.uri)],
        })
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        let tools = CollectionProtocol::list_tools(self)
            .into_iter()
            .map(to_tool)
            .collect();
        Ok(ListToolsResult::with_all_items(tools))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        match CollectionProtocol::call_tool(self, &request.name, request.arguments).await {
            Ok(text) => Ok(CallToolResult::success(vec![Content::text(text)])),
            Err(err) => Ok(CallToolResult::error(vec![Content::text(err.to_string())])),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_descriptor_maps_title_and_mime_type() {
        let catalog = Catalog::new("detailed_financials");
        let resource = to_resource(catalog.list_catalog().remove(0));

        assert_eq!(resource.uri, "mongodb://detailed_financials");
        assert_eq!(resource.name, "mongo_detailed_financials");
        assert_eq!(resource.title.as_deref(), Some("MongoDB detailed_financials"));
        assert_eq!(resource.mime_type.as_deref(), Some("application/json"));
        assert_eq!(
            resource.description.as_deref(),
            Some("Access to MongoDB collection detailed_financials")
        );
    }

    #[test]
    fn tool_descriptor_keeps_schema_and_title() {
        let catalog = Catalog::new("detailed_financials");
        let tool = to_tool(catalog.tool());

        assert_eq!(tool.name, "query_detailed_financials");
        assert_eq!(tool.title.as_deref(), Some("Query detailed_financials"));
        assert_eq!(
            tool.description.as_deref(),
            Some("Query the detailed_financials collection in MongoDB")
        );
        assert_eq!(*tool.input_schema, catalog::describe_operation());
    }
}

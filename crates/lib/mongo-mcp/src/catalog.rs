//! Static descriptors for the one resource and one tool this server offers.

use mongo_mcp_core::query::{MAX_LIMIT, MIN_LIMIT};
use serde::Serialize;
use serde_json::{Map, Value, json};

/// Advertised data resource for the configured collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceDescriptor {
    pub name: String,
    pub uri: String,
    pub display_name: String,
    pub description: String,
    pub mime_type: String,
}

/// Advertised query operation for the configured collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub input_schema: Map<String, Value>,
}

/// Catalog derived from the collection name. Never touches the store.
#[derive(Debug, Clone)]
pub struct Catalog {
    collection: String,
}

impl Catalog {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
        }
    }

    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    #[must_use]
    pub fn resource_uri(&self) -> String {
        format!("mongodb://{}", self.collection)
    }

    #[must_use]
    pub fn tool_name(&self) -> String {
        format!("query_{}", self.collection)
    }

    #[must_use]
    pub fn list_catalog(&self) -> Vec<ResourceDescriptor> {
        vec![ResourceDescriptor {
            name: format!("mongo_{}", self.collection),
            uri: self.resource_uri(),
            display_name: format!("MongoDB {}", self.collection),
            description: format!("Access to MongoDB collection {}", self.collection),
            mime_type: "application/json".to_string(),
        }]
    }

    #[must_use]
    pub fn tool(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.tool_name(),
            display_name: format!("Query {}", self.collection),
            description: format!("Query the {} collection in MongoDB", self.collection),
            input_schema: describe_operation(),
        }
    }
}

/// JSON schema for the query tool's arguments.
///
/// Bounds on `limit` and `skip` are advisory: the server clamps out-of-range
/// values instead of rejecting the call.
#[must_use]
pub fn describe_operation() -> Map<String, Value> {
    let schema = json!({
        "type": "object",
        "properties": {
            "query": {
                "type": "object",
                "description": "MongoDB query filter. Extended JSON such as {\"$oid\": ...} is accepted. Use {} to match all documents."
            },
            "options": {
                "type": "object",
                "description": "MongoDB query options (projection, sort, limit, skip). Other keys are ignored.",
                "properties": {
                    "projection": {
                        "type": "object",
                        "description": "Fields to include (1) or exclude (0)"
                    },
                    "sort": {
                        "type": "object",
                        "description": "Sort criteria as field: 1 (ascending) or -1 (descending), applied in key order"
                    },
                    "limit": {
                        "type": "integer",
                        "description": format!(
                            "Maximum number of documents to return (default {MAX_LIMIT}); values outside {MIN_LIMIT}-{MAX_LIMIT} are clamped"
                        ),
                        "minimum": MIN_LIMIT,
                        "maximum": MAX_LIMIT
                    },
                    "skip": {
                        "type": "integer",
                        "description": "Number of documents to skip; negative values are treated as 0",
                        "minimum": 0
                    }
                }
            }
        },
        "required": ["query"]
    });
    match schema {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

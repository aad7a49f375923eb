use bson::{Document, doc};
use mongo_mcp::MongoMcp;
use mongo_mcp::handler::{CallError, CollectionProtocol};
use mongo_mcp_core::render::NO_MATCHES;
use mongo_mcp_core::services::{CollectionHandle, CollectionTarget};
use mongo_mcp_core::store::MemoryCollection;
use serde_json::{Map, Value, json};

const COLLECTION: &str = "detailed_financials";

fn target() -> CollectionTarget {
    CollectionTarget::new("stock_data", COLLECTION)
}

fn build_server(documents: Vec<Document>) -> MongoMcp<MemoryCollection> {
    MongoMcp::new(CollectionHandle::connected(
        target(),
        MemoryCollection::with_documents(documents),
    ))
}

fn disconnected_server() -> MongoMcp<MemoryCollection> {
    MongoMcp::new(CollectionHandle::disconnected(
        target(),
        "failed to connect to MongoDB: server selection timeout",
    ))
}

fn tickers(count: i32) -> Vec<Document> {
    (0..count)
        .map(|n| doc! { "ticker": if n % 2 == 0 { "ABC" } else { "XYZ" }, "n": n })
        .collect()
}

fn args(value: Value) -> Option<Map<String, Value>> {
    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

#[test]
fn lists_one_resource_and_one_tool() {
    let server = build_server(Vec::new());

    let resources = server.list_resources();
    assert_eq!(resources.len(), 1);
    assert_eq!(resources[0].uri, format!("mongodb://{COLLECTION}"));

    let tools = server.list_tools();
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0].name, format!("query_{COLLECTION}"));
    assert_eq!(tools[0].input_schema["required"], json!(["query"]));
}

#[tokio::test]
async fn call_tool_renders_matches() {
    let server = build_server(tickers(3));
    let text = server
        .call_tool(
            &format!("query_{COLLECTION}"),
            args(json!({ "query": {}, "options": {} })),
        )
        .await
        .expect("query should succeed");

    assert!(text.starts_with("Found 3 total documents"), "{text}");
    assert!(text.contains("Showing documents 1-3:"));
}

#[tokio::test]
async fn call_tool_without_arguments_matches_everything() {
    let server = build_server(tickers(4));
    let text = server
        .call_tool(&format!("query_{COLLECTION}"), None)
        .await
        .expect("query should succeed");
    assert!(text.starts_with("Found 4 total documents"));
}

#[tokio::test]
async fn call_tool_clamps_negative_skip() {
    let server = build_server(tickers(6));
    let text = server
        .call_tool(
            &format!("query_{COLLECTION}"),
            args(json!({ "query": { "ticker": "ABC" }, "options": { "skip": -5 } })),
        )
        .await
        .expect("query should succeed");
    assert!(text.contains("Showing documents 1-3:"), "{text}");
}

#[tokio::test]
async fn call_tool_with_no_matches_is_not_an_error() {
    let server = build_server(tickers(2));
    let text = server
        .call_tool(
            &format!("query_{COLLECTION}"),
            args(json!({ "query": { "ticker": "NONE" } })),
        )
        .await
        .expect("empty result is a success");
    assert_eq!(text, NO_MATCHES);
}

#[tokio::test]
async fn unknown_tool_is_a_text_outcome() {
    let server = build_server(tickers(2));
    let err = server
        .call_tool("query_unknown", args(json!({ "query": {} })))
        .await
        .unwrap_err();
    assert!(matches!(err, CallError::UnknownTool(_)));
    assert_eq!(err.to_string(), "Unknown tool: query_unknown");
}

#[tokio::test]
async fn disconnected_store_reports_uninitialized_connection() {
    let server = disconnected_server();
    let err = server
        .call_tool(
            &format!("query_{COLLECTION}"),
            args(json!({ "query": {} })),
        )
        .await
        .unwrap_err();
    let text = err.to_string();
    assert!(text.contains("connection not initialized"), "{text}");
    assert!(text.starts_with(&format!("Error executing query on {COLLECTION}")));

    let err = server
        .read_resource(&format!("mongodb://{COLLECTION}"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("connection not initialized"));
}

#[tokio::test]
async fn invalid_query_is_reported_as_text() {
    let server = build_server(tickers(2));
    let err = server
        .call_tool(
            &format!("query_{COLLECTION}"),
            args(json!({ "query": "ticker = ABC" })),
        )
        .await
        .unwrap_err();
    assert!(err.to_string().contains("query must be an object"));

    let err = server
        .call_tool(
            &format!("query_{COLLECTION}"),
            args(json!({ "query": { "n": { "$unsupported": 1 } } })),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CallError::Query { .. }));
}

#[tokio::test]
async fn read_resource_returns_first_ten_documents() {
    let server = build_server(tickers(25));
    let text = server
        .read_resource(&format!("mongodb://{COLLECTION}"))
        .await
        .expect("resource read should succeed");
    assert!(text.starts_with("Found 25 total documents"));
    assert!(text.contains("Showing documents 1-10:"));
    assert_eq!(text.matches("\"ticker\"").count(), 10);
}

#[tokio::test]
async fn read_resource_rejects_other_uris() {
    let server = build_server(tickers(1));
    let err = server.read_resource("mongodb://other").await.unwrap_err();
    assert_eq!(err.to_string(), "Unknown resource: mongodb://other");
}

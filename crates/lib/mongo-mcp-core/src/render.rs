//! Text rendering of query pages.
//!
//! Output is meant for an LLM or a human reading a tool result: a summary
//! line, the shown range, then each document as indented JSON. Identifiers
//! and temporal values are rendered as strings so the JSON re-parses cleanly.

use bson::{Bson, Document};
use chrono::SecondsFormat;
use serde_json::{Map, Number, Value};

use crate::query::QueryPage;

/// Fixed response for a query that matched nothing.
pub const NO_MATCHES: &str = "No matching documents found.";

const ID_FIELD: &str = "_id";

/// Renders a page with its total-count and range framing.
#[must_use]
pub fn render_page(page: &QueryPage) -> String {
    if page.documents.is_empty() {
        return NO_MATCHES.to_string();
    }

    let shown = page.documents.len() as u64;
    let first = page.skip.saturating_add(1);
    let last = page.skip.saturating_add(shown).min(page.total_count);

    let rendered: Vec<String> = page.documents.iter().map(render_document).collect();
    format!(
        "Found {} total documents matching query.\nShowing documents {first}-{last}:\n{}",
        page.total_count,
        rendered.join("\n")
    )
}

/// Renders one document as two-space indented JSON.
#[must_use]
pub fn render_document(document: &Document) -> String {
    let value = document_to_json(document);
    serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
}

/// Converts a document to plain JSON, stringifying its `_id`.
#[must_use]
pub fn document_to_json(document: &Document) -> Value {
    let mut map = Map::with_capacity(document.len());
    for (key, value) in document {
        let converted = if key == ID_FIELD {
            Value::String(identifier_string(value))
        } else {
            bson_to_json(value)
        };
        map.insert(key.clone(), converted);
    }
    Value::Object(map)
}

/// Canonical string form of a document identifier.
#[must_use]
pub fn identifier_string(value: &Bson) -> String {
    match value {
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::String(text) => text.clone(),
        Bson::Int32(n) => n.to_string(),
        Bson::Int64(n) => n.to_string(),
        other => bson_to_json(other).to_string(),
    }
}

fn bson_to_json(value: &Bson) -> Value {
    match value {
        Bson::Null | Bson::Undefined => Value::Null,
        Bson::Boolean(flag) => Value::Bool(*flag),
        Bson::Int32(n) => Value::from(*n),
        Bson::Int64(n) => Value::from(*n),
        Bson::Double(n) => {
            Number::from_f64(*n).map_or_else(|| Value::String(n.to_string()), Value::Number)
        }
        Bson::String(text) | Bson::Symbol(text) => Value::String(text.clone()),
        Bson::ObjectId(oid) => Value::String(oid.to_hex()),
        Bson::DateTime(datetime) => Value::String(
            datetime
                .to_chrono()
                .to_rfc3339_opts(SecondsFormat::Millis, true),
        ),
        Bson::Timestamp(timestamp) => {
            let datetime = bson::DateTime::from_millis(i64::from(timestamp.time) * 1000);
            Value::String(
                datetime
                    .to_chrono()
                    .to_rfc3339_opts(SecondsFormat::Millis, true),
            )
        }
        Bson::Decimal128(_) => match value.clone().into_relaxed_extjson() {
            Value::Object(mut wrapped) => wrapped
                .remove("$numberDecimal")
                .unwrap_or(Value::Object(wrapped)),
            other => other,
        },
        Bson::Array(items) => Value::Array(items.iter().map(bson_to_json).collect()),
        Bson::Document(inner) => {
            let mut map = Map::with_capacity(inner.len());
            for (key, value) in inner {
                map.insert(key.clone(), bson_to_json(value));
            }
            Value::Object(map)
        }
        other => other.clone().into_relaxed_extjson(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::oid::ObjectId;
    use bson::{DateTime, doc};

    fn page(documents: Vec<Document>, total_count: u64, skip: u64) -> QueryPage {
        QueryPage {
            documents,
            total_count,
            skip,
        }
    }

    #[test]
    fn empty_page_renders_fixed_message() {
        assert_eq!(render_page(&page(Vec::new(), 0, 0)), NO_MATCHES);
        assert_eq!(render_page(&page(Vec::new(), 12, 40)), NO_MATCHES);
    }

    #[test]
    fn summary_lists_total_and_range() {
        let ids: Vec<ObjectId> = (0..3).map(|_| ObjectId::new()).collect();
        let docs = ids
            .iter()
            .map(|id| doc! { "_id": *id, "ticker": "ABC" })
            .collect();
        let text = render_page(&page(docs, 3, 0));

        assert!(text.starts_with("Found 3 total documents matching query.\n"));
        assert!(text.contains("Showing documents 1-3:\n"));
        for id in &ids {
            assert!(text.contains(&format!("\"_id\": \"{}\"", id.to_hex())));
        }
        assert!(!text.contains("$oid"));
    }

    #[test]
    fn range_is_offset_by_skip_and_capped_by_total() {
        let docs = vec![doc! { "n": 1 }, doc! { "n": 2 }];
        let text = render_page(&page(docs.clone(), 50, 20));
        assert!(text.contains("Showing documents 21-22:"));

        let text = render_page(&page(docs, 21, 20));
        assert!(text.contains("Showing documents 21-21:"));
    }

    #[test]
    fn documents_use_two_space_indent() {
        let text = render_document(&doc! { "_id": 7, "ticker": "ABC" });
        assert_eq!(text, "{\n  \"_id\": \"7\",\n  \"ticker\": \"ABC\"\n}");
    }

    #[test]
    fn datetimes_render_as_iso_strings() {
        let when = DateTime::from_millis(1_700_000_000_123);
        let value = document_to_json(&doc! {
            "reported": when,
            "nested": { "at": when },
        });
        assert_eq!(value["reported"], "2023-11-14T22:13:20.123Z");
        assert_eq!(value["nested"]["at"], "2023-11-14T22:13:20.123Z");
    }

    #[test]
    fn rendered_documents_reparse_with_string_ids() {
        let id = ObjectId::new();
        let original = doc! {
            "_id": id,
            "ticker": "ABC",
            "price": 12.5,
            "volume": 1_000_i64,
            "tags": ["tech", { "weight": 2 }],
            "meta": { "active": true, "note": null },
        };
        let reparsed: Value = serde_json::from_str(&render_document(&original)).unwrap();
        let object = reparsed.as_object().unwrap();

        assert_eq!(object["_id"], Value::String(id.to_hex()));
        assert_eq!(object["ticker"], "ABC");
        assert_eq!(object["price"], 12.5);
        assert_eq!(object["volume"], 1000);
        assert_eq!(object["tags"][1]["weight"], 2);
        assert_eq!(object["meta"]["active"], true);
        assert!(object["meta"]["note"].is_null());
        let keys: Vec<_> = object.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["_id", "ticker", "price", "volume", "tags", "meta"]);
    }
}

use bson::Document;
use serde_json::{Map, Value};

use super::{QueryError, json_object_to_document};

/// Largest page a single query may return; also the default page size.
pub const MAX_LIMIT: i64 = 100;
/// Smallest page size a caller can request.
pub const MIN_LIMIT: i64 = 1;

/// Caller options after whitelisting and clamping.
///
/// Only `projection`, `sort`, `limit` and `skip` survive sanitization; every
/// other key in the options bag is dropped without error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    pub projection: Option<Map<String, Value>>,
    pub sort: Option<Map<String, Value>>,
    pub limit: Option<i64>,
    pub skip: Option<u64>,
}

impl QueryOptions {
    /// Sanitizes a raw options bag. Never fails.
    ///
    /// - `limit`: non-integers become [`MAX_LIMIT`]; integers are clamped to
    ///   `[MIN_LIMIT, MAX_LIMIT]`.
    /// - `skip`: non-integers and negatives become `0`.
    /// - `projection`/`sort`: kept when they are non-empty objects.
    #[must_use]
    pub fn sanitize(raw: Option<&Map<String, Value>>) -> Self {
        let Some(raw) = raw else {
            return Self::default();
        };

        let mut options = Self::default();
        for (key, value) in raw {
            match key.as_str() {
                "projection" => options.projection = non_empty_object(value),
                "sort" => options.sort = non_empty_object(value),
                "limit" => options.limit = Some(sanitize_limit(value)),
                "skip" => options.skip = Some(sanitize_skip(value)),
                _ => {}
            }
        }
        options
    }

    /// Page size to request from the store.
    #[must_use]
    pub fn effective_limit(&self) -> i64 {
        self.limit.unwrap_or(MAX_LIMIT)
    }

    #[must_use]
    pub fn effective_skip(&self) -> u64 {
        self.skip.unwrap_or(0)
    }

    pub(crate) fn projection_document(&self) -> Result<Option<Document>, QueryError> {
        self.projection
            .as_ref()
            .map(|projection| json_object_to_document("projection", projection))
            .transpose()
    }

    pub(crate) fn sort_document(&self) -> Result<Option<Document>, QueryError> {
        self.sort
            .as_ref()
            .map(|sort| json_object_to_document("sort", sort))
            .transpose()
    }
}

fn non_empty_object(value: &Value) -> Option<Map<String, Value>> {
    match value {
        Value::Object(map) if !map.is_empty() => Some(map.clone()),
        _ => None,
    }
}

fn sanitize_limit(value: &Value) -> i64 {
    value
        .as_i64()
        .map_or(MAX_LIMIT, |limit| limit.clamp(MIN_LIMIT, MAX_LIMIT))
}

fn sanitize_skip(value: &Value) -> u64 {
    value.as_u64().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sanitize(value: Value) -> QueryOptions {
        let Value::Object(map) = value else {
            panic!("options fixture must be an object");
        };
        QueryOptions::sanitize(Some(&map))
    }

    #[test]
    fn missing_options_sanitize_to_defaults() {
        let options = QueryOptions::sanitize(None);
        assert_eq!(options, QueryOptions::default());
        assert_eq!(options.effective_limit(), MAX_LIMIT);
        assert_eq!(options.effective_skip(), 0);
    }

    #[test]
    fn unknown_keys_are_dropped() {
        let options = sanitize(json!({
            "hint": { "ticker": 1 },
            "maxTimeMS": 10,
            "batch_size": 5,
            "limit": 5
        }));
        assert_eq!(
            options,
            QueryOptions {
                limit: Some(5),
                ..QueryOptions::default()
            }
        );
    }

    #[test]
    fn limit_is_clamped_into_range() {
        for (raw, expected) in [
            (json!(500), 100),
            (json!(100), 100),
            (json!(7), 7),
            (json!(1), 1),
            (json!(0), 1),
            (json!(-20), 1),
            (json!(i64::MAX), 100),
            (json!(u64::MAX), 100),
            (json!(12.5), 100),
            (json!("10"), 100),
            (json!(null), 100),
        ] {
            let options = sanitize(json!({ "limit": raw }));
            assert_eq!(options.limit, Some(expected), "limit {raw}");
        }
    }

    #[test]
    fn skip_is_never_negative() {
        for (raw, expected) in [
            (json!(-5), 0),
            (json!(0), 0),
            (json!(40), 40),
            (json!("3"), 0),
            (json!(2.0), 0),
            (json!(true), 0),
        ] {
            let options = sanitize(json!({ "skip": raw }));
            assert_eq!(options.skip, Some(expected), "skip {raw}");
        }
    }

    #[test]
    fn projection_and_sort_pass_through_when_objects() {
        let options = sanitize(json!({
            "projection": { "ticker": 1, "_id": 0 },
            "sort": { "date": -1, "ticker": 1 }
        }));
        let sort = options.sort_document().unwrap().unwrap();
        let keys: Vec<_> = sort.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["date", "ticker"]);
        assert!(options.projection_document().unwrap().is_some());

        let ignored = sanitize(json!({ "projection": "ticker", "sort": {} }));
        assert!(ignored.projection.is_none());
        assert!(ignored.sort.is_none());
    }
}

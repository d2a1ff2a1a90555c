//! Storage layer abstraction.
//!
//! The gateway never builds predicates itself: every request ends in exactly
//! one call on [`Storage`], passing route parameters and the encoded filter
//! set. The PostgreSQL implementation forwards to the database-side query
//! functions; tests substitute an in-memory implementation.

mod postgres;

use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue};
use uuid::Uuid;

pub use postgres::PgStorage;

/// One target row returned by the storage layer.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub target_id: String,
    pub target_name: String,
    pub updated_at: String,
    /// Category data for this target.
    pub payload: Map<String, JsonValue>,
}

impl ResultRow {
    pub fn new(
        target_id: impl Into<String>,
        target_name: impl Into<String>,
        updated_at: impl Into<String>,
        payload: Map<String, JsonValue>,
    ) -> Self {
        Self {
            target_id: target_id.into(),
            target_name: target_name.into(),
            updated_at: updated_at.into(),
            payload,
        }
    }
}

/// A row from a listener query, tagged with the category that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct ListenerRow {
    pub category_name: String,
    pub row: ResultRow,
}

/// Storage-layer round trips used by the gateway.
///
/// `filters` is the encoded filter array, `None` when the request carried no
/// filters. Implementations must be safe to call from many requests at once.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Targets of `category`, filtered.
    async fn category_targets(
        &self,
        category: &str,
        version: &str,
        filters: Option<&str>,
    ) -> Result<Vec<ResultRow>, sqlx::Error>;

    /// Registered schema for `category` at `version`, if any.
    async fn category_schema(
        &self,
        category: &str,
        version: &str,
    ) -> Result<Option<JsonValue>, sqlx::Error>;

    /// A single target's data within `category`.
    async fn target(&self, category: &str, target_id: Uuid)
    -> Result<Option<ResultRow>, sqlx::Error>;

    /// Rows visible through one listener.
    async fn listener_rows(
        &self,
        listener_id: &str,
        version: &str,
        filters: Option<&str>,
    ) -> Result<Vec<ListenerRow>, sqlx::Error>;

    /// Aggregate object for several listeners, as built by the storage layer.
    async fn multi_listener(
        &self,
        listener_ids: &[String],
        version: &str,
        filters: Option<&str>,
    ) -> Result<JsonValue, sqlx::Error>;

    /// Whether the backing store is reachable.
    async fn healthy(&self) -> bool;
}

/// Parse a stored category payload.
///
/// Anything that is not a JSON object contributes no fields.
pub fn parse_payload(raw: Option<&str>) -> Map<String, JsonValue> {
    let Some(raw) = raw else {
        return Map::new();
    };

    match serde_json::from_str::<JsonValue>(raw) {
        Ok(JsonValue::Object(map)) => map,
        Ok(other) => {
            tracing::warn!(kind = json_kind(&other), "category data is not an object");
            Map::new()
        }
        Err(e) => {
            tracing::warn!(error = %e, "category data is not valid JSON");
            Map::new()
        }
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn payload_object_is_kept() {
        let map = parse_payload(Some(r#"{"status":"online","cpu_cores":8}"#));
        assert_eq!(map.get("status"), Some(&JsonValue::from("online")));
        assert_eq!(map.get("cpu_cores"), Some(&JsonValue::from(8)));
    }

    #[test]
    fn missing_or_invalid_payload_is_empty() {
        assert!(parse_payload(None).is_empty());
        assert!(parse_payload(Some("not json")).is_empty());
        assert!(parse_payload(Some("[1,2]")).is_empty());
        assert!(parse_payload(Some("null")).is_empty());
    }
}

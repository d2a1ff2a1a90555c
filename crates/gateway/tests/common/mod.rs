#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Common test utilities for integration tests.
//!
//! [`TestApp`] drives the real router with `oneshot` against a
//! [`MemoryStorage`] that serves canned rows and records every call it
//! receives, so tests can check what the gateway asked storage for.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use http_body_util::BodyExt;
use parking_lot::Mutex;
use serde_json::{Map, Value as JsonValue, json};
use tower::ServiceExt;
use uuid::Uuid;

use tmidb_gateway::AppState;
use tmidb_gateway::routes;
use tmidb_gateway::storage::{ListenerRow, ResultRow, Storage};

/// One storage call as seen by [`MemoryStorage`].
#[derive(Debug, Clone, PartialEq)]
pub struct StorageCall {
    pub operation: &'static str,
    pub subject: String,
    pub version: String,
    pub filters: Option<String>,
}

/// In-memory [`Storage`] with canned data.
#[derive(Default)]
pub struct MemoryStorage {
    categories: HashMap<String, Vec<ResultRow>>,
    schemas: HashMap<String, JsonValue>,
    listeners: HashMap<String, Vec<ListenerRow>>,
    failing: bool,
    calls: Mutex<Vec<StorageCall>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails as if the pool were exhausted.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn with_category(mut self, category: &str, rows: Vec<ResultRow>) -> Self {
        self.categories.insert(category.to_string(), rows);
        self
    }

    pub fn with_schema(mut self, category: &str, schema: JsonValue) -> Self {
        self.schemas.insert(category.to_string(), schema);
        self
    }

    pub fn with_listener(mut self, listener_id: &str, rows: Vec<ListenerRow>) -> Self {
        self.listeners.insert(listener_id.to_string(), rows);
        self
    }

    pub fn calls(&self) -> Vec<StorageCall> {
        self.calls.lock().clone()
    }

    fn record(
        &self,
        operation: &'static str,
        subject: impl Into<String>,
        version: &str,
        filters: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        self.calls.lock().push(StorageCall {
            operation,
            subject: subject.into(),
            version: version.to_string(),
            filters: filters.map(str::to_string),
        });

        if self.failing {
            Err(sqlx::Error::PoolTimedOut)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn category_targets(
        &self,
        category: &str,
        version: &str,
        filters: Option<&str>,
    ) -> Result<Vec<ResultRow>, sqlx::Error> {
        self.record("category_targets", category, version, filters)?;
        Ok(self.categories.get(category).cloned().unwrap_or_default())
    }

    async fn category_schema(
        &self,
        category: &str,
        version: &str,
    ) -> Result<Option<JsonValue>, sqlx::Error> {
        self.record("category_schema", category, version, None)?;
        Ok(self.schemas.get(category).cloned())
    }

    async fn target(
        &self,
        category: &str,
        target_id: Uuid,
    ) -> Result<Option<ResultRow>, sqlx::Error> {
        self.record("target", format!("{category}/{target_id}"), "1", None)?;
        let id = target_id.to_string();
        Ok(self
            .categories
            .get(category)
            .and_then(|rows| rows.iter().find(|row| row.target_id == id).cloned()))
    }

    async fn listener_rows(
        &self,
        listener_id: &str,
        version: &str,
        filters: Option<&str>,
    ) -> Result<Vec<ListenerRow>, sqlx::Error> {
        self.record("listener_rows", listener_id, version, filters)?;
        Ok(self.listeners.get(listener_id).cloned().unwrap_or_default())
    }

    async fn multi_listener(
        &self,
        listener_ids: &[String],
        version: &str,
        filters: Option<&str>,
    ) -> Result<JsonValue, sqlx::Error> {
        self.record("multi_listener", listener_ids.join(","), version, filters)?;

        let mut object = Map::new();
        for id in listener_ids {
            let count = self.listeners.get(id).map_or(0, Vec::len);
            object.insert(id.clone(), json!({ "count": count }));
        }
        Ok(JsonValue::Object(object))
    }

    async fn healthy(&self) -> bool {
        !self.failing
    }
}

/// Router plus the storage behind it.
pub struct TestApp {
    pub router: Router,
    pub storage: Arc<MemoryStorage>,
}

impl TestApp {
    /// Must be called inside a Tokio runtime.
    pub fn new(storage: MemoryStorage) -> Self {
        let storage = Arc::new(storage);
        let state = AppState::with_storage(storage.clone());

        Self {
            router: routes::app(state),
            storage,
        }
    }

    pub async fn request(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// GET `uri`, returning the status and the body parsed as JSON.
    pub async fn get_json(&self, uri: &str) -> (StatusCode, JsonValue) {
        let response = self.request(get(uri)).await;
        let status = response.status();
        let body = body_bytes(response).await;
        let json = serde_json::from_slice(&body).unwrap_or(JsonValue::Null);
        (status, json)
    }
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

/// Build a payload map from a JSON object literal.
pub fn payload(value: JsonValue) -> Map<String, JsonValue> {
    match value {
        JsonValue::Object(map) => map,
        other => panic!("payload must be an object, got {other}"),
    }
}

pub const SERVER_A: &str = "550e8400-e29b-41d4-a716-446655440000";
pub const SERVER_B: &str = "6ba7b810-9dad-11d1-80b4-00c04fd430c8";

pub fn server_rows() -> Vec<ResultRow> {
    vec![
        ResultRow::new(
            SERVER_A,
            "web-01",
            "2024-05-01 10:00:00",
            payload(json!({ "cpu_cores": 8, "status": "online" })),
        ),
        ResultRow::new(
            SERVER_B,
            "db-01",
            "2024-05-01 11:00:00",
            payload(json!({ "cpu_cores": 2, "status": "offline" })),
        ),
    ]
}

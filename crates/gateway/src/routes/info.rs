//! API information document served at `/`.

use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value as JsonValue, json};

use crate::query::OperatorTag;
use crate::state::AppState;

/// Create the info router.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(api_info))
}

async fn api_info() -> Json<JsonValue> {
    Json(info_document())
}

fn info_document() -> JsonValue {
    let operators: Vec<&str> = OperatorTag::ALL.iter().map(|op| op.as_str()).collect();

    json!({
        "name": "tmiDB Proxy",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Multi-category data management system with listener-based subscriptions",
        "endpoints": {
            "data_query": {
                "url": "/v1/{category}[?filters]",
                "description": "Query category data with advanced filtering",
                "example": "/v1/server?cpu_cores.gte=4&status.ne=offline",
            },
            "schema": {
                "url": "/v1/{category}/schema",
                "description": "Get category schema definition",
                "example": "/v1/server/schema",
            },
            "single_item": {
                "url": "/v1/{category}/{target_id}",
                "description": "Get specific target by UUID",
                "example": "/v1/server/550e8400-e29b-41d4-a716-446655440000",
            },
            "listener": {
                "url": "/api/v1/listener/{listener_id}[?filters]",
                "description": "Get data via listener subscription",
                "example": "/api/v1/listener/server_monitor?cpu_cores.gte=4",
            },
            "multi_listener": {
                "url": "/api/v1/listener/{listener_id1}/{listener_id2}/.../{listener_idN}",
                "description": "Get data from multiple listeners",
                "example": "/api/v1/listener/server_monitor/sensor_alerts",
            },
            "websocket": {
                "url": "/ws",
                "description": "Real-time broadcast updates",
                "example": "ws://localhost:8080/ws",
            },
            "health": {
                "url": "/health",
                "description": "Storage reachability",
            },
            "metrics": {
                "url": "/metrics",
                "description": "Prometheus metrics",
            },
        },
        "filtering": {
            "operators": operators,
            "examples": [
                "?status=online",
                "?cpu_cores>4",
                "?cpu_cores.gte=4",
                "?hostname~web",
                "?tags[]contains=production",
                "?status=online,maintenance",
                "?status.nin=offline,retired",
                "?owner.exists=true",
            ],
        },
    })
}

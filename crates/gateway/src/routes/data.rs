//! Data API handler.
//!
//! Every path not claimed by another router lands here. The path is
//! classified, the query string turned into filters, storage called once and
//! the rows shaped into the response for that route kind.

use std::future::Future;
use std::time::Instant;

use axum::Json;
use axum::extract::State;
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use serde_json::{Value as JsonValue, json};
use tracing::debug;

use crate::error::{GatewayError, GatewayResult};
use crate::gateway::{
    Route, RouteKind, RouteParams, SchemaResponse, category_envelope, classify,
    listener_envelope, response_time, target_object,
};
use crate::query::{FilterSet, encode_filters};
use crate::state::AppState;

/// Fallback handler for the data API.
///
/// The classified [`RouteKind`] is attached to the response extensions so the
/// metrics middleware can label the request.
pub async fn dispatch(State(state): State<AppState>, method: Method, uri: Uri) -> Response {
    if method != Method::GET {
        return (
            StatusCode::METHOD_NOT_ALLOWED,
            Json(json!({ "error": "method not allowed" })),
        )
            .into_response();
    }

    let route = match classify(uri.path()) {
        Ok(route) => route,
        Err(e) => return e.into_response(),
    };

    let kind = route.kind;
    let mut response = match handle(&state, route, uri.query().unwrap_or_default()).await {
        Ok(body) => Json(body).into_response(),
        Err(e) => e.into_response(),
    };

    response.extensions_mut().insert(kind);
    response
}

async fn handle(state: &AppState, route: Route, query: &str) -> GatewayResult<JsonValue> {
    let Route { kind, params } = route;

    match kind {
        RouteKind::CategoryQuery => category_query(state, params, query).await,
        RouteKind::SchemaLookup => schema_lookup(state, params).await,
        RouteKind::TargetLookup => target_lookup(state, params).await,
        RouteKind::SingleListener => single_listener(state, params, query).await,
        RouteKind::MultiListener => multi_listener(state, params, query).await,
    }
}

async fn category_query(
    state: &AppState,
    params: RouteParams,
    query: &str,
) -> GatewayResult<JsonValue> {
    let category = required(params.category, "category")?;
    let filters = FilterSet::from_query(query);
    let encoded = encode_filters(&filters)?;

    debug!(category = %category, filters = filters.len(), "category query");

    let rows = timed(
        state,
        "category_targets",
        state
            .storage()
            .category_targets(&category, &params.version, encoded.as_deref()),
    )
    .await?;

    Ok(category_envelope(
        &category,
        &params.version,
        rows,
        response_time(),
    ))
}

async fn schema_lookup(state: &AppState, params: RouteParams) -> GatewayResult<JsonValue> {
    let category = required(params.category, "category")?;

    let schema = timed(
        state,
        "category_schema",
        state.storage().category_schema(&category, &params.version),
    )
    .await?
    .ok_or_else(|| GatewayError::not_found("Schema not found"))?;

    Ok(serde_json::to_value(SchemaResponse {
        category,
        version: params.version,
        schema,
    })?)
}

async fn target_lookup(state: &AppState, params: RouteParams) -> GatewayResult<JsonValue> {
    let category = required(params.category, "category")?;
    let target_id = required(params.target_id, "target id")?;

    let row = timed(state, "target", state.storage().target(&category, target_id))
        .await?
        .ok_or_else(|| GatewayError::not_found("Target not found"))?;

    Ok(target_object(row))
}

async fn single_listener(
    state: &AppState,
    params: RouteParams,
    query: &str,
) -> GatewayResult<JsonValue> {
    let listener_id = required(params.listener_ids.into_iter().next(), "listener id")?;
    let filters = FilterSet::from_query(query);
    let encoded = encode_filters(&filters)?;

    debug!(listener = %listener_id, filters = filters.len(), "listener query");

    let rows = timed(
        state,
        "listener_rows",
        state
            .storage()
            .listener_rows(&listener_id, &params.version, encoded.as_deref()),
    )
    .await?;

    Ok(listener_envelope(
        &listener_id,
        &params.version,
        rows,
        response_time(),
    ))
}

async fn multi_listener(
    state: &AppState,
    params: RouteParams,
    query: &str,
) -> GatewayResult<JsonValue> {
    let filters = FilterSet::from_query(query);
    let encoded = encode_filters(&filters)?;

    debug!(
        listeners = params.listener_ids.len(),
        filters = filters.len(),
        "multi-listener query"
    );

    timed(
        state,
        "multi_listener",
        state
            .storage()
            .multi_listener(&params.listener_ids, &params.version, encoded.as_deref()),
    )
    .await
}

/// Run one storage call, recording its latency and outcome.
async fn timed<T>(
    state: &AppState,
    operation: &str,
    call: impl Future<Output = Result<T, sqlx::Error>>,
) -> GatewayResult<T> {
    let started = Instant::now();
    let result = call.await;
    state
        .metrics()
        .record_storage(operation, started.elapsed().as_secs_f64(), result.is_err());

    Ok(result?)
}

/// Route parameters guaranteed by classification.
fn required<T>(value: Option<T>, what: &str) -> GatewayResult<T> {
    value.ok_or_else(|| GatewayError::Internal(anyhow::anyhow!("route is missing its {what}")))
}

//! Request metrics middleware.

use std::time::Instant;

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};

use crate::gateway::RouteKind;
use crate::state::AppState;

/// Record count and latency for every request.
///
/// Data API responses carry their [`RouteKind`] in the response extensions;
/// everything else is labelled by its path.
pub async fn track_metrics(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path_label = static_label(request.uri().path());
    let started = Instant::now();

    let response = next.run(request).await;

    let route = response
        .extensions()
        .get::<RouteKind>()
        .map(|kind| kind.as_str())
        .unwrap_or(path_label);

    state.metrics().record_request(
        method.as_str(),
        route,
        response.status().as_u16(),
        started.elapsed().as_secs_f64(),
    );

    response
}

/// Label for requests that are not data API routes.
fn static_label(path: &str) -> &'static str {
    match path {
        "/" => "info",
        "/health" => "health",
        "/metrics" => "metrics",
        "/ws" => "relay",
        _ => "unmatched",
    }
}

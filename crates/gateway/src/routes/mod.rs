//! HTTP route handlers.

pub mod data;
pub mod health;
pub mod info;
pub mod metrics;
pub mod realtime;

use axum::Router;

use crate::state::AppState;

/// Assemble every route with the metrics middleware.
///
/// Transport layers (CORS, timeouts, tracing) are added by the binary.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(info::router())
        .merge(health::router())
        .merge(metrics::router())
        .merge(realtime::router())
        .fallback(data::dispatch)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::track_metrics,
        ))
        .with_state(state)
}

//! tmiDB data-access gateway.
//!
//! Translates REST-style paths and query strings into calls on the tmiDB
//! PostgreSQL functions, and relays broadcast messages to WebSocket clients.
//! The server binary is `tmidb-proxy`.

pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod metrics;
pub mod middleware;
pub mod query;
pub mod relay;
pub mod routes;
pub mod state;
pub mod storage;

pub use error::{GatewayError, GatewayResult};
pub use query::{Filter, FilterSet, OperatorTag};
pub use state::AppState;

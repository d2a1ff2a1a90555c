//! Application state shared across all handlers.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::Config;
use crate::db;
use crate::metrics::Metrics;
use crate::relay::{self, Relay};
use crate::storage::{PgStorage, Storage};

/// Shared application state.
///
/// Wrapped in Arc internally so Clone is cheap. Nothing in here is mutated
/// per request; the storage handle is safe for concurrent use.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Storage layer (PostgreSQL in production).
    storage: Arc<dyn Storage>,

    /// Prometheus metrics.
    metrics: Arc<Metrics>,

    /// Realtime broadcast relay.
    relay: Relay,
}

impl AppState {
    /// Connect to PostgreSQL and start the relay.
    pub async fn new(config: &Config) -> Result<Self> {
        let pool = db::create_pool(config)
            .await
            .context("failed to create database pool")?;
        info!(
            max_connections = config.database_max_connections,
            "PostgreSQL pool ready"
        );

        let state = Self::with_storage(Arc::new(PgStorage::new(pool.clone())));

        if let Some(channel) = &config.relay_channel {
            relay::spawn_notify_listener(pool, channel.clone(), state.relay().clone());
        }

        Ok(state)
    }

    /// Build state around an arbitrary storage implementation.
    ///
    /// Must be called from within a Tokio runtime (the relay dispatcher is
    /// spawned here).
    pub fn with_storage(storage: Arc<dyn Storage>) -> Self {
        let metrics = Arc::new(Metrics::new());
        let relay = Relay::start(
            metrics.relay_connections.clone(),
            metrics.relay_messages.clone(),
        );

        Self {
            inner: Arc::new(AppStateInner {
                storage,
                metrics,
                relay,
            }),
        }
    }

    /// Get the storage layer.
    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.inner.storage
    }

    /// Get the metrics registry.
    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.inner.metrics
    }

    /// Get the realtime relay.
    pub fn relay(&self) -> &Relay {
        &self.inner.relay
    }
}

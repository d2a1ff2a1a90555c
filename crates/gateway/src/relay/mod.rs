//! Realtime broadcast relay.
//!
//! Open WebSocket connections register here. Producers post messages with
//! [`Relay::publish`]; a single dispatcher task delivers each message to every
//! registered connection and drops connections whose delivery fails.
//!
//! Producers today: in-process callers, and optionally a PostgreSQL
//! `LISTEN` channel (see [`spawn_notify_listener`]).

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::gauge::Gauge;
use sqlx::PgPool;
use sqlx::postgres::PgListener;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Per-connection buffer. A connection that falls this far behind is dropped.
const CONNECTION_BUFFER: usize = 64;

/// Identifier of a registered connection.
pub type ConnectionId = u64;

/// Handle to the relay. Cheap to clone.
///
/// The dispatcher task only holds the connection registry, so dropping the last
/// handle closes the outbox and the dispatcher exits.
#[derive(Clone)]
pub struct Relay {
    inner: Arc<RelayInner>,
}

struct RelayInner {
    registry: Arc<Registry>,
    next_id: AtomicU64,
    outbox: mpsc::UnboundedSender<String>,
    messages: Counter,
}

/// Registered connections, shared with the dispatcher.
struct Registry {
    /// Add, remove and fan-out all take this lock.
    senders: Mutex<HashMap<ConnectionId, mpsc::Sender<String>>>,
    connections: Gauge,
}

/// A registered connection's receiving end.
pub struct Subscription {
    pub id: ConnectionId,
    pub messages: mpsc::Receiver<String>,
}

impl Relay {
    /// Create the relay and spawn its dispatcher.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(connections: Gauge, messages: Counter) -> Self {
        let (outbox, inbox) = mpsc::unbounded_channel();
        let registry = Arc::new(Registry {
            senders: Mutex::new(HashMap::new()),
            connections,
        });

        tokio::spawn(dispatch(registry.clone(), inbox));

        Self {
            inner: Arc::new(RelayInner {
                registry,
                next_id: AtomicU64::new(1),
                outbox,
                messages,
            }),
        }
    }

    /// Register a new connection.
    pub fn subscribe(&self) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(CONNECTION_BUFFER);

        let registry = &self.inner.registry;
        registry.senders.lock().insert(id, tx);
        registry.connections.inc();
        debug!(connection = id, "relay connection registered");

        Subscription { id, messages: rx }
    }

    /// Remove a connection. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: ConnectionId) {
        let registry = &self.inner.registry;
        if registry.senders.lock().remove(&id).is_some() {
            registry.connections.dec();
            debug!(connection = id, "relay connection removed");
        }
    }

    /// Queue a message for every registered connection.
    ///
    /// Returns `false` if the dispatcher task is gone, which happens when the
    /// runtime shuts down.
    pub fn publish(&self, message: impl Into<String>) -> bool {
        let accepted = self.inner.outbox.send(message.into()).is_ok();
        if accepted {
            self.inner.messages.inc();
        }
        accepted
    }

    /// Number of registered connections.
    pub fn connection_count(&self) -> usize {
        self.inner.registry.senders.lock().len()
    }
}

impl Registry {
    /// Deliver one message to every connection, dropping failed ones.
    fn fan_out(&self, message: &str) {
        let mut senders = self.senders.lock();
        let before = senders.len();

        senders.retain(|id, tx| match tx.try_send(message.to_string()) {
            Ok(()) => true,
            Err(e) => {
                warn!(connection = *id, error = %e, "dropping relay connection");
                false
            }
        });

        let dropped = before - senders.len();
        if dropped > 0 {
            self.connections.dec_by(dropped as i64);
        }
    }
}

/// Runs until every [`Relay`] handle is dropped.
async fn dispatch(registry: Arc<Registry>, mut inbox: mpsc::UnboundedReceiver<String>) {
    while let Some(message) = inbox.recv().await {
        registry.fan_out(&message);
    }
    debug!("relay dispatcher stopped");
}

/// Forward PostgreSQL `NOTIFY` payloads on `channel` into the relay.
pub fn spawn_notify_listener(pool: PgPool, channel: String, relay: Relay) {
    tokio::spawn(async move {
        let mut listener = match PgListener::connect_with(&pool).await {
            Ok(listener) => listener,
            Err(e) => {
                warn!(error = %e, "relay listener could not connect");
                return;
            }
        };

        if let Err(e) = listener.listen(&channel).await {
            warn!(channel = %channel, error = %e, "relay listener could not subscribe");
            return;
        }

        info!(channel = %channel, "relay listening for notifications");

        loop {
            match listener.recv().await {
                Ok(notification) => {
                    if !relay.publish(notification.payload()) {
                        break;
                    }
                }
                Err(e) => {
                    warn!(channel = %channel, error = %e, "relay listener stopped");
                    break;
                }
            }
        }
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn relay() -> Relay {
        Relay::start(Gauge::default(), Counter::default())
    }

    async fn next(sub: &mut Subscription) -> Option<String> {
        tokio::time::timeout(Duration::from_secs(1), sub.messages.recv())
            .await
            .ok()
            .flatten()
    }

    #[tokio::test]
    async fn broadcasts_to_every_connection() {
        let relay = relay();
        let mut a = relay.subscribe();
        let mut b = relay.subscribe();

        assert!(relay.publish("hello"));

        assert_eq!(next(&mut a).await.as_deref(), Some("hello"));
        assert_eq!(next(&mut b).await.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn unsubscribe_removes_connection() {
        let relay = relay();
        let a = relay.subscribe();
        let _b = relay.subscribe();
        assert_eq!(relay.connection_count(), 2);

        relay.unsubscribe(a.id);
        relay.unsubscribe(a.id);
        assert_eq!(relay.connection_count(), 1);
    }

    #[tokio::test]
    async fn closed_connection_is_dropped_on_delivery() {
        let relay = relay();
        let closed = relay.subscribe();
        let mut open = relay.subscribe();
        drop(closed);

        relay.publish("first");
        assert_eq!(next(&mut open).await.as_deref(), Some("first"));
        assert_eq!(relay.connection_count(), 1);
    }

    #[tokio::test]
    async fn dropping_every_handle_stops_dispatcher() {
        let relay = relay();
        let _sub = relay.subscribe();
        let inner = Arc::downgrade(&relay.inner);
        let registry = Arc::downgrade(&relay.inner.registry);

        drop(relay);
        assert!(inner.upgrade().is_none());

        // The dispatcher sees the closed outbox and releases the registry
        for _ in 0..20 {
            if registry.upgrade().is_none() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(registry.upgrade().is_none());
    }

    #[tokio::test]
    async fn gauge_follows_registry() {
        let gauge = Gauge::default();
        let relay = Relay::start(gauge.clone(), Counter::default());

        let a = relay.subscribe();
        let b = relay.subscribe();
        assert_eq!(gauge.get(), 2);

        relay.unsubscribe(a.id);
        drop(b);
        relay.publish("x");
        // Delivery to the dropped receiver fails and removes it
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(gauge.get(), 0);
    }
}

//! Prometheus metrics collection.
//!
//! Provides gateway metrics in Prometheus format.

use prometheus_client::encoding::{EncodeLabelSet, text::encode};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::{Histogram, exponential_buckets};
use prometheus_client::registry::Registry;

/// HTTP request labels.
///
/// `route` is the classified route kind rather than the raw path, which keeps
/// category and listener names out of the label set.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct HttpLabels {
    pub method: String,
    pub route: String,
    pub status: u16,
}

/// Storage call labels.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct StorageLabels {
    pub operation: String,
}

/// Gateway metrics.
pub struct Metrics {
    registry: Registry,

    /// HTTP request counter by method/route/status.
    pub http_requests: Family<HttpLabels, Counter>,

    /// HTTP request duration histogram.
    pub http_duration_seconds: Family<HttpLabels, Histogram>,

    /// Storage-layer round trip duration.
    pub storage_duration_seconds: Family<StorageLabels, Histogram>,

    /// Storage-layer failures.
    pub storage_errors: Family<StorageLabels, Counter>,

    /// Open realtime relay connections.
    pub relay_connections: Gauge,

    /// Messages accepted by the realtime relay.
    pub relay_messages: Counter,
}

impl Metrics {
    /// Create a new metrics registry.
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let http_requests = Family::<HttpLabels, Counter>::default();
        registry.register(
            "http_requests_total",
            "Total HTTP requests",
            http_requests.clone(),
        );

        let http_duration_seconds = Family::<HttpLabels, Histogram>::new_with_constructor(|| {
            Histogram::new(exponential_buckets(0.001, 2.0, 12))
        });
        registry.register(
            "http_request_duration_seconds",
            "HTTP request duration in seconds",
            http_duration_seconds.clone(),
        );

        let storage_duration_seconds =
            Family::<StorageLabels, Histogram>::new_with_constructor(|| {
                Histogram::new(exponential_buckets(0.0001, 2.0, 14))
            });
        registry.register(
            "storage_query_duration_seconds",
            "Storage query duration in seconds",
            storage_duration_seconds.clone(),
        );

        let storage_errors = Family::<StorageLabels, Counter>::default();
        registry.register(
            "storage_errors_total",
            "Storage query failures",
            storage_errors.clone(),
        );

        let relay_connections = Gauge::default();
        registry.register(
            "relay_connections",
            "Open realtime relay connections",
            relay_connections.clone(),
        );

        let relay_messages = Counter::default();
        registry.register(
            "relay_messages_total",
            "Messages posted to the realtime relay",
            relay_messages.clone(),
        );

        Self {
            registry,
            http_requests,
            http_duration_seconds,
            storage_duration_seconds,
            storage_errors,
            relay_connections,
            relay_messages,
        }
    }

    /// Record an HTTP request.
    pub fn record_request(&self, method: &str, route: &str, status: u16, duration_secs: f64) {
        let labels = HttpLabels {
            method: method.to_string(),
            route: route.to_string(),
            status,
        };

        self.http_requests.get_or_create(&labels).inc();
        self.http_duration_seconds
            .get_or_create(&labels)
            .observe(duration_secs);
    }

    /// Record a storage round trip.
    pub fn record_storage(&self, operation: &str, duration_secs: f64, failed: bool) {
        let labels = StorageLabels {
            operation: operation.to_string(),
        };

        self.storage_duration_seconds
            .get_or_create(&labels)
            .observe(duration_secs);

        if failed {
            self.storage_errors.get_or_create(&labels).inc();
        }
    }

    /// Encode metrics in Prometheus text format.
    ///
    /// # Panics
    ///
    /// Panics if Prometheus metric encoding to a `String` buffer fails.
    /// The `fmt::Write` impl for `String` is infallible, and all metric
    /// labels use derived `EncodeLabelSet` impls that do not produce
    /// `fmt::Error`.
    pub fn encode(&self) -> String {
        let mut buffer = String::new();
        // Prometheus encoding to String buffer is infallible
        #[allow(clippy::expect_used)]
        encode(&mut buffer, &self.registry).expect("encoding metrics");
        buffer
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish()
    }
}

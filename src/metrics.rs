//! Prometheus metrics for admission decisions.
//!
//! Provides:
//! - `Metrics` - counters and histograms recorded by the webhook handlers
//! - `/metrics` - optional plaintext endpoint, only started when a metrics
//!   port is configured

use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
    routing::get,
};
use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::{EncodeLabel, EncodeLabelSet, LabelSetEncoder};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::{Histogram, exponential_buckets};
use prometheus_client::registry::Registry;
use tracing::info;

/// Labels for decided reviews
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct VerdictLabels {
    pub verdict: &'static str,
}

impl EncodeLabelSet for VerdictLabels {
    fn encode(&self, encoder: &mut LabelSetEncoder<'_>) -> Result<(), std::fmt::Error> {
        ("verdict", self.verdict).encode(encoder.encode_label())?;
        Ok(())
    }
}

/// Labels for reviews rejected before a verdict
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct RejectionLabels {
    pub reason: &'static str,
}

impl EncodeLabelSet for RejectionLabels {
    fn encode(&self, encoder: &mut LabelSetEncoder<'_>) -> Result<(), std::fmt::Error> {
        ("reason", self.reason).encode(encoder.encode_label())?;
        Ok(())
    }
}

/// Shared metrics for the webhook
pub struct Metrics {
    /// Decided reviews by verdict
    pub reviews_total: Family<VerdictLabels, Counter>,
    /// Reviews rejected before evaluation, by error
    pub rejected_total: Family<RejectionLabels, Counter>,
    /// Time from receiving the request to having a response envelope
    pub review_duration_seconds: Histogram,
    registry: Registry,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let reviews_total = Family::<VerdictLabels, Counter>::default();
        registry.register(
            "eviction_webhook_admission_reviews",
            "Total number of admission reviews decided",
            reviews_total.clone(),
        );

        let rejected_total = Family::<RejectionLabels, Counter>::default();
        registry.register(
            "eviction_webhook_rejected_reviews",
            "Total number of admission reviews rejected before evaluation",
            rejected_total.clone(),
        );

        let review_duration_seconds = Histogram::new(exponential_buckets(0.0001, 2.0, 15));
        registry.register(
            "eviction_webhook_review_duration_seconds",
            "Duration of admission review handling in seconds",
            review_duration_seconds.clone(),
        );

        Self {
            reviews_total,
            rejected_total,
            review_duration_seconds,
            registry,
        }
    }

    /// Record a decided review
    pub fn record_review(&self, allowed: bool, duration_secs: f64) {
        let labels = VerdictLabels {
            verdict: if allowed { "allow" } else { "deny" },
        };
        self.reviews_total.get_or_create(&labels).inc();
        self.review_duration_seconds.observe(duration_secs);
    }

    /// Record a review rejected by the codec
    pub fn record_rejection(&self, reason: &'static str) {
        self.rejected_total
            .get_or_create(&RejectionLabels { reason })
            .inc();
    }

    /// Encode metrics to Prometheus text format
    pub fn encode(&self) -> String {
        let mut buffer = String::new();
        if encode(&mut buffer, &self.registry).is_err() {
            tracing::error!("Failed to encode metrics");
            return "# Error encoding metrics".to_string();
        }
        buffer
    }
}

async fn metrics_handler(State(metrics): State<Arc<Metrics>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        metrics.encode(),
    )
}

/// Create the metrics router
pub fn create_metrics_router(metrics: Arc<Metrics>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metrics)
}

/// Run the metrics server on `0.0.0.0:<port>`.
pub async fn run_metrics_server(metrics: Arc<Metrics>, port: u16) -> Result<(), std::io::Error> {
    let app = create_metrics_router(metrics);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    info!(port, "Starting metrics server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

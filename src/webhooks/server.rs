//! Admission webhook server.
//!
//! Serves two endpoints on a TLS listener:
//! - `GET /healthz` - liveness, always 200 with an empty body
//! - `POST /` - admission decisions
//!
//! Every other path or method answers 404. The server refuses to start
//! without a usable certificate and key; there is no plaintext mode.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    Router,
    body::{Body, Bytes},
    extract::{Request, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use axum_server::Handle;
use axum_server::tls_rustls::RustlsConfig;
use tracing::{debug, error, info, warn};

use super::audit::{AuditSink, TracingAuditSink};
use super::error::{ReviewError, WebhookError};
use super::policies::{PolicySet, Verdict};
use super::response::build_response;
use super::review::{AdmissionReview, JSON_MEDIA_TYPE, check_content_type};
use crate::config::{DEFAULT_MAX_BODY_BYTES, WebhookConfig};
use crate::metrics::Metrics;

/// Liveness probe path
pub const HEALTHZ_PATH: &str = "/healthz";
/// Decision endpoint path
pub const REVIEW_PATH: &str = "/";

/// Shared state for webhook handlers, built once at startup
pub struct WebhookState {
    pub policies: PolicySet,
    pub audit: Arc<dyn AuditSink>,
    pub metrics: Arc<Metrics>,
    pub max_body_bytes: usize,
}

impl std::fmt::Debug for WebhookState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookState")
            .field("policies", &self.policies)
            .field("max_body_bytes", &self.max_body_bytes)
            .finish_non_exhaustive()
    }
}

impl WebhookState {
    pub fn new(policies: PolicySet, metrics: Arc<Metrics>) -> Self {
        Self {
            policies,
            audit: Arc::new(TracingAuditSink),
            metrics,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    /// Build the state for a configured server: policies from the configured
    /// file (or the built-in rule) and the configured body limit.
    pub fn from_config(
        config: &WebhookConfig,
        metrics: Arc<Metrics>,
    ) -> Result<Self, WebhookError> {
        let policies = config.load_policies()?;
        Ok(Self::new(policies, metrics).with_max_body_bytes(config.max_body_bytes))
    }

    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }
}

/// Create the webhook router
pub fn create_webhook_router(state: Arc<WebhookState>) -> Router {
    Router::new()
        .route(REVIEW_PATH, post(review).fallback(not_found))
        .route(HEALTHZ_PATH, get(healthz).fallback(not_found))
        .fallback(not_found)
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "404 page not found\n")
}

/// Decision endpoint handler
async fn review(State(state): State<Arc<WebhookState>>, request: Request) -> Response {
    let started = Instant::now();

    match decide(&state, request).await {
        Ok((review, allowed)) => {
            state
                .metrics
                .record_review(allowed, started.elapsed().as_secs_f64());
            write_review(&review)
        }
        Err(e) => {
            warn!(error = %e, status = %e.status_code(), "Rejected admission review");
            state.metrics.record_rejection(e.metric_label());
            e.into_response()
        }
    }
}

/// Decode, audit, evaluate and assemble. Returns the outbound envelope and
/// whether the request was allowed.
async fn decide(
    state: &WebhookState,
    request: Request,
) -> Result<(AdmissionReview, bool), ReviewError> {
    check_content_type(request.headers())?;

    let body = axum::body::to_bytes(request.into_body(), state.max_body_bytes)
        .await
        .map_err(|e| ReviewError::MalformedBody(e.to_string()))?;

    let review = AdmissionReview::decode(&body)?;
    state.audit.record(&review);

    let admission = review.request().ok_or(ReviewError::MissingRequest)?;
    debug!(
        uid = %admission.uid,
        name = %admission.name,
        namespace = %admission.namespace,
        operation = ?admission.operation,
        "Processing admission request"
    );

    let evaluation = state.policies.evaluate(admission);
    let response = build_response(admission, evaluation.verdict);
    let rule = evaluation.rule.unwrap_or("default");

    match evaluation.verdict {
        Verdict::Allow => info!(
            uid = %admission.uid,
            name = %admission.name,
            namespace = %admission.namespace,
            rule,
            "Admission request allowed"
        ),
        Verdict::Deny(denial) => warn!(
            uid = %admission.uid,
            name = %admission.name,
            namespace = %admission.namespace,
            rule,
            reason = %denial.reason,
            code = denial.code,
            "Admission request denied"
        ),
    }

    let allowed = response.allowed;
    Ok((review.respond(response), allowed))
}

/// Encode the outbound envelope. If encoding fails there is no well-formed
/// answer left to give, so the body stream errors and the connection is
/// dropped.
fn write_review(review: &AdmissionReview) -> Response {
    match review.encode() {
        Ok(bytes) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, JSON_MEDIA_TYPE)],
            bytes,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode admission review, dropping connection");
            abort_response(e)
        }
    }
}

fn abort_response(err: serde_json::Error) -> Response {
    let failed = futures::stream::once(async move { Err::<Bytes, _>(std::io::Error::other(err)) });
    let mut response = Response::new(Body::from_stream(failed));
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(JSON_MEDIA_TYPE),
    );
    response
}

/// Run the webhook server with TLS
///
/// Binds to `0.0.0.0:<port>` and serves until `handle` requests shutdown.
/// Fails before binding when the certificate or key cannot be loaded.
pub async fn run_webhook_server(
    config: &WebhookConfig,
    state: Arc<WebhookState>,
    handle: Handle,
) -> Result<(), WebhookError> {
    let app = create_webhook_router(state);

    let tls = RustlsConfig::from_pem_file(&config.cert_path, &config.key_path)
        .await
        .map_err(|e| {
            WebhookError::TlsConfig(format!(
                "{} / {}: {}",
                config.cert_path.display(),
                config.key_path.display(),
                e
            ))
        })?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!(port = config.port, "Webhook server listening with TLS");

    axum_server::bind_rustls(addr, tls)
        .handle(handle)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}

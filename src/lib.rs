//! eviction-webhook library crate
//!
//! A Kubernetes validating admission webhook that refuses evictions of
//! protected pods. This module exports the webhook server, the policy engine
//! and the configuration loader.

pub mod config;
pub mod metrics;
pub mod webhooks;

pub use config::WebhookConfig;
pub use metrics::Metrics;
pub use webhooks::{WebhookError, WebhookState, create_webhook_router, run_webhook_server};

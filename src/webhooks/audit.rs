//! Audit logging of decoded reviews.
//!
//! Every decoded review is recorded before it is evaluated. Recording is best
//! effort and never affects the verdict or the HTTP response.

use tracing::{info, warn};

use super::review::AdmissionReview;

/// Log target used for audit records
pub const AUDIT_TARGET: &str = "audit";

/// Receives each decoded review before evaluation.
pub trait AuditSink: Send + Sync {
    fn record(&self, review: &AdmissionReview);
}

/// Writes the review as indented JSON through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, review: &AdmissionReview) {
        let uid = review.request().map(|r| r.uid.as_str()).unwrap_or_default();
        match review.to_pretty_json() {
            Ok(rendered) => info!(target: AUDIT_TARGET, uid = %uid, "{}", rendered),
            Err(e) => warn!(uid = %uid, error = %e, "Failed to render admission review for audit"),
        }
    }
}

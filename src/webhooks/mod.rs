//! Admission webhook for pod evictions.
//!
//! Request flow: the TLS listener accepts a review, the codec decodes it, the
//! audit sink records it, the policy set decides, and the assembler builds
//! the response envelope that the codec writes back.

pub mod audit;
pub mod error;
pub mod policies;
pub mod response;
pub mod review;
mod server;

pub use audit::{AuditSink, TracingAuditSink};
pub use error::{ReviewError, WebhookError};
pub use policies::{Denial, DenialCause, Evaluation, PolicyRule, PolicySet, RuleMatch, Verdict};
pub use response::build_response;
pub use review::{
    AdmissionRequest, AdmissionResponse, AdmissionReview, JSON_MEDIA_TYPE, ReviewPayload,
};
pub use server::{
    HEALTHZ_PATH, REVIEW_PATH, WebhookState, create_webhook_router, run_webhook_server,
};

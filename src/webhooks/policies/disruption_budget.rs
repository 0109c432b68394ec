//! Disruption budget protection for server pods.
//!
//! Evictions of pods whose name starts with `server-` are refused with a
//! `TooManyRequests` status, the same answer the API server gives when an
//! eviction would violate a PodDisruptionBudget. The budget figures in the
//! cause are a fixed template, not observed state.

use super::{Denial, DenialCause, PolicyRule, RuleMatch, Verdict};

pub const RULE_NAME: &str = "server-disruption-budget";

/// Pods protected by the shipped rule
pub const SERVER_NAME_PREFIX: &str = "server-";

pub const REASON_TOO_MANY_REQUESTS: &str = "TooManyRequests";

pub const CODE_TOO_MANY_REQUESTS: u16 = 429;

pub const DENY_MESSAGE: &str = "Cannot evict pod as it would violate the pod's disruption budget.";

pub const CAUSE_TYPE: &str = "DisruptionBudget";

pub const CAUSE_MESSAGE: &str =
    "The disruption budget server needs 1 healthy pods and has 1 currently";

/// Denial returned for protected pods.
pub fn denial() -> Denial {
    Denial {
        reason: REASON_TOO_MANY_REQUESTS.to_string(),
        message: DENY_MESSAGE.to_string(),
        code: CODE_TOO_MANY_REQUESTS,
        causes: vec![DenialCause {
            cause_type: CAUSE_TYPE.to_string(),
            message: CAUSE_MESSAGE.to_string(),
        }],
    }
}

/// The rule shipped when no policy file is configured.
pub fn server_pod_rule() -> PolicyRule {
    PolicyRule {
        name: RULE_NAME.to_string(),
        matcher: RuleMatch::name_prefix(SERVER_NAME_PREFIX),
        verdict: Verdict::Deny(denial()),
    }
}

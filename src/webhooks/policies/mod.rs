//! Admission policies for eviction requests.
//!
//! A [`PolicySet`] is an ordered list of rules. Rules are tried in order and
//! the first one whose matcher accepts the request decides the verdict. When
//! no rule matches the request is allowed.
//!
//! The set is built once at startup and shared read-only between requests.

pub mod disruption_budget;

use std::fmt;

use kube::core::admission::Operation;

use super::review::AdmissionRequest;

/// One structured explanation attached to a denial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DenialCause {
    /// Category tag, e.g. `DisruptionBudget`
    pub cause_type: String,
    pub message: String,
}

/// Detail returned to the caller when a rule denies a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denial {
    /// Machine-readable category (`metav1.StatusReason`)
    pub reason: String,
    /// Human-readable explanation
    pub message: String,
    /// HTTP-style status code reported inside the admission response
    pub code: u16,
    pub causes: Vec<DenialCause>,
}

/// Outcome of evaluating a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Deny(Denial),
}

impl Verdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Verdict::Allow)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Allow => write!(f, "Allow"),
            Verdict::Deny(_) => write!(f, "Deny"),
        }
    }
}

static DEFAULT_VERDICT: Verdict = Verdict::Allow;

/// Match predicate of a rule.
///
/// The name prefix is compared exactly and case-sensitively. Namespace and
/// operation constraints are optional; an empty operation list matches any
/// operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleMatch {
    pub name_prefix: String,
    pub namespace: Option<String>,
    pub operations: Vec<Operation>,
}

impl RuleMatch {
    pub fn name_prefix(prefix: impl Into<String>) -> Self {
        Self {
            name_prefix: prefix.into(),
            ..Default::default()
        }
    }

    pub fn matches(&self, request: &AdmissionRequest) -> bool {
        if !request.name.starts_with(&self.name_prefix) {
            return false;
        }

        if let Some(namespace) = &self.namespace {
            if *namespace != request.namespace {
                return false;
            }
        }

        if self.operations.is_empty() {
            return true;
        }
        request
            .operation
            .as_ref()
            .is_some_and(|op| self.operations.contains(op))
    }
}

/// A named (matcher, verdict) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyRule {
    pub name: String,
    pub matcher: RuleMatch,
    pub verdict: Verdict,
}

/// Result of running a request through the policy set.
#[derive(Debug, Clone, Copy)]
pub struct Evaluation<'a> {
    pub verdict: &'a Verdict,
    /// Name of the rule that decided, `None` when the default applied
    pub rule: Option<&'a str>,
}

/// Ordered, immutable rule list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicySet {
    rules: Vec<PolicyRule>,
}

impl Default for PolicySet {
    /// The shipped policy: protect `server-` pods from eviction.
    fn default() -> Self {
        Self::new(vec![disruption_budget::server_pod_rule()])
    }
}

impl PolicySet {
    pub fn new(rules: Vec<PolicyRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[PolicyRule] {
        &self.rules
    }

    /// Evaluate a request. First matching rule wins; no match allows.
    pub fn evaluate<'a>(&'a self, request: &AdmissionRequest) -> Evaluation<'a> {
        self.rules
            .iter()
            .find(|rule| rule.matcher.matches(request))
            .map(|rule| Evaluation {
                verdict: &rule.verdict,
                rule: Some(rule.name.as_str()),
            })
            .unwrap_or(Evaluation {
                verdict: &DEFAULT_VERDICT,
                rule: None,
            })
    }
}

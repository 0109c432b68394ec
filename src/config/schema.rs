//! Policy file schema (strict parsing).
//!
//! ```yaml
//! version: 1
//! rules:
//!   - name: server-disruption-budget
//!     match:
//!       namePrefix: "server-"
//!     action: deny
//!     deny:
//!       reason: TooManyRequests
//!       message: "Cannot evict pod as it would violate the pod's disruption budget."
//!       code: 429
//!       causes:
//!         - type: DisruptionBudget
//!           message: "The disruption budget server needs 1 healthy pods and has 1 currently"
//! ```

use kube::core::admission::Operation;
use serde::Deserialize;

use super::ConfigError;
use crate::webhooks::policies::{Denial, DenialCause, PolicyRule, PolicySet, RuleMatch, Verdict};

pub const POLICY_FILE_VERSION: u32 = 1;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyFile {
    pub version: u32,
    pub rules: Vec<RuleSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSpec {
    pub name: String,
    #[serde(rename = "match")]
    pub matcher: MatchSpec,
    pub action: RuleAction,
    #[serde(default)]
    pub deny: Option<DenySpec>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct MatchSpec {
    pub name_prefix: String,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub operations: Vec<Operation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Allow,
    Deny,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DenySpec {
    pub reason: String,
    pub message: String,
    pub code: u16,
    #[serde(default)]
    pub causes: Vec<CauseSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CauseSpec {
    #[serde(rename = "type")]
    pub cause_type: String,
    #[serde(default)]
    pub message: String,
}

impl PolicyFile {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != POLICY_FILE_VERSION {
            return Err(ConfigError::UnsupportedVersion(self.version));
        }
        for (idx, rule) in self.rules.iter().enumerate() {
            rule.validate()
                .map_err(|msg| ConfigError::InvalidPolicy(format!("rules[{idx}]: {msg}")))?;
        }
        Ok(())
    }

    /// Compile the validated file into the runtime rule set.
    pub fn into_policy_set(self) -> Result<PolicySet, ConfigError> {
        self.validate()?;
        let rules = self
            .rules
            .into_iter()
            .map(RuleSpec::into_rule)
            .collect();
        Ok(PolicySet::new(rules))
    }
}

impl RuleSpec {
    fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name must not be empty".into());
        }
        if self.matcher.name_prefix.is_empty() {
            return Err(format!("rule {}: match.namePrefix must not be empty", self.name));
        }
        match (self.action, &self.deny) {
            (RuleAction::Deny, None) => {
                Err(format!("rule {}: action deny requires a deny section", self.name))
            }
            (RuleAction::Allow, Some(_)) => {
                Err(format!("rule {}: action allow must not carry a deny section", self.name))
            }
            (RuleAction::Deny, Some(deny)) => {
                if !(400..=599).contains(&deny.code) {
                    return Err(format!(
                        "rule {}: deny.code must be between 400 and 599 (got {})",
                        self.name, deny.code
                    ));
                }
                if deny.reason.is_empty() {
                    return Err(format!("rule {}: deny.reason must not be empty", self.name));
                }
                Ok(())
            }
            (RuleAction::Allow, None) => Ok(()),
        }
    }

    fn into_rule(self) -> PolicyRule {
        let verdict = match self.deny {
            Some(deny) => Verdict::Deny(Denial {
                reason: deny.reason,
                message: deny.message,
                code: deny.code,
                causes: deny
                    .causes
                    .into_iter()
                    .map(|c| DenialCause {
                        cause_type: c.cause_type,
                        message: c.message,
                    })
                    .collect(),
            }),
            None => Verdict::Allow,
        };

        PolicyRule {
            name: self.name,
            matcher: RuleMatch {
                name_prefix: self.matcher.name_prefix,
                namespace: self.matcher.namespace,
                operations: self.matcher.operations,
            },
            verdict,
        }
    }
}

// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]

//! Unit tests for eviction-webhook.
//!
//! These tests exercise the public API of individual components in
//! isolation: policy file parsing, rule evaluation and response assembly.

mod policy_file_tests {
    use eviction_webhook::config::{self, ConfigError};
    use eviction_webhook::webhooks::{PolicySet, Verdict};
    use kube::core::admission::Operation;

    #[test]
    fn test_builtin_rule_as_yaml_matches_default() {
        let yaml = r#"
version: 1
rules:
  - name: server-disruption-budget
    match:
      namePrefix: "server-"
    action: deny
    deny:
      reason: TooManyRequests
      message: "Cannot evict pod as it would violate the pod's disruption budget."
      code: 429
      causes:
        - type: DisruptionBudget
          message: "The disruption budget server needs 1 healthy pods and has 1 currently"
"#;
        let set = config::load_policies_from_str(yaml).unwrap();
        assert_eq!(set, PolicySet::default());
    }

    #[test]
    fn test_shipped_policy_file_matches_default() {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("deploy/policy.yaml");
        let set = config::load_policy_file(&path).unwrap();
        assert_eq!(set, PolicySet::default());
    }

    #[test]
    fn test_operations_parse() {
        let yaml = r#"
version: 1
rules:
  - name: creates-only
    match:
      namePrefix: "web-"
      operations: [CREATE, DELETE]
    action: allow
"#;
        let set = config::load_policies_from_str(yaml).unwrap();
        let rule = &set.rules()[0];
        assert_eq!(rule.matcher.operations, vec![Operation::Create, Operation::Delete]);
        assert_eq!(rule.verdict, Verdict::Allow);
    }

    #[test]
    fn test_empty_rule_list_allowed() {
        let set = config::load_policies_from_str("version: 1\nrules: []\n").unwrap();
        assert!(set.rules().is_empty());
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let yaml = r#"
version: 1
rules:
  - name: typo
    match:
      namePrefx: "server-" # typo should fail
    action: allow
"#;
        let err = config::load_policies_from_str(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidYaml(_)));
    }

    #[test]
    fn test_unsupported_version() {
        let err = config::load_policies_from_str("version: 2\nrules: []\n").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedVersion(2)));
    }

    #[test]
    fn test_deny_requires_detail() {
        let yaml = r#"
version: 1
rules:
  - name: no-detail
    match:
      namePrefix: "server-"
    action: deny
"#;
        let err = config::load_policies_from_str(yaml).unwrap_err();
        match err {
            ConfigError::InvalidPolicy(msg) => assert!(msg.contains("rules[0]")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_allow_rejects_detail() {
        let yaml = r#"
version: 1
rules:
  - name: confused
    match:
      namePrefix: "server-"
    action: allow
    deny:
      reason: Forbidden
      message: "no"
      code: 403
"#;
        assert!(matches!(
            config::load_policies_from_str(yaml),
            Err(ConfigError::InvalidPolicy(_))
        ));
    }

    #[test]
    fn test_deny_code_range() {
        let yaml = r#"
version: 1
rules:
  - name: bad-code
    match:
      namePrefix: "server-"
    action: deny
    deny:
      reason: TooManyRequests
      message: "no"
      code: 200
"#;
        assert!(matches!(
            config::load_policies_from_str(yaml),
            Err(ConfigError::InvalidPolicy(_))
        ));
    }

    #[test]
    fn test_empty_prefix_rejected() {
        let yaml = r#"
version: 1
rules:
  - name: everything
    match:
      namePrefix: ""
    action: allow
"#;
        assert!(matches!(
            config::load_policies_from_str(yaml),
            Err(ConfigError::InvalidPolicy(_))
        ));
    }
}

mod evaluation_tests {
    use eviction_webhook::webhooks::policies::disruption_budget;
    use eviction_webhook::webhooks::{AdmissionRequest, PolicySet, build_response};

    fn request(name: &str, uid: &str) -> AdmissionRequest {
        AdmissionRequest {
            uid: uid.to_string(),
            name: name.to_string(),
            namespace: "default".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_server_prefix_denied() {
        let set = PolicySet::default();
        let req = request("server-1", "abc");
        let eval = set.evaluate(&req);
        assert_eq!(eval.rule, Some(disruption_budget::RULE_NAME));

        let response = build_response(&req, eval.verdict);
        assert_eq!(response.uid, "abc");
        assert!(!response.allowed);
        let status = response.status.unwrap();
        assert_eq!(status.code, 429);
        assert_eq!(status.reason, "TooManyRequests");
        let causes = status.details.unwrap().causes;
        assert_eq!(causes.len(), 1);
        assert_eq!(causes[0].reason, "DisruptionBudget");
    }

    #[test]
    fn test_prefix_is_case_sensitive() {
        let set = PolicySet::default();
        let req = request("SERVER-1", "u");
        assert!(set.evaluate(&req).verdict.is_allowed());
    }

    #[test]
    fn test_namespace_not_considered_by_builtin_rule() {
        let set = PolicySet::default();
        for ns in ["default", "kube-system", ""] {
            let req = AdmissionRequest {
                namespace: ns.to_string(),
                ..request("server-9", "u")
            };
            assert!(!set.evaluate(&req).verdict.is_allowed());
        }
    }
}

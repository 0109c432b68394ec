//! Allow/deny decisions through the full request path.

use std::sync::Arc;

use axum::http::{StatusCode, header};
use eviction_webhook::config;
use eviction_webhook::webhooks::PolicySet;
use serde_json::json;
use tower::ServiceExt;

use crate::common::fixtures::{
    MemoryAuditSink, ReviewBuilder, body_json, post_json, test_router, test_router_with,
};

#[tokio::test]
async fn test_server_pod_eviction_denied() {
    let body = ReviewBuilder::new("server-1")
        .namespace("default")
        .uid("abc")
        .eviction()
        .body();

    let response = test_router().oneshot(post_json(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json"
    );

    let review = body_json(response).await;
    assert_eq!(review["apiVersion"], "admission.k8s.io/v1");
    assert_eq!(review["kind"], "AdmissionReview");
    assert!(review.get("request").is_none());

    let resp = &review["response"];
    assert_eq!(resp["uid"], "abc");
    assert_eq!(resp["allowed"], false);
    assert_eq!(resp["status"]["status"], "Failure");
    assert_eq!(resp["status"]["code"], 429);
    assert_eq!(resp["status"]["reason"], "TooManyRequests");
    assert_eq!(
        resp["status"]["message"],
        "Cannot evict pod as it would violate the pod's disruption budget."
    );
    assert_eq!(
        resp["status"]["details"]["causes"],
        json!([{
            "reason": "DisruptionBudget",
            "message": "The disruption budget server needs 1 healthy pods and has 1 currently"
        }])
    );
}

#[tokio::test]
async fn test_client_pod_eviction_allowed() {
    let body = ReviewBuilder::new("client-1").uid("xyz").body();

    let response = test_router().oneshot(post_json(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let review = body_json(response).await;
    assert!(review.get("request").is_none());
    assert_eq!(review["response"], json!({"uid": "xyz", "allowed": true}));
}

#[tokio::test]
async fn test_empty_uid_is_echoed() {
    let body = ReviewBuilder::new("server-7").uid("").body();
    let review = body_json(test_router().oneshot(post_json(body)).await.unwrap()).await;
    assert_eq!(review["response"]["uid"], "");
    assert_eq!(review["response"]["allowed"], false);
}

#[tokio::test]
async fn test_v1beta1_answered_in_v1beta1() {
    let body = ReviewBuilder::new("client-1")
        .api_version("admission.k8s.io/v1beta1")
        .uid("beta")
        .body();
    let review = body_json(test_router().oneshot(post_json(body)).await.unwrap()).await;
    assert_eq!(review["apiVersion"], "admission.k8s.io/v1beta1");
    assert_eq!(review["response"]["uid"], "beta");
}

#[tokio::test]
async fn test_review_is_audited() {
    let audit = Arc::new(MemoryAuditSink::default());
    let router = test_router_with(PolicySet::default(), audit.clone());

    let body = ReviewBuilder::new("server-2")
        .namespace("prod")
        .uid("audit-me")
        .eviction()
        .body();
    let response = router.oneshot(post_json(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let records = audit.records();
    assert_eq!(records.len(), 1);
    assert!(records[0].contains("\"uid\": \"audit-me\""));
    assert!(records[0].contains("\"subResource\": \"eviction\""));
}

#[tokio::test]
async fn test_configured_policies_replace_builtin_rule() {
    let policies = config::load_policies_from_str(
        r#"
version: 1
rules:
  - name: exempt-canary
    match:
      namePrefix: "server-canary"
    action: allow
  - name: protect-db
    match:
      namePrefix: "db-"
      namespace: prod
    action: deny
    deny:
      reason: Forbidden
      message: "database pods are not evictable"
      code: 403
"#,
    )
    .unwrap();
    let audit = Arc::new(MemoryAuditSink::default());

    // server- pods are no longer protected by the built-in rule
    let body = ReviewBuilder::new("server-1").uid("1").body();
    let review = body_json(
        test_router_with(policies.clone(), audit.clone())
            .oneshot(post_json(body))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(review["response"]["allowed"], true);

    let body = ReviewBuilder::new("db-0").namespace("prod").uid("2").body();
    let review = body_json(
        test_router_with(policies.clone(), audit.clone())
            .oneshot(post_json(body))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(review["response"]["allowed"], false);
    assert_eq!(review["response"]["status"]["code"], 403);
    assert!(review["response"]["status"].get("details").is_none());

    let body = ReviewBuilder::new("db-0").namespace("staging").uid("3").body();
    let review = body_json(
        test_router_with(policies, audit)
            .oneshot(post_json(body))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(review["response"]["allowed"], true);
}

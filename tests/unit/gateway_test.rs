//! Unit tests for the inference gateway

#[path = "../common/mod.rs"]
mod common;

use common::*;
use prompt_sherlock::{
    inference::{
        classifier::ClassificationRule, FailureCategory, InferenceErrorClassifier,
        InferenceGateway, ProbeStatus, SubstringClassifier,
    },
    AppError,
};
use std::sync::Arc;
use std::time::Duration;

async fn category_for(message: &str) -> FailureCategory {
    let gateway = InferenceGateway::new(MockBackend::failing(message));
    match gateway.analyze("describe".to_string(), Vec::new()).await {
        Err(AppError::Inference { category, .. }) => category,
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test]
async fn test_upstream_messages_are_classified() {
    let cases = [
        ("API key not valid. Please pass a valid API key.", FailureCategory::ServiceUnavailable),
        ("Request had invalid authentication credentials", FailureCategory::ServiceUnavailable),
        ("Quota exceeded for quota metric", FailureCategory::RateLimited),
        ("Response was blocked due to SAFETY", FailureCategory::ContentBlocked),
        ("Request payload file size exceeds the limit", FailureCategory::RateLimited),
        ("Image is too large", FailureCategory::PayloadTooLarge),
        ("Internal error encountered.", FailureCategory::Failed),
    ];

    for (message, expected) in cases {
        assert_eq!(category_for(message).await, expected, "message: {}", message);
    }
}

#[tokio::test]
async fn test_upstream_message_is_kept_for_logs() {
    let gateway = InferenceGateway::new(MockBackend::failing("Deadline exceeded"));
    let err = gateway
        .analyze("describe".to_string(), Vec::new())
        .await
        .unwrap_err();

    assert!(err.to_string().contains("Deadline exceeded"));
    assert!(!err.details().contains("Deadline exceeded"));
}

struct EverythingBlocked;

impl InferenceErrorClassifier for EverythingBlocked {
    fn classify(&self, _message: &str) -> FailureCategory {
        FailureCategory::ContentBlocked
    }
}

#[tokio::test]
async fn test_custom_classifier_is_used() {
    let gateway = InferenceGateway::with_classifier(
        MockBackend::failing("quota exceeded"),
        Arc::new(EverythingBlocked),
    );

    let err = gateway
        .analyze("describe".to_string(), Vec::new())
        .await
        .unwrap_err();
    assert_eq!(err.code().as_str(), "CONTENT_BLOCKED");
}

#[tokio::test]
async fn test_custom_rule_order() {
    let classifier = SubstringClassifier::with_rules(vec![
        ClassificationRule::new(FailureCategory::PayloadTooLarge, &["file size"]),
        ClassificationRule::new(FailureCategory::RateLimited, &["limit"]),
    ]);
    let gateway = InferenceGateway::with_classifier(
        MockBackend::failing("file size over the limit"),
        Arc::new(classifier),
    );

    let err = gateway
        .analyze("describe".to_string(), Vec::new())
        .await
        .unwrap_err();
    assert_eq!(err.code().as_str(), "FILE_SIZE_ERROR");
}

#[tokio::test]
async fn test_probe_available() {
    let gateway = InferenceGateway::new(MockBackend::text("OK"));
    assert_eq!(gateway.probe().await, ProbeStatus::Available);
}

#[tokio::test]
async fn test_probe_limited_without_acknowledgement() {
    let gateway = InferenceGateway::new(MockBackend::text("Hello there"));
    assert_eq!(gateway.probe().await, ProbeStatus::Limited);
}

#[tokio::test]
async fn test_probe_unavailable_on_error() {
    let gateway = InferenceGateway::new(MockBackend::failing("API key not valid"));
    assert_eq!(gateway.probe().await, ProbeStatus::Unavailable);
}

#[tokio::test]
async fn test_probe_unavailable_on_timeout() {
    let gateway = InferenceGateway::new(MockBackend::new(Reply::Sleep(Duration::from_secs(5))))
        .with_probe_timeout(Duration::from_millis(50));
    assert_eq!(gateway.probe().await, ProbeStatus::Unavailable);
}

#[tokio::test]
async fn test_probe_sends_text_only() {
    let backend = MockBackend::text("OK");
    let gateway = InferenceGateway::new(backend.clone());
    gateway.probe().await;

    let sent = backend.last_request().unwrap();
    assert!(sent.images.is_empty());
    assert!(sent.instruction.contains("OK"));
}

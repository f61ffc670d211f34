//! Mapping of opaque upstream failures onto the service's failure categories
//!
//! The inference service does not version its error messages, so the default
//! classifier matches substrings. Rules are checked in order and the first hit
//! wins; a changed upstream message falls through to [`FailureCategory::Failed`].

use serde::Serialize;
use std::fmt;

/// User-facing category of an inference failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    ServiceUnavailable,
    RateLimited,
    ContentBlocked,
    PayloadTooLarge,
    Failed,
}

impl FailureCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ServiceUnavailable => "service_unavailable",
            Self::RateLimited => "rate_limited",
            Self::ContentBlocked => "content_blocked",
            Self::PayloadTooLarge => "payload_too_large",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies an upstream error message
pub trait InferenceErrorClassifier: Send + Sync {
    fn classify(&self, message: &str) -> FailureCategory;
}

/// A single ordered matching rule
#[derive(Debug, Clone)]
pub struct ClassificationRule {
    pub category: FailureCategory,
    pub needles: Vec<String>,
}

impl ClassificationRule {
    pub fn new(category: FailureCategory, needles: &[&str]) -> Self {
        Self {
            category,
            needles: needles.iter().map(|n| n.to_lowercase()).collect(),
        }
    }

    fn matches(&self, haystack: &str) -> bool {
        self.needles.iter().any(|needle| haystack.contains(needle.as_str()))
    }
}

/// Case-insensitive substring classifier
#[derive(Debug, Clone)]
pub struct SubstringClassifier {
    rules: Vec<ClassificationRule>,
}

impl SubstringClassifier {
    pub fn with_rules(rules: Vec<ClassificationRule>) -> Self {
        Self { rules }
    }
}

impl Default for SubstringClassifier {
    fn default() -> Self {
        Self::with_rules(vec![
            ClassificationRule::new(FailureCategory::ServiceUnavailable, &["api key", "auth"]),
            ClassificationRule::new(FailureCategory::RateLimited, &["quota", "limit"]),
            ClassificationRule::new(FailureCategory::ContentBlocked, &["safety", "blocked"]),
            ClassificationRule::new(FailureCategory::PayloadTooLarge, &["file size", "too large"]),
        ])
    }
}

impl InferenceErrorClassifier for SubstringClassifier {
    fn classify(&self, message: &str) -> FailureCategory {
        let haystack = message.to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.matches(&haystack))
            .map(|rule| rule.category)
            .unwrap_or(FailureCategory::Failed)
    }
}

//! Quality gate for inference output

use tracing::warn;

use crate::error::{AppError, Result};
use crate::pipeline::AnalysisObserver;

/// Lowercase phrases that hint at a refusal or an error message disguised as an answer
pub const SUSPICIOUS_PHRASES: &[&str] = &[
    "i cannot",
    "i am unable",
    "i can't",
    "error",
    "failed",
    "invalid",
    "safety",
    "blocked",
    "restricted",
];

#[derive(Debug, Clone)]
pub struct ResultValidator {
    min_length: usize,
    scan_window: usize,
}

impl ResultValidator {
    pub fn new(min_length: usize, scan_window: usize) -> Self {
        Self {
            min_length,
            scan_window,
        }
    }

    /// Return the trimmed text, or reject it if it is empty or too short.
    ///
    /// Suspicious phrasing near the start is reported to `observer` but never rejects.
    pub fn validate(
        &self,
        request_id: &str,
        text: &str,
        observer: &dyn AnalysisObserver,
    ) -> Result<String> {
        let trimmed = text.trim();

        if trimmed.is_empty() {
            return Err(AppError::InvalidAnalysis("analysis result is empty".to_string()));
        }

        let length = trimmed.chars().count();
        if length < self.min_length {
            return Err(AppError::InvalidAnalysis(format!(
                "analysis result too short: {} characters, need {}",
                length, self.min_length
            )));
        }

        if let Some(phrase) = self.scan(trimmed) {
            warn!(phrase = %phrase, "Potential issue in analysis result");
            observer.suspicious_phrase(request_id, phrase);
        }

        Ok(trimmed.to_string())
    }

    /// First suspicious phrase within the scan window, if any
    pub fn scan(&self, text: &str) -> Option<&'static str> {
        let head: String = text.chars().take(self.scan_window).collect::<String>().to_lowercase();
        SUSPICIOUS_PHRASES
            .iter()
            .copied()
            .find(|phrase| head.contains(phrase))
    }
}

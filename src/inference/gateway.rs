//! Inference gateway: the single boundary to the external inference service

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{AppError, Result};
use crate::inference::classifier::{InferenceErrorClassifier, SubstringClassifier};
use crate::inference::traits::{EncodedImagePart, InferenceBackend, InferenceRequest};

const PROBE_INSTRUCTION: &str = "Test connection - respond with \"OK\"";
const PROBE_ACKNOWLEDGEMENT: &str = "OK";

/// Result of a live connectivity probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    /// Responded with the expected acknowledgement
    Available,
    /// Responded, but without the acknowledgement
    Limited,
    Unavailable,
}

/// Calls the backend and classifies its failures
pub struct InferenceGateway {
    backend: Arc<dyn InferenceBackend>,
    classifier: Arc<dyn InferenceErrorClassifier>,
    probe_timeout: Duration,
}

impl InferenceGateway {
    pub fn new(backend: Arc<dyn InferenceBackend>) -> Self {
        Self::with_classifier(backend, Arc::new(SubstringClassifier::default()))
    }

    pub fn with_classifier(
        backend: Arc<dyn InferenceBackend>,
        classifier: Arc<dyn InferenceErrorClassifier>,
    ) -> Self {
        Self {
            backend,
            classifier,
            probe_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn model(&self) -> &str {
        self.backend.model()
    }

    /// Send the instruction and images as one request and return the raw text
    pub async fn analyze(
        &self,
        instruction: String,
        images: Vec<EncodedImagePart>,
    ) -> Result<String> {
        let request = InferenceRequest {
            instruction,
            images,
        };

        self.backend.generate(request).await.map_err(|e| {
            let message = e.to_string();
            let category = self.classifier.classify(&message);
            warn!(
                model = %self.backend.model(),
                category = %category,
                error = %message,
                "Inference request failed"
            );
            AppError::Inference { category, message }
        })
    }

    /// Ask the backend for a trivial acknowledgement
    pub async fn probe(&self) -> ProbeStatus {
        let request = InferenceRequest::text(PROBE_INSTRUCTION);

        match tokio::time::timeout(self.probe_timeout, self.backend.generate(request)).await {
            Ok(Ok(text)) if text.contains(PROBE_ACKNOWLEDGEMENT) => {
                debug!(model = %self.backend.model(), "Inference probe passed");
                ProbeStatus::Available
            }
            Ok(Ok(_)) => {
                debug!(model = %self.backend.model(), "Inference probe answered without acknowledgement");
                ProbeStatus::Limited
            }
            Ok(Err(e)) => {
                warn!(model = %self.backend.model(), error = %e, "Inference probe failed");
                ProbeStatus::Unavailable
            }
            Err(_) => {
                warn!(
                    model = %self.backend.model(),
                    timeout_ms = self.probe_timeout.as_millis() as u64,
                    "Inference probe timed out"
                );
                ProbeStatus::Unavailable
            }
        }
    }
}

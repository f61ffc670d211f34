//! Common traits and types for inference backends

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An image ready to be sent inline to the inference service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedImagePart {
    /// Base64 encoded file contents
    pub base64_payload: String,

    /// MIME type declared at upload
    pub mime_type: String,
}

/// A single analysis call: one instruction followed by zero or more images
#[derive(Debug, Clone)]
pub struct InferenceRequest {
    pub instruction: String,
    pub images: Vec<EncodedImagePart>,
}

impl InferenceRequest {
    pub fn text(instruction: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
            images: Vec::new(),
        }
    }
}

/// Failure reported by an inference backend.
///
/// The rendered message is what failure classification inspects, so variants
/// keep the upstream wording intact.
#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("API key is not configured")]
    MissingCredentials,

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("[{status}] {message}")]
    Api { status: u16, message: String },

    #[error("Response was blocked due to {0}")]
    Blocked(String),

    #[error("Failed to parse response: {0}")]
    Decode(String),

    #[error("{0}")]
    Other(String),
}

/// Trait for generative inference backends
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Model identifier used for requests
    fn model(&self) -> &str;

    /// Run one non-streaming generation and return the produced text.
    ///
    /// An empty string is a valid return value; judging it is left to the caller.
    async fn generate(&self, request: InferenceRequest) -> Result<String, InferenceError>;
}

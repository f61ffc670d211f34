//! Inference module - backend trait, Gemini client, gateway and failure classification

pub mod classifier;
pub mod gateway;
pub mod gemini;
pub mod traits;

pub use classifier::{FailureCategory, InferenceErrorClassifier, SubstringClassifier};
pub use gateway::{InferenceGateway, ProbeStatus};
pub use traits::{EncodedImagePart, InferenceBackend, InferenceError, InferenceRequest};

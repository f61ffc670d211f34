//! Common error types for the analysis service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use futures::FutureExt;
use serde::Serialize;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use thiserror::Error;

use crate::inference::classifier::FailureCategory;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No images uploaded")]
    NoFilesUploaded,

    #[error("Too many images: {received} uploaded, at most {max} allowed")]
    TooManyFiles { received: usize, max: usize },

    #[error("Custom prompt too long: {length} characters, at most {max} allowed")]
    PromptTooLong { length: usize, max: usize },

    #[error("File '{name}' exceeds the {limit} byte upload limit")]
    FileTooLarge { name: String, limit: u64 },

    #[error("File '{name}' has unsupported type '{mime_type}'")]
    InvalidFileType { name: String, mime_type: String },

    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    #[error("Failed to process image {index} ({name}): {reason}")]
    FileProcessing {
        index: usize,
        name: String,
        reason: String,
    },

    #[error("Inference failed ({category}): {message}")]
    Inference {
        category: FailureCategory,
        message: String,
    },

    #[error("Invalid analysis result: {0}")]
    InvalidAnalysis(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Machine-readable error codes returned to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NoFilesUploaded,
    TooManyFiles,
    PromptTooLong,
    FileTooLarge,
    InvalidFileType,
    InvalidUpload,
    FileProcessingError,
    ServiceUnavailable,
    RateLimitExceeded,
    ContentBlocked,
    FileSizeError,
    AnalysisError,
    InvalidAnalysis,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoFilesUploaded => "NO_FILES_UPLOADED",
            Self::TooManyFiles => "TOO_MANY_FILES",
            Self::PromptTooLong => "PROMPT_TOO_LONG",
            Self::FileTooLarge => "FILE_TOO_LARGE",
            Self::InvalidFileType => "INVALID_FILE_TYPE",
            Self::InvalidUpload => "INVALID_UPLOAD",
            Self::FileProcessingError => "FILE_PROCESSING_ERROR",
            Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            Self::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            Self::ContentBlocked => "CONTENT_BLOCKED",
            Self::FileSizeError => "FILE_SIZE_ERROR",
            Self::AnalysisError => "ANALYSIS_ERROR",
            Self::InvalidAnalysis => "INVALID_ANALYSIS",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error response body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    pub details: String,
    pub code: ErrorCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NoFilesUploaded
            | AppError::TooManyFiles { .. }
            | AppError::PromptTooLong { .. }
            | AppError::FileTooLarge { .. }
            | AppError::InvalidFileType { .. }
            | AppError::InvalidUpload(_) => StatusCode::BAD_REQUEST,
            AppError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            AppError::Inference { category, .. } => match category {
                FailureCategory::RateLimited => StatusCode::TOO_MANY_REQUESTS,
                FailureCategory::ContentBlocked | FailureCategory::PayloadTooLarge => {
                    StatusCode::BAD_REQUEST
                }
                FailureCategory::ServiceUnavailable | FailureCategory::Failed => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            AppError::Config(_)
            | AppError::Io(_)
            | AppError::FileProcessing { .. }
            | AppError::InvalidAnalysis(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::NoFilesUploaded => ErrorCode::NoFilesUploaded,
            AppError::TooManyFiles { .. } => ErrorCode::TooManyFiles,
            AppError::PromptTooLong { .. } => ErrorCode::PromptTooLong,
            AppError::FileTooLarge { .. } => ErrorCode::FileTooLarge,
            AppError::InvalidFileType { .. } => ErrorCode::InvalidFileType,
            AppError::InvalidUpload(_) => ErrorCode::InvalidUpload,
            AppError::FileProcessing { .. } => ErrorCode::FileProcessingError,
            AppError::Inference { category, .. } => match category {
                FailureCategory::ServiceUnavailable => ErrorCode::ServiceUnavailable,
                FailureCategory::RateLimited => ErrorCode::RateLimitExceeded,
                FailureCategory::ContentBlocked => ErrorCode::ContentBlocked,
                FailureCategory::PayloadTooLarge => ErrorCode::FileSizeError,
                FailureCategory::Failed => ErrorCode::AnalysisError,
            },
            AppError::InvalidAnalysis(_) => ErrorCode::InvalidAnalysis,
            AppError::RateLimitExceeded => ErrorCode::RateLimitExceeded,
            AppError::Config(_) | AppError::Io(_) | AppError::Internal(_) => {
                ErrorCode::InternalError
            }
        }
    }

    /// One-line message shown to the user
    pub fn summary(&self) -> String {
        match self {
            AppError::NoFilesUploaded => {
                "No images uploaded. Please select at least one image for analysis.".to_string()
            }
            AppError::TooManyFiles { .. } => "Too many images".to_string(),
            AppError::PromptTooLong { .. } => "Custom prompt too long".to_string(),
            AppError::FileTooLarge { name, .. } => format!("Image too large: {}", name),
            AppError::InvalidFileType { name, .. } => format!("Unsupported image type: {}", name),
            AppError::InvalidUpload(_) => "Malformed upload".to_string(),
            AppError::FileProcessing { name, .. } => format!("Failed to process image: {}", name),
            AppError::Inference { category, .. } => match category {
                FailureCategory::ServiceUnavailable => "AI service temporarily unavailable",
                FailureCategory::RateLimited => "Service temporarily overloaded",
                FailureCategory::ContentBlocked => "Content cannot be analyzed",
                FailureCategory::PayloadTooLarge => "Images too large for analysis",
                FailureCategory::Failed => "Analysis failed",
            }
            .to_string(),
            AppError::InvalidAnalysis(_) => "Invalid analysis result".to_string(),
            AppError::RateLimitExceeded => "Too many requests".to_string(),
            AppError::Config(_) | AppError::Io(_) | AppError::Internal(_) => {
                "Internal server error".to_string()
            }
        }
    }

    /// Longer explanation shown to the user. Never carries upstream or internal text.
    pub fn details(&self) -> String {
        match self {
            AppError::NoFilesUploaded => {
                "Upload 1-10 images to get started with prompt generation.".to_string()
            }
            AppError::TooManyFiles { received, max } => format!(
                "Maximum {} images allowed per request. You uploaded {} images.",
                max, received
            ),
            AppError::PromptTooLong { max, .. } => {
                format!("Please keep your custom prompt under {} characters.", max)
            }
            AppError::FileTooLarge { limit, .. } => format!(
                "Each image must be at most {} MB.",
                limit / (1024 * 1024)
            ),
            AppError::InvalidFileType { .. } => {
                "Only JPEG, PNG, WebP and GIF images are accepted.".to_string()
            }
            AppError::InvalidUpload(reason) => reason.clone(),
            AppError::FileProcessing { .. } => {
                "The image file may be corrupted, too large, or in an unsupported format."
                    .to_string()
            }
            AppError::Inference { category, .. } => match category {
                FailureCategory::ServiceUnavailable => {
                    "Our analysis service is experiencing technical difficulties. Please try again later."
                }
                FailureCategory::RateLimited => {
                    "Too many requests in progress. Please try again in a few minutes."
                }
                FailureCategory::ContentBlocked => {
                    "The uploaded images contain content that cannot be processed due to safety restrictions."
                }
                FailureCategory::PayloadTooLarge => {
                    "One or more images exceed the maximum size limit. Please try smaller images."
                }
                FailureCategory::Failed => {
                    "The AI service encountered an error while processing your images. Please try again."
                }
            }
            .to_string(),
            AppError::InvalidAnalysis(_) => {
                "The AI service returned an incomplete response. Please try again.".to_string()
            }
            AppError::RateLimitExceeded => {
                "Rate limit exceeded. Please slow down your requests.".to_string()
            }
            AppError::Config(_) | AppError::Io(_) | AppError::Internal(_) => {
                "An unexpected error occurred. Please try again.".to_string()
            }
        }
    }

    /// Build the JSON body. Internal detail is only exposed when `development` is set.
    pub fn to_body(&self, request_id: Option<&str>, development: bool) -> ErrorBody {
        let code = self.code();
        let internal = code == ErrorCode::InternalError;

        let details = if internal && development {
            format!("Server error: {}", self)
        } else {
            self.details()
        };

        ErrorBody {
            success: false,
            error: self.summary(),
            details,
            code,
            file_index: match self {
                AppError::FileProcessing { index, .. } => Some(*index),
                _ => None,
            },
            request_id: request_id.map(str::to_string),
            stack: (internal && development).then(|| format!("{:?}", self)),
        }
    }

    pub fn into_response_with(self, request_id: Option<&str>, development: bool) -> Response {
        let body = self.to_body(request_id, development);
        (self.status(), Json(body)).into_response()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.into_response_with(None, false)
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Run `future`, turning a panic inside it into its message.
///
/// Callers use the `Err` branch to clean up whatever the future had written.
pub async fn catch_panic<F: Future>(future: F) -> std::result::Result<F::Output, String> {
    AssertUnwindSafe(future)
        .catch_unwind()
        .await
        .map_err(|panic| panic_message(panic.as_ref()))
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

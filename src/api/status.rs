//! Health and configuration endpoints

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::error;

use crate::api::handlers::SERVICE_NAME;
use crate::inference::ProbeStatus;
use crate::upload::DirectoryStatus;
use crate::AppState;

const HEALTH_SERVICE_NAME: &str = "Prompt Sherlock Analysis Service";

const CAPABILITIES: &[&str] = &[
    "Image Analysis",
    "Prompt Generation",
    "Style Analysis",
    "Multi-Image Processing",
];

const SUPPORTED_PLATFORMS: &[&str] = &["Midjourney", "DALL·E", "Stable Diffusion", "Gemini Imagen"];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: &'static str,
    pub service: &'static str,
    pub timestamp: DateTime<Utc>,
    pub version: &'static str,
    pub ai_service: AiServiceStatus,
    pub upload_config: UploadSummary,
    pub storage: DirectoryStatus,
    pub privacy: PrivacyPolicy,
    pub supported_platforms: &'static [&'static str],
}

#[derive(Debug, Serialize)]
pub struct AiServiceStatus {
    pub status: ProbeStatus,
    pub model: String,
    pub capabilities: &'static [&'static str],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSummary {
    pub max_file_size: String,
    pub max_files: usize,
    pub allowed_types: Vec<String>,
    pub security_validation: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivacyPolicy {
    pub data_retention: &'static str,
    pub immediate_cleanup: &'static str,
    pub secure_processing: &'static str,
    pub no_tracking: bool,
}

/// Health report with a live inference probe. Only fails if the report itself cannot be built.
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let upload = &state.settings.upload;

    let report = HealthReport {
        status: "OK",
        service: HEALTH_SERVICE_NAME,
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION"),
        ai_service: AiServiceStatus {
            status: state.gateway.probe().await,
            model: state.gateway.model().to_string(),
            capabilities: CAPABILITIES,
        },
        upload_config: UploadSummary {
            max_file_size: format!("{}MB", upload.max_file_size_mb()),
            max_files: upload.max_files,
            allowed_types: upload.allowed_extensions.clone(),
            security_validation: "enabled",
        },
        storage: state.store.status().await,
        privacy: PrivacyPolicy {
            data_retention: "none",
            immediate_cleanup: "enabled",
            secure_processing: "enabled",
            no_tracking: true,
        },
        supported_platforms: SUPPORTED_PLATFORMS,
    };

    match serde_json::to_value(&report) {
        Ok(body) => (StatusCode::OK, Json(body)),
        Err(e) => {
            error!(error = %e, "Health check error");
            let details = if state.settings.server.is_development() {
                e.to_string()
            } else {
                "Service unavailable".to_string()
            };
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "status": "ERROR",
                    "service": HEALTH_SERVICE_NAME,
                    "timestamp": Utc::now(),
                    "error": "Health check failed",
                    "details": details,
                })),
            )
        }
    }
}

/// Static echo of the service configuration
pub async fn config(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let upload = &state.settings.upload;

    Json(json!({
        "success": true,
        "service": SERVICE_NAME,
        "config": {
            "upload": {
                "maxFileSize": upload.max_file_size,
                "maxFileSizeMB": upload.max_file_size_mb(),
                "maxFiles": upload.max_files,
                "allowedTypes": upload.allowed_mime_types,
                "allowedExtensions": upload.allowed_extensions,
            },
            "analysis": {
                "maxPromptLength": state.settings.analysis.max_prompt_length,
                "model": state.gateway.model(),
                "supportedFeatures": ["Style Analysis", "Multi-Platform Prompts", "Batch Processing", "Custom Focus"],
            },
            "privacy": {
                "dataRetention": "none",
                "immediateCleanup": true,
                "secureProcessing": true,
                "noTracking": true,
            },
            "outputFormats": {
                "midjourneyPrompts": true,
                "dallePrompts": true,
                "stableDiffusionPrompts": true,
                "universalPrompts": true,
                "styleGuides": true,
            },
        },
        "timestamp": Utc::now(),
    }))
}

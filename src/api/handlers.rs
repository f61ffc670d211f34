//! `POST /analyze` handler

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, info_span, Instrument};

use crate::error::{catch_panic, AppError, Result};
use crate::pipeline::{sweeper, AnalysisResult, ProcessedFile, TimingBreakdown};
use crate::upload::new_request_id;
use crate::AppState;

pub const SERVICE_NAME: &str = "Prompt Sherlock";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub success: bool,
    pub analysis: String,
    pub metadata: AnalysisMetadata,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisMetadata {
    pub request_id: String,
    pub processed_images: usize,
    pub total_processing_time_ms: u64,
    pub breakdown: TimingBreakdown,
    pub service: &'static str,
    pub custom_prompt: Option<String>,
    pub files: Vec<ProcessedFile>,
    pub timestamp: DateTime<Utc>,
    pub privacy: PrivacyFlags,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivacyFlags {
    pub files_validated: bool,
    pub immediate_cleanup: bool,
    pub secure_processing: bool,
    pub no_data_retention: bool,
}

impl AnalyzeResponse {
    fn new(request_id: String, custom_prompt: Option<String>, result: AnalysisResult) -> Self {
        Self {
            success: true,
            analysis: result.text,
            metadata: AnalysisMetadata {
                request_id,
                processed_images: result.processed_file_count,
                total_processing_time_ms: result.total_ms,
                breakdown: result.timing,
                service: SERVICE_NAME,
                custom_prompt,
                files: result.files,
                timestamp: Utc::now(),
                privacy: PrivacyFlags {
                    files_validated: true,
                    immediate_cleanup: true,
                    secure_processing: true,
                    no_data_retention: true,
                },
            },
        }
    }
}

/// Analyze uploaded images and return generated prompts
pub async fn analyze(
    State(state): State<Arc<AppState>>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Response {
    let request_id = new_request_id();
    let development = state.settings.server.is_development();
    let span = info_span!("analyze", request_id = %request_id);

    match run_analysis(&state, &request_id, multipart)
        .instrument(span)
        .await
    {
        Ok(response) => response,
        Err(e) => e.into_response_with(Some(&request_id), development),
    }
}

async fn run_analysis(
    state: &AppState,
    request_id: &str,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Response> {
    let multipart = multipart.map_err(|rejection| {
        debug!(reason = %rejection.body_text(), "Request is not a multipart upload");
        AppError::NoFilesUploaded
    })?;

    let request = state.intake.receive(request_id, multipart).await?;
    info!(files = request.file_count(), "Analyzing uploaded images");

    let result = match catch_panic(state.pipeline.run(&request)).await {
        Ok(result) => result?,
        Err(message) => {
            error!(panic = %message, "Unexpected failure during analysis");
            let report = sweeper::sweep(&request.files).await;
            if report.is_clean() {
                info!(removed = report.removed, "Emergency cleanup completed");
            } else {
                error!(failed = report.failed, "Emergency cleanup incomplete");
            }
            return Err(AppError::Internal(message));
        }
    };

    info!(
        chars = result.text.len(),
        total_ms = result.total_ms,
        "Analysis completed"
    );

    Ok(Json(AnalyzeResponse::new(
        request_id.to_string(),
        request.instruction,
        result,
    ))
    .into_response())
}

//! Analysis pipeline: materialize → compose → infer → validate, with one sweep per request

pub mod composer;
pub mod materializer;
pub mod sweeper;
pub mod validator;

use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::config::AnalysisConfig;
use crate::error::{AppError, Result};
use crate::inference::InferenceGateway;
use crate::upload::AnalysisRequest;

pub use composer::compose_instruction;
pub use materializer::Materializer;
pub use sweeper::SweepReport;
pub use validator::ResultValidator;

/// Hooks for diagnostics that must not influence the outcome
pub trait AnalysisObserver: Send + Sync {
    /// The validator spotted refusal or error phrasing in an accepted result
    fn suspicious_phrase(&self, _request_id: &str, _phrase: &str) {}

    /// A sweep pass finished
    fn swept(&self, _request_id: &str, _report: &SweepReport) {}
}

/// Observer that does nothing beyond the pipeline's own logging
pub struct NoopObserver;

impl AnalysisObserver for NoopObserver {}

/// Per-stage wall-clock timings in milliseconds
#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingBreakdown {
    pub materialize_ms: u64,
    pub inference_ms: u64,
    pub cleanup_ms: u64,
}

/// File summary echoed back to the client
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedFile {
    pub index: usize,
    pub filename: String,
    pub original_name: String,
    pub size: u64,
    pub mimetype: String,
    pub processed: bool,
}

#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub text: String,
    pub processed_file_count: usize,
    pub files: Vec<ProcessedFile>,
    pub timing: TimingBreakdown,
    pub total_ms: u64,
}

struct Staged {
    text: String,
    materialize_ms: u64,
    inference_ms: u64,
}

pub struct AnalysisPipeline {
    materializer: Materializer,
    gateway: Arc<InferenceGateway>,
    validator: ResultValidator,
    observer: Arc<dyn AnalysisObserver>,
    max_prompt_length: usize,
}

impl AnalysisPipeline {
    pub fn new(config: &AnalysisConfig, gateway: Arc<InferenceGateway>) -> Self {
        Self {
            materializer: Materializer::new(config.max_materialize_bytes),
            gateway,
            validator: ResultValidator::new(config.min_analysis_length, config.scan_window),
            observer: Arc::new(NoopObserver),
            max_prompt_length: config.max_prompt_length,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn AnalysisObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Run every stage, then sweep the request's files exactly once whatever the outcome.
    pub async fn run(&self, request: &AnalysisRequest) -> Result<AnalysisResult> {
        let started = Instant::now();
        let staged = self.execute(request).await;

        let cleanup_started = Instant::now();
        let report = sweeper::sweep(&request.files).await;
        let cleanup_ms = elapsed_ms(cleanup_started);
        info!(
            removed = report.removed,
            already_absent = report.already_absent,
            failed = report.failed,
            cleanup_ms,
            "Swept uploaded files"
        );
        self.observer.swept(&request.request_id, &report);

        let staged = staged?;
        let files = request
            .files
            .iter()
            .enumerate()
            .map(|(i, file)| ProcessedFile {
                index: i + 1,
                filename: file.stored_name.clone(),
                original_name: file.original_name.clone(),
                size: file.size_bytes,
                mimetype: file.declared_mime_type.clone(),
                processed: true,
            })
            .collect::<Vec<_>>();

        Ok(AnalysisResult {
            text: staged.text,
            processed_file_count: files.len(),
            files,
            timing: TimingBreakdown {
                materialize_ms: staged.materialize_ms,
                inference_ms: staged.inference_ms,
                cleanup_ms,
            },
            total_ms: elapsed_ms(started),
        })
    }

    async fn execute(&self, request: &AnalysisRequest) -> Result<Staged> {
        if let Some(instruction) = &request.instruction {
            let length = instruction.chars().count();
            if length > self.max_prompt_length {
                return Err(AppError::PromptTooLong {
                    length,
                    max: self.max_prompt_length,
                });
            }
        }

        let materialize_started = Instant::now();
        let parts = self.materializer.materialize(&request.files).await.map_err(|e| {
            warn!(error = %e, "File processing failed");
            e
        })?;
        let materialize_ms = elapsed_ms(materialize_started);
        info!(files = parts.len(), materialize_ms, "File processing completed");

        let instruction = compose_instruction(parts.len(), request.instruction.as_deref());

        let inference_started = Instant::now();
        let raw = self.gateway.analyze(instruction, parts).await?;
        let inference_ms = elapsed_ms(inference_started);
        info!(
            model = %self.gateway.model(),
            chars = raw.len(),
            inference_ms,
            "Inference completed"
        );

        let text = self
            .validator
            .validate(&request.request_id, &raw, self.observer.as_ref())
            .map_err(|e| {
                warn!(error = %e, "Analysis validation failed");
                e
            })?;

        Ok(Staged {
            text,
            materialize_ms,
            inference_ms,
        })
    }
}

fn elapsed_ms(since: Instant) -> u64 {
    since.elapsed().as_millis() as u64
}

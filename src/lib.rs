//! Prompt Sherlock
//!
//! An HTTP service that accepts uploaded images, sends them to a generative
//! inference service and returns ready-to-use AI art prompts. Uploaded files
//! live only for the duration of a request.

pub mod api;
pub mod config;
pub mod error;
pub mod inference;
pub mod middleware;
pub mod pipeline;
pub mod upload;

pub use error::{AppError, Result};

use std::sync::Arc;
use std::time::Duration;

use inference::{InferenceBackend, InferenceGateway};
use pipeline::{AnalysisObserver, AnalysisPipeline, NoopObserver};
use upload::{TempStore, UploadIntake};

/// Application state shared across all handlers
pub struct AppState {
    pub settings: Arc<config::Settings>,
    pub store: Arc<TempStore>,
    pub intake: UploadIntake,
    pub gateway: Arc<InferenceGateway>,
    pub pipeline: AnalysisPipeline,
}

impl AppState {
    pub fn new(settings: config::Settings, backend: Arc<dyn InferenceBackend>) -> Self {
        Self::with_observer(settings, backend, Arc::new(NoopObserver))
    }

    pub fn with_observer(
        settings: config::Settings,
        backend: Arc<dyn InferenceBackend>,
        observer: Arc<dyn AnalysisObserver>,
    ) -> Self {
        let gateway = InferenceGateway::new(backend)
            .with_probe_timeout(Duration::from_millis(settings.inference.probe_timeout_ms));
        Self::with_gateway(settings, Arc::new(gateway), observer)
    }

    pub fn with_gateway(
        settings: config::Settings,
        gateway: Arc<InferenceGateway>,
        observer: Arc<dyn AnalysisObserver>,
    ) -> Self {
        let store = Arc::new(TempStore::new(settings.upload.directory.clone()));
        let intake = UploadIntake::new(store.clone(), settings.upload.clone());
        let pipeline = AnalysisPipeline::new(&settings.analysis, gateway.clone())
            .with_observer(observer);

        Self {
            settings: Arc::new(settings),
            store,
            intake,
            gateway,
            pipeline,
        }
    }
}

//! Shared fixtures for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header::CONTENT_TYPE, Request},
    response::Response,
    Router,
};
use prompt_sherlock::{
    api::routes::create_router,
    config::Settings,
    inference::{InferenceBackend, InferenceError, InferenceRequest},
    pipeline::{AnalysisObserver, SweepReport},
    AppState,
};
use serde_json::Value;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const BOUNDARY: &str = "sherlock-test-boundary";

/// A plausible analysis: long enough and free of refusal phrasing
pub const GOOD_ANALYSIS: &str = "OVERVIEW: A rain-soaked street at night, lit by neon signage. \
DETAILED ANALYSIS: wet asphalt reflections, magenta and cyan palette, low camera angle. \
PROMPT RECOMMENDATIONS: neon alley, cinematic, 35mm, volumetric fog --ar 16:9";

pub const FAKE_JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46];

/// What the mock backend does when called
#[derive(Clone)]
pub enum Reply {
    Text(String),
    Fail(String),
    Panic,
    Sleep(Duration),
}

pub struct MockBackend {
    reply: Reply,
    calls: AtomicUsize,
    requests: Mutex<Vec<InferenceRequest>>,
}

impl MockBackend {
    pub fn new(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn text(text: &str) -> Arc<Self> {
        Self::new(Reply::Text(text.to_string()))
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Self::new(Reply::Fail(message.to_string()))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<InferenceRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl InferenceBackend for MockBackend {
    fn model(&self) -> &str {
        "mock-model"
    }

    async fn generate(&self, request: InferenceRequest) -> Result<String, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);

        match &self.reply {
            Reply::Text(text) => Ok(text.clone()),
            Reply::Fail(message) => Err(InferenceError::Other(message.clone())),
            Reply::Panic => panic!("backend exploded"),
            Reply::Sleep(duration) => {
                tokio::time::sleep(*duration).await;
                Ok("OK".to_string())
            }
        }
    }
}

/// Records observer callbacks
#[derive(Default)]
pub struct RecordingObserver {
    pub phrases: Mutex<Vec<String>>,
    pub sweeps: Mutex<Vec<SweepReport>>,
}

impl RecordingObserver {
    pub fn sweep_count(&self) -> usize {
        self.sweeps.lock().unwrap().len()
    }

    pub fn phrases(&self) -> Vec<String> {
        self.phrases.lock().unwrap().clone()
    }
}

impl AnalysisObserver for RecordingObserver {
    fn suspicious_phrase(&self, _request_id: &str, phrase: &str) {
        self.phrases.lock().unwrap().push(phrase.to_string());
    }

    fn swept(&self, _request_id: &str, report: &SweepReport) {
        self.sweeps.lock().unwrap().push(*report);
    }
}

pub fn test_settings(upload_dir: &Path) -> Settings {
    let mut settings = Settings::default();
    settings.upload.directory = upload_dir.to_string_lossy().to_string();
    settings.rate_limit.enabled = false;
    settings.inference.probe_timeout_ms = 200;
    settings
}

pub fn create_app(
    settings: Settings,
    backend: Arc<dyn InferenceBackend>,
    observer: Arc<dyn AnalysisObserver>,
) -> Router {
    create_router(Arc::new(AppState::with_observer(settings, backend, observer)))
}

/// Builder for multipart/form-data bodies
pub struct Form {
    body: Vec<u8>,
}

impl Form {
    pub fn new() -> Self {
        Self { body: Vec::new() }
    }

    pub fn file(mut self, field: &str, filename: &str, content_type: &str, data: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                BOUNDARY, field, filename, content_type
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn image(self, filename: &str) -> Self {
        self.file("images", filename, "image/jpeg", FAKE_JPEG)
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
        self
    }

    pub fn into_request(self, uri: &str) -> Request<Body> {
        let body = Body::from(self.finish());
        multipart_request(uri, body)
    }

    /// Same form, delivered as a stream of `chunk_size` byte frames
    pub fn into_streamed_request(self, uri: &str, chunk_size: usize) -> Request<Body> {
        let chunks = self
            .finish()
            .chunks(chunk_size)
            .map(|chunk| Ok::<_, std::io::Error>(chunk.to_vec()))
            .collect::<Vec<_>>();
        multipart_request(uri, Body::from_stream(futures::stream::iter(chunks)))
    }

    fn finish(mut self) -> Vec<u8> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        self.body
    }
}

fn multipart_request(uri: &str, body: Body) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(body)
        .unwrap()
}

pub async fn read_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn files_in(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
}

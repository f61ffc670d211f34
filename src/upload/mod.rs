//! Upload module - request-scoped file types, temp storage and multipart intake

pub mod intake;
pub mod store;

use serde::Serialize;
use std::path::PathBuf;
use uuid::Uuid;

pub use intake::UploadIntake;
pub use store::{DirectoryStatus, TempStore};

/// A file accepted by intake and persisted to temporary storage
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    #[serde(skip)]
    pub storage_path: PathBuf,
    /// Generated name under the upload directory
    pub stored_name: String,
    pub original_name: String,
    pub declared_mime_type: String,
    pub size_bytes: u64,
}

/// Everything the pipeline needs for one analysis
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub request_id: String,
    pub files: Vec<UploadedFile>,
    pub instruction: Option<String>,
}

impl AnalysisRequest {
    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

/// Opaque correlation token for one request
pub fn new_request_id() -> String {
    Uuid::new_v4().simple().to_string()
}

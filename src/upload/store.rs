//! Temporary storage for uploaded images

use serde::Serialize;
use std::path::PathBuf;
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

use crate::error::Result;

/// State of the upload directory, as reported by the health endpoint
#[derive(Debug, Clone, Serialize)]
pub struct DirectoryStatus {
    pub directory: String,
    pub exists: bool,
    pub writable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Owner of the upload directory
#[derive(Debug, Clone)]
pub struct TempStore {
    storage_path: PathBuf,
}

impl TempStore {
    pub fn new(storage_path: impl Into<PathBuf>) -> Self {
        Self {
            storage_path: storage_path.into(),
        }
    }

    /// Ensure the storage directory exists
    pub async fn ensure_storage_dir(&self) -> Result<()> {
        if !fs::try_exists(&self.storage_path).await.unwrap_or(false) {
            fs::create_dir_all(&self.storage_path).await?;
            debug!(path = ?self.storage_path, "Created upload directory");
        }
        Ok(())
    }

    /// Reserve a globally unique file name with the given extension.
    ///
    /// Nothing is written; the caller creates the file.
    pub fn allocate(&self, extension: &str) -> (String, PathBuf) {
        let filename = if extension.is_empty() {
            Uuid::new_v4().to_string()
        } else {
            format!("{}.{}", Uuid::new_v4(), extension)
        };
        let file_path = self.storage_path.join(&filename);
        (filename, file_path)
    }

    /// Check that the directory exists and accepts writes
    pub async fn status(&self) -> DirectoryStatus {
        let directory = self.storage_path.to_string_lossy().to_string();

        let exists = match fs::metadata(&self.storage_path).await {
            Ok(metadata) => metadata.is_dir(),
            Err(e) => {
                return DirectoryStatus {
                    directory,
                    exists: false,
                    writable: false,
                    error: Some(e.to_string()),
                }
            }
        };

        let probe = self.storage_path.join(format!(".write-probe-{}", Uuid::new_v4()));
        let (writable, error) = match fs::write(&probe, b"").await {
            Ok(()) => {
                let _ = fs::remove_file(&probe).await;
                (true, None)
            }
            Err(e) => (false, Some(e.to_string())),
        };

        DirectoryStatus {
            directory,
            exists,
            writable,
            error,
        }
    }
}

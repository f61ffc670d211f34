//! Multipart intake: validates and persists uploaded images before any processing

use axum::extract::multipart::{Field, MultipartError};
use axum::extract::Multipart;
use axum::http::StatusCode;
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::config::UploadConfig;
use crate::error::{catch_panic, AppError, Result};
use crate::pipeline::sweeper;
use crate::upload::{AnalysisRequest, TempStore, UploadedFile};

/// Multipart field carrying image files
pub const FILE_FIELD: &str = "images";

/// Multipart field carrying the optional custom instruction
pub const PROMPT_FIELD: &str = "prompt";

/// Accepts a multipart upload and writes its images to temporary storage
pub struct UploadIntake {
    store: Arc<TempStore>,
    limits: UploadConfig,
}

impl UploadIntake {
    pub fn new(store: Arc<TempStore>, limits: UploadConfig) -> Self {
        Self { store, limits }
    }

    /// Read the whole form. On any rejection the files already written are swept.
    pub async fn receive(
        &self,
        request_id: &str,
        mut multipart: Multipart,
    ) -> Result<AnalysisRequest> {
        let mut files = Vec::new();
        let mut instruction = None;

        let collected = catch_panic(self.collect(&mut multipart, &mut files, &mut instruction))
            .await
            .unwrap_or_else(|message| Err(AppError::Internal(message)));

        if let Err(e) = collected {
            warn!(error = %e, received = files.len(), "Upload rejected");
            sweeper::sweep(&files).await;
            return Err(e);
        }

        if files.is_empty() {
            return Err(AppError::NoFilesUploaded);
        }

        info!(
            files = files.len(),
            total_bytes = files.iter().map(|f| f.size_bytes).sum::<u64>(),
            has_instruction = instruction.is_some(),
            "Upload accepted"
        );

        Ok(AnalysisRequest {
            request_id: request_id.to_string(),
            files,
            instruction,
        })
    }

    async fn collect(
        &self,
        multipart: &mut Multipart,
        files: &mut Vec<UploadedFile>,
        instruction: &mut Option<String>,
    ) -> Result<()> {
        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let name = field.name().unwrap_or_default().to_string();

            match name.as_str() {
                FILE_FIELD => {
                    if files.len() >= self.limits.max_files {
                        drop(field);
                        let received = files.len() + 1 + count_remaining_files(multipart).await;
                        return Err(AppError::TooManyFiles {
                            received,
                            max: self.limits.max_files,
                        });
                    }
                    let file = self.store_field(field).await?;
                    debug!(
                        index = files.len() + 1,
                        stored_name = %file.stored_name,
                        size = file.size_bytes,
                        "Stored upload"
                    );
                    files.push(file);
                }
                PROMPT_FIELD => {
                    let text = field.text().await.map_err(multipart_error)?;
                    if !text.is_empty() {
                        *instruction = Some(text);
                    }
                }
                other => {
                    debug!(field = %other, "Ignoring unknown form field");
                }
            }
        }

        Ok(())
    }

    async fn store_field(&self, mut field: Field<'_>) -> Result<UploadedFile> {
        let original_name = field.file_name().unwrap_or_default().to_string();
        let mime_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let extension = Path::new(&original_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        if !self.limits.is_allowed_mime_type(&mime_type)
            || !self.limits.is_allowed_extension(&extension)
        {
            return Err(AppError::InvalidFileType {
                name: original_name,
                mime_type,
            });
        }

        self.store.ensure_storage_dir().await?;
        let (stored_name, storage_path) = self.store.allocate(&extension);

        match write_field(&mut field, &storage_path, self.limits.max_file_size).await {
            Ok(size_bytes) => Ok(UploadedFile {
                storage_path,
                stored_name,
                original_name,
                declared_mime_type: mime_type,
                size_bytes,
            }),
            Err(e) => {
                let _ = fs::remove_file(&storage_path).await;
                Err(match e {
                    WriteFailure::TooLarge => AppError::FileTooLarge {
                        name: original_name,
                        limit: self.limits.max_file_size,
                    },
                    WriteFailure::App(e) => e,
                })
            }
        }
    }
}

enum WriteFailure {
    TooLarge,
    App(AppError),
}

impl From<std::io::Error> for WriteFailure {
    fn from(e: std::io::Error) -> Self {
        WriteFailure::App(AppError::Io(e))
    }
}

/// Stream a field to disk chunk by chunk, stopping once `limit` is exceeded
async fn write_field(
    field: &mut Field<'_>,
    path: &Path,
    limit: u64,
) -> std::result::Result<u64, WriteFailure> {
    let mut file = fs::File::create(path).await?;
    let mut written: u64 = 0;

    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| WriteFailure::App(multipart_error(e)))?
    {
        written += chunk.len() as u64;
        if written > limit {
            return Err(WriteFailure::TooLarge);
        }
        file.write_all(&chunk).await?;
    }

    file.flush().await?;
    Ok(written)
}

/// Skip the rest of the body, counting file parts without storing them
async fn count_remaining_files(multipart: &mut Multipart) -> usize {
    let mut count = 0;
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some(FILE_FIELD) {
            count += 1;
        }
    }
    count
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::InvalidUpload("The upload exceeds the maximum request size.".to_string())
    } else {
        AppError::InvalidUpload(e.body_text())
    }
}

//! Reads uploaded files back into memory as inline image parts

use base64::{engine::general_purpose::STANDARD, Engine};
use thiserror::Error;
use tokio::fs;
use tracing::debug;

use crate::error::{AppError, Result};
use crate::inference::EncodedImagePart;
use crate::upload::UploadedFile;

#[derive(Error, Debug)]
pub enum MaterializeError {
    #[error("file is not accessible: {0}")]
    Inaccessible(std::io::Error),

    #[error("path is not a regular file")]
    NotAFile,

    #[error("failed to read file: {0}")]
    Read(std::io::Error),

    #[error("file too large: {size} bytes exceeds {limit}")]
    TooLarge { size: u64, limit: u64 },
}

/// Turns stored uploads into base64 image parts, strictly in upload order
#[derive(Debug, Clone)]
pub struct Materializer {
    max_bytes: u64,
}

impl Materializer {
    pub fn new(max_bytes: u64) -> Self {
        Self { max_bytes }
    }

    /// Encode every file. The first failure aborts the rest and reports the
    /// 1-based index of the offending file.
    pub async fn materialize(&self, files: &[UploadedFile]) -> Result<Vec<EncodedImagePart>> {
        let mut parts = Vec::with_capacity(files.len());

        for (i, file) in files.iter().enumerate() {
            let part = self.materialize_one(file).await.map_err(|e| AppError::FileProcessing {
                index: i + 1,
                name: file.original_name.clone(),
                reason: e.to_string(),
            })?;

            debug!(
                index = i + 1,
                total = files.len(),
                encoded_len = part.base64_payload.len(),
                "Materialized upload"
            );
            parts.push(part);
        }

        Ok(parts)
    }

    async fn materialize_one(
        &self,
        file: &UploadedFile,
    ) -> std::result::Result<EncodedImagePart, MaterializeError> {
        let metadata = fs::metadata(&file.storage_path)
            .await
            .map_err(MaterializeError::Inaccessible)?;
        if !metadata.is_file() {
            return Err(MaterializeError::NotAFile);
        }

        let data = fs::read(&file.storage_path)
            .await
            .map_err(MaterializeError::Read)?;

        let size = data.len() as u64;
        if size > self.max_bytes {
            return Err(MaterializeError::TooLarge {
                size,
                limit: self.max_bytes,
            });
        }

        Ok(EncodedImagePart {
            base64_payload: STANDARD.encode(&data),
            mime_type: file.declared_mime_type.clone(),
        })
    }
}

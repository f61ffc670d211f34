//! Best-effort removal of request-scoped temporary files

use serde::Serialize;
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs;
use tracing::{debug, error};

use crate::upload::UploadedFile;

/// Outcome of one sweep pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub removed: usize,
    pub already_absent: usize,
    pub failed: usize,
}

impl SweepReport {
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// Remove every file of a request. Never fails; a file that is already gone
/// counts as absent, so sweeping twice is harmless.
pub async fn sweep(files: &[UploadedFile]) -> SweepReport {
    let mut report = SweepReport::default();
    for file in files {
        remove(&file.storage_path, &mut report).await;
    }
    report
}

async fn remove(path: &Path, report: &mut SweepReport) {
    match fs::remove_file(path).await {
        Ok(()) => {
            report.removed += 1;
            debug!(path = ?path, "Removed temporary file");
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            report.already_absent += 1;
        }
        Err(e) => {
            report.failed += 1;
            error!(path = ?path, error = %e, "Failed to remove temporary file");
        }
    }
}

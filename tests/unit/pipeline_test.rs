//! Unit tests for the analysis pipeline and its cleanup guarantees

#[path = "../common/mod.rs"]
mod common;

use common::*;
use prompt_sherlock::{
    config::Settings,
    inference::InferenceGateway,
    pipeline::{sweeper, AnalysisPipeline, Materializer},
    upload::{AnalysisRequest, UploadedFile},
    AppError,
};
use std::path::Path;
use std::sync::Arc;

fn stored_file(dir: &Path, name: &str, data: &[u8]) -> UploadedFile {
    let path = dir.join(name);
    std::fs::write(&path, data).unwrap();
    UploadedFile {
        storage_path: path,
        stored_name: name.to_string(),
        original_name: format!("original-{}", name),
        declared_mime_type: "image/png".to_string(),
        size_bytes: data.len() as u64,
    }
}

fn request(files: Vec<UploadedFile>, instruction: Option<&str>) -> AnalysisRequest {
    AnalysisRequest {
        request_id: "test-request".to_string(),
        files,
        instruction: instruction.map(str::to_string),
    }
}

fn pipeline(
    backend: Arc<MockBackend>,
    observer: Arc<RecordingObserver>,
) -> AnalysisPipeline {
    let gateway = Arc::new(InferenceGateway::new(backend));
    AnalysisPipeline::new(&Settings::default().analysis, gateway).with_observer(observer)
}

#[tokio::test]
async fn test_run_sweeps_exactly_once() {
    let dir = tempfile::tempdir().unwrap();
    let files = vec![
        stored_file(dir.path(), "one.png", b"first"),
        stored_file(dir.path(), "two.png", b"second"),
    ];
    let observer = Arc::new(RecordingObserver::default());
    let pipeline = pipeline(MockBackend::text(GOOD_ANALYSIS), observer.clone());

    let result = pipeline.run(&request(files, None)).await.unwrap();
    assert_eq!(result.processed_file_count, 2);
    assert_eq!(result.files[1].original_name, "original-two.png");
    assert_eq!(result.text, GOOD_ANALYSIS);

    assert_eq!(observer.sweep_count(), 1);
    assert_eq!(observer.sweeps.lock().unwrap()[0].removed, 2);
    assert_eq!(files_in(dir.path()), 0);
}

#[tokio::test]
async fn test_images_sent_in_upload_order() {
    let dir = tempfile::tempdir().unwrap();
    let files = vec![
        stored_file(dir.path(), "a.png", b"AAAA"),
        stored_file(dir.path(), "b.png", b"BBBB"),
    ];
    let backend = MockBackend::text(GOOD_ANALYSIS);
    let pipeline = pipeline(backend.clone(), Arc::new(RecordingObserver::default()));

    pipeline.run(&request(files, None)).await.unwrap();

    let sent = backend.last_request().unwrap();
    assert_eq!(sent.images[0].base64_payload, "QUFBQQ==");
    assert_eq!(sent.images[1].base64_payload, "QkJCQg==");
    assert_eq!(sent.images[0].mime_type, "image/png");
}

#[tokio::test]
async fn test_missing_file_reports_index_and_still_sweeps() {
    let dir = tempfile::tempdir().unwrap();
    let first = stored_file(dir.path(), "one.png", b"first");
    std::fs::remove_file(&first.storage_path).unwrap();

    let observer = Arc::new(RecordingObserver::default());
    let backend = MockBackend::text(GOOD_ANALYSIS);
    let pipeline = pipeline(backend.clone(), observer.clone());

    let err = pipeline.run(&request(vec![first], None)).await.unwrap_err();
    match &err {
        AppError::FileProcessing { index, name, .. } => {
            assert_eq!(*index, 1);
            assert_eq!(name, "original-one.png");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(err.to_body(None, false).file_index, Some(1));
    assert_eq!(backend.calls(), 0);

    let report = observer.sweeps.lock().unwrap()[0];
    assert_eq!(report.already_absent, 1);
    assert!(report.is_clean());
}

#[tokio::test]
async fn test_second_file_missing_reports_index_two() {
    let dir = tempfile::tempdir().unwrap();
    let first = stored_file(dir.path(), "one.png", b"first");
    let second = stored_file(dir.path(), "two.png", b"second");
    std::fs::remove_file(&second.storage_path).unwrap();

    let pipeline = pipeline(
        MockBackend::text(GOOD_ANALYSIS),
        Arc::new(RecordingObserver::default()),
    );

    let err = pipeline
        .run(&request(vec![first, second], None))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::FileProcessing { index: 2, .. }));
    assert_eq!(files_in(dir.path()), 0);
}

#[tokio::test]
async fn test_prompt_too_long_is_checked_before_inference() {
    let dir = tempfile::tempdir().unwrap();
    let files = vec![stored_file(dir.path(), "one.png", b"first")];
    let backend = MockBackend::text(GOOD_ANALYSIS);
    let observer = Arc::new(RecordingObserver::default());
    let pipeline = pipeline(backend.clone(), observer.clone());

    // Multi-byte characters count once each
    let instruction = "é".repeat(1001);
    let err = pipeline
        .run(&request(files, Some(&instruction)))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::PromptTooLong {
            length: 1001,
            max: 1000
        }
    ));
    assert_eq!(backend.calls(), 0);
    assert_eq!(observer.sweep_count(), 1);
    assert_eq!(files_in(dir.path()), 0);
}

#[tokio::test]
async fn test_minimum_length_boundary() {
    let dir = tempfile::tempdir().unwrap();

    let short = "a".repeat(49);
    let pipeline_short = pipeline(
        MockBackend::text(&short),
        Arc::new(RecordingObserver::default()),
    );
    let files = vec![stored_file(dir.path(), "one.png", b"x")];
    let err = pipeline_short.run(&request(files, None)).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidAnalysis(_)));

    let exact = "a".repeat(50);
    let pipeline_exact = pipeline(
        MockBackend::text(&exact),
        Arc::new(RecordingObserver::default()),
    );
    let files = vec![stored_file(dir.path(), "two.png", b"x")];
    let result = pipeline_exact.run(&request(files, None)).await.unwrap();
    assert_eq!(result.text, exact);
}

#[tokio::test]
async fn test_inference_failure_still_sweeps() {
    let dir = tempfile::tempdir().unwrap();
    let files = vec![stored_file(dir.path(), "one.png", b"first")];
    let observer = Arc::new(RecordingObserver::default());
    let pipeline = pipeline(MockBackend::failing("quota exceeded"), observer.clone());

    let err = pipeline.run(&request(files, None)).await.unwrap_err();
    assert_eq!(err.code().as_str(), "RATE_LIMIT_EXCEEDED");
    assert_eq!(observer.sweep_count(), 1);
    assert_eq!(files_in(dir.path()), 0);
}

#[tokio::test]
async fn test_sweep_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let files = vec![
        stored_file(dir.path(), "one.png", b"first"),
        stored_file(dir.path(), "two.png", b"second"),
    ];

    let first = sweeper::sweep(&files).await;
    assert_eq!(first.removed, 2);

    let second = sweeper::sweep(&files).await;
    assert_eq!(second.removed, 0);
    assert_eq!(second.already_absent, 2);
    assert!(second.is_clean());
}

#[tokio::test]
async fn test_materializer_enforces_ceiling() {
    let dir = tempfile::tempdir().unwrap();
    let files = vec![
        stored_file(dir.path(), "small.png", b"ok"),
        stored_file(dir.path(), "large.png", b"far too many bytes"),
    ];

    let err = Materializer::new(8).materialize(&files).await.unwrap_err();
    match err {
        AppError::FileProcessing { index, reason, .. } => {
            assert_eq!(index, 2);
            assert!(reason.contains("too large"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_materializer_rejects_directories() {
    let dir = tempfile::tempdir().unwrap();
    let file = UploadedFile {
        storage_path: dir.path().to_path_buf(),
        stored_name: "dir".to_string(),
        original_name: "dir.png".to_string(),
        declared_mime_type: "image/png".to_string(),
        size_bytes: 0,
    };

    let err = Materializer::new(1024).materialize(&[file]).await.unwrap_err();
    assert!(matches!(err, AppError::FileProcessing { index: 1, .. }));
}

#[path = "helpers/mod.rs"]
mod helpers;

use async_trait::async_trait;
use bytes::Bytes;
use helpers::{
    drain, progress_channel, setup, setup_with_config, setup_with_mock, ten_second_decoder,
};
use reelscope_core::{
    ErrorKind, JobOutcome, JobProgress, JobStage, RemoteAssetHandle, RemoteError, RemoteState,
};
use reelscope_processing::test_helpers::FakeDecoder;
use reelscope_remote::test_helpers::MockAnalysisService;
use reelscope_remote::{AnalysisService, ProgressReporter};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn test_success_after_polls_cleans_up() {
    let service = Arc::new(MockAnalysisService::new().ready_after(3));
    let job = setup_with_mock(service.clone());
    let input = job.input_file("clip.mp4", b"fake video bytes");
    let (progress, mut rx) = progress_channel();

    let outcome = job
        .orchestrator
        .run_job(&input, "video/mp4", None, progress)
        .await;

    assert!(outcome.is_success(), "{:?}", outcome);
    let analysis = outcome.analysis().unwrap();
    assert_eq!(analysis.model, "mock-model");
    assert_eq!(analysis.structured.cover_second, Some(3));
    assert_eq!(analysis.structured.viral_score, Some(7.0));
    assert_eq!(analysis.structured.risk_level.as_deref(), Some("low"));
    assert_eq!(outcome.thumbnail().unwrap().timestamp_secs, 3.0);

    assert_eq!(service.state_calls(), 4);
    assert_eq!(service.delete_calls(), 1);
    assert_eq!(service.deleted(), vec!["files/mock-asset".to_string()]);
    assert_eq!(job.staged_files(), 0);
    assert!(input.exists(), "caller's file must be left alone");

    let events = drain(&mut rx);
    let polls = events
        .iter()
        .filter(|e| matches!(e, JobProgress::Polling(_)))
        .count();
    assert_eq!(polls, 4);
    assert_eq!(events.first(), Some(&JobProgress::Stage(JobStage::Validating)));
    assert_eq!(events.last(), Some(&JobProgress::Stage(JobStage::CleaningUp)));
}

#[tokio::test(start_paused = true)]
async fn test_never_ready_times_out_and_deletes_once() {
    let service = Arc::new(MockAnalysisService::new().never_ready());
    let job = setup_with_mock(service.clone());

    let start = Instant::now();
    let outcome = job
        .orchestrator
        .run_upload("clip.mp4", b"video", "video/mp4", None, ProgressReporter::disabled())
        .await;

    assert_eq!(outcome.error_kind(), Some(ErrorKind::Timeout));
    assert!(start.elapsed() >= Duration::from_secs(300));
    assert_eq!(service.generate_calls(), 0);
    assert_eq!(service.delete_calls(), 1);
    assert_eq!(job.staged_files(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_remote_failure_skips_analysis() {
    let service = Arc::new(MockAnalysisService::new().fails_after(1));
    let job = setup_with_mock(service.clone());

    let outcome = job
        .orchestrator
        .run_upload("clip.mp4", b"video", "video/mp4", None, ProgressReporter::disabled())
        .await;

    assert_eq!(outcome.error_kind(), Some(ErrorKind::RemoteProcessingFailed));
    assert_eq!(service.generate_calls(), 0);
    assert_eq!(service.delete_calls(), 1);
    assert_eq!(job.staged_files(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_failed_delete_does_not_change_outcome() {
    let service = Arc::new(
        MockAnalysisService::new()
            .with_delete_error(RemoteError::NotFound("files/mock-asset".to_string())),
    );
    let job = setup_with_mock(service.clone());

    let outcome = job
        .orchestrator
        .run_upload("clip.mp4", b"video", "video/mp4", None, ProgressReporter::disabled())
        .await;

    assert!(outcome.is_success());
    assert_eq!(service.delete_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_deleting_same_asset_twice_is_harmless() {
    let service = Arc::new(MockAnalysisService::new());
    let job = setup_with_mock(service.clone());
    let handle = RemoteAssetHandle::new("files/mock-asset", RemoteState::Succeeded);

    // The asset is already gone once the first job has cleaned up.
    let first = job
        .orchestrator
        .run_upload("clip.mp4", b"video", "video/mp4", None, ProgressReporter::disabled())
        .await;
    service.delete_asset(&handle).await.unwrap();

    assert!(first.is_success());
    assert_eq!(service.deleted().len(), 2);

    let gone = Arc::new(
        MockAnalysisService::new()
            .with_delete_error(RemoteError::NotFound("files/mock-asset".to_string())),
    );
    let job = setup_with_mock(gone.clone());
    let second = job
        .orchestrator
        .run_upload("clip.mp4", b"video", "video/mp4", None, ProgressReporter::disabled())
        .await;
    assert!(second.is_success());
}

#[tokio::test(start_paused = true)]
async fn test_decode_failure_keeps_analysis() {
    let service = Arc::new(MockAnalysisService::new());
    let job = setup(service.clone(), Arc::new(FakeDecoder::failing()));

    let outcome = job
        .orchestrator
        .run_upload("clip.mov", b"video", "video/quicktime", None, ProgressReporter::disabled())
        .await;

    assert!(outcome.is_success());
    assert!(outcome.analysis().is_some());
    assert!(outcome.thumbnail().is_none());
    assert_eq!(job.staged_files(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_missing_cover_marker_uses_fallback_second() {
    let service = Arc::new(MockAnalysisService::new().with_analysis_text("Nice product, no marker."));
    let job = setup_with_mock(service);

    let outcome = job
        .orchestrator
        .run_upload("clip.mp4", b"video", "video/mp4", None, ProgressReporter::disabled())
        .await;

    assert!(outcome.is_success());
    assert!(outcome.analysis().unwrap().structured.is_empty());
    assert_eq!(outcome.thumbnail().unwrap().timestamp_secs, 1.0);
}

#[tokio::test(start_paused = true)]
async fn test_cover_past_end_is_clamped() {
    let service = Arc::new(MockAnalysisService::new().with_analysis_text("CAPA: 120"));
    let job = setup_with_mock(service);

    let outcome = job
        .orchestrator
        .run_upload("clip.mp4", b"video", "video/mp4", None, ProgressReporter::disabled())
        .await;

    let thumbnail = outcome.thumbnail().unwrap();
    assert_eq!(thumbnail.requested_secs, 120);
    assert_eq!(thumbnail.timestamp_secs, 5.0);
}

#[tokio::test]
async fn test_invalid_upload_never_reaches_service() {
    let service = Arc::new(MockAnalysisService::new());
    let job = setup_with_mock(service.clone());

    let outcome = job
        .orchestrator
        .run_upload("notes.txt", b"hello", "text/plain", None, ProgressReporter::disabled())
        .await;

    assert_eq!(outcome.error_kind(), Some(ErrorKind::InvalidInput));
    assert_eq!(service.submit_calls(), 0);
    assert_eq!(service.delete_calls(), 0);
    assert_eq!(job.staged_files(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_submission_has_nothing_to_delete() {
    let service = Arc::new(MockAnalysisService::new().with_submit_failures(
        5,
        RemoteError::Transport("connection reset".to_string()),
    ));
    let job = setup_with_mock(service.clone());

    let outcome = job
        .orchestrator
        .run_upload("clip.mp4", b"video", "video/mp4", None, ProgressReporter::disabled())
        .await;

    assert_eq!(outcome.error_kind(), Some(ErrorKind::TransientTransport));
    assert_eq!(service.submit_calls(), 3);
    assert_eq!(service.delete_calls(), 0);
    assert_eq!(job.staged_files(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_empty_analysis_fails_and_cleans_up() {
    let service = Arc::new(MockAnalysisService::new().with_analysis_text(""));
    let job = setup_with_mock(service.clone());

    let outcome = job
        .orchestrator
        .run_upload("clip.mp4", b"video", "video/mp4", None, ProgressReporter::disabled())
        .await;

    assert_eq!(outcome.error_kind(), Some(ErrorKind::EmptyResponse));
    assert_eq!(service.generate_calls(), 1);
    assert_eq!(service.delete_calls(), 1);
    assert_eq!(job.staged_files(), 0);
}

#[tokio::test]
async fn test_missing_input_file() {
    let service = Arc::new(MockAnalysisService::new());
    let job = setup_with_mock(service.clone());

    let outcome = job
        .orchestrator
        .run_job(
            Path::new("/nonexistent/clip.mp4"),
            "video/mp4",
            None,
            ProgressReporter::disabled(),
        )
        .await;

    assert_eq!(outcome.error_kind(), Some(ErrorKind::LocalIOFailure));
    assert_eq!(service.submit_calls(), 0);
}

#[tokio::test]
async fn test_oversized_file_rejected_before_staging() {
    let service = Arc::new(MockAnalysisService::new());
    let job = setup_with_config(service.clone(), ten_second_decoder(), |config| {
        config.max_video_size_bytes = 16;
    });
    let input = job.input_file("clip.mp4", &[0u8; 64]);
    let (progress, mut rx) = progress_channel();

    let outcome = job
        .orchestrator
        .run_job(&input, "video/mp4", None, progress)
        .await;

    assert_eq!(outcome.error_kind(), Some(ErrorKind::InvalidInput));
    assert_eq!(service.submit_calls(), 0);
    assert_eq!(job.staged_files(), 0);
    let events = drain(&mut rx);
    assert!(!events.contains(&JobProgress::Stage(JobStage::Staging)));
}

#[tokio::test]
async fn test_huge_file_is_rejected_from_metadata() {
    let service = Arc::new(MockAnalysisService::new());
    let job = setup_with_mock(service.clone());
    let input = job.input_dir.path().join("huge.mp4");
    // Sparse: reading it whole would allocate 8 GiB.
    std::fs::File::create(&input)
        .unwrap()
        .set_len(8 * 1024 * 1024 * 1024)
        .unwrap();

    let outcome = job
        .orchestrator
        .run_job(&input, "video/mp4", None, ProgressReporter::disabled())
        .await;

    match &outcome {
        JobOutcome::Failure { kind, message } => {
            assert_eq!(*kind, ErrorKind::InvalidInput);
            assert!(message.contains("too large"), "{}", message);
        }
        other => panic!("expected failure, got {:?}", other),
    }
    assert_eq!(service.submit_calls(), 0);
    assert_eq!(job.staged_files(), 0);
}

#[tokio::test]
async fn test_directory_input_is_local_io_failure() {
    let service = Arc::new(MockAnalysisService::new());
    let job = setup_with_mock(service.clone());

    let outcome = job
        .orchestrator
        .run_job(job.input_dir.path(), "video/mp4", None, ProgressReporter::disabled())
        .await;

    assert_eq!(outcome.error_kind(), Some(ErrorKind::LocalIOFailure));
    assert_eq!(service.submit_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_file_job_submits_staged_copy() {
    let service = Arc::new(MockAnalysisService::new());
    let job = setup_with_mock(service.clone());
    let input = job.input_file("clip.mov", b"0123456789");

    let outcome = job
        .orchestrator
        .run_job(&input, "video/quicktime", None, ProgressReporter::disabled())
        .await;

    assert!(outcome.is_success());
    assert_eq!(service.submitted(), vec![(10, "video/quicktime".to_string())]);
    assert_eq!(job.staged_files(), 0);
    assert_eq!(std::fs::read(&input).unwrap(), b"0123456789");
}

#[tokio::test(start_paused = true)]
async fn test_default_prompt_lists_configured_risk_keywords() {
    let service = Arc::new(
        MockAnalysisService::new().with_analysis_text("CAPA: 2\nPOTENCIAL VIRAL: 6/10\nRISCO: alto"),
    );
    let job = setup_with_config(service.clone(), ten_second_decoder(), |config| {
        config.risk_keywords = vec!["baixo".into(), "medio".into(), "alto".into()];
    });

    let outcome = job
        .orchestrator
        .run_upload("clip.mp4", b"video", "video/mp4", None, ProgressReporter::disabled())
        .await;

    let prompts = service.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].ends_with("RISCO: <baixo|medio|alto>"));
    assert_eq!(
        outcome.analysis().unwrap().structured.risk_level.as_deref(),
        Some("alto")
    );
}

#[tokio::test(start_paused = true)]
async fn test_custom_prompt_is_sent_unchanged() {
    let service = Arc::new(MockAnalysisService::new());
    let job = setup_with_mock(service.clone());

    job.orchestrator
        .run_upload(
            "clip.mp4",
            b"video",
            "video/mp4",
            Some("Describe the hook."),
            ProgressReporter::disabled(),
        )
        .await;

    assert_eq!(service.prompts(), vec!["Describe the hook.".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_asset_ready_at_upload_skips_polling() {
    let service = Arc::new(MockAnalysisService::new().with_initial_state(RemoteState::Succeeded));
    let job = setup_with_mock(service.clone());

    let start = Instant::now();
    let outcome = job
        .orchestrator
        .run_upload("clip.mp4", b"video", "video/mp4", None, ProgressReporter::disabled())
        .await;

    assert!(outcome.is_success());
    assert_eq!(service.state_calls(), 0);
    assert_eq!(service.generate_calls(), 1);
    assert_eq!(start.elapsed(), Duration::ZERO);
    assert_eq!(service.delete_calls(), 1);
}

/// Delegates to the mock but panics when asked to analyze.
struct PanicOnAnalyze(MockAnalysisService);

#[async_trait]
impl AnalysisService for PanicOnAnalyze {
    async fn submit_asset(
        &self,
        data: Bytes,
        mime_type: &str,
        display_name: &str,
    ) -> Result<RemoteAssetHandle, RemoteError> {
        self.0.submit_asset(data, mime_type, display_name).await
    }

    async fn get_asset_state(
        &self,
        handle: &RemoteAssetHandle,
    ) -> Result<RemoteAssetHandle, RemoteError> {
        self.0.get_asset_state(handle).await
    }

    async fn generate_analysis(
        &self,
        _handle: &RemoteAssetHandle,
        _prompt: &str,
    ) -> Result<String, RemoteError> {
        panic!("generator exploded");
    }

    async fn delete_asset(&self, handle: &RemoteAssetHandle) -> Result<(), RemoteError> {
        self.0.delete_asset(handle).await
    }

    fn model(&self) -> &str {
        self.0.model()
    }
}

#[tokio::test(start_paused = true)]
async fn test_panic_is_reported_and_resources_released() {
    let service = Arc::new(PanicOnAnalyze(MockAnalysisService::new()));
    let job = setup(service.clone(), ten_second_decoder());

    let outcome = job
        .orchestrator
        .run_upload("clip.mp4", b"video", "video/mp4", None, ProgressReporter::disabled())
        .await;

    assert_eq!(outcome.error_kind(), Some(ErrorKind::Internal));
    assert_eq!(service.0.delete_calls(), 1);
    assert_eq!(job.staged_files(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_progress_receiver_dropped_early() {
    let service = Arc::new(MockAnalysisService::new().ready_after(2));
    let job = setup_with_mock(service);
    let (progress, rx) = progress_channel();
    drop(rx);

    let outcome = job
        .orchestrator
        .run_upload("clip.mp4", b"video", "video/mp4", None, progress)
        .await;
    assert!(outcome.is_success());
}

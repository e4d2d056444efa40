//! Job orchestration
//!
//! A job runs the stages strictly in sequence:
//! validate, stage locally, submit, wait for readiness, analyze, parse,
//! extract the thumbnail. Resources acquired along the way (the local temp
//! file and the remote asset) are recorded in [`JobResources`] as soon as
//! they exist, so cleanup sees them on every exit path, including a panic
//! inside a stage.

use futures::FutureExt;
use reelscope_core::constants::analysis_prompt;
use reelscope_core::{
    AnalysisResult, Config, JobError, JobOutcome, JobStage, LogLevel, MediaAsset,
    RemoteAssetHandle, Thumbnail,
};
use reelscope_processing::{
    FfmpegDecoder, FrameExtractor, MediaDecoder, ResultParser, VideoValidator,
};
use reelscope_remote::{
    AnalysisInvoker, AnalysisService, GeminiClient, ProgressReporter, ReadinessPoller,
    RetryPolicy, SubmissionClient,
};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

/// Where the job's bytes come from.
#[derive(Clone, Copy)]
enum JobInput<'a> {
    Bytes(&'a [u8]),
    File(&'a Path),
}

/// Resources owned by one job, released in [`JobOrchestrator::cleanup`].
#[derive(Default)]
struct JobResources {
    asset: Option<MediaAsset>,
    remote: Option<RemoteAssetHandle>,
}

pub struct JobOrchestrator {
    config: Config,
    service: Arc<dyn AnalysisService>,
    validator: VideoValidator,
    submission: SubmissionClient,
    poller: ReadinessPoller,
    invoker: AnalysisInvoker,
    parser: ResultParser,
    extractor: FrameExtractor,
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn log_failure(err: &JobError) {
    match err.kind.log_level() {
        LogLevel::Debug => tracing::debug!(
            error_code = err.kind.error_code(),
            error = %err.message,
            "Job failed"
        ),
        LogLevel::Warn => tracing::warn!(
            error_code = err.kind.error_code(),
            error = %err.message,
            "Job failed"
        ),
        LogLevel::Error => tracing::error!(
            error_code = err.kind.error_code(),
            recoverable = err.kind.is_recoverable(),
            error = %err.message,
            "Job failed"
        ),
    }
}

impl JobOrchestrator {
    pub fn new(
        config: Config,
        service: Arc<dyn AnalysisService>,
        decoder: Arc<dyn MediaDecoder>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            validator: VideoValidator::from_config(&config),
            submission: SubmissionClient::new(service.clone(), RetryPolicy::from_config(&config)),
            poller: ReadinessPoller::from_config(service.clone(), &config),
            invoker: AnalysisInvoker::new(service.clone()),
            parser: ResultParser::from_config(&config)?,
            extractor: FrameExtractor::new(decoder),
            service,
            config,
        })
    }

    /// Production wiring: Gemini for analysis, ffmpeg for frames.
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let service = Arc::new(GeminiClient::from_config(&config)?);
        let decoder = Arc::new(FfmpegDecoder::new(config.ffmpeg_path(), config.ffprobe_path())?);
        Self::new(config, service, decoder)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Analyze a file on disk.
    ///
    /// The file is validated from its metadata, then streamed into a
    /// job-owned temp file; it is never read whole into memory, and the
    /// caller's file is never modified or removed.
    pub async fn run_job(
        &self,
        local_file: &Path,
        mime_type: &str,
        prompt: Option<&str>,
        progress: ProgressReporter,
    ) -> JobOutcome {
        let size = match tokio::fs::metadata(local_file).await {
            Ok(meta) if meta.is_file() => meta.len(),
            Ok(_) => {
                let err = JobError::local_io(format!(
                    "{} is not a regular file",
                    local_file.display()
                ));
                log_failure(&err);
                return err.into();
            }
            Err(e) => {
                let err = JobError::local_io(format!(
                    "Failed to read {}: {}",
                    local_file.display(),
                    e
                ));
                log_failure(&err);
                return err.into();
            }
        };

        let name = local_file
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload");
        self.run(name, JobInput::File(local_file), size, mime_type, prompt, progress)
            .await
    }

    /// Analyze uploaded bytes.
    pub async fn run_upload(
        &self,
        name: &str,
        data: &[u8],
        mime_type: &str,
        prompt: Option<&str>,
        progress: ProgressReporter,
    ) -> JobOutcome {
        self.run(
            name,
            JobInput::Bytes(data),
            data.len() as u64,
            mime_type,
            prompt,
            progress,
        )
        .await
    }

    /// Always returns an outcome. By the time it does, the temp file is gone
    /// and deletion of the remote asset has been attempted exactly once.
    async fn run(
        &self,
        name: &str,
        input: JobInput<'_>,
        size: u64,
        mime_type: &str,
        prompt: Option<&str>,
        progress: ProgressReporter,
    ) -> JobOutcome {
        let job_id = Uuid::new_v4();
        let span = tracing::info_span!("job", job_id = %job_id, file = %name, size);
        let prompt = match prompt {
            Some(prompt) => prompt.to_string(),
            None => analysis_prompt(self.config.risk_keywords()),
        };

        async move {
            tracing::info!(mime_type = %mime_type, "Job started");

            let mut resources = JobResources::default();
            let result = AssertUnwindSafe(self.pipeline(
                name,
                input,
                size,
                mime_type,
                &prompt,
                &progress,
                &mut resources,
            ))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                Err(JobError::internal(format!(
                    "Pipeline panicked: {}",
                    panic_message(panic.as_ref())
                )))
            });

            progress.stage(JobStage::CleaningUp);
            self.cleanup(resources).await;

            match result {
                Ok((analysis, thumbnail)) => {
                    tracing::info!(
                        cover_second = ?analysis.structured.cover_second,
                        thumbnail = thumbnail.is_some(),
                        "Job completed"
                    );
                    JobOutcome::success(analysis, thumbnail)
                }
                Err(err) => {
                    log_failure(&err);
                    err.into()
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn stage(
        &self,
        name: &str,
        input: JobInput<'_>,
        mime_type: &str,
    ) -> Result<MediaAsset, JobError> {
        let dir = self.config.temp_dir();
        let staged = match input {
            JobInput::Bytes(data) => MediaAsset::stage(dir, name, data, mime_type),
            JobInput::File(source) => {
                let (dir, name, source, mime_type) = (
                    dir.to_path_buf(),
                    name.to_string(),
                    source.to_path_buf(),
                    mime_type.to_string(),
                );
                tokio::task::spawn_blocking(move || {
                    MediaAsset::stage_file(&dir, &name, &source, &mime_type)
                })
                .await
                .map_err(|e| JobError::internal(format!("Staging task failed: {}", e)))?
            }
        };
        staged.map_err(|e| JobError::local_io(format!("Failed to stage upload: {}", e)))
    }

    #[allow(clippy::too_many_arguments)]
    async fn pipeline(
        &self,
        name: &str,
        input: JobInput<'_>,
        size: u64,
        mime_type: &str,
        prompt: &str,
        progress: &ProgressReporter,
        resources: &mut JobResources,
    ) -> Result<(AnalysisResult, Option<Thumbnail>), JobError> {
        progress.stage(JobStage::Validating);
        let size = usize::try_from(size).unwrap_or(usize::MAX);
        self.validator.validate_all(name, mime_type, size)?;

        progress.stage(JobStage::Staging);
        let asset = self.stage(name, input, mime_type).await?;
        let path = resources.asset.insert(asset).path().to_path_buf();
        tracing::debug!(path = %path.display(), "Upload staged");

        progress.stage(JobStage::Submitting);
        let handle = self.submission.submit_named(&path, mime_type, name).await?;
        resources.remote = Some(handle.clone());

        progress.stage(JobStage::WaitingForReadiness);
        let ready = self.poller.wait_until_ready(handle, progress).await?;
        resources.remote = Some(ready.clone());

        progress.stage(JobStage::Analyzing);
        let analysis = self.invoker.analyze(&ready, prompt).await?;

        progress.stage(JobStage::Parsing);
        let structured = self.parser.parse(&analysis.text);
        if structured.cover_second.is_none() {
            tracing::debug!(
                fallback_secs = self.config.thumbnail_fallback_secs(),
                "No cover second in analysis, using fallback"
            );
        }
        let target_second = structured
            .cover_second
            .unwrap_or(self.config.thumbnail_fallback_secs());
        let analysis = analysis.with_structured(structured);

        progress.stage(JobStage::ExtractingThumbnail);
        let thumbnail = match self.extractor.extract_frame(&path, target_second).await {
            Ok(thumbnail) => Some(thumbnail),
            Err(err) => {
                log_failure(&err);
                None
            }
        };

        Ok((analysis, thumbnail))
    }

    async fn cleanup(&self, resources: JobResources) {
        if let Some(handle) = resources.remote {
            match self.service.delete_asset(&handle).await {
                Ok(()) => tracing::debug!(asset = %handle.name(), "Remote asset deleted"),
                Err(e) => tracing::warn!(
                    asset = %handle.name(),
                    error = %e,
                    "Failed to delete remote asset"
                ),
            }
        }

        if let Some(asset) = resources.asset {
            let path = asset.path().to_path_buf();
            if let Err(e) = asset.close() {
                tracing::error!(path = %path.display(), error = %e, "Failed to remove temp file");
            }
        }
    }
}

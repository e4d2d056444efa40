use bytes::Bytes;
use reelscope_core::{Config, JobError, RemoteAssetHandle, RemoteError};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

use crate::service::AnalysisService;

/// Bounded exponential backoff for submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.submit_max_attempts(), config.submit_backoff_base())
    }

    /// Delay after the `retry`-th failed attempt (0-based): `base * 2^retry`.
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(retry))
    }
}

/// Uploads a local file with retry on transport failures.
#[derive(Clone)]
pub struct SubmissionClient {
    service: Arc<dyn AnalysisService>,
    policy: RetryPolicy,
}

impl SubmissionClient {
    pub fn new(service: Arc<dyn AnalysisService>, policy: RetryPolicy) -> Self {
        Self { service, policy }
    }

    pub async fn submit(&self, path: &Path, mime_type: &str) -> Result<RemoteAssetHandle, JobError> {
        let display_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();
        self.submit_named(path, mime_type, &display_name).await
    }

    /// Like [`submit`](Self::submit) with an explicit name shown by the service.
    #[tracing::instrument(skip(self, path), fields(path = %path.display()))]
    pub async fn submit_named(
        &self,
        path: &Path,
        mime_type: &str,
        display_name: &str,
    ) -> Result<RemoteAssetHandle, JobError> {
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| JobError::local_io(format!("Failed to read {}: {}", path.display(), e)))?;
        if data.is_empty() {
            return Err(JobError::local_io(format!("{} is empty", path.display())));
        }
        let data = Bytes::from(data);

        let mut last_error: Option<RemoteError> = None;
        for attempt in 0..self.policy.max_attempts {
            if attempt > 0 {
                let delay = self.policy.delay_for(attempt - 1);
                tracing::debug!(
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    "Backing off before retrying submission"
                );
                sleep(delay).await;
            }

            match self
                .service
                .submit_asset(data.clone(), mime_type, display_name)
                .await
            {
                Ok(handle) => {
                    tracing::info!(
                        asset = %handle.name(),
                        state = %handle.state(),
                        attempts = attempt + 1,
                        "Media submitted"
                    );
                    return Ok(handle);
                }
                Err(e) if e.is_transient() => {
                    tracing::warn!(
                        error = %e,
                        attempt = attempt + 1,
                        max_attempts = self.policy.max_attempts,
                        "Submission attempt failed"
                    );
                    last_error = Some(e);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Submission rejected by service");
                    return Err(JobError::invalid_input(format!(
                        "Submission rejected: {}",
                        e
                    )));
                }
            }
        }

        let last = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no attempt made".to_string());
        Err(JobError::transient(format!(
            "Submission failed after {} attempts: {}",
            self.policy.max_attempts, last
        )))
    }
}

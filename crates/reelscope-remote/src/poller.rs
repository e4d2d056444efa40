//! Readiness polling
//!
//! Waiting for the remote asset is a small state machine. [`next_step`] is
//! the pure transition: given the last observed [`RemoteState`] and the time
//! spent so far, it decides whether the wait is over or how long to sleep
//! before the next query. [`ReadinessPoller`] drives it against the service.

use reelscope_core::{Config, JobError, PollProgress, RemoteAssetHandle, RemoteError, RemoteState};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};

use crate::progress::ProgressReporter;
use crate::service::AnalysisService;

/// Outcome of one transition of the polling state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStep {
    /// Asset reached SUCCEEDED.
    Ready,
    /// Asset reached FAILED.
    Failed,
    /// Budget exhausted while the asset was still being prepared.
    TimedOut,
    /// Sleep this long, then query again.
    Wait(Duration),
}

/// Pure transition function.
///
/// The sleep is capped to the remaining budget so the last query happens
/// right at the deadline instead of past it.
pub fn next_step(
    observed: RemoteState,
    elapsed: Duration,
    budget: Duration,
    interval: Duration,
) -> PollStep {
    match observed {
        RemoteState::Succeeded => PollStep::Ready,
        RemoteState::Failed => PollStep::Failed,
        RemoteState::Pending | RemoteState::Processing => {
            if elapsed >= budget {
                PollStep::TimedOut
            } else {
                PollStep::Wait(interval.min(budget - elapsed))
            }
        }
    }
}

fn classify_query_error(err: RemoteError) -> JobError {
    match err {
        RemoteError::Transport(_) | RemoteError::Unavailable { .. } => {
            JobError::transient(format!("Readiness query failed: {}", err))
        }
        RemoteError::Rejected { .. } => {
            JobError::invalid_input(format!("Readiness query rejected: {}", err))
        }
        RemoteError::NotFound(_) | RemoteError::MalformedResponse(_) => {
            JobError::remote_processing_failed(format!("Readiness query failed: {}", err))
        }
    }
}

/// Waits until a submitted asset is ready for analysis.
#[derive(Clone)]
pub struct ReadinessPoller {
    service: Arc<dyn AnalysisService>,
    interval: Duration,
    budget: Duration,
}

impl ReadinessPoller {
    pub fn new(service: Arc<dyn AnalysisService>, interval: Duration, budget: Duration) -> Self {
        Self {
            service,
            interval,
            budget,
        }
    }

    pub fn from_config(service: Arc<dyn AnalysisService>, config: &Config) -> Self {
        Self::new(service, config.poll_interval(), config.poll_timeout())
    }

    /// Poll until SUCCEEDED, FAILED or the budget runs out.
    ///
    /// Returns the refreshed, ready handle. The submitted asset stays on the
    /// service on every error path; deleting it is the caller's job.
    #[tracing::instrument(skip(self, handle, progress), fields(asset = %handle.name()))]
    pub async fn wait_until_ready(
        &self,
        handle: RemoteAssetHandle,
        progress: &ProgressReporter,
    ) -> Result<RemoteAssetHandle, JobError> {
        let start = Instant::now();
        let mut handle = handle;
        let mut polls: u32 = 0;

        loop {
            let elapsed = start.elapsed();
            match next_step(handle.state(), elapsed, self.budget, self.interval) {
                PollStep::Ready => {
                    tracing::info!(polls, elapsed_ms = elapsed.as_millis() as u64, "Asset ready");
                    return Ok(handle);
                }
                PollStep::Failed => {
                    let reason = handle
                        .error_message()
                        .unwrap_or("no reason given")
                        .to_string();
                    tracing::warn!(polls, reason = %reason, "Remote processing failed");
                    return Err(JobError::remote_processing_failed(format!(
                        "Remote processing of {} failed: {}",
                        handle.name(),
                        reason
                    )));
                }
                PollStep::TimedOut => {
                    tracing::warn!(
                        polls,
                        budget_secs = self.budget.as_secs(),
                        state = %handle.state(),
                        "Asset not ready within budget"
                    );
                    return Err(JobError::timeout(format!(
                        "{} still {} after {}s",
                        handle.name(),
                        handle.state(),
                        self.budget.as_secs()
                    )));
                }
                PollStep::Wait(delay) => {
                    sleep(delay).await;
                    handle = self
                        .service
                        .get_asset_state(&handle)
                        .await
                        .map_err(classify_query_error)?;
                    polls += 1;

                    tracing::debug!(polls, state = %handle.state(), "Polled asset state");
                    progress.poll(PollProgress {
                        elapsed: start.elapsed(),
                        budget: self.budget,
                        polls,
                        state: handle.state(),
                    });
                }
            }
        }
    }
}

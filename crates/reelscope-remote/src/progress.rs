use reelscope_core::{JobProgress, JobStage, PollProgress};
use tokio::sync::mpsc;

pub type ProgressSender = mpsc::UnboundedSender<JobProgress>;

/// Fire-and-forget progress notifications.
///
/// Sending never blocks and a dropped receiver is ignored, so reporting
/// cannot influence the pipeline.
#[derive(Debug, Clone, Default)]
pub struct ProgressReporter {
    sender: Option<ProgressSender>,
}

impl ProgressReporter {
    pub fn new(sender: Option<ProgressSender>) -> Self {
        Self { sender }
    }

    pub fn disabled() -> Self {
        Self { sender: None }
    }

    pub fn stage(&self, stage: JobStage) {
        self.send(JobProgress::Stage(stage));
    }

    pub fn poll(&self, progress: PollProgress) {
        self.send(JobProgress::Polling(progress));
    }

    fn send(&self, event: JobProgress) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(event);
        }
    }
}

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::time::Duration;

use crate::models::RemoteState;

/// Pipeline stage a job is currently in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStage {
    Validating,
    Staging,
    Submitting,
    WaitingForReadiness,
    Analyzing,
    Parsing,
    ExtractingThumbnail,
    CleaningUp,
}

impl Display for JobStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            JobStage::Validating => write!(f, "validating"),
            JobStage::Staging => write!(f, "staging"),
            JobStage::Submitting => write!(f, "submitting"),
            JobStage::WaitingForReadiness => write!(f, "waiting_for_readiness"),
            JobStage::Analyzing => write!(f, "analyzing"),
            JobStage::Parsing => write!(f, "parsing"),
            JobStage::ExtractingThumbnail => write!(f, "extracting_thumbnail"),
            JobStage::CleaningUp => write!(f, "cleaning_up"),
        }
    }
}

/// Snapshot emitted after every readiness poll.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollProgress {
    pub elapsed: Duration,
    pub budget: Duration,
    pub polls: u32,
    pub state: RemoteState,
}

impl PollProgress {
    /// Elapsed share of the polling budget, capped at 1.0.
    pub fn fraction(&self) -> f64 {
        if self.budget.is_zero() {
            return 1.0;
        }
        (self.elapsed.as_secs_f64() / self.budget.as_secs_f64()).min(1.0)
    }
}

/// Side-channel notification sent to the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum JobProgress {
    Stage(JobStage),
    Polling(PollProgress),
}

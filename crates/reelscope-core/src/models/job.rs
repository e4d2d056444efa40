use serde::Serialize;

use crate::error::{ErrorKind, JobError};
use crate::models::{AnalysisResult, Thumbnail};

/// The single value returned to the caller of a job.
///
/// A missing thumbnail never turns a successful analysis into a failure.
#[derive(Debug, Clone)]
pub enum JobOutcome {
    Success {
        analysis: AnalysisResult,
        thumbnail: Option<Thumbnail>,
    },
    Failure {
        kind: ErrorKind,
        message: String,
    },
}

impl JobOutcome {
    pub fn success(analysis: AnalysisResult, thumbnail: Option<Thumbnail>) -> Self {
        JobOutcome::Success {
            analysis,
            thumbnail,
        }
    }

    pub fn failure(kind: ErrorKind, message: impl Into<String>) -> Self {
        JobOutcome::Failure {
            kind,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Success { .. })
    }

    pub fn analysis(&self) -> Option<&AnalysisResult> {
        match self {
            JobOutcome::Success { analysis, .. } => Some(analysis),
            JobOutcome::Failure { .. } => None,
        }
    }

    pub fn thumbnail(&self) -> Option<&Thumbnail> {
        match self {
            JobOutcome::Success { thumbnail, .. } => thumbnail.as_ref(),
            JobOutcome::Failure { .. } => None,
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            JobOutcome::Success { .. } => None,
            JobOutcome::Failure { kind, .. } => Some(*kind),
        }
    }

    /// Serializable summary without image data.
    pub fn summary(&self) -> JobSummary<'_> {
        match self {
            JobOutcome::Success {
                analysis,
                thumbnail,
            } => JobSummary::Success {
                analysis,
                thumbnail_secs: thumbnail.as_ref().map(|t| t.timestamp_secs),
            },
            JobOutcome::Failure { kind, message } => JobSummary::Failure {
                kind: *kind,
                error_code: kind.error_code(),
                message,
            },
        }
    }
}

impl From<JobError> for JobOutcome {
    fn from(err: JobError) -> Self {
        JobOutcome::Failure {
            kind: err.kind,
            message: err.message,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobSummary<'a> {
    Success {
        analysis: &'a AnalysisResult,
        thumbnail_secs: Option<f64>,
    },
    Failure {
        kind: ErrorKind,
        error_code: &'static str,
        message: &'a str,
    },
}

//! Reelscope Remote Library
//!
//! Everything that talks to the remote analysis service: the service seam,
//! the Gemini binding, and the submission, readiness and analysis stages
//! built on top of it.

pub mod gemini;
pub mod invoker;
pub mod poller;
pub mod progress;
pub mod service;
pub mod submission;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use gemini::GeminiClient;
pub use invoker::AnalysisInvoker;
pub use poller::{next_step, PollStep, ReadinessPoller};
pub use progress::{ProgressReporter, ProgressSender};
pub use service::AnalysisService;
pub use submission::{RetryPolicy, SubmissionClient};

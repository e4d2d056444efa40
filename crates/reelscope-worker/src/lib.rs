//! Reelscope Worker
//!
//! Runs one analysis job end to end and always hands back a
//! [`JobOutcome`](reelscope_core::JobOutcome).

pub mod orchestrator;

pub use orchestrator::JobOrchestrator;

//! Reelscope Core Library
//!
//! This crate provides the domain models, error types and configuration shared
//! by every stage of the analysis pipeline: submission, readiness polling,
//! analysis, result parsing and thumbnail extraction.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::{AnalysisConfig, Config};
pub use error::{ErrorKind, JobError, LogLevel, RemoteError};
pub use models::{
    AnalysisResult, JobOutcome, JobProgress, JobStage, MediaAsset, PollProgress,
    RemoteAssetHandle, RemoteState, StructuredView, Thumbnail,
};

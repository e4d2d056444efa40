//! Test helpers for pipeline tests
//!
//! [`MockAnalysisService`] is a scripted, in-memory [`AnalysisService`]
//! that records how often each operation was called.

pub mod mock_service;

pub use mock_service::MockAnalysisService;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fields extracted from free-form analysis text.
///
/// Every field is optional: a missing field is a normal outcome.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredView {
    /// Second of the media suggested as the cover frame.
    pub cover_second: Option<u32>,
    /// Viral potential score on a 0-10 scale.
    pub viral_score: Option<f32>,
    /// Risk label, normalised to the configured vocabulary.
    pub risk_level: Option<String>,
}

impl StructuredView {
    pub fn is_empty(&self) -> bool {
        self.cover_second.is_none() && self.viral_score.is_none() && self.risk_level.is_none()
    }
}

/// Text returned by the analysis call plus its structured projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub text: String,
    pub structured: StructuredView,
    pub model: String,
    pub completed_at: DateTime<Utc>,
}

impl AnalysisResult {
    pub fn new(text: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            structured: StructuredView::default(),
            model: model.into(),
            completed_at: Utc::now(),
        }
    }

    pub fn with_structured(mut self, structured: StructuredView) -> Self {
        self.structured = structured;
        self
    }
}

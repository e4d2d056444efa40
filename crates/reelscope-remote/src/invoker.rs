use reelscope_core::{AnalysisResult, JobError, RemoteAssetHandle, RemoteError};
use std::sync::Arc;

use crate::service::AnalysisService;

/// Issues the generation request for a ready asset.
///
/// No retry happens here: the generator is non-deterministic, so repeating
/// an identical request has no defined recovery.
#[derive(Clone)]
pub struct AnalysisInvoker {
    service: Arc<dyn AnalysisService>,
}

impl AnalysisInvoker {
    pub fn new(service: Arc<dyn AnalysisService>) -> Self {
        Self { service }
    }

    #[tracing::instrument(skip(self, asset, prompt), fields(asset = %asset.name(), prompt_len = prompt.len()))]
    pub async fn analyze(
        &self,
        asset: &RemoteAssetHandle,
        prompt: &str,
    ) -> Result<AnalysisResult, JobError> {
        if !asset.is_ready() {
            return Err(JobError::invalid_input(format!(
                "Asset {} is {}, not ready for analysis",
                asset.name(),
                asset.state()
            )));
        }

        let text = self
            .service
            .generate_analysis(asset, prompt)
            .await
            .map_err(|e| match e {
                RemoteError::Transport(_) | RemoteError::Unavailable { .. } => {
                    JobError::transient(format!("Analysis request failed: {}", e))
                }
                RemoteError::MalformedResponse(_) => {
                    JobError::empty_response(format!("Analysis returned no usable text: {}", e))
                }
                RemoteError::Rejected { .. } | RemoteError::NotFound(_) => {
                    JobError::invalid_input(format!("Analysis request rejected: {}", e))
                }
            })?;

        if text.trim().is_empty() {
            return Err(JobError::empty_response("Analysis returned empty text"));
        }

        tracing::info!(chars = text.len(), model = %self.service.model(), "Analysis completed");
        Ok(AnalysisResult::new(text, self.service.model()))
    }
}

use async_trait::async_trait;
use bytes::Bytes;
use reelscope_core::{RemoteAssetHandle, RemoteError};

/// Remote asynchronous analysis service.
///
/// Each method is a single remote call with no retry of its own; retry and
/// polling policy live in the pipeline stages that call it.
#[async_trait]
pub trait AnalysisService: Send + Sync {
    /// Upload media bytes. The caller owns the created asset and must
    /// eventually delete it.
    async fn submit_asset(
        &self,
        data: Bytes,
        mime_type: &str,
        display_name: &str,
    ) -> Result<RemoteAssetHandle, RemoteError>;

    /// Re-query an asset; returns a fresh handle with the current state.
    async fn get_asset_state(
        &self,
        handle: &RemoteAssetHandle,
    ) -> Result<RemoteAssetHandle, RemoteError>;

    /// Run the prompt against a ready asset and return the raw text.
    async fn generate_analysis(
        &self,
        handle: &RemoteAssetHandle,
        prompt: &str,
    ) -> Result<String, RemoteError>;

    async fn delete_asset(&self, handle: &RemoteAssetHandle) -> Result<(), RemoteError>;

    /// Model identifier recorded on analysis results.
    fn model(&self) -> &str;
}

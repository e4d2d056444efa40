// Gemini Files API + generateContent binding

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use reelscope_core::{Config, RemoteAssetHandle, RemoteError, RemoteState};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::time::Duration;

use crate::service::AnalysisService;

const API_KEY_HEADER: &str = "x-goog-api-key";
const UPLOAD_URL_HEADER: &str = "x-goog-upload-url";

/// Gemini client implementing [`AnalysisService`].
pub struct GeminiClient {
    http_client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl Debug for GeminiClient {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("GeminiClient")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiFile {
    name: String,
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<GeminiStatus>,
}

#[derive(Debug, Deserialize)]
struct GeminiStatus {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: GeminiFile,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<GenerateContent>,
}

#[derive(Debug, Serialize)]
struct GenerateContent {
    parts: Vec<GeneratePart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeneratePart {
    FileData { file_data: FileData },
    Text { text: String },
}

#[derive(Debug, Serialize)]
struct FileData {
    mime_type: String,
    file_uri: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

/// Map the Files API state onto [`RemoteState`].
///
/// Unknown values are treated as still pending so polling continues.
fn state_from_wire(state: Option<&str>) -> RemoteState {
    match state {
        Some("ACTIVE") => RemoteState::Succeeded,
        Some("FAILED") => RemoteState::Failed,
        Some("PROCESSING") => RemoteState::Processing,
        _ => RemoteState::Pending,
    }
}

impl GeminiFile {
    fn into_handle(self) -> RemoteAssetHandle {
        let mut handle =
            RemoteAssetHandle::new(self.name, state_from_wire(self.state.as_deref()));
        if let Some(uri) = self.uri {
            handle = handle.with_uri(uri);
        }
        if let Some(mime_type) = self.mime_type {
            handle = handle.with_mime_type(mime_type);
        }
        if let Some(error) = self.error {
            handle = handle.with_error_message(error.message);
        }
        handle
    }
}

impl GenerateResponse {
    fn into_text(self) -> Result<String, RemoteError> {
        let Some(candidate) = self.candidates.into_iter().next() else {
            let reason = self
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .unwrap_or_else(|| "unspecified".to_string());
            return Err(RemoteError::MalformedResponse(format!(
                "no candidates returned (block reason: {})",
                reason
            )));
        };

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            tracing::warn!(
                finish_reason = candidate.finish_reason.as_deref().unwrap_or("unknown"),
                "Gemini candidate carried no text"
            );
        }
        Ok(text)
    }
}

fn transport(context: &str, err: reqwest::Error) -> RemoteError {
    RemoteError::Transport(format!("{}: {}", context, err))
}

async fn check_status(response: Response, context: &str) -> Result<Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(RemoteError::from_status(
        status.as_u16(),
        format!("{}: {}", context, error_text),
    ))
}

async fn parse_json<T: serde::de::DeserializeOwned>(
    response: Response,
    context: &str,
) -> Result<T, RemoteError> {
    response
        .json()
        .await
        .map_err(|e| RemoteError::MalformedResponse(format!("{}: {}", context, e)))
}

impl GeminiClient {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client for Gemini")?;

        Ok(Self {
            http_client,
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Self::new(
            config.gemini_api_key(),
            config.gemini_model(),
            config.gemini_base_url(),
            config.http_timeout(),
        )
    }

    fn resource_url(&self, name: &str) -> String {
        format!("{}/v1beta/{}", self.base_url, name)
    }

    /// Open a resumable upload session and return its URL.
    async fn start_upload(
        &self,
        size: usize,
        mime_type: &str,
        display_name: &str,
    ) -> Result<String, RemoteError> {
        let url = format!("{}/upload/v1beta/files", self.base_url);

        let response = self
            .http_client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", size.to_string())
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&json!({ "file": { "display_name": display_name } }))
            .send()
            .await
            .map_err(|e| transport("Failed to start Gemini upload", e))?;

        let response = check_status(response, "Gemini upload start failed").await?;

        response
            .headers()
            .get(UPLOAD_URL_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string())
            .ok_or_else(|| {
                RemoteError::MalformedResponse("upload start returned no session URL".to_string())
            })
    }
}

#[async_trait]
impl AnalysisService for GeminiClient {
    #[tracing::instrument(skip(self, data), fields(size = data.len()))]
    async fn submit_asset(
        &self,
        data: Bytes,
        mime_type: &str,
        display_name: &str,
    ) -> Result<RemoteAssetHandle, RemoteError> {
        let session_url = self
            .start_upload(data.len(), mime_type, display_name)
            .await?;

        let response = self
            .http_client
            .post(&session_url)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(data)
            .send()
            .await
            .map_err(|e| transport("Failed to upload media to Gemini", e))?;

        let response = check_status(response, "Gemini upload failed").await?;
        let upload: UploadResponse = parse_json(response, "Failed to parse upload response").await?;

        tracing::info!(
            asset = %upload.file.name,
            state = ?upload.file.state,
            "Media uploaded to Gemini"
        );
        Ok(upload.file.into_handle())
    }

    async fn get_asset_state(
        &self,
        handle: &RemoteAssetHandle,
    ) -> Result<RemoteAssetHandle, RemoteError> {
        let response = self
            .http_client
            .get(self.resource_url(handle.name()))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|e| transport("Failed to query Gemini file", e))?;

        let response = check_status(response, "Gemini file query failed").await?;
        let file: GeminiFile = parse_json(response, "Failed to parse file response").await?;
        Ok(file.into_handle())
    }

    #[tracing::instrument(skip(self, handle, prompt), fields(asset = %handle.name(), model = %self.model))]
    async fn generate_analysis(
        &self,
        handle: &RemoteAssetHandle,
        prompt: &str,
    ) -> Result<String, RemoteError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );

        let file_uri = handle
            .uri()
            .map(|u| u.to_string())
            .unwrap_or_else(|| self.resource_url(handle.name()));

        let request = GenerateRequest {
            contents: vec![GenerateContent {
                parts: vec![
                    GeneratePart::FileData {
                        file_data: FileData {
                            mime_type: handle
                                .mime_type()
                                .unwrap_or("application/octet-stream")
                                .to_string(),
                            file_uri,
                        },
                    },
                    GeneratePart::Text {
                        text: prompt.to_string(),
                    },
                ],
            }],
        };

        let response = self
            .http_client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport("Failed to call Gemini generateContent", e))?;

        let response = check_status(response, "Gemini generateContent failed").await?;
        let body: GenerateResponse =
            parse_json(response, "Failed to parse generateContent response").await?;
        body.into_text()
    }

    async fn delete_asset(&self, handle: &RemoteAssetHandle) -> Result<(), RemoteError> {
        let response = self
            .http_client
            .delete(self.resource_url(handle.name()))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|e| transport("Failed to delete Gemini file", e))?;

        check_status(response, "Gemini file delete failed").await?;
        Ok(())
    }

    fn model(&self) -> &str {
        &self.model
    }
}

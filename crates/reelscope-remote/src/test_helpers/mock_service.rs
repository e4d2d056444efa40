use async_trait::async_trait;
use bytes::Bytes;
use reelscope_core::{RemoteAssetHandle, RemoteError, RemoteState};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::service::AnalysisService;

const MOCK_ASSET_NAME: &str = "files/mock-asset";

/// Scripted remote service.
///
/// Submission pops queued results and succeeds once the queue is empty.
/// State queries return `Processing` for the first `ready_after` calls, then
/// `final_state` forever.
pub struct MockAnalysisService {
    submit_results: Mutex<VecDeque<Result<(), RemoteError>>>,
    initial_state: RemoteState,
    ready_after: usize,
    final_state: Option<RemoteState>,
    state_error: Option<RemoteError>,
    analysis: Result<String, RemoteError>,
    delete_error: Option<RemoteError>,
    submit_calls: AtomicUsize,
    state_calls: AtomicUsize,
    generate_calls: AtomicUsize,
    delete_calls: AtomicUsize,
    submitted: Mutex<Vec<(usize, String)>>,
    deleted: Mutex<Vec<String>>,
    prompts: Mutex<Vec<String>>,
}

impl Default for MockAnalysisService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAnalysisService {
    pub fn new() -> Self {
        Self {
            submit_results: Mutex::new(VecDeque::new()),
            initial_state: RemoteState::Processing,
            ready_after: 0,
            final_state: Some(RemoteState::Succeeded),
            state_error: None,
            analysis: Ok("Mock analysis.\nCAPA: 3\nPOTENCIAL VIRAL: 7/10\nRISCO: low".to_string()),
            delete_error: None,
            submit_calls: AtomicUsize::new(0),
            state_calls: AtomicUsize::new(0),
            generate_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
            submitted: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Fail the next `count` submissions with `error`.
    pub fn with_submit_failures(self, count: usize, error: RemoteError) -> Self {
        {
            let mut queue = self.submit_results.lock().unwrap();
            for _ in 0..count {
                queue.push_back(Err(error.clone()));
            }
        }
        self
    }

    /// State reported by the upload response itself.
    pub fn with_initial_state(mut self, state: RemoteState) -> Self {
        self.initial_state = state;
        self
    }

    /// Report `Processing` for `polls` queries, then `Succeeded`.
    pub fn ready_after(mut self, polls: usize) -> Self {
        self.ready_after = polls;
        self.final_state = Some(RemoteState::Succeeded);
        self
    }

    pub fn never_ready(mut self) -> Self {
        self.final_state = None;
        self
    }

    /// Report `Processing` for `polls` queries, then `Failed`.
    pub fn fails_after(mut self, polls: usize) -> Self {
        self.ready_after = polls;
        self.final_state = Some(RemoteState::Failed);
        self
    }

    pub fn with_state_error(mut self, error: RemoteError) -> Self {
        self.state_error = Some(error);
        self
    }

    pub fn with_analysis_text(mut self, text: impl Into<String>) -> Self {
        self.analysis = Ok(text.into());
        self
    }

    pub fn with_analysis_error(mut self, error: RemoteError) -> Self {
        self.analysis = Err(error);
        self
    }

    pub fn with_delete_error(mut self, error: RemoteError) -> Self {
        self.delete_error = Some(error);
        self
    }

    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn state_calls(&self) -> usize {
        self.state_calls.load(Ordering::SeqCst)
    }

    pub fn generate_calls(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    /// `(size, mime_type)` of every submission attempt.
    pub fn submitted(&self) -> Vec<(usize, String)> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    /// Prompts passed to every analysis request.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    fn handle(&self, state: RemoteState) -> RemoteAssetHandle {
        let mut handle = RemoteAssetHandle::new(MOCK_ASSET_NAME, state)
            .with_uri(format!("https://mock.test/v1beta/{}", MOCK_ASSET_NAME))
            .with_mime_type("video/mp4");
        if state == RemoteState::Failed {
            handle = handle.with_error_message("mock processing failure");
        }
        handle
    }
}

#[async_trait]
impl AnalysisService for MockAnalysisService {
    async fn submit_asset(
        &self,
        data: Bytes,
        mime_type: &str,
        _display_name: &str,
    ) -> Result<RemoteAssetHandle, RemoteError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        self.submitted
            .lock()
            .unwrap()
            .push((data.len(), mime_type.to_string()));

        if let Some(Err(e)) = self.submit_results.lock().unwrap().pop_front() {
            return Err(e);
        }
        Ok(self.handle(self.initial_state))
    }

    async fn get_asset_state(
        &self,
        _handle: &RemoteAssetHandle,
    ) -> Result<RemoteAssetHandle, RemoteError> {
        let call = self.state_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(e) = &self.state_error {
            return Err(e.clone());
        }
        let state = match self.final_state {
            Some(state) if call >= self.ready_after => state,
            _ => RemoteState::Processing,
        };
        Ok(self.handle(state))
    }

    async fn generate_analysis(
        &self,
        _handle: &RemoteAssetHandle,
        prompt: &str,
    ) -> Result<String, RemoteError> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.analysis.clone()
    }

    async fn delete_asset(&self, handle: &RemoteAssetHandle) -> Result<(), RemoteError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.deleted.lock().unwrap().push(handle.name().to_string());
        match &self.delete_error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    fn model(&self) -> &str {
        "mock-model"
    }
}

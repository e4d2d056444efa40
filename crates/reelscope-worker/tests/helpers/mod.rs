#![allow(dead_code)]

use reelscope_core::{AnalysisConfig, Config, JobProgress};
use reelscope_processing::test_helpers::{FakeDecoder, FakeMedia};
use reelscope_processing::MediaDecoder;
use reelscope_remote::test_helpers::MockAnalysisService;
use reelscope_remote::{AnalysisService, ProgressReporter};
use reelscope_worker::JobOrchestrator;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::mpsc;

pub struct TestJob {
    pub orchestrator: JobOrchestrator,
    pub staging_dir: TempDir,
    pub input_dir: TempDir,
}

/// A ten second, 30 fps clip.
pub fn ten_second_decoder() -> Arc<FakeDecoder> {
    Arc::new(FakeDecoder::new(FakeMedia::new(300, 30.0)))
}

pub fn setup(service: Arc<dyn AnalysisService>, decoder: Arc<dyn MediaDecoder>) -> TestJob {
    setup_with_config(service, decoder, |_| {})
}

/// Like [`setup`], with a hook to adjust the configuration.
pub fn setup_with_config(
    service: Arc<dyn AnalysisService>,
    decoder: Arc<dyn MediaDecoder>,
    configure: impl FnOnce(&mut AnalysisConfig),
) -> TestJob {
    let staging_dir = tempfile::tempdir().unwrap();
    let input_dir = tempfile::tempdir().unwrap();

    let mut config = AnalysisConfig::with_api_key("test-api-key-123");
    configure(&mut config);
    config.temp_dir = staging_dir.path().to_path_buf();

    let orchestrator = JobOrchestrator::new(Config::new(config), service, decoder).unwrap();
    TestJob {
        orchestrator,
        staging_dir,
        input_dir,
    }
}

pub fn setup_with_mock(service: Arc<MockAnalysisService>) -> TestJob {
    setup(service, ten_second_decoder())
}

impl TestJob {
    /// Write an input file the caller owns.
    pub fn input_file(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.input_dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    /// Files left behind in the staging directory.
    pub fn staged_files(&self) -> usize {
        count_files(self.staging_dir.path())
    }
}

pub fn count_files(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

pub fn progress_channel() -> (ProgressReporter, mpsc::UnboundedReceiver<JobProgress>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ProgressReporter::new(Some(tx)), rx)
}

pub fn drain(rx: &mut mpsc::UnboundedReceiver<JobProgress>) -> Vec<JobProgress> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

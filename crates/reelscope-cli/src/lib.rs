use reelscope_core::{AnalysisConfig, Config, JobProgress, StructuredView};
use reelscope_processing::ResultParser;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Initialize tracing for the CLI. Logs go to stderr so stdout stays
/// machine-readable.
pub fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Guess a video MIME type from the file extension.
pub fn mime_from_extension(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_lowercase();
    match extension.as_str() {
        "mp4" | "m4v" => Some("video/mp4"),
        "mov" => Some("video/quicktime"),
        "avi" => Some("video/x-msvideo"),
        "webm" => Some("video/webm"),
        "mkv" => Some("video/x-matroska"),
        _ => None,
    }
}

/// One-line rendering of a progress event.
pub fn format_progress(event: &JobProgress) -> String {
    match event {
        JobProgress::Stage(stage) => format!("[{}]", stage),
        JobProgress::Polling(p) => format!(
            "[waiting_for_readiness] {:>3.0}% ({}s / {}s, {} polls, {})",
            p.fraction() * 100.0,
            p.elapsed.as_secs(),
            p.budget.as_secs(),
            p.polls,
            p.state
        ),
    }
}

/// Parser for `reelscope parse`, built from the same settings `analyze` uses.
pub fn offline_parser(config: AnalysisConfig) -> anyhow::Result<ResultParser> {
    ResultParser::from_config(&Config::new(config))
}

pub fn format_structured(view: &StructuredView) -> String {
    let dash = || "-".to_string();
    format!(
        "Cover second:   {}\nViral score:    {}\nRisk level:     {}",
        view.cover_second.map(|s| s.to_string()).unwrap_or_else(dash),
        view.viral_score
            .map(|s| format!("{}/10", s))
            .unwrap_or_else(dash),
        view.risk_level.clone().unwrap_or_else(dash),
    )
}

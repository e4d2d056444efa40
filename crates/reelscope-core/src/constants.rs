//! Defaults shared by configuration and the pipeline stages.

/// Default Gemini endpoint root (upload and REST paths are appended).
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-pro";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 300;

pub const DEFAULT_SUBMIT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_SUBMIT_BACKOFF_BASE_MS: u64 = 1000;

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_POLL_TIMEOUT_SECS: u64 = 300;

pub const DEFAULT_TIMESTAMP_MIN_SECS: u32 = 1;
pub const DEFAULT_TIMESTAMP_MAX_SECS: u32 = 300;
pub const DEFAULT_THUMBNAIL_FALLBACK_SECS: u32 = 1;

pub const DEFAULT_RISK_KEYWORDS: &[&str] = &["low", "medium", "high"];

pub const DEFAULT_MAX_VIDEO_SIZE_MB: usize = 100;
pub const DEFAULT_VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi"];
pub const DEFAULT_VIDEO_CONTENT_TYPES: &[&str] = &["video/mp4", "video/quicktime", "video/x-msvideo"];

/// Body of the prompt used when the caller does not supply one.
///
/// [`analysis_prompt`] appends the marker lines the result parser looks for.
pub const ANALYSIS_PROMPT_BODY: &str = r#"You are Viral Strategist Pro, an expert in affiliate marketing and short-form video analysis.

Analyze this product video and provide:

1. **PRODUCT ANALYSIS**: What is being sold? Which problem does it solve?
2. **HIGHEST-IMPACT MOMENT**: Identify the exact second (e.g. 00:15) with the strongest buying desire.
3. **TRIGGERS FOUND**: List the mental triggers used (scarcity, urgency, curiosity, social proof, etc.).
4. **STRENGTHS**: What works well in this video?
5. **IMPROVEMENTS**: What could be improved?
6. **VIRAL POTENTIAL**: From 0 to 10, how likely is this video to go viral?
7. **TARGET**: Who is the likely target audience?

Be detailed but objective. Use bullet points to make it easy to read."#;

/// Default prompt, with the risk marker listing the configured keywords so
/// the answer uses a label the parser accepts.
pub fn analysis_prompt(risk_keywords: &[String]) -> String {
    format!(
        "{}\n\nFinish with exactly these three lines:\n\
         CAPA: <second of the best cover frame, as an integer>\n\
         POTENCIAL VIRAL: <score>/10\n\
         RISCO: <{}>",
        ANALYSIS_PROMPT_BODY,
        risk_keywords.join("|")
    )
}
